//! Scrape-runner behaviour: the per-source strike table, rate-limit
//! exemption, zero-jobs recovery spawning, early exit, and source recovery
//! repairing a config in place.

mod harness;

use harness::*;

use jobradar_common::{
    HtmlFieldSelectors, HtmlSourceConfig, QueueItem, QueueItemKind, QueueStatus, ScrapeRunConfig,
    Source, SourceConfig, SourceStatus,
};
use jobradar_worker::{ScrapeRunner, TRANSIENT_FAILURE_THRESHOLD, ZERO_JOBS_RECOVERY_THRESHOLD};

fn api_source(name: &str) -> Source {
    let config: SourceConfig = serde_json::from_value(serde_json::json!({
        "type": "api",
        "url": format!("http://127.0.0.1:1/{name}/api"),
        "response_path": "jobs",
        "fields": {"title": "title", "url": "url"},
    }))
    .unwrap();
    Source::new(name, config)
}

fn js_html_source(name: &str) -> Source {
    Source::new(
        name,
        SourceConfig::Html(HtmlSourceConfig {
            url: format!("http://127.0.0.1:1/{name}/careers"),
            job_selector: ".job-card".into(),
            requires_js: true,
            render_wait_for: None,
            follow_detail: false,
            fields: HtmlFieldSelectors {
                title: "h2".into(),
                url: "a@href".into(),
                description: None,
                location: None,
                posted_date: None,
            },
            base_url: None,
        }),
    )
}

#[tokio::test]
async fn bot_protection_disables_immediately_with_tag() {
    let h = harness().await;
    let source = api_source("botshop");
    h.ctx.sources.add_source(&source).await.unwrap();
    h.factory.script("botshop", vec![ScrapeOutcome::Bot]);

    let runner = ScrapeRunner::new(h.ctx.clone());
    let stats = runner.run(&ScrapeRunConfig::default()).await.unwrap();
    assert_eq!(stats.errors.len(), 1);

    let after = h.ctx.sources.get_source(source.id).await.unwrap().unwrap();
    assert_eq!(after.status, SourceStatus::Disabled);
    assert!(after.disabled_tags.contains(&"anti_bot".to_string()));
    // The strike counter stays untouched by permanent conditions.
    assert_eq!(after.consecutive_failures, 0);
}

#[tokio::test]
async fn auth_and_protected_api_disable_with_their_tags() {
    let h = harness().await;
    let auth = api_source("authwall");
    let protected = api_source("tokenapi");
    h.ctx.sources.add_source(&auth).await.unwrap();
    h.ctx.sources.add_source(&protected).await.unwrap();
    h.factory.script("authwall", vec![ScrapeOutcome::Auth]);
    h.factory.script("tokenapi", vec![ScrapeOutcome::ProtectedApi]);

    let runner = ScrapeRunner::new(h.ctx.clone());
    runner.run(&ScrapeRunConfig::default()).await.unwrap();

    let auth_after = h.ctx.sources.get_source(auth.id).await.unwrap().unwrap();
    assert!(auth_after.disabled_tags.contains(&"auth_required".to_string()));
    let protected_after = h.ctx.sources.get_source(protected.id).await.unwrap().unwrap();
    assert!(protected_after.disabled_tags.contains(&"protected_api".to_string()));
}

#[tokio::test]
async fn rate_limited_with_retry_after_is_a_deferred_noop() {
    let h = harness().await;
    let source = api_source("ratelimited");
    h.ctx.sources.add_source(&source).await.unwrap();
    h.factory.script(
        "ratelimited",
        vec![ScrapeOutcome::Transient {
            retry_after: Some(60),
        }],
    );

    let runner = ScrapeRunner::new(h.ctx.clone());
    let stats = runner.run(&ScrapeRunConfig::default()).await.unwrap();
    assert_eq!(stats.errors.len(), 1);

    let after = h.ctx.sources.get_source(source.id).await.unwrap().unwrap();
    assert_eq!(after.status, SourceStatus::Active);
    assert_eq!(after.consecutive_failures, 0);
    // Not stamped as a successful scrape either.
    assert!(after.last_scraped_at.is_none());
}

#[tokio::test]
async fn transient_failures_disable_at_threshold() {
    let h = harness().await;
    let source = api_source("flaky");
    h.ctx.sources.add_source(&source).await.unwrap();
    h.factory.script(
        "flaky",
        vec![ScrapeOutcome::Transient { retry_after: None }; 3],
    );

    let runner = ScrapeRunner::new(h.ctx.clone());
    for expected_failures in 1..=TRANSIENT_FAILURE_THRESHOLD {
        runner.run(&ScrapeRunConfig::default()).await.unwrap();
        let after = h.ctx.sources.get_source(source.id).await.unwrap().unwrap();
        assert!(after.consecutive_failures <= TRANSIENT_FAILURE_THRESHOLD);
        if expected_failures < TRANSIENT_FAILURE_THRESHOLD {
            assert_eq!(after.status, SourceStatus::Active);
            assert_eq!(after.consecutive_failures, expected_failures);
        } else {
            assert_eq!(after.status, SourceStatus::Disabled);
            assert!(after.disabled_tags.contains(&"strike_threshold".to_string()));
        }
    }
}

#[tokio::test]
async fn successful_scrape_resets_failure_counter() {
    let h = harness().await;
    let source = api_source("recovers");
    h.ctx.sources.add_source(&source).await.unwrap();
    h.factory.script(
        "recovers",
        vec![
            ScrapeOutcome::Transient { retry_after: None },
            ScrapeOutcome::Transient { retry_after: None },
            ScrapeOutcome::Jobs(vec![sample_job("https://recovers.example/jobs/1")]),
        ],
    );

    let runner = ScrapeRunner::new(h.ctx.clone());
    runner.run(&ScrapeRunConfig::default()).await.unwrap();
    runner.run(&ScrapeRunConfig::default()).await.unwrap();
    assert_eq!(
        h.ctx.sources.get_source(source.id).await.unwrap().unwrap().consecutive_failures,
        2
    );

    let stats = runner.run(&ScrapeRunConfig::default()).await.unwrap();
    assert_eq!(stats.jobs_queued, 1);

    let after = h.ctx.sources.get_source(source.id).await.unwrap().unwrap();
    assert_eq!(after.consecutive_failures, 0);
    assert!(after.last_scraped_at.is_some());
}

#[tokio::test]
async fn zero_job_js_source_spawns_recovery_exactly_once() {
    let h = harness().await;
    let source = js_html_source("emptyjs");
    h.ctx.sources.add_source(&source).await.unwrap();
    // Five consecutive zero-job runs; the script default is empty anyway.
    h.factory.script("emptyjs", vec![ScrapeOutcome::Jobs(Vec::new()); 5]);

    let runner = ScrapeRunner::new(h.ctx.clone());

    for run in 1..=5u32 {
        runner.run(&ScrapeRunConfig::default()).await.unwrap();
        let after = h.ctx.sources.get_source(source.id).await.unwrap().unwrap();
        assert_eq!(after.consecutive_zero_jobs, run);
        let stats = h.ctx.queue.stats().await.unwrap();
        let pending = stats.get("pending").copied().unwrap_or(0);
        if run < ZERO_JOBS_RECOVERY_THRESHOLD {
            assert_eq!(pending, 0, "no recovery before the threshold");
        } else {
            assert_eq!(pending, 1, "exactly one recovery item after run {run}");
        }
    }
}

#[tokio::test]
async fn null_target_matches_scrapes_every_source_and_limit_exits_early() {
    let h = harness().await;
    for name in ["one", "two", "three"] {
        h.ctx.sources.add_source(&api_source(name)).await.unwrap();
        h.factory.script(
            name,
            vec![
                ScrapeOutcome::Jobs(vec![sample_job(&format!("https://{name}.example/jobs/1"))]),
                ScrapeOutcome::Jobs(vec![sample_job(&format!("https://{name}.example/jobs/2"))]),
            ],
        );
    }

    let runner = ScrapeRunner::new(h.ctx.clone());

    // No target: every eligible source is scraped.
    let stats = runner.run(&ScrapeRunConfig::default()).await.unwrap();
    assert_eq!(stats.sources_scraped, 3);
    assert_eq!(stats.jobs_queued, 3);

    // Target of one: the run stops after the first source satisfies it.
    let stats = runner
        .run(&ScrapeRunConfig {
            target_matches: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(stats.sources_scraped, 1);
}

#[tokio::test]
async fn source_recovery_repairs_type_and_reenables() {
    let h = harness().await;

    // A broken JS HTML source that recovery will convert to an API source.
    let mut source = js_html_source("brokenhtml");
    source.consecutive_zero_jobs = ZERO_JOBS_RECOVERY_THRESHOLD;
    source.status = SourceStatus::Disabled;
    source.disabled_notes = Some("selector no longer matches".into());
    h.ctx.sources.add_source(&source).await.unwrap();

    // The analyst proposes an API config; the probe finds five jobs.
    let proposal: SourceConfig = serde_json::from_value(serde_json::json!({
        "type": "api",
        "url": "http://127.0.0.1:1/brokenhtml/api",
        "response_path": "jobs",
        "fields": {"title": "title", "url": "url"},
    }))
    .unwrap();
    *h.analyst.proposal.lock().unwrap() = Some(proposal);
    h.factory.script(
        "brokenhtml",
        vec![ScrapeOutcome::Jobs(
            (1..=5)
                .map(|i| sample_job(&format!("https://brokenhtml.example/jobs/{i}")))
                .collect(),
        )],
    );

    let mut item = QueueItem::new(QueueItemKind::SourceRecover);
    item.source_id = Some(source.id);
    item.source = Some("brokenhtml".into());
    h.ctx.queue.add_item(&item).await.unwrap();
    drain(&h, 5).await;

    let done = h.ctx.queue.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(done.status, QueueStatus::Success, "{:?}", done.result_message);
    assert!(done.result_message.unwrap().contains("5 jobs"));

    let after = h.ctx.sources.get_source(source.id).await.unwrap().unwrap();
    assert_eq!(after.status, SourceStatus::Active);
    assert_eq!(after.source_type(), "api");
    assert_eq!(after.consecutive_zero_jobs, 0);
    assert_eq!(after.consecutive_failures, 0);
}

#[tokio::test]
async fn recovery_probe_returning_zero_jobs_leaves_source_disabled() {
    let h = harness().await;
    let mut source = js_html_source("stillbroken");
    source.status = SourceStatus::Disabled;
    h.ctx.sources.add_source(&source).await.unwrap();

    let proposal: SourceConfig = serde_json::from_value(serde_json::json!({
        "type": "api",
        "url": "http://127.0.0.1:1/stillbroken/api",
        "response_path": "jobs",
        "fields": {"title": "title", "url": "url"},
    }))
    .unwrap();
    *h.analyst.proposal.lock().unwrap() = Some(proposal);
    h.factory.script("stillbroken", vec![ScrapeOutcome::Jobs(Vec::new())]);

    let mut item = QueueItem::new(QueueItemKind::SourceRecover);
    item.source_id = Some(source.id);
    h.ctx.queue.add_item(&item).await.unwrap();
    drain(&h, 5).await;

    let done = h.ctx.queue.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(done.status, QueueStatus::Failed);
    assert!(done.result_message.unwrap().contains("zero jobs"));

    let after = h.ctx.sources.get_source(source.id).await.unwrap().unwrap();
    assert_eq!(after.status, SourceStatus::Disabled);
}
