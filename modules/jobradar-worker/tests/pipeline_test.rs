//! End-to-end pipeline behaviour over the in-memory store with scripted
//! agents: the happy path, duplicate intake, the company-wait bound, and
//! the stop-list and cancellation short-circuits.

mod harness;

use harness::*;

use jobradar_common::{JobStage, PipelineState, QueueItemKind, QueueStatus};
use jobradar_filters::PrefilterPolicy;
use jobradar_store::{MatchFilters, PublishedStore, StopList};

#[tokio::test]
async fn happy_path_job_reaches_success_with_one_match_row() {
    let h = harness().await;
    seed_good_company(&h, "Acme").await;

    let url = "https://boards.greenhouse.io/x/jobs/1";
    let item = seeded_job_item(url, "Acme");
    h.ctx.queue.add_item(&item).await.unwrap();

    drain(&h, 20).await;

    let done = h.ctx.queue.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(done.status, QueueStatus::Success, "{:?}", done.result_message);
    assert!(done.completed_at.is_some());

    // Exactly one match row under the normalised URL.
    assert!(h.ctx.published.job_exists(url).await.unwrap());
    let matches = h
        .ctx
        .published
        .get_matches(MatchFilters::default())
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    let (listing, job_match) = &matches[0];
    assert_eq!(listing.url, url);
    assert!(job_match.match_score >= 70);
    assert_eq!(job_match.matched_skills, vec!["rust"]);
}

#[tokio::test]
async fn duplicate_intake_produces_one_item_without_raising() {
    let h = harness().await;
    let intake = jobradar_worker::ScraperIntake::new(h.ctx.queue.clone());
    let policy = PrefilterPolicy::default();

    let jobs = vec![
        sample_job("https://example.com/jobs/1"),
        sample_job("https://example.com/jobs/1?utm_source=feed"),
    ];

    let stats = intake.ingest(&jobs, "Example", None, &policy).await.unwrap();
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.duplicates, 1);

    // A second ingest of the same batch queues nothing and does not raise.
    let stats = intake.ingest(&jobs, "Example", None, &policy).await.unwrap();
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.duplicates, 2);

    let queue_stats = h.ctx.queue.stats().await.unwrap();
    assert_eq!(queue_stats["total"], 1);
}

#[tokio::test]
async fn job_waits_bounded_cycles_for_company_then_proceeds() {
    let h = harness().await;
    // Company exists but has no about/culture: not good data.
    let company = jobradar_common::Company::new("ThinCo");
    h.ctx.companies.save(&company).await.unwrap();

    let url = "https://example.com/jobs/waits";
    let mut item = seeded_job_item(url, "ThinCo");
    // Start directly at the analyse stage with everything earlier stages
    // would have produced. No company website, so the spawned enrichment
    // fails fast instead of fetching anything.
    let mut job = sample_job(url);
    job.company = "ThinCo".into();
    job.company_website = String::new();
    let mut state = PipelineState::at_stage(JobStage::Analyze);
    state.job_data = Some(serde_json::to_value(job).unwrap());
    state.extraction = Some(strong_extraction());
    state.deterministic_score = Some(90);
    item.pipeline_state = Some(state);
    h.ctx.queue.add_item(&item).await.unwrap();

    drain(&h, 30).await;

    let done = h.ctx.queue.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(done.status, QueueStatus::Success, "{:?}", done.result_message);

    // The job waited the full bound, then proceeded without company data.
    let state = done.pipeline_state.unwrap();
    assert_eq!(
        state.company_wait_count,
        jobradar_worker::processors::MAX_COMPANY_WAITS
    );
    assert_eq!(*h.matcher.calls.lock().unwrap(), 1);

    // Exactly one company enrichment was spawned for the lineage.
    let stats = h.ctx.queue.stats().await.unwrap();
    assert_eq!(stats["total"], 2);
}

#[tokio::test]
async fn stop_list_skips_before_any_stage() {
    let h = harness().await;
    h.ctx
        .settings
        .set(
            "stop_list",
            &StopList {
                excluded_companies: vec!["Evil Corp".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut item = seeded_job_item("https://example.com/jobs/evil", "Evil Corp");
    item.company_name = Some("Evil Corp".into());
    h.ctx.queue.add_item(&item).await.unwrap();

    drain(&h, 5).await;

    let done = h.ctx.queue.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(done.status, QueueStatus::Skipped);
    assert!(done.result_message.unwrap().contains("stop list"));
}

#[tokio::test]
async fn published_duplicate_short_circuits_to_skipped() {
    let h = harness().await;
    seed_good_company(&h, "Acme").await;

    let url = "https://example.com/jobs/already";
    let first = seeded_job_item(url, "Acme");
    h.ctx.queue.add_item(&first).await.unwrap();
    drain(&h, 20).await;
    assert_eq!(
        h.ctx.queue.get_item(first.id).await.unwrap().unwrap().status,
        QueueStatus::Success
    );

    // Same URL resubmitted under a fresh lineage: skipped at dispatch.
    let second = seeded_job_item(&format!("{url}?utm_source=again"), "Acme");
    h.ctx.queue.add_item(&second).await.unwrap();
    drain(&h, 5).await;

    let done = h.ctx.queue.get_item(second.id).await.unwrap().unwrap();
    assert_eq!(done.status, QueueStatus::Skipped);
    assert!(done.result_message.unwrap().contains("already exists"));
}

#[tokio::test]
async fn company_item_without_sub_task_fails_with_guidance() {
    let h = harness().await;
    let mut item = jobradar_common::QueueItem::new(QueueItemKind::Company);
    item.company_name = Some("Acme".into());
    item.max_retries = 1;
    h.ctx.queue.add_item(&item).await.unwrap();

    drain(&h, 5).await;

    let done = h.ctx.queue.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(done.status, QueueStatus::Failed);
    assert!(done.error_details.unwrap().contains("company_sub_task"));
}

#[tokio::test]
async fn prefilter_bypass_flag_skips_stage_a_only() {
    let h = harness().await;
    seed_good_company(&h, "Acme").await;

    // A restrictive prefilter that would reject this title.
    let mut config = jobradar_filters::FilterConfig::default();
    config.prefilter.required_title_keywords = vec!["astronaut".into()];
    h.ctx.settings.set("filters", &config).await.unwrap();

    let url = "https://example.com/jobs/bypass";
    let mut item = seeded_job_item(url, "Acme");
    let mut state = PipelineState::default();
    state.bypass_prefilter = true;
    item.pipeline_state = Some(state);
    h.ctx.queue.add_item(&item).await.unwrap();

    drain(&h, 20).await;

    // Bypass still runs extraction, scoring, and analysis.
    let done = h.ctx.queue.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(done.status, QueueStatus::Success, "{:?}", done.result_message);

    // Without the flag the same job is filtered.
    let plain = seeded_job_item("https://example.com/jobs/nobypass", "Acme");
    h.ctx.queue.add_item(&plain).await.unwrap();
    drain(&h, 20).await;
    let done = h.ctx.queue.get_item(plain.id).await.unwrap().unwrap();
    assert_eq!(done.status, QueueStatus::Filtered);
}
