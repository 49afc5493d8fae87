//! Bot-protection and auth-wall detection over fetched or rendered HTML.
//! Rendered pages report "partial" on selector timeout; these heuristics run
//! on whatever HTML came back so a challenge page never reads as an empty
//! job board.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionKind {
    Bot,
    Auth,
}

/// Markers emitted by Cloudflare and common CAPTCHA widgets.
const BOT_MARKERS: &[&str] = &[
    "cf-browser-verification",
    "cf_chl_opt",
    "cf-ray",
    "challenge-platform",
    "checking your browser",
    "just a moment...",
    "verify you are human",
    "g-recaptcha",
    "recaptcha/api.js",
    "h-captcha",
    "hcaptcha.com",
];

/// Markers for login walls. The password-input check catches pages that
/// render a sign-in form instead of content.
const AUTH_MARKERS: &[&str] = &[
    "sign in to continue",
    "log in to continue",
    "login to continue",
    "please sign in",
    "you must be logged in",
];

/// Inspect HTML for protection markers. Bot protection wins over auth when
/// both appear, matching how the strike system prioritises tags.
pub fn detect_protection(html: &str) -> Option<ProtectionKind> {
    let lower = html.to_lowercase();

    if BOT_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(ProtectionKind::Bot);
    }

    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(ProtectionKind::Auth);
    }
    // A sign-in form with a password field and no obvious content is a wall.
    if lower.contains("type=\"password\"") || lower.contains("type='password'") {
        if lower.contains("sign in") || lower.contains("log in") || lower.contains("login") {
            return Some(ProtectionKind::Auth);
        }
    }

    None
}

/// True when an API response body is an explicit "requires token" refusal.
pub fn is_protected_api_response(body: &str) -> bool {
    let lower = body.to_lowercase();
    (lower.contains("token") || lower.contains("api key") || lower.contains("apikey"))
        && (lower.contains("required") || lower.contains("missing") || lower.contains("invalid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cloudflare_challenge() {
        let html = "<div class='cf-browser-verification'>Checking your browser before accessing</div>\
                    <div id='challenge-platform'>Please wait...</div>";
        assert_eq!(detect_protection(html), Some(ProtectionKind::Bot));
    }

    #[test]
    fn detects_recaptcha_script() {
        let html = r#"<script src="https://www.google.com/recaptcha/api.js"></script>"#;
        assert_eq!(detect_protection(html), Some(ProtectionKind::Bot));
    }

    #[test]
    fn detects_sign_in_wall() {
        let html = r#"<h1>Sign in to continue</h1><form><input type="password" name="password"></form>"#;
        assert_eq!(detect_protection(html), Some(ProtectionKind::Auth));
    }

    #[test]
    fn password_form_alone_with_login_text_is_auth() {
        let html = r#"<form>Log in<input type="password"></form>"#;
        assert_eq!(detect_protection(html), Some(ProtectionKind::Auth));
    }

    #[test]
    fn clean_page_passes() {
        let html = "<html><body><div class='job-card'>Engineer</div></body></html>";
        assert_eq!(detect_protection(html), None);
    }

    #[test]
    fn protected_api_detection() {
        assert!(is_protected_api_response(r#"{"error": "API token required"}"#));
        assert!(!is_protected_api_response(r#"{"jobs": []}"#));
    }
}
