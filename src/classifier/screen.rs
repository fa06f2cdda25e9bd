//! Gateway screen
//!
//! Cheap pre-check run at the edge. A request with a reason is diverted to
//! the decoy; everything else goes to the real upstream.

use axum::http::{header::USER_AGENT, HeaderMap};
use once_cell::sync::Lazy;
use regex::Regex;

use super::rules::{contains_any, SCRIPT_TAG};

/// Scanner and scripting tool signatures in the User-Agent
pub const TOOL_AGENTS: &[&str] = &["sqlmap", "curl", "python", "nikto", "nmap"];

const URL_SPECIAL_CHARS: &[char] = &['{', '}', '[', ']', '$', ';'];

const SQL_BODY_MARKERS: &[&str] = &["' or '1'='1", "' or 1=1", "--"];

static UNION_SELECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)union.*select").expect("union/select pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenReason {
    ToolAgent(&'static str),
    UrlSqlInjection,
    UrlSpecialChars,
    BodySqlInjection,
    BodyXss,
}

impl std::fmt::Display for ScreenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenReason::ToolAgent(tool) => write!(f, "User-Agent: {}", tool),
            ScreenReason::UrlSqlInjection => write!(f, "Suspect SQLi in URL"),
            ScreenReason::UrlSpecialChars => write!(f, "Special chars in URL"),
            ScreenReason::BodySqlInjection => write!(f, "SQL Injection"),
            ScreenReason::BodyXss => write!(f, "XSS Attempt"),
        }
    }
}

/// Return why a request looks malicious, or None if it looks benign.
///
/// `url` is the raw path and query as received.
pub fn screen(url: &str, headers: &HeaderMap, body: &[u8]) -> Option<ScreenReason> {
    let agent = headers
        .get(USER_AGENT)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).to_lowercase())
        .unwrap_or_default();
    if let Some(tool) = TOOL_AGENTS.iter().copied().find(|tool| agent.contains(tool)) {
        return Some(ScreenReason::ToolAgent(tool));
    }

    if UNION_SELECT.is_match(url) {
        return Some(ScreenReason::UrlSqlInjection);
    }
    if url.contains(URL_SPECIAL_CHARS) {
        return Some(ScreenReason::UrlSpecialChars);
    }

    let body = String::from_utf8_lossy(body).to_lowercase();
    if contains_any(&body, SQL_BODY_MARKERS) {
        return Some(ScreenReason::BodySqlInjection);
    }
    if body.contains(SCRIPT_TAG) {
        return Some(ScreenReason::BodyXss);
    }

    None
}
