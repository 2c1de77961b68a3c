//! Log Event Model
//!
//! One parsed access-log line with computed features.
//! Immutable after enrichment - feature calculation runs exactly once.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{
    FLAG_COMMAND_INJECTION, FLAG_HIGH_ENTROPY, FLAG_LFI_RFI, FLAG_LONG_URL, FLAG_MANY_PARAMS,
    FLAG_PATH_TRAVERSAL, FLAG_SQL_INJECTION, FLAG_SUSPICIOUS_EXTENSION,
    FLAG_SUSPICIOUS_USER_AGENT, FLAG_XSS, HIGH_ENTROPY_THRESHOLD, LONG_URL_THRESHOLD,
    MANY_PARAMS_THRESHOLD,
};

// ============================================================================
// HEURISTIC PATTERN TABLES
// ============================================================================

static PATH_TRAVERSAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\.\./|\.\.\\|%2e%2e%2f|%2e%2e/|\.\.%2f|\.\.%5c)").expect("valid regex")
});

static LFI_RFI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(php://|data://|zip://|file://|expect://|/etc/passwd|/proc/self|boot\.ini|=\s*(?:https?|ftp)://)",
    )
    .expect("valid regex")
});

static SQL_INJECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(union(\s|%20)+select|drop(\s|%20)+table|exec(\s|%20)*xp_|insert(\s|%20)+into|('|%27|")(\s|%20)*(or|and)(\s|%20)*(\d|'|%27))"#,
    )
    .expect("valid regex")
});

static XSS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(<script[^>]*>|%3cscript|javascript:|on\w+\s*=|<iframe[^>]*>|<object[^>]*>)")
        .expect("valid regex")
});

static COMMAND_INJECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\||;|&&|%7c|%3b|`|%60|\$\(|\$\{)\s*(cat|ls|pwd|whoami|id|uname|wget|curl|nc|telnet|rm|del|format)\b",
    )
    .expect("valid regex")
});

static SUSPICIOUS_EXTENSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(php|asp|aspx|jsp|cgi|pl|py|exe|bat|cmd|com|pif|scr)(\b|$)")
        .expect("valid regex")
});

static SUSPICIOUS_UA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(bot|crawler|spider|scraper|nmap|sqlmap|nikto|dirb|gobuster|python|curl|wget|lynx)")
        .expect("valid regex")
});

// ============================================================================
// LOG EVENT
// ============================================================================

/// A single access-log request with computed features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub source_addr: String,
    pub destination_addr: Option<String>,
    pub url: String,
    pub method: String,
    pub status_code: u16,
    pub user_agent: Option<String>,
    pub request_size: Option<u64>,
    pub response_size: Option<u64>,
    pub referer: Option<String>,

    // Computed features (filled in by enrichment)
    #[serde(default)]
    pub normalized_url: String,
    #[serde(default)]
    pub entropy: f64,
    #[serde(default)]
    pub url_length: usize,
    #[serde(default)]
    pub path_depth: usize,
    #[serde(default)]
    pub query_param_count: usize,
    #[serde(default)]
    pub heuristic_flags: BTreeSet<String>,
    #[serde(default)]
    pub is_suspicious: bool,
}

impl LogEvent {
    /// Calculate all features for this event. Runs once during enrichment;
    /// the event is treated as immutable afterwards.
    pub fn calculate_features(&mut self) {
        self.calculate_entropy();
        self.calculate_url_features();
        self.apply_heuristics();
    }

    /// Shannon entropy of the raw URL characters.
    fn calculate_entropy(&mut self) {
        if self.url.is_empty() {
            self.entropy = 0.0;
            return;
        }

        let mut counts = std::collections::HashMap::new();
        let total = self.url.chars().count() as f64;
        for c in self.url.chars() {
            *counts.entry(c).or_insert(0usize) += 1;
        }

        let mut entropy = 0.0;
        for count in counts.values() {
            let p = *count as f64 / total;
            entropy -= p * p.log2();
        }
        self.entropy = entropy;
    }

    fn calculate_url_features(&mut self) {
        self.url_length = self.url.len();

        let path = self.url.split('?').next().unwrap_or("");
        self.normalized_url = path.to_string();
        self.path_depth = path.split('/').filter(|p| !p.is_empty()).count();

        self.query_param_count = match self.url.split_once('?') {
            Some((_, query)) => query.split('&').filter(|p| !p.is_empty()).count(),
            None => 0,
        };
    }

    fn apply_heuristics(&mut self) {
        self.heuristic_flags.clear();

        if PATH_TRAVERSAL_RE.is_match(&self.url) {
            self.heuristic_flags.insert(FLAG_PATH_TRAVERSAL.to_string());
        }
        if LFI_RFI_RE.is_match(&self.url) {
            self.heuristic_flags.insert(FLAG_LFI_RFI.to_string());
        }
        if SQL_INJECTION_RE.is_match(&self.url) {
            self.heuristic_flags.insert(FLAG_SQL_INJECTION.to_string());
        }
        if XSS_RE.is_match(&self.url) {
            self.heuristic_flags.insert(FLAG_XSS.to_string());
        }
        if COMMAND_INJECTION_RE.is_match(&self.url) {
            self.heuristic_flags.insert(FLAG_COMMAND_INJECTION.to_string());
        }
        if SUSPICIOUS_EXTENSION_RE.is_match(&self.url) {
            self.heuristic_flags
                .insert(FLAG_SUSPICIOUS_EXTENSION.to_string());
        }
        if self.entropy > HIGH_ENTROPY_THRESHOLD {
            self.heuristic_flags.insert(FLAG_HIGH_ENTROPY.to_string());
        }
        if self.url_length > LONG_URL_THRESHOLD {
            self.heuristic_flags.insert(FLAG_LONG_URL.to_string());
        }
        if self.query_param_count > MANY_PARAMS_THRESHOLD {
            self.heuristic_flags.insert(FLAG_MANY_PARAMS.to_string());
        }
        if let Some(ua) = &self.user_agent {
            if SUSPICIOUS_UA_RE.is_match(ua) {
                self.heuristic_flags
                    .insert(FLAG_SUSPICIOUS_USER_AGENT.to_string());
            }
        }

        self.is_suspicious = !self.heuristic_flags.is_empty();
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.heuristic_flags.contains(flag)
    }

    /// True for 4xx/5xx responses.
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

// ============================================================================
// TESTS
// ============================================================================
