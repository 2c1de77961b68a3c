//! IoC Feed Manager
//!
//! Dynamic threat-intelligence feeds: plain-text pattern lists fetched over
//! HTTP. A feed that keeps failing is disabled instead of aborting the
//! pipeline - intelligence is best-effort.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{FeedKind, IocConfig};

/// Consecutive failures before a feed is disabled.
const MAX_FEED_ERRORS: u32 = 3;

// ============================================================================
// FEED
// ============================================================================

#[derive(Debug, Clone)]
pub struct IocFeed {
    pub name: String,
    pub url: String,
    pub kind: FeedKind,
    pub enabled: bool,
    pub patterns: BTreeSet<String>,
    pub last_update: Option<DateTime<Utc>>,
    error_count: u32,
}

impl IocFeed {
    pub fn new(name: String, url: String, kind: FeedKind, enabled: bool) -> Self {
        Self {
            name,
            url,
            kind,
            enabled,
            patterns: BTreeSet::new(),
            last_update: None,
            error_count: 0,
        }
    }

    /// Build a feed from an in-memory pattern list. Used by tests and by
    /// file-backed feeds.
    pub fn with_patterns(name: &str, kind: FeedKind, patterns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            url: String::new(),
            kind,
            enabled: true,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            last_update: Some(Utc::now()),
            error_count: 0,
        }
    }

    /// Fetch the pattern list. Comment lines (#) and blanks are ignored.
    pub fn load_patterns(&mut self, agent: &ureq::Agent) -> bool {
        if !self.enabled {
            return false;
        }

        match agent.get(&self.url).call() {
            Ok(response) => match response.into_string() {
                Ok(body) => {
                    self.patterns = body
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty() && !line.starts_with('#'))
                        .map(str::to_string)
                        .collect();
                    self.last_update = Some(Utc::now());
                    self.error_count = 0;
                    log::info!("IoC feed '{}' loaded {} patterns", self.name, self.patterns.len());
                    true
                }
                Err(e) => self.record_failure(&e.to_string()),
            },
            Err(e) => self.record_failure(&e.to_string()),
        }
    }

    fn record_failure(&mut self, error: &str) -> bool {
        self.error_count += 1;
        log::error!("Failed to load IoC feed '{}': {}", self.name, error);
        if self.error_count >= MAX_FEED_ERRORS {
            log::warn!(
                "Disabling IoC feed '{}' after {} consecutive failures",
                self.name,
                self.error_count
            );
            self.enabled = false;
        }
        false
    }

    /// Substring match against the loaded patterns.
    pub fn match_pattern(&self, text: &str) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.patterns
            .iter()
            .find(|pattern| text.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

// ============================================================================
// MATCH RESULT
// ============================================================================

#[derive(Debug, Clone)]
pub struct IocMatch {
    pub feed: String,
    pub pattern: String,
    pub confidence: f64,
    pub description: String,
}

// ============================================================================
// MANAGER
// ============================================================================

pub struct IocManager {
    feeds: Vec<IocFeed>,
    enabled: bool,
}

impl IocManager {
    pub fn from_config(config: &IocConfig) -> Self {
        let feeds = config
            .feeds
            .iter()
            .map(|f| IocFeed::new(f.name.clone(), f.url.clone(), f.kind, f.enabled))
            .collect();
        Self {
            feeds,
            enabled: config.enabled,
        }
    }

    /// Directly seed feeds, bypassing the network. Used in tests.
    pub fn with_feeds(feeds: Vec<IocFeed>) -> Self {
        Self {
            feeds,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.feeds.is_empty()
    }

    /// Refresh all enabled feeds. Returns the number that loaded.
    pub fn update_feeds(&mut self) -> usize {
        if !self.enabled {
            return 0;
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .build();

        let mut loaded = 0;
        for feed in &mut self.feeds {
            if feed.load_patterns(&agent) {
                loaded += 1;
            }
        }
        log::info!("IoC feed update complete: {}/{} loaded", loaded, self.feeds.len());
        loaded
    }

    fn check(&self, kind: FeedKind, text: &str, confidence: f64, what: &str) -> Option<IocMatch> {
        for feed in self.feeds.iter().filter(|f| f.kind == kind) {
            if let Some(pattern) = feed.match_pattern(text) {
                return Some(IocMatch {
                    feed: feed.name.clone(),
                    pattern: pattern.to_string(),
                    confidence,
                    description: format!("{} matched feed pattern: {}", what, pattern),
                });
            }
        }
        None
    }

    pub fn check_user_agent(&self, user_agent: &str) -> Option<IocMatch> {
        self.check(FeedKind::UserAgent, user_agent, 0.9, "Malicious user agent")
    }

    pub fn check_url(&self, url: &str) -> Option<IocMatch> {
        self.check(FeedKind::UrlPattern, url, 0.85, "Suspicious URL")
    }

    pub fn check_address(&self, address: &str) -> Option<IocMatch> {
        self.check(FeedKind::Address, address, 0.95, "Known-bad source address")
    }
}

// ============================================================================
// TESTS
// ============================================================================
