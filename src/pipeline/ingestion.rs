//! Log Ingestion
//!
//! Universal loader cho các định dạng access log: nginx, apache (combined
//! log format) và JSON lines. Malformed lines are skipped with a warning;
//! a missing file is a hard error.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{IngestionConfig, LogFormat};
use crate::models::LogEvent;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("log file not found: {0}")]
    FileNotFound(String),
    #[error("failed to read log file: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// LINE PATTERNS
// ============================================================================

// $remote_addr - $remote_user [$time_local] "$request" $status $bytes "$referer" "$user_agent"
static COMBINED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(\S+) \S+ \S+ \[([^\]]+)\] "(\S+) (\S+)[^"]*" (\d{3}) (\d+|-) "([^"]*)" "([^"]*)""#,
    )
    .expect("valid regex")
});

/// JSON-lines record shape.
#[derive(Deserialize)]
struct RawJsonEvent {
    source_addr: String,
    timestamp: String,
    method: String,
    url: String,
    status: u16,
    #[serde(default)]
    destination_addr: Option<String>,
    #[serde(default)]
    user_agent: Option<String>,
    #[serde(default)]
    referer: Option<String>,
    #[serde(default)]
    request_size: Option<u64>,
    #[serde(default)]
    response_size: Option<u64>,
}

// ============================================================================
// INGESTION STAGE
// ============================================================================

pub struct LogIngestionStage {
    config: IngestionConfig,
}

impl LogIngestionStage {
    pub fn new(config: IngestionConfig) -> Self {
        Self { config }
    }

    /// Load and parse the configured log file.
    pub fn ingest(&self) -> Result<Vec<LogEvent>, IngestError> {
        let path = Path::new(&self.config.log_path);
        if !path.exists() {
            return Err(IngestError::FileNotFound(self.config.log_path.clone()));
        }

        log::info!(
            "Loading logs from {} (format: {:?})",
            self.config.log_path,
            self.config.format
        );

        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();
        let mut skipped = 0usize;

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let parsed = match self.config.format {
                LogFormat::Nginx | LogFormat::Apache => Self::parse_combined(&line),
                LogFormat::Json => Self::parse_json(&line),
            };

            match parsed {
                Some(event) => events.push(event),
                None => {
                    skipped += 1;
                    log::warn!("Skipping malformed line {}", line_number + 1);
                }
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} malformed lines", skipped);
        }
        log::info!("Loaded {} events", events.len());
        Ok(events)
    }

    /// Parse one combined-log-format line (nginx/apache share it).
    fn parse_combined(line: &str) -> Option<LogEvent> {
        let captures = COMBINED_RE.captures(line)?;

        let timestamp =
            DateTime::parse_from_str(captures.get(2)?.as_str(), "%d/%b/%Y:%H:%M:%S %z")
                .ok()?
                .with_timezone(&Utc);
        let status_code: u16 = captures.get(5)?.as_str().parse().ok()?;
        let response_size = captures.get(6)?.as_str().parse::<u64>().ok();

        Some(LogEvent {
            timestamp,
            source_addr: captures.get(1)?.as_str().to_string(),
            destination_addr: None,
            url: captures.get(4)?.as_str().to_string(),
            method: captures.get(3)?.as_str().to_string(),
            status_code,
            user_agent: non_empty(captures.get(8)?.as_str()),
            request_size: None,
            response_size,
            referer: non_empty(captures.get(7)?.as_str()),
            normalized_url: String::new(),
            entropy: 0.0,
            url_length: 0,
            path_depth: 0,
            query_param_count: 0,
            heuristic_flags: Default::default(),
            is_suspicious: false,
        })
    }

    fn parse_json(line: &str) -> Option<LogEvent> {
        let raw: RawJsonEvent = serde_json::from_str(line).ok()?;
        let timestamp = DateTime::parse_from_rfc3339(&raw.timestamp)
            .ok()?
            .with_timezone(&Utc);

        Some(LogEvent {
            timestamp,
            source_addr: raw.source_addr,
            destination_addr: raw.destination_addr,
            url: raw.url,
            method: raw.method,
            status_code: raw.status,
            user_agent: raw.user_agent,
            request_size: raw.request_size,
            response_size: raw.response_size,
            referer: raw.referer,
            normalized_url: String::new(),
            entropy: 0.0,
            url_length: 0,
            path_depth: 0,
            query_param_count: 0,
            heuristic_flags: Default::default(),
            is_suspicious: false,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() || value == "-" {
        None
    } else {
        Some(value.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NGINX_LINE: &str = r#"203.0.113.10 - - [01/Mar/2024:12:30:45 +0000] "GET /index.php?id=1 HTTP/1.1" 200 1234 "-" "Mozilla/5.0""#;

    #[test]
    fn test_parse_combined_line() {
        let event = LogIngestionStage::parse_combined(NGINX_LINE).unwrap();

        assert_eq!(event.source_addr, "203.0.113.10");
        assert_eq!(event.method, "GET");
        assert_eq!(event.url, "/index.php?id=1");
        assert_eq!(event.status_code, 200);
        assert_eq!(event.response_size, Some(1234));
        assert_eq!(event.referer, None);
        assert_eq!(event.user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[test]
    fn test_parse_combined_rejects_garbage() {
        assert!(LogIngestionStage::parse_combined("not a log line").is_none());
    }

    #[test]
    fn test_parse_json_line() {
        let line = r#"{"source_addr":"198.51.100.7","timestamp":"2024-03-01T12:30:45Z","method":"POST","url":"/login","status":401,"user_agent":"curl/8.0"}"#;
        let event = LogIngestionStage::parse_json(line).unwrap();

        assert_eq!(event.source_addr, "198.51.100.7");
        assert_eq!(event.status_code, 401);
        assert_eq!(event.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_ingest_skips_malformed_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", NGINX_LINE).unwrap();
        writeln!(file, "garbage that is not a log line").unwrap();
        writeln!(file, "{}", NGINX_LINE).unwrap();

        let stage = LogIngestionStage::new(IngestionConfig {
            format: LogFormat::Nginx,
            log_path: file.path().to_string_lossy().to_string(),
        });

        let events = stage.ingest().unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_ingest_missing_file_is_error() {
        let stage = LogIngestionStage::new(IngestionConfig {
            format: LogFormat::Nginx,
            log_path: "/nonexistent/access.log".to_string(),
        });
        assert!(matches!(
            stage.ingest(),
            Err(IngestError::FileNotFound(_))
        ));
    }
}
