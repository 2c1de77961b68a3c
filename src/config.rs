//! Configuration
//!
//! YAML-backed app configuration. Every section defaults when missing -
//! an absent file or section degrades to defaults with a warning, never a
//! failure. Only structurally invalid input (e.g. an empty tag-combination
//! key) is rejected, at load time.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::scoring::conditions::ModifierCondition;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// TOP LEVEL
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ingestion: IngestionConfig,
    pub pipeline: PipelineConfig,
    pub detection: DetectionConfig,
    pub meta: MetaConfig,
    pub scoring: ScoringConfig,
    pub ioc_feeds: IocConfig,
    pub reporting: ReportingConfig,
}

impl AppConfig {
    /// Load from a YAML file. A missing file yields the default config
    /// with a warning; a malformed file or invalid structure is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::warn!(
                "Config file {} not found - using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        log::info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Structural validation. Unknown condition names are warned about
    /// here (they evaluate false later); malformed combination keys are
    /// rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in self.scoring.tag_combinations.keys() {
            if key.is_empty() || key.split('+').any(|part| part.is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "tag combination key '{}' must name at least one non-empty tag",
                    key
                )));
            }
        }

        for (tag, profile) in &self.scoring.scoring_profiles {
            for rule in &profile.modifiers {
                if rule.condition == ModifierCondition::Unknown {
                    log::warn!(
                        "Scoring profile '{}' references an unknown condition - it will never fire",
                        tag
                    );
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// INGESTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Nginx,
    Apache,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Nginx
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub format: LogFormat,
    pub log_path: String,
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub parallel: ParallelConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    pub enabled: bool,
    pub max_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_workers: 4,
        }
    }
}

// ============================================================================
// DETECTION
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub temporal: TemporalConfig,
    pub graph: GraphConfig,
    pub anomaly: AnomalyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Minimum events before temporal analysis is attempted.
    pub min_events: usize,
    /// Spectral peak magnitude threshold, relative to the strongest peak.
    pub peak_threshold: f64,
    /// Minimum peak count for a rhythmic verdict.
    pub min_peaks: usize,
    /// Autocorrelation significance threshold.
    pub autocorr_threshold: f64,
    /// Window length in seconds for rate-change analysis.
    pub window_secs: f64,
    /// Rate change (requests/sec) that counts as dramatic.
    pub change_threshold: f64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            min_events: 10,
            peak_threshold: 0.1,
            min_peaks: 3,
            autocorr_threshold: 0.3,
            window_secs: 600.0,
            change_threshold: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Behavioral similarity above this creates an edge.
    pub edge_threshold: f64,
    pub coordinator_centrality: f64,
    pub coordinator_clustering: f64,
    pub member_clustering: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            edge_threshold: 0.3,
            coordinator_centrality: 0.3,
            coordinator_clustering: 0.3,
            member_clustering: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub anomalous_threshold: f64,
    pub suspicious_threshold: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            anomalous_threshold: 0.7,
            suspicious_threshold: 0.4,
        }
    }
}

// ============================================================================
// META-DETECTION
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    /// Delta added to confirming sources' evidence confidence.
    pub confidence_boost: f64,
    /// Default delta subtracted on contradictions without an own penalty.
    pub confidence_penalty: f64,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            confidence_boost: 0.2,
            confidence_penalty: 0.3,
        }
    }
}

// ============================================================================
// SCORING
// ============================================================================

/// Scoring rules. Missing sections default to empty mappings, which
/// produces a score of 0 for every actor - valid behavior, not a failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub scoring_profiles: BTreeMap<String, ScoringProfile>,
    pub tag_combinations: BTreeMap<String, TagCombination>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringProfile {
    pub base_score: f64,
    #[serde(default)]
    pub modifiers: Vec<ModifierRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModifierRule {
    #[serde(rename = "if")]
    pub condition: ModifierCondition,
    pub value: f64,
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagCombination {
    pub multiplier: f64,
    #[serde(default)]
    pub evidence: Option<String>,
}

// ============================================================================
// IOC FEEDS
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IocConfig {
    pub enabled: bool,
    pub feeds: Vec<FeedConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    pub kind: FeedKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    UserAgent,
    UrlPattern,
    Address,
}

// ============================================================================
// REPORTING
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub output_dir: String,
    pub formats: Vec<ReportFormat>,
    /// Most recent evidence entries shown per actor in rendered reports.
    pub evidence_display_limit: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            output_dir: "reports".to_string(),
            formats: vec![ReportFormat::Json, ReportFormat::Text, ReportFormat::Html],
            evidence_display_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Text,
    Html,
}

// ============================================================================
// TESTS
// ============================================================================
