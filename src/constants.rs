//! Central Configuration Constants
//!
//! Single source of truth for tag vocabulary and scoring defaults.
//! To change a built-in threshold, only edit this file.

/// App name
pub const APP_NAME: &str = "AccessGuard";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Attack tags (canonical vocabulary)
// ============================================

pub const TAG_LFI_ATTACK: &str = "LFI_ATTACK";
pub const TAG_SQLI_ATTACK: &str = "SQLI_ATTACK";
pub const TAG_XSS_ATTACK: &str = "XSS_ATTACK";
pub const TAG_PATH_TRAVERSAL: &str = "PATH_TRAVERSAL";
pub const TAG_CMD_INJECTION: &str = "CMD_INJECTION";

/// The fixed attack-tag set used by the dynamic combination rules,
/// the `multiple_attack_types` condition and the meta-detector.
pub const ATTACK_TAGS: [&str; 4] = [
    TAG_LFI_ATTACK,
    TAG_SQLI_ATTACK,
    TAG_XSS_ATTACK,
    TAG_PATH_TRAVERSAL,
];

// ============================================
// Behavioral tags
// ============================================

pub const TAG_BOT_ACTIVITY: &str = "BOT_ACTIVITY";
pub const TAG_AUTOMATED_SCAN: &str = "AUTOMATED_SCAN";
pub const TAG_MANUAL_SCAN: &str = "MANUAL_SCAN";
pub const TAG_COORDINATOR: &str = "COORDINATOR";
pub const TAG_CLUSTER_MEMBER: &str = "CLUSTER_MEMBER";
pub const TAG_COORDINATED_ATTACK: &str = "COORDINATED_ATTACK";
pub const TAG_PAIRED_ATTACK: &str = "PAIRED_ATTACK";
pub const TAG_ISOLATED_ATTACKER: &str = "ISOLATED_ATTACKER";
pub const TAG_ANOMALOUS: &str = "ANOMALOUS";
pub const TAG_SUSPICIOUS: &str = "SUSPICIOUS";
pub const TAG_MALICIOUS_UA: &str = "MALICIOUS_UA";
pub const TAG_KNOWN_BAD_ADDRESS: &str = "KNOWN_BAD_ADDRESS";
pub const TAG_IOC_URL_MATCH: &str = "IOC_URL_MATCH";

/// Tags treated as coordination indicators by scoring and meta-detection.
pub const COORDINATION_TAGS: [&str; 2] = [TAG_COORDINATOR, TAG_COORDINATED_ATTACK];

/// Tags treated as systematic-scanning indicators by the dynamic rules.
pub const SCAN_TAGS: [&str; 2] = [TAG_AUTOMATED_SCAN, TAG_MANUAL_SCAN];

// ============================================
// Cross-validation verdict tags
// ============================================

pub const TAG_CONFIRMED_BOTNET: &str = "CONFIRMED_BOTNET";
pub const TAG_CONFIRMED_COORDINATED: &str = "CONFIRMED_COORDINATED";
pub const TAG_CONFIRMED_SOPHISTICATED: &str = "CONFIRMED_SOPHISTICATED";
pub const TAG_ISOLATED_INDICATOR: &str = "ISOLATED_INDICATOR";
pub const TAG_FALSE_POSITIVE: &str = "FALSE_POSITIVE";
pub const TAG_INCONSISTENT_TIMING: &str = "INCONSISTENT_TIMING";

// ============================================
// Event heuristic flags
// ============================================

pub const FLAG_PATH_TRAVERSAL: &str = "PATH_TRAVERSAL";
pub const FLAG_LFI_RFI: &str = "LFI_RFI";
pub const FLAG_SQL_INJECTION: &str = "SQL_INJECTION";
pub const FLAG_XSS: &str = "XSS";
pub const FLAG_COMMAND_INJECTION: &str = "COMMAND_INJECTION";
pub const FLAG_SUSPICIOUS_EXTENSION: &str = "SUSPICIOUS_EXTENSION";
pub const FLAG_HIGH_ENTROPY: &str = "HIGH_ENTROPY";
pub const FLAG_LONG_URL: &str = "LONG_URL";
pub const FLAG_MANY_PARAMS: &str = "MANY_PARAMS";
pub const FLAG_SUSPICIOUS_USER_AGENT: &str = "SUSPICIOUS_USER_AGENT";

// ============================================
// Built-in thresholds
// ============================================

/// Shannon entropy above this flags a URL as high entropy.
pub const HIGH_ENTROPY_THRESHOLD: f64 = 4.5;

/// URLs longer than this are flagged as potential overflow payloads.
pub const LONG_URL_THRESHOLD: usize = 2000;

/// More query parameters than this flags parameter pollution.
pub const MANY_PARAMS_THRESHOLD: usize = 10;

/// Default threshold for the `url_diversity_ratio` modifier condition.
pub const URL_DIVERSITY_THRESHOLD: f64 = 0.8;

/// Default threshold for the `high_centrality` modifier condition.
pub const HIGH_CENTRALITY_THRESHOLD: f64 = 0.5;

/// Default threshold for the `anomalous_behavior` modifier condition.
pub const ANOMALOUS_BEHAVIOR_THRESHOLD: f64 = 0.7;

/// Length of the fixed behavioral vector used for campaign clustering.
pub const BEHAVIOR_VECTOR_LEN: usize = 50;

/// DBSCAN neighborhood radius in standardized space.
pub const CLUSTER_EPS: f64 = 0.5;

/// DBSCAN minimum neighborhood size (the point itself counts).
pub const CLUSTER_MIN_SAMPLES: usize = 2;
