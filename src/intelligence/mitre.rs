//! MITRE ATT&CK Mapping
//!
//! Static mapping từ internal tags sang MITRE techniques - nói cùng một
//! ngôn ngữ với thế giới threat intelligence.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Serialize;

// ============================================================================
// TECHNIQUE CATALOG
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MitreTechnique {
    pub technique_id: &'static str,
    pub name: &'static str,
    pub tactic: &'static str,
    pub description: &'static str,
    pub url: &'static str,
}

static TECHNIQUES: Lazy<BTreeMap<&'static str, MitreTechnique>> = Lazy::new(|| {
    let list = [
        MitreTechnique {
            technique_id: "T1083",
            name: "File and Directory Discovery",
            tactic: "Discovery",
            description: "Adversaries may enumerate files and directories or search specific host locations for information of interest.",
            url: "https://attack.mitre.org/techniques/T1083",
        },
        MitreTechnique {
            technique_id: "T1190",
            name: "Exploit Public-Facing Application",
            tactic: "Initial Access",
            description: "Adversaries may exploit a weakness in an Internet-facing application to cause unintended behavior.",
            url: "https://attack.mitre.org/techniques/T1190",
        },
        MitreTechnique {
            technique_id: "T1595",
            name: "Active Scanning",
            tactic: "Reconnaissance",
            description: "Adversaries may execute active reconnaissance scans to gather information usable during targeting.",
            url: "https://attack.mitre.org/techniques/T1595",
        },
        MitreTechnique {
            technique_id: "T1071.001",
            name: "Web Protocols",
            tactic: "Command and Control",
            description: "Adversaries may blend command traffic into ordinary web protocol traffic to avoid detection.",
            url: "https://attack.mitre.org/techniques/T1071/001",
        },
        MitreTechnique {
            technique_id: "T1105",
            name: "Ingress Tool Transfer",
            tactic: "Command and Control",
            description: "Adversaries may transfer tools or files from an external system into a compromised environment.",
            url: "https://attack.mitre.org/techniques/T1105",
        },
        MitreTechnique {
            technique_id: "T1059",
            name: "Command and Scripting Interpreter",
            tactic: "Execution",
            description: "Adversaries may abuse command and script interpreters to execute arbitrary commands.",
            url: "https://attack.mitre.org/techniques/T1059",
        },
        MitreTechnique {
            technique_id: "T1592",
            name: "Gather Victim Host Information",
            tactic: "Reconnaissance",
            description: "Adversaries may gather information about the victim's hosts for use during targeting.",
            url: "https://attack.mitre.org/techniques/T1592",
        },
    ];
    list.into_iter().map(|t| (t.technique_id, t)).collect()
});

// ============================================================================
// TAG MAPPING
// ============================================================================

static TAG_TECHNIQUES: Lazy<BTreeMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut map: BTreeMap<&'static str, &'static [&'static str]> = BTreeMap::new();

    // Web application attacks
    map.insert("LFI_ATTACK", &["T1083", "T1190", "T1105"]);
    map.insert("SQLI_ATTACK", &["T1190"]);
    map.insert("XSS_ATTACK", &["T1190"]);
    map.insert("PATH_TRAVERSAL", &["T1083", "T1190"]);
    map.insert("CMD_INJECTION", &["T1059", "T1190"]);

    // Reconnaissance
    map.insert("AUTOMATED_SCAN", &["T1595"]);
    map.insert("MANUAL_SCAN", &["T1595"]);

    // Bot / automation
    map.insert("BOT_ACTIVITY", &["T1071.001"]);
    map.insert("CONFIRMED_BOTNET", &["T1071.001"]);
    map.insert("MALICIOUS_UA", &["T1071.001"]);

    // Coordination
    map.insert("COORDINATED_ATTACK", &["T1071.001", "T1595"]);
    map.insert("CONFIRMED_COORDINATED", &["T1071.001", "T1595"]);
    map.insert("CONFIRMED_SOPHISTICATED", &["T1190", "T1071.001", "T1595"]);
    map.insert("PAIRED_ATTACK", &["T1595"]);

    // Cross-validation markers
    map.insert("ISOLATED_INDICATOR", &["T1595"]);
    map.insert("INCONSISTENT_TIMING", &["T1071.001"]);
    map.insert("KNOWN_BAD_ADDRESS", &["T1592"]);

    map
});

/// All techniques referenced by any of the given tags, sorted by id.
pub fn techniques_for_tags<'a, I>(tags: I) -> Vec<&'static MitreTechnique>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ids: Vec<&'static str> = Vec::new();
    for tag in tags {
        if let Some(technique_ids) = TAG_TECHNIQUES.get(tag) {
            ids.extend(technique_ids.iter().copied());
        }
    }
    ids.sort_unstable();
    ids.dedup();
    ids.into_iter().filter_map(|id| TECHNIQUES.get(id)).collect()
}

/// Short reference line, e.g. "T1190 - Exploit Public-Facing Application".
pub fn format_reference(technique: &MitreTechnique) -> String {
    format!(
        "{} - {} ({})",
        technique.technique_id, technique.name, technique.tactic
    )
}

// ============================================================================
// TESTS
// ============================================================================
