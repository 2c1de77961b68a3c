//! Reporting Stage
//!
//! Renders scored actors, campaigns and context into JSON, text and HTML
//! reports. Read-only over the pipeline results; score clipping for
//! display happens here and nowhere else.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as AnyhowContext;
use chrono::Utc;
use serde_json::json;

use crate::config::{ReportFormat, ReportingConfig};
use crate::constants::{APP_NAME, APP_VERSION};
use crate::intelligence::mitre;
use crate::models::{ActorProfile, ThreatCampaign};
use crate::pipeline::context::AnalysisContext;
use crate::pipeline::recommendations::Recommendation;

// ============================================================================
// REPORT DATA
// ============================================================================

pub struct ReportData<'a> {
    pub actors: &'a [ActorProfile],
    pub campaigns: &'a [ThreatCampaign],
    pub context: &'a AnalysisContext,
    pub recommendations: &'a [Recommendation],
}

// ============================================================================
// REPORTING STAGE
// ============================================================================

pub struct ReportingStage {
    config: ReportingConfig,
}

impl ReportingStage {
    pub fn new(config: ReportingConfig) -> Self {
        Self { config }
    }

    /// Write all configured report formats. Returns the written paths.
    pub fn generate_reports(&self, data: &ReportData) -> anyhow::Result<Vec<PathBuf>> {
        let output_dir = Path::new(&self.config.output_dir);
        fs::create_dir_all(output_dir)
            .with_context(|| format!("creating report directory {}", output_dir.display()))?;

        let mut written = Vec::new();
        for format in &self.config.formats {
            let (name, content) = match format {
                ReportFormat::Json => ("report.json", self.render_json(data)?),
                ReportFormat::Text => ("report.txt", self.render_text(data)),
                ReportFormat::Html => ("report.html", self.render_html(data)),
            };
            let path = output_dir.join(name);
            fs::write(&path, content)
                .with_context(|| format!("writing report {}", path.display()))?;
            log::info!("Generated {} report at {}", name, path.display());
            written.push(path);
        }

        Ok(written)
    }

    // ------------------------------------------------------------------
    // JSON
    // ------------------------------------------------------------------

    fn render_json(&self, data: &ReportData) -> anyhow::Result<String> {
        let actors: Vec<_> = data
            .actors
            .iter()
            .map(|actor| {
                json!({
                    "address": actor.address,
                    "threat_score": actor.threat_score,
                    "total_requests": actor.total_requests,
                    "unique_urls": actor.unique_urls,
                    "avg_entropy": actor.avg_entropy,
                    "max_entropy": actor.max_entropy,
                    "error_ratio": actor.error_ratio,
                    "url_diversity_ratio": actor.url_diversity_ratio,
                    "anomaly_ratio": actor.anomaly_ratio,
                    "centrality": actor.centrality,
                    "first_seen": actor.first_seen,
                    "last_seen": actor.last_seen,
                    "tags": actor.tags,
                    "mitre_techniques": mitre::techniques_for_tags(
                        actor.tags.iter().map(String::as_str)
                    )
                    .iter()
                    .map(|t| t.technique_id)
                    .collect::<Vec<_>>(),
                    "evidence_trail": actor.evidence_trail,
                })
            })
            .collect();

        let campaigns: Vec<_> = data
            .campaigns
            .iter()
            .map(|campaign| {
                json!({
                    "campaign_id": campaign.campaign_id,
                    "campaign_type": campaign.campaign_type,
                    "threat_score": campaign.threat_score,
                    "actors": campaign.actor_addresses,
                    "primary_tags": campaign.primary_tags,
                    "mitre_techniques": mitre::techniques_for_tags(
                        campaign.primary_tags.iter().map(String::as_str)
                    )
                    .iter()
                    .map(|t| t.technique_id)
                    .collect::<Vec<_>>(),
                    "evidence_trail": campaign.evidence_trail,
                })
            })
            .collect();

        let report = json!({
            "generator": format!("{} v{}", APP_NAME, APP_VERSION),
            "generated_at": Utc::now(),
            "summary": {
                "total_actors": data.actors.len(),
                "total_campaigns": data.campaigns.len(),
                "high_threat_actors": data.actors.iter().filter(|a| a.threat_score > 8.0).count(),
            },
            "context": data.context,
            "actors": actors,
            "campaigns": campaigns,
            "recommendations": data.recommendations,
        });

        Ok(serde_json::to_string_pretty(&report)?)
    }

    // ------------------------------------------------------------------
    // TEXT
    // ------------------------------------------------------------------

    fn render_text(&self, data: &ReportData) -> String {
        let mut out = String::new();
        let line = "=".repeat(78);

        out.push_str(&format!("{}\n{} THREAT ANALYSIS REPORT\n{}\n", line, APP_NAME, line));
        out.push_str(&format!(
            "Actors: {}   Campaigns: {}   Recommendations: {}\n\n",
            data.actors.len(),
            data.campaigns.len(),
            data.recommendations.len()
        ));

        let mut ranked: Vec<&ActorProfile> = data.actors.iter().collect();
        ranked.sort_by(|a, b| {
            b.threat_score
                .partial_cmp(&a.threat_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        out.push_str("TOP THREAT ACTORS\n");
        out.push_str(&format!("{}\n", "-".repeat(60)));
        for actor in ranked.iter().take(10) {
            let tags: Vec<&str> = actor.tags.iter().map(String::as_str).collect();
            out.push_str(&format!(
                "{:<18} score {:>8.2}  [{}]\n",
                actor.address,
                actor.threat_score,
                tags.join(", ")
            ));
            for record in actor
                .evidence_trail
                .iter()
                .rev()
                .take(self.config.evidence_display_limit)
            {
                out.push_str(&format!(
                    "    - {} ({:.2}): {}\n",
                    record.source, record.confidence, record.details
                ));
            }
        }

        if !data.campaigns.is_empty() {
            out.push_str(&format!("\nCAMPAIGNS\n{}\n", "-".repeat(60)));
            for campaign in data.campaigns {
                out.push_str(&format!(
                    "{} ({}): {} actors, score {:.2}\n",
                    campaign.campaign_id,
                    campaign.campaign_type,
                    campaign.member_count(),
                    campaign.threat_score
                ));
            }
        }

        if !data.recommendations.is_empty() {
            out.push_str(&format!("\nRECOMMENDATIONS\n{}\n", "-".repeat(60)));
            for recommendation in data.recommendations {
                out.push_str(&format!(
                    "[{}] {} - {}\n",
                    recommendation.priority.as_str(),
                    recommendation.category.as_str(),
                    recommendation.title
                ));
                for item in &recommendation.action_items {
                    out.push_str(&format!("    * {}\n", item));
                }
            }
        }

        out
    }

    // ------------------------------------------------------------------
    // HTML
    // ------------------------------------------------------------------

    fn render_html(&self, data: &ReportData) -> String {
        let mut actor_cards = String::new();
        let mut ranked: Vec<&ActorProfile> = data.actors.iter().collect();
        ranked.sort_by(|a, b| {
            b.threat_score
                .partial_cmp(&a.threat_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for actor in &ranked {
            let tags = actor
                .tags
                .iter()
                .map(|t| format!("<span class=\"tag\">{}</span>", escape(t)))
                .collect::<Vec<_>>()
                .join(" ");
            let techniques = mitre::techniques_for_tags(actor.tags.iter().map(String::as_str))
                .iter()
                .map(|t| mitre::format_reference(t))
                .collect::<Vec<_>>()
                .join("<br>");
            let evidence = actor
                .evidence_trail
                .iter()
                .rev()
                .take(self.config.evidence_display_limit)
                .map(|e| {
                    format!(
                        "<div class=\"evidence-entry\">{} ({:.2}): {}</div>",
                        e.source,
                        e.confidence,
                        escape(&e.details)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");

            actor_cards.push_str(&format!(
                r#"<div class="actor-card">
  <h3>{} &mdash; score {:.2}</h3>
  <div class="tags">{}</div>
  <div class="mitre">{}</div>
  <div class="evidence-trail">{}</div>
</div>
"#,
                escape(&actor.address),
                actor.threat_score.min(100.0),
                tags,
                techniques,
                evidence
            ));
        }

        let mut campaign_cards = String::new();
        for campaign in data.campaigns {
            campaign_cards.push_str(&format!(
                r#"<div class="campaign-card">
  <h3>{} ({})</h3>
  <p>{} actors &mdash; score {:.2}</p>
</div>
"#,
                escape(&campaign.campaign_id),
                escape(&campaign.campaign_type),
                campaign.member_count(),
                campaign.threat_score.min(100.0)
            ));
        }

        let mut recommendation_items = String::new();
        for recommendation in data.recommendations {
            recommendation_items.push_str(&format!(
                "<li><strong>[{}]</strong> {}</li>\n",
                recommendation.priority.as_str(),
                escape(&recommendation.title)
            ));
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{app} Threat Analysis Report</title>
<style>
body {{ font-family: 'Segoe UI', sans-serif; background: #1a1a1a; color: #fff; padding: 20px; }}
.container {{ max-width: 1100px; margin: 0 auto; background: #2d2d2d; padding: 30px; border-radius: 10px; }}
h1 {{ color: #00ff88; border-bottom: 2px solid #00ff88; padding-bottom: 14px; }}
.section {{ margin: 28px 0; padding: 18px; background: #3a3a3a; border-radius: 8px; border-left: 4px solid #00ff88; }}
.actor-card {{ background: #4a4a4a; padding: 14px; margin: 10px 0; border-radius: 5px; border-left: 3px solid #ff6b6b; }}
.campaign-card {{ background: #4a4a4a; padding: 14px; margin: 10px 0; border-radius: 5px; border-left: 3px solid #4ecdc4; }}
.tag {{ background: #00ff88; color: #1a1a1a; padding: 2px 8px; border-radius: 12px; font-size: 0.8em; font-weight: bold; }}
.evidence-trail {{ background: #555; padding: 10px; margin-top: 8px; border-radius: 5px; font-family: monospace; font-size: 0.85em; }}
.mitre {{ color: #9fd8ff; font-size: 0.85em; margin-top: 6px; }}
</style>
</head>
<body>
<div class="container">
<h1>{app} Threat Analysis Report</h1>
<p>Generated {generated} &mdash; {actor_count} actors, {campaign_count} campaigns</p>
<div class="section"><h2>Threat Actors</h2>
{actor_cards}</div>
<div class="section"><h2>Campaigns</h2>
{campaign_cards}</div>
<div class="section"><h2>Recommendations</h2><ul>
{recommendation_items}</ul></div>
</div>
</body>
</html>
"#,
            app = APP_NAME,
            generated = Utc::now().to_rfc3339(),
            actor_count = data.actors.len(),
            campaign_count = data.campaigns.len(),
            actor_cards = actor_cards,
            campaign_cards = campaign_cards,
            recommendation_items = recommendation_items,
        )
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ============================================================================
// TESTS
// ============================================================================
