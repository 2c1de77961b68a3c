//! Analysis Pipeline
//!
//! Staged batch processing: ingestion -> enrichment -> profiling ->
//! detection -> meta-detection -> scoring -> campaign clustering ->
//! recommendations -> reporting.
//!
//! Thứ tự stage là hard precondition: detectors đọc context của detector
//! trước, meta-detection chỉ được chạy một lần. `AnalysisContext` asserts
//! the order at every stage entry.

pub mod context;
pub mod detectors;
pub mod enrichment;
pub mod ingestion;
pub mod metadetector;
pub mod profiling;
pub mod recommendations;
pub mod reporting;

use std::path::PathBuf;
use std::time::Instant;

use crate::config::AppConfig;
use crate::intelligence::IocManager;
use crate::models::{ActorProfile, ThreatCampaign};
use crate::scoring::ScoringEngine;
use context::{AnalysisContext, Stage};
use detectors::{
    anomaly::AnomalyDetector, clustering::BehavioralClusteringDetector, graph::GraphDetector,
    temporal::TemporalDetector, Detector,
};
use enrichment::EnrichmentStage;
use ingestion::LogIngestionStage;
use metadetector::MetaDetector;
use profiling::{ActorProfilingStage, HeuristicPromotionStage};
use recommendations::{NarrativeEngine, Recommendation};
use reporting::{ReportData, ReportingStage};

// ============================================================================
// OUTCOME
// ============================================================================

pub struct PipelineOutcome {
    pub actors: Vec<ActorProfile>,
    pub campaigns: Vec<ThreatCampaign>,
    pub recommendations: Vec<Recommendation>,
    pub report_paths: Vec<PathBuf>,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct AnalysisPipeline {
    config: AppConfig,
}

impl AnalysisPipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run the full batch pipeline to completion.
    pub fn run(&self) -> anyhow::Result<PipelineOutcome> {
        let started = Instant::now();
        let mut ctx = AnalysisContext::new();

        log::info!("=== Stage 1: Ingestion ===");
        ctx.enter_stage(Stage::Ingestion);
        let events = LogIngestionStage::new(self.config.ingestion.clone()).ingest()?;

        log::info!("=== Stage 2: Enrichment ===");
        ctx.enter_stage(Stage::Enrichment);
        let events = EnrichmentStage::new(self.config.pipeline.parallel.clone()).process(events);

        let ioc_manager = self.load_ioc_feeds();

        log::info!("=== Stage 3: Profiling ===");
        ctx.enter_stage(Stage::Profiling);
        let mut actors = ActorProfilingStage.process(events);
        HeuristicPromotionStage::new().process(&mut actors, ioc_manager.as_ref());

        log::info!("=== Stage 4: Detection ===");
        ctx.enter_stage(Stage::Detection);
        let detection = &self.config.detection;
        let detector_chain: Vec<Box<dyn Detector>> = vec![
            Box::new(TemporalDetector::new(detection.temporal.clone())),
            Box::new(GraphDetector::new(detection.graph.clone())),
            Box::new(AnomalyDetector::new(detection.anomaly.clone())),
            Box::new(BehavioralClusteringDetector),
        ];
        for detector in &detector_chain {
            log::info!("Running {}", detector.name());
            detector.detect(&mut actors, &mut ctx);
        }

        log::info!("=== Stage 5: Meta-Detection ===");
        ctx.enter_stage(Stage::MetaDetection);
        let meta_summary = MetaDetector::new(&self.config.meta).detect(&mut actors);
        ctx.meta_summary = Some(meta_summary);

        log::info!("=== Stage 6: Scoring ===");
        ctx.enter_stage(Stage::Scoring);
        let scoring_engine = ScoringEngine::new(self.config.scoring.clone());
        scoring_engine.score_actors(&mut actors, &ctx);

        log::info!("=== Stage 7: Campaign Clustering ===");
        ctx.enter_stage(Stage::Clustering);
        let campaigns = scoring_engine.cluster_campaigns(&mut actors);

        log::info!("=== Stage 8: Recommendations ===");
        let recommendations = NarrativeEngine.generate(&actors, &campaigns);

        log::info!("=== Stage 9: Reporting ===");
        ctx.enter_stage(Stage::Reporting);
        let report_paths = ReportingStage::new(self.config.reporting.clone())
            .generate_reports(&ReportData {
                actors: &actors,
                campaigns: &campaigns,
                context: &ctx,
                recommendations: &recommendations,
            })?;

        log::info!(
            "Pipeline completed in {:.2}s: {} actors, {} campaigns",
            started.elapsed().as_secs_f64(),
            actors.len(),
            campaigns.len()
        );

        Ok(PipelineOutcome {
            actors,
            campaigns,
            recommendations,
            report_paths,
        })
    }

    fn load_ioc_feeds(&self) -> Option<IocManager> {
        if !self.config.ioc_feeds.enabled {
            return None;
        }
        log::info!("=== Stage 2.5: IoC Intelligence ===");
        let mut manager = IocManager::from_config(&self.config.ioc_feeds);
        manager.update_feeds();
        manager.is_enabled().then_some(manager)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// A coordinated trio probing the same LFI target every 30 seconds,
    /// plus one quiet browser-like visitor.
    fn write_sample_log(file: &mut impl Write) {
        for minute in 0..10 {
            for second in [0, 30] {
                for (octet, agent) in [(10, "sqlmap/1.7"), (11, "sqlmap/1.7"), (12, "sqlmap/1.7")]
                {
                    writeln!(
                        file,
                        "198.51.100.{} - - [01/Mar/2024:12:{:02}:{:02} +0000] \
                         \"GET /view.php?page=../../etc/passwd HTTP/1.1\" 200 512 \"-\" \"{}\"",
                        octet, minute, second, agent
                    )
                    .unwrap();
                }
            }
        }
        for (minute, page) in [(0, "/index.html"), (7, "/about.html"), (14, "/contact.html")] {
            writeln!(
                file,
                "203.0.113.9 - - [01/Mar/2024:12:{:02}:11 +0000] \
                 \"GET {} HTTP/1.1\" 200 1024 \"-\" \"Mozilla/5.0\"",
                minute, page
            )
            .unwrap();
        }
    }

    fn test_config(log_path: &str, output_dir: &str) -> AppConfig {
        let yaml = format!(
            r#"
ingestion:
  format: nginx
  log_path: "{}"
scoring:
  scoring_profiles:
    LFI_ATTACK:
      base_score: 8.0
      modifiers:
        - if: coordinated_attack
          value: 1.5
    PATH_TRAVERSAL:
      base_score: 7.0
    BOT_ACTIVITY:
      base_score: 4.0
  tag_combinations:
    "BOT_ACTIVITY+COORDINATED_ATTACK":
      multiplier: 1.6
reporting:
  output_dir: "{}"
"#,
            log_path, output_dir
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn test_end_to_end_coordinated_lfi_scenario() {
        let mut log_file = tempfile::NamedTempFile::new().unwrap();
        write_sample_log(&mut log_file);
        log_file.flush().unwrap();
        let output_dir = tempfile::tempdir().unwrap();

        let config = test_config(
            &log_file.path().to_string_lossy(),
            &output_dir.path().to_string_lossy(),
        );

        let outcome = AnalysisPipeline::new(config).run().unwrap();

        assert_eq!(outcome.actors.len(), 4);

        // The three attackers carry attack tags and outscore the visitor
        let attackers: Vec<_> = outcome
            .actors
            .iter()
            .filter(|a| a.address.starts_with("198.51.100."))
            .collect();
        let visitor = outcome
            .actors
            .iter()
            .find(|a| a.address == "203.0.113.9")
            .unwrap();

        for attacker in &attackers {
            assert!(attacker.has_tag("LFI_ATTACK"));
            assert!(attacker.has_tag("PATH_TRAVERSAL"));
            assert!(attacker.has_tag("BOT_ACTIVITY"));
            assert!(attacker.threat_score > 8.0);
            assert!(attacker.threat_score > visitor.threat_score);
        }

        // Identical behavior clusters into one campaign of three
        assert_eq!(outcome.campaigns.len(), 1);
        assert_eq!(outcome.campaigns[0].member_count(), 3);
        assert!(attackers.iter().all(|a| a.has_tag("COORDINATED_ATTACK")));

        // Reports land on disk
        assert_eq!(outcome.report_paths.len(), 3);
        for path in &outcome.report_paths {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_pipeline_with_empty_log_completes() {
        let log_file = tempfile::NamedTempFile::new().unwrap();
        let output_dir = tempfile::tempdir().unwrap();
        let config = test_config(
            &log_file.path().to_string_lossy(),
            &output_dir.path().to_string_lossy(),
        );

        let outcome = AnalysisPipeline::new(config).run().unwrap();
        assert!(outcome.actors.is_empty());
        assert!(outcome.campaigns.is_empty());
        assert!(outcome.recommendations.is_empty());
    }
}
