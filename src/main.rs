//! AccessGuard - Main Entry Point
//!
//! Batch pipeline: đọc access log, dựng actor profiles, chạy detectors,
//! cross-validation, scoring, campaign clustering và xuất reports.

mod cli;
mod config;
pub mod constants;
mod intelligence;
mod models;
mod pipeline;
mod scoring;

use clap::Parser;

use cli::Cli;
use config::AppConfig;
use pipeline::AnalysisPipeline;

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_level.as_str()),
    )
    .init();

    log::info!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);

    let mut config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // CLI overrides
    if let Some(log_file) = &cli.log_file {
        config.ingestion.log_path = log_file.to_string_lossy().to_string();
    }
    if let Some(format) = cli.format {
        config.ingestion.format = format;
    }
    if let Some(output_dir) = &cli.output_dir {
        config.reporting.output_dir = output_dir.to_string_lossy().to_string();
    }

    match AnalysisPipeline::new(config).run() {
        Ok(outcome) => {
            println!("\nAnalysis complete.");
            println!("  Actors profiled:   {}", outcome.actors.len());
            println!("  Campaigns found:   {}", outcome.campaigns.len());
            println!("  Recommendations:   {}", outcome.recommendations.len());

            let mut ranked: Vec<_> = outcome.actors.iter().collect();
            ranked.sort_by(|a, b| {
                b.threat_score
                    .partial_cmp(&a.threat_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            if let Some(top) = ranked.first().filter(|a| a.threat_score > 0.0) {
                println!(
                    "  Highest threat:    {} (score {:.2})",
                    top.address, top.threat_score
                );
            }
            for path in &outcome.report_paths {
                println!("  Report: {}", path.display());
            }
        }
        Err(e) => {
            log::error!("Pipeline failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
