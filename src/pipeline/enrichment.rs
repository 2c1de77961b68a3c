//! Event Enrichment
//!
//! Per-event feature calculation. Each event is independent, so the stage
//! optionally fans out over a fixed-size worker pool; results do not depend
//! on processing order.

use rayon::prelude::*;

use crate::config::ParallelConfig;
use crate::models::LogEvent;

pub struct EnrichmentStage {
    parallel: ParallelConfig,
}

impl EnrichmentStage {
    pub fn new(parallel: ParallelConfig) -> Self {
        Self { parallel }
    }

    pub fn process(&self, events: Vec<LogEvent>) -> Vec<LogEvent> {
        log::info!("Enriching {} events", events.len());

        if self.parallel.enabled {
            let workers = self.parallel.max_workers.max(1);
            log::info!("Using parallel enrichment with {} workers", workers);

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build();

            match pool {
                Ok(pool) => {
                    return pool.install(|| {
                        events
                            .into_par_iter()
                            .map(|mut event| {
                                event.calculate_features();
                                event
                            })
                            .collect()
                    });
                }
                Err(e) => {
                    log::warn!("Worker pool unavailable ({}), enriching sequentially", e);
                }
            }
        }

        events
            .into_iter()
            .map(|mut event| {
                event.calculate_features();
                event
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
