//! Detection Engines
//!
//! Các detector chạy tuần tự, mỗi detector đọc context do detector trước
//! ghi - thứ tự là ràng buộc đúng đắn, không phải tối ưu.
//!
//! ## Structure
//! - `temporal`: spectral/autocorrelation periodicity analysis
//! - `graph`: behavioral similarity graph (centrality, clustering coeff)
//! - `anomaly`: z-score anomaly detection against the batch baseline
//! - `clustering`: behavioral vector clustering

pub mod anomaly;
pub mod clustering;
pub mod graph;
pub mod temporal;

use crate::models::ActorProfile;
use crate::pipeline::context::AnalysisContext;

/// A detection stage over the full actor batch.
///
/// Detectors mutate actor tags/evidence and write their summary section
/// into the shared context. They must not run concurrently with each other.
pub trait Detector {
    fn name(&self) -> &'static str;
    fn detect(&self, actors: &mut [ActorProfile], context: &mut AnalysisContext);
}
