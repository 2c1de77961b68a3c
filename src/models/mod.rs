//! Data Models
//!
//! Core entities của pipeline: log events, actor profiles, campaigns,
//! evidence trail.
//!
//! ## Structure
//! - `event`: parsed log line with computed features
//! - `actor`: per-source-address behavioral profile
//! - `campaign`: cluster of actors acting in concert
//! - `evidence`: append-only audit records

pub mod actor;
pub mod campaign;
pub mod event;
pub mod evidence;

pub use actor::ActorProfile;
pub use campaign::ThreatCampaign;
pub use event::LogEvent;
pub use evidence::{EvidenceRecord, EvidenceSource};
