//! Threat Intelligence
//!
//! External knowledge: IoC feeds and the MITRE ATT&CK technique catalog.

pub mod ioc;
pub mod mitre;

pub use ioc::{IocManager, IocMatch};
