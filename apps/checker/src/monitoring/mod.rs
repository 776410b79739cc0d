/// Monitoring engine module - probes monitors and keeps their schedule
///
/// This module is responsible for:
/// - Executing ping (TCP) and website (HTTP) checks
/// - Recording outcomes and computing the next due time
/// - Tracking every monitor's schedule and applying update flags
/// - Driving all of the above from a fixed tick
pub mod checker;
pub mod dispatch;
pub mod executor;
pub mod recorder;
pub mod registry;
pub mod schedule;
pub mod scheduler;
pub mod stats;
pub mod types;
pub mod validation;


pub use dispatch::CheckRunner;
pub use executor::ProbeExecutor;
pub use registry::MonitorRegistry;
pub use scheduler::{MonitoringScheduler, SchedulerSettings};
