//! Background jobs and the runner that drives them.

mod pool_metrics;
mod runner;
mod sales_report;

pub use pool_metrics::PoolMetricsJob;
pub use runner::{run_once, Job, JobRunner, RunOutcome};
pub use sales_report::SalesReportJob;
