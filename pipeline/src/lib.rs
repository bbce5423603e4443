pub mod bench;
pub mod config;
pub mod device;
pub mod error;
pub mod eval;
pub mod loop_;
pub mod metrics;
pub mod schedule;
pub mod slot;

pub use config::{BenchConfig, HarnessConfig, PipelineConfig};
pub use error::{PipelineErr, Result};
pub use loop_::TrainLoop;
pub use metrics::{EpochReport, PipelineMetrics, TrainReport};
