pub mod metrics;
pub mod collector;
pub mod monitor;

pub use metrics::SenderMetrics;
pub use collector::{MetricsCollector, MetricsSnapshot};
pub use monitor::RecorderMonitor;
