//! Report output: the shared writer, diagnostic and timing aggregation,
//! message templates and plist files

pub mod aggregator;
pub mod plist;
pub mod sink;
pub mod template;
pub mod timing;

pub use aggregator::ResultAggregator;
pub use sink::ReportSink;
pub use template::{DEFAULT_TEMPLATE, MessageTemplate};
pub use timing::TimingAggregator;
