pub mod distribution;
pub mod process;

pub use distribution::{DistributionOutcome, DistributionService};
pub use process::{ProcessOutcome, ProcessRequest, ProcessService};
