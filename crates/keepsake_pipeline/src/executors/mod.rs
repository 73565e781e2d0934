//! The five pipeline steps.

mod acquire;
mod compress;
mod replicate;
mod retire;

pub use acquire::{AcquireExecutor, AcquireOutcome};
pub use compress::CompressExecutor;
pub use replicate::ReplicateExecutor;
pub use retire::RetireExecutor;
