//! Request handlers for the local tally and entry batches.

mod batches;
mod local;

pub use batches::*;
pub use local::*;
