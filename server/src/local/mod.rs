//! Local tallies - one flat tally per client, stored as JSON files.

mod file_store;
mod registry;

pub use file_store::*;
pub use registry::*;
