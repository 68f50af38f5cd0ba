//! Database module for PostgreSQL persistence.

mod entries;
mod pool;
mod roster;

pub use entries::*;
pub use pool::*;
pub use roster::*;
