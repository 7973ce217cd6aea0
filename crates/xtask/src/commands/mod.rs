//! Command implementations for xtask
//!
//! Each command is a separate module that implements its own CLI args and execution logic.

mod clean;
mod inspect;
mod list;
mod recover;

pub use clean::Clean;
pub use inspect::Inspect;
pub use list::List;
pub use recover::Recover;
