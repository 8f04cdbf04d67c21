//! Command handlers for the opsdiag CLI.

pub mod search;
pub mod serve;
pub mod sync;

mod bootstrap;

pub use search::SearchCommand;
pub use serve::ServeCommand;
pub use sync::SyncCommand;
