//! API endpoint modules.

mod libraries;
mod remote_config;
mod results;
mod untracked;

pub use libraries::LibrariesApi;
pub use remote_config::ConfigApi;
pub use results::{ResultsApi, NO_DATA_FOUND};
pub use untracked::{UntrackedApi, UntrackedLibrary};
