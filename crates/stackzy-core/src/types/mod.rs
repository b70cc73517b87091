mod app;
mod config;
mod library;
mod progress;
mod report;
mod result;
mod source;
mod state;

pub use app::*;
pub use config::*;
pub use library::*;
pub use progress::*;
pub use report::*;
pub use result::*;
pub use source::*;
pub use state::*;
