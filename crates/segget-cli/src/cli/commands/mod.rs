//! CLI command handlers, one per file.

mod completions;
mod drive;
mod forget;
mod get;
mod resume;
mod status;

pub use completions::run_completions;
pub use forget::run_forget;
pub use get::run_get;
pub use resume::run_resume;
pub use status::run_status;
