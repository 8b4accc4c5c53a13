//! HTTP request handlers.

mod download;
mod health;
mod pages;
mod process;

pub use download::download_artifact;
pub use health::{health_check, metrics_handler};
pub use pages::{landing_page, module_page};
pub use process::process_module;
