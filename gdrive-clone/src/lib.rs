pub mod cli;
pub mod load_config;

pub use cli::{normalize_args, run, Cli};
