pub mod cli;
pub mod client;

pub use cli::{run, Cli, Commands};
