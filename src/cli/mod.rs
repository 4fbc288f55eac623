pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ConfigArgs, OrganizeArgs, SubjectsArgs};
pub use output::{OutputFormat, OutputFormatter};
