//! Launcher configuration, job files and substitution

mod job_file;
mod launcher_config;
mod substitution;

pub use job_file::*;
pub use launcher_config::*;
pub use substitution::*;
