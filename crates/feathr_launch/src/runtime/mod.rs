//! Command construction, job processes and the local launcher

pub mod command;
pub mod launcher;
pub mod process;
pub mod tail;

pub use command::*;
pub use launcher::*;
pub use process::*;
pub use tail::*;
