//! Worker side of the GUI: commands in, events out.

pub mod commands;
pub mod runtime;
