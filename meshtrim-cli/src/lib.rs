//! Command-line front end for meshtrim
//!
//! [`args`] holds the command-line surface and its translation into a
//! decimation configuration; [`pipeline`] runs import, decimation and export.

pub mod args;
pub mod pipeline;

pub use args::Args;
pub use pipeline::run;
