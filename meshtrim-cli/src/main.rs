//! meshtrim - reduce the polygon count of a mesh file.
//!
//! Usage: meshtrim -i <INPUT> -o <OUTPUT> [-f <FACES> | -v <VERTICES>] [OPTIONS]
//!
//! Run `meshtrim --help` for all options.

use clap::Parser;
use meshtrim_cli::{run, Args};
use std::process;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            println!("{}", e);
            process::exit(-1);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    match run(&args) {
        Ok(report) => {
            log::info!(
                "{} collapses, {} -> {} faces{}",
                report.collapses,
                report.initial_faces,
                report.final_faces,
                if report.target_reached {
                    ""
                } else {
                    " (target not reached)"
                }
            );
        }
        Err(e) => {
            println!("Error: {:#}", e);
            process::exit(-1);
        }
    }
}
