use clap::Parser;
use log::{debug, warn};
use snafu::ErrorCompat;
use std::error::Error;

mod args;
mod sheet;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    debug!("args: {:?}", args);

    if let Err(e) = sheet::run(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        let mut cause = e.source();
        while let Some(c) = cause {
            eprintln!("  caused by: {}", c);
            cause = c.source();
        }
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
