//! Thin CLI entry point: parse `structopt` arguments and forward to
//! `commands::dispatch`.
//!
//! This binary has no real `DebuggerHost` of its own; the engine is
//! embedded in an interactive debugger in production. It exists to exercise
//! argument parsing and command dispatch against a host adapter supplied by
//! whatever process embeds this crate; see `rdpt::host::DebuggerHost`.

use rdpt::commands::{dispatch, PtOptions};
use rdpt::host::DebuggerHost;
use rdpt::manager::Manager;
use structopt::StructOpt;

fn main() {
    env_logger::init();

    let opts = PtOptions::from_args();
    let manager = Manager::new();

    match unembedded_host() {
        Some(host) => match dispatch(&opts, host.as_ref(), &manager) {
            Ok(message) => println!("{}", message),
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            eprintln!(
                "rdpt has no standalone debugger host; embed it in a debugger \
                 and implement rdpt::host::DebuggerHost to drive this command surface."
            );
            std::process::exit(1);
        }
    }
}

/// Placeholder for the real host adapter a debugger embedding this crate
/// would supply. There is no standalone PT-capable host in this binary.
fn unembedded_host() -> Option<Box<dyn DebuggerHost>> {
    None
}
