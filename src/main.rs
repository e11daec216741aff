// Without the GTK front-end some core operations have no caller.
#![cfg_attr(not(feature = "gtk"), allow(dead_code))]

mod bench;
mod config;
mod error;
mod grid;
mod layout;
mod models;
mod scanner;

#[cfg(feature = "gtk")]
mod app;
#[cfg(feature = "gtk")]
mod ui;

use std::path::PathBuf;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("packgrid=info".parse().unwrap()),
        )
        .init();

    match bench::maybe_parse_args() {
        Ok(Some(args)) => match bench::run_simulation(args) {
            Ok(code) => std::process::exit(code),
            Err(err) => {
                eprintln!("Simulation failed: {:#}", err);
                std::process::exit(1);
            }
        },
        Ok(None) => {}
        Err(err) => {
            eprintln!("Invalid simulation arguments: {:#}", err);
            std::process::exit(2);
        }
    }

    let dir = std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with('-'))
        .map(PathBuf::from);
    std::process::exit(run_gui(dir));
}

#[cfg(feature = "gtk")]
fn run_gui(dir: Option<PathBuf>) -> i32 {
    app::PackGridApp::new(dir).run()
}

#[cfg(not(feature = "gtk"))]
fn run_gui(dir: Option<PathBuf>) -> i32 {
    tracing::error!(
        ?dir,
        "packgrid was built without the `gtk` feature; use --simulate or rebuild with --features gtk"
    );
    2
}
