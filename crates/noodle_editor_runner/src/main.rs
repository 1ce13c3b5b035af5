// SPDX-License-Identifier: MIT OR Apache-2.0
//! `noodle-run` - headless runner for Noodle Editor projects.
//!
//! Loads a project document with the built-in node types, executes it once and
//! prints every node's output values and debug displays.

mod run;

use noodle_editor_graph::LogSinkLayer;
use run::{run_project, RunArgs};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> ExitCode {
    let (sink_layer, log_rx) = LogSinkLayer::new();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("noodle_editor_graph=info,noodle_editor_runner=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sink_layer)
        .init();

    let args = match RunArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let code = match run_project(Path::new(&args.project)).await {
        Ok(summary) => {
            print!("{}", summary.render());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Run failed: {e}");
            ExitCode::FAILURE
        }
    };

    if args.show_log {
        for event in log_rx.try_iter() {
            println!("{}", event.format_line());
        }
    }
    code
}
