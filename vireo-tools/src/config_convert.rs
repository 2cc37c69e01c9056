//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

use std::process::exit;

use clap::{App, Arg};
use tracing_subscriber::Layer;
use tracing_subscriber::prelude::*;
use vireo_vendor::config::VendorConfig;

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(
            tracing::level_filters::LevelFilter::INFO.into(),
        )
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .init();
}

fn main() {
    let matches = App::new("config_convert")
        .about(
            "Converts a parsed vendor configuration into the \
             vendor-independent model",
        )
        .arg(
            Arg::with_name("INPUT")
                .help("Vendor configuration JSON file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("model-only")
                .long("model-only")
                .help("Print the model without the diagnostics section"),
        )
        .get_matches();

    init_tracing();

    let path = matches.value_of("INPUT").unwrap();
    let data = std::fs::read_to_string(path).unwrap_or_else(|error| {
        eprintln!("failed to read {}: {}", path, error);
        exit(1);
    });
    let cfg: VendorConfig =
        serde_json::from_str(&data).unwrap_or_else(|error| {
            eprintln!("failed to parse {}: {}", path, error);
            exit(1);
        });

    let output = vireo_convert::convert(&cfg).unwrap_or_else(|error| {
        eprintln!("conversion failed: {}", error);
        exit(1);
    });

    let json = if matches.is_present("model-only") {
        serde_json::to_string_pretty(&output.model)
    } else {
        serde_json::to_string_pretty(&serde_json::json!({
            "model": output.model,
            "diagnostics": output.diagnostics,
        }))
    };
    // Serialization of the model cannot fail.
    println!("{}", json.unwrap());
}
