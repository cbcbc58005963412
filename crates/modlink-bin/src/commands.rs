// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command dispatch.

use modlink_config::{DeviceCatalog, Settings};

use crate::cli::{Cli, Commands};
use crate::error::{BinError, BinResult};
use crate::runtime::BridgeRuntime;

/// Executes the selected command; `run` is the default.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&cli.config).await,
        Commands::Validate => validate(&cli.config),
    }
}

async fn run(config: &std::path::Path) -> BinResult<()> {
    let settings =
        Settings::load(config).map_err(|e| BinError::Configuration(e.to_string()))?;
    BridgeRuntime::new(settings).run().await
}

/// Validates settings and every catalog entry without starting anything.
fn validate(config: &std::path::Path) -> BinResult<()> {
    let settings =
        Settings::load(config).map_err(|e| BinError::Configuration(e.to_string()))?;

    let catalog = DeviceCatalog::new(&settings.catalog_path);
    let devices = catalog
        .load()
        .map_err(|e| BinError::Configuration(e.to_string()))?;

    let mut failures = 0;
    let mut seen = std::collections::HashSet::new();
    for device in &devices {
        if let Err(error) = device.validate(&settings.modem_ports()) {
            eprintln!("device '{}': {}", device.id, error);
            failures += 1;
        }
        if !device.id.is_empty() && !seen.insert(device.id.clone()) {
            eprintln!("device '{}': duplicate id", device.id);
            failures += 1;
        }
    }

    if failures > 0 {
        return Err(BinError::Configuration(format!(
            "{} of {} catalog entries failed validation",
            failures,
            devices.len()
        )));
    }

    println!(
        "settings ok, {} catalog entries valid ({})",
        devices.len(),
        settings.catalog_path.display()
    );
    Ok(())
}
