//! Bulk-update the parameter store from a TOML file.
//!
//! Usage: `update-config [config_file]` (defaults to `config.toml`).
//! The store location follows `FANOUT_PARAMS_PATH` like the main service.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};

use listing_fanout::config::update::{apply_config_file, DEFAULT_CONFIG_FILE};
use listing_fanout::config::FileParameterStore;
use listing_fanout::telemetry;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let file = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    info!(file = %file.display(), "reading configuration");

    let store = match FileParameterStore::open_default() {
        Ok(s) => s,
        Err(e) => {
            error!(error = ?e, "cannot open parameter store");
            return ExitCode::FAILURE;
        }
    };

    match apply_config_file(&store, &file) {
        Ok(report) => {
            info!(
                updated = report.updated,
                skipped = report.skipped,
                store = %store.path().display(),
                "configuration updated successfully"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = ?e, "configuration update failed");
            ExitCode::FAILURE
        }
    }
}
