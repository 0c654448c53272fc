//! Static extraction of react-i18next messages into per-locale,
//! per-namespace JSON catalogs.
//!
//! Each source file is one compiled unit: it is parsed, its translatable
//! calls and components are collected into descriptors, and the resulting
//! catalog is merged into `<output>/<locale>/<namespace>.json`. Existing
//! translations always win over extracted defaults.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod extractor;
pub mod fs;
pub mod logging;
pub mod markup;
pub mod matcher;
pub mod namespace;
pub mod node;
pub mod unit;
pub mod watcher;

#[cfg(feature = "napi")]
use napi::bindgen_prelude::*;
#[cfg(feature = "napi")]
use napi_derive::napi;

#[cfg(feature = "napi")]
use crate::config::{Config, NapiConfig};

#[cfg(feature = "napi")]
fn napi_base_dir() -> Result<std::path::PathBuf> {
    std::env::current_dir()
        .map_err(|e| napi::Error::from_reason(format!("Failed to read the working directory: {}", e)))
}

/// Extract messages from source files and merge them into the catalogs
///
/// # Returns
/// Returns a JSON string with extraction results
#[napi]
#[cfg(feature = "napi")]
pub fn extract(config: NapiConfig, options: Option<ExtractOptions>) -> Result<String> {
    let config: Config = Config::from_napi(config)
        .map_err(|e| napi::Error::from_reason(format!("Config validation failed: {}", e)))?;

    let fail_on_warnings = options.as_ref().and_then(|o| o.fail_on_warnings).unwrap_or(false);
    let dry_run = options.as_ref().and_then(|o| o.dry_run).unwrap_or(false);
    let mut run_options =
        crate::extractor::ExtractOptions::new(&config, napi_base_dir()?).with_dry_run(dry_run);
    if let Some(output) = options.as_ref().and_then(|o| o.output.clone()) {
        run_options = run_options.with_output_dir(output);
    }

    let extraction =
        crate::extractor::extract_from_glob(&config, &crate::fs::RealFileSystem, &run_options)
            .map_err(|e| napi::Error::from_reason(format!("Extraction failed: {}", e)))?;

    if fail_on_warnings && extraction.warning_count > 0 {
        return Err(napi::Error::from_reason(format!(
            "Failed: {} warning(s) encountered (fail_on_warnings enabled)",
            extraction.warning_count
        )));
    }

    let updated_files: Vec<String> = extraction
        .units
        .iter()
        .flat_map(|unit| unit.writes.iter())
        .filter(|write| write.changed)
        .map(|write| run_options.label(&write.path))
        .collect();

    Ok(serde_json::json!({
        "success": extraction.errors.is_empty(),
        "files_processed": extraction.units.len(),
        "messages": extraction.message_count(),
        "keys_added": extraction.units.iter().map(|u| u.added_key_count()).sum::<usize>(),
        "updated_files": updated_files,
        "warnings": extraction.warning_count,
        "errors": extraction.errors.iter().map(|e| serde_json::json!({
            "file_path": e.file_path,
            "message": e.message,
        })).collect::<Vec<_>>(),
    })
    .to_string())
}

/// Watch for file changes and extract messages automatically
///
/// # Note
/// This function runs indefinitely until interrupted. In a Node.js context,
/// this should be called in a separate thread or worker.
#[napi]
#[cfg(feature = "napi")]
pub fn watch(config: NapiConfig, options: Option<WatchOptions>) -> Result<()> {
    let config: Config = Config::from_napi(config)
        .map_err(|e| napi::Error::from_reason(format!("Config validation failed: {}", e)))?;
    let output = options.and_then(|o| o.output);

    let watcher = crate::watcher::FileWatcher::new(config, napi_base_dir()?, output)
        .map_err(|e| napi::Error::from_reason(format!("Watch failed: {}", e)))?;
    watcher
        .run()
        .map_err(|e| napi::Error::from_reason(format!("Watch failed: {}", e)))?;

    Ok(())
}

/// Extract options
#[cfg(feature = "napi")]
#[napi(object)]
pub struct ExtractOptions {
    /// Output directory (overrides config)
    pub output: Option<String>,
    /// Fail on warnings
    pub fail_on_warnings: Option<bool>,
    /// Compute changes without writing any file
    pub dry_run: Option<bool>,
}

/// Watch options
#[cfg(feature = "napi")]
#[napi(object)]
pub struct WatchOptions {
    /// Output directory (overrides config)
    pub output: Option<String>,
}
