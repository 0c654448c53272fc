use anyhow::{bail, Result};
use std::path::Path;

use crate::config::Config;
use crate::extractor::{self, ExtractOptions, ExtractionResult};
use crate::fs::RealFileSystem;
use crate::logging;

pub fn run(
    config: &Config,
    base_dir: &Path,
    output: Option<String>,
    dry_run: bool,
    fail_on_warnings: bool,
) -> Result<ExtractionResult> {
    logging::info("=== i18next-harvest extract ===\n");

    let mut options = ExtractOptions::new(config, base_dir).with_dry_run(dry_run);
    if let Some(output) = output {
        options = options.with_output_dir(output);
    }

    logging::info("Configuration:");
    logging::info(&format!("  Input patterns: {:?}", config.input));
    if !config.ignore.is_empty() {
        logging::info(&format!("  Ignore patterns: {:?}", config.ignore));
    }
    logging::info(&format!("  Output: {}", options.label(&options.output_dir)));
    logging::info(&format!("  Locales: {:?}", config.locales));
    logging::info(&format!("  Default namespace: {}", config.default_namespace));
    if dry_run {
        logging::info("  Dry run: no files will be written");
    }
    logging::info("");

    let extraction = extractor::extract_from_glob(config, &RealFileSystem, &options)?;
    report(&extraction, &options);

    if !extraction.errors.is_empty() {
        bail!(
            "{} file(s) failed to extract",
            extraction.errors.len()
        );
    }
    if fail_on_warnings && extraction.warning_count > 0 {
        bail!(
            "{} warning(s) encountered (--fail-on-warnings enabled)",
            extraction.warning_count
        );
    }

    Ok(extraction)
}

fn report(extraction: &ExtractionResult, options: &ExtractOptions) {
    if !extraction.errors.is_empty() {
        logging::error("Extraction errors:");
        for error in &extraction.errors {
            logging::error(&format!("  {}: {}", error.file_path, error.message));
        }
    }

    if extraction.units.is_empty() {
        logging::info("No translatable messages found.");
        return;
    }

    logging::info("Messages by file:");
    logging::info(&"-".repeat(60));

    let mut total_added = 0;
    for unit in &extraction.units {
        logging::info(&format!(
            "{} - {} message(s) in {}",
            unit.file,
            unit.message_count,
            unit.namespaces.join(", ")
        ));
        for conflict in &unit.conflicts {
            logging::warn(&format!("{}: {}", unit.file, conflict));
        }
        for write in unit.writes.iter().filter(|w| !w.added_keys.is_empty()) {
            logging::info(&format!(
                "  {} - added {} new key(s)",
                options.label(&write.path),
                write.added_keys.len()
            ));
            for key in &write.added_keys {
                logging::debug(&format!("    + {}", key));
            }
            total_added += write.added_keys.len();
        }
    }

    logging::info(&"-".repeat(60));
    logging::info("\nExtraction Summary:");
    logging::info(&format!("  Files with messages: {}", extraction.units.len()));
    logging::info(&format!("  Messages: {}", extraction.message_count()));
    if total_added == 0 {
        logging::info("  No new keys added (all keys already exist).");
    } else if options.dry_run {
        logging::info(&format!("  Keys that would be added: {}", total_added));
    } else {
        logging::info(&format!("  Keys added: {}", total_added));
    }
    if extraction.warning_count > 0 {
        logging::info(&format!("  Warnings: {}", extraction.warning_count));
    }
}
