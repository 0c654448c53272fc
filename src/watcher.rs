use anyhow::{Context, Result};
use glob::Pattern;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::config::Config;
use crate::extractor::{self, ExtractOptions};
use crate::fs::RealFileSystem;
use crate::logging;

/// Extensions the front end can parse
const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

/// Re-extracts changed units into the catalogs.
///
/// Catalogs only ever gain keys, so a removed file needs no catalog update.
pub struct FileWatcher {
    config: Config,
    options: ExtractOptions,
    input: Vec<Pattern>,
    ignore: Vec<Pattern>,
    debounce_duration: Duration,
}

impl FileWatcher {
    pub fn new(config: Config, base_dir: impl Into<PathBuf>, output_dir: Option<String>) -> Result<Self> {
        let mut options = ExtractOptions::new(&config, base_dir);
        if let Some(output) = output_dir {
            options = options.with_output_dir(output);
        }
        let input = extractor::compile_patterns(&config.input, "input")?;
        let ignore = extractor::compile_patterns(&config.ignore, "ignore")?;
        Ok(Self {
            config,
            options,
            input,
            ignore,
            debounce_duration: Duration::from_millis(300),
        })
    }

    /// Run the file watcher, blocking until interrupted
    pub fn run(&self) -> Result<()> {
        let (tx, rx) = channel();

        let mut debouncer = new_debouncer(self.debounce_duration, tx)
            .context("Failed to create file watcher")?;

        let watch_dirs = compute_watch_dirs(&self.config.input, &self.options.base_dir);
        if watch_dirs.is_empty() {
            anyhow::bail!("No valid directories found to watch from input patterns");
        }

        for dir in &watch_dirs {
            logging::info(&format!("Watching: {}", dir.display()));
            debouncer
                .watcher()
                .watch(dir, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;
        }

        logging::info("\nWatching for changes... (Ctrl+C to stop)\n");

        self.full_extract()?;

        // Ends when the debouncer drops its sender
        while let Ok(result) = rx.recv() {
            self.handle_events(result);
        }

        Ok(())
    }

    fn full_extract(&self) -> Result<()> {
        logging::info("--- Initial extraction ---");

        let extraction = extractor::extract_from_glob(&self.config, &RealFileSystem, &self.options)?;
        for error in &extraction.errors {
            logging::error(&format!("{}: {}", error.file_path, error.message));
        }

        let added: usize = extraction
            .units
            .iter()
            .map(|unit| unit.added_key_count())
            .sum();
        logging::info(&format!("  Files with messages: {}", extraction.units.len()));
        logging::info(&format!("  Messages: {}", extraction.message_count()));
        if added > 0 {
            logging::info(&format!("  New keys added: {}", added));
        }
        if extraction.warning_count > 0 {
            logging::info(&format!("  Warnings: {}", extraction.warning_count));
        }
        logging::info("--- Ready ---\n");

        Ok(())
    }

    fn handle_events(&self, result: DebounceEventResult) {
        let events = match result {
            Ok(events) => events,
            Err(error) => {
                logging::error(&format!("Watch error: {:?}", error));
                return;
            }
        };

        let changed = self.changed_units(events.into_iter().map(|event| event.path));
        if changed.is_empty() {
            return;
        }

        logging::info("--- Change detected ---");
        for path in &changed {
            logging::info(&format!("  Modified: {}", self.options.label(path)));
        }
        self.incremental_extract(&changed);
        logging::info("--- Sync complete ---\n");
    }

    /// Existing source files among `paths` that a full extraction would pick
    /// up, sorted and de-duplicated
    fn changed_units(&self, paths: impl Iterator<Item = PathBuf>) -> Vec<PathBuf> {
        paths
            .filter(|path| should_process_file(path))
            .filter(|path| path.is_file())
            .filter(|path| extractor::matches_any(path, &self.input, &self.options))
            .filter(|path| !extractor::matches_any(path, &self.ignore, &self.options))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn incremental_extract(&self, changed: &[PathBuf]) {
        use rayon::prelude::*;

        let outcomes: Vec<_> = changed
            .par_iter()
            .map(|path| {
                let outcome =
                    extractor::extract_from_file(path, &self.config, &RealFileSystem, &self.options);
                (path, outcome)
            })
            .collect();

        for (path, outcome) in outcomes {
            match outcome {
                Ok(Some(report)) if report.added_key_count() > 0 => logging::info(&format!(
                    "  {} - added {} new key(s)",
                    report.file,
                    report.added_key_count()
                )),
                Ok(_) => {}
                Err(e) => logging::error(&format!("{}: {:#}", self.options.label(path), e)),
            }
        }
    }
}

/// Non-glob prefix directories of the input patterns, e.g. `src/**/*.tsx` -> `src`
pub fn compute_watch_dirs(patterns: &[String], base_dir: &Path) -> Vec<PathBuf> {
    let mut dirs = BTreeSet::new();

    for pattern in patterns.iter().flat_map(|p| extractor::expand_braces(p)) {
        let mut prefix = PathBuf::new();
        for part in pattern.split('/') {
            if part.contains(['*', '?', '[']) {
                break;
            }
            prefix.push(part);
        }
        // A pattern without wildcards names a file
        if !pattern.contains(['*', '?', '[']) {
            prefix.pop();
        }

        let dir = base_dir.join(prefix);
        if dir.is_dir() {
            dirs.insert(dir.canonicalize().unwrap_or(dir));
        }
    }

    dirs.into_iter().collect()
}

/// Check if a file should be processed based on its extension
pub fn should_process_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_process_file() {
        assert!(should_process_file(Path::new("src/App.tsx")));
        assert!(should_process_file(Path::new("src/util.mjs")));
        assert!(!should_process_file(Path::new("locales/en/app.json")));
        assert!(!should_process_file(Path::new("README")));
    }

    #[test]
    fn test_compute_watch_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/components")).unwrap();
        std::fs::create_dir_all(dir.path().join("app")).unwrap();
        std::fs::write(dir.path().join("app/main.js"), "").unwrap();

        let patterns = vec![
            "src/**/*.{js,tsx}".to_string(),
            "src/components/*.jsx".to_string(),
            "app/main.js".to_string(),
            "missing/**/*.js".to_string(),
        ];
        let dirs = compute_watch_dirs(&patterns, dir.path());
        let root = dir.path().canonicalize().unwrap();

        assert_eq!(
            dirs,
            vec![root.join("app"), root.join("src"), root.join("src/components")]
        );
    }

    #[test]
    fn test_changed_units_filters_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/legacy")).unwrap();
        let app = dir.path().join("src/App.js");
        let legacy = dir.path().join("src/legacy/Old.js");
        std::fs::write(&app, "").unwrap();
        std::fs::write(&legacy, "").unwrap();
        std::fs::write(dir.path().join("src/notes.md"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        let script = dir.path().join("scripts/build.js");
        std::fs::write(&script, "").unwrap();

        let config = Config {
            ignore: vec!["src/legacy/**".to_string()],
            ..Config::default()
        };
        let watcher = FileWatcher::new(config, dir.path(), None).unwrap();
        let changed = watcher.changed_units(
            vec![
                app.clone(),
                legacy,
                app.clone(),
                dir.path().join("src/notes.md"),
                dir.path().join("src/Deleted.js"),
                script,
            ]
            .into_iter(),
        );

        assert_eq!(changed, vec![app]);
    }

    #[test]
    fn test_changed_units_require_an_input_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        let legacy = dir.path().join("src/legacy.js");
        let view = dir.path().join("src/View.tsx");
        std::fs::write(&legacy, "").unwrap();
        std::fs::write(&view, "").unwrap();

        let config = Config {
            input: vec!["src/**/*.tsx".to_string()],
            ..Config::default()
        };
        let watcher = FileWatcher::new(config, dir.path(), None).unwrap();

        assert!(watcher
            .changed_units(vec![legacy].into_iter())
            .is_empty());
        assert_eq!(
            watcher.changed_units(vec![view.clone()].into_iter()),
            vec![view]
        );
    }
}
