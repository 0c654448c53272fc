use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::logging;

/// Values written into a starter configuration
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub force: bool,
    /// Comma-separated input globs
    pub input: String,
    pub output: String,
    /// Comma-separated locales
    pub locales: String,
    pub namespace: String,
    /// Comma-separated translate function names
    pub functions: String,
}

/// Split on commas outside `{...}`, so `src/**/*.{js,ts}` stays one pattern
fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in value.chars() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    items.push(current);

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Write `i18next-harvest.json` and one directory per locale under `base_dir`
pub fn run(base_dir: &Path, options: &InitOptions) -> Result<PathBuf> {
    logging::info("=== i18next-harvest init ===\n");

    let config_path = base_dir.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !options.force {
        bail!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let input_patterns = split_list(&options.input);
    let locales = split_list(&options.locales);
    let functions = split_list(&options.functions);
    if locales.is_empty() {
        bail!("At least one locale is required");
    }

    let config = serde_json::json!({
        "input": input_patterns,
        "output": options.output,
        "locales": locales,
        "defaultNamespace": options.namespace,
        "functions": functions,
        "keySeparator": ".",
        "nsSeparator": ":",
        "contextSeparator": "_",
        "pluralSeparator": "_",
        "moduleSourceName": "react-i18next"
    });

    let config_str = serde_json::to_string_pretty(&config)?;
    std::fs::write(&config_path, format!("{}\n", config_str))
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    logging::info(&format!("Created configuration file: {}", config_path.display()));

    for locale in &locales {
        let locale_dir = base_dir.join(&options.output).join(locale);
        if !locale_dir.exists() {
            std::fs::create_dir_all(&locale_dir)
                .with_context(|| format!("Failed to create {}", locale_dir.display()))?;
            logging::info(&format!("  Created: {}", locale_dir.display()));
        }
    }

    logging::info("\nNext steps:");
    logging::info("  1. Run 'i18next-harvest extract' to build the catalogs");
    logging::info("  2. Run 'i18next-harvest watch' to keep them updated while you work");
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn options() -> InitOptions {
        InitOptions {
            force: false,
            input: "src/**/*.{js,jsx}, app/**/*.tsx".to_string(),
            output: "public/locales".to_string(),
            locales: "en,de,".to_string(),
            namespace: "common".to_string(),
            functions: "t,i18n.t".to_string(),
        }
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = run(dir.path(), &options()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.input, vec!["src/**/*.{js,jsx}", "app/**/*.tsx"]);
        assert_eq!(config.locales, vec!["en", "de"]);
        assert_eq!(config.default_namespace, "common");
        assert_eq!(config.functions, vec!["t", "i18n.t"]);
        assert!(dir.path().join("public/locales/de").is_dir());
    }

    #[test]
    fn test_split_list_keeps_brace_groups() {
        assert_eq!(
            split_list("src/**/*.{js,jsx,ts,tsx}"),
            vec!["src/**/*.{js,jsx,ts,tsx}"]
        );
        assert_eq!(
            split_list("a/*.{js,{ts,tsx}}, b/*.js,,"),
            vec!["a/*.{js,{ts,tsx}}", "b/*.js"]
        );
        assert_eq!(split_list("en, fr"), vec!["en", "fr"]);
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &options()).unwrap();
        assert!(run(dir.path(), &options()).is_err());

        let forced = InitOptions {
            force: true,
            ..options()
        };
        assert!(run(dir.path(), &forced).is_ok());
    }
}
