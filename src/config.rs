use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Name of the configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "i18next-harvest.json";

/// Configuration for i18next-harvest
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Glob patterns for input files (e.g., ["src/**/*.tsx", "src/**/*.ts"])
    #[serde(default = "default_input")]
    pub input: Vec<String>,

    /// Glob patterns for files to skip
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Output directory for catalog files, relative to the working directory
    #[serde(default = "default_output")]
    pub output: String,

    /// List of language codes (e.g., ["en", "fr"])
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,

    /// Namespace used when a file declares none
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Function names matched without import resolution (e.g., ["t", "i18n.t"])
    #[serde(default = "default_functions")]
    pub functions: Vec<String>,

    /// Key separator (e.g., "." for "button.submit"); empty keeps keys flat
    #[serde(default = "default_key_separator")]
    pub key_separator: String,

    /// Namespace separator (e.g., ":" for "common:greeting")
    #[serde(
        default = "default_ns_separator",
        alias = "namespaceSeparator",
        alias = "namespaceSeperator"
    )]
    pub ns_separator: String,

    /// Context separator (e.g., "_" for "friend_male")
    #[serde(default = "default_context_separator")]
    pub context_separator: String,

    /// Plural separator (e.g., "_" for "item_plural")
    #[serde(default = "default_plural_separator")]
    pub plural_separator: String,

    /// Suffix appended to plural keys
    #[serde(default = "default_plural_suffix")]
    pub plural_suffix: String,

    /// Import source whose components and functions are trusted
    #[serde(default = "default_module_source_name")]
    pub module_source_name: String,

    /// Log level: error, warn, info or debug
    #[serde(default)]
    pub log_level: Option<String>,
}

#[cfg(feature = "napi")]
use napi_derive::napi;

#[cfg(feature = "napi")]
#[napi(object)]
#[allow(non_snake_case)]
pub struct NapiConfig {
    pub input: Option<Vec<String>>,
    pub ignore: Option<Vec<String>>,
    pub output: Option<String>,
    pub locales: Option<Vec<String>>,
    pub defaultNamespace: Option<String>,
    pub functions: Option<Vec<String>>,
    pub keySeparator: Option<String>,
    pub nsSeparator: Option<String>,
    pub contextSeparator: Option<String>,
    pub pluralSeparator: Option<String>,
    pub pluralSuffix: Option<String>,
    pub moduleSourceName: Option<String>,
}

fn default_input() -> Vec<String> {
    vec!["src/**/*.{js,jsx,ts,tsx}".to_string()]
}

fn default_output() -> String {
    "locales".to_string()
}

fn default_locales() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_namespace() -> String {
    "translation".to_string()
}

fn default_functions() -> Vec<String> {
    vec!["t".to_string()]
}

fn default_key_separator() -> String {
    ".".to_string()
}

fn default_ns_separator() -> String {
    ":".to_string()
}

fn default_context_separator() -> String {
    "_".to_string()
}

fn default_plural_separator() -> String {
    "_".to_string()
}

fn default_plural_suffix() -> String {
    "plural".to_string()
}

fn default_module_source_name() -> String {
    "react-i18next".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: default_input(),
            ignore: Vec::new(),
            output: default_output(),
            locales: default_locales(),
            default_namespace: default_namespace(),
            functions: default_functions(),
            key_separator: default_key_separator(),
            ns_separator: default_ns_separator(),
            context_separator: default_context_separator(),
            plural_separator: default_plural_separator(),
            plural_suffix: default_plural_suffix(),
            module_source_name: default_module_source_name(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON (or `.json5`) file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_json5 = path
            .extension()
            .map(|ext| ext == "json5")
            .unwrap_or(false);

        let config: Config = if is_json5 {
            json5::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json_string(json_str: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json_str)
            .with_context(|| "Failed to parse config JSON string")?;
        config.validate()?;
        Ok(config)
    }

    /// Try to load from default config file, or return default config
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject settings the catalog writer cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.locales.is_empty() {
            bail!("Config must list at least one locale");
        }
        if self.default_namespace.trim().is_empty() {
            bail!("Config defaultNamespace must not be empty");
        }
        if !self.ns_separator.is_empty() && self.ns_separator == self.key_separator {
            bail!(
                "nsSeparator and keySeparator must differ (both are '{}')",
                self.ns_separator
            );
        }
        Ok(())
    }

    /// Plural suffix including its separator, e.g. "_plural"
    pub fn plural_key_suffix(&self) -> String {
        format!("{}{}", self.plural_separator, self.plural_suffix)
    }

    #[cfg(feature = "napi")]
    pub fn from_napi(config: NapiConfig) -> Result<Self> {
        let defaults = Config::default();
        let config = Config {
            input: config.input.unwrap_or(defaults.input),
            ignore: config.ignore.unwrap_or(defaults.ignore),
            output: config.output.unwrap_or(defaults.output),
            locales: config.locales.unwrap_or(defaults.locales),
            default_namespace: config
                .defaultNamespace
                .unwrap_or(defaults.default_namespace),
            functions: config.functions.unwrap_or(defaults.functions),
            key_separator: config.keySeparator.unwrap_or(defaults.key_separator),
            ns_separator: config.nsSeparator.unwrap_or(defaults.ns_separator),
            context_separator: config
                .contextSeparator
                .unwrap_or(defaults.context_separator),
            plural_separator: config
                .pluralSeparator
                .unwrap_or(defaults.plural_separator),
            plural_suffix: config.pluralSuffix.unwrap_or(defaults.plural_suffix),
            module_source_name: config
                .moduleSourceName
                .unwrap_or(defaults.module_source_name),
            log_level: None,
        };
        config.validate()?;
        Ok(config)
    }
}
