use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::tempdir;

fn cli_bin() -> &'static str {
    env!("CARGO_BIN_EXE_i18next-harvest")
}

fn run_cli<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Output {
    Command::new(cli_bin())
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("failed to run i18next-harvest")
}

fn write_config(root: &Path, locales: &[&str]) -> PathBuf {
    let config = json!({
        "input": ["src/**/*.{js,jsx,ts,tsx}"],
        "ignore": ["src/**/*.test.js"],
        "output": "locales",
        "locales": locales,
        "defaultNamespace": "app",
        "functions": ["t"]
    });

    let config_path = root.join("i18next-harvest.json");
    fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    config_path
}

fn read_json(path: &Path) -> Value {
    let content = fs::read_to_string(path).expect("missing json file");
    serde_json::from_str(&content).expect("invalid json")
}

fn write_source(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

const APP_SOURCE: &str = r#"
import React from 'react';
import { Trans, useTranslation } from 'react-i18next';

export function App({ count }) {
  const { t } = useTranslation();
  return (
    <main>
      <h1>{t('header.title', 'Hello')}</h1>
      <p>{t('header.items', { count, defaultValue: '{{count}} item' })}</p>
      <Trans i18nKey="footer">Made with <em>care</em></Trans>
    </main>
  );
}
"#;

#[test]
fn extract_creates_catalogs_for_every_locale() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/App.jsx", APP_SOURCE);
    write_config(project, &["en", "fr"]);

    let output = run_cli(project, &["extract"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let expected = json!({
        "header": {
            "title": "Hello",
            "items": "{{count}} item",
            "items_plural": "{{count}} item"
        },
        "footer": "Made with <1>care</1>"
    });
    assert_eq!(read_json(&project.join("locales/en/app.json")), expected);
    assert_eq!(read_json(&project.join("locales/fr/app.json")), expected);
}

#[test]
fn extract_preserves_existing_translations() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/App.jsx", APP_SOURCE);
    write_config(project, &["en", "fr"]);
    write_source(
        project,
        "locales/fr/app.json",
        "{\n  \"header\": {\n    \"title\": \"Bonjour\"\n  },\n  \"legacy\": \"Ancien\"\n}\n",
    );

    let output = run_cli(project, &["extract"]);
    assert!(output.status.success());

    let fr = read_json(&project.join("locales/fr/app.json"));
    assert_eq!(fr["header"]["title"], "Bonjour");
    assert_eq!(fr["header"]["items"], "{{count}} item");
    assert_eq!(fr["legacy"], "Ancien");

    // Unchanged content is not rewritten on a second run
    let before = fs::read_to_string(project.join("locales/fr/app.json")).unwrap();
    let output = run_cli(project, &["extract"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No new keys added"), "stdout: {}", stdout);
    assert_eq!(
        fs::read_to_string(project.join("locales/fr/app.json")).unwrap(),
        before
    );
}

#[test]
fn extract_dry_run_writes_nothing() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/App.jsx", APP_SOURCE);
    write_config(project, &["en"]);

    let output = run_cli(project, &["extract", "--dry-run"]);
    assert!(output.status.success());
    assert!(!project.join("locales").exists());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Keys that would be added: 4"), "stdout: {}", stdout);
}

#[test]
fn extract_fails_on_non_static_key_but_writes_other_units() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/App.jsx", APP_SOURCE);
    write_source(project, "src/Broken.js", "export const x = (key) => t(key);\n");
    write_source(project, "src/App.test.js", "t(dynamicInTests);\n");
    write_config(project, &["en"]);

    let output = run_cli(project, &["extract"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("src/Broken.js:1:27"), "stderr: {}", stderr);
    assert!(!stderr.contains("App.test.js"), "stderr: {}", stderr);
    assert!(project.join("locales/en/app.json").exists());
}

#[test]
fn extract_fail_on_warnings_reports_parse_errors() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/App.jsx", APP_SOURCE);
    write_source(project, "src/Bad.js", "const = ;\n");
    write_config(project, &["en"]);

    let output = run_cli(project, &["extract"]);
    assert!(output.status.success());

    let output = run_cli(project, &["extract", "--fail-on-warnings"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Parse error in src/Bad.js"), "stderr: {}", stderr);
    assert!(stderr.contains("--fail-on-warnings"), "stderr: {}", stderr);
}

#[test]
fn extract_with_explicit_config_and_output_override() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/App.jsx", APP_SOURCE);
    let config_dir = project.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = write_config(&config_dir, &["de"]);

    let output = run_cli(
        project,
        &[
            "--config",
            config_path.to_str().unwrap(),
            "--log-level",
            "error",
            "extract",
            "--output",
            "public/i18n",
        ],
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(project.join("public/i18n/de/app.json").exists());
}

#[test]
fn init_writes_config_and_refuses_overwrite() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();

    let output = run_cli(project, &["init", "--locales", "en,es", "--namespace", "common"]);
    assert!(output.status.success());
    let config = read_json(&project.join("i18next-harvest.json"));
    assert_eq!(config["locales"], json!(["en", "es"]));
    assert_eq!(config["defaultNamespace"], "common");
    assert!(project.join("locales/es").is_dir());

    let output = run_cli(project, &["init"]);
    assert!(!output.status.success());
    let output = run_cli(project, &["init", "--force"]);
    assert!(output.status.success());
}

#[test]
fn default_init_config_extracts_sources() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/App.js", "t('greeting', 'Hello there');\n");
    write_source(project, "src/pages/Home.tsx", "t('home', 'Home');\n");

    let output = run_cli(project, &["init"]);
    assert!(output.status.success());
    let config = read_json(&project.join("i18next-harvest.json"));
    assert_eq!(config["input"], json!(["src/**/*.{js,jsx,ts,tsx}"]));

    let output = run_cli(project, &["extract"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        read_json(&project.join("locales/en/translation.json")),
        json!({ "greeting": "Hello there", "home": "Home" })
    );
}
