//! Developer tasks (schema generation, fixture conformance, explain coverage).
//!
//! Keeping this separate avoids bloating the end-user CLI.

use anyhow::{Context, bail};
use checkguard_test_util::normalize_nondeterministic;
use schemars::schema_for;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the project root (parent of the xtask directory).
fn project_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(manifest_dir)
}

fn schemas_dir() -> PathBuf {
    project_root().join("schemas")
}

fn report_fixtures_dir() -> PathBuf {
    project_root().join("tests").join("fixtures").join("reports")
}

/// Schema definition with its target filename.
struct SchemaTarget {
    filename: &'static str,
    generate: fn() -> schemars::Schema,
}

fn generate_report_schema() -> schemars::Schema {
    schema_for!(checkguard_types::EngineReport)
}

fn generate_config_schema() -> schemars::Schema {
    schema_for!(checkguard_settings::CheckguardConfigV1)
}

fn schema_targets() -> Vec<SchemaTarget> {
    vec![
        SchemaTarget {
            filename: "checkguard.report.v1.json",
            generate: generate_report_schema,
        },
        SchemaTarget {
            filename: "checkguard.config.v1.json",
            generate: generate_config_schema,
        },
    ]
}

/// Serialize a schema to pretty-printed JSON with trailing newline.
fn serialize_schema(schema: &schemars::Schema) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(schema).context("Failed to serialize schema")?;
    json.push('\n');
    Ok(json)
}

fn emit_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    fs::create_dir_all(&dir).context("Failed to create schemas directory")?;

    for entry in schema_targets() {
        let json = serialize_schema(&(entry.generate)())?;
        let path = dir.join(entry.filename);
        fs::write(&path, &json)
            .with_context(|| format!("Failed to write schema to {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!("\nSchemas emitted successfully.");
    Ok(())
}

/// Validate that schemas in the repo match what would be generated.
///
/// Compared as JSON values, so key order and whitespace do not matter.
fn validate_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for entry in schema_targets() {
        let path = dir.join(entry.filename);
        if !path.exists() {
            missing.push(entry.filename);
            continue;
        }
        let expected = serde_json::to_value((entry.generate)()).context("Failed to serialize schema")?;
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let actual: Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if expected != actual {
            mismatched.push(entry.filename);
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        println!("All schemas are up to date.");
        return Ok(());
    }
    if !missing.is_empty() {
        eprintln!("Missing schemas:");
        for name in &missing {
            eprintln!("  - {}", name);
        }
    }
    if !mismatched.is_empty() {
        eprintln!("Schemas out of date:");
        for name in &mismatched {
            eprintln!("  - {}", name);
        }
    }
    eprintln!("\nRun `cargo xtask emit-schemas` to regenerate.");
    bail!("Schema validation failed")
}

fn print_help() {
    eprintln!("xtask commands:");
    eprintln!("  help              Show this message");
    eprintln!("  emit-schemas      Generate JSON schemas from Rust types to schemas/");
    eprintln!("  validate-schemas  Check if schemas/ matches generated output (for CI)");
    eprintln!("  conform           Validate tests/fixtures/reports against the report schema");
    eprintln!("  explain-coverage  Validate all engine codes have explanations");
}

/// Codes are lowercase snake_case tokens.
fn is_valid_token(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Repo-relative paths use forward slashes and never climb out of the root.
fn is_clean_path(path: &str) -> bool {
    !(path.starts_with('\\')
        || path.contains('\\')
        || path.split('/').any(|c| c == "..")
        || (path.len() >= 2 && path.as_bytes()[1] == b':'))
}

/// Semantic rules the schema cannot express.
fn report_invariants(report: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    let checks = report["checks"].as_array().cloned().unwrap_or_default();
    let count = |key: &str| report[key].as_u64().unwrap_or(u64::MAX);

    let total = checks.len() as u64;
    let passed = checks.iter().filter(|c| c["status"] == "pass").count() as u64;
    if count("total") != total {
        errors.push(format!("total is {} but {} checks are listed", count("total"), total));
    }
    if count("passed") != passed {
        errors.push(format!("passed is {} but {} checks passed", count("passed"), passed));
    }
    if count("failed") != total - passed {
        errors.push(format!("failed is {} but should be {}", count("failed"), total - passed));
    }

    let ids: Vec<&str> = checks.iter().filter_map(|c| c["id"].as_str()).collect();
    if ids.windows(2).any(|w| w[0] > w[1]) {
        errors.push("checks are not sorted by id".to_string());
    }

    for check in &checks {
        let id = check["id"].as_str().unwrap_or("?");
        for err in check["errors"].as_array().into_iter().flatten() {
            if let Some(code) = err["code"].as_str()
                && !is_valid_token(code)
            {
                errors.push(format!("{id}: invalid code `{code}`"));
            }
            if let Some(path) = err["path"].as_str()
                && !is_clean_path(path)
            {
                errors.push(format!("{id}: unclean path `{path}`"));
            }
        }
    }

    if normalize_nondeterministic(report.clone()) != *report {
        errors.push("fixture is not normalized (run_id / duration_ms)".to_string());
    }
    errors
}

/// Validate fixture reports against the generated report schema.
fn conform() -> anyhow::Result<()> {
    let schema = serde_json::to_value(generate_report_schema()).context("report schema")?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| anyhow::anyhow!("Failed to compile report schema: {}", e))?;
    println!("✓ checkguard.report.v1 schema compiles");

    let dir = report_fixtures_dir();
    if !dir.exists() {
        bail!("tests/fixtures/reports/ not found at {}", dir.display());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
        .context("Failed to read tests/fixtures/reports/")?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    if paths.is_empty() {
        bail!("no fixture reports found in {}", dir.display());
    }

    let mut errors = Vec::new();
    for path in &paths {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let report: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                errors.push(format!("{name}: invalid JSON: {e}"));
                continue;
            }
        };

        let before = errors.len();
        for err in validator.iter_errors(&report) {
            errors.push(format!("{name}: schema: {err}"));
        }
        for err in report_invariants(&report) {
            errors.push(format!("{name}: {err}"));
        }
        if errors.len() == before {
            println!("✓ {name}");
        }
    }

    if errors.is_empty() {
        println!("\n✓ {} fixture reports conform", paths.len());
        Ok(())
    } else {
        for error in &errors {
            eprintln!("  - {}", error);
        }
        bail!("Conformance failed with {} errors", errors.len())
    }
}

fn explain_coverage() -> anyhow::Result<()> {
    let codes = checkguard_types::explain::all_codes();
    let mut errors = Vec::new();

    for code in codes {
        match checkguard_types::explain::lookup_explanation(code) {
            Some(exp) => {
                if exp.title.is_empty() {
                    errors.push(format!("Code '{}' has empty title", code));
                }
                if exp.description.is_empty() {
                    errors.push(format!("Code '{}' has empty description", code));
                }
                if exp.remediation.is_empty() {
                    errors.push(format!("Code '{}' has empty remediation", code));
                }
            }
            None => errors.push(format!("Code '{}' has no explanation", code)),
        }
    }

    if errors.is_empty() {
        println!("✓ {} codes have explanations", codes.len());
        Ok(())
    } else {
        for error in &errors {
            eprintln!("  - {}", error);
        }
        bail!(
            "Explain coverage validation failed with {} errors",
            errors.len()
        )
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "emit-schemas" => emit_schemas(),
        "validate-schemas" => validate_schemas(),
        "conform" => conform(),
        "explain-coverage" => explain_coverage(),
        other => bail!("unknown xtask command: {other}\n\nRun `cargo xtask help` for usage."),
    }
    .context("xtask failed")
}
