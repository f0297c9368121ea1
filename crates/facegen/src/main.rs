//! The facegen CLI.
//!
//! Provides the `facegen` command with the following subcommands:
//!
//! - `facegen generate <schema>` - Generate all binding fragments
//! - `facegen check <schema>` - Parse and classify without writing
//!
//! Options:
//! - `--config` - Path to facegen.toml (defaults apply when absent)
//! - `--out-dir` - Directory the fragments are written to
//! - `--stable-ids` - Sequential chunk uuids for reproducible output
//! - `--json` - Output schema diagnostics as JSON (one object per line)
//! - `--no-color` - Disable colorized output

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use config::Config;
use face_schema::ParseError;

mod config;

#[derive(Parser)]
#[command(name = "facegen", version, about = "Binding-surface generator for the scriptable editor control")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate all binding fragments from a schema
    Generate {
        /// Path to the .iface schema file
        schema: PathBuf,

        /// Path to facegen.toml
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory the fragments are written to
        #[arg(long = "out-dir", default_value = ".")]
        out_dir: PathBuf,

        /// Use sequential chunk uuids so regeneration is byte-identical
        #[arg(long = "stable-ids")]
        stable_ids: bool,

        /// Output schema diagnostics as JSON (one object per line)
        #[arg(long)]
        json: bool,

        /// Disable colorized output
        #[arg(long = "no-color")]
        no_color: bool,
    },
    /// Parse and classify a schema, reporting problems without writing
    Check {
        /// Path to the .iface schema file
        schema: PathBuf,

        /// Path to facegen.toml
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output schema diagnostics as JSON (one object per line)
        #[arg(long)]
        json: bool,

        /// Disable colorized output
        #[arg(long = "no-color")]
        no_color: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            schema,
            config,
            out_dir,
            stable_ids,
            json,
            no_color,
        } => generate(&schema, config.as_deref(), &out_dir, stable_ids, json, no_color),
        Commands::Check {
            schema,
            config,
            json,
            no_color,
        } => check(&schema, config.as_deref(), json, no_color),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

/// Execute the generation pipeline: load -> fix -> verify -> emit -> write.
fn generate(
    schema_path: &Path,
    config_path: Option<&Path>,
    out_dir: &Path,
    stable_ids: bool,
    json: bool,
    no_color: bool,
) -> Result<(), String> {
    let (features, config) = load_inputs(schema_path, config_path, json, no_color)?;
    let emit_config = config.emit_config(stable_ids);
    let registry = face_schema::TypeRegistry::builtin();
    let artifacts = face_emit::generate(&features, &registry, &emit_config)
        .map_err(|e| e.to_string())?;

    fs::create_dir_all(out_dir)
        .map_err(|e| format!("Failed to create '{}': {}", out_dir.display(), e))?;

    let interface = &emit_config.interface;
    let class = &emit_config.class;
    let outputs = [
        (format!("{interface}_gen.schema.fragment"), &artifacts.schema),
        (format!("{interface}_lite_gen.schema.fragment"), &artifacts.schema_lite),
        (format!("{interface}_gen.consts.fragment"), &artifacts.constants),
        (format!("{class}_gen.stubs.h"), &artifacts.stubs),
        (format!("{class}_gen.dispatch.h"), &artifacts.dispatch),
        (format!("{interface}_gen.wrapper.js"), &artifacts.wrapper),
    ];
    for (name, text) in outputs {
        let path = out_dir.join(name);
        fs::write(&path, text)
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
        eprintln!("  Wrote: {}", path.display());
    }
    Ok(())
}

/// Run every stage up to emission and throw the fragments away.
fn check(
    schema_path: &Path,
    config_path: Option<&Path>,
    json: bool,
    no_color: bool,
) -> Result<(), String> {
    let (features, config) = load_inputs(schema_path, config_path, json, no_color)?;
    let emit_config = config.emit_config(true);
    let registry = face_schema::TypeRegistry::builtin();
    face_emit::generate(&features, &registry, &emit_config).map_err(|e| e.to_string())?;
    let constants = features
        .iter()
        .filter(|f| f.kind == face_schema::FeatureKind::Constant)
        .count();
    eprintln!(
        "  Checked: {} features ({} constants)",
        features.len(),
        constants
    );
    Ok(())
}

/// Load the schema and config, classify features, and verify that the
/// derived runtime identifiers stay injective.
fn load_inputs(
    schema_path: &Path,
    config_path: Option<&Path>,
    json: bool,
    no_color: bool,
) -> Result<(Vec<face_schema::Feature>, Config), String> {
    let source = fs::read_to_string(schema_path)
        .map_err(|e| format!("Failed to read '{}': {}", schema_path.display(), e))?;
    let config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let parsed = face_schema::load(&source);
    if !parsed.errors.is_empty() {
        report_parse_errors(&source, schema_path, &parsed.errors, json, no_color);
        return Err("Generation failed due to schema errors above.".to_string());
    }

    let features = face_fixup::fix(parsed.features, &config.manual.getters, &config.manual.setters);
    face_fixup::verify_identifiers(&features, &config.naming.opcode_prefix)
        .map_err(|e| e.to_string())?;
    Ok((features, config))
}

/// Report schema parse errors.
///
/// When `json` is true, outputs one JSON object per line to stderr.
/// Otherwise, outputs colorized (or colorless) human-readable diagnostics.
fn report_parse_errors(
    source: &str,
    path: &Path,
    errors: &[ParseError],
    json: bool,
    no_color: bool,
) {
    let file_name = path.display().to_string();
    for error in errors {
        if json {
            let msg = serde_json::json!({
                "severity": "error",
                "message": error.kind.to_string(),
                "file": file_name,
                "line": error.line,
                "spans": [{
                    "start": error.span.0,
                    "end": error.span.1,
                }],
            });
            eprintln!("{}", msg);
        } else {
            use ariadne::{Config as ReportConfig, Label, Report, ReportKind, Source};
            let config = if no_color {
                ReportConfig::default().with_color(false)
            } else {
                ReportConfig::default()
            };
            let span = error.span.0..error.span.1.max(error.span.0 + 1);
            let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, span.clone())
                .with_message("Schema error")
                .with_config(config)
                .with_label(Label::new(span).with_message(error.kind.to_string()))
                .finish()
                .eprint(Source::from(source));
        }
    }
}
