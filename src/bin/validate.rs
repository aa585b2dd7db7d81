//! Schema Validator CLI
//!
//! Validates JSON Schema documents against the broker meta-schema, i.e. the
//! subset of draft-07 the evolution engine knows how to diff.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use freshet_schemas::{EvolutionConfig, SchemaEvolutionService};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-validate")]
#[command(about = "Validate schema documents against the broker meta-schema")]
struct Cli {
    /// Schema documents to validate (JSON)
    files: Vec<PathBuf>,

    /// Recursively validate all .json files under this directory
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Path to a config file (defaults to freshet.toml lookup)
    #[arg(short, long)]
    config: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = EvolutionConfig::load_from(cli.config.as_deref())?;
    let service = SchemaEvolutionService::from_config(&config)?;

    let mut files = cli.files.clone();
    if let Some(ref dir) = cli.dir {
        collect_json_files(dir, &mut files);
    }

    if files.is_empty() {
        return Err("no schema files given (pass files or --dir)".into());
    }

    let mut invalid = 0usize;
    for file in &files {
        let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(file)?)?;
        let incompatibilities = service.collect_incompatibilities(&document);

        if incompatibilities.is_empty() {
            println!("✅ {}", file.display());
        } else {
            invalid += 1;
            println!("❌ {}", file.display());
            for incompatibility in &incompatibilities {
                println!("  └─ {}", incompatibility);
            }
        }
    }

    println!();
    if invalid > 0 {
        println!(
            "❌ {}/{} schema(s) use unsupported constructs",
            invalid,
            files.len()
        );
        std::process::exit(1);
    }
    println!("✅ {} schema(s) valid", files.len());
    Ok(())
}

fn collect_json_files(dir: &PathBuf, files: &mut Vec<PathBuf>) {
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let filename = path.file_name().unwrap_or_default().to_string_lossy();
        if filename.ends_with(".json") {
            files.push(path.to_path_buf());
        }
    }
}
