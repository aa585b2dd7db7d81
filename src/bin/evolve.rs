//! Schema Evolution CLI
//!
//! Checks proposed event type definitions against the evolution rules and
//! shows typed diffs between schema documents.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use freshet_schemas::config::OutputFormat;
use freshet_schemas::{
    ChangeLevel, CompatibilityMode, EventType, EventTypeBase, EventTypeName, EvolutionConfig,
    SchemaBase, SchemaDiff, SchemaDiffer, SchemaEvolutionService,
};
use similar::{ChangeTag, TextDiff};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-evolve")]
#[command(about = "Check schema evolutions and diff schema documents")]
struct Cli {
    /// Path to a config file (defaults to freshet.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a proposed definition against a registered event type
    Check {
        /// Registered event type (JSON, as stored by the registry)
        current: PathBuf,
        /// Proposed definition (JSON, without version or timestamps)
        proposed: PathBuf,
        /// Treat both files as bare schema documents, applying configured defaults
        #[arg(long)]
        bare: bool,
        /// Write the accepted event type to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show typed changes between two schema documents
    Diff {
        /// Base schema document (JSON)
        from: PathBuf,
        /// Target schema document (JSON)
        to: PathBuf,
        /// Compatibility mode used to grade changes (none, forward, compatible)
        #[arg(short, long)]
        mode: Option<String>,
        /// Also print a line-based text diff
        #[arg(long)]
        text: bool,
    },
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

    match cli.command {
        Commands::Check {
            current,
            proposed,
            bare,
            output,
        } => {
            let service = SchemaEvolutionService::from_config(&config)?;

            let (original, proposed) = if bare {
                ad_hoc_pair(&current, &proposed, &config)?
            } else {
                let original: EventType = serde_json::from_str(&fs::read_to_string(&current)?)?;
                let proposed: EventTypeBase =
                    serde_json::from_str(&fs::read_to_string(&proposed)?)?;
                (original, proposed)
            };

            let incompatibilities =
                service.collect_incompatibilities(&proposed.schema.document()?);
            if !incompatibilities.is_empty() {
                println!("❌ {} - schema uses unsupported constructs:", proposed.name);
                for incompatibility in &incompatibilities {
                    println!("  └─ {}", incompatibility);
                }
                std::process::exit(1);
            }

            match service.evolve(&original, &proposed) {
                Ok(evolved) => {
                    println!(
                        "✅ {} - accepted: {} -> {}",
                        evolved.name, original.schema.version, evolved.schema.version
                    );
                    if let Some(path) = output {
                        fs::write(&path, render(&evolved, config.output.format)?)?;
                        println!("   Written to {:?}", path);
                    }
                    Ok(())
                }
                Err(e) => {
                    println!("❌ {} - rejected", original.name);
                    println!("   {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Diff {
            from,
            to,
            mode,
            text,
        } => {
            let mode = match mode {
                Some(raw) => parse_mode(&raw)?,
                None => config.defaults.compatibility_mode,
            };

            let from_text = fs::read_to_string(&from)?;
            let to_text = fs::read_to_string(&to)?;
            let from_document: serde_json::Value = serde_json::from_str(&from_text)?;
            let to_document: serde_json::Value = serde_json::from_str(&to_text)?;

            let changes = SchemaDiff.collect_changes(&from_document, &to_document);

            if changes.is_empty() {
                println!("✅ No structural changes");
            } else {
                println!("🔍 {} change(s) under {} mode:", changes.len(), mode);
                for change in &changes {
                    let level = change.change_type.level(mode);
                    let marker = if level == ChangeLevel::Major {
                        "❌"
                    } else {
                        "✅"
                    };
                    println!("  {} [{}] {}", marker, level, change);
                }
            }

            if text {
                println!();
                let diff = TextDiff::from_lines(&from_text, &to_text);
                for change in diff.iter_all_changes() {
                    let sign = match change.tag() {
                        ChangeTag::Delete => "-",
                        ChangeTag::Insert => "+",
                        ChangeTag::Equal => " ",
                    };
                    print!("{}{}", sign, change.value());
                }
            }

            if changes
                .iter()
                .any(|change| change.change_type.is_breaking(mode))
            {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Wrap two bare schema documents into an event type pair using the
/// configured default policies
fn ad_hoc_pair(
    current: &PathBuf,
    proposed: &PathBuf,
    config: &EvolutionConfig,
) -> Result<(EventType, EventTypeBase), Box<dyn std::error::Error>> {
    let current_text = fs::read_to_string(current)?;
    let proposed_text = fs::read_to_string(proposed)?;

    let base = EventTypeBase::new(
        EventTypeName::new("adhoc.check")?,
        config.defaults.category,
        config.defaults.compatibility_mode,
        SchemaBase::json_schema(current_text),
    );
    let original = EventType::create(base.clone(), chrono::Utc::now());

    let mut proposed_base = base;
    proposed_base.schema = SchemaBase::json_schema(proposed_text);
    Ok((original, proposed_base))
}

fn parse_mode(raw: &str) -> Result<CompatibilityMode, Box<dyn std::error::Error>> {
    match raw {
        "none" => Ok(CompatibilityMode::None),
        "forward" => Ok(CompatibilityMode::Forward),
        "compatible" => Ok(CompatibilityMode::Compatible),
        other => Err(format!(
            "unknown compatibility mode '{}' (expected none, forward or compatible)",
            other
        )
        .into()),
    }
}

fn render(event_type: &EventType, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(event_type),
        OutputFormat::Compact => serde_json::to_string(event_type),
    }
}
