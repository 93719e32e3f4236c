//! topicmap CLI - classify bus messages against a mapping table
//!
//! Reads newline-delimited JSON messages and prints, per message, the matched
//! type and its resolved fields.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process;

use topicmap::{
    GenericMessage, InboundMessage, MappingTable, MessageParser, Settings, TypeRegistry,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "topicmap")]
#[command(version, about = "Topic-pattern classification for pub/sub bus messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a mapping table and report entries that can never produce a message
    Check {
        /// Mapping table file (default: $TOPICMAP_MAPPING or mapping.yaml)
        #[arg(short, long)]
        mapping: Option<PathBuf>,
    },

    /// Classify NDJSON messages, writing one NDJSON result per input line
    Classify {
        /// Mapping table file (default: $TOPICMAP_MAPPING or mapping.yaml)
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Input file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn main() {
    dotenv::dotenv().ok();

    let settings = Settings::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { mapping } => check(settings.with_mapping_path(mapping)),
        Commands::Classify { mapping, input } => {
            classify(settings.with_mapping_path(mapping), input)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Load the mapping table and list each entry with its diagnostics
fn check(settings: Settings) -> Result<(), String> {
    let table = MappingTable::load_from_file(&settings.mapping_path).map_err(|e| e.to_string())?;
    let diagnostics = table.diagnostics();

    for entry in table.entries() {
        let patterns: Vec<&str> = entry.patterns().iter().map(|p| p.as_str()).collect();
        println!("{}", entry.type_name());
        println!("  matches: {:?}", patterns);
        for (name, path) in entry.fields() {
            println!("  {}: {}", name, path);
        }
        for (_, diagnostic) in diagnostics
            .iter()
            .filter(|(type_name, _)| *type_name == entry.type_name())
        {
            println!("  ! {}", diagnostic);
        }
    }

    println!(
        "{} entries, {} with problems",
        table.len(),
        diagnostics
            .iter()
            .map(|(type_name, _)| type_name)
            .collect::<std::collections::HashSet<_>>()
            .len()
    );

    Ok(())
}

/// Classify every input line with a schemaless registry covering all entries
fn classify(settings: Settings, input: Option<PathBuf>) -> Result<(), String> {
    let table = MappingTable::load_from_file(&settings.mapping_path).map_err(|e| e.to_string())?;

    let mut registry = TypeRegistry::<GenericMessage>::new();
    for type_name in table.type_names() {
        registry.register_generic(type_name);
    }
    let parser = MessageParser::new(table.into(), registry);

    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(&path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut matched = 0usize;
    let mut total = 0usize;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Failed to read input: {}", e))?;
        if line.trim().is_empty() {
            continue;
        }
        total += 1;

        let parsed = match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(value) => match InboundMessage::from_value(value) {
                Some(message) => parser.parse(&message),
                None => {
                    tracing::warn!("Line {}: message is not a JSON object", line_num + 1);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Line {}: invalid JSON: {}", line_num + 1, e);
                None
            }
        };

        let output = match &parsed {
            Some(message) => {
                matched += 1;
                serde_json::to_string(message)
            }
            None => serde_json::to_string(&serde_json::json!({ "type": null })),
        }
        .map_err(|e| format!("Failed to encode result: {}", e))?;

        writeln!(out, "{}", output).map_err(|e| format!("Failed to write output: {}", e))?;
    }

    tracing::info!("Classified {} of {} messages", matched, total);
    Ok(())
}
