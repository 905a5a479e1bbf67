use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use patch_store::{path, Document, Store, StoreConfig, Value};
use serde_json::json;
use tracing::Level;

/// Inspect paths and apply mutation batches from the command line.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Log applied mutations and emitted events
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a path from a JSON document
    Get {
        /// JSON document (string)
        json: String,
        /// Path expression, e.g. `body[_key=="a"].text`
        path: String,
    },
    /// Show the tokens and syntax tree of a path
    Parse { path: String },
    /// Apply a mutation batch to a dataset and print the result
    Mutate {
        /// JSON file holding an array of documents
        dataset: PathBuf,
        /// JSON file holding an array of mutations
        mutations: PathBuf,
        #[arg(long)]
        transaction_id: Option<String>,
        /// JSON store configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Get { json, path: expr } => {
            let data: Value = serde_json::from_str(&json)?;
            let out = patch_store::get(&data, &expr)?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Parse { path: expr } => {
            for token in path::tokenize(&expr)? {
                println!("{token:?}");
            }
            let node = path::parse(&expr)?;
            println!("{node}");
            println!("{node:#?}");
        }
        Command::Mutate {
            dataset,
            mutations,
            transaction_id,
            config,
        } => {
            let config = match config {
                Some(file) => StoreConfig::from_json_str(&fs::read_to_string(file)?)?,
                None => StoreConfig::default(),
            };
            let documents: Vec<Document> = serde_json::from_str(&fs::read_to_string(dataset)?)?;
            let batch: serde_json::Value = serde_json::from_str(&fs::read_to_string(mutations)?)?;

            let mut store = Store::new(config, documents);
            let result = store.mutate_json(transaction_id.as_deref(), batch)?;
            let out = json!({
                "result": result,
                "documents": store.documents(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
