use std::path::{Path, PathBuf};

use anyhow::bail;
use clap::Subcommand;
use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;
use crate::config;
use crate::storage::Collection;

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "Create an empty data file")]
    Init {
        #[arg(long, help = "Data file path (defaults to DATA_FILE)")]
        path: Option<PathBuf>,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

pub async fn handle(cmd: DataCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DataCommands::Init { path, force } => {
            let path = path.unwrap_or_else(|| config::config().storage.data_file.clone());
            init_data_file(&path, force)?;

            match output_format {
                OutputFormat::Json => println!("{}", json!({ "created": path })),
                OutputFormat::Text => println!("Created {}", path.display()),
            }
            Ok(())
        }
    }
}

/// Empty dataset with one array per collection
fn empty_dataset() -> Value {
    let collections: Map<String, Value> = Collection::ALL
        .iter()
        .map(|c| (c.name().to_string(), Value::Array(Vec::new())))
        .collect();
    Value::Object(collections)
}

fn init_data_file(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(&empty_dataset())?)?;
    Ok(())
}
