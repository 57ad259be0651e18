use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use hookstore::{
    Definition, DefinitionLoader, Record, SchemaVersionChain,
    hooks::{hook_chain, last_fire_chain, queue_chain},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, event};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hookstore-tool")]
#[command(about = "Developer tooling for hookstore schemas and definitions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate definition files or directories of `NNNN.yml` files
    CheckDefinitions {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the schema chain of an entity
    Schema {
        #[arg(value_enum)]
        entity: Entity,
    },
    /// Upgrade a stored record (JSON) to the latest version of its entity
    Upgrade {
        #[arg(long, value_enum)]
        entity: Entity,
        record: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Entity {
    Hook,
    LastFire,
    Queue,
}

impl Entity {
    fn chain(self) -> hookstore::Result<SchemaVersionChain> {
        match self {
            Self::Hook => hook_chain(),
            Self::LastFire => last_fire_chain(),
            Self::Queue => queue_chain(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::CheckDefinitions { paths } => check_definitions(&paths),
        Command::Schema { entity } => print_schema(entity),
        Command::Upgrade { entity, record } => upgrade_record(entity, &record),
    }
}

fn check_definitions(paths: &[PathBuf]) -> Result<()> {
    let mut checked = 0usize;
    for path in paths {
        let definitions = load_definitions(path)?;
        for definition in &definitions {
            println!(
                "{}: version {} ({} methods)",
                path.display(),
                definition.version,
                definition.methods.len()
            );
        }
        checked += definitions.len();
    }
    event!(Level::INFO, checked, "definitions valid");
    Ok(())
}

fn load_definitions(path: &Path) -> Result<Vec<Definition>> {
    if path.is_dir() {
        DefinitionLoader::load_dir(path)
            .with_context(|| format!("Invalid definition directory '{}'", path.display()))
    } else {
        let definition = DefinitionLoader::load_file(path)
            .with_context(|| format!("Invalid definition file '{}'", path.display()))?;
        Ok(vec![definition])
    }
}

fn print_schema(entity: Entity) -> Result<()> {
    let chain = entity.chain().context("Failed to build schema chain")?;
    println!("{}", chain.entity());
    for version in chain.versions() {
        let marker = if version.has_migrate() { " (migrate)" } else { "" };
        println!("  v{}{}", version.number, marker);
        for (name, field_type) in &version.fields {
            println!("    {}: {}", name, field_type);
        }
    }
    Ok(())
}

fn upgrade_record(entity: Entity, path: &Path) -> Result<()> {
    let upgraded = read_upgraded(entity, path)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&upgraded).context("Failed to serialize record")?
    );
    Ok(())
}

/// Reads a stored record from `path` and runs it through the entity's chain.
fn read_upgraded(entity: Entity, path: &Path) -> Result<Record> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read record file '{}'", path.display()))?;
    let record: Record = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse record file '{}'", path.display()))?;
    if record.version == 0 {
        bail!("Record in '{}' has no schema version", path.display());
    }

    let chain = entity.chain().context("Failed to build schema chain")?;
    let from = record.version;
    let upgraded = chain
        .upgrade(record)
        .with_context(|| format!("Failed to upgrade record from '{}'", path.display()))?;
    event!(Level::INFO, from, to = upgraded.version, "record upgraded");
    Ok(upgraded)
}
