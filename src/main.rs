//! Tablemirror CLI - inspect and edit a SQLite table through an in-memory mirror

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tablemirror::config::{self, MirrorConfig};
use tablemirror::ui::{self, Icons};
use tablemirror::{DynamicRecord, Lifecycle, ReadOnlySqlStore, Scalar, SqlStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "tablemirror")]
#[command(version)]
#[command(about = "Mirror a SQLite table in memory and reconcile changes on close")]
#[command(long_about = r#"
Tablemirror loads every row of a table into memory, applies your change,
then writes the table back: in-memory rows are upserted on [id] and rows
that are no longer in memory are deleted.

Example usage:
  tablemirror init --database app.db --table people
  tablemirror show
  tablemirror set --key id1 --column name --value "Ada"
  tablemirror delete --key id2
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Target {
    /// Path to the database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Table to mirror
    #[arg(short, long)]
    table: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file naming the database and table
    Init {
        #[arg(short, long)]
        database: PathBuf,

        #[arg(short, long)]
        table: String,

        /// Refuse edits through this config
        #[arg(long)]
        read_only: bool,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Print every row of the table
    Show {
        #[command(flatten)]
        target: Target,
    },

    /// Count the rows of the table
    Count {
        #[command(flatten)]
        target: Target,
    },

    /// Change one column of one row
    Set {
        #[command(flatten)]
        target: Target,

        /// Primary key of the row
        #[arg(short, long)]
        key: String,

        /// Column to change
        #[arg(long)]
        column: String,

        /// New value, parsed according to the column's declared type
        #[arg(long)]
        value: String,
    },

    /// Delete one row
    Delete {
        #[command(flatten)]
        target: Target,

        /// Primary key of the row
        #[arg(short, long)]
        key: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let file_config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let json = cli.json;

    match cli.command {
        Commands::Init { database, table, read_only, force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let config = MirrorConfig {
                database: Some(database.to_string_lossy().to_string()),
                table: Some(table),
                read_only,
            };
            config::write_config(&path, &config, force)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                ui::success(&format!("Wrote {}", path.display()));
            }
        }

        Commands::Show { target } => {
            let config = file_config.merged(target.database, target.table);
            let mut store = ReadOnlySqlStore::open_table(&config.database_path()?, config.table_name()?)?;
            store.load()?;

            let mut keys: Vec<&str> = store.keys().collect();
            keys.sort_unstable();
            let records: Vec<&DynamicRecord> = keys.iter().filter_map(|k| store.find(k)).collect();

            if json {
                let rows: Vec<serde_json::Value> = records.iter().map(|r| record_json(r)).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                ui::header(&format!("{} ({} rows)", store.table(), records.len()));
                println!("{}", ui::records_table(store.schema(), records.iter().copied()));
            }
        }

        Commands::Count { target } => {
            let config = file_config.merged(target.database, target.table);
            let mut store = ReadOnlySqlStore::open_table(&config.database_path()?, config.table_name()?)?;
            let rows = store.load()?;

            if json {
                println!("{}", serde_json::json!({ "table": store.table(), "rows": rows }));
            } else {
                let rows = rows.to_string();
                println!("{}", ui::stats_table(&[("Table", store.table()), ("Rows", &rows)]));
            }
        }

        Commands::Set { target, key, column, value } => {
            let config = file_config.merged(target.database, target.table);
            ensure_writable(&config)?;
            let store = SqlStore::open_table(&config.database_path()?, config.table_name()?)?;
            let sql_type = store
                .schema()
                .find_column(&column)
                .map(|c| c.sql_type)
                .ok_or_else(|| anyhow::anyhow!("table {} has no column {}", store.table(), column))?;
            let parsed = Scalar::parse_as(&value, sql_type)
                .ok_or_else(|| anyhow::anyhow!("'{}' is not a valid {} value", value, sql_type))?;

            let mut mirror = Lifecycle::open(store)?;
            let record = mirror
                .find_mut(&key)
                .ok_or_else(|| anyhow::anyhow!("no row with key {}", key))?;
            let previous = record.set(&column, parsed.clone())?;
            let report = mirror.finish()?;

            if json {
                println!(
                    "{}",
                    serde_json::json!({ "key": key, "column": column, "previous": previous, "value": parsed, "report": report })
                );
            } else {
                ui::summary_row(Icons::MOD, &format!("{}.{}", key, column), &format!("{} → {}", previous, parsed));
                ui::success(&format!("Persisted: {}", report));
            }
        }

        Commands::Delete { target, key } => {
            let config = file_config.merged(target.database, target.table);
            ensure_writable(&config)?;
            let store = SqlStore::open_table(&config.database_path()?, config.table_name()?)?;

            let mut mirror = Lifecycle::open(store)?;
            if mirror.remove(&key).is_none() {
                anyhow::bail!("no row with key {}", key);
            }
            let report = mirror.finish()?;

            if json {
                println!("{}", serde_json::json!({ "key": key, "report": report }));
            } else {
                ui::summary_row(Icons::DEL, "deleted", &key);
                ui::success(&format!("Persisted: {}", report));
            }
        }
    }

    Ok(())
}

fn ensure_writable(config: &MirrorConfig) -> anyhow::Result<()> {
    if config.read_only {
        anyhow::bail!("the configured mirror is read-only");
    }
    Ok(())
}

fn record_json(record: &DynamicRecord) -> serde_json::Value {
    let map = record
        .fields()
        .iter()
        .map(|(name, value)| (name.clone(), serde_json::to_value(value).unwrap_or(serde_json::Value::Null)))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(map)
}
