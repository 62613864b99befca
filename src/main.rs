use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tenant_wiper::backend::sqlite;
use tenant_wiper::config::WiperFileConfig;
use tenant_wiper::schema::discover_sqlite_schema;
use tenant_wiper::{DeleteOptions, Session, SqliteSession, TenantDeleter};
use validator::Validate;

/// Tenant Wiper - delete every row of one tenant across a relational schema
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Wiper configuration file (YAML)
    #[arg(long)]
    config: PathBuf,

    /// Database URL, overrides the config file and TENANT_WIPER_DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Tenant id bound into filter rules that declare no value
    #[arg(long)]
    tenant_id: Option<String>,

    /// Collect and report only, never delete
    #[arg(long)]
    dry_run: bool,

    /// Delete, then roll back instead of committing
    #[arg(long)]
    no_commit: bool,

    /// Skip configuration validation
    #[arg(long, conflicts_with = "validate_only")]
    skip_validation: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    validate_only: bool,

    /// Keys per delete statement, overrides the config file
    #[arg(long)]
    batch_size: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut file = WiperFileConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(url) = cli.database_url {
        file.database_url = Some(url);
    }
    if let Some(batch_size) = cli.batch_size {
        file.batch_size = batch_size;
    }
    if cli.skip_validation {
        file.validate_on_build = false;
    }
    file.validate().context("validating command-line overrides")?;

    let database_url = file
        .database_url
        .clone()
        .ok_or_else(|| anyhow!("no database_url in config, environment or command line"))?;
    let pool = sqlite::connect(&database_url).await?;

    let schema = match file.inline_schema()? {
        Some(schema) => schema,
        None => discover_sqlite_schema(&pool)
            .await
            .context("discovering database schema")?,
    };
    let schema = Arc::new(schema);
    log::info!("[Tenant Wiper] Schema has {} tables", schema.len());

    let builder = file.to_builder(Arc::clone(&schema), cli.tenant_id.as_deref())?;
    if cli.validate_only {
        let config = builder.validate_on_build(false).build()?;
        let summary = config.validate()?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!(
                "Configuration valid: {} tables, {} relationships, {} directly filterable, {} excluded",
                summary.tables, summary.relationships, summary.directly_filterable, summary.excluded
            );
        }
        return Ok(());
    }
    let config = Arc::new(builder.build()?);

    let options = DeleteOptions {
        dry_run: cli.dry_run,
        commit: !cli.no_commit,
    };
    let mut session = SqliteSession::begin(&pool, schema).await?;
    let report = TenantDeleter::new(config)
        .delete(&mut session, options)
        .await?;

    if !options.dry_run && !options.commit {
        // --no-commit: the flushed transaction is discarded
        session.rollback().await?;
        log::info!("[Tenant Wiper] Changes rolled back (--no-commit)");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}
