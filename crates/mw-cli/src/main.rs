//! mw: operator CLI for the supplier sync pipeline.
//!
//! Thin shell over `mw-db` and `mw-runtime`: migrations, connector
//! registration, and manual sync triggers. The HTTP surface lives in
//! mw-daemon; this exists for operators and scripts that talk to the
//! store directly.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mw_feed::SyntheticFeed;
use mw_schemas::SyncMode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mw")]
#[command(about = "matwatch supplier sync CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Connector commands
    Connector {
        #[command(subcommand)]
        cmd: ConnectorCmd,
    },

    /// Sync job commands
    Sync {
        #[command(subcommand)]
        cmd: SyncCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence check.
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum ConnectorCmd {
    /// Register a connector for a supported supplier.
    Register {
        #[arg(long)]
        tenant: String,

        /// Supplier name (must be in the supported registry)
        #[arg(long)]
        supplier: String,

        #[arg(long, default_value = "api_key")]
        auth_type: String,

        #[arg(long, default_value_t = 1440)]
        poll_interval_minutes: i32,
    },

    /// List a tenant's connectors.
    List {
        #[arg(long)]
        tenant: String,
    },
}

#[derive(Subcommand)]
enum SyncCmd {
    /// Run one sync job to completion and print the result.
    Run {
        /// Connector id
        #[arg(long)]
        connector_id: String,

        /// Mode (incremental | full)
        #[arg(long, default_value = "incremental")]
        mode: String,

        /// Optional policy YAML; sane defaults when absent.
        #[arg(long)]
        policy: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Db { cmd } => run_db(cmd).await,
        Commands::Connector { cmd } => run_connector(cmd).await,
        Commands::Sync { cmd } => run_sync_cmd(cmd).await,
    }
}

async fn run_db(cmd: DbCmd) -> Result<()> {
    let pool = mw_db::connect_from_env().await?;
    match cmd {
        DbCmd::Status => {
            let st = mw_db::status(&pool).await?;
            println!(
                "db ok={} schema_present={}",
                st.ok, st.has_sync_runs_table
            );
        }
        DbCmd::Migrate => {
            mw_db::migrate(&pool).await?;
            println!("migrations applied");
        }
    }
    Ok(())
}

async fn run_connector(cmd: ConnectorCmd) -> Result<()> {
    let pool = mw_db::connect_from_env().await?;
    match cmd {
        ConnectorCmd::Register {
            tenant,
            supplier,
            auth_type,
            poll_interval_minutes,
        } => {
            if !mw_feed::supplier_supported(&supplier) {
                bail!(
                    "supplier {supplier} is not supported; known: {}",
                    mw_feed::SUPPORTED_SUPPLIERS.join(", ")
                );
            }
            if mw_db::connector_by_tenant_supplier(&pool, &tenant, &supplier)
                .await?
                .is_some()
            {
                bail!("connector already exists for ({tenant}, {supplier})");
            }

            let connector_id = Uuid::new_v4();
            mw_db::insert_connector(
                &pool,
                &mw_db::NewConnector {
                    connector_id,
                    tenant_id: tenant,
                    supplier_name: supplier,
                    auth_type,
                    secret_ref: format!("secret://{}", Uuid::new_v4()),
                    poll_interval_minutes,
                },
            )
            .await?;
            println!("connector_id={connector_id}");
        }
        ConnectorCmd::List { tenant } => {
            for row in mw_db::list_connectors(&pool, &tenant).await? {
                println!(
                    "{} {} health={} last_sync={}",
                    row.connector_id,
                    row.supplier_name,
                    row.health.as_str(),
                    row.last_sync_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string()),
                );
            }
        }
    }
    Ok(())
}

async fn run_sync_cmd(cmd: SyncCmd) -> Result<()> {
    let pool = mw_db::connect_from_env().await?;
    match cmd {
        SyncCmd::Run {
            connector_id,
            mode,
            policy,
        } => {
            let connector_id: Uuid = connector_id
                .parse()
                .context("connector-id must be a UUID")?;
            let mode = SyncMode::parse(&mode)?;
            let policies = match policy {
                Some(path) => mw_config::load_yaml(&path)?.policies,
                None => mw_config::Policies::sane_defaults(),
            };

            let feed = SyntheticFeed::new();
            let result =
                mw_runtime::run_sync(&pool, &policies, &feed, connector_id, mode).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("result to json")?
            );
        }
    }
    Ok(())
}
