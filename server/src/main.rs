use std::{net::SocketAddr, sync::Arc};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use migration::{Migrator, MigratorTrait};
use platform_db::connect;
use platform_obs::{ObsConfig, init_tracing};
use server::{
    config::{AppConfig, StoreKind},
    graphql::build_schema,
    http::{self, AppState},
    open_backend, seed,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "crm-server", version, about = "CRM pipeline service")]
struct Cli {
    /// Record store backing the service (overrides STORE).
    #[arg(long, global = true, value_enum)]
    store: Option<StoreKind>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run HTTP server
    Serve {
        #[arg(long, env = "BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
    /// Run migrations
    Migrate {
        #[arg(long, value_enum, default_value = "up")]
        action: MigrateAction,
    },
    /// Seed demo data
    Seed,
    /// Print GraphQL SDL
    PrintSchema,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MigrateAction {
    Up,
    Down,
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if let Some(store) = cli.store {
        config.store = store;
    }
    init_tracing(ObsConfig::default().with_otlp_endpoint(config.otlp_endpoint.clone()))?;
    let config = Arc::new(config);

    match cli.cmd {
        Cmd::Serve { bind } => {
            let backend = open_backend(&config).await?;
            let state = AppState {
                schema: build_schema(backend.store),
                db: backend.db,
                config: config.clone(),
            };
            http::serve(bind, state).await
        }
        Cmd::Migrate { action } => {
            if config.store == StoreKind::Memory {
                bail!("the memory store has no schema to migrate");
            }
            let db = connect(&config.database).await?;
            match action {
                MigrateAction::Up => Migrator::up(&db, None).await?,
                MigrateAction::Down => Migrator::down(&db, None).await?,
                MigrateAction::Reset => Migrator::reset(&db).await?,
            }
            info!(?action, "migrations finished");
            Ok(())
        }
        Cmd::Seed => {
            let backend = open_backend(&config).await?;
            let summary = seed::seed_demo(backend.store.as_ref()).await?;
            info!(?summary, "seed finished");
            Ok(())
        }
        Cmd::PrintSchema => {
            let schema = build_schema(Arc::new(products_crm::MemoryStore::default()));
            println!("{}", schema.sdl());
            Ok(())
        }
    }
}
