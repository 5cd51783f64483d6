mod config;
mod error;
mod overlap;
mod resolver;
mod store;

use anyhow::Result;
use config::Config;
use database::{deadpool_postgres, tokio_postgres::NoTls};
use store::PgStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::ChronoLocal::rfc_3339()),
        )
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}

#[tracing::instrument(skip_all, err)]
pub fn connect_database(config: &Config) -> Result<deadpool_postgres::Pool> {
    let mut database_config = deadpool_postgres::Config::new();
    database_config.url = Some(config.database_url.clone());
    let database = database_config.create_pool(Some(deadpool_postgres::Runtime::Tokio1), NoTls)?;

    Ok(database)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load()?;
    let database = connect_database(&config)?;

    let mut client = database.get().await?;
    let transaction = client.transaction().await?;

    let outcome = resolver::run(
        &PgStore::new(&transaction),
        config.dry_run,
        &mut std::io::stdout().lock(),
    )
    .await?;
    tracing::info!(
        overlaps = outcome.plan.decisions.len(),
        removed = outcome.plan.removed.len(),
        unresolved = outcome.plan.unresolved.len(),
        dry_run = config.dry_run,
        "Resolution finished"
    );

    // Dropping an uncommitted transaction rolls it back.
    if outcome.removal.is_some() {
        transaction.commit().await?;
        tracing::info!("Committed");
    }

    Ok(())
}
