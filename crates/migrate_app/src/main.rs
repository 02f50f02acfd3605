mod logging;
mod targets;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use engine_logging::{engine_info, engine_warn};
use migrate_engine::{MigrationConfig, Migrator, ReqwestFetcher, DEFAULT_SITE_ROOT};
use url::Url;

/// Overrides the directory that receives `public/fragments` and `public/images/imported`.
const OUTPUT_ROOT_ENV: &str = "MIGRATE_OUTPUT_ROOT";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    logging::initialize();

    let output_root = std::env::var_os(OUTPUT_ROOT_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let site_root = Url::parse(DEFAULT_SITE_ROOT).context("site root")?;
    let config = MigrationConfig::for_site(site_root, &output_root);
    let pages = targets::pages(&config);
    let boards = targets::boards(&config);
    engine_info!(
        "Migrating {} pages and {} boards from {} into {:?}",
        pages.len(),
        boards.len(),
        config.site_root,
        output_root
    );

    let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone()));
    let migrator = Migrator::new(config, fetcher);
    let report = migrator
        .run(&pages, &boards)
        .await
        .context("preparing output directories")?;

    for failure in report.failures() {
        if let Err(err) = &failure.result {
            engine_warn!("{} {} failed: {}", failure.kind, failure.fragment_name, err);
        }
    }
    Ok(())
}
