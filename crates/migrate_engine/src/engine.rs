use std::sync::Arc;

use engine_logging::{engine_info, engine_warn};

use crate::assets::AssetStore;
use crate::board::BoardCrawler;
use crate::config::{BoardTarget, MigrationConfig, PageTarget};
use crate::extract::PageExtractor;
use crate::fetch::Fetcher;
use crate::persist::{ensure_output_dir, FragmentWriter, PersistError};
use crate::{MigrationReport, TargetError, TargetKind, TargetOutcome, TargetReport};

/// Runs the configured targets one after another and collects a report.
///
/// Owns the only cross-page state, the asset store. A failing target is logged
/// and recorded; it never stops the batch.
pub struct Migrator {
    config: Arc<MigrationConfig>,
    assets: Arc<AssetStore>,
    pages: PageExtractor,
    boards: BoardCrawler,
    fragments: FragmentWriter,
}

impl Migrator {
    pub fn new(config: MigrationConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let config = Arc::new(config);
        let assets = Arc::new(AssetStore::new(&config));
        let pages = PageExtractor::new(config.clone(), fetcher, assets.clone());
        let boards = BoardCrawler::new(pages.clone());
        let fragments = FragmentWriter::new(config.fragments_dir.clone());
        Self {
            config,
            assets,
            pages,
            boards,
            fragments,
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    /// Create the fragment and image directories. The only fatal step of a run.
    pub fn prepare_output(&self) -> Result<(), PersistError> {
        ensure_output_dir(&self.config.fragments_dir)?;
        ensure_output_dir(&self.config.images_dir)
    }

    pub async fn run(
        &self,
        pages: &[PageTarget],
        boards: &[BoardTarget],
    ) -> Result<MigrationReport, PersistError> {
        self.prepare_output()?;
        let mut targets = self.run_pages(pages).await;
        targets.extend(self.run_boards(boards).await);
        let report = MigrationReport {
            targets,
            assets_written: self.assets.files_written(),
        };
        engine_info!("Migration finished: {}", report.summary());
        Ok(report)
    }

    pub async fn run_pages(&self, pages: &[PageTarget]) -> Vec<TargetReport> {
        let mut reports = Vec::with_capacity(pages.len());
        for target in pages {
            reports.push(self.run_page(target).await);
        }
        reports
    }

    pub async fn run_boards(&self, boards: &[BoardTarget]) -> Vec<TargetReport> {
        let mut reports = Vec::with_capacity(boards.len());
        for target in boards {
            reports.push(self.run_board(target).await);
        }
        reports
    }

    pub async fn run_page(&self, target: &PageTarget) -> TargetReport {
        let result = self.migrate_page(target).await;
        match &result {
            Ok(outcome) => engine_info!(
                "Saved fragment {} ({} bytes, {:?})",
                target.fragment_name,
                outcome.bytes_written,
                outcome.path
            ),
            Err(err) => engine_warn!("content fail {} {}: {}", target.fragment_name, target.url, err),
        }
        TargetReport {
            fragment_name: target.fragment_name.clone(),
            kind: TargetKind::Page,
            result,
        }
    }

    pub async fn run_board(&self, target: &BoardTarget) -> TargetReport {
        let result = self.migrate_board(target).await;
        match &result {
            Ok(outcome) => engine_info!(
                "Saved board fragment {} {}",
                target.fragment_name,
                outcome.items.unwrap_or(0)
            ),
            Err(err) => engine_warn!("board fail {} {}: {}", target.fragment_name, target.url, err),
        }
        TargetReport {
            fragment_name: target.fragment_name.clone(),
            kind: TargetKind::Board,
            result,
        }
    }

    async fn migrate_page(&self, target: &PageTarget) -> Result<TargetOutcome, TargetError> {
        let page = self.pages.extract_page(&target.url).await?;
        let path = self.fragments.write_fragment(&target.fragment_name, &page.html)?;
        Ok(TargetOutcome {
            path,
            bytes_written: page.html.len() as u64,
            items: None,
            spam_flagged: page.spam_keyword.is_some(),
        })
    }

    async fn migrate_board(&self, target: &BoardTarget) -> Result<TargetOutcome, TargetError> {
        let board = self
            .boards
            .crawl_board(&target.url, target.item_limit)
            .await?;
        if board.dropped > 0 || board.screened > 0 {
            engine_info!(
                "Board {} screened={} dropped={}",
                target.fragment_name,
                board.screened,
                board.dropped
            );
        }
        let path = self.fragments.write_fragment(&target.fragment_name, &board.html)?;
        Ok(TargetOutcome {
            path,
            bytes_written: board.html.len() as u64,
            items: Some(board.items.len()),
            spam_flagged: false,
        })
    }
}
