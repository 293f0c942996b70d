//! Record storage and ingestion
//!
//! SQLite-backed record store plus the ingestion seam that feeds it.

pub mod mock;
pub mod store;

pub use mock::{IngestBatch, IngestSource, MockSource};
pub use store::Store;

use crate::Result;

/// Row counts written by one ingestion run
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestCounts {
    pub venues: usize,
    pub players: usize,
    pub matches: usize,
    pub deliveries: usize,
}

/// Pull a batch from a source and upsert it into the raw tables
pub fn ingest(store: &Store, source: &mut dyn IngestSource) -> Result<IngestCounts> {
    let batch = source.fetch()?;
    let counts = IngestCounts {
        venues: store.write_venues(&batch.venues)?,
        players: store.write_players(&batch.players)?,
        matches: store.write_matches(&batch.matches)?,
        deliveries: store.write_deliveries(&batch.deliveries)?,
    };
    log::info!(
        "Ingested {} venues, {} players, {} matches, {} deliveries",
        counts.venues,
        counts.players,
        counts.matches,
        counts.deliveries
    );
    Ok(counts)
}
