//! Loading entry drafts from files and moving entries between indexes

use std::fs;
use std::path::Path;
use tracing::{info, warn};

use ampdesk_core::{BatchOutcome, EntryDraft, Error, KnowledgeEntry, Result, VectorIndex};

/// Parse drafts from either a JSON array or JSON lines
pub fn parse_drafts(text: &str) -> Result<Vec<EntryDraft>> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| Error::InvalidInput(format!("Line {}: {}", i + 1, e)))
        })
        .collect()
}

pub fn load_drafts(path: impl AsRef<Path>) -> Result<Vec<EntryDraft>> {
    let path = path.as_ref();
    let drafts = parse_drafts(&fs::read_to_string(path)?)?;
    info!("Loaded {} drafts from {}", drafts.len(), path.display());
    Ok(drafts)
}

/// Copy active entries into `target`, embedding them again with its model.
///
/// Deactivated entries are left behind.
pub async fn migrate_entries<V>(entries: Vec<KnowledgeEntry>, target: &V) -> BatchOutcome
where
    V: VectorIndex + ?Sized,
{
    let total = entries.len();
    let drafts: Vec<EntryDraft> = entries
        .into_iter()
        .filter(|entry| entry.active)
        .map(EntryDraft::from)
        .collect();

    if drafts.len() < total {
        warn!("Skipping {} inactive entries", total - drafts.len());
    }

    let outcome = target.upsert_batch(drafts).await;
    info!(
        "Migration complete: {} succeeded, {} failed",
        outcome.succeeded,
        outcome.failed()
    );
    outcome
}
