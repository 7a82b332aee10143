//! Retention for stale cache entries
use fjall::{Keyspace, PartitionHandle};
use serde::Deserialize;
use tracing::debug;

use super::error::Result;
use super::keys::encode_meta_key;
use super::store::now_secs;

const META_LAST_PRUNE: &str = "last_prune";
const SECS_PER_DAY: i64 = 86_400;

/// Pruning statistics
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub responses_pruned: usize,
    pub files_pruned: usize,
}

/// Staleness fields shared by every cached value
#[derive(Deserialize)]
struct StaleMarker {
    #[serde(default)]
    stale: bool,
    #[serde(default)]
    stale_since: Option<i64>,
}

/// Remove entries stale for longer than the retention window
pub fn prune_stale(
    keyspace: &Keyspace,
    responses: &PartitionHandle,
    files: &PartitionHandle,
    metadata: &PartitionHandle,
    retention_days: u32,
) -> Result<PruneStats> {
    let now = now_secs();
    let cutoff = now - i64::from(retention_days) * SECS_PER_DAY;

    let stats = PruneStats {
        responses_pruned: prune_partition(responses, cutoff)?,
        files_pruned: prune_partition(files, cutoff)?,
    };

    metadata.insert(encode_meta_key(META_LAST_PRUNE), now.to_string().as_bytes())?;
    keyspace.persist(fjall::PersistMode::SyncAll)?;

    Ok(stats)
}

fn prune_partition(partition: &PartitionHandle, cutoff: i64) -> Result<usize> {
    let mut expired = Vec::new();

    for item in partition.iter() {
        let (key, value) = item?;
        let marker: StaleMarker = serde_json::from_slice(&value)?;
        let past_retention = marker.stale_since.is_some_and(|since| since <= cutoff);
        if marker.stale && past_retention {
            expired.push(key);
        }
    }

    for key in &expired {
        partition.remove(key.clone())?;
    }

    debug!(pruned = expired.len(), "Pruned partition");
    Ok(expired.len())
}
