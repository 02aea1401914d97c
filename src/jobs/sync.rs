//! Peer replication of the IMDb cache.
//!
//! Each instance periodically pushes its resolved IMDb ids to the configured
//! peers; peers receive them on `POST /sync` and merge with a freshest-wins
//! rule. Records travel with their absolute expiry so that a TTL set on one
//! instance means the same wall-clock deadline on every instance.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{DiskCache, unix_now};
use crate::config::SyncSettings;
use crate::error::{AppResult, error_chain};
use crate::external::client::SourceClient;
use crate::external::imdb::ImdbResolver;
use crate::external::throttler::Throttler;

/// One IMDb cache record on the wire. `expire_time` is absolute unix seconds;
/// `None` means the record never expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    pub key: String,
    pub value: Option<String>,
    pub expire_time: Option<f64>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Records that overwrote an existing local entry.
    pub merged: usize,
    /// Records for keys we had never seen.
    pub new: usize,
}

/// Snapshot of the IMDb cache for pushing to peers. Expired and negative
/// entries are not worth replicating and are skipped.
pub fn export_records(cache: &DiskCache) -> AppResult<Vec<SyncRecord>> {
    let now = unix_now();
    let records = cache
        .entries::<Option<String>>()?
        .into_iter()
        .filter(|(_, value, expire_time)| {
            value.is_some() && !expire_time.is_some_and(|exp| exp <= now)
        })
        .map(|(key, value, expire_time)| SyncRecord {
            key,
            value,
            expire_time,
        })
        .collect();
    Ok(records)
}

/// Merges incoming records into the local cache.
///
/// Already-expired records are dropped. An incoming record replaces the local
/// entry only when the local key is absent, the incoming record is permanent,
/// or both carry expiries and the incoming one is strictly later. A permanent
/// local entry is never replaced by a temporary one.
pub fn merge_records(cache: &DiskCache, records: Vec<SyncRecord>) -> AppResult<MergeOutcome> {
    let now = unix_now();
    let mut outcome = MergeOutcome::default();

    for record in records {
        if record.expire_time.is_some_and(|exp| exp <= now) {
            continue;
        }

        match cache.get_with_expiry::<Option<String>>(&record.key)? {
            None => {
                cache.set_at(&record.key, &record.value, record.expire_time)?;
                outcome.new += 1;
            }
            Some((_, local_expire)) => {
                let accept = match (local_expire, record.expire_time) {
                    (_, None) => true,
                    (None, Some(_)) => false,
                    (Some(local), Some(incoming)) => incoming > local,
                };
                if accept {
                    cache.set_at(&record.key, &record.value, record.expire_time)?;
                    outcome.merged += 1;
                }
            }
        }
    }

    tracing::info!(merged = outcome.merged, new = outcome.new, "Merged sync records");
    Ok(outcome)
}

/// Push loop. Runs until the process exits; every failure is logged and the
/// next round proceeds on schedule.
pub async fn run(resolver: Arc<ImdbResolver>, settings: SyncSettings, throttler: Arc<Throttler>) {
    if settings.push_to.is_empty() {
        tracing::info!("No sync peers configured, sync disabled");
        return;
    }

    let client = match SourceClient::builder(throttler).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %error_chain(&e), "Failed to build sync client, sync disabled");
            return;
        }
    };

    loop {
        push_once(&resolver, &settings, &client).await;
        tokio::time::sleep(Duration::from_secs_f64(settings.interval_seconds)).await;
    }
}

async fn push_once(resolver: &ImdbResolver, settings: &SyncSettings, client: &SourceClient) {
    let records = match export_records(resolver.cache()) {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(error = %error_chain(&e), "Failed to export sync records");
            return;
        }
    };
    tracing::info!(count = records.len(), peers = settings.push_to.len(), "Pushing sync records");

    for peer in &settings.push_to {
        match client.post_json(peer, &records).await {
            Ok(()) => tracing::info!(%peer, "Pushed sync records"),
            Err(e) => tracing::warn!(%peer, error = %error_chain(&e), "Failed to push sync records"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cache() -> (DiskCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::open(dir.path().join("imdb")).unwrap();
        (cache, dir)
    }

    fn record(key: &str, value: Option<&str>, expire_time: Option<f64>) -> SyncRecord {
        SyncRecord {
            key: key.to_string(),
            value: value.map(str::to_string),
            expire_time,
        }
    }

    #[test]
    fn test_export_skips_expired_and_negative() {
        let (cache, _dir) = test_cache();
        cache
            .set("resolved", &Some("tt0000001".to_string()), None)
            .unwrap();
        cache
            .set("temporary", &Some("tt0000002".to_string()), Some(3600.0))
            .unwrap();
        cache.set::<Option<String>>("negative", &None, Some(3600.0)).unwrap();
        cache
            .set_at("expired", &Some("tt0000003".to_string()), Some(unix_now() - 1.0))
            .unwrap();

        let mut keys: Vec<String> = export_records(&cache)
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        keys.sort();
        assert_eq!(keys, ["resolved", "temporary"]);
    }

    #[test]
    fn test_merge_new_key_is_accepted() {
        let (cache, _dir) = test_cache();
        let outcome = merge_records(
            &cache,
            vec![record("1", Some("tt0000001"), Some(unix_now() + 3600.0))],
        )
        .unwrap();
        assert_eq!(outcome, MergeOutcome { merged: 0, new: 1 });
        assert_eq!(
            cache.get::<Option<String>>("1").unwrap(),
            Some(Some("tt0000001".to_string()))
        );
    }

    #[test]
    fn test_merge_fresher_wins() {
        let (cache, _dir) = test_cache();
        cache
            .set_at("1", &Some("old".to_string()), Some(unix_now() + 100.0))
            .unwrap();

        let outcome = merge_records(
            &cache,
            vec![record("1", Some("newer"), Some(unix_now() + 200.0))],
        )
        .unwrap();
        assert_eq!(outcome, MergeOutcome { merged: 1, new: 0 });
        assert_eq!(
            cache.get::<Option<String>>("1").unwrap(),
            Some(Some("newer".to_string()))
        );
    }

    #[test]
    fn test_merge_stale_loses() {
        let (cache, _dir) = test_cache();
        cache
            .set_at("1", &Some("local".to_string()), Some(unix_now() + 200.0))
            .unwrap();

        let outcome = merge_records(
            &cache,
            vec![record("1", Some("stale"), Some(unix_now() + 100.0))],
        )
        .unwrap();
        assert_eq!(outcome, MergeOutcome::default());
        assert_eq!(
            cache.get::<Option<String>>("1").unwrap(),
            Some(Some("local".to_string()))
        );
    }

    #[test]
    fn test_merge_permanent_is_never_replaced_by_temporary() {
        let (cache, _dir) = test_cache();
        cache.set("1", &Some("permanent".to_string()), None).unwrap();

        let outcome = merge_records(
            &cache,
            vec![record("1", Some("temporary"), Some(unix_now() + 9999.0))],
        )
        .unwrap();
        assert_eq!(outcome, MergeOutcome::default());
        assert_eq!(
            cache.get::<Option<String>>("1").unwrap(),
            Some(Some("permanent".to_string()))
        );
    }

    #[test]
    fn test_merge_permanent_replaces_temporary() {
        let (cache, _dir) = test_cache();
        cache
            .set_at("1", &Some("temporary".to_string()), Some(unix_now() + 100.0))
            .unwrap();

        let outcome =
            merge_records(&cache, vec![record("1", Some("permanent"), None)]).unwrap();
        assert_eq!(outcome, MergeOutcome { merged: 1, new: 0 });
        let (value, expire) = cache
            .get_with_expiry::<Option<String>>("1")
            .unwrap()
            .unwrap();
        assert_eq!(value, Some("permanent".to_string()));
        assert_eq!(expire, None);
    }

    #[test]
    fn test_merge_skips_already_expired_incoming() {
        let (cache, _dir) = test_cache();
        let outcome = merge_records(
            &cache,
            vec![record("1", Some("tt0000001"), Some(unix_now() - 1.0))],
        )
        .unwrap();
        assert_eq!(outcome, MergeOutcome::default());
        assert_eq!(cache.get::<Option<String>>("1").unwrap(), None);
    }
}
