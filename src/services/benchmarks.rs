use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;

use crate::cache::{Cache, CacheExt, CacheKeys, CacheResult};
use crate::models::{BenchmarkCatalog, BenchmarkRecord, validate_records};

/// Curated benchmark data compiled into the binary.
const EMBEDDED_BENCHMARKS: &str = include_str!("../../data/benchmarks.json");

static FALLBACK_MODELS: Lazy<Vec<BenchmarkRecord>> = Lazy::new(|| {
    let records: Vec<BenchmarkRecord> =
        serde_json::from_str(EMBEDDED_BENCHMARKS).expect("embedded benchmark data is valid JSON");
    validate_records(&records).expect("embedded benchmark data is valid");
    records
});

/// Serves the benchmark catalog, optionally mirrored through a cache.
///
/// The embedded records are the source of truth. When a cache is configured
/// the full catalog payload is mirrored under the `benchmarks` key so repeat
/// reads skip serialization, and so an external refresher can overwrite the
/// mirror without a redeploy. Cache failures propagate to the handler, which
/// turns them into a 503.
pub struct BenchmarkService {
    cache: Option<Arc<dyn Cache>>,
    catalog_ttl: Duration,
}

impl BenchmarkService {
    pub fn new(cache: Option<Arc<dyn Cache>>, catalog_ttl: Duration) -> Self {
        Self { cache, catalog_ttl }
    }

    /// The full catalog, from the cache mirror when one is warm.
    ///
    /// A cold mirror is warmed with the embedded data before returning.
    pub async fn catalog(&self) -> CacheResult<BenchmarkCatalog> {
        let Some(cache) = &self.cache else {
            return Ok(self.fallback_catalog());
        };

        if let Some(catalog) = cache
            .get_json::<BenchmarkCatalog>(CacheKeys::benchmarks())
            .await?
        {
            return Ok(catalog);
        }

        let catalog = self.fallback_catalog();
        cache
            .set_json(CacheKeys::benchmarks(), &catalog, self.catalog_ttl)
            .await?;
        Ok(catalog)
    }

    /// Records for the requested model ids, in catalog order.
    ///
    /// Unknown ids are silently dropped. Always reads the embedded data so a
    /// stale or tampered mirror cannot change comparison results.
    pub fn compare(&self, requested: &[&str]) -> Vec<BenchmarkRecord> {
        let wanted: HashSet<&str> = requested.iter().copied().collect();
        FALLBACK_MODELS
            .iter()
            .filter(|record| wanted.contains(record.id.as_str()))
            .cloned()
            .collect()
    }

    fn fallback_catalog(&self) -> BenchmarkCatalog {
        BenchmarkCatalog {
            models: FALLBACK_MODELS.clone(),
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
