//! Connection-scoped reference data
//!
//! Bundles the lookup cache and the hierarchy resolver for the current
//! connection. At most one connection is active at a time; switching
//! connections means [`ReferenceData::clear`] followed by a fresh load.

use tracing::info;

use crate::core::config::{Config, ConfigError};
use crate::core::fetch::FetchOptions;
use crate::core::hierarchy::HierarchyResolver;
use crate::core::lookup::LookupCache;
use crate::core::source::{FetchError, RecordSource};

/// Reference data for one connection
#[derive(Default)]
pub struct ReferenceData {
    pub lookups: LookupCache,
    pub hierarchy: HierarchyResolver,
}

impl ReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build caches with paging, batch size and TTL taken from configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let paging = FetchOptions::lookup().with_page_size(config.page_size());

        Ok(Self {
            lookups: LookupCache::new()
                .with_options(paging.with_max_records(Some(config.max_records())))
                .with_schedule_batch_size(config.schedule_batch_size()),
            hierarchy: HierarchyResolver::new()
                .with_options(paging.with_max_records(None))
                .with_ttl(config.hierarchy_ttl()?),
        })
    }

    /// Load lookups and hierarchy in parallel.
    ///
    /// The two are independent; both run to completion and the lookup error,
    /// if any, is reported first.
    pub fn load(&self, source: &dyn RecordSource) -> Result<(), FetchError> {
        let (lookups, hierarchy) = std::thread::scope(|s| {
            let lookups = s.spawn(|| self.lookups.load_all(source));
            let hierarchy = s.spawn(|| self.hierarchy.load_hierarchy(source));
            (
                lookups.join().unwrap_or_else(|p| std::panic::resume_unwind(p)),
                hierarchy.join().unwrap_or_else(|p| std::panic::resume_unwind(p)),
            )
        });

        lookups?;
        hierarchy?;
        info!(groups = self.hierarchy.group_count(), "reference data ready");
        Ok(())
    }

    /// Drop everything. Call on disconnect or before switching connections.
    pub fn clear(&self) {
        self.lookups.clear_caches();
        self.hierarchy.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::MemorySource;
    use chrono::Duration;
    use serde_json::json;

    fn source() -> MemorySource {
        MemorySource::new()
            .with_set(
                "Location",
                vec![json!({"ID": 10, "Description": "Clayton", "Active": true, "Deleted": false})],
            )
            .with_set(
                "LocationGroup",
                vec![json!({"ID": 1, "Description": "Monash", "Active": true, "Deleted": false})],
            )
            .with_set(
                "LocationGroupLocation",
                vec![json!({"LocationGroupID": 1, "LocationID": 10, "Active": true, "Deleted": false})],
            )
    }

    #[test]
    fn test_load_populates_both_components() {
        let source = source();
        let data = ReferenceData::new();

        data.load(&source).unwrap();

        let locations = data.hierarchy.resolve_locations_for_group(1);
        let names: Vec<String> = locations
            .iter()
            .map(|id| data.lookups.location_name(*id))
            .collect();
        assert_eq!(names, vec!["Clayton"]);
    }

    #[test]
    fn test_clear_then_reload_refetches() {
        let source = source();
        let data = ReferenceData::new();

        data.load(&source).unwrap();
        data.load(&source).unwrap();
        assert_eq!(source.call_count("Location"), 1);
        assert_eq!(source.call_count("LocationGroup"), 1);

        data.clear();
        assert_eq!(data.lookups.location_name(10), "Location 10");

        data.load(&source).unwrap();
        assert_eq!(source.call_count("Location"), 2);
        assert_eq!(source.call_count("LocationGroup"), 2);
    }

    #[test]
    fn test_hierarchy_failure_still_loads_lookups() {
        let source = source().failing("LocationGroup");
        let data = ReferenceData::new();

        assert!(data.load(&source).is_err());
        assert_eq!(data.lookups.location_name(10), "Clayton");
    }

    #[test]
    fn test_from_config_applies_settings() {
        let config = Config {
            schedule_batch_size: Some(2),
            hierarchy_ttl_hours: Some(1),
            ..Default::default()
        };
        let data = ReferenceData::from_config(&config).unwrap();
        assert_eq!(data.hierarchy.ttl(), Duration::hours(1));

        let source = MemorySource::new().with_set(
            "Schedule",
            (1..=5).map(|i| json!({"ID": i, "LocationID": 10})).collect(),
        );
        data.lookups.load_schedules(&source, 1..=5).unwrap();
        assert_eq!(source.call_count("Schedule"), 3);
    }

    #[test]
    fn test_from_config_rejects_huge_ttl() {
        let config = Config {
            hierarchy_ttl_hours: Some(i64::MAX / 1000),
            ..Default::default()
        };
        assert!(matches!(
            ReferenceData::from_config(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
