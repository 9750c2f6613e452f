//! Reference lookup cache
//!
//! Flat tables of users, locations, departments, agreement types and
//! schedules, keyed by numeric ID, used to turn foreign keys on report rows
//! into display strings.
//!
//! - Full-table loads are load-once-per-session: a table that finished
//!   loading is never re-fetched until [`LookupCache::clear_caches`], even
//!   if it turned out to be empty.
//! - Schedules are loaded by ID; only ids that are missing (or cached
//!   without a location field) are requested.
//! - Point lookups never fail: unknown ids yield a placeholder such as
//!   `"Location 42"`.
//!
//! Each table is guarded by its own load mutex so that two threads loading
//! the same table do not interleave their populate steps.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::core::entity::{EntityKind, LookupRecord};
use crate::core::fetch::{
    decode_records, fetch_by_id_batches, for_each_page, FetchOptions, DEFAULT_BATCH_SIZE,
};
use crate::core::source::{FetchError, Filter, PageQuery, RecordSource};
use crate::entities::{AgreementType, Department, Location, Schedule, User};

/// Load state of one cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded { at: DateTime<Utc> },
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded { .. })
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::NotLoaded => write!(f, "not loaded"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::Loaded { at } => write!(f, "loaded {}", at.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Row count and state of one table
#[derive(Debug, Clone, Serialize)]
pub struct TableStats {
    pub kind: String,
    pub rows: usize,
    pub state: LoadState,
}

struct Table<T> {
    entries: HashMap<i64, T>,
    state: LoadState,
}

struct TableCell<T> {
    table: RwLock<Table<T>>,
    load_lock: Mutex<()>,
}

impl<T> TableCell<T> {
    fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                entries: HashMap::new(),
                state: LoadState::NotLoaded,
            }),
            load_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Table<T>> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table<T>> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: LoadState) {
        self.write().state = state;
    }
}

impl<T: LookupRecord> TableCell<T> {
    fn insert_all(&self, records: Vec<T>) {
        let mut table = self.write();
        for record in records {
            table.entries.insert(record.id(), record);
        }
    }

    fn get(&self, id: i64) -> Option<T> {
        self.read().entries.get(&id).cloned()
    }

    fn name(&self, id: i64) -> String {
        self.read()
            .entries
            .get(&id)
            .map(|r| r.description())
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| T::KIND.placeholder(id))
    }

    fn all_sorted(&self) -> Vec<T> {
        let mut all: Vec<T> = self.read().entries.values().cloned().collect();
        all.sort_by_cached_key(|r| (r.description().to_lowercase(), r.id()));
        all
    }

    fn clear(&self) {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = self.write();
        table.entries.clear();
        table.state = LoadState::NotLoaded;
    }

    fn stats(&self) -> TableStats {
        let table = self.read();
        TableStats {
            kind: T::KIND.to_string(),
            rows: table.entries.len(),
            state: table.state,
        }
    }
}

/// The reference lookup cache for one connection
pub struct LookupCache {
    users: TableCell<User>,
    locations: TableCell<Location>,
    departments: TableCell<Department>,
    agreement_types: TableCell<AgreementType>,
    schedules: TableCell<Schedule>,
    options: FetchOptions,
    schedule_batch_size: usize,
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupCache {
    /// Create an empty cache with default paging
    pub fn new() -> Self {
        Self {
            users: TableCell::new(),
            locations: TableCell::new(),
            departments: TableCell::new(),
            agreement_types: TableCell::new(),
            schedules: TableCell::new(),
            options: FetchOptions::lookup(),
            schedule_batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override paging for full-table loads
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the number of schedule ids per request
    pub fn with_schedule_batch_size(mut self, batch_size: usize) -> Self {
        self.schedule_batch_size = batch_size.max(1);
        self
    }

    // =====================================================================
    // Full-table loads
    // =====================================================================

    pub fn load_users(&self, source: &dyn RecordSource) -> Result<(), FetchError> {
        self.load_table(&self.users, source)
    }

    pub fn load_locations(&self, source: &dyn RecordSource) -> Result<(), FetchError> {
        self.load_table(&self.locations, source)
    }

    pub fn load_departments(&self, source: &dyn RecordSource) -> Result<(), FetchError> {
        self.load_table(&self.departments, source)
    }

    pub fn load_agreement_types(&self, source: &dyn RecordSource) -> Result<(), FetchError> {
        self.load_table(&self.agreement_types, source)
    }

    /// Load every full table concurrently.
    ///
    /// All loads run to completion; the first error (in table order) is returned.
    pub fn load_all(&self, source: &dyn RecordSource) -> Result<(), FetchError> {
        let results = std::thread::scope(|s| {
            let handles = [
                s.spawn(|| self.load_users(source)),
                s.spawn(|| self.load_locations(source)),
                s.spawn(|| self.load_departments(source)),
                s.spawn(|| self.load_agreement_types(source)),
            ];
            handles.map(|h| h.join().unwrap_or_else(|p| std::panic::resume_unwind(p)))
        });

        results.into_iter().collect()
    }

    fn load_table<T: LookupRecord>(
        &self,
        cell: &TableCell<T>,
        source: &dyn RecordSource,
    ) -> Result<(), FetchError> {
        let _guard = cell.load_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if cell.read().state.is_loaded() {
            debug!(entity_set = T::ENTITY_SET, "already loaded, skipping");
            return Ok(());
        }
        cell.set_state(LoadState::Loading);

        let query = PageQuery::new(T::ENTITY_SET)
            .with_filter(Filter::active())
            .with_select(T::SELECT)
            .with_order_by("ID");

        let result = for_each_page(source, &query, self.options, |page| {
            cell.insert_all(decode_records::<T>(T::ENTITY_SET, page));
        });

        match result {
            Ok(count) => {
                cell.set_state(LoadState::Loaded { at: Utc::now() });
                info!(entity_set = T::ENTITY_SET, count, "lookup table loaded");
                Ok(())
            }
            Err(e) => {
                // Rows from pages that did arrive stay in place
                cell.set_state(LoadState::NotLoaded);
                Err(e)
            }
        }
    }

    // =====================================================================
    // Schedules (ID-scoped)
    // =====================================================================

    /// Load the schedules referenced by a report's rows.
    ///
    /// Only ids not already cached with a location field are requested,
    /// in OR-predicate batches. Returns the number of records fetched.
    pub fn load_schedules(
        &self,
        source: &dyn RecordSource,
        schedule_ids: impl IntoIterator<Item = i64>,
    ) -> Result<usize, FetchError> {
        let _guard = self
            .schedules
            .load_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let missing = self.schedule_ids_missing(schedule_ids);
        if missing.is_empty() {
            debug!("all requested schedules cached");
            return Ok(0);
        }

        let template = PageQuery::new(Schedule::ENTITY_SET).with_select(Schedule::SELECT);
        let fetched = fetch_by_id_batches(
            source,
            &template,
            "ID",
            missing.iter().copied(),
            self.schedule_batch_size,
            |page| {
                self.schedules
                    .insert_all(decode_records::<Schedule>(Schedule::ENTITY_SET, page))
            },
        )?;

        self.schedules.set_state(LoadState::Loaded { at: Utc::now() });
        info!(requested = missing.len(), fetched, "schedules loaded");
        Ok(fetched)
    }

    /// Which of the ids still need fetching (absent, or cached without a location field)
    pub fn schedule_ids_missing(&self, schedule_ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
        let table = self.schedules.read();
        let mut missing: Vec<i64> = schedule_ids
            .into_iter()
            .filter(|id| !table.entries.get(id).is_some_and(Schedule::is_complete))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }

    // =====================================================================
    // Point lookups
    // =====================================================================

    pub fn user(&self, id: i64) -> Option<User> {
        self.users.get(id)
    }

    pub fn location(&self, id: i64) -> Option<Location> {
        self.locations.get(id)
    }

    pub fn department(&self, id: i64) -> Option<Department> {
        self.departments.get(id)
    }

    pub fn agreement_type(&self, id: i64) -> Option<AgreementType> {
        self.agreement_types.get(id)
    }

    pub fn schedule(&self, id: i64) -> Option<Schedule> {
        self.schedules.get(id)
    }

    /// User's display name, or `"User {id}"`
    pub fn user_name(&self, id: i64) -> String {
        self.users.name(id)
    }

    /// Location description, or `"Location {id}"`
    pub fn location_name(&self, id: i64) -> String {
        self.locations.name(id)
    }

    pub fn department_name(&self, id: i64) -> String {
        self.departments.name(id)
    }

    pub fn agreement_type_name(&self, id: i64) -> String {
        self.agreement_types.name(id)
    }

    pub fn schedule_name(&self, id: i64) -> String {
        self.schedules.name(id)
    }

    /// Display string for any kind
    pub fn display_name(&self, kind: EntityKind, id: i64) -> String {
        match kind {
            EntityKind::User => self.user_name(id),
            EntityKind::Location => self.location_name(id),
            EntityKind::Department => self.department_name(id),
            EntityKind::AgreementType => self.agreement_type_name(id),
            EntityKind::Schedule => self.schedule_name(id),
        }
    }

    /// Schedule -> location -> description. Empty if any link is missing.
    pub fn location_via_schedule(&self, schedule_id: i64) -> String {
        self.schedules
            .get(schedule_id)
            .and_then(|s| s.location())
            .and_then(|location_id| self.locations.get(location_id))
            .map(|l| l.description)
            .unwrap_or_default()
    }

    // =====================================================================
    // Enumeration
    // =====================================================================

    /// All users sorted by display name
    pub fn all_users(&self) -> Vec<User> {
        self.users.all_sorted()
    }

    pub fn all_locations(&self) -> Vec<Location> {
        self.locations.all_sorted()
    }

    pub fn all_departments(&self) -> Vec<Department> {
        self.departments.all_sorted()
    }

    pub fn all_agreement_types(&self) -> Vec<AgreementType> {
        self.agreement_types.all_sorted()
    }

    pub fn all_schedules(&self) -> Vec<Schedule> {
        self.schedules.all_sorted()
    }

    // =====================================================================
    // Lifecycle
    // =====================================================================

    /// Drop every table. Call before switching connections.
    pub fn clear_caches(&self) {
        self.users.clear();
        self.locations.clear();
        self.departments.clear();
        self.agreement_types.clear();
        self.schedules.clear();
        debug!("lookup caches cleared");
    }

    /// Row counts and load states for every table
    pub fn stats(&self) -> Vec<TableStats> {
        vec![
            self.users.stats(),
            self.locations.stats(),
            self.departments.stats(),
            self.agreement_types.stats(),
            self.schedules.stats(),
        ]
    }
}
