//! Pagination and batched-ID fetch helpers
//!
//! All loaders go through these so that paging, record caps, malformed-page
//! tolerance and OR-predicate batching behave identically everywhere.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::source::{Filter, FetchError, Page, PageQuery, RecordSource};

/// Default number of records requested per page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Default hard cap on records fetched by one lookup load
pub const DEFAULT_MAX_RECORDS: usize = 50_000;

/// Default number of ids per OR-predicate batch (keeps URLs short)
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Paging behaviour for a load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub page_size: usize,
    /// Stop after this many records even if the server has more
    pub max_records: Option<usize>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::lookup()
    }
}

impl FetchOptions {
    /// Options for lookup-table loads (capped)
    pub fn lookup() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_records: Some(DEFAULT_MAX_RECORDS),
        }
    }

    /// Options without a record cap (hierarchy loads)
    pub fn unbounded() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_records: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_records(mut self, max_records: Option<usize>) -> Self {
        self.max_records = max_records;
        self
    }
}

/// Issue `$top`/`$skip` pages until a short page, handing each page to `sink`.
///
/// Pages already handed to the sink stay applied if a later page fails.
/// A malformed page counts as empty and ends pagination.
/// Returns the number of records delivered.
pub fn for_each_page<F>(
    source: &dyn RecordSource,
    query: &PageQuery,
    opts: FetchOptions,
    mut sink: F,
) -> Result<usize, FetchError>
where
    F: FnMut(Page),
{
    let page_size = opts.page_size.max(1);
    let mut delivered = 0usize;
    let mut skip = 0usize;

    loop {
        let top = match opts.max_records {
            Some(max) => page_size.min(max.saturating_sub(delivered)),
            None => page_size,
        };
        if top == 0 {
            warn!(
                entity_set = %query.entity_set,
                max_records = delivered,
                "record cap reached, stopping pagination"
            );
            break;
        }

        let page_query = query.clone().page(top, skip);
        let page = match source.fetch_page(&page_query) {
            Ok(page) => page,
            Err(e) if e.is_malformed() => {
                warn!(entity_set = %query.entity_set, skip, "{}; treating page as empty", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let count = page.len();
        debug!(entity_set = %query.entity_set, skip, count, "fetched page");

        delivered += count;
        if count > 0 {
            sink(page);
        }
        if count < top {
            break;
        }
        skip += count;
    }

    Ok(delivered)
}

/// Fetch every page of a query into one vector
pub fn fetch_all(
    source: &dyn RecordSource,
    query: &PageQuery,
    opts: FetchOptions,
) -> Result<Vec<Value>, FetchError> {
    let mut records = Vec::new();
    for_each_page(source, query, opts, |page| records.extend(page))?;
    Ok(records)
}

/// Fetch records by id in OR-predicate batches of `batch_size`.
///
/// Ids are de-duplicated and sorted; one request is issued per batch, with
/// the batch predicate ANDed onto any filter already on `template`.
/// Returns the number of records delivered.
pub fn fetch_by_id_batches<F>(
    source: &dyn RecordSource,
    template: &PageQuery,
    id_field: &str,
    ids: impl IntoIterator<Item = i64>,
    batch_size: usize,
    mut sink: F,
) -> Result<usize, FetchError>
where
    F: FnMut(Page),
{
    let ids: Vec<i64> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    let mut delivered = 0usize;

    for batch in ids.chunks(batch_size.max(1)) {
        let predicate = Filter::any_of(id_field, batch.iter().copied());
        let filter = match template.filter.clone() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        };

        let mut query = template.clone().with_filter(filter);
        query.top = None;
        query.skip = None;

        let page = match source.fetch_page(&query) {
            Ok(page) => page,
            Err(e) if e.is_malformed() => {
                warn!(entity_set = %template.entity_set, "{}; treating batch as empty", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        debug!(
            entity_set = %template.entity_set,
            requested = batch.len(),
            count = page.len(),
            "fetched id batch"
        );

        delivered += page.len();
        if !page.is_empty() {
            sink(page);
        }
    }

    Ok(delivered)
}

/// Deserialize raw records, skipping any that do not fit the type
pub fn decode_records<T: DeserializeOwned>(entity_set: &str, values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(entity_set, "skipping undecodable record: {}", e);
                None
            }
        })
        .collect()
}
