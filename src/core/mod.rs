//! Core module - fetching, caching and resolving Nimbus reference data

pub mod config;
pub mod entity;
pub mod fetch;
pub mod hierarchy;
pub mod lookup;
pub mod odata;
pub mod reference;
pub mod session;
pub mod source;

pub use config::{Config, ConfigError};
pub use entity::{EntityKind, LookupRecord};
pub use fetch::FetchOptions;
pub use hierarchy::{GroupGraph, HierarchyResolver};
pub use lookup::{LoadState, LookupCache, TableStats};
pub use odata::ODataClient;
pub use reference::ReferenceData;
pub use session::Session;
pub use source::{FetchError, Filter, FilterValue, MemorySource, Page, PageQuery, RecordSource};
