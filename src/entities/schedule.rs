//! Schedule record - the join point between shifts and locations
//!
//! Shifts reference a schedule, and the schedule references a location.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::entity::{EntityKind, LookupRecord};

/// A Nimbus schedule (roster period at a location)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(rename = "Description", default)]
    pub description: String,

    #[serde(rename = "Start", default, deserialize_with = "lenient_timestamp")]
    pub start: Option<NaiveDateTime>,

    #[serde(rename = "Finish", default, deserialize_with = "lenient_timestamp")]
    pub finish: Option<NaiveDateTime>,

    /// Location foreign key.
    ///
    /// `None` means the payload did not carry the field at all (an entry
    /// loaded by an older query); `Some(None)` means the schedule genuinely
    /// has no location.
    #[serde(
        rename = "LocationID",
        default,
        deserialize_with = "present_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub location_id: Option<Option<i64>>,
}

impl Schedule {
    /// True when every field the cache relies on was present in the payload
    pub fn is_complete(&self) -> bool {
        self.location_id.is_some()
    }

    /// The schedule's location, if it has one
    pub fn location(&self) -> Option<i64> {
        self.location_id.flatten()
    }
}

impl LookupRecord for Schedule {
    const ENTITY_SET: &'static str = "Schedule";
    const SELECT: &'static [&'static str] = &["ID", "Description", "Start", "Finish", "LocationID"];
    const KIND: EntityKind = EntityKind::Schedule;

    fn id(&self) -> i64 {
        self.id
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Distinguish "field present (maybe null)" from "field absent"
fn present_field<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

/// Accept RFC 3339 timestamps and the offset-less form the API commonly returns
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| parse_timestamp(&s)))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}
