//! Location record

use serde::{Deserialize, Serialize};

use crate::core::entity::{EntityKind, LookupRecord};

/// A physical or logical location shifts are worked at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(rename = "Description", default)]
    pub description: String,
}

impl LookupRecord for Location {
    const ENTITY_SET: &'static str = "Location";
    const SELECT: &'static [&'static str] = &["ID", "Description"];
    const KIND: EntityKind = EntityKind::Location;

    fn id(&self) -> i64 {
        self.id
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
