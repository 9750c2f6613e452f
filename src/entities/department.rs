//! Department record

use serde::{Deserialize, Serialize};

use crate::core::entity::{EntityKind, LookupRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(rename = "Description", default)]
    pub description: String,
}

impl LookupRecord for Department {
    const ENTITY_SET: &'static str = "Department";
    const SELECT: &'static [&'static str] = &["ID", "Description"];
    const KIND: EntityKind = EntityKind::Department;

    fn id(&self) -> i64 {
        self.id
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
