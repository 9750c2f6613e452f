//! Agreement type record (employment agreement / award classification)

use serde::{Deserialize, Serialize};

use crate::core::entity::{EntityKind, LookupRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementType {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(rename = "Description", default)]
    pub description: String,
}

impl LookupRecord for AgreementType {
    const ENTITY_SET: &'static str = "AgreementType";
    const SELECT: &'static [&'static str] = &["ID", "Description"];
    const KIND: EntityKind = EntityKind::AgreementType;

    fn id(&self) -> i64 {
        self.id
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
