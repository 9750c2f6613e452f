//! Location group records - the raw rows the hierarchy is built from

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Placeholder description the backend uses for unnamed groups
pub const PLACEHOLDER_DESCRIPTION: &str = "-";

/// A location group row (`LocationGroup` entity set)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationGroup {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(rename = "Description", default)]
    pub description: Option<String>,

    #[serde(rename = "OrgCode", default)]
    pub org_code: Option<String>,
}

impl LocationGroup {
    pub const ENTITY_SET: &'static str = "LocationGroup";
    pub const SELECT: &'static [&'static str] = &["ID", "Description", "OrgCode"];
}

/// Direct assignment of a location to a group (`LocationGroupLocation`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationGroupLocation {
    #[serde(rename = "LocationGroupID")]
    pub location_group_id: i64,

    #[serde(rename = "LocationID")]
    pub location_id: i64,
}

impl LocationGroupLocation {
    pub const ENTITY_SET: &'static str = "LocationGroupLocation";
    pub const SELECT: &'static [&'static str] = &["LocationGroupID", "LocationID"];
}

/// Nesting of one group under another (`LocationGroupSecondaryLocationGroup`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationGroupNesting {
    /// The parent group
    #[serde(rename = "LocationGroupID")]
    pub location_group_id: i64,

    /// The nested (child) group
    #[serde(rename = "SecondaryLocationGroupID")]
    pub secondary_location_group_id: i64,
}

impl LocationGroupNesting {
    pub const ENTITY_SET: &'static str = "LocationGroupSecondaryLocationGroup";
    pub const SELECT: &'static [&'static str] = &["LocationGroupID", "SecondaryLocationGroupID"];
}

/// One node of the group graph.
///
/// `child_group_ids` and `direct_location_ids` hold direct edges only; the
/// effective location set is computed on demand by the hierarchy resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupNode {
    pub id: i64,
    pub description: String,
    pub org_code: Option<String>,
    pub child_group_ids: BTreeSet<i64>,
    pub direct_location_ids: BTreeSet<i64>,
}

impl GroupNode {
    /// Create a node with no edges
    pub fn new(id: i64, description: impl Into<String>, org_code: Option<String>) -> Self {
        Self {
            id,
            description: description.into(),
            org_code,
            child_group_ids: BTreeSet::new(),
            direct_location_ids: BTreeSet::new(),
        }
    }

    /// False for blank or placeholder ("-") descriptions, which are not shown to users
    pub fn is_displayable(&self) -> bool {
        let trimmed = self.description.trim();
        !trimmed.is_empty() && trimmed != PLACEHOLDER_DESCRIPTION
    }
}

impl From<LocationGroup> for GroupNode {
    fn from(group: LocationGroup) -> Self {
        GroupNode::new(
            group.id,
            group.description.unwrap_or_default(),
            group.org_code.filter(|c| !c.trim().is_empty()),
        )
    }
}
