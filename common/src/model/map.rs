use crate::model::member::CommunityMember;
use crate::model::settings::MapSettings;
use serde::{Deserialize, Serialize};

/// The persisted, shareable record of a generated map.
///
/// Created once per successful upload. Afterwards only `name`, `settings` and
/// `is_public` change; the member list is never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMap {
    pub id: String,
    pub name: String,
    pub settings: MapSettings,
    pub members: Vec<CommunityMember>,
    pub center: [f64; 2],
    pub zoom: f64,
    pub is_public: bool,
    /// MD5 of the CSV this map was generated from.
    pub source_md5: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Row shown in the admin map listing; members are counted, not loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSummary {
    pub id: String,
    pub name: String,
    pub member_count: usize,
    pub is_public: bool,
    pub created_at: String,
}
