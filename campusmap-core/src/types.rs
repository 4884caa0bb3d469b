//! Domain types for the campus map data cache.
//!
//! Every local cache file name is derived here so that the sync engine and
//! the components consuming the cache agree on the layout.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{
    first_bool, first_f64, first_string, first_string_list, first_timestamp, Fields,
};

/// Catalog of available maps.
pub const MAPS_FILE: &str = "maps.json";
/// Local static-data sync flags.
pub const STATIC_CACHE_FILE: &str = "static_data_cache.json";
/// Version used when a remote record carries none of the version aliases.
pub const DEFAULT_MAP_VERSION: &str = "v1.0.0";

const VERSION_ALIASES: &[&str] = &["current_version", "currentVersion", "version"];
const UPDATED_ALIASES: &[&str] = &["last_updated", "lastUpdated", "updated_at"];
const NAME_ALIASES: &[&str] = &["map_name", "mapName", "name"];

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a map in the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(pub String);

impl MapId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for MapId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MapId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Per-map collections tied to an explicit version identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionedCollection {
    Nodes,
    Edges,
}

impl VersionedCollection {
    pub fn all() -> &'static [VersionedCollection] {
        &[VersionedCollection::Nodes, VersionedCollection::Edges]
    }

    /// Key of this collection inside a version subdocument.
    pub fn key(self) -> &'static str {
        match self {
            VersionedCollection::Nodes => "nodes",
            VersionedCollection::Edges => "edges",
        }
    }

    /// `nodes_{mapId}.json` / `edges_{mapId}.json`
    pub fn file_name(self, map_id: &MapId) -> String {
        format!("{}_{}.json", self.key(), map_id)
    }
}

impl fmt::Display for VersionedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionedCollection::Nodes => write!(f, "Nodes"),
            VersionedCollection::Edges => write!(f, "Edges"),
        }
    }
}

/// Campus-wide collections synced through boolean dirty flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticCollection {
    Infrastructure,
    Categories,
    Campus,
}

impl StaticCollection {
    pub fn all() -> &'static [StaticCollection] {
        &[
            StaticCollection::Infrastructure,
            StaticCollection::Categories,
            StaticCollection::Campus,
        ]
    }

    /// Remote collection name.
    pub fn remote_name(self) -> &'static str {
        match self {
            StaticCollection::Infrastructure => "Infrastructure",
            StaticCollection::Categories => "Categories",
            StaticCollection::Campus => "Campus",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            StaticCollection::Infrastructure => "infrastructure",
            StaticCollection::Categories => "categories",
            StaticCollection::Campus => "campus",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.slug())
    }

    /// `{collection}_updated` field on the global static flags record.
    pub fn updated_field(self) -> String {
        format!("{}_updated", self.slug())
    }
}

impl fmt::Display for StaticCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.remote_name())
    }
}

/// `version_cache_{mapId}.json`
pub fn version_cache_file(map_id: &MapId) -> String {
    format!("version_cache_{map_id}.json")
}

/// Every file seeded with `[]` when a cache directory is first created.
pub fn default_cache_files() -> Vec<String> {
    let mut files = vec![MAPS_FILE.to_string()];
    files.extend(StaticCollection::all().iter().map(|c| c.file_name()));
    files
}

// ---------------------------------------------------------------------------
// Map catalog
// ---------------------------------------------------------------------------

/// One entry of the remote `Maps` catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDescriptor {
    pub map_id: MapId,
    #[serde(default)]
    pub map_name: String,
    #[serde(default)]
    pub center_lat: f64,
    #[serde(default)]
    pub center_lng: f64,
    #[serde(default)]
    pub campus_included: Vec<String>,
}

impl MapDescriptor {
    /// Build from a remote document; `map_id` falls back to the document id.
    pub fn from_fields(doc_id: &str, fields: &Fields) -> Self {
        Self {
            map_id: MapId::from(
                first_string(fields, &["map_id", "mapId"]).unwrap_or_else(|| doc_id.to_owned()),
            ),
            map_name: first_string(fields, NAME_ALIASES).unwrap_or_default(),
            center_lat: first_f64(fields, &["center_lat", "centerLat"]).unwrap_or_default(),
            center_lng: first_f64(fields, &["center_lng", "centerLng"]).unwrap_or_default(),
            campus_included: first_string_list(fields, &["campus_included", "campusIncluded"])
                .unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// Remote version record for a single map, resolved from aliased fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapVersionRecord {
    pub map_id: MapId,
    pub current_version: String,
    pub map_name: String,
    pub last_updated: DateTime<Utc>,
}

impl MapVersionRecord {
    /// Resolve a record from a `MapVersions/{mapId}` document.
    ///
    /// `current_version`: `current_version` → `currentVersion` → `version` →
    /// [`DEFAULT_MAP_VERSION`]. `last_updated`: `last_updated` → `lastUpdated`
    /// → `updated_at`, each as timestamp, epoch seconds or RFC 3339 string,
    /// else `now`.
    pub fn from_fields(map_id: MapId, fields: &Fields, now: DateTime<Utc>) -> Self {
        Self {
            map_id,
            current_version: first_string(fields, VERSION_ALIASES)
                .unwrap_or_else(|| DEFAULT_MAP_VERSION.to_string()),
            map_name: first_string(fields, NAME_ALIASES).unwrap_or_default(),
            last_updated: first_timestamp(fields, UPDATED_ALIASES).unwrap_or(now),
        }
    }
}

/// Locally persisted record of the version last written for a map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVersionCacheEntry {
    #[serde(alias = "mapId")]
    pub map_id: MapId,
    #[serde(alias = "cachedVersion")]
    pub cached_version: String,
    #[serde(default, alias = "mapName")]
    pub map_name: String,
    #[serde(alias = "cacheTimestamp")]
    pub cache_timestamp: DateTime<Utc>,
}

impl LocalVersionCacheEntry {
    pub fn from_record(record: &MapVersionRecord, now: DateTime<Utc>) -> Self {
        Self {
            map_id: record.map_id.clone(),
            cached_version: record.current_version.clone(),
            map_name: record.map_name.clone(),
            cache_timestamp: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Static data flags
// ---------------------------------------------------------------------------

/// Dirty flags on the global remote static-data record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticDataVersionFlags {
    pub infrastructure_updated: bool,
    pub categories_updated: bool,
    pub campus_updated: bool,
}

impl StaticDataVersionFlags {
    /// Every flag raised; used when the remote record does not exist yet.
    pub fn all_set() -> Self {
        Self {
            infrastructure_updated: true,
            categories_updated: true,
            campus_updated: true,
        }
    }

    pub fn from_fields(fields: &Fields) -> Self {
        let flag = |c: StaticCollection| {
            first_bool(fields, &[c.updated_field().as_str()]).unwrap_or(false)
        };
        Self {
            infrastructure_updated: flag(StaticCollection::Infrastructure),
            categories_updated: flag(StaticCollection::Categories),
            campus_updated: flag(StaticCollection::Campus),
        }
    }

    pub fn get(&self, collection: StaticCollection) -> bool {
        match collection {
            StaticCollection::Infrastructure => self.infrastructure_updated,
            StaticCollection::Categories => self.categories_updated,
            StaticCollection::Campus => self.campus_updated,
        }
    }

    pub fn any(&self) -> bool {
        StaticCollection::all().iter().any(|c| self.get(*c))
    }
}

/// Local record of which static collections were written and verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStaticDataCache {
    #[serde(default)]
    pub infrastructure_synced: bool,
    #[serde(default)]
    pub categories_synced: bool,
    #[serde(default)]
    pub campus_synced: bool,
    pub cache_timestamp: DateTime<Utc>,
}

impl LocalStaticDataCache {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            infrastructure_synced: false,
            categories_synced: false,
            campus_synced: false,
            cache_timestamp: now,
        }
    }

    pub fn synced(&self, collection: StaticCollection) -> bool {
        match collection {
            StaticCollection::Infrastructure => self.infrastructure_synced,
            StaticCollection::Categories => self.categories_synced,
            StaticCollection::Campus => self.campus_synced,
        }
    }

    pub fn set_synced(&mut self, collection: StaticCollection, synced: bool) {
        match collection {
            StaticCollection::Infrastructure => self.infrastructure_synced = synced,
            StaticCollection::Categories => self.categories_synced = synced,
            StaticCollection::Campus => self.campus_synced = synced,
        }
    }

    pub fn any_synced(&self) -> bool {
        StaticCollection::all().iter().any(|c| self.synced(*c))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::fields_from_json;
    use chrono::TimeZone;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        fields_from_json(value).expect("object")
    }

    #[test]
    fn file_names_follow_cache_layout() {
        let id = MapId::from("main");
        assert_eq!(VersionedCollection::Nodes.file_name(&id), "nodes_main.json");
        assert_eq!(VersionedCollection::Edges.file_name(&id), "edges_main.json");
        assert_eq!(version_cache_file(&id), "version_cache_main.json");
        assert_eq!(StaticCollection::Categories.file_name(), "categories.json");
        assert_eq!(
            StaticCollection::Infrastructure.updated_field(),
            "infrastructure_updated"
        );
        assert_eq!(
            default_cache_files(),
            vec!["maps.json", "infrastructure.json", "categories.json", "campus.json"]
        );
    }

    #[test]
    fn version_record_prefers_current_version_over_version() {
        let now = Utc::now();
        let f = fields(json!({"version": "v1", "currentVersion": "v1.5", "current_version": "v2"}));
        let record = MapVersionRecord::from_fields(MapId::from("m"), &f, now);
        assert_eq!(record.current_version, "v2");
    }

    #[test]
    fn version_record_defaults_when_no_alias_present() {
        let now = Utc::now();
        let record = MapVersionRecord::from_fields(MapId::from("m"), &Fields::new(), now);
        assert_eq!(record.current_version, DEFAULT_MAP_VERSION);
        assert_eq!(record.last_updated, now);
        assert!(record.map_name.is_empty());
    }

    #[test]
    fn version_record_reads_epoch_seconds_alias() {
        let now = Utc::now();
        let f = fields(json!({"version": "v3", "lastUpdated": 1_714_557_600, "mapName": "Main"}));
        let record = MapVersionRecord::from_fields(MapId::from("m"), &f, now);
        assert_eq!(record.current_version, "v3");
        assert_eq!(record.map_name, "Main");
        assert_eq!(
            record.last_updated,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn map_descriptor_falls_back_to_document_id() {
        let f = fields(json!({
            "map_name": "North Campus",
            "center_lat": 14,
            "center_lng": 121.05,
            "campus_included": ["north", 2]
        }));
        let map = MapDescriptor::from_fields("doc-7", &f);
        assert_eq!(map.map_id, MapId::from("doc-7"));
        assert_eq!(map.center_lat, 14.0);
        assert_eq!(map.campus_included, vec!["north", "2"]);
    }

    #[test]
    fn static_flags_missing_fields_read_false() {
        let f = fields(json!({"categories_updated": true, "campus_updated": "yes"}));
        let flags = StaticDataVersionFlags::from_fields(&f);
        assert!(!flags.infrastructure_updated);
        assert!(flags.categories_updated);
        assert!(!flags.campus_updated);
        assert!(flags.any());
    }

    #[test]
    fn local_static_cache_set_and_query() {
        let mut cache = LocalStaticDataCache::empty(Utc::now());
        assert!(!cache.any_synced());
        cache.set_synced(StaticCollection::Campus, true);
        assert!(cache.synced(StaticCollection::Campus));
        assert!(cache.any_synced());
    }

    #[test]
    fn version_cache_entry_accepts_camel_case_fields() {
        let entry: LocalVersionCacheEntry = serde_json::from_str(
            r#"{"mapId":"m","cachedVersion":"v4","cacheTimestamp":"2024-05-01T10:00:00Z"}"#,
        )
        .expect("parse");
        assert_eq!(entry.cached_version, "v4");
        assert!(entry.map_name.is_empty());
    }
}
