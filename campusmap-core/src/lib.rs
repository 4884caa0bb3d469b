//! Campus map core library: domain types, document values, configuration.
//!
//! - [`types`]: map descriptors, version records, cache entries, collection kinds
//! - [`value`]: [`DocValue`], the tagged value used for remote documents
//! - [`config`]: YAML configuration load / save / init
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use config::SyncConfig;
pub use error::ConfigError;
pub use types::{
    LocalStaticDataCache, LocalVersionCacheEntry, MapDescriptor, MapId, MapVersionRecord,
    StaticCollection, StaticDataVersionFlags, VersionedCollection,
};
pub use value::{DocValue, Fields};
