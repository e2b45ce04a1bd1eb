use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheItemType {
    #[serde(alias = "UnityPackage")]
    Package,
    Assembly,
    Other,
}

impl fmt::Display for CacheItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheItemType::Package => "Package",
            CacheItemType::Assembly => "Assembly",
            CacheItemType::Other => "Other",
        };
        f.write_str(name)
    }
}

/// One artifact stored in the content cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheItem {
    #[serde(rename = "type")]
    pub item_type: CacheItemType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Location in the cache, relative to the project root
    pub path: String,
    /// File size, or the summed size of a directory item
    pub size: u64,
    /// SHA-256 of file items; directory items carry none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub added_date: DateTime<Utc>,
    /// Where the item was collected from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CacheItem {
    pub fn is_directory(&self) -> bool {
        self.hash.is_none()
    }
}
