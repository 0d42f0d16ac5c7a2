//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result window size when no `size`/`limit` parameter is given
    pub default_size: usize,

    /// Ceiling applied to any requested window size
    pub max_size: usize,

    /// IANA zone used for timestamps without an explicit offset
    pub timezone: String,

    /// Path to the search index directory (in-memory index when absent)
    pub index_path: Option<PathBuf>,

    /// Index writer heap size in bytes (default: 50MB)
    pub writer_heap_size: usize,

    /// Free-text boost for the title field
    pub title_boost: f32,

    /// Free-text boost for the description field
    pub description_boost: f32,

    /// Free-text boost for the owner field
    pub owner_boost: f32,

    /// Free-text boost for the level field
    pub level_boost: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_size: 100,
            max_size: 1000,
            timezone: "UTC".to_string(),
            index_path: None,
            writer_heap_size: 50_000_000, // 50MB
            title_boost: 4.0,
            description_boost: 3.0,
            owner_boost: 2.0,
            level_boost: 1.0,
        }
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn default_size(mut self, size: usize) -> Self {
        self.config.default_size = size;
        self
    }

    pub fn max_size(mut self, size: usize) -> Self {
        self.config.max_size = size;
        self
    }

    pub fn timezone(mut self, zone: impl Into<String>) -> Self {
        self.config.timezone = zone.into();
        self
    }

    pub fn index_path(mut self, path: PathBuf) -> Self {
        self.config.index_path = Some(path);
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    /// Per-field free-text boosts, in title, description, owner, level order
    pub fn boosts(mut self, title: f32, description: f32, owner: f32, level: f32) -> Self {
        self.config.title_boost = title;
        self.config.description_boost = description;
        self.config.owner_boost = owner;
        self.config.level_boost = level;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
