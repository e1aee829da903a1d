//! Layout and auto-save tuning, parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_MARGIN_X: f64 = 80.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 800.0;
pub const DEFAULT_COLUMN_WIDTH: f64 = 220.0;
pub const DEFAULT_NODE_GAP_Y: f64 = 100.0;
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 2000;

/// Geometry for the column/row layout, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Left margin; the root sits at this x.
    pub margin_x: f64,
    /// Canvas height; every column is centered on half of it.
    pub canvas_height: f64,
    /// Horizontal distance between depth columns.
    pub column_width: f64,
    /// Vertical distance between nodes in one column.
    pub node_gap_y: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_x: DEFAULT_MARGIN_X,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            column_width: DEFAULT_COLUMN_WIDTH,
            node_gap_y: DEFAULT_NODE_GAP_Y,
        }
    }
}

impl LayoutConfig {
    /// Build from environment variables.
    ///
    /// Optional:
    /// - `NETMAP_MARGIN_X`: default 80
    /// - `NETMAP_CANVAS_HEIGHT`: default 800
    /// - `NETMAP_COLUMN_WIDTH`: default 220
    /// - `NETMAP_NODE_GAP_Y`: default 100
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            margin_x: env_parse("NETMAP_MARGIN_X", DEFAULT_MARGIN_X),
            canvas_height: env_parse("NETMAP_CANVAS_HEIGHT", DEFAULT_CANVAS_HEIGHT),
            column_width: env_parse("NETMAP_COLUMN_WIDTH", DEFAULT_COLUMN_WIDTH),
            node_gap_y: env_parse("NETMAP_NODE_GAP_Y", DEFAULT_NODE_GAP_Y),
        }
    }
}

/// Auto-save scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveConfig {
    pub debounce: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self { debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS) }
    }
}

impl AutoSaveConfig {
    /// Build from `NETMAP_AUTOSAVE_DEBOUNCE_MS` (default 2000).
    #[must_use]
    pub fn from_env() -> Self {
        Self { debounce: Duration::from_millis(env_parse("NETMAP_AUTOSAVE_DEBOUNCE_MS", DEFAULT_AUTOSAVE_DEBOUNCE_MS)) }
    }
}

/// Parse `key` from the environment, falling back to `default` when unset or invalid.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
