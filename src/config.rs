use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::resolver::{ObserverOptions, Strategy};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Pixels reserved for the fixed top bar.
    pub header_offset: f64,
    /// Extra pixels below the top bar before a heading counts as reached.
    pub margin: f64,
    /// Debounce window for scroll/resize scans.
    pub debounce_ms: u64,
    /// `scan` (polling geometry) or `observer` (intersection crossings).
    pub strategy: Strategy,
    /// Band used by the `observer` strategy.
    pub observer: ObserverOptions,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            header_offset: 80.0,
            margin: 20.0,
            debounce_ms: 100,
            strategy: Strategy::Scan,
            observer: ObserverOptions::default(),
        }
    }
}

impl TrackerConfig {
    /// Offset line `L` measured from the top of the viewport.
    pub fn line(&self) -> f64 {
        self.header_offset + self.margin
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,

    /// Viewports at most this wide start with the TOC collapsed.
    pub collapse_breakpoint: f64,

    /// Code blocks with more lines than this start folded.
    pub fold_threshold_lines: usize,

    /// The banner shrinks past this scroll offset.
    pub banner_shrink_at: f64,

    /// The back-to-top control shows past this scroll offset.
    pub back_to_top_at: f64,

    /// How long copy buttons show their check/cross icon.
    pub feedback_ms: u64,

    /// How long a jumped-to heading keeps `anchor-highlight`.
    pub highlight_ms: u64,

    /// Pages whose path contains one of these get no heading copy buttons.
    pub skip_heading_links_on: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            collapse_breakpoint: 768.0,
            fold_threshold_lines: 15,
            banner_shrink_at: 20.0,
            back_to_top_at: 100.0,
            feedback_ms: 2000,
            highlight_ms: 2000,
            skip_heading_links_on: vec!["/about/".to_string()],
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parse theme config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("load {}", path.display()))
    }

    pub fn feedback(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }

    pub fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg = Config::from_json_str(r#"{"tracker": {"strategy": "observer", "margin": 40}}"#)
            .unwrap();
        assert_eq!(cfg.tracker.strategy, Strategy::Observer);
        assert_eq!(cfg.tracker.line(), 120.0);
        assert_eq!(cfg.tracker.debounce(), Duration::from_millis(100));
        assert_eq!(cfg.tracker.observer.bottom_margin_pct, 80.0);
        assert_eq!(cfg.fold_threshold_lines, 15);
        assert_eq!(cfg.skip_heading_links_on, vec!["/about/".to_string()]);
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!(Config::from_json_str(r#"{"tracker": {"strategy": "magic"}}"#).is_err());
    }
}
