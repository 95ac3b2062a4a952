//! Persisted UI preferences: colour theme and TOC collapse state.

use crate::storage::Storage;

pub const THEME_KEY: &str = "theme";
pub const TOC_COLLAPSED_KEY: &str = "tocCollapsed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Icon of the toggle: it shows the theme a click switches to.
    pub fn icon_class(self) -> &'static str {
        match self {
            Theme::Light => "fa-regular fa-moon",
            Theme::Dark => "fa-regular fa-sun",
        }
    }

    pub fn load(storage: &dyn Storage) -> Self {
        storage
            .get(THEME_KEY)
            .and_then(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    pub fn store(self, storage: &mut dyn Storage) {
        if let Err(e) = storage.set(THEME_KEY, self.as_str()) {
            tracing::warn!(error = %e, "failed to persist theme");
        }
    }
}

/// Collapsed state of the TOC panel.
///
/// An explicit choice beats the width default, which beats expanded. The
/// stored choice is read once; every toggle writes a new explicit choice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollapsePreference {
    explicit: Option<bool>,
    breakpoint: f64,
}

impl CollapsePreference {
    pub fn new(explicit: Option<bool>, breakpoint: f64) -> Self {
        Self {
            explicit,
            breakpoint,
        }
    }

    pub fn load(storage: &dyn Storage, breakpoint: f64) -> Self {
        let explicit = match storage.get(TOC_COLLAPSED_KEY).as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                tracing::debug!(value = other, "ignoring unrecognised tocCollapsed value");
                None
            }
            None => None,
        };
        Self::new(explicit, breakpoint)
    }

    pub fn explicit(&self) -> Option<bool> {
        self.explicit
    }

    pub fn is_narrow(&self, width: f64) -> bool {
        width <= self.breakpoint
    }

    pub fn resolve(&self, width: f64) -> bool {
        self.explicit.unwrap_or_else(|| self.is_narrow(width))
    }

    /// Records an explicit choice and persists it.
    pub fn choose(&mut self, collapsed: bool, storage: &mut dyn Storage) {
        self.explicit = Some(collapsed);
        let value = if collapsed { "true" } else { "false" };
        if let Err(e) = storage.set(TOC_COLLAPSED_KEY, value) {
            tracing::warn!(error = %e, "failed to persist toc collapse state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn collapse_precedence() {
        let empty = MemoryStorage::new();
        let pref = CollapsePreference::load(&empty, 768.0);
        assert!(pref.resolve(500.0));
        assert!(!pref.resolve(1200.0));
        assert!(pref.resolve(768.0));

        let stored = MemoryStorage::new().with(TOC_COLLAPSED_KEY, "false");
        let pref = CollapsePreference::load(&stored, 768.0);
        assert!(!pref.resolve(500.0));

        let garbage = MemoryStorage::new().with(TOC_COLLAPSED_KEY, "yes");
        assert_eq!(CollapsePreference::load(&garbage, 768.0).explicit(), None);
    }

    #[test]
    fn choosing_overrides_width_and_persists() {
        let mut storage = MemoryStorage::new();
        let mut pref = CollapsePreference::load(&storage, 768.0);
        pref.choose(true, &mut storage);
        assert!(pref.resolve(1600.0));
        assert_eq!(storage.get(TOC_COLLAPSED_KEY).as_deref(), Some("true"));
    }

    #[test]
    fn theme_round_trip_through_storage() {
        let mut storage = MemoryStorage::new();
        assert_eq!(Theme::load(&storage), Theme::Light);
        Theme::Dark.store(&mut storage);
        assert_eq!(Theme::load(&storage), Theme::Dark);
        assert_eq!(Theme::Dark.icon_class(), "fa-regular fa-sun");

        let bogus = MemoryStorage::new().with(THEME_KEY, "sepia");
        assert_eq!(Theme::load(&bogus), Theme::Light);
    }
}
