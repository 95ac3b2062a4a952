use std::collections::HashMap;

use tokio::time::Instant;

use crate::config::TrackerConfig;
use crate::debounce::Debouncer;
use crate::heading::{Heading, HeadingBox};
use crate::nav::NavTree;
use crate::resolver::{
    Crossing, HeadingResolver, IntersectionEntry, IntersectionWatcher, Resolution, Signal,
    Strategy, resolver_for,
};
use crate::scroll::{ScrollState, Viewport, progress_ratio};

/// Result of a pass that moved the active heading.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveChange {
    pub current: Option<String>,
    /// Nav item indices whose active flag flipped, with the new value.
    pub toggled: Vec<(usize, bool)>,
}

/// Keeps the current heading, the nav highlight and reading progress in step
/// with scrolling.
pub struct SectionTracker {
    headings: Vec<Heading>,
    by_id: HashMap<String, usize>,
    nav: NavTree,
    config: TrackerConfig,
    resolver: Box<dyn HeadingResolver>,
    watcher: Option<IntersectionWatcher>,
    debounce: Debouncer,
    scroll: ScrollState,
    viewport: Viewport,
    current: Option<usize>,
    progress: f64,
    measured: bool,
    disposed: bool,
}

impl SectionTracker {
    pub fn new(headings: Vec<Heading>, nav: NavTree, config: TrackerConfig) -> Self {
        let resolver = resolver_for(config.strategy);
        Self::with_resolver(headings, nav, config, resolver)
    }

    pub fn with_resolver(
        headings: Vec<Heading>,
        nav: NavTree,
        config: TrackerConfig,
        resolver: Box<dyn HeadingResolver>,
    ) -> Self {
        let by_id = headings
            .iter()
            .enumerate()
            .map(|(index, h)| (h.id.clone(), index))
            .collect();
        let watcher = match resolver.strategy() {
            Strategy::Observer => Some(IntersectionWatcher::new(config.observer)),
            Strategy::Scan => None,
        };
        let debounce = Debouncer::new(config.debounce());
        Self {
            headings,
            by_id,
            nav,
            config,
            resolver,
            watcher,
            debounce,
            scroll: ScrollState::default(),
            viewport: Viewport::default(),
            current: None,
            progress: 0.0,
            measured: false,
            disposed: false,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.resolver.strategy()
    }

    pub fn headings(&self) -> &[Heading] {
        &self.headings
    }

    pub fn nav(&self) -> &NavTree {
        &self.nav
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn active_id(&self) -> Option<&str> {
        self.current.map(|index| self.headings[index].id.as_str())
    }

    pub fn heading(&self, id: &str) -> Option<&Heading> {
        self.by_id.get(id).map(|index| &self.headings[*index])
    }

    /// Deadline of the pending scan, if one is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Applies measured geometry and resolves right away.
    ///
    /// Until the first measurement every heading sits at 0, so no pass runs
    /// before it. Unknown ids are skipped.
    pub fn reflow(&mut self, boxes: &[HeadingBox], viewport: Viewport) -> Option<ActiveChange> {
        if self.disposed {
            return None;
        }
        for b in boxes {
            if let Some(index) = self.by_id.get(&b.id) {
                let heading = &mut self.headings[*index];
                heading.top = b.top;
                heading.height = b.height;
            } else {
                tracing::debug!(id = %b.id, "geometry for unknown heading ignored");
            }
        }
        self.viewport = viewport;
        self.measured = true;
        self.update_progress();
        if let Some(watcher) = &mut self.watcher {
            watcher.reset();
        }
        self.refresh()
    }

    /// Records a raw scroll event and arms the debounce timer. Progress is
    /// updated on every event; heading resolution waits for [`Self::poll`].
    pub fn on_scroll(&mut self, offset: f64, now: Instant) {
        if self.disposed {
            return;
        }
        self.scroll.advance(offset);
        self.update_progress();
        self.after_movement(now);
    }

    pub fn on_resize(&mut self, viewport: Viewport, now: Instant) {
        if self.disposed {
            return;
        }
        self.viewport = viewport;
        self.update_progress();
        self.after_movement(now);
    }

    /// Resolves once the debounce window has elapsed: a geometric scan, or
    /// crossings synthesized from the latest geometry.
    pub fn poll(&mut self, now: Instant) -> Option<ActiveChange> {
        if self.disposed || !self.debounce.fire(now) {
            return None;
        }
        match self.strategy() {
            Strategy::Scan => self.scan(),
            Strategy::Observer => self.observe(),
        }
    }

    /// Crossing batch reported by a host-side observer.
    pub fn on_intersections(&mut self, batch: &[IntersectionEntry]) -> Option<ActiveChange> {
        if self.disposed {
            return None;
        }
        let crossings: Vec<Crossing> = batch
            .iter()
            .filter_map(|entry| {
                self.by_id.get(&entry.id).map(|index| Crossing {
                    index: *index,
                    is_intersecting: entry.is_intersecting,
                })
            })
            .collect();
        self.apply_crossings(&crossings)
    }

    /// Resolves immediately, bypassing the debounce window.
    pub fn refresh(&mut self) -> Option<ActiveChange> {
        if self.disposed || !self.measured {
            return None;
        }
        match self.strategy() {
            Strategy::Scan => self.scan(),
            Strategy::Observer => self.observe(),
        }
    }

    /// Makes `id` current directly, as when its TOC link is clicked.
    pub fn activate(&mut self, id: &str) -> Option<ActiveChange> {
        if self.disposed {
            return None;
        }
        let index = *self.by_id.get(id)?;
        self.switch(Some(index))
    }

    /// Cancels the pending scan; later events are ignored.
    pub fn dispose(&mut self) {
        self.debounce.cancel();
        self.disposed = true;
    }

    fn after_movement(&mut self, now: Instant) {
        if self.measured {
            self.debounce.poke(now);
        }
    }

    fn update_progress(&mut self) {
        self.progress = progress_ratio(self.scroll.offset, self.viewport.scrollable());
    }

    fn scan(&mut self) -> Option<ActiveChange> {
        let signal = Signal::Scan {
            headings: &self.headings,
            scroll: &self.scroll,
            line: self.config.line(),
        };
        match self.resolver.resolve(signal, self.current) {
            Resolution::Switch(next) => self.switch(next),
            Resolution::Keep => None,
        }
    }

    fn observe(&mut self) -> Option<ActiveChange> {
        let line = self.config.line();
        let watcher = self.watcher.as_mut()?;
        let crossings = watcher.observe(&self.headings, self.scroll.offset, line, &self.viewport);
        self.apply_crossings(&crossings)
    }

    fn apply_crossings(&mut self, crossings: &[Crossing]) -> Option<ActiveChange> {
        match self
            .resolver
            .resolve(Signal::Crossings(crossings), self.current)
        {
            Resolution::Switch(next) => self.switch(next),
            Resolution::Keep => None,
        }
    }

    fn switch(&mut self, next: Option<usize>) -> Option<ActiveChange> {
        if next == self.current {
            return None;
        }
        self.current = next;
        let current = next.map(|index| self.headings[index].id.clone());
        let toggled = self.nav.set_active(current.as_deref());
        tracing::debug!(current = ?current, toggled = toggled.len(), "active heading changed");
        Some(ActiveChange { current, toggled })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn layout() -> (Vec<Heading>, Vec<HeadingBox>) {
        let rows = [("intro", 2, 0.0), ("setup", 3, 300.0), ("usage", 2, 900.0)];
        let headings = rows
            .iter()
            .map(|(id, level, _)| Heading::new(*id, *level, 0.0))
            .collect();
        let boxes = rows
            .iter()
            .map(|(id, _, top)| HeadingBox {
                id: id.to_string(),
                top: *top,
                height: 30.0,
            })
            .collect();
        (headings, boxes)
    }

    fn viewport() -> Viewport {
        Viewport {
            width: 1280.0,
            height: 600.0,
            document_height: 2600.0,
        }
    }

    fn tracker(strategy: Strategy) -> (SectionTracker, Vec<HeadingBox>) {
        let (headings, boxes) = layout();
        let nav = NavTree::from_headings(&headings);
        let config = TrackerConfig {
            header_offset: 80.0,
            margin: 20.0,
            strategy,
            ..TrackerConfig::default()
        };
        (SectionTracker::new(headings, nav, config), boxes)
    }

    #[test]
    fn nothing_resolves_before_layout() {
        let (mut t, _) = tracker(Strategy::Scan);
        let now = Instant::now();
        t.on_scroll(500.0, now);
        assert!(t.poll(now + Duration::from_secs(1)).is_none());
        assert_eq!(t.active_id(), None);
    }

    #[test]
    fn scan_runs_once_per_window() {
        let (mut t, boxes) = tracker(Strategy::Scan);
        let start = Instant::now();
        let first = t.reflow(&boxes, viewport()).unwrap();
        assert_eq!(first.current.as_deref(), Some("intro"));

        t.on_scroll(50.0, start);
        t.on_scroll(200.0, start + Duration::from_millis(30));
        t.on_scroll(350.0, start + Duration::from_millis(60));
        assert_eq!(t.next_deadline(), Some(start + Duration::from_millis(100)));
        assert!(t.poll(start + Duration::from_millis(90)).is_none());

        let change = t.poll(start + Duration::from_millis(100)).unwrap();
        assert_eq!(change.current.as_deref(), Some("setup"));
        assert!(t.nav().is_active("intro"));
        assert!(t.nav().is_active("setup"));
        assert!(!t.nav().is_active("usage"));
        assert!(t.poll(start + Duration::from_millis(200)).is_none());
    }

    #[test]
    fn progress_tracks_every_scroll() {
        let (mut t, boxes) = tracker(Strategy::Scan);
        t.reflow(&boxes, viewport());
        t.on_scroll(1000.0, Instant::now());
        assert_eq!(t.progress(), 0.5);
        t.on_scroll(9000.0, Instant::now());
        assert_eq!(t.progress(), 1.0);
    }

    #[test]
    fn observer_crossings_are_debounced() {
        let (mut t, boxes) = tracker(Strategy::Observer);
        let start = Instant::now();
        let first = t.reflow(&boxes, viewport());
        // Band is [offset + 100, offset + 120]; nothing sits in it at 0.
        assert!(first.is_none());

        t.on_scroll(400.0, start);
        t.on_scroll(800.0, start + Duration::from_millis(30));
        assert_eq!(t.next_deadline(), Some(start + Duration::from_millis(100)));
        assert!(t.poll(start + Duration::from_millis(60)).is_none());
        assert_eq!(t.active_id(), None);

        let change = t.poll(start + Duration::from_millis(100)).unwrap();
        assert_eq!(change.current.as_deref(), Some("usage"));
        assert_eq!(t.next_deadline(), None);

        // Leaving the band keeps the heading.
        let later = start + Duration::from_secs(1);
        t.on_scroll(1500.0, later);
        assert!(t.poll(later + Duration::from_millis(100)).is_none());
        assert_eq!(t.active_id(), Some("usage"));
    }

    #[test]
    fn host_batches_map_ids() {
        let (mut t, boxes) = tracker(Strategy::Observer);
        t.reflow(&boxes, viewport());
        let batch = vec![
            IntersectionEntry { id: "nope".into(), is_intersecting: true },
            IntersectionEntry { id: "setup".into(), is_intersecting: true },
        ];
        let change = t.on_intersections(&batch).unwrap();
        assert_eq!(change.current.as_deref(), Some("setup"));
        assert!(t.on_intersections(&batch).is_none());
    }

    #[test]
    fn dispose_drops_pending_scan() {
        let (mut t, boxes) = tracker(Strategy::Scan);
        let start = Instant::now();
        t.reflow(&boxes, viewport());
        t.on_scroll(950.0, start);
        t.dispose();
        assert!(t.poll(start + Duration::from_secs(1)).is_none());
        assert_eq!(t.active_id(), Some("intro"));
        t.on_scroll(10.0, start);
        assert_eq!(t.next_deadline(), None);
        assert!(t.activate("usage").is_none());
        assert!(!t.nav().is_active("usage"));
        assert!(t.nav().is_active("intro"));
    }
}
