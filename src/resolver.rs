//! Strategies for deciding which heading is being read.
//!
//! Both strategies sit behind [`HeadingResolver`]; a tracker installs exactly
//! one of them. The geometric scan answers debounced [`Signal::Scan`] ticks,
//! the threshold observer answers [`Signal::Crossings`] batches. Each ignores
//! the other signal.

use serde::Deserialize;

use crate::heading::Heading;
use crate::scroll::{Direction, ScrollState, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Scan,
    Observer,
}

/// One heading crossing into or out of the observation band.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IntersectionEntry {
    pub id: String,
    pub is_intersecting: bool,
}

/// An [`IntersectionEntry`] resolved to a heading index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub index: usize,
    pub is_intersecting: bool,
}

pub enum Signal<'a> {
    Scan {
        headings: &'a [Heading],
        scroll: &'a ScrollState,
        line: f64,
    },
    Crossings(&'a [Crossing]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The current heading becomes this index, or none.
    Switch(Option<usize>),
    /// Leave the current heading alone.
    Keep,
}

pub trait HeadingResolver {
    fn strategy(&self) -> Strategy;
    fn resolve(&mut self, signal: Signal<'_>, current: Option<usize>) -> Resolution;
}

pub fn resolver_for(strategy: Strategy) -> Box<dyn HeadingResolver> {
    match strategy {
        Strategy::Scan => Box::new(GeometricScan),
        Strategy::Observer => Box::new(ThresholdObserver),
    }
}

/// Direction-aware scan against the offset line.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeometricScan;

impl GeometricScan {
    /// Index of the heading that is current for `scroll`, if any.
    ///
    /// Scrolling down takes the last heading at or above `line`; scrolling up
    /// takes the first such heading walking upwards from the bottom.
    pub fn scan(headings: &[Heading], scroll: &ScrollState, line: f64) -> Option<usize> {
        let offset = scroll.offset;
        match scroll.scan_direction() {
            Direction::Up => headings
                .iter()
                .rposition(|h| h.viewport_top(offset) <= line),
            Direction::Down | Direction::None => {
                let mut current = None;
                for (index, heading) in headings.iter().enumerate() {
                    if heading.viewport_top(offset) <= line {
                        current = Some(index);
                    } else {
                        break;
                    }
                }
                current
            }
        }
    }
}

impl HeadingResolver for GeometricScan {
    fn strategy(&self) -> Strategy {
        Strategy::Scan
    }

    fn resolve(&mut self, signal: Signal<'_>, _current: Option<usize>) -> Resolution {
        match signal {
            Signal::Scan {
                headings,
                scroll,
                line,
            } => Resolution::Switch(Self::scan(headings, scroll, line)),
            Signal::Crossings(_) => Resolution::Keep,
        }
    }
}

/// First-intersecting-wins over crossing batches.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThresholdObserver;

impl HeadingResolver for ThresholdObserver {
    fn strategy(&self) -> Strategy {
        Strategy::Observer
    }

    fn resolve(&mut self, signal: Signal<'_>, current: Option<usize>) -> Resolution {
        let Signal::Crossings(batch) = signal else {
            return Resolution::Keep;
        };
        // No intersecting entry keeps the previous heading.
        match batch.iter().find(|c| c.is_intersecting) {
            Some(crossing) if Some(crossing.index) != current => {
                Resolution::Switch(Some(crossing.index))
            }
            _ => Resolution::Keep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObserverOptions {
    /// Bottom root margin, in percent of the viewport height.
    pub bottom_margin_pct: f64,
    /// Fraction of a heading that must be inside the band.
    pub threshold: f64,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            bottom_margin_pct: 80.0,
            threshold: 0.0,
        }
    }
}

impl ObserverOptions {
    /// Looser band that waits until 30% of a heading is visible.
    pub fn partial() -> Self {
        Self {
            bottom_margin_pct: 70.0,
            threshold: 0.3,
        }
    }

    /// CSS-style root margin for a host-side observer.
    pub fn root_margin(&self, line: f64) -> String {
        format!("-{}px 0px -{}% 0px", line, self.bottom_margin_pct)
    }

    /// Band `[top, bottom]` in document coordinates.
    fn band(&self, line: f64, offset: f64, viewport: &Viewport) -> (f64, f64) {
        let top = offset + line;
        let bottom = offset + viewport.height * (1.0 - self.bottom_margin_pct / 100.0);
        (top, bottom)
    }

    fn intersects(&self, heading: &Heading, band: (f64, f64)) -> bool {
        let (band_top, band_bottom) = band;
        if band_bottom < band_top {
            return false;
        }
        if heading.height <= 0.0 {
            return heading.top >= band_top && heading.top <= band_bottom;
        }
        let overlap = (heading.top + heading.height).min(band_bottom) - heading.top.max(band_top);
        if overlap < 0.0 {
            return false;
        }
        self.threshold <= 0.0 || overlap / heading.height >= self.threshold
    }
}

/// Synthesizes crossing batches from known geometry.
///
/// Like a browser observer, the first observation reports every heading and
/// later ones only report headings whose state flipped, in document order.
#[derive(Debug, Clone)]
pub struct IntersectionWatcher {
    options: ObserverOptions,
    state: Option<Vec<bool>>,
}

impl IntersectionWatcher {
    pub fn new(options: ObserverOptions) -> Self {
        Self {
            options,
            state: None,
        }
    }

    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }

    /// Forgets previous state, e.g. after headings were re-measured.
    pub fn reset(&mut self) {
        self.state = None;
    }

    pub fn observe(
        &mut self,
        headings: &[Heading],
        offset: f64,
        line: f64,
        viewport: &Viewport,
    ) -> Vec<Crossing> {
        let band = self.options.band(line, offset, viewport);
        let now: Vec<bool> = headings
            .iter()
            .map(|h| self.options.intersects(h, band))
            .collect();

        let batch = match &self.state {
            Some(before) if before.len() == now.len() => now
                .iter()
                .zip(before)
                .enumerate()
                .filter(|(_, (n, b))| n != b)
                .map(|(index, (n, _))| Crossing {
                    index,
                    is_intersecting: *n,
                })
                .collect(),
            _ => now
                .iter()
                .enumerate()
                .map(|(index, n)| Crossing {
                    index,
                    is_intersecting: *n,
                })
                .collect(),
        };
        self.state = Some(now);
        batch
    }
}
