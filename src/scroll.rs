use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    None,
    Down,
    Up,
}

/// Last two scroll offsets of the window and the direction between them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollState {
    pub offset: f64,
    pub previous: f64,
    pub direction: Direction,
}

impl ScrollState {
    /// Records a new offset. An unchanged offset keeps the previous direction.
    pub fn advance(&mut self, offset: f64) {
        self.previous = self.offset;
        self.offset = offset;
        if offset > self.previous {
            self.direction = Direction::Down;
        } else if offset < self.previous {
            self.direction = Direction::Up;
        }
    }

    /// Direction used for scanning; an unknown direction scans downwards.
    pub fn scan_direction(&self) -> Direction {
        match self.direction {
            Direction::Up => Direction::Up,
            Direction::Down | Direction::None => Direction::Down,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub document_height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            document_height: 800.0,
        }
    }
}

impl Viewport {
    pub fn scrollable(&self) -> f64 {
        self.document_height - self.height
    }
}

/// Reading progress in `[0, 1]`.
pub fn progress_ratio(offset: f64, scrollable: f64) -> f64 {
    if scrollable <= 0.0 || !offset.is_finite() {
        return 0.0;
    }
    (offset / scrollable).clamp(0.0, 1.0)
}

/// Where the TOC panel should scroll so an out-of-view link ends up centred.
///
/// Returns `None` while the link is already fully visible.
pub fn toc_scroll_target(
    link_top: f64,
    link_height: f64,
    panel_scroll_top: f64,
    panel_height: f64,
) -> Option<f64> {
    let relative = link_top - panel_scroll_top;
    if relative < 0.0 || relative > panel_height - link_height {
        Some((link_top - panel_height / 2.0).max(0.0))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_follows_offsets() {
        let mut s = ScrollState::default();
        assert_eq!(s.scan_direction(), Direction::Down);
        s.advance(120.0);
        assert_eq!(s.direction, Direction::Down);
        s.advance(40.0);
        assert_eq!(s.direction, Direction::Up);
        s.advance(40.0);
        assert_eq!(s.direction, Direction::Up);
        assert_eq!(s.previous, 40.0);
    }

    #[test]
    fn progress_guards_and_clamps() {
        assert_eq!(progress_ratio(300.0, 0.0), 0.0);
        assert_eq!(progress_ratio(300.0, -50.0), 0.0);
        assert_eq!(progress_ratio(500.0, 1000.0), 0.5);
        assert_eq!(progress_ratio(1500.0, 1000.0), 1.0);
        assert_eq!(progress_ratio(-20.0, 1000.0), 0.0);
    }

    #[test]
    fn toc_reveal_only_when_hidden() {
        assert_eq!(toc_scroll_target(100.0, 20.0, 0.0, 400.0), None);
        assert_eq!(toc_scroll_target(600.0, 20.0, 0.0, 400.0), Some(400.0));
        assert_eq!(toc_scroll_target(50.0, 20.0, 200.0, 400.0), Some(0.0));
    }
}
