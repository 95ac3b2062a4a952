mod anchors;
mod builtin;
mod clipboard;
mod code_blocks;
mod config;
mod debounce;
mod dom;
mod heading;
mod nav;
mod page;
mod prefs;
mod resolver;
mod scroll;
mod slug;
mod storage;
mod tracker;

pub use anchors::{HeadingAnchor, copy_url};
pub use clipboard::{Clipboard, CopyOutcome, CopyRequest, MemoryClipboard, copy_with_feedback};
pub use code_blocks::{BlockControl, CodeBlock, process_code_blocks};
pub use config::{Config, TrackerConfig};
pub use debounce::Debouncer;
pub use heading::{Heading, HeadingBox};
pub use nav::{NavItem, NavTree};
pub use page::{Effect, HostEvent, Page, PageEvent};
pub use prefs::{CollapsePreference, THEME_KEY, TOC_COLLAPSED_KEY, Theme};
pub use resolver::{
    Crossing, GeometricScan, HeadingResolver, IntersectionEntry, IntersectionWatcher,
    ObserverOptions, Resolution, Signal, Strategy, ThresholdObserver,
};
pub use scroll::{Direction, ScrollState, Viewport, progress_ratio, toc_scroll_target};
pub use slug::{IdAllocator, slugify};
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use tracker::{ActiveChange, SectionTracker};

/// Installs a `RUST_LOG`-filtered fmt subscriber. Calling it again is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
