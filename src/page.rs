//! One attached page: owns the document, its storage and every interactive
//! feature, consumes host events and answers with effects.

use std::collections::HashMap;

use kuchiki::NodeRef;
use serde::Deserialize;
use tokio::time::Instant;
use url::Url;

use crate::anchors::{self, HIGHLIGHT_CLASS, HeadingAnchor};
use crate::builtin;
use crate::clipboard::CopyRequest;
use crate::code_blocks::{BlockControl, CodeBlock, process_code_blocks};
use crate::config::Config;
use crate::dom;
use crate::heading::{Heading, HeadingBox};
use crate::nav::NavTree;
use crate::prefs::{CollapsePreference, Theme};
use crate::resolver::IntersectionEntry;
use crate::scroll::Viewport;
use crate::storage::Storage;
use crate::tracker::{ActiveChange, SectionTracker};

/// Something the host observed.
#[derive(Debug, Clone)]
pub enum PageEvent {
    Scroll { offset: f64 },
    Resize { viewport: Viewport },
    /// Fresh layout: heading boxes in document coordinates.
    Reflow {
        headings: Vec<HeadingBox>,
        viewport: Viewport,
    },
    /// Crossings from a host-side intersection observer.
    Intersections { entries: Vec<IntersectionEntry> },
    Click { target: NodeRef },
    HashChange { fragment: Option<String> },
}

/// Layout-independent events as the host serialises them.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    Scroll { offset: f64 },
    Resize { viewport: Viewport },
    Reflow {
        headings: Vec<HeadingBox>,
        viewport: Viewport,
    },
    Intersections { entries: Vec<IntersectionEntry> },
    HashChange {
        #[serde(default)]
        fragment: Option<String>,
    },
}

impl From<HostEvent> for PageEvent {
    fn from(event: HostEvent) -> Self {
        match event {
            HostEvent::Scroll { offset } => PageEvent::Scroll { offset },
            HostEvent::Resize { viewport } => PageEvent::Resize { viewport },
            HostEvent::Reflow { headings, viewport } => PageEvent::Reflow { headings, viewport },
            HostEvent::Intersections { entries } => PageEvent::Intersections { entries },
            HostEvent::HashChange { fragment } => PageEvent::HashChange { fragment },
        }
    }
}

/// Something the host must do on the page's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ScrollWindow { top: f64, smooth: bool },
    /// Scroll the TOC panel so the link to `id` is visible.
    RevealTocLink { id: String },
    /// Run through [`crate::copy_with_feedback`].
    Copy(CopyRequest),
}

struct Toc {
    sticky: Option<NodeRef>,
    toggle: Option<NodeRef>,
    progress_bar: Option<NodeRef>,
    /// Parallel to the nav tree's items.
    links: Vec<NodeRef>,
    tracker: SectionTracker,
    collapse: CollapsePreference,
}

impl Toc {
    fn attach(
        document: &NodeRef,
        anchors: &[HeadingAnchor],
        config: &Config,
        storage: &dyn Storage,
    ) -> Option<Self> {
        if dom::select_first(document, ".toc-container").is_none() {
            tracing::debug!("no toc on this page");
            return None;
        }
        let sticky = dom::select_first(document, ".toc-sticky");
        let toggle = dom::select_first(document, ".toc-toggle");
        let progress_bar = dom::select_first(document, ".toc-progress-bar").or_else(|| {
            let sticky = sticky.as_ref()?;
            let track = dom::fragment(builtin::progress_track(), "div.toc-progress")?;
            sticky.append(track.clone());
            dom::select_first(&track, ".toc-progress-bar")
        });

        let (nav, links) = nav_from_links(document);
        let headings = anchors
            .iter()
            .map(|a| Heading::new(a.id.clone(), a.level, 0.0))
            .collect();
        let tracker = SectionTracker::new(headings, nav, config.tracker.clone());
        let collapse = CollapsePreference::load(storage, config.collapse_breakpoint);

        let toc = Self {
            sticky,
            toggle,
            progress_bar,
            links,
            tracker,
            collapse,
        };
        toc.set_collapsed(toc.collapse.resolve(toc.tracker.viewport().width));
        toc.render_progress();
        tracing::debug!(
            links = toc.links.len(),
            headings = toc.tracker.headings().len(),
            strategy = ?toc.tracker.strategy(),
            "toc attached"
        );
        Some(toc)
    }

    fn is_collapsed(&self) -> bool {
        self.sticky
            .as_ref()
            .is_some_and(|s| dom::has_class(s, "collapsed"))
    }

    fn set_collapsed(&self, collapsed: bool) {
        if let Some(sticky) = &self.sticky {
            dom::set_class(sticky, "collapsed", collapsed);
        }
    }

    /// Width default, only while nothing explicit was chosen.
    fn apply_width_default(&self) {
        if self.collapse.explicit().is_none() {
            self.set_collapsed(self.collapse.resolve(self.tracker.viewport().width));
        }
    }

    fn render_progress(&self) {
        if let Some(bar) = &self.progress_bar {
            let pct = (self.tracker.progress() * 1000.0).round() / 10.0;
            dom::set_attr(bar, "style", format!("height: {pct}%"));
        }
    }

    /// Writes the `active` class on links whose flag changed.
    fn sync(&self, change: Option<ActiveChange>, effects: &mut Vec<Effect>) {
        let Some(change) = change else {
            return;
        };
        for (index, active) in &change.toggled {
            if let Some(link) = self.links.get(*index) {
                dom::set_class(link, "active", *active);
            }
        }
        if let Some(id) = change.current {
            if !self.is_collapsed() {
                effects.push(Effect::RevealTocLink { id });
            }
        }
    }

    fn reveal_active(&self, effects: &mut Vec<Effect>) {
        if let Some(id) = self.tracker.active_id() {
            effects.push(Effect::RevealTocLink { id: id.to_string() });
        }
    }
}

/// Builds the nav tree from `.toc-item > .toc-link` markup; a link's parent
/// is the link of the nearest enclosing `.toc-item`.
fn nav_from_links(document: &NodeRef) -> (NavTree, Vec<NodeRef>) {
    let mut nav = NavTree::new();
    let mut links = Vec::new();
    let mut items: Vec<(NodeRef, usize)> = Vec::new();

    for link in dom::select_all(document, ".toc-content .toc-item > .toc-link[href^=\"#\"]") {
        let Some(target) = dom::attr(&link, "href")
            .as_deref()
            .and_then(anchors::fragment_target)
            .map(str::to_string)
        else {
            continue;
        };
        let Some(item) = link.parent() else {
            continue;
        };
        let parent = item
            .ancestors()
            .find(|a| dom::has_class(a, "toc-item"))
            .and_then(|a| items.iter().find(|(node, _)| *node == a).map(|(_, i)| *i));

        let index = nav.push(target, parent);
        items.push((item, index));
        links.push(link);
    }
    (nav, links)
}

pub struct Page<S: Storage> {
    document: NodeRef,
    location: Url,
    storage: S,
    config: Config,
    anchors: Vec<HeadingAnchor>,
    code_blocks: Vec<CodeBlock>,
    toc: Option<Toc>,
    /// Document-coordinate tops from the last reflow.
    tops: HashMap<String, f64>,
    offset: f64,
    /// Headings lit by a jump, with the instant they go dark.
    highlights: Vec<(NodeRef, Instant)>,
}

impl<S: Storage> Page<S> {
    /// Decorates the document and restores persisted preferences.
    pub fn attach(document: NodeRef, location: Url, storage: S, config: Config) -> Self {
        let code_blocks = process_code_blocks(&document, config.fold_threshold_lines);
        let with_links = anchors::links_enabled(&location, &config.skip_heading_links_on);
        let anchors = anchors::decorate_headings(&document, with_links);
        let toc = Toc::attach(&document, &anchors, &config, &storage);

        let page = Self {
            document,
            location,
            storage,
            config,
            anchors,
            code_blocks,
            toc,
            tops: HashMap::new(),
            offset: 0.0,
            highlights: Vec::new(),
        };
        page.apply_theme(Theme::load(&page.storage));
        page.apply_scroll_chrome();
        anchors::highlight_fragment(&page.anchors, page.location.fragment());
        tracing::info!(
            url = %page.location,
            headings = page.anchors.len(),
            code_blocks = page.code_blocks.len(),
            toc = page.toc.is_some(),
            "page attached"
        );
        page
    }

    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn anchors(&self) -> &[HeadingAnchor] {
        &self.anchors
    }

    pub fn code_blocks(&self) -> &[CodeBlock] {
        &self.code_blocks
    }

    pub fn tracker(&self) -> Option<&SectionTracker> {
        self.toc.as_ref().map(|toc| &toc.tracker)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.tracker().and_then(|t| t.active_id())
    }

    pub fn is_toc_collapsed(&self) -> bool {
        self.toc.as_ref().is_some_and(Toc::is_collapsed)
    }

    pub fn theme(&self) -> Theme {
        dom::select_first(&self.document, "html")
            .and_then(|root| dom::attr(&root, "data-theme"))
            .and_then(|value| Theme::parse(&value))
            .unwrap_or_default()
    }

    /// Earliest instant at which [`Page::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let scan = self.toc.as_ref().and_then(|toc| toc.tracker.next_deadline());
        let highlight = self.highlights.iter().map(|(_, at)| *at).min();
        match (scan, highlight) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn handle(&mut self, event: PageEvent, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            PageEvent::Scroll { offset } => {
                self.offset = offset;
                self.apply_scroll_chrome();
                if let Some(toc) = &mut self.toc {
                    toc.tracker.on_scroll(offset, now);
                    toc.render_progress();
                }
            }
            PageEvent::Resize { viewport } => {
                if let Some(toc) = &mut self.toc {
                    toc.tracker.on_resize(viewport, now);
                    toc.apply_width_default();
                    toc.render_progress();
                }
            }
            PageEvent::Reflow { headings, viewport } => {
                self.tops = headings.iter().map(|b| (b.id.clone(), b.top)).collect();
                if let Some(toc) = &mut self.toc {
                    let change = toc.tracker.reflow(&headings, viewport);
                    toc.apply_width_default();
                    toc.render_progress();
                    toc.sync(change, &mut effects);
                }
            }
            PageEvent::Intersections { entries } => {
                if let Some(toc) = &mut self.toc {
                    let change = toc.tracker.on_intersections(&entries);
                    toc.sync(change, &mut effects);
                }
            }
            PageEvent::Click { target } => self.click(&target, now, &mut effects),
            PageEvent::HashChange { fragment } => {
                anchors::highlight_fragment(&self.anchors, fragment.as_deref());
            }
        }
        effects
    }

    /// Runs whatever timers are due: the debounced scan and expiring
    /// highlights.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(toc) = &mut self.toc {
            let change = toc.tracker.poll(now);
            toc.sync(change, &mut effects);
        }
        self.highlights.retain(|(node, until)| {
            if *until <= now {
                dom::remove_class(node, HIGHLIGHT_CLASS);
                false
            } else {
                true
            }
        });
        effects
    }

    /// Copy request for the `index`th code block's copy button.
    pub fn code_copy_request(&self, index: usize) -> Option<CopyRequest> {
        let block = self.code_blocks.get(index)?;
        Some(CopyRequest {
            button: block.copy_button.clone(),
            text: block.text(),
        })
    }

    /// Copy request for the link button of heading `id`.
    pub fn heading_link_request(&self, id: &str) -> Option<CopyRequest> {
        let anchor = self.anchors.iter().find(|a| a.id == id)?;
        Some(CopyRequest {
            button: anchor.copy_button.clone()?,
            text: anchors::copy_url(&self.location, id),
        })
    }

    /// Detaches from the page: pending scans and highlight timers are
    /// dropped. Hands the storage back.
    pub fn dispose(mut self) -> S {
        if let Some(toc) = &mut self.toc {
            toc.tracker.dispose();
        }
        self.highlights.clear();
        tracing::debug!(url = %self.location, "page disposed");
        self.storage
    }

    fn click(&mut self, target: &NodeRef, now: Instant, effects: &mut Vec<Effect>) {
        self.close_menu_unless_inside(target);

        if self.inside(target, ".theme-toggle") {
            self.toggle_theme();
            return;
        }
        if self.inside(target, ".menu-toggle") {
            self.toggle_menu();
            return;
        }
        if self.code_block_click(target, effects) {
            return;
        }
        if let Some(anchor) = self.anchors.iter().find(|a| {
            a.copy_button
                .as_ref()
                .is_some_and(|b| dom::is_inside(target, b))
        }) {
            if let Some(request) = self.heading_link_request(&anchor.id) {
                effects.push(Effect::Copy(request));
            }
            return;
        }
        if self.toc_click(target, now, effects) {
            return;
        }
        if self.inside(target, ".back-to-top") {
            effects.push(Effect::ScrollWindow {
                top: 0.0,
                smooth: true,
            });
            return;
        }
        if let Some(id) = dom::closest(target, |n| dom::tag_name(n).as_deref() == Some("a"))
            .and_then(|a| dom::attr(&a, "href"))
            .and_then(|href| anchors::fragment_target(&href).map(str::to_string))
        {
            self.jump_to(&id, now, effects);
        }
    }

    fn code_block_click(&self, target: &NodeRef, effects: &mut Vec<Effect>) -> bool {
        for block in &self.code_blocks {
            let Some(control) = block.owns(target) else {
                continue;
            };
            match control {
                BlockControl::Copy => effects.push(Effect::Copy(CopyRequest {
                    button: block.copy_button.clone(),
                    text: block.text(),
                })),
                BlockControl::Fold => block.toggle_fold(),
                BlockControl::Expand => block.set_folded(false),
                BlockControl::Collapse => block.set_folded(true),
            }
            return true;
        }
        false
    }

    fn toc_click(&mut self, target: &NodeRef, now: Instant, effects: &mut Vec<Effect>) -> bool {
        let Some(toc) = &self.toc else {
            return false;
        };

        if toc.toggle.as_ref().is_some_and(|t| dom::is_inside(target, t)) {
            let collapsed = !toc.is_collapsed();
            self.choose_collapsed(collapsed, effects);
            return true;
        }

        if let Some(index) = toc.links.iter().position(|l| dom::is_inside(target, l)) {
            let id = toc.tracker.nav().items()[index].target.clone();
            if toc.is_collapsed() {
                self.choose_collapsed(false, effects);
            }
            self.jump_to(&id, now, effects);
            if let Some(toc) = &mut self.toc {
                let change = toc.tracker.activate(&id);
                toc.sync(change, effects);
            }
            return true;
        }

        let on_collapsed_panel = toc
            .sticky
            .as_ref()
            .is_some_and(|s| dom::is_inside(target, s))
            && toc.is_collapsed();
        if on_collapsed_panel {
            self.choose_collapsed(false, effects);
            return true;
        }
        false
    }

    fn choose_collapsed(&mut self, collapsed: bool, effects: &mut Vec<Effect>) {
        let Some(toc) = &mut self.toc else {
            return;
        };
        toc.collapse.choose(collapsed, &mut self.storage);
        toc.set_collapsed(collapsed);
        if !collapsed {
            toc.reveal_active(effects);
        }
    }

    /// Scrolls to heading `id` and lights it for the configured time.
    fn jump_to(&mut self, id: &str, now: Instant, effects: &mut Vec<Effect>) {
        let Some(anchor) = self.anchors.iter().find(|a| a.id == id) else {
            tracing::debug!(id, "jump to unknown heading ignored");
            return;
        };
        if let Some(top) = self.tops.get(id) {
            let tracker = &self.config.tracker;
            effects.push(Effect::ScrollWindow {
                top: top - tracker.header_offset - tracker.margin,
                smooth: true,
            });
        } else {
            tracing::debug!(id, "no geometry yet, scroll skipped");
        }

        let node = anchor.node.clone();
        dom::add_class(&node, HIGHLIGHT_CLASS);
        let until = now + self.config.highlight();
        match self.highlights.iter_mut().find(|(n, _)| *n == node) {
            Some(entry) => entry.1 = until,
            None => self.highlights.push((node, until)),
        }
    }

    fn toggle_theme(&mut self) {
        let theme = self.theme().toggled();
        self.apply_theme(theme);
        theme.store(&mut self.storage);
        tracing::debug!(theme = theme.as_str(), "theme toggled");
    }

    fn apply_theme(&self, theme: Theme) {
        if let Some(root) = dom::select_first(&self.document, "html") {
            dom::set_attr(&root, "data-theme", theme.as_str());
        }
        if let Some(icon) = dom::select_first(&self.document, ".theme-toggle i") {
            dom::set_attr(&icon, "class", theme.icon_class());
        }
    }

    fn apply_scroll_chrome(&self) {
        if let Some(banner) = dom::select_first(&self.document, ".banner") {
            dom::set_class(&banner, "scrolled", self.offset > self.config.banner_shrink_at);
        }
        if let Some(back) = dom::select_first(&self.document, ".back-to-top") {
            dom::set_class(&back, "hidden", self.offset <= self.config.back_to_top_at);
        }
    }

    fn toggle_menu(&self) {
        let toggle = dom::select_first(&self.document, ".menu-toggle");
        let menu = dom::select_first(&self.document, ".menu");
        if let (Some(toggle), Some(menu)) = (toggle, menu) {
            let open = dom::toggle_class(&menu, "active");
            dom::set_class(&toggle, "active", open);
        }
    }

    fn close_menu_unless_inside(&self, target: &NodeRef) {
        let Some(menu) = dom::select_first(&self.document, ".menu") else {
            return;
        };
        if !dom::has_class(&menu, "active")
            || dom::is_inside(target, &menu)
            || self.inside(target, ".menu-toggle")
        {
            return;
        }
        dom::remove_class(&menu, "active");
        if let Some(toggle) = dom::select_first(&self.document, ".menu-toggle") {
            dom::remove_class(&toggle, "active");
        }
    }

    fn inside(&self, target: &NodeRef, selector: &str) -> bool {
        dom::select_first(&self.document, selector).is_some_and(|n| dom::is_inside(target, &n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use kuchiki::traits::TendrilSink as _;

    fn page(html: &str) -> Page<MemoryStorage> {
        let doc = kuchiki::parse_html().one(html);
        let url = Url::parse("https://blog.example/post/").unwrap();
        Page::attach(doc, url, MemoryStorage::new(), Config::default())
    }

    #[test]
    fn pages_without_toc_still_get_chrome() {
        let p = page(
            r#"<div class="banner"></div><div class="back-to-top"></div>
               <div class="post-content"><h2>Only</h2></div>"#,
        );
        assert!(p.tracker().is_none());
        let back = dom::select_first(p.document(), ".back-to-top").unwrap();
        assert!(dom::has_class(&back, "hidden"));
        assert_eq!(p.anchors()[0].id, "only");
    }

    #[test]
    fn nested_toc_links_get_parents() {
        let doc = kuchiki::parse_html().one(
            r##"<div class="toc-content"><ol>
                <li class="toc-item"><a class="toc-link" href="#a">A</a><ol>
                  <li class="toc-item"><a class="toc-link" href="#b">B</a></li>
                </ol></li>
                <li class="toc-item"><a class="toc-link" href="#c">C</a></li>
                <li class="toc-item"><a class="toc-link" href="https://x/">X</a></li>
            </ol></div>"##,
        );
        let (nav, links) = nav_from_links(&doc);
        assert_eq!(links.len(), 3);
        assert_eq!(nav.items()[1].parent, Some(0));
        assert_eq!(nav.items()[2].parent, None);
    }

    #[test]
    fn menu_toggles_and_closes_on_outside_click() {
        let mut p = page(
            r#"<button class="menu-toggle"><i></i></button><ul class="menu"><li>x</li></ul>
               <p id="elsewhere">text</p>"#,
        );
        let now = Instant::now();
        let icon = dom::select_first(p.document(), ".menu-toggle i").unwrap();
        p.handle(PageEvent::Click { target: icon }, now);
        let menu = dom::select_first(p.document(), ".menu").unwrap();
        assert!(dom::has_class(&menu, "active"));

        let item = dom::select_first(p.document(), ".menu li").unwrap();
        p.handle(PageEvent::Click { target: item }, now);
        assert!(dom::has_class(&menu, "active"));

        let outside = dom::select_first(p.document(), "#elsewhere").unwrap();
        p.handle(PageEvent::Click { target: outside }, now);
        assert!(!dom::has_class(&menu, "active"));
    }

    #[test]
    fn host_events_deserialize() {
        let event: HostEvent =
            serde_json::from_str(r#"{"type": "scroll", "offset": 120.5}"#).unwrap();
        assert!(matches!(PageEvent::from(event), PageEvent::Scroll { offset } if offset == 120.5));

        let event: HostEvent = serde_json::from_str(
            r#"{"type": "reflow", "headings": [{"id": "a", "top": 10}],
                "viewport": {"width": 400, "height": 700, "document_height": 3000}}"#,
        )
        .unwrap();
        let PageEvent::Reflow { headings, viewport } = event.into() else {
            panic!("expected reflow");
        };
        assert_eq!(headings[0].height, 0.0);
        assert_eq!(viewport.width, 400.0);

        let event: HostEvent = serde_json::from_str(r#"{"type": "hashChange"}"#).unwrap();
        assert!(matches!(
            PageEvent::from(event),
            PageEvent::HashChange { fragment: None }
        ));
    }
}
