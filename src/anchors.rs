//! Heading ids, copy-link buttons and `anchor-highlight`.

use kuchiki::NodeRef;
use url::Url;

use crate::builtin;
use crate::dom;
use crate::heading::heading_level;
use crate::slug::IdAllocator;

pub const HEADING_SELECTOR: &str = ".post-content h1, .post-content h2, .post-content h3, \
                                    .post-content h4, .post-content h5, .post-content h6";
pub const HIGHLIGHT_CLASS: &str = "anchor-highlight";

#[derive(Debug, Clone)]
pub struct HeadingAnchor {
    pub id: String,
    pub level: u8,
    pub node: NodeRef,
    /// `None` on pages that skip copy buttons.
    pub copy_button: Option<NodeRef>,
}

/// Gives every post heading an id and, unless `with_links` is false, a
/// copy-link button.
pub fn decorate_headings(root: &NodeRef, with_links: bool) -> Vec<HeadingAnchor> {
    let nodes = dom::select_all(root, HEADING_SELECTOR);

    let mut ids = IdAllocator::new();
    for id in dom::select_all(root, "[id]")
        .iter()
        .filter_map(|n| dom::attr(n, "id"))
    {
        ids.reserve(&id);
    }

    let mut anchors = Vec::with_capacity(nodes.len());
    for (position, node) in nodes.into_iter().enumerate() {
        let id = match dom::attr(&node, "id").filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => {
                let id = ids.allocate(&node.text_contents(), position + 1);
                dom::set_attr(&node, "id", id.clone());
                id
            }
        };
        let level = dom::tag_name(&node)
            .as_deref()
            .and_then(heading_level)
            .unwrap_or(6);

        let copy_button = if with_links {
            existing_button(&node).or_else(|| {
                let wrapper = dom::fragment(builtin::heading_link(), "span.heading-link-wrapper")?;
                node.append(wrapper.clone());
                dom::select_first(&wrapper, "button.heading-copy-button")
            })
        } else {
            None
        };

        anchors.push(HeadingAnchor {
            id,
            level,
            node,
            copy_button,
        });
    }
    tracing::debug!(count = anchors.len(), with_links, "headings decorated");
    anchors
}

fn existing_button(heading: &NodeRef) -> Option<NodeRef> {
    dom::select_first(heading, "button.heading-copy-button")
}

/// Whether heading copy buttons are shown on `location`.
pub fn links_enabled(location: &Url, skip_on: &[String]) -> bool {
    let path = location.path();
    !skip_on.iter().any(|s| path.contains(s.as_str()))
}

/// The page URL with its fragment replaced by `#id`.
pub fn copy_url(location: &Url, id: &str) -> String {
    let mut url = location.clone();
    url.set_fragment(Some(id));
    url.to_string()
}

/// Fragment of an in-page `href`, or `None` for `#` and external links.
pub fn fragment_target(href: &str) -> Option<&str> {
    href.strip_prefix('#').filter(|id| !id.is_empty())
}

/// Highlights the heading whose id is `fragment` and clears every other one.
pub fn highlight_fragment(anchors: &[HeadingAnchor], fragment: Option<&str>) {
    for anchor in anchors {
        dom::set_class(
            &anchor.node,
            HIGHLIGHT_CLASS,
            fragment == Some(anchor.id.as_str()),
        );
    }
}
