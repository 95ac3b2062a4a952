//! Small helpers over the kuchiki tree: class lists, attributes, fragments.

use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink as _;
use maud::Markup;

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    element.attributes.borrow().get(name).map(|s| s.to_string())
}

pub fn set_attr(node: &NodeRef, name: &str, value: impl Into<String>) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().insert(name, value.into());
    }
}

pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|element| element.name.local.as_ref().to_ascii_lowercase())
}

pub fn classes(node: &NodeRef) -> Vec<String> {
    attr(node, "class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    attr(node, "class").is_some_and(|c| c.split_whitespace().any(|c| c == class))
}

/// Returns `true` when the class was missing.
pub fn add_class(node: &NodeRef, class: &str) -> bool {
    let mut list = classes(node);
    if list.iter().any(|c| c == class) {
        return false;
    }
    list.push(class.to_string());
    set_attr(node, "class", list.join(" "));
    true
}

/// Returns `true` when the class was present.
pub fn remove_class(node: &NodeRef, class: &str) -> bool {
    let list = classes(node);
    if !list.iter().any(|c| c == class) {
        return false;
    }
    let kept: Vec<String> = list.into_iter().filter(|c| c != class).collect();
    set_attr(node, "class", kept.join(" "));
    true
}

pub fn set_class(node: &NodeRef, class: &str, on: bool) -> bool {
    if on {
        add_class(node, class)
    } else {
        remove_class(node, class)
    }
}

/// Returns whether the class is present afterwards.
pub fn toggle_class(node: &NodeRef, class: &str) -> bool {
    if !remove_class(node, class) {
        add_class(node, class);
        true
    } else {
        false
    }
}

/// Sets the `display` declaration, keeping the rest of the inline style.
pub fn set_display(node: &NodeRef, display: &str) {
    let style = attr(node, "style").unwrap_or_default();
    let mut declarations: Vec<&str> = style
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter(|d| {
            d.split(':')
                .next()
                .is_none_or(|name| !name.trim().eq_ignore_ascii_case("display"))
        })
        .collect();
    let own = format!("display: {display}");
    declarations.push(&own);
    set_attr(node, "style", declarations.join("; "));
}

pub fn select_all(root: &NodeRef, selector: &str) -> Vec<NodeRef> {
    match root.select(selector) {
        Ok(nodes) => nodes.map(|n| n.as_node().clone()).collect(),
        Err(()) => {
            tracing::warn!(selector, "invalid selector");
            Vec::new()
        }
    }
}

pub fn select_first(root: &NodeRef, selector: &str) -> Option<NodeRef> {
    root.select_first(selector).ok().map(|n| n.as_node().clone())
}

/// Closest inclusive ancestor matching `pred`.
pub fn closest(node: &NodeRef, pred: impl Fn(&NodeRef) -> bool) -> Option<NodeRef> {
    node.inclusive_ancestors().find(|n| pred(n))
}

pub fn is_inside(node: &NodeRef, container: &NodeRef) -> bool {
    node.inclusive_ancestors().any(|a| &a == container)
}

/// Parses rendered markup and returns its first element matching `selector`,
/// detached and ready to insert elsewhere.
pub fn fragment(markup: Markup, selector: &str) -> Option<NodeRef> {
    let doc = kuchiki::parse_html().one(markup.into_string());
    let node = select_first(&doc, selector)?;
    node.detach();
    Some(node)
}

/// Replaces all children of `node` with the given markup.
pub fn set_inner(node: &NodeRef, markup: Markup) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    let doc = kuchiki::parse_html().one(markup.into_string());
    if let Some(body) = select_first(&doc, "body") {
        for child in body.children().collect::<Vec<_>>() {
            node.append(child);
        }
    }
}
