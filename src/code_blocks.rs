//! Code block toolbar: language label, copy button and folding.

use kuchiki::NodeRef;
use maud::html;

use crate::builtin;
use crate::dom;

#[derive(Debug, Clone)]
enum Source {
    /// Highlighter output: a `figure.highlight` table with `.line` rows.
    Figure,
    /// A bare `pre`, copied verbatim.
    Pre(NodeRef),
}

#[derive(Debug, Clone)]
pub struct CodeBlock {
    /// Element that carries `folded`: the figure or the injected wrapper.
    pub container: NodeRef,
    pub copy_button: NodeRef,
    pub fold_button: NodeRef,
    expand_wrapper: Option<NodeRef>,
    collapse_button: Option<NodeRef>,
    source: Source,
}

impl CodeBlock {
    pub fn is_folded(&self) -> bool {
        dom::has_class(&self.container, "folded")
    }

    pub fn language(&self) -> String {
        dom::select_first(&self.container, ".lang-label")
            .map(|n| n.text_contents())
            .unwrap_or_default()
    }

    /// Text placed on the clipboard by the copy button.
    pub fn text(&self) -> String {
        match &self.source {
            Source::Pre(pre) => pre.text_contents(),
            Source::Figure => {
                let mut lines = dom::select_all(&self.container, "td.code .line");
                if lines.is_empty() {
                    lines = dom::select_all(&self.container, ".line");
                }
                lines
                    .iter()
                    .map(|l| l.text_contents())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }

    pub fn set_folded(&self, folded: bool) {
        dom::set_class(&self.container, "folded", folded);
        let (icon, title) = if folded {
            (builtin::ICON_FOLDED, builtin::TITLE_UNFOLD)
        } else {
            (builtin::ICON_UNFOLDED, builtin::TITLE_FOLD)
        };
        dom::set_inner(&self.fold_button, builtin::icon(icon));
        dom::set_attr(&self.fold_button, "title", title);
        if let Some(wrapper) = &self.expand_wrapper {
            dom::set_display(wrapper, if folded { "block" } else { "none" });
        }
        if let Some(button) = &self.collapse_button {
            dom::set_display(button, if folded { "none" } else { "flex" });
        }
    }

    pub fn toggle_fold(&self) {
        self.set_folded(!self.is_folded());
    }

    pub fn owns(&self, node: &NodeRef) -> Option<BlockControl> {
        if dom::is_inside(node, &self.copy_button) {
            return Some(BlockControl::Copy);
        }
        if dom::is_inside(node, &self.fold_button) {
            return Some(BlockControl::Fold);
        }
        if let Some(wrapper) = &self.expand_wrapper {
            if dom::is_inside(node, wrapper) {
                return Some(BlockControl::Expand);
            }
        }
        if let Some(button) = &self.collapse_button {
            if dom::is_inside(node, button) {
                return Some(BlockControl::Collapse);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockControl {
    Copy,
    Fold,
    Expand,
    Collapse,
}

/// Decorates every code block under `root` that is not yet `processed`.
pub fn process_code_blocks(root: &NodeRef, fold_threshold: usize) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();

    for figure in dom::select_all(root, "figure.highlight") {
        if !dom::add_class(&figure, "processed") {
            continue;
        }
        let language = figure_language(&figure);
        let line_count = dom::select_all(&figure, ".line").len();
        if let Some(block) = decorate(&figure, &language, Source::Figure, line_count, fold_threshold)
        {
            blocks.push(block);
        }
    }

    for pre in dom::select_all(root, "pre") {
        if dom::has_class(&pre, "processed") || inside_highlight(&pre) {
            continue;
        }
        dom::add_class(&pre, "processed");

        let Some(wrapper) = dom::fragment(html! { div class="code-block-wrapper" {} }, "div")
        else {
            continue;
        };
        pre.insert_before(wrapper.clone());
        wrapper.append(pre.clone());

        let language = pre_language(&pre);
        let line_count = pre.text_contents().matches('\n').count() + 1;
        if let Some(block) = decorate(
            &wrapper,
            &language,
            Source::Pre(pre.clone()),
            line_count,
            fold_threshold,
        ) {
            blocks.push(block);
        }
    }

    tracing::debug!(count = blocks.len(), "code blocks decorated");
    blocks
}

fn decorate(
    container: &NodeRef,
    language: &str,
    source: Source,
    line_count: usize,
    fold_threshold: usize,
) -> Option<CodeBlock> {
    let header = dom::fragment(builtin::code_header(language), "div.code-header")?;
    container.prepend(header.clone());
    let copy_button = dom::select_first(&header, "button.copy-button")?;
    let fold_button = dom::select_first(&header, "button.fold-button")?;

    let mut block = CodeBlock {
        container: container.clone(),
        copy_button,
        fold_button,
        expand_wrapper: None,
        collapse_button: None,
        source,
    };

    if line_count > fold_threshold {
        let wrapper = dom::fragment(builtin::expand_wrapper(), "div.expand-button-wrapper")?;
        let collapse = dom::fragment(builtin::collapse_button(), "button.collapse-button")?;
        container.append(wrapper.clone());
        container.append(collapse.clone());
        block.expand_wrapper = Some(wrapper);
        block.collapse_button = Some(collapse);
        block.set_folded(true);
    }

    Some(block)
}

fn inside_highlight(node: &NodeRef) -> bool {
    node.ancestors().any(|a| {
        dom::has_class(&a, "highlight")
            && matches!(dom::tag_name(&a).as_deref(), Some("figure") | Some("div"))
    })
}

fn figure_language(figure: &NodeRef) -> String {
    dom::classes(figure)
        .into_iter()
        .filter(|c| c != "highlight" && c != "processed")
        .last()
        .unwrap_or_else(|| "code".to_string())
}

fn pre_language(pre: &NodeRef) -> String {
    dom::select_first(pre, "code")
        .map(|code| dom::classes(&code))
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| c.strip_prefix("language-").map(str::to_string))
        .last()
        .unwrap_or_else(|| "code".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::TendrilSink as _;

    fn figure(lines: usize) -> String {
        let rows: String = (0..lines)
            .map(|i| format!(r#"<span class="line">let x{i} = {i};</span><br>"#))
            .collect();
        format!(
            r#"<figure class="highlight rust"><table><tr><td class="gutter"><pre>1</pre></td><td class="code"><pre>{rows}</pre></td></tr></table></figure>"#
        )
    }

    #[test]
    fn figure_gets_header_and_line_text() {
        let doc = kuchiki::parse_html().one(figure(3));
        let blocks = process_code_blocks(&doc, 15);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.language(), "RUST");
        assert!(!block.is_folded());
        assert_eq!(block.text(), "let x0 = 0;\nlet x1 = 1;\nlet x2 = 2;");
        // The gutter/code pres inside the figure are not wrapped again.
        assert!(dom::select_first(&doc, ".code-block-wrapper").is_none());
    }

    #[test]
    fn long_blocks_start_folded_and_toggle() {
        let doc = kuchiki::parse_html().one(figure(16));
        let blocks = process_code_blocks(&doc, 15);
        let block = &blocks[0];
        assert!(block.is_folded());
        assert_eq!(dom::attr(&block.fold_button, "title").as_deref(), Some("Unfold Code"));

        block.toggle_fold();
        assert!(!block.is_folded());
        let collapse = dom::select_first(&doc, ".collapse-button").unwrap();
        assert_eq!(dom::attr(&collapse, "style").as_deref(), Some("display: flex"));
        let wrapper = dom::select_first(&doc, ".expand-button-wrapper").unwrap();
        let style = dom::attr(&wrapper, "style").unwrap();
        assert!(style.starts_with(builtin::EXPAND_WRAPPER_STYLE), "{style}");
        assert!(style.ends_with("display: none"), "{style}");
        assert!(dom::select_first(&block.fold_button, "i.fa-chevron-down").is_some());

        block.toggle_fold();
        let style = dom::attr(&wrapper, "style").unwrap();
        assert_eq!(style, format!("{}; display: block", builtin::EXPAND_WRAPPER_STYLE));
    }

    #[test]
    fn bare_pre_is_wrapped_with_language() {
        let doc = kuchiki::parse_html()
            .one(r#"<div class="post-content"><pre><code class="hljs language-python">print(1)
print(2)</code></pre></div>"#);
        let blocks = process_code_blocks(&doc, 15);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language(), "PYTHON");
        assert_eq!(blocks[0].text(), "print(1)\nprint(2)");
        assert!(dom::has_class(&blocks[0].container, "code-block-wrapper"));
    }

    #[test]
    fn processing_twice_is_a_no_op() {
        let doc = kuchiki::parse_html().one(format!("{}<pre>plain</pre>", figure(2)));
        assert_eq!(process_code_blocks(&doc, 15).len(), 2);
        assert!(process_code_blocks(&doc, 15).is_empty());
        assert_eq!(dom::select_all(&doc, ".code-header").len(), 2);
    }

    #[test]
    fn controls_are_recognised() {
        let doc = kuchiki::parse_html().one(figure(20));
        let blocks = process_code_blocks(&doc, 15);
        let icon = dom::select_first(&blocks[0].copy_button, "i").unwrap();
        assert_eq!(blocks[0].owns(&icon), Some(BlockControl::Copy));
        let expand = dom::select_first(&doc, ".expand-button").unwrap();
        assert_eq!(blocks[0].owns(&expand), Some(BlockControl::Expand));
    }
}
