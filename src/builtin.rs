use maud::{Markup, html};

pub const ICON_COPY: &str = "fa-regular fa-copy";
pub const ICON_CHECK: &str = "fa-solid fa-check";
pub const ICON_FAILED: &str = "fa-solid fa-times";
pub const ICON_UNFOLDED: &str = "fa-solid fa-chevron-down";
pub const ICON_FOLDED: &str = "fa-solid fa-chevron-right";
pub const ICON_COLLAPSE: &str = "fa-solid fa-chevron-up";

pub const TITLE_FOLD: &str = "Fold Code";
pub const TITLE_UNFOLD: &str = "Unfold Code";

pub const EXPAND_WRAPPER_STYLE: &str =
    "position: absolute; bottom: 0; left: 0; width: 100%; text-align: center; z-index: 7";

pub fn icon(class: &str) -> Markup {
    html! { i class=(class) {} }
}

/// Header injected at the top of every code block.
pub fn code_header(language: &str) -> Markup {
    html! {
        div class="code-header" {
            span class="lang-label" { (language.to_uppercase()) }
            button class="copy-button" title="Copy Code" { (icon(ICON_COPY)) }
            button class="fold-button" title=(TITLE_FOLD) { (icon(ICON_UNFOLDED)) }
        }
    }
}

pub fn expand_wrapper() -> Markup {
    html! {
        div class="expand-button-wrapper" style=(EXPAND_WRAPPER_STYLE) {
            button class="expand-button" title="Expand Code" style="display: flex" {
                (icon(ICON_UNFOLDED)) " Show more"
            }
        }
    }
}

pub fn collapse_button() -> Markup {
    html! {
        button class="collapse-button" title="Collapse Code" style="display: none" {
            (icon(ICON_COLLAPSE)) " Show less"
        }
    }
}

pub fn heading_link() -> Markup {
    html! {
        span class="heading-link-wrapper" {
            button class="heading-copy-button" title="Copy link to this section" {
                (icon(ICON_COPY))
            }
        }
    }
}

pub fn progress_track() -> Markup {
    html! {
        div class="toc-progress" {
            div class="toc-progress-bar" style="height: 0%" {}
        }
    }
}
