use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\n\r\x0C]+").expect("whitespace regex"));
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-]+").expect("non-word regex"));
static HYPHEN_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("hyphen regex"));

/// Derives an anchor identifier from heading text.
///
/// Anything that would survive as a percent escape (punctuation, non-ASCII)
/// is dropped, so `"Hello, World!  Foo"` becomes `hello-world-foo`. The result
/// may be empty; [`IdAllocator`] takes care of that case.
pub fn slugify(text: &str) -> String {
    // ASCII-only case folding: non-ASCII characters must be dropped, never
    // folded into ASCII letters.
    let lowered = text.trim().to_ascii_lowercase();
    let hyphenated = WHITESPACE.replace_all(&lowered, "-");
    let stripped = NON_WORD.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUN.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Hands out unique heading ids for one page.
#[derive(Debug, Default)]
pub struct IdAllocator {
    taken: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an id that already exists in the document.
    pub fn reserve(&mut self, id: &str) {
        self.taken.insert(id.to_string());
    }

    /// Returns a fresh id for heading text at 1-based `position`.
    pub fn allocate(&mut self, text: &str, position: usize) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = format!("section-{position}");
        }

        let mut candidate = base.clone();
        let mut suffix = 1usize;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}
