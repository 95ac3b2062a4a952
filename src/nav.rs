//! The TOC as an owned forest.
//!
//! Items live in one `Vec` in document order; `parent` is an index into it, so
//! highlighting a section and its ancestors is a bounded walk up parent
//! indices rather than a search through the rendered markup.

use std::collections::HashMap;

use crate::heading::Heading;

#[derive(Debug, Clone)]
pub struct NavItem {
    /// Id of the heading this item links to.
    pub target: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NavTree {
    items: Vec<NavItem>,
    by_target: HashMap<String, usize>,
}

impl NavTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item under `parent` and returns its index.
    ///
    /// The first item registered for a target wins the id lookup.
    pub fn push(&mut self, target: impl Into<String>, parent: Option<usize>) -> usize {
        let target = target.into();
        let index = self.items.len();
        let parent = parent.filter(|p| *p < index);
        if let Some(p) = parent {
            self.items[p].children.push(index);
        }
        self.by_target.entry(target.clone()).or_insert(index);
        self.items.push(NavItem {
            target,
            parent,
            children: Vec::new(),
            active: false,
        });
        index
    }

    /// Nests headings by level: each heading hangs under the closest preceding
    /// heading with a smaller level.
    pub fn from_headings(headings: &[Heading]) -> Self {
        let mut tree = Self::new();
        let mut stack: Vec<(u8, usize)> = Vec::new();
        for heading in headings {
            while stack.last().is_some_and(|(level, _)| *level >= heading.level) {
                stack.pop();
            }
            let parent = stack.last().map(|(_, index)| *index);
            let index = tree.push(heading.id.clone(), parent);
            stack.push((heading.level, index));
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[NavItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&NavItem> {
        self.items.get(index)
    }

    pub fn index_of(&self, target: &str) -> Option<usize> {
        self.by_target.get(target).copied()
    }

    pub fn is_active(&self, target: &str) -> bool {
        self.index_of(target)
            .is_some_and(|index| self.items[index].active)
    }

    pub fn active_targets(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| item.active)
            .map(|item| item.target.as_str())
            .collect()
    }

    /// Clears every flag, then marks `current` and its ancestors active.
    ///
    /// Returns the indices whose flag changed together with the new value, so
    /// callers only touch the links that actually differ. An unknown target
    /// just clears.
    pub fn set_active(&mut self, current: Option<&str>) -> Vec<(usize, bool)> {
        let before: Vec<bool> = self.items.iter().map(|item| item.active).collect();
        for item in &mut self.items {
            item.active = false;
        }

        if let Some(mut cursor) = current.and_then(|target| self.index_of(target)) {
            // Parents always precede children, so this walk is bounded by depth.
            loop {
                self.items[cursor].active = true;
                match self.items[cursor].parent {
                    Some(parent) => cursor = parent,
                    None => break,
                }
            }
        }

        self.items
            .iter()
            .zip(before)
            .enumerate()
            .filter(|(_, (item, was))| item.active != *was)
            .map(|(index, (item, _))| (index, item.active))
            .collect()
    }
}
