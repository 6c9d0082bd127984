//! Link closure of a target.
//!
//! Static libraries cannot carry their dependencies, so whoever links one
//! also links everything it needs. Shared libraries already record their
//! dependencies, so a consumer links the shared library itself and stops.
//!
//! The closure is ordered so that every library comes before the libraries
//! it depends on, which is what single-pass linkers require. A library
//! reached along several paths appears once.

use std::collections::{BTreeMap, HashSet};

use crate::builder::graph::TargetId;
use crate::core::description::LibraryKind;

#[derive(Debug, Clone)]
struct LinkEntry {
    kind: LibraryKind,
    deps: Vec<TargetId>,
}

/// Library kinds and declared dependencies, by target.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    entries: BTreeMap<TargetId, LinkEntry>,
}

impl LinkTable {
    pub fn new() -> Self {
        LinkTable::default()
    }

    pub fn insert(&mut self, target: TargetId, kind: LibraryKind, deps: Vec<TargetId>) {
        self.entries.insert(target, LinkEntry { kind, deps });
    }

    pub fn kind(&self, target: TargetId) -> Option<LibraryKind> {
        self.entries.get(&target).map(|e| e.kind)
    }

    fn deps(&self, target: TargetId) -> &[TargetId] {
        self.entries.get(&target).map(|e| e.deps.as_slice()).unwrap_or(&[])
    }

    /// Libraries a target with direct dependencies `direct` must link.
    ///
    /// Static libraries are followed into their own dependencies; shared
    /// libraries are leaves. The result is a reverse postorder of that
    /// traversal, with roots taken in declaration order.
    pub fn closure(&self, direct: &[TargetId]) -> Vec<TargetId> {
        let mut visited = HashSet::new();
        let mut postorder = Vec::new();

        // Visiting roots and children in reverse makes the reversed
        // postorder follow declaration order among independent libraries.
        for &root in direct.iter().rev() {
            self.visit(root, &mut visited, &mut postorder);
        }

        postorder.reverse();
        postorder
    }

    fn visit(&self, node: TargetId, visited: &mut HashSet<TargetId>, postorder: &mut Vec<TargetId>) {
        if !visited.insert(node) {
            return;
        }
        if self.kind(node) == Some(LibraryKind::Static) {
            for &dep in self.deps(node).iter().rev() {
                self.visit(dep, visited, postorder);
            }
        }
        postorder.push(node);
    }

    /// Shared libraries needed at link time only indirectly, through a
    /// shared library in `closure`.
    pub fn indirect_shared(&self, closure: &[TargetId]) -> Vec<TargetId> {
        let direct: HashSet<_> = closure.iter().copied().collect();
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for &lib in closure {
            if self.kind(lib) != Some(LibraryKind::Shared) {
                continue;
            }
            let mut stack: Vec<TargetId> = self.deps(lib).iter().rev().copied().collect();
            while let Some(node) = stack.pop() {
                if !seen.insert(node) {
                    continue;
                }
                if self.kind(node) == Some(LibraryKind::Shared) && !direct.contains(&node) {
                    found.push(node);
                }
                stack.extend(self.deps(node).iter().rev());
            }
        }

        found
    }
}
