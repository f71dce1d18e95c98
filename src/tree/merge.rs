//! Default-overlay merge.
//!
//! Runs once, after every value is set and before anything is validated.
//! Only never-set leaves are filled, so an explicit `false` or `0` survives.
//! Nested named sets merge per matching sub-key only.
use super::{qualify, qualify_key, DefaultSource, Multi, NamedSet, OptionKind, OptionNode};

impl Multi {
    /// Backfill unset leaves from the same-named children of `source`.
    pub fn merge_from(&mut self, source: &Multi) {
        for (name, child) in self.children_mut() {
            if let Some(other) = source.child(name) {
                child.merge_from(other);
            }
        }
    }

    /// Apply each named set's default source to its entries, in visiting order,
    /// so a sibling source is itself fully resolved before anything reads it.
    pub fn resolve_defaults(&mut self, path: &str) {
        for name in self.order().to_vec() {
            let defaults = self
                .child(&name)
                .and_then(OptionNode::as_named_set)
                .and_then(NamedSet::defaults);
            let source: Option<Multi> = match defaults {
                Some(DefaultSource::Sibling(from)) => self.child(from).and_then(OptionNode::as_multi).cloned(),
                Some(DefaultSource::Parent) => Some(self.clone()),
                None => None,
            };
            let child_path = qualify(path, &name);
            let Some(child) = self.child_mut(&name) else { continue };
            match &mut child.kind {
                OptionKind::NamedSet(set) => set.resolve_entries(&child_path, source.as_ref()),
                OptionKind::Multi(multi) => multi.resolve_defaults(&child_path),
                OptionKind::DefaultOverlay(overlay) => overlay.multi.resolve_defaults(&child_path),
                OptionKind::Leaf(_) => {}
            }
        }
    }
}

impl NamedSet {
    /// Merge every entry against `source`, then resolve the entry's own nested sets.
    fn resolve_entries(&mut self, path: &str, source: Option<&Multi>) {
        for (key, entry) in self.entries_mut().iter_mut() {
            if let Some(source) = source {
                entry.merge_from(source);
            }
            let entry_path = qualify_key(path, key);
            tracing::debug!(entry = %entry_path, "applied defaults");
            entry.resolve_defaults(&entry_path);
        }
    }

    /// Per matching sub-key: `self[k]` takes what `source[k]` set explicitly.
    /// Keys only in `source` are not copied over. Values `source[k]` itself
    /// inherited are left for the entry's own default pass.
    fn merge_matching(&mut self, source: &NamedSet) {
        for (key, entry) in self.entries_mut().iter_mut() {
            if let Some(other) = source.entry(key) {
                entry.merge_explicit_from(other);
            }
        }
    }
}

impl Multi {
    fn merge_explicit_from(&mut self, source: &Multi) {
        for (name, child) in self.children_mut() {
            let Some(other) = source.child(name) else { continue };
            match (&mut child.kind, &other.kind) {
                (OptionKind::Leaf(leaf), OptionKind::Leaf(from)) if from.is_explicit() => leaf.fill_from(from),
                (OptionKind::NamedSet(set), OptionKind::NamedSet(from)) => set.merge_matching(from),
                _ => {}
            }
        }
    }
}

impl OptionNode {
    pub fn merge_from(&mut self, source: &OptionNode) {
        match (&mut self.kind, &source.kind) {
            (OptionKind::Leaf(leaf), OptionKind::Leaf(other)) => leaf.fill_from(other),
            (OptionKind::NamedSet(set), OptionKind::NamedSet(other)) => set.merge_matching(other),
            (OptionKind::Multi(multi), _) => {
                if let Some(other) = source.as_multi() {
                    multi.merge_from(other);
                    if multi.children().any(OptionNode::is_set) {
                        multi.mark_set();
                    }
                }
            }
            _ => {}
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
