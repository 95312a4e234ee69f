//! Specialized collection types

use std::collections::HashSet;

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Opaque handle to a frame stored in a [`crate::scene::Graph`]
    ///
    /// Handles stay valid while the frame lives in the graph arena, whether or
    /// not it is currently reachable. A handle to a discarded frame resolves to
    /// `None` instead of aliasing a newer frame.
    pub struct FrameId;
}

/// Arena holding every frame owned by a graph
pub type FrameArena<T> = SlotMap<FrameId, T>;

/// Insertion-ordered set of frame handles
///
/// Iteration follows insertion order; membership checks are constant time.
#[derive(Debug, Clone, Default)]
pub struct FrameSet {
    order: Vec<FrameId>,
    members: HashSet<FrameId>,
}

impl FrameSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handle; returns `false` if it was already present
    pub fn insert(&mut self, id: FrameId) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Remove a handle, keeping the order of the rest
    pub fn remove(&mut self, id: FrameId) -> bool {
        if !self.members.remove(&id) {
            return false;
        }
        self.order.retain(|&member| member != id);
        true
    }

    /// Remove every listed handle in a single pass; returns how many were present
    pub fn remove_all(&mut self, ids: &[FrameId]) -> usize {
        let removed = ids.iter().filter(|&id| self.members.remove(id)).count();
        if removed > 0 {
            let members = &self.members;
            self.order.retain(|id| members.contains(id));
        }
        removed
    }

    pub fn contains(&self, id: &FrameId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Handles in insertion order
    pub fn as_slice(&self) -> &[FrameId] {
        &self.order
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameId> {
        self.order.iter()
    }
}

impl FromIterator<FrameId> for FrameSet {
    fn from_iter<I: IntoIterator<Item = FrameId>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<'a> IntoIterator for &'a FrameSet {
    type Item = &'a FrameId;
    type IntoIter = std::slice::Iter<'a, FrameId>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}
