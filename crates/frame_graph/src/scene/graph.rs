//! # Graph
//!
//! Owns every frame in an arena and keeps the tree structure over them:
//! leading (root) frames, parent/child links, and the registry of frames that
//! take part in picking.
//!
//! Frames stay alive in the arena when their branch is pruned, so a pruned
//! branch can be appended back later. A frame is *reachable* when a chain of
//! parent-lists-child links leads to it from a leading frame; only reachable
//! frames are traversed and picked.

use std::collections::HashMap;

use crate::core::{ConfigError, Dimension, GraphConfig, Handedness};
use crate::foundation::collections::{FrameArena, FrameId, FrameSet};
use crate::foundation::logging::WarningLog;
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::geom::Transform;
use crate::input::picking::{IdColor, Picker};
use crate::render::{MatrixHandler, VisualHints};
use crate::scene::error::GraphError;
use crate::scene::eye::Eye;
use crate::scene::frame::Frame;
use crate::timing::TimingHandler;

/// Scene graph: frame tree, eye, matrix stacks, picking and timing
pub struct Graph {
    pub(crate) frames: FrameArena<Frame>,
    pub(crate) leading: FrameSet,
    pub(crate) pickables: FrameSet,
    pub(crate) pick_index: HashMap<u32, FrameId>,
    next_pick_id: u32,
    pub(crate) eye: Eye,
    pub(crate) matrices: MatrixHandler,
    pub(crate) picker: Picker,
    pub(crate) warnings: WarningLog,
    pub(crate) timing: TimingHandler,
    pub(crate) dimension: Dimension,
    pub(crate) handedness: Handedness,
    pub(crate) visual_hints: VisualHints,
    pub(crate) frame_count: u64,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("frames", &self.frames.len())
            .field("leading", &self.leading.as_slice())
            .field("pickables", &self.pickables.len())
            .field("eye", &self.eye.frame)
            .field("dimension", &self.dimension)
            .field("handedness", &self.handedness)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// Create a graph with a default eye
    ///
    /// The eye frame is a leading frame that does not take part in picking.
    /// In 3D it is fitted to the configured scene bounds.
    pub fn new(config: &GraphConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut frames = FrameArena::with_key();
        let eye_frame = frames.insert(Frame::new());
        let mut hints = VisualHints::empty();
        hints.set(VisualHints::AXES, config.visual_hints.axes);
        hints.set(VisualHints::GRID, config.visual_hints.grid);
        hints.set(VisualHints::PICKING, config.visual_hints.picking);

        let mut graph = Self {
            frames,
            leading: [eye_frame].into_iter().collect(),
            pickables: FrameSet::new(),
            pick_index: HashMap::new(),
            next_pick_id: 1,
            eye: Eye::new(eye_frame, config),
            matrices: MatrixHandler::new(
                config.width,
                config.height,
                config.cache_projection_view_inverse,
            ),
            picker: Picker::new(config.pick_threshold),
            warnings: WarningLog::new(),
            timing: TimingHandler::new(),
            dimension: config.dimension,
            handedness: config.handedness,
            visual_hints: hints,
            frame_count: 0,
        };
        graph.assign_pick_id(eye_frame).map_err(|err| ConfigError::Invalid(err.to_string()))?;

        if graph.dimension == Dimension::ThreeD {
            if let Err(err) = graph.show_entire_scene() {
                log::warn!("Could not fit the default eye to the scene: {err}");
            }
        } else {
            let center = graph.eye.scene_center();
            if let Some(frame) = graph.frames.get_mut(eye_frame) {
                frame.set_translation(Vec3::new(center.x, center.y, 0.0));
            }
        }
        if let Err(err) = graph.update_boundary_equations() {
            log::warn!("Could not compute initial boundary equations: {err}");
        }
        log::debug!("Created {:?} graph with eye frame {:?}", graph.dimension, eye_frame);
        Ok(graph)
    }

    fn assign_pick_id(&mut self, id: FrameId) -> Result<(), GraphError> {
        let pick_id = self.next_pick_id;
        if IdColor::from_id(pick_id).is_none() {
            return Err(GraphError::PickIdsExhausted);
        }
        self.next_pick_id += 1;
        if let Some(frame) = self.frames.get_mut(id) {
            frame.pick_id = pick_id;
        }
        self.pick_index.insert(pick_id, id);
        Ok(())
    }

    fn check(&self, id: FrameId) -> Result<&Frame, GraphError> {
        self.frames.get(id).ok_or(GraphError::UnknownFrame(id))
    }

    // ------------------------------------------------------------------
    // Frame storage

    /// Store a detached frame without attaching it to the tree
    pub fn insert(&mut self, mut frame: Frame) -> Result<FrameId, GraphError> {
        if IdColor::from_id(self.next_pick_id).is_none() {
            return Err(GraphError::PickIdsExhausted);
        }
        frame.detach();
        let id = self.frames.insert(frame);
        self.assign_pick_id(id)?;
        Ok(id)
    }

    /// Store a frame as a new leading frame and make it pickable
    pub fn spawn(&mut self, frame: Frame) -> Result<FrameId, GraphError> {
        let id = self.insert(frame)?;
        self.leading.insert(id);
        self.register_pickable(id);
        Ok(id)
    }

    /// Store a frame as the last child of `parent` and make it pickable
    pub fn spawn_child(&mut self, parent: FrameId, frame: Frame) -> Result<FrameId, GraphError> {
        self.check(parent)?;
        let id = self.insert(frame)?;
        if let Some(frame) = self.frames.get_mut(id) {
            frame.reference = Some(parent);
        }
        if let Some(parent) = self.frames.get_mut(parent) {
            parent.children.push(id);
        }
        self.register_pickable(id);
        Ok(id)
    }

    /// Copy a frame's transform, picking settings and draw callback into a
    /// new frame attached to the same reference
    pub fn duplicate(&mut self, id: FrameId) -> Result<FrameId, GraphError> {
        let source = self.check(id)?.clone();
        let reference = source.reference;
        let pickable = self.is_pickable(id);
        let copy = self.insert(source)?;
        match reference {
            Some(parent) if self.frames.contains_key(parent) => {
                if let Some(frame) = self.frames.get_mut(copy) {
                    frame.reference = Some(parent);
                }
                if let Some(parent) = self.frames.get_mut(parent) {
                    parent.children.push(copy);
                }
            }
            _ => {
                self.leading.insert(copy);
            }
        }
        if pickable {
            self.register_pickable(copy);
        }
        Ok(copy)
    }

    /// Whether `id` names a frame in the arena
    pub fn contains(&self, id: FrameId) -> bool {
        self.frames.contains_key(id)
    }

    /// Frame by handle
    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id)
    }

    /// Mutable frame by handle
    ///
    /// Structural links are not reachable through `Frame`'s public API; use
    /// [`Graph::set_reference`] to re-parent.
    pub fn frame_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.frames.get_mut(id)
    }

    /// Number of frames in the arena, reachable or not
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Leading frames in registration order
    pub fn leading_frames(&self) -> &[FrameId] {
        self.leading.as_slice()
    }

    /// Frame registered under a pick identifier
    pub fn frame_by_pick_id(&self, pick_id: u32) -> Option<FrameId> {
        self.pick_index.get(&pick_id).copied()
    }

    // ------------------------------------------------------------------
    // Tree structure

    /// Register a frame without reference as a leading frame
    pub fn add_leading(&mut self, id: FrameId) -> Result<(), GraphError> {
        let frame = self.check(id)?;
        if frame.reference.is_some() {
            return Err(GraphError::HasReference(id));
        }
        if self.leading.contains(&id) {
            return Err(GraphError::AlreadyLeading(id));
        }
        self.leading.insert(id);
        Ok(())
    }

    fn remove_leading(&mut self, id: FrameId) -> bool {
        self.leading.remove(id)
    }

    /// Whether `ancestor` appears on the reference chain above `id`
    pub fn is_ancestor(&self, ancestor: FrameId, id: FrameId) -> bool {
        let mut current = self.frames.get(id).and_then(|frame| frame.reference);
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.frames.len() {
                log::error!("Reference cycle detected above {:?}", id);
                return false;
            }
            current = self.frames.get(parent).and_then(|frame| frame.reference);
        }
        false
    }

    /// Re-parent a frame; `None` makes it a leading frame
    ///
    /// Fails without touching the tree when the new reference is the frame
    /// itself or one of its descendants. The frame keeps its local transform.
    pub fn set_reference(&mut self, id: FrameId, reference: Option<FrameId>) -> Result<(), GraphError> {
        let current = self.check(id)?.reference;
        if let Some(parent) = reference {
            self.check(parent)?;
            if parent == id || self.is_ancestor(id, parent) {
                return Err(GraphError::Cycle { frame: id, parent });
            }
        }
        let attached = match reference {
            Some(parent) => self
                .frames
                .get(parent)
                .is_some_and(|parent| parent.children.contains(&id)),
            None => self.leading.contains(&id),
        };
        if current == reference && attached {
            return Ok(());
        }

        match current {
            Some(old) => {
                if let Some(old) = self.frames.get_mut(old) {
                    old.children.retain(|&child| child != id);
                }
            }
            None => {
                self.remove_leading(id);
            }
        }

        match reference {
            Some(parent) => {
                if let Some(parent) = self.frames.get_mut(parent) {
                    parent.children.push(id);
                }
            }
            None => {
                self.leading.insert(id);
            }
        }
        if let Some(frame) = self.frames.get_mut(id) {
            frame.reference = reference;
            frame.touch();
        }
        log::trace!("Frame {:?} reference set to {:?}", id, reference);
        Ok(())
    }

    /// Whether the frame can be reached from a leading frame
    pub fn is_reachable(&self, id: FrameId) -> bool {
        let mut current = id;
        let mut steps = 0;
        loop {
            let Some(frame) = self.frames.get(current) else {
                return false;
            };
            match frame.reference {
                None => return self.leading.contains(&current),
                Some(parent) => {
                    let listed = self
                        .frames
                        .get(parent)
                        .is_some_and(|parent| parent.children.contains(&current));
                    if !listed {
                        return false;
                    }
                    current = parent;
                }
            }
            steps += 1;
            if steps > self.frames.len() {
                log::error!("Reference cycle detected above {:?}", id);
                return false;
            }
        }
    }

    /// Pre-order list of `root` and its descendants
    ///
    /// The eye frame is skipped unless `include_eye` is set; its descendants
    /// are visited either way.
    pub fn collect(&self, root: FrameId, include_eye: bool) -> Vec<FrameId> {
        let mut list = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(frame) = self.frames.get(id) else { continue };
            if include_eye || id != self.eye.frame {
                list.push(id);
            }
            stack.extend(frame.children.iter().rev().copied());
        }
        list
    }

    /// Every reachable frame, leading frames in registration order and each
    /// subtree in pre-order
    pub fn frames(&self, include_eye: bool) -> Vec<FrameId> {
        self.leading
            .iter()
            .flat_map(|&root| self.collect(root, include_eye))
            .collect()
    }

    /// Path from `tail` down to `tip`
    ///
    /// Starts with `tail` and lists each descendant on the way, ending with
    /// `tip`. Empty when `tip` is not `tail` or one of its descendants.
    pub fn branch(&self, tail: FrameId, tip: FrameId, include_eye: bool) -> Vec<FrameId> {
        if !self.frames.contains_key(tail) || !self.frames.contains_key(tip) {
            return Vec::new();
        }
        if tail != tip && !self.is_ancestor(tail, tip) {
            return Vec::new();
        }
        let mut path = vec![tip];
        let mut current = tip;
        while current != tail {
            let Some(parent) = self.frames.get(current).and_then(|frame| frame.reference) else {
                return Vec::new();
            };
            let listed = self
                .frames
                .get(parent)
                .is_some_and(|frame| frame.children.contains(&current));
            if !listed {
                return Vec::new();
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        let eye = self.eye.frame;
        path.into_iter()
            .enumerate()
            .filter(|&(index, id)| index == 0 || include_eye || id != eye)
            .map(|(_, id)| id)
            .collect()
    }

    /// Detach `root` and its descendants from the tree
    ///
    /// Returns the pruned frames in pre-order, eye frames included, so the
    /// list can be handed back to [`Graph::append`]. Pruned frames leave the
    /// pick registry but stay in the arena.
    pub fn prune(&mut self, root: FrameId) -> Result<Vec<FrameId>, GraphError> {
        self.check(root)?;
        if !self.is_reachable(root) {
            return Err(GraphError::Unreachable(root));
        }
        let branch = self.collect(root, true);
        self.pickables.remove_all(&branch);
        for &id in &branch {
            match self.frames.get(id).and_then(|frame| frame.reference) {
                Some(parent) => {
                    if let Some(parent) = self.frames.get_mut(parent) {
                        parent.children.retain(|&child| child != id);
                    }
                }
                None => {
                    self.remove_leading(id);
                }
            }
        }
        log::debug!("Pruned {} frame(s) below {:?}", branch.len(), root);
        Ok(branch)
    }

    /// Re-attach frames, typically a list returned by [`Graph::prune`]
    ///
    /// Entries are processed in order: each one is listed again as a child of
    /// its reference, or as leading if it has none, and rejoins the pick
    /// registry. Entries that are already reachable are skipped. Entries whose
    /// reference is missing or unreachable at that point are reported in
    /// [`GraphError::PartialAppend`] after the rest has been attached.
    pub fn append(&mut self, branch: &[FrameId]) -> Result<(), GraphError> {
        let mut rejected = Vec::new();
        for &id in branch {
            let Some(reference) = self.frames.get(id).map(|frame| frame.reference) else {
                rejected.push(id);
                continue;
            };
            if self.is_reachable(id) {
                continue;
            }
            match reference {
                Some(parent) => {
                    if !self.is_reachable(parent) {
                        rejected.push(id);
                        continue;
                    }
                    if let Some(parent) = self.frames.get_mut(parent) {
                        parent.children.push(id);
                    }
                }
                None => {
                self.leading.insert(id);
            }
            }
            if id != self.eye.frame {
                self.register_pickable(id);
            }
        }
        if rejected.is_empty() {
            Ok(())
        } else {
            log::warn!("{} frame(s) could not be re-attached", rejected.len());
            Err(GraphError::PartialAppend { rejected })
        }
    }

    /// Prune every leading branch; returns the pruned branches
    pub fn clear_tree(&mut self) -> Vec<Vec<FrameId>> {
        let roots = self.leading.as_slice().to_vec();
        roots
            .into_iter()
            .filter_map(|root| self.prune(root).ok())
            .collect()
    }

    /// Drop unreachable frames from the arena
    ///
    /// Reachable frames and the eye frame are kept. Returns how many frames
    /// were removed.
    pub fn discard(&mut self, ids: &[FrameId]) -> usize {
        let mut removed = 0;
        for &id in ids {
            if id == self.eye.frame || !self.frames.contains_key(id) || self.is_reachable(id) {
                continue;
            }
            self.unregister_pickable(id);
            if let Some(frame) = self.frames.remove(id) {
                self.pick_index.remove(&frame.pick_id);
                if let Some(parent) = frame.reference.and_then(|parent| self.frames.get_mut(parent)) {
                    parent.children.retain(|&child| child != id);
                }
                removed += 1;
            }
        }
        removed
    }

    // ------------------------------------------------------------------
    // Pick registry

    /// Make a frame eligible for `track` and `cast`
    pub fn register_pickable(&mut self, id: FrameId) -> bool {
        self.frames.contains_key(id) && self.pickables.insert(id)
    }

    /// Withdraw a frame from picking
    pub fn unregister_pickable(&mut self, id: FrameId) -> bool {
        self.pickables.remove(id)
    }

    /// Whether the frame is in the pick registry
    pub fn is_pickable(&self, id: FrameId) -> bool {
        self.pickables.contains(&id)
    }

    /// Registered frames in registration order
    pub fn pickables(&self) -> &[FrameId] {
        self.pickables.as_slice()
    }

    // ------------------------------------------------------------------
    // Coordinate systems

    /// Matrix mapping the frame's local coordinates to world coordinates
    pub fn world_matrix(&self, id: FrameId) -> Option<Mat4> {
        let mut matrix = self.frames.get(id)?.transform().to_matrix();
        let mut current = self.frames.get(id)?.reference;
        let mut steps = 0;
        while let Some(parent) = current {
            let frame = self.frames.get(parent)?;
            matrix = frame.transform().to_matrix() * matrix;
            current = frame.reference;
            steps += 1;
            if steps > self.frames.len() {
                log::error!("Reference cycle detected above {:?}", id);
                return None;
            }
        }
        Some(matrix)
    }

    /// Composed world transform of the frame
    ///
    /// Exact when every ancestor has a uniform scale.
    pub fn world_transform(&self, id: FrameId) -> Option<Transform> {
        let mut transform = *self.frames.get(id)?.transform();
        let mut current = self.frames.get(id)?.reference;
        let mut steps = 0;
        while let Some(parent) = current {
            let frame = self.frames.get(parent)?;
            transform = frame.transform().compose(&transform);
            current = frame.reference;
            steps += 1;
            if steps > self.frames.len() {
                log::error!("Reference cycle detected above {:?}", id);
                return None;
            }
        }
        Some(transform)
    }

    /// Express a world point in the frame's local coordinates
    pub fn coordinates_of(&self, id: FrameId, world: &Point3) -> Option<Point3> {
        let inverse = self.world_matrix(id)?.try_inverse()?;
        Some(inverse.transform_point(world))
    }

    /// Express a local point of the frame in world coordinates
    pub fn inverse_coordinates_of(&self, id: FrameId, local: &Point3) -> Option<Point3> {
        Some(self.world_matrix(id)?.transform_point(local))
    }

    /// World position of the frame's origin
    pub fn world_position(&self, id: FrameId) -> Option<Point3> {
        self.inverse_coordinates_of(id, &Point3::origin())
    }

    /// Move the frame so its origin lands on a world position
    pub fn set_world_position(&mut self, id: FrameId, position: &Point3) -> Result<(), GraphError> {
        let local = match self.check(id)?.reference {
            Some(parent) => self
                .coordinates_of(parent, position)
                .ok_or(GraphError::SingularMatrix("reference world"))?,
            None => *position,
        };
        if let Some(frame) = self.frames.get_mut(id) {
            frame.set_translation(local.coords);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Graph-wide settings

    /// Whether the graph is planar
    pub fn is_2d(&self) -> bool {
        self.dimension == Dimension::TwoD
    }

    /// Whether the graph is spatial
    pub fn is_3d(&self) -> bool {
        self.dimension == Dimension::ThreeD
    }

    /// Graph dimensionality
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// World handedness
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Whether world +Y points up on screen
    pub fn is_right_handed(&self) -> bool {
        self.handedness == Handedness::Right
    }

    /// Swap the handedness of the world coordinate system
    pub fn flip(&mut self) {
        self.handedness = match self.handedness {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        };
        self.eye.touch();
    }

    /// Viewport size in pixels
    pub fn viewport(&self) -> (u32, u32) {
        self.matrices.viewport()
    }

    /// Viewport width in pixels
    pub fn width(&self) -> u32 {
        self.matrices.viewport().0
    }

    /// Viewport height in pixels
    pub fn height(&self) -> u32 {
        self.matrices.viewport().1
    }

    /// Viewport width over height
    pub fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.matrices.viewport();
        width as f32 / height.max(1) as f32
    }

    /// Resize the viewport; both dimensions must be positive
    ///
    /// A size change drops the identifier buffer of the previous size.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), GraphError> {
        if width == 0 || height == 0 {
            return Err(GraphError::InvalidViewport { width, height });
        }
        if self.matrices.viewport() != (width, height) {
            self.picker.set_buffer(None);
        }
        self.matrices.set_viewport(width, height);
        self.eye.touch();
        Ok(())
    }

    /// Number of completed draw cycles
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Enabled debug overlays
    pub fn visual_hints(&self) -> VisualHints {
        self.visual_hints
    }

    /// Replace the enabled debug overlays
    pub fn set_visual_hints(&mut self, hints: VisualHints) {
        self.visual_hints = hints;
    }

    /// Enable or disable one or more overlays
    pub fn set_visual_hint(&mut self, hint: VisualHints, enabled: bool) {
        self.visual_hints.set(hint, enabled);
    }

    /// Toggle one or more overlays
    pub fn toggle_visual_hint(&mut self, hint: VisualHints) {
        self.visual_hints.toggle(hint);
    }

    /// Deduplicating warning log shared by graph operations
    pub fn warnings(&self) -> &WarningLog {
        &self.warnings
    }

    /// Matrix stacks and projection-view cache
    pub fn matrix_handler(&self) -> &MatrixHandler {
        &self.matrices
    }

    /// Whether the projection-view inverse is cached at bind time
    pub fn is_projection_view_inverse_cached(&self) -> bool {
        self.matrices.is_projection_view_inverse_cached()
    }

    /// Toggle caching of the projection-view inverse
    pub fn cache_projection_view_inverse(&mut self, cache: bool) {
        self.matrices.cache_projection_view_inverse(cache);
    }

    /// Periodic tasks run at the end of each draw cycle
    pub fn timing(&self) -> &TimingHandler {
        &self.timing
    }

    /// Mutable access to the periodic tasks
    pub fn timing_mut(&mut self) -> &mut TimingHandler {
        &mut self.timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn graph() -> Graph {
        Graph::new(&GraphConfig::default()).unwrap()
    }

    #[test]
    fn test_spawned_frames_are_reachable_and_pickable() {
        let mut graph = graph();
        let a = graph.spawn(Frame::new()).unwrap();
        let b = graph.spawn_child(a, Frame::new()).unwrap();
        assert!(graph.is_reachable(a));
        assert!(graph.is_reachable(b));
        assert!(graph.is_pickable(b));
        assert_eq!(graph.frame(b).unwrap().reference(), Some(a));
        assert_ne!(graph.frame(a).unwrap().pick_id(), graph.frame(b).unwrap().pick_id());
    }

    #[test]
    fn test_inserted_frame_is_detached() {
        let mut graph = graph();
        let id = graph.insert(Frame::new()).unwrap();
        assert!(!graph.is_reachable(id));
        graph.add_leading(id).unwrap();
        assert!(graph.is_reachable(id));
        assert_eq!(graph.add_leading(id), Err(GraphError::AlreadyLeading(id)));
    }

    #[test]
    fn test_add_leading_rejects_child() {
        let mut graph = graph();
        let a = graph.spawn(Frame::new()).unwrap();
        let b = graph.spawn_child(a, Frame::new()).unwrap();
        assert_eq!(graph.add_leading(b), Err(GraphError::HasReference(b)));
    }

    #[test]
    fn test_set_reference_cycle_leaves_tree_untouched() {
        let mut graph = graph();
        let a = graph.spawn(Frame::new()).unwrap();
        let b = graph.spawn_child(a, Frame::new()).unwrap();
        let c = graph.spawn_child(b, Frame::new()).unwrap();
        let before = graph.frames(true);

        assert_eq!(graph.set_reference(a, Some(c)), Err(GraphError::Cycle { frame: a, parent: c }));
        assert_eq!(graph.set_reference(a, Some(a)), Err(GraphError::Cycle { frame: a, parent: a }));
        assert_eq!(graph.frames(true), before);
    }

    #[test]
    fn test_set_reference_moves_between_parents() {
        let mut graph = graph();
        let a = graph.spawn(Frame::new()).unwrap();
        let b = graph.spawn(Frame::new()).unwrap();
        let c = graph.spawn_child(a, Frame::new()).unwrap();

        graph.set_reference(c, Some(b)).unwrap();
        assert!(!graph.frame(a).unwrap().has_child(c));
        assert!(graph.frame(b).unwrap().has_child(c));

        graph.set_reference(c, None).unwrap();
        assert!(graph.leading_frames().contains(&c));
        assert!(graph.is_reachable(c));
    }

    #[test]
    fn test_collect_is_pre_order() {
        let mut graph = graph();
        let a = graph.spawn(Frame::new()).unwrap();
        let b = graph.spawn_child(a, Frame::new()).unwrap();
        let c = graph.spawn_child(b, Frame::new()).unwrap();
        let d = graph.spawn_child(a, Frame::new()).unwrap();
        assert_eq!(graph.collect(a, false), vec![a, b, c, d]);
    }

    #[test]
    fn test_branch_path() {
        let mut graph = graph();
        let a = graph.spawn(Frame::new()).unwrap();
        let b = graph.spawn_child(a, Frame::new()).unwrap();
        let c = graph.spawn_child(b, Frame::new()).unwrap();
        let d = graph.spawn_child(a, Frame::new()).unwrap();
        assert_eq!(graph.branch(a, c, false), vec![a, b, c]);
        assert_eq!(graph.branch(b, b, false), vec![b]);
        assert!(graph.branch(d, c, false).is_empty());
    }

    #[test]
    fn test_prune_unknown_and_unreachable() {
        let mut graph = graph();
        let detached = graph.insert(Frame::new()).unwrap();
        assert_eq!(graph.prune(detached), Err(GraphError::Unreachable(detached)));
    }

    #[test]
    fn test_append_rejects_orphans() {
        let mut graph = graph();
        let a = graph.spawn(Frame::new()).unwrap();
        let b = graph.spawn_child(a, Frame::new()).unwrap();
        let branch = graph.prune(a).unwrap();
        let result = graph.append(&branch[1..]);
        assert_eq!(result, Err(GraphError::PartialAppend { rejected: vec![b] }));
        graph.append(&branch).unwrap();
        assert!(graph.is_reachable(b));
    }

    #[test]
    fn test_discard_keeps_reachable_frames() {
        let mut graph = graph();
        let a = graph.spawn(Frame::new()).unwrap();
        let b = graph.spawn(Frame::new()).unwrap();
        let pick_id = graph.frame(b).unwrap().pick_id();
        graph.prune(b).unwrap();
        assert_eq!(graph.discard(&[a, b]), 1);
        assert!(graph.contains(a));
        assert!(!graph.contains(b));
        assert_eq!(graph.frame_by_pick_id(pick_id), None);
    }

    #[test]
    fn test_duplicate_shares_reference() {
        let mut graph = graph();
        let a = graph.spawn(Frame::new()).unwrap();
        let b = graph
            .spawn_child(a, Frame::new().with_translation(Vec3::new(1.0, 2.0, 3.0)))
            .unwrap();
        let copy = graph.duplicate(b).unwrap();
        assert_eq!(graph.frame(copy).unwrap().reference(), Some(a));
        assert_eq!(graph.frame(a).unwrap().children(), &[b, copy]);
        assert_relative_eq!(graph.frame(copy).unwrap().translation(), Vec3::new(1.0, 2.0, 3.0));
        assert!(graph.is_pickable(copy));
    }

    #[test]
    fn test_world_conversions() {
        let mut graph = graph();
        let parent = graph
            .spawn(Frame::new().with_translation(Vec3::new(10.0, 0.0, 0.0)).with_scaling(2.0))
            .unwrap();
        let child = graph
            .spawn_child(parent, Frame::new().with_translation(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();

        let world = graph.world_position(child).unwrap();
        assert_relative_eq!(world, Point3::new(12.0, 0.0, 0.0));

        let local = graph.coordinates_of(child, &Point3::new(14.0, 2.0, 0.0)).unwrap();
        assert_relative_eq!(local, Point3::new(1.0, 1.0, 0.0), epsilon = 1e-5);

        graph.set_world_position(child, &Point3::new(0.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(graph.frame(child).unwrap().translation(), Vec3::new(-5.0, 0.0, 0.0));
    }

    #[test]
    fn test_viewport_must_be_positive() {
        let mut graph = graph();
        assert_eq!(
            graph.set_viewport(0, 10),
            Err(GraphError::InvalidViewport { width: 0, height: 10 })
        );
        graph.set_viewport(1024, 768).unwrap();
        assert_eq!(graph.viewport(), (1024, 768));
        assert_eq!((graph.width(), graph.height()), (1024, 768));
        assert_relative_eq!(graph.aspect_ratio(), 4.0 / 3.0);
    }

    #[test]
    fn test_flip_changes_handedness() {
        let mut graph = graph();
        assert!(graph.is_right_handed());
        graph.flip();
        assert_eq!(graph.handedness(), Handedness::Left);
    }
}
