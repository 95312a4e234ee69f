//! The eye: the frame the scene is seen from
//!
//! An [`Eye`] wraps an ordinary frame of the graph and adds what is needed to
//! look through it: a projection, the scene bounding sphere that drives the
//! default clipping planes, and the frustum boundary planes used for
//! visibility queries.
//!
//! The view matrix is the inverse of the eye frame's world matrix. Projection
//! follows the OpenGL convention (looking down -Z, depth in `[-1, 1]`).

use crate::core::{Dimension, GraphConfig, Handedness, ProjectionType};
use crate::foundation::collections::FrameId;
use crate::foundation::math::{
    Mat4, Mat4Ext, Point3, Vec2, Vec3, Vec4,
    constants::{EPSILON, HALF_PI},
    utils::{angle_between, deg_to_rad},
};
use crate::scene::error::GraphError;
use crate::scene::Graph;

/// Result of a visibility query against the frustum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Entirely inside every boundary plane
    Visible,
    /// Straddles at least one boundary plane
    Semivisible,
    /// Entirely outside at least one boundary plane
    Invisible,
}

/// Plane defined by normal and distance from origin
///
/// Points with a non-negative signed distance are on the inner side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing towards the inside of the frustum
    pub normal: Vec3,
    /// Signed offset along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        let length = normal.norm();
        if length <= EPSILON {
            return Self { normal: Vec3::zeros(), distance: 0.0 };
        }
        Self { normal: normal / length, distance: distance / length }
    }

    /// Plane `a*x + b*y + c*z + d = 0` from its packed coefficients
    pub fn from_coefficients(coefficients: &Vec4) -> Self {
        Self::new(coefficients.xyz(), coefficients.w)
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Point3) -> f32 {
        self.normal.dot(&point.coords) + self.distance
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Default for Frustum {
    fn default() -> Self {
        Self { planes: [Plane::new(Vec3::zeros(), 0.0); 6] }
    }
}

impl Frustum {
    /// Index of the left plane in [`Frustum::planes`]
    pub const LEFT: usize = 0;
    /// Index of the right plane
    pub const RIGHT: usize = 1;
    /// Index of the bottom plane
    pub const BOTTOM: usize = 2;
    /// Index of the top plane
    pub const TOP: usize = 3;
    /// Index of the near plane
    pub const NEAR: usize = 4;
    /// Index of the far plane
    pub const FAR: usize = 5;

    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a projection-view matrix
    ///
    /// Gribb-Hartmann: each plane is the fourth row of the matrix plus or
    /// minus one of the first three.
    pub fn from_matrix(projection_view: &Mat4) -> Self {
        let row = |i: usize| {
            Vec4::new(
                projection_view[(i, 0)],
                projection_view[(i, 1)],
                projection_view[(i, 2)],
                projection_view[(i, 3)],
            )
        };
        let (x, y, z, w) = (row(0), row(1), row(2), row(3));
        Self {
            planes: [
                Plane::from_coefficients(&(w + x)),
                Plane::from_coefficients(&(w - x)),
                Plane::from_coefficients(&(w + y)),
                Plane::from_coefficients(&(w - y)),
                Plane::from_coefficients(&(w + z)),
                Plane::from_coefficients(&(w - z)),
            ],
        }
    }

    /// Whether `point` is on the inner side of every plane
    pub fn contains_point(&self, point: &Point3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Classify a sphere
    pub fn ball_visibility(&self, center: &Point3, radius: f32) -> Visibility {
        let mut inside = true;
        for plane in &self.planes {
            let distance = plane.distance_to_point(center);
            if distance < -radius {
                return Visibility::Invisible;
            }
            if distance < radius {
                inside = false;
            }
        }
        if inside { Visibility::Visible } else { Visibility::Semivisible }
    }

    /// Classify an axis-aligned box by testing its corners against each plane
    pub fn box_visibility(&self, min: &Point3, max: &Point3) -> Visibility {
        let corners = [
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(min.x, max.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(min.x, max.y, max.z),
            Point3::new(max.x, max.y, max.z),
        ];
        let mut inside = true;
        for plane in &self.planes {
            let count = corners
                .iter()
                .filter(|corner| plane.distance_to_point(corner) >= 0.0)
                .count();
            if count == 0 {
                return Visibility::Invisible;
            }
            if count < corners.len() {
                inside = false;
            }
        }
        if inside { Visibility::Visible } else { Visibility::Semivisible }
    }
}

/// What the projection depends on besides the eye's own parameters
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProjectionInputs {
    pub dimension: Dimension,
    pub handedness: Handedness,
    pub width: u32,
    pub height: u32,
    /// Eye-space depth of the scene center
    pub distance: f32,
    /// Scene radius expressed in eye-space units
    pub radius: f32,
}

impl ProjectionInputs {
    fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Snapshot of everything the view and projection depend on
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EyeSignature {
    params: u64,
    viewport: (u32, u32),
    chain: Vec<(FrameId, u64)>,
}

/// Eye capability attached to one frame of the graph
#[derive(Debug, Clone)]
pub struct Eye {
    pub(crate) frame: FrameId,
    projection: ProjectionType,
    field_of_view: f32,
    ortho_half_extents: Option<Vec2>,
    near_override: Option<f32>,
    far_override: Option<f32>,
    scene_center: Point3,
    scene_radius: f32,
    z_clipping_coefficient: f32,
    z_near_coefficient: f32,
    pub(crate) frustum: Frustum,
    pub(crate) boundary_equations: bool,
    params_version: u64,
    pub(crate) last_update: u64,
    pub(crate) last_equations_update: Option<u64>,
    pub(crate) observed: Option<EyeSignature>,
}

impl Eye {
    pub(crate) fn new(frame: FrameId, config: &GraphConfig) -> Self {
        let projection = match config.dimension {
            Dimension::TwoD => ProjectionType::Orthographic,
            Dimension::ThreeD => config.projection,
        };
        Self {
            frame,
            projection,
            field_of_view: deg_to_rad(config.field_of_view_degrees),
            ortho_half_extents: None,
            near_override: None,
            far_override: None,
            scene_center: Point3::from(Vec3::from(config.scene_center)),
            scene_radius: config.scene_radius,
            z_clipping_coefficient: config.z_clipping_coefficient,
            z_near_coefficient: config.z_near_coefficient,
            frustum: Frustum::default(),
            boundary_equations: config.boundary_equations,
            params_version: 0,
            last_update: 0,
            last_equations_update: None,
            observed: None,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.params_version = self.params_version.wrapping_add(1);
    }

    pub(crate) fn params_version(&self) -> u64 {
        self.params_version
    }

    /// Frame the eye looks through
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Current projection type
    pub fn projection_type(&self) -> ProjectionType {
        self.projection
    }

    pub(crate) fn set_projection_type(&mut self, projection: ProjectionType) {
        if self.projection != projection {
            self.projection = projection;
            self.touch();
        }
    }

    /// Vertical field of view in radians
    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    /// Scene bounding sphere center
    pub fn scene_center(&self) -> Point3 {
        self.scene_center
    }

    /// Scene bounding sphere radius
    pub fn scene_radius(&self) -> f32 {
        self.scene_radius
    }

    /// Current boundary planes
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Update counter bumped whenever the eye's view or projection changes
    pub fn last_update(&self) -> u64 {
        self.last_update
    }

    /// Value of [`Eye::last_update`] when the boundary planes were computed
    pub fn last_equations_update(&self) -> Option<u64> {
        self.last_equations_update
    }

    /// Whether boundary planes are recomputed automatically
    pub fn are_boundary_equations_enabled(&self) -> bool {
        self.boundary_equations
    }

    /// Near plane distance for a scene center at eye-space depth `distance`
    /// and a scene radius of `radius` eye-space units
    pub fn z_near_for(&self, distance: f32, radius: f32) -> f32 {
        if let Some(near) = self.near_override {
            return near;
        }
        let span = self.z_clipping_coefficient * radius;
        let minimum = self.z_near_coefficient * span;
        let near = distance - span;
        if near < minimum {
            match self.projection {
                ProjectionType::Perspective => minimum,
                ProjectionType::Orthographic => 0.0,
            }
        } else {
            near
        }
    }

    /// Far plane distance, see [`Eye::z_near_for`]
    pub fn z_far_for(&self, distance: f32, radius: f32) -> f32 {
        self.far_override
            .unwrap_or(distance + self.z_clipping_coefficient * radius)
    }

    fn ortho_half_extents_for(&self, inputs: &ProjectionInputs) -> Vec2 {
        if let Some(extents) = self.ortho_half_extents {
            return extents;
        }
        if inputs.dimension == Dimension::TwoD {
            return Vec2::new(inputs.width as f32 * 0.5, inputs.height as f32 * 0.5);
        }
        let half = (self.field_of_view * 0.5).tan() * inputs.distance.max(inputs.radius);
        let aspect = inputs.aspect();
        if aspect >= 1.0 {
            Vec2::new(half * aspect, half)
        } else {
            Vec2::new(half, half / aspect)
        }
    }

    pub(crate) fn projection_matrix(&self, inputs: &ProjectionInputs) -> Mat4 {
        let matrix = match (inputs.dimension, self.projection) {
            (Dimension::TwoD, _) => {
                let extents = self.ortho_half_extents_for(inputs);
                let depth = (inputs.distance + self.z_clipping_coefficient * inputs.radius).max(1.0);
                Mat4::orthographic(extents.x, extents.y, -depth, depth)
            }
            (Dimension::ThreeD, ProjectionType::Perspective) => {
                let near = self.z_near_for(inputs.distance, inputs.radius);
                let far = self.z_far_for(inputs.distance, inputs.radius).max(near + EPSILON);
                Mat4::perspective(self.field_of_view, inputs.aspect(), near, far)
            }
            (Dimension::ThreeD, ProjectionType::Orthographic) => {
                let extents = self.ortho_half_extents_for(inputs);
                let near = self.z_near_for(inputs.distance, inputs.radius);
                let far = self.z_far_for(inputs.distance, inputs.radius).max(near + EPSILON);
                Mat4::orthographic(extents.x, extents.y, near, far)
            }
        };
        match inputs.handedness {
            Handedness::Right => matrix,
            Handedness::Left => Mat4::new_nonuniform_scaling(&Vec3::new(1.0, -1.0, 1.0)) * matrix,
        }
    }
}

const STALE_BOUNDARY_WARNING: &str =
    "Boundary equations are not updated automatically; visibility queries use the last computed planes. Call enable_boundary_equations(true) first";

impl Graph {
    /// The eye
    pub fn eye(&self) -> &Eye {
        &self.eye
    }

    /// Frame the graph is seen from
    pub fn eye_frame(&self) -> FrameId {
        self.eye.frame
    }

    /// Whether `frame` is the eye's frame
    pub fn is_eye_frame(&self, frame: FrameId) -> bool {
        self.eye.frame == frame
    }

    /// Attach the eye to another frame
    ///
    /// The previous eye frame's branch is pruned from the tree and returned.
    /// The new frame is withdrawn from picking and fitted to the scene
    /// bounding sphere.
    pub fn set_eye(&mut self, frame: FrameId) -> Result<Option<Vec<FrameId>>, GraphError> {
        if !self.frames.contains_key(frame) {
            return Err(GraphError::UnknownFrame(frame));
        }
        if frame == self.eye.frame {
            return Ok(None);
        }
        let previous = self.eye.frame;
        let pruned = if self.is_reachable(previous) {
            Some(self.prune(previous)?)
        } else {
            None
        };
        self.unregister_pickable(frame);
        self.eye.frame = frame;
        self.eye.touch();
        self.show_entire_scene()?;
        log::debug!("Eye moved from {:?} to {:?}", previous, frame);
        Ok(pruned)
    }

    /// Inverse of the eye frame's world matrix
    pub fn view_matrix(&self) -> Result<Mat4, GraphError> {
        let world = self
            .world_matrix(self.eye.frame)
            .ok_or(GraphError::UnknownFrame(self.eye.frame))?;
        world.try_inverse().ok_or(GraphError::SingularMatrix("eye world"))
    }

    pub(crate) fn projection_inputs(&self, view: &Mat4) -> ProjectionInputs {
        let center = view.transform_point(&self.eye.scene_center);
        let magnitude = self.eye_magnitude().max(EPSILON);
        let (width, height) = self.matrices.viewport();
        ProjectionInputs {
            dimension: self.dimension,
            handedness: self.handedness,
            width,
            height,
            distance: center.z.abs(),
            radius: self.eye.scene_radius / magnitude,
        }
    }

    fn eye_magnitude(&self) -> f32 {
        let Some(world) = self.world_transform(self.eye.frame) else {
            return 1.0;
        };
        match self.dimension {
            Dimension::TwoD => (world.scale().x * world.scale().y).abs().sqrt(),
            Dimension::ThreeD => world.magnitude(),
        }
    }

    /// Projection matrix for the current eye, viewport and scene bounds
    pub fn projection_matrix(&self) -> Result<Mat4, GraphError> {
        let view = self.view_matrix()?;
        Ok(self.eye.projection_matrix(&self.projection_inputs(&view)))
    }

    /// Near clipping distance currently in effect
    pub fn z_near(&self) -> Result<f32, GraphError> {
        let inputs = self.projection_inputs(&self.view_matrix()?);
        Ok(self.eye.z_near_for(inputs.distance, inputs.radius))
    }

    /// Far clipping distance currently in effect
    pub fn z_far(&self) -> Result<f32, GraphError> {
        let inputs = self.projection_inputs(&self.view_matrix()?);
        Ok(self.eye.z_far_for(inputs.distance, inputs.radius))
    }

    /// World position of the eye
    pub fn eye_position(&self) -> Point3 {
        self.world_matrix(self.eye.frame)
            .map_or_else(Point3::origin, |world| world.transform_point(&Point3::origin()))
    }

    /// Unit world direction the eye looks along (its -Z axis)
    pub fn view_direction(&self) -> Vec3 {
        self.world_transform(self.eye.frame)
            .map_or(-Vec3::z(), |world| world.rotation() * -Vec3::z())
    }

    /// Eye projection type
    pub fn projection_type(&self) -> ProjectionType {
        self.eye.projection
    }

    /// Switch the eye projection; 3D only
    pub fn set_projection_type(&mut self, projection: ProjectionType) -> bool {
        if self.is_2d() {
            self.warnings.depth_warning("set_projection_type");
            return false;
        }
        self.eye.set_projection_type(projection);
        true
    }

    /// Toggle between perspective and orthographic; 3D only
    pub fn toggle_projection_type(&mut self) -> bool {
        if self.is_2d() {
            self.warnings.depth_warning("toggle_projection_type");
            return false;
        }
        let next = match self.eye.projection {
            ProjectionType::Perspective => ProjectionType::Orthographic,
            ProjectionType::Orthographic => ProjectionType::Perspective,
        };
        self.eye.set_projection_type(next);
        true
    }

    /// Vertical field of view in radians
    pub fn field_of_view(&self) -> f32 {
        self.eye.field_of_view
    }

    /// Set the vertical field of view in radians; 3D only
    pub fn set_field_of_view(&mut self, field_of_view: f32) -> bool {
        if self.is_2d() {
            self.warnings.depth_warning("set_field_of_view");
            return false;
        }
        if !(field_of_view > 0.0 && field_of_view < std::f32::consts::PI) {
            log::warn!("Rejected field of view {field_of_view}: must be within (0, PI)");
            return false;
        }
        self.eye.field_of_view = field_of_view;
        self.eye.touch();
        true
    }

    /// Override the orthographic half extents; `None` derives them again
    pub fn set_ortho_half_extents(&mut self, extents: Option<Vec2>) {
        self.eye.ortho_half_extents = extents.map(|e| e.abs());
        self.eye.touch();
    }

    /// Override the clipping distances; `None` restores the derived value
    pub fn set_clip_planes(&mut self, near: Option<f32>, far: Option<f32>) {
        self.eye.near_override = near;
        self.eye.far_override = far;
        self.eye.touch();
    }

    /// Scene bounding sphere radius
    pub fn scene_radius(&self) -> f32 {
        self.eye.scene_radius
    }

    /// Set the scene bounding sphere radius; must be positive
    pub fn set_scene_radius(&mut self, radius: f32) -> bool {
        if !(radius.is_finite() && radius > 0.0) {
            log::warn!("Rejected scene radius {radius}: must be positive");
            return false;
        }
        self.eye.scene_radius = radius;
        self.eye.touch();
        true
    }

    /// Scene bounding sphere center
    pub fn scene_center(&self) -> Point3 {
        self.eye.scene_center
    }

    /// Set the scene bounding sphere center
    pub fn set_scene_center(&mut self, center: Point3) {
        self.eye.scene_center = center;
        self.eye.touch();
    }

    /// Set the scene bounds from an axis-aligned box; 3D only
    pub fn set_bounding_box(&mut self, min: &Point3, max: &Point3) -> bool {
        if self.is_2d() {
            self.warnings.depth_warning("set_bounding_box");
            return false;
        }
        let center = nalgebra::center(min, max);
        self.set_scene_center(center);
        self.set_scene_radius(0.5 * (max - min).norm())
    }

    /// Set the scene bounds from a rectangle in the XY plane; 2D only
    pub fn set_bounding_rect(&mut self, min: &Vec2, max: &Vec2) -> bool {
        if !self.is_2d() {
            self.warnings.flat_warning("set_bounding_rect");
            return false;
        }
        let center = (min + max) * 0.5;
        self.set_scene_center(Point3::new(center.x, center.y, 0.0));
        self.set_scene_radius(0.5 * (max - min).norm())
    }

    /// Move the eye so the ball is entirely visible
    ///
    /// 3D: the eye keeps its orientation and backs away from `center` along
    /// its view direction. 2D: the eye centers on the ball and rescales.
    pub fn fit_ball(&mut self, center: &Point3, radius: f32) -> Result<(), GraphError> {
        let eye = self.eye.frame;
        let (width, height) = self.matrices.viewport();
        match self.dimension {
            Dimension::ThreeD => {
                let aspect = width.max(1) as f32 / height.max(1) as f32;
                let half_fov = self.eye.field_of_view * 0.5;
                let half_angle = if aspect < 1.0 {
                    (half_fov.tan() * aspect).atan()
                } else {
                    half_fov
                };
                let distance = radius / half_angle.sin();
                let position = center - self.view_direction() * distance;
                self.set_world_position(eye, &position)
            }
            Dimension::TwoD => {
                let magnitude = 2.0 * radius / width.min(height).max(1) as f32;
                let parent_magnitude = self
                    .frames
                    .get(eye)
                    .and_then(|frame| frame.reference)
                    .and_then(|parent| self.world_transform(parent))
                    .map_or(1.0, |world| (world.scale().x * world.scale().y).abs().sqrt());
                let local = magnitude / parent_magnitude.max(EPSILON);
                if let Some(frame) = self.frames.get_mut(eye) {
                    frame.set_scaling(Vec3::repeat(local));
                }
                let depth = self.eye_position().z;
                self.set_world_position(eye, &Point3::new(center.x, center.y, depth))
            }
        }
    }

    /// Fit the eye to the scene bounding sphere
    pub fn show_entire_scene(&mut self) -> Result<(), GraphError> {
        let (center, radius) = (self.eye.scene_center, self.eye.scene_radius);
        self.fit_ball(&center, radius)
    }

    /// Enable or disable automatic boundary plane updates in `pre_draw`
    pub fn enable_boundary_equations(&mut self, enabled: bool) {
        self.eye.boundary_equations = enabled;
    }

    /// Whether boundary planes are updated automatically
    pub fn are_boundary_equations_enabled(&self) -> bool {
        self.eye.boundary_equations
    }

    /// Current boundary planes
    pub fn boundary_planes(&self) -> &[Plane; 6] {
        &self.eye.frustum.planes
    }

    /// Record an eye update if the eye frame chain or projection changed
    /// since the last check. Returns whether it did.
    pub(crate) fn refresh_eye_update(&mut self) -> bool {
        let mut chain = Vec::new();
        let mut current = Some(self.eye.frame);
        while let Some(id) = current {
            let Some(frame) = self.frames.get(id) else { break };
            chain.push((id, frame.version()));
            current = frame.reference;
            if chain.len() > self.frames.len() {
                log::error!("Reference cycle detected above eye frame {:?}", self.eye.frame);
                break;
            }
        }
        let signature = EyeSignature {
            params: self.eye.params_version(),
            viewport: self.matrices.viewport(),
            chain,
        };
        if self.eye.observed.as_ref() == Some(&signature) {
            return false;
        }
        self.eye.observed = Some(signature);
        self.eye.last_update += 1;
        true
    }

    /// Whether the boundary planes predate the last eye update
    pub fn boundary_equations_outdated(&self) -> bool {
        self.eye.last_equations_update != Some(self.eye.last_update)
    }

    /// Recompute the boundary planes from the current eye
    pub fn update_boundary_equations(&mut self) -> Result<(), GraphError> {
        self.refresh_eye_update();
        let view = self.view_matrix()?;
        let projection = self.eye.projection_matrix(&self.projection_inputs(&view));
        self.eye.frustum = Frustum::from_matrix(&(projection * view));
        self.eye.last_equations_update = Some(self.eye.last_update);
        Ok(())
    }

    fn warn_if_stale_boundary(&mut self) {
        if !self.eye.boundary_equations {
            self.warnings.warn_once(STALE_BOUNDARY_WARNING);
        }
    }

    /// Whether a world point lies inside the frustum
    pub fn is_point_visible(&mut self, point: &Point3) -> bool {
        self.warn_if_stale_boundary();
        self.eye.frustum.contains_point(point)
    }

    /// Classify a world-space sphere against the frustum
    pub fn ball_visibility(&mut self, center: &Point3, radius: f32) -> Visibility {
        self.warn_if_stale_boundary();
        self.eye.frustum.ball_visibility(center, radius)
    }

    /// Classify a world-space axis-aligned box against the frustum
    pub fn box_visibility(&mut self, min: &Point3, max: &Point3) -> Visibility {
        self.warn_if_stale_boundary();
        self.eye.frustum.box_visibility(min, max)
    }

    /// Whether the counter-clockwise triangle `a`, `b`, `c` faces away from
    /// the eye; 3D only
    pub fn is_face_back_facing(&mut self, a: &Point3, b: &Point3, c: &Point3) -> bool {
        if self.is_2d() {
            self.warnings.depth_warning("is_face_back_facing");
            return false;
        }
        let normal = (b - a).cross(&(c - a));
        if normal.norm() <= EPSILON {
            return false;
        }
        self.is_cone_back_facing(a, &normal, 0.0)
    }

    /// Whether every normal within `angle` of `axis` at `vertex` faces away
    /// from the eye; 3D only
    pub fn is_cone_back_facing(&mut self, vertex: &Point3, axis: &Vec3, angle: f32) -> bool {
        if self.is_2d() {
            self.warnings.depth_warning("is_cone_back_facing");
            return false;
        }
        let view_direction = match self.eye.projection {
            ProjectionType::Perspective => vertex - self.eye_position(),
            ProjectionType::Orthographic => self.view_direction(),
        };
        angle_between(axis, &view_direction) + angle < HALF_PI
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GraphConfig;
    use crate::scene::Frame;
    use approx::assert_relative_eq;

    fn looking_down_z() -> Graph {
        let config = GraphConfig::new(800, 600).with_scene([0.0, 0.0, -2000.0], 100.0);
        let mut graph = Graph::new(&config).unwrap();
        let eye = graph.eye_frame();
        graph.frame_mut(eye).unwrap().set_translation(Vec3::zeros());
        graph.enable_boundary_equations(true);
        graph.update_boundary_equations().unwrap();
        graph
    }

    #[test]
    fn test_plane_normalizes_coefficients() {
        let plane = Plane::from_coefficients(&Vec4::new(0.0, 2.0, 0.0, 4.0));
        assert_relative_eq!(plane.normal, Vec3::y());
        assert_relative_eq!(plane.distance, 2.0);
        assert_relative_eq!(plane.distance_to_point(&Point3::new(0.0, -2.0, 0.0)), 0.0);
    }

    #[test]
    fn test_frustum_from_identity_is_unit_cube() {
        let frustum = Frustum::from_matrix(&Mat4::identity());
        assert!(frustum.contains_point(&Point3::new(0.5, -0.5, 0.9)));
        assert!(!frustum.contains_point(&Point3::new(1.5, 0.0, 0.0)));
        assert_eq!(
            frustum.box_visibility(&Point3::new(0.5, 0.5, 0.5), &Point3::new(1.5, 1.5, 1.5)),
            Visibility::Semivisible
        );
    }

    #[test]
    fn test_sphere_visibility_in_front_and_behind() {
        let mut graph = looking_down_z();
        let center = Point3::new(0.0, 0.0, -2000.0);
        assert_eq!(graph.ball_visibility(&center, 10.0), Visibility::Visible);
        assert_eq!(
            graph.ball_visibility(&Point3::new(0.0, 0.0, 2000.0), 10.0),
            Visibility::Invisible
        );
        let near = graph.z_near().unwrap();
        let straddling = Point3::new(0.0, 0.0, -near);
        assert_eq!(graph.ball_visibility(&straddling, 10.0), Visibility::Semivisible);
    }

    #[test]
    fn test_default_clipping_planes() {
        let graph = looking_down_z();
        let span = 3.0_f32.sqrt() * 100.0;
        assert_relative_eq!(graph.z_near().unwrap(), 2000.0 - span, epsilon = 1e-2);
        assert_relative_eq!(graph.z_far().unwrap(), 2000.0 + span, epsilon = 1e-2);
    }

    #[test]
    fn test_near_plane_is_clamped_inside_scene() {
        let config = GraphConfig::new(800, 600).with_scene([0.0, 0.0, 0.0], 100.0);
        let mut graph = Graph::new(&config).unwrap();
        let eye = graph.eye_frame();
        graph.frame_mut(eye).unwrap().set_translation(Vec3::zeros());
        let span = 3.0_f32.sqrt() * 100.0;
        assert_relative_eq!(graph.z_near().unwrap(), 0.005 * span, epsilon = 1e-4);
        graph.set_projection_type(ProjectionType::Orthographic);
        assert_relative_eq!(graph.z_near().unwrap(), 0.0);
    }

    #[test]
    fn test_fit_ball_keeps_ball_visible() {
        let config = GraphConfig::new(800, 600);
        let mut graph = Graph::new(&config).unwrap();
        let center = Point3::new(10.0, -5.0, 3.0);
        graph.fit_ball(&center, 50.0).unwrap();
        graph.update_boundary_equations().unwrap();
        assert_eq!(graph.ball_visibility(&center, 49.0), Visibility::Visible);
        assert_relative_eq!(graph.view_direction(), -Vec3::z(), epsilon = 1e-5);
    }

    #[test]
    fn test_eye_update_tracks_frame_changes() {
        let mut graph = looking_down_z();
        assert!(!graph.boundary_equations_outdated());
        assert!(!graph.refresh_eye_update());
        let eye = graph.eye_frame();
        graph.frame_mut(eye).unwrap().translate(&Vec3::new(1.0, 0.0, 0.0));
        assert!(graph.refresh_eye_update());
        assert!(graph.boundary_equations_outdated());
    }

    #[test]
    fn test_back_facing_triangle() {
        let mut graph = looking_down_z();
        let (a, b, c) = (
            Point3::new(0.0, 0.0, -10.0),
            Point3::new(1.0, 0.0, -10.0),
            Point3::new(0.0, 1.0, -10.0),
        );
        assert!(!graph.is_face_back_facing(&a, &b, &c));
        assert!(graph.is_face_back_facing(&a, &c, &b));
    }

    #[test]
    fn test_set_eye_prunes_previous_branch() {
        let mut graph = Graph::new(&GraphConfig::default()).unwrap();
        let old = graph.eye_frame();
        let next = graph.spawn(Frame::new()).unwrap();
        let pruned = graph.set_eye(next).unwrap().unwrap();
        assert_eq!(pruned, vec![old]);
        assert!(!graph.is_reachable(old));
        assert!(!graph.is_pickable(next));
        assert!(graph.is_eye_frame(next));
    }

    #[test]
    fn test_set_eye_fits_new_eye_to_scene() {
        let config = GraphConfig::new(800, 600).with_scene([0.0, 0.0, -50.0], 20.0);
        let mut graph = Graph::new(&config).unwrap();
        let fitted = graph.eye_position();
        assert!(fitted.z > -50.0);

        let next = graph.spawn(Frame::new()).unwrap();
        graph.set_eye(next).unwrap();

        assert_relative_eq!(graph.eye_position(), fitted, epsilon = 1e-3);
    }

    #[test]
    fn test_left_handed_flips_projection() {
        let right = Graph::new(&GraphConfig::default()).unwrap();
        let left = Graph::new(&GraphConfig::default().with_handedness(Handedness::Left)).unwrap();
        let (p, q) = (right.projection_matrix().unwrap(), left.projection_matrix().unwrap());
        assert_relative_eq!(p[(1, 1)], -q[(1, 1)]);
        assert_relative_eq!(p[(0, 0)], q[(0, 0)]);
    }
}
