//! Integration tests for picking across a full draw cycle

use std::cell::Cell;
use std::rc::Rc;

use crate::core::GraphConfig;
use crate::foundation::collections::FrameId;
use crate::foundation::math::{Point3, Vec3};
use crate::input::Precision;
use crate::render::{HeadlessBackend, RenderPass};
use crate::scene::{Frame, Graph};

#[cfg(test)]
mod tests {
    use super::*;

    const SPLAT: f32 = 6.0;

    fn marker(position: Vec3, precision: Precision) -> Frame {
        Frame::new()
            .with_translation(position)
            .with_precision(precision)
            .with_draw(|ctx| {
                if let Some(backend) = ctx.backend_as::<HeadlessBackend>() {
                    backend.splat(&Point3::origin(), SPLAT);
                }
            })
    }

    struct Scene {
        graph: Graph,
        left: FrameId,
        right: FrameId,
        top: FrameId,
    }

    fn scene() -> Scene {
        let mut graph = Graph::new(&GraphConfig::new(800, 600)).unwrap();
        let left = graph.spawn(marker(Vec3::new(-50.0, 0.0, 0.0), Precision::Exact)).unwrap();
        let right = graph.spawn(marker(Vec3::new(50.0, 0.0, 0.0), Precision::Exact)).unwrap();
        let top = graph.spawn(marker(Vec3::new(0.0, 30.0, 0.0), Precision::Bound)).unwrap();
        Scene { graph, left, right, top }
    }

    fn pixel_of(graph: &Graph, id: FrameId) -> (f32, f32) {
        let world = graph.world_position(id).unwrap();
        let window = graph.projected_coordinates_of(&world).unwrap();
        (window.x, window.y)
    }

    #[test]
    fn test_exact_frames_resolve_through_identifier_pass() {
        let Scene { mut graph, left, right, top } = scene();
        let mut backend = HeadlessBackend::new(800, 600);
        graph.render(&mut backend).unwrap();
        assert_eq!(backend.display_splats(), 3);
        assert!(graph.render_identifiers(&mut backend).unwrap());

        let (lx, ly) = pixel_of(&graph, left);
        let (rx, ry) = pixel_of(&graph, right);
        let (tx, ty) = pixel_of(&graph, top);
        assert!(lx < 400.0 && rx > 400.0);
        assert!(ty < 300.0);

        assert_eq!(graph.cast(lx, ly), Some(left));
        assert_eq!(graph.cast(rx + 2.0, ry - 2.0), Some(right));
        assert_eq!(graph.cast(tx, ty), Some(top));
        assert_eq!(graph.cast(700.0, 100.0), None);

        assert!(graph.track(left, lx, ly));
        assert!(!graph.track(left, rx, ry));
        assert!(!graph.track(right, rx + SPLAT + 2.0, ry));
    }

    #[test]
    fn test_out_of_bounds_positions_pick_nothing() {
        let Scene { mut graph, left, top, .. } = scene();
        let mut backend = HeadlessBackend::new(800, 600);
        graph.render(&mut backend).unwrap();
        graph.render_identifiers(&mut backend).unwrap();

        assert!(!graph.track(left, -5.0, -5.0));
        assert!(!graph.track(left, 800.0, 300.0));
        assert!(!graph.track(top, 10_000.0, 10_000.0));
        assert_eq!(graph.cast(-1.0, 300.0), None);
        assert_eq!(graph.cast(400.0, 600.0), None);
    }

    #[test]
    fn test_pruned_exact_frame_is_not_cast() {
        let Scene { mut graph, left, .. } = scene();
        let mut backend = HeadlessBackend::new(800, 600);
        graph.render_identifiers(&mut backend).unwrap();
        let (lx, ly) = pixel_of(&graph, left);

        let branch = graph.prune(left).unwrap();
        assert_eq!(graph.cast(lx, ly), None);

        graph.append(&branch).unwrap();
        assert_eq!(graph.cast(lx, ly), Some(left));
    }

    #[test]
    fn test_unpickable_exact_frame_is_left_out_of_identifier_pass() {
        let Scene { mut graph, left, right, .. } = scene();
        graph.unregister_pickable(right);
        let mut backend = HeadlessBackend::new(800, 600);
        assert!(graph.render_identifiers(&mut backend).unwrap());

        let (lx, ly) = pixel_of(&graph, left);
        let (rx, ry) = pixel_of(&graph, right);
        let buffer = graph.identifier_buffer().unwrap();
        assert!(buffer.decode(lx, ly).is_some());
        assert_eq!(buffer.decode(rx, ry), None);
        assert_eq!(graph.cast(rx, ry), None);
    }

    #[test]
    fn test_identifier_pass_only_draws_exact_frames() {
        let mut graph = Graph::new(&GraphConfig::new(800, 600)).unwrap();
        let identified = Rc::new(Cell::new(0));
        let displayed = Rc::new(Cell::new(0));
        for precision in [Precision::Exact, Precision::Bound, Precision::Adaptive] {
            let (identified, displayed) = (Rc::clone(&identified), Rc::clone(&displayed));
            graph
                .spawn(Frame::new().with_precision(precision).with_draw(move |ctx| match ctx.pass {
                    RenderPass::Identifier => {
                        assert!(ctx.identifier.is_some());
                        identified.set(identified.get() + 1);
                    }
                    RenderPass::Display => displayed.set(displayed.get() + 1),
                }))
                .unwrap();
        }

        let mut backend = HeadlessBackend::new(800, 600);
        graph.render(&mut backend).unwrap();
        graph.render_identifiers(&mut backend).unwrap();
        assert_eq!(displayed.get(), 3);
        assert_eq!(identified.get(), 1);
        assert_eq!(graph.model_view_depth(), 1);
    }

    #[test]
    fn test_display_only_backend_reports_no_exact_hits() {
        let Scene { mut graph, left, top, .. } = scene();
        let mut backend = HeadlessBackend::new(800, 600).without_identifier_target();
        graph.render(&mut backend).unwrap();
        assert!(!graph.render_identifiers(&mut backend).unwrap());
        assert!(!graph.render_identifiers(&mut backend).unwrap());
        assert!(graph
            .warnings()
            .was_emitted("Backend has no identifier target; exact picking will report no hits"));
        assert_eq!(graph.warnings().emitted_count(), 1);

        let (lx, ly) = pixel_of(&graph, left);
        assert_eq!(graph.cast(lx, ly), None);
        assert!(!graph.track(left, lx, ly));

        let (tx, ty) = pixel_of(&graph, top);
        assert_eq!(graph.cast(tx, ty), Some(top));
    }

    #[test]
    fn test_adaptive_frame_follows_its_scale() {
        let mut graph = Graph::new(&GraphConfig::new(800, 600)).unwrap();
        let small = graph.spawn(Frame::new().with_precision(Precision::Adaptive)).unwrap();
        let (cx, cy) = pixel_of(&graph, small);
        // One world unit is a few pixels wide at the default fit
        assert!(!graph.track(small, cx + 10.0, cy));

        graph.frame_mut(small).unwrap().set_scaling(Vec3::repeat(10.0));
        assert!(graph.track(small, cx + 10.0, cy));
    }

    #[test]
    fn test_refused_identifier_pass_drops_previous_buffer() {
        let Scene { mut graph, left, .. } = scene();
        let mut backend = HeadlessBackend::new(800, 600);
        assert!(graph.render_identifiers(&mut backend).unwrap());
        let (old_x, old_y) = pixel_of(&graph, left);
        assert_eq!(graph.cast(old_x, old_y), Some(left));

        graph.frame_mut(left).unwrap().set_translation(Vec3::new(0.0, -40.0, 0.0));
        let mut display_only = HeadlessBackend::new(800, 600).without_identifier_target();
        graph.render(&mut display_only).unwrap();
        assert!(!graph.render_identifiers(&mut display_only).unwrap());

        assert!(graph.identifier_buffer().is_none());
        assert_eq!(graph.cast(old_x, old_y), None);
        assert!(!graph.track(left, old_x, old_y));
    }

    #[test]
    fn test_resize_invalidates_identifier_buffer() {
        let Scene { mut graph, left, .. } = scene();
        let mut backend = HeadlessBackend::new(800, 600);
        assert!(graph.render_identifiers(&mut backend).unwrap());
        let stale = graph.identifier_buffer().cloned().unwrap();
        let (old_x, old_y) = pixel_of(&graph, left);

        graph.set_viewport(400, 300).unwrap();
        assert!(graph.identifier_buffer().is_none());
        let mut small = HeadlessBackend::new(400, 300);
        graph.render(&mut small).unwrap();
        let (new_x, new_y) = pixel_of(&graph, left);
        assert!(new_x < old_x);
        assert!(!graph.track(left, old_x, old_y));

        // A buffer of the old size is ignored even when installed by hand
        graph.set_identifier_buffer(Some(stale));
        assert_eq!(graph.cast(old_x, old_y), None);
        assert!(!graph.track(left, old_x, old_y));

        assert!(graph.render_identifiers(&mut small).unwrap());
        assert_eq!(graph.identifier_buffer().map(|buffer| (buffer.width(), buffer.height())), Some((400, 300)));
        assert!(graph.track(left, new_x, new_y));
        assert_eq!(graph.cast(new_x, new_y), Some(left));
    }

    #[test]
    fn test_same_size_viewport_keeps_identifier_buffer() {
        let Scene { mut graph, left, .. } = scene();
        let mut backend = HeadlessBackend::new(800, 600);
        graph.render_identifiers(&mut backend).unwrap();
        let (x, y) = pixel_of(&graph, left);

        graph.set_viewport(800, 600).unwrap();
        assert_eq!(graph.cast(x, y), Some(left));
    }
}
