//! Headless scene demo
//!
//! Builds a small solar system, runs a few draw cycles through the software
//! backend and picks frames at fixed screen positions. Pass a `.toml` or
//! `.ron` graph configuration as the first argument to override the defaults.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use frame_graph::prelude::*;

const CYCLES: usize = 5;

fn planet(distance: f32, size: f32, precision: Precision) -> Frame {
    Frame::new()
        .with_translation(Vec3::new(distance, 0.0, 0.0))
        .with_scaling(size)
        .with_precision(precision)
        .with_draw(|ctx| {
            if let Some(backend) = ctx.backend_as::<HeadlessBackend>() {
                backend.splat(&Point3::origin(), 5.0);
            }
        })
}

fn load_config() -> GraphConfig {
    let Some(path) = std::env::args().nth(1) else {
        return GraphConfig::new(800, 600);
    };
    match GraphConfig::load_from_file(&path) {
        Ok(config) => {
            log::info!("Loaded graph configuration from {path}");
            config
        }
        Err(err) => {
            log::warn!("Using default configuration, could not load {path}: {err}");
            GraphConfig::new(800, 600)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    frame_graph::foundation::logging::init(log::LevelFilter::Info);

    log::info!("Starting frame graph scene demo");

    let config = load_config().with_boundary_equations(true);
    let (width, height) = (config.width, config.height);
    let mut graph = Graph::new(&config)?;

    let sun = graph.spawn(planet(0.0, 4.0, Precision::Exact))?;
    let earth = graph.spawn_child(sun, planet(12.0, 0.5, Precision::Bound))?;
    let moon = graph.spawn_child(earth, planet(4.0, 0.5, Precision::Adaptive))?;
    log::info!("Spawned sun {sun:?}, earth {earth:?}, moon {moon:?}");

    // Orbit advances on the timing handler's clock, applied between cycles
    let angle = Rc::new(Cell::new(0.0_f32));
    let step = Rc::clone(&angle);
    graph
        .timing_mut()
        .register_task(Duration::ZERO, move || step.set(step.get() + 0.1));

    let mut backend = HeadlessBackend::new(width, height);
    for cycle in 0..CYCLES {
        if let Some(frame) = graph.frame_mut(sun) {
            frame.set_rotation(Quat::from_axis_angle(&Vec3::z_axis(), angle.get()));
        }
        graph.render(&mut backend)?;
        let earth_position = graph.world_position(earth).unwrap_or_else(Point3::origin);
        let visibility = graph.ball_visibility(&earth_position, 1.0);
        log::info!(
            "Cycle {cycle}: {} splats, earth is {visibility:?}",
            backend.display_splats()
        );
        backend.clear();
    }

    if !graph.render_identifiers(&mut backend)? {
        log::warn!("No identifier buffer was produced; exact frames cannot be picked");
    }

    for id in [sun, earth, moon] {
        let Some(position) = graph.world_position(id) else { continue };
        let Some(window) = graph.projected_coordinates_of(&position) else { continue };
        match graph.cast(window.x, window.y) {
            Some(hit) if hit == id => log::info!("Picked {hit:?} at ({:.1}, {:.1})", window.x, window.y),
            Some(hit) => log::info!("Expected {id:?} at ({:.1}, {:.1}), picked {hit:?}", window.x, window.y),
            None => log::info!("Nothing under ({:.1}, {:.1})", window.x, window.y),
        }
    }

    let origin = graph.unprojected_coordinates_of(&Vec3::new(width as f32 * 0.5, height as f32 * 0.5, 0.5));
    log::info!("Viewport center unprojects to {origin:?}");
    log::info!(
        "Ran {} cycles at {:.1} fps",
        graph.frame_count(),
        graph.timing().frame_rate()
    );
    Ok(())
}
