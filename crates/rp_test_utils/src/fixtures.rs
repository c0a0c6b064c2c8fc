//! Fixture builders and comparison helpers.

use std::rc::Rc;

use rp_sim::prelude::*;

/// Absolute tolerance used by [`approx`].
pub const APPROX_EPSILON: f32 = 1e-4;

/// Compare two floats within [`APPROX_EPSILON`].
#[must_use]
pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() <= APPROX_EPSILON
}

/// Compare two positions within [`APPROX_EPSILON`] per axis.
#[must_use]
pub fn approx_vec(a: Vec3, b: Vec3) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
}

/// A template with position and moveable components only: movement
/// orders steer straight at the goal without a path request.
#[must_use]
pub fn direct_mover_template(name: &str, speed: f64) -> EntityTemplate {
    EntityTemplate::new(name)
        .with_component(ComponentSpec::new("position"))
        .with_component(ComponentSpec::with_properties(
            "moveable",
            PropertyBag::new().with("speed", speed),
        ))
}

/// A simulation over the standard registry and templates with the given
/// pathfinder.
#[must_use]
pub fn standard_sim(pathfinder: Rc<dyn Pathfinder>) -> Simulation {
    Simulation::new(
        ComponentRegistry::standard(),
        TemplateLibrary::standard(),
        pathfinder,
    )
}

/// A simulation whose template library additionally contains the
/// direct-moving "runner" template (speed 5), matching the classic
/// two-ticks-to-goal scenario.
#[must_use]
pub fn runner_sim(pathfinder: Rc<dyn Pathfinder>) -> Simulation {
    let mut templates = TemplateLibrary::standard();
    templates
        .register(direct_mover_template("runner", 5.0))
        .expect("runner not in standard set");
    Simulation::new(ComponentRegistry::standard(), templates, pathfinder)
}
