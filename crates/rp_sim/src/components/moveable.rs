//! Goal-seeking steering with turn-rate limiting and obstacle avoidance.

use std::any::Any;

use crate::component::{keys, Component, ComponentKey, ComponentKind};
use crate::components::position::PositionComponent;
use crate::error::Result;
use crate::manager::UpdateCtx;
use crate::math::{heading_between, heading_vector, turn_toward, Vec3};
use crate::property::PropertyBag;

/// Distance at which a goal counts as reached.
pub const ARRIVE_EPSILON: f32 = 0.1;

/// Relative weight of the avoidance vector against the seek vector.
const AVOID_WEIGHT: f32 = 1.5;

/// Steers the sibling position component toward a goal.
///
/// Each tick the desired heading toward the goal is blended with the
/// current heading under a turn-rate limit, optionally biased away from
/// nearby entities, and the position advances along the resulting heading
/// without overshooting the goal. Arrival clears the goal.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveableComponent {
    goal: Option<Vec3>,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Maximum turn rate in radians per second.
    pub turn_speed: f32,
    /// Steer away from nearby entities while seeking.
    pub avoid_collisions: bool,
    /// Radius within which other entities repel this one.
    pub avoid_radius: f32,
}

impl Default for MoveableComponent {
    fn default() -> Self {
        Self {
            goal: None,
            speed: 4.0,
            turn_speed: std::f32::consts::TAU,
            avoid_collisions: false,
            avoid_radius: 2.0,
        }
    }
}

impl MoveableComponent {
    /// Set the goal position to steer toward.
    pub fn set_goal(&mut self, goal: Vec3) {
        self.goal = Some(goal);
    }

    /// Stop seeking.
    pub fn clear_goal(&mut self) {
        self.goal = None;
    }

    /// The current goal, `None` once reached or never set.
    #[must_use]
    pub fn goal(&self) -> Option<Vec3> {
        self.goal
    }

    /// Repulsion vector away from entities within `avoid_radius`, with
    /// weight rising as distance shrinks. Zero when nothing is close.
    fn avoidance(&self, position: Vec3, ctx: &UpdateCtx<'_>) -> Vec3 {
        let mut push = Vec3::ZERO;
        for (_, other) in ctx.positions.nearby(position, self.avoid_radius, ctx.id) {
            let away = Vec3::new(position.x - other.x, position.y - other.y, 0.0);
            let distance = away.length();
            if distance <= f32::EPSILON {
                continue;
            }
            let weight = (self.avoid_radius - distance) / self.avoid_radius;
            push += (away / distance) * weight;
        }
        push
    }
}

impl Component for MoveableComponent {
    fn key(&self) -> ComponentKey {
        keys::MOVEABLE
    }

    fn apply_template(&mut self, props: &PropertyBag) -> Result<()> {
        if let Some(speed) = props.f32("speed")? {
            self.speed = speed;
        }
        if let Some(turn_speed) = props.f32("turn_speed")? {
            self.turn_speed = turn_speed;
        }
        if let Some(avoid) = props.bool("avoid_collisions")? {
            self.avoid_collisions = avoid;
        }
        if let Some(radius) = props.f32("avoid_radius")? {
            self.avoid_radius = radius;
        }
        Ok(())
    }

    fn update(&mut self, dt: f32, ctx: &mut UpdateCtx<'_>) {
        let Some(goal) = self.goal else {
            return;
        };
        let Some(mut pose) = ctx.entity.component_mut::<PositionComponent>() else {
            return;
        };

        let distance = crate::math::flat_distance(pose.position, goal);
        if distance <= ARRIVE_EPSILON {
            self.goal = None;
            return;
        }

        // Seek direction, optionally biased away from nearby obstacles.
        let mut steer = heading_vector(heading_between(pose.position, goal));
        if self.avoid_collisions {
            steer += self.avoidance(pose.position, ctx) * AVOID_WEIGHT;
        }
        let desired = if steer.length() <= f32::EPSILON {
            heading_between(pose.position, goal)
        } else {
            steer.y.atan2(steer.x)
        };

        let heading = turn_toward(pose.heading, desired, self.turn_speed * dt);
        pose.heading = heading;

        // Never overshoot the goal.
        let step = (self.speed * dt).min(distance);
        pose.position += heading_vector(heading) * step;

        if crate::math::flat_distance(pose.position, goal) <= ARRIVE_EPSILON {
            self.goal = None;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ComponentKind for MoveableComponent {
    const KEY: ComponentKey = keys::MOVEABLE;
    const NAME: &'static str = "moveable";
}
