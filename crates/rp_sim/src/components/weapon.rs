//! Ranged weapon with a scheduler-armed cooldown.
//!
//! The target is held as an entity id and checked against the tick's
//! position snapshot before every shot, never as an owning reference, so
//! a target destroyed elsewhere simply clears. Damage is applied through
//! a deferred queue action rather than by touching the target mid-pass,
//! and the cooldown re-arms through a second queue entry.

use std::any::Any;

use crate::component::{keys, Component, ComponentKey, ComponentKind};
use crate::components::position::PositionComponent;
use crate::entity::EntityId;
use crate::error::Result;
use crate::manager::{EntityManager, UpdateCtx};
use crate::property::{PropertyBag, PropertyValue};

/// A direct-fire weapon.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponComponent {
    target: Option<EntityId>,
    /// Maximum firing range in world units.
    pub range: f32,
    /// Damage dealt per shot, subtracted from the target's `health`
    /// attribute.
    pub damage: i64,
    /// Seconds between shots.
    pub cooldown: f32,
    armed: bool,
}

impl Default for WeaponComponent {
    fn default() -> Self {
        Self {
            target: None,
            range: 5.0,
            damage: 10,
            cooldown: 1.0,
            armed: true,
        }
    }
}

impl WeaponComponent {
    /// Aim at an entity.
    pub fn set_target(&mut self, target: EntityId) {
        self.target = Some(target);
    }

    /// Stop attacking.
    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// The current target id, if any.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Whether the weapon is off cooldown.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Component for WeaponComponent {
    fn key(&self) -> ComponentKey {
        keys::WEAPON
    }

    fn apply_template(&mut self, props: &PropertyBag) -> Result<()> {
        if let Some(range) = props.f32("range")? {
            self.range = range;
        }
        if let Some(damage) = props.i64("damage")? {
            self.damage = damage;
        }
        if let Some(cooldown) = props.f32("cooldown")? {
            self.cooldown = cooldown;
        }
        Ok(())
    }

    fn initialize(&mut self, ctx: &crate::manager::InitCtx<'_>) {
        if !ctx.entity.has::<PositionComponent>() {
            tracing::warn!(
                entity = ctx.id,
                "weapon attached to an entity without a position; it will never fire"
            );
        }
    }

    fn update(&mut self, _dt: f32, ctx: &mut UpdateCtx<'_>) {
        let Some(target) = self.target else {
            return;
        };
        // Liveness check by id: a destroyed target clears silently.
        let Some(target_pos) = ctx.positions.get(target) else {
            self.target = None;
            return;
        };
        if !self.armed {
            return;
        }
        let Some(pose) = ctx.entity.component::<PositionComponent>() else {
            return;
        };
        if crate::math::flat_distance(pose.position, target_pos) > self.range {
            return;
        }

        self.armed = false;
        let damage = self.damage;
        let shooter = ctx.id;

        // Cross-entity mutation is deferred to the queue drain.
        ctx.queue.push(0.0, move |mgr, _| {
            apply_damage(mgr, target, damage);
        });
        ctx.queue.push(f64::from(self.cooldown), move |mgr, _| {
            if let Some(entity) = mgr.entity(shooter) {
                if let Some(mut weapon) = entity.component_mut::<WeaponComponent>() {
                    weapon.armed = true;
                }
            }
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ComponentKind for WeaponComponent {
    const KEY: ComponentKey = keys::WEAPON;
    const NAME: &'static str = "weapon";
}

/// Subtract `amount` from an entity's `health` attribute, destroying the
/// entity when it reaches zero. A dead id or an entity without health is
/// a no-op.
pub fn apply_damage(manager: &mut EntityManager, id: EntityId, amount: i64) {
    let remaining = {
        let Some(entity) = manager.entity(id) else {
            return;
        };
        let Some(health) = entity.attribute("health").and_then(|v| v.as_int()) else {
            return;
        };
        let remaining = health - amount;
        entity.set_attribute("health", PropertyValue::Int(remaining));
        remaining
    };

    if remaining <= 0 {
        let _ = manager.destroy_entity(id);
    }
}
