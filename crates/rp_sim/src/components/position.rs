//! Pose storage: world position and heading.

use std::any::Any;

use crate::component::{keys, Component, ComponentKey, ComponentKind};
use crate::error::Result;
use crate::math::{heading_vector, Mat4, Quat, Vec3};
use crate::property::PropertyBag;
use crate::render::{RenderCtx, RenderFrame};

/// Where an entity is and which way it faces.
///
/// Movement happens on the x/y plane; `position.z` carries terrain height
/// and is left to whatever placed the entity there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionComponent {
    /// World position.
    pub position: Vec3,
    /// Facing in radians counter-clockwise from +x.
    pub heading: f32,
}

impl PositionComponent {
    /// World transform for rendering: heading rotation then translation.
    #[must_use]
    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(Quat::from_rotation_z(self.heading), self.position)
    }

    /// Unit vector of the current facing on the x/y plane.
    #[must_use]
    pub fn facing(&self) -> Vec3 {
        heading_vector(self.heading)
    }
}

impl Component for PositionComponent {
    fn key(&self) -> ComponentKey {
        keys::POSITION
    }

    fn apply_template(&mut self, props: &PropertyBag) -> Result<()> {
        if let Some(x) = props.f32("x")? {
            self.position.x = x;
        }
        if let Some(y) = props.f32("y")? {
            self.position.y = y;
        }
        if let Some(z) = props.f32("z")? {
            self.position.z = z;
        }
        if let Some(heading) = props.f32("heading")? {
            self.heading = heading;
        }
        Ok(())
    }

    fn collect_render(&self, ctx: &RenderCtx<'_>, frame: &mut RenderFrame) {
        frame.entries.push(crate::render::RenderEntry {
            id: ctx.id,
            kind: ctx.kind.to_owned(),
            transform: self.transform(),
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ComponentKind for PositionComponent {
    const KEY: ComponentKey = keys::POSITION;
    const NAME: &'static str = "position";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_properties() {
        let mut position = PositionComponent::default();
        let props = PropertyBag::new().with("x", 3.0).with("y", -1.0).with("heading", 0.5);
        position.apply_template(&props).unwrap();

        assert_eq!(position.position, Vec3::new(3.0, -1.0, 0.0));
        assert_eq!(position.heading, 0.5);
    }

    #[test]
    fn test_bad_property_type_errors() {
        let mut position = PositionComponent::default();
        let props = PropertyBag::new().with("x", "far away");
        assert!(position.apply_template(&props).is_err());
    }

    #[test]
    fn test_transform_places_translation() {
        let position = PositionComponent {
            position: Vec3::new(1.0, 2.0, 3.0),
            heading: 0.0,
        };
        let translation = position.transform().w_axis;
        assert_eq!(
            (translation.x, translation.y, translation.z),
            (1.0, 2.0, 3.0)
        );
    }
}
