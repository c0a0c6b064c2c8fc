//! Built-in components.
//!
//! Framework band: [`PositionComponent`], [`MoveableComponent`],
//! [`PathingComponent`]. Game band: [`WeaponComponent`].

pub mod moveable;
pub mod pathing;
pub mod position;
pub mod weapon;

pub use moveable::MoveableComponent;
pub use pathing::{PathingComponent, PathingState};
pub use position::PositionComponent;
pub use weapon::WeaponComponent;
