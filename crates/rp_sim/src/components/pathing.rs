//! Waypoint path following over the asynchronous path-find service.
//!
//! The component walks a four-state machine:
//!
//! ```text
//! Idle --set_goal--> Requested --found--> Following --last waypoint--> Arrived
//!                        |                    |
//!                     no route             set_goal
//!                        v                    v
//!                      Idle               Requested
//! ```
//!
//! Every `set_goal` bumps the component's request sequence number, so a
//! response for a superseded request fails the sequence check and is
//! dropped without effect.

use std::any::Any;

use crate::component::{keys, Component, ComponentKey, ComponentKind};
use crate::components::moveable::MoveableComponent;
use crate::components::position::PositionComponent;
use crate::entity::Entity;
use crate::manager::UpdateCtx;
use crate::math::Vec3;
use crate::pathfinder::{PathOutcome, PathRequest, Pathfinder};

/// Path-following phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathingState {
    /// No path and no request outstanding.
    #[default]
    Idle,
    /// A path request is in flight.
    Requested,
    /// Walking the installed path.
    Following,
    /// The final waypoint was reached.
    Arrived,
}

impl PathingState {
    /// Short lowercase name, used by the scripting bridge.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requested => "requested",
            Self::Following => "following",
            Self::Arrived => "arrived",
        }
    }
}

/// Drives the sibling moveable component along a computed path.
#[derive(Debug, Default)]
pub struct PathingComponent {
    state: PathingState,
    path: Vec<Vec3>,
    cursor: usize,
    seq: u64,
    last_failed: bool,
}

impl PathingComponent {
    /// Current phase.
    #[must_use]
    pub fn state(&self) -> PathingState {
        self.state
    }

    /// Whether a non-empty path is installed and not yet walked past its
    /// last waypoint.
    #[must_use]
    pub fn is_following_path(&self) -> bool {
        !self.path.is_empty() && self.cursor < self.path.len()
    }

    /// Whether the most recent request failed to find a route.
    #[must_use]
    pub fn last_request_failed(&self) -> bool {
        self.last_failed
    }

    /// The installed path, empty unless following or arrived.
    #[must_use]
    pub fn path(&self) -> &[Vec3] {
        &self.path
    }

    /// Request a path to `goal` from the entity's current position.
    ///
    /// Supersedes any in-flight request or active path: the sequence
    /// number advances, the current path is dropped, and the moveable
    /// component stops until the new path arrives.
    pub fn set_goal(&mut self, goal: Vec3, entity: &Entity, pathfinder: &dyn Pathfinder) {
        let Some(start) = entity
            .component::<PositionComponent>()
            .map(|pose| pose.position)
        else {
            tracing::warn!(
                entity = entity.id(),
                "pathing goal set on entity without position"
            );
            return;
        };

        self.seq += 1;
        self.path.clear();
        self.cursor = 0;
        self.last_failed = false;
        self.state = PathingState::Requested;

        if let Some(mut moveable) = entity.component_mut::<MoveableComponent>() {
            moveable.clear_goal();
        }

        pathfinder.request(PathRequest {
            entity: entity.id(),
            seq: self.seq,
            start,
            goal,
        });
    }

    /// Deliver a completed path request.
    ///
    /// Responses whose sequence does not match the component's current
    /// request are stale and ignored.
    pub(crate) fn on_path_result(&mut self, seq: u64, outcome: PathOutcome, entity: &Entity) {
        if seq != self.seq {
            tracing::debug!(entity = entity.id(), seq, "stale path response dropped");
            return;
        }

        match outcome {
            PathOutcome::Found(path) if !path.is_empty() => {
                self.path = path;
                self.cursor = 0;
                self.state = PathingState::Following;
                if let Some(mut moveable) = entity.component_mut::<MoveableComponent>() {
                    moveable.set_goal(self.path[0]);
                }
            }
            PathOutcome::Found(_) | PathOutcome::Unreachable => {
                self.state = PathingState::Idle;
                self.last_failed = true;
            }
        }
    }

    /// Advance to the next waypoint; marks arrival past the last one.
    fn advance(&mut self, entity: &Entity) {
        self.cursor += 1;
        if let Some(waypoint) = self.path.get(self.cursor) {
            if let Some(mut moveable) = entity.component_mut::<MoveableComponent>() {
                moveable.set_goal(*waypoint);
            }
        } else {
            self.state = PathingState::Arrived;
        }
    }
}

impl Component for PathingComponent {
    fn key(&self) -> ComponentKey {
        keys::PATHING
    }

    fn update(&mut self, _dt: f32, ctx: &mut UpdateCtx<'_>) {
        if self.state != PathingState::Following {
            return;
        }
        // The moveable clears its goal on arrival at the interim waypoint.
        let waypoint_reached = ctx
            .entity
            .component::<MoveableComponent>()
            .is_some_and(|moveable| moveable.goal().is_none());
        if waypoint_reached {
            self.advance(ctx.entity);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ComponentKind for PathingComponent {
    const KEY: ComponentKey = keys::PATHING;
    const NAME: &'static str = "pathing";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfinder::PathResponse;
    use std::cell::RefCell;

    /// Records requests; never answers on its own.
    #[derive(Default)]
    struct RecordingPathfinder {
        requests: RefCell<Vec<PathRequest>>,
    }

    impl Pathfinder for RecordingPathfinder {
        fn request(&self, request: PathRequest) {
            self.requests.borrow_mut().push(request);
        }

        fn poll(&self) -> Vec<PathResponse> {
            Vec::new()
        }
    }

    fn entity_with_movement() -> Entity {
        let mut entity = Entity::new(1, "scout");
        entity
            .attach("position", Box::<PositionComponent>::default())
            .unwrap();
        entity
            .attach("moveable", Box::<MoveableComponent>::default())
            .unwrap();
        entity
    }

    fn goal() -> Vec3 {
        Vec3::new(10.0, 0.0, 0.0)
    }

    #[test]
    fn test_set_goal_requests_and_enters_requested() {
        let entity = entity_with_movement();
        let service = RecordingPathfinder::default();
        let mut pathing = PathingComponent::default();

        pathing.set_goal(goal(), &entity, &service);

        assert_eq!(pathing.state(), PathingState::Requested);
        assert!(!pathing.is_following_path());
        let requests = service.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].seq, 1);
        assert_eq!(requests[0].goal, goal());
    }

    #[test]
    fn test_found_path_installs_and_sets_interim_goal() {
        let entity = entity_with_movement();
        let service = RecordingPathfinder::default();
        let mut pathing = PathingComponent::default();

        pathing.set_goal(goal(), &entity, &service);
        let waypoints = vec![Vec3::new(2.0, 0.0, 0.0), goal()];
        pathing.on_path_result(1, PathOutcome::Found(waypoints.clone()), &entity);

        assert_eq!(pathing.state(), PathingState::Following);
        assert!(pathing.is_following_path());
        let moveable = entity.component::<MoveableComponent>().unwrap();
        assert_eq!(moveable.goal(), Some(waypoints[0]));
    }

    #[test]
    fn test_stale_response_is_ignored() {
        let entity = entity_with_movement();
        let service = RecordingPathfinder::default();
        let mut pathing = PathingComponent::default();

        pathing.set_goal(goal(), &entity, &service);
        pathing.set_goal(Vec3::new(-5.0, 0.0, 0.0), &entity, &service);

        // Response for the first (superseded) request: dropped.
        pathing.on_path_result(1, PathOutcome::Found(vec![goal()]), &entity);
        assert_eq!(pathing.state(), PathingState::Requested);
        assert!(entity.component::<MoveableComponent>().unwrap().goal().is_none());

        // Response for the current request: applied.
        let fresh = vec![Vec3::new(-5.0, 0.0, 0.0)];
        pathing.on_path_result(2, PathOutcome::Found(fresh.clone()), &entity);
        assert_eq!(pathing.state(), PathingState::Following);
        assert_eq!(
            entity.component::<MoveableComponent>().unwrap().goal(),
            Some(fresh[0])
        );
    }

    #[test]
    fn test_failure_returns_to_idle() {
        let entity = entity_with_movement();
        let service = RecordingPathfinder::default();
        let mut pathing = PathingComponent::default();

        pathing.set_goal(goal(), &entity, &service);
        pathing.on_path_result(1, PathOutcome::Unreachable, &entity);

        assert_eq!(pathing.state(), PathingState::Idle);
        assert!(pathing.last_request_failed());
        assert!(!pathing.is_following_path());
    }

    #[test]
    fn test_empty_path_counts_as_failure() {
        let entity = entity_with_movement();
        let service = RecordingPathfinder::default();
        let mut pathing = PathingComponent::default();

        pathing.set_goal(goal(), &entity, &service);
        pathing.on_path_result(1, PathOutcome::Found(Vec::new()), &entity);

        assert_eq!(pathing.state(), PathingState::Idle);
        assert!(pathing.last_request_failed());
    }

    #[test]
    fn test_new_goal_supersedes_active_path() {
        let entity = entity_with_movement();
        let service = RecordingPathfinder::default();
        let mut pathing = PathingComponent::default();

        pathing.set_goal(goal(), &entity, &service);
        pathing.on_path_result(1, PathOutcome::Found(vec![goal()]), &entity);
        assert_eq!(pathing.state(), PathingState::Following);

        pathing.set_goal(Vec3::new(0.0, 9.0, 0.0), &entity, &service);
        assert_eq!(pathing.state(), PathingState::Requested);
        assert!(!pathing.is_following_path());
        assert!(entity.component::<MoveableComponent>().unwrap().goal().is_none());
    }
}
