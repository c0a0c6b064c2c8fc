//! End-to-end movement and combat scenarios against the public API.

use std::rc::Rc;

use rp_sim::prelude::*;
use rp_test_utils::fixtures::{approx, runner_sim, standard_sim};
use rp_test_utils::pathfinders::ManualPathfinder;

#[test]
fn runner_reaches_goal_in_two_ticks() {
    // speed 5, goal 10 units away, dt 1.0: x advances 5 units per tick,
    // arriving on the second tick with the goal cleared afterwards.
    let mut sim = runner_sim(Rc::new(ImmediatePathfinder::default()));
    let id = sim
        .manager_mut()
        .create_entity("runner", &PropertyBag::new())
        .unwrap();
    sim.manager()
        .order_move(id, Vec3::new(10.0, 0.0, 0.0))
        .unwrap();

    let x_at = |sim: &Simulation| {
        sim.manager()
            .entity(id)
            .unwrap()
            .component::<PositionComponent>()
            .unwrap()
            .position
            .x
    };

    let mut previous = 0.0;
    for _ in 0..2 {
        sim.tick(1.0);
        let x = x_at(&sim);
        assert!(x > previous, "x strictly increases while moving");
        assert!(x <= 10.0 + 1e-4, "never overshoots the goal");
        previous = x;
    }
    assert!(approx(x_at(&sim), 10.0));

    // Goal cleared: further ticks do not move the entity.
    let entity = sim.manager().entity(id).unwrap();
    assert!(entity.component::<MoveableComponent>().unwrap().goal().is_none());
    drop(entity);

    sim.tick(1.0);
    assert!(approx(x_at(&sim), 10.0));
}

#[test]
fn monotonic_approach_without_avoidance() {
    let mut sim = runner_sim(Rc::new(ImmediatePathfinder::default()));
    let id = sim
        .manager_mut()
        .create_entity("runner", &PropertyBag::new())
        .unwrap();
    let goal = Vec3::new(7.0, 4.0, 0.0);
    sim.manager().order_move(id, goal).unwrap();

    let mut last_distance = f32::INFINITY;
    for _ in 0..40 {
        sim.tick(0.25);
        let entity = sim.manager().entity(id).unwrap();
        let position = entity.component::<PositionComponent>().unwrap().position;
        let moving = entity
            .component::<MoveableComponent>()
            .unwrap()
            .goal()
            .is_some();
        let distance = rp_sim::math::flat_distance(position, goal);
        if moving {
            assert!(distance < last_distance, "approach is monotonic");
        }
        last_distance = distance;
    }
    assert!(last_distance <= 0.1 + 1e-4, "goal reached");
}

#[test]
fn second_set_goal_wins_over_first() {
    let control = ManualPathfinder::new();
    let mut sim = standard_sim(Rc::clone(&control) as Rc<dyn Pathfinder>);
    let id = sim
        .manager_mut()
        .create_entity("scout", &PropertyBag::new())
        .unwrap();

    let first_goal = Vec3::new(20.5, 0.5, 0.0);
    let second_goal = Vec3::new(0.5, 20.5, 0.0);
    sim.manager().order_move(id, first_goal).unwrap();
    sim.manager().order_move(id, second_goal).unwrap();
    assert_eq!(control.pending_count(), 2);

    // The first (superseded) request completes late; its delivery must be
    // a no-op.
    control.resolve_oldest_direct();
    sim.tick(0.1);
    {
        let entity = sim.manager().entity(id).unwrap();
        let pathing = entity.component::<PathingComponent>().unwrap();
        assert_eq!(pathing.state(), PathingState::Requested);
        assert!(!pathing.is_following_path());
    }

    // The current request completes and is applied.
    control.resolve_oldest_direct();
    sim.tick(0.1);
    {
        let entity = sim.manager().entity(id).unwrap();
        let pathing = entity.component::<PathingComponent>().unwrap();
        assert_eq!(pathing.state(), PathingState::Following);
        assert_eq!(*pathing.path().last().unwrap(), second_goal);
    }
}

#[test]
fn unreachable_goal_reports_failure_and_recovers() {
    let control = ManualPathfinder::new();
    let mut sim = standard_sim(Rc::clone(&control) as Rc<dyn Pathfinder>);
    let id = sim
        .manager_mut()
        .create_entity("scout", &PropertyBag::new())
        .unwrap();

    sim.manager()
        .order_move(id, Vec3::new(50.0, 50.0, 0.0))
        .unwrap();
    control.resolve_oldest(PathOutcome::Unreachable);
    sim.tick(0.1);

    {
        let entity = sim.manager().entity(id).unwrap();
        let pathing = entity.component::<PathingComponent>().unwrap();
        assert_eq!(pathing.state(), PathingState::Idle);
        assert!(pathing.last_request_failed());
        // No movement happened.
        let position = entity.component::<PositionComponent>().unwrap().position;
        assert_eq!(position, Vec3::ZERO);
    }

    // A retry can succeed.
    sim.manager()
        .order_move(id, Vec3::new(3.5, 0.5, 0.0))
        .unwrap();
    control.resolve_oldest_direct();
    sim.tick(0.1);
    let entity = sim.manager().entity(id).unwrap();
    assert_eq!(
        entity.component::<PathingComponent>().unwrap().state(),
        PathingState::Following
    );
}

#[test]
fn path_following_walks_waypoints_to_arrival() {
    let mut sim = standard_sim(Rc::new(ImmediatePathfinder::new(NavGrid::new(
        32, 32, 1.0,
    ))));
    let id = sim
        .manager_mut()
        .create_entity(
            "scout",
            &PropertyBag::new().with("x", 0.5).with("y", 0.5),
        )
        .unwrap();

    sim.manager()
        .order_move(id, Vec3::new(12.5, 0.5, 0.0))
        .unwrap();

    for _ in 0..200 {
        sim.tick(0.05);
        let entity = sim.manager().entity(id).unwrap();
        let state = entity.component::<PathingComponent>().unwrap().state();
        if state == PathingState::Arrived {
            break;
        }
    }

    let entity = sim.manager().entity(id).unwrap();
    assert_eq!(
        entity.component::<PathingComponent>().unwrap().state(),
        PathingState::Arrived
    );
    let position = entity.component::<PositionComponent>().unwrap().position;
    assert!(rp_sim::math::flat_distance(position, Vec3::new(12.5, 0.5, 0.0)) <= 0.2);
}

#[test]
fn turret_kills_crate_in_range() {
    let mut sim = standard_sim(Rc::new(ImmediatePathfinder::default()));
    let turret = sim
        .manager_mut()
        .create_entity("turret", &PropertyBag::new())
        .unwrap();
    // 20 health, 10 damage per shot at 1.5s cooldown: two shots needed.
    let target = sim
        .manager_mut()
        .create_entity("crate", &PropertyBag::new().with("x", 3.0))
        .unwrap();

    sim.manager()
        .entity(turret)
        .unwrap()
        .component_mut::<WeaponComponent>()
        .unwrap()
        .set_target(target);

    sim.tick(0.1); // first shot fires and lands in this tick's drain
    assert_eq!(
        sim.manager().entity(target).unwrap().attribute("health"),
        Some(PropertyValue::Int(10))
    );

    // Cooling down: no second shot yet.
    sim.tick(0.1);
    assert_eq!(
        sim.manager().entity(target).unwrap().attribute("health"),
        Some(PropertyValue::Int(10))
    );

    // Ride past the cooldown; the second shot destroys the crate.
    for _ in 0..20 {
        sim.tick(0.1);
    }
    assert!(sim.manager().entity(target).is_none());

    // The weapon clears its dead target instead of erroring.
    sim.tick(0.1);
    assert_eq!(
        sim.manager()
            .entity(turret)
            .unwrap()
            .component::<WeaponComponent>()
            .unwrap()
            .target(),
        None
    );
}

#[test]
fn out_of_range_target_is_not_fired_at() {
    let mut sim = standard_sim(Rc::new(ImmediatePathfinder::default()));
    let turret = sim
        .manager_mut()
        .create_entity("turret", &PropertyBag::new())
        .unwrap();
    let target = sim
        .manager_mut()
        .create_entity("crate", &PropertyBag::new().with("x", 30.0))
        .unwrap();

    sim.manager()
        .entity(turret)
        .unwrap()
        .component_mut::<WeaponComponent>()
        .unwrap()
        .set_target(target);

    for _ in 0..10 {
        sim.tick(0.1);
    }
    assert_eq!(
        sim.manager().entity(target).unwrap().attribute("health"),
        Some(PropertyValue::Int(20))
    );
}
