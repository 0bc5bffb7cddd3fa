//! End-to-end tests driving a full world: hierarchy maintenance, the baking
//! system, and the on-demand world-space queries.

use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector2, Vector3};
use scene_transform::transform::world;
use scene_transform::{transform_bundle, GlobalTransform, Parent, SceneConfig, Transform};
use specs::prelude::*;

const EPSILON: f32 = 1e-5;

fn approx_eq_point(a: Point3<f32>, b: Point3<f32>) -> bool {
    (a - b).iter().all(|d| d.abs() < EPSILON)
}

fn approx_eq_vec(a: Vector3<f32>, b: Vector3<f32>) -> bool {
    (a - b).iter().all(|d| d.abs() < EPSILON)
}

fn approx_eq_mat(a: &Matrix4<f32>, b: &Matrix4<f32>) -> bool {
    (a - b).iter().all(|d| d.abs() < EPSILON)
}

fn setup() -> (World, Dispatcher<'static, 'static>) {
    let _ = env_logger::try_init();
    let mut world = World::new();
    let mut dispatcher = transform_bundle(DispatcherBuilder::new()).build();
    dispatcher.setup(&mut world.res);
    (world, dispatcher)
}

fn step(world: &mut World, dispatcher: &mut Dispatcher<'static, 'static>) {
    dispatcher.dispatch(&world.res);
    world.maintain();
}

fn global(world: &World, entity: Entity) -> Matrix4<f32> {
    world
        .read_storage::<GlobalTransform>()
        .get(entity)
        .expect("no global transform")
        .0
}

#[test]
fn default_root_bakes_identity() {
    let (mut world, mut dispatcher) = setup();
    let entity = world.create_entity().with(Transform::default()).build();
    step(&mut world, &mut dispatcher);

    assert!(approx_eq_mat(&global(&world, entity), &Matrix4::identity()));
}

#[test]
fn scale_accumulates_per_axis_through_the_chain() {
    let (mut world, mut dispatcher) = setup();

    let mut parent_local = Transform::default();
    parent_local.scale = Vector3::new(2.0, 1.0, 1.0);
    let mut child_local = Transform::default();
    child_local.scale = Vector3::new(3.0, 1.0, 1.0);

    let parent = world.create_entity().with(parent_local).build();
    let child = world
        .create_entity()
        .with(child_local)
        .with(Parent::new(parent))
        .build();
    step(&mut world, &mut dispatcher);

    let p = global(&world, child).transform_point(&Point3::new(1.0, 0.0, 0.0));
    assert!(approx_eq_point(p, Point3::new(6.0, 0.0, 0.0)), "{:?}", p);

    let transforms = world.read_storage::<Transform>();
    let parents = world.read_storage::<Parent>();
    let on_demand = world::world_matrix(child, &transforms, &parents);
    assert!(approx_eq_mat(&global(&world, child), &on_demand));
}

#[test]
fn baked_matrices_match_on_demand_queries() {
    let (mut world, mut dispatcher) = setup();

    let mut root_local = Transform::new(
        Vector3::new(1.0, 2.0, 3.0),
        UnitQuaternion::from_euler_angles(0.0, 0.7, 0.0),
        Vector3::new(2.0, 1.0, 1.0),
    );
    root_local.pivot = Vector3::new(0.5, 0.0, 0.0);

    let mid_local = Transform::new(
        Vector3::new(0.0, -1.0, 0.0),
        UnitQuaternion::from_euler_angles(0.3, 0.0, 0.0),
        Vector3::new(1.0, 1.5, 1.0),
    );

    let mut leaf_local = Transform::from(Vector3::new(0.0, 0.0, 2.0));
    leaf_local.shear.x = Vector2::new(0.25, 0.0);

    let root = world.create_entity().with(root_local).build();
    let mid = world
        .create_entity()
        .with(mid_local)
        .with(Parent::new(root))
        .build();
    let leaf = world
        .create_entity()
        .with(leaf_local)
        .with(Parent::new(mid))
        .build();
    step(&mut world, &mut dispatcher);

    let transforms = world.read_storage::<Transform>();
    let parents = world.read_storage::<Parent>();
    for &entity in &[root, mid, leaf] {
        let on_demand = world::world_matrix(entity, &transforms, &parents);
        assert!(
            approx_eq_mat(&global(&world, entity), &on_demand),
            "baked and on-demand matrices diverge for {:?}",
            entity
        );
    }
}

#[test]
fn world_position_folds_three_levels() {
    let (mut world, mut dispatcher) = setup();

    let grandparent = world
        .create_entity()
        .with(Transform::from(Vector3::new(1.0, 0.0, 0.0)))
        .build();
    let parent = world
        .create_entity()
        .with(Transform::from(Vector3::new(0.0, 1.0, 0.0)))
        .with(Parent::new(grandparent))
        .build();
    let child = world
        .create_entity()
        .with(Transform::from(Vector3::new(0.0, 0.0, 1.0)))
        .with(Parent::new(parent))
        .build();
    step(&mut world, &mut dispatcher);

    let transforms = world.read_storage::<Transform>();
    let parents = world.read_storage::<Parent>();
    let position = world::world_position(child, &transforms, &parents);
    assert!(approx_eq_vec(position, Vector3::new(1.0, 1.0, 1.0)), "{:?}", position);
}

#[test]
fn world_position_of_root_is_local_position() {
    let (mut world, _) = setup();
    let entity = world
        .create_entity()
        .with(Transform::from(Vector3::new(4.0, 5.0, 6.0)))
        .build();

    let transforms = world.read_storage::<Transform>();
    let parents = world.read_storage::<Parent>();
    assert_eq!(
        world::world_position(entity, &transforms, &parents),
        Vector3::new(4.0, 5.0, 6.0)
    );
}

#[test]
fn world_position_ignores_pivot_and_shear() {
    // Position queries skip pivots and shear by contract, so they disagree
    // with the full matrix whenever either is in play.
    let (mut world, mut dispatcher) = setup();

    let mut parent_local = Transform::default();
    parent_local.pivot = Vector3::new(1.0, 0.0, 0.0);
    parent_local.rotation =
        UnitQuaternion::from_euler_angles(0.0, 0.0, std::f32::consts::FRAC_PI_2);
    parent_local.shear.x = Vector2::new(0.5, 0.0);

    let parent = world.create_entity().with(parent_local).build();
    let child = world
        .create_entity()
        .with(Transform::default())
        .with(Parent::new(parent))
        .build();
    step(&mut world, &mut dispatcher);

    let transforms = world.read_storage::<Transform>();
    let parents = world.read_storage::<Parent>();

    let position = world::world_position(child, &transforms, &parents);
    assert!(approx_eq_vec(position, Vector3::new(0.0, 0.0, 0.0)));

    let matrix_origin = world::world_matrix(child, &transforms, &parents)
        .transform_point(&Point3::new(0.0, 0.0, 0.0));
    assert!(
        approx_eq_point(matrix_origin, Point3::new(1.0, -1.0, 0.0)),
        "{:?}",
        matrix_origin
    );
}

#[test]
fn set_world_rotation_round_trips() {
    let (mut world, mut dispatcher) = setup();

    let grandparent = world
        .create_entity()
        .with(Transform::new(
            Vector3::new(0.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(0.4, -0.2, 1.1),
            Vector3::new(1.0, 1.0, 1.0),
        ))
        .build();
    let parent = world
        .create_entity()
        .with(Transform::new(
            Vector3::new(1.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(-0.9, 0.3, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
        ))
        .with(Parent::new(grandparent))
        .build();
    let child = world
        .create_entity()
        .with(Transform::default())
        .with(Parent::new(parent))
        .build();
    step(&mut world, &mut dispatcher);

    let target = UnitQuaternion::from_euler_angles(0.25, 1.3, -0.6);
    {
        let mut transforms = world.write_storage::<Transform>();
        let parents = world.read_storage::<Parent>();
        world::set_world_rotation(child, target, &mut transforms, &parents);
    }

    let transforms = world.read_storage::<Transform>();
    let parents = world.read_storage::<Parent>();
    let achieved = world::world_rotation(child, &transforms, &parents);
    assert!(
        achieved.angle_to(&target) < EPSILON,
        "off by {} rad",
        achieved.angle_to(&target)
    );
}

#[test]
fn set_parent_rejects_self_and_cycles() {
    let (mut world, _) = setup();

    let a = world.create_entity().with(Transform::default()).build();
    let b = world.create_entity().with(Transform::default()).build();
    let c = world.create_entity().with(Transform::default()).build();

    let mut parents = world.write_storage::<Parent>();
    assert!(world::set_parent(a, a, &mut parents).is_err());

    world::set_parent(b, a, &mut parents).unwrap();
    world::set_parent(c, b, &mut parents).unwrap();
    // a -> b -> c is established; closing the loop must fail.
    assert!(world::set_parent(a, c, &mut parents).is_err());
    assert!(parents.get(a).is_none());
}

#[test]
fn detached_child_becomes_a_root() {
    let (mut world, mut dispatcher) = setup();

    let parent = world
        .create_entity()
        .with(Transform::from(Vector3::new(10.0, 0.0, 0.0)))
        .build();
    let child = world
        .create_entity()
        .with(Transform::from(Vector3::new(0.0, 5.0, 0.0)))
        .with(Parent::new(parent))
        .build();
    step(&mut world, &mut dispatcher);

    let attached = global(&world, child).transform_point(&Point3::new(0.0, 0.0, 0.0));
    assert!(approx_eq_point(attached, Point3::new(10.0, 5.0, 0.0)));

    {
        let mut parents = world.write_storage::<Parent>();
        world::clear_parent(child, &mut parents);
    }
    step(&mut world, &mut dispatcher);

    let detached = global(&world, child).transform_point(&Point3::new(0.0, 0.0, 0.0));
    assert!(approx_eq_point(detached, Point3::new(0.0, 5.0, 0.0)), "{:?}", detached);
}

#[test]
fn orphaned_child_survives_parent_deletion() {
    let (mut world, mut dispatcher) = setup();

    let parent = world
        .create_entity()
        .with(Transform::from(Vector3::new(10.0, 0.0, 0.0)))
        .build();
    let child = world
        .create_entity()
        .with(Transform::from(Vector3::new(0.0, 5.0, 0.0)))
        .with(Parent::new(parent))
        .build();
    step(&mut world, &mut dispatcher);

    world.delete_entity(parent).unwrap();
    world.maintain();
    step(&mut world, &mut dispatcher);

    assert!(world.is_alive(child));
    assert!(world.read_storage::<Parent>().get(child).is_none());

    let rerooted = global(&world, child).transform_point(&Point3::new(0.0, 0.0, 0.0));
    assert!(approx_eq_point(rerooted, Point3::new(0.0, 5.0, 0.0)), "{:?}", rerooted);
}

#[test]
fn baked_matrices_follow_mutation() {
    let (mut world, mut dispatcher) = setup();

    let parent = world
        .create_entity()
        .with(Transform::from(Vector3::new(1.0, 0.0, 0.0)))
        .build();
    let child = world
        .create_entity()
        .with(Transform::from(Vector3::new(0.0, 1.0, 0.0)))
        .with(Parent::new(parent))
        .build();
    step(&mut world, &mut dispatcher);

    {
        let mut transforms = world.write_storage::<Transform>();
        transforms.get_mut(parent).unwrap().position = Vector3::new(-1.0, 0.0, 0.0);
    }
    step(&mut world, &mut dispatcher);

    let p = global(&world, child).transform_point(&Point3::new(0.0, 0.0, 0.0));
    assert!(approx_eq_point(p, Point3::new(-1.0, 1.0, 0.0)), "{:?}", p);
}

#[test]
fn scene_config_loads_and_bakes() {
    let (mut world, mut dispatcher) = setup();

    let config = SceneConfig::from_str(
        "(
            nodes: [
                (transform: (translation: (1.0, 0.0, 0.0)), parent: None),
                (transform: (translation: (0.0, 1.0, 0.0)), parent: Some(0)),
                (transform: (translation: (0.0, 0.0, 1.0)), parent: Some(1)),
            ],
        )",
    )
    .unwrap();
    let entities = config.load(&mut world).unwrap();
    step(&mut world, &mut dispatcher);

    let leaf = global(&world, entities[2]).transform_point(&Point3::new(0.0, 0.0, 0.0));
    assert!(approx_eq_point(leaf, Point3::new(1.0, 1.0, 1.0)), "{:?}", leaf);
}
