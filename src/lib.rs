//! Hierarchical scene transforms over a [`specs`] world.
//!
//! Scene nodes are entities. A [`Transform`] component holds a node's
//! position, rotation, non-uniform scale, pivot and shear relative to its
//! parent's space; a [`Parent`] component links it into the hierarchy. World
//! matrices can be queried on demand through [`transform::world`], or baked
//! once per frame into [`GlobalTransform`] by the dispatcher systems. The
//! baked matrix is what a render loop uploads as its model uniform.
//!
//! ```
//! use nalgebra::Vector3;
//! use scene_transform::{transform_bundle, GlobalTransform, Parent, Transform};
//! use specs::prelude::*;
//!
//! let mut world = World::new();
//! let mut dispatcher = transform_bundle(DispatcherBuilder::new()).build();
//! dispatcher.setup(&mut world.res);
//!
//! let parent = world
//!     .create_entity()
//!     .with(Transform::from(Vector3::new(1.0, 0.0, 0.0)))
//!     .build();
//! let child = world
//!     .create_entity()
//!     .with(Transform::from(Vector3::new(0.0, 1.0, 0.0)))
//!     .with(Parent::new(parent))
//!     .build();
//!
//! dispatcher.dispatch(&world.res);
//! world.maintain();
//!
//! let globals = world.read_storage::<GlobalTransform>();
//! assert!(globals.get(child).unwrap().is_finite());
//! ```

pub mod scene;
pub mod transform;

pub use crate::{
    scene::{SceneConfig, SceneNode},
    transform::{GlobalTransform, Parent, ParentHierarchy, Shear, Transform, TransformSystem},
};

use specs::prelude::DispatcherBuilder;
use specs_hierarchy::HierarchySystem;

/// Registers the hierarchy maintenance and transform baking systems, in that
/// order. Hierarchy maintenance must see parent changes before the transform
/// system walks the graph.
pub fn transform_bundle<'a, 'b>(builder: DispatcherBuilder<'a, 'b>) -> DispatcherBuilder<'a, 'b> {
    builder
        .with(
            HierarchySystem::<Parent>::new(),
            "parent_hierarchy_system",
            &[],
        )
        .with(
            TransformSystem::new(),
            "transform_system",
            &["parent_hierarchy_system"],
        )
}
