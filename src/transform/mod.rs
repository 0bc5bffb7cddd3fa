//! Hierarchical scene transform subsystem.

pub use self::{
    components::{GlobalTransform, HierarchyEvent, Parent, ParentHierarchy, Shear, Transform},
    systems::TransformSystem,
};

pub mod components;
pub mod systems;
pub mod world;
