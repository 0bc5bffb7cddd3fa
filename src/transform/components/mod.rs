//! Components for the transform processor.

pub use self::{
    parent::{HierarchyEvent, Parent, ParentHierarchy},
    transform::{GlobalTransform, Shear, Transform},
};

mod parent;
mod transform;

pub(crate) use self::transform::scaling_about;
