//! Parent linkage component.
use specs::prelude::{Component, DenseVecStorage, Entity, FlaggedStorage};

pub use specs_hierarchy::HierarchyEvent;

/// Attaches an entity to a parent entity. The child's `Transform` is then
/// expressed in the parent's local space.
///
/// An entity has at most one `Parent`; re-inserting replaces the link, and
/// removing the component detaches the child (it becomes a root). Nothing
/// here prevents a cycle through direct storage writes; use
/// [`set_parent`](crate::transform::world::set_parent) for a checked attach.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Parent {
    /// The parent entity.
    pub entity: Entity,
}

impl Parent {
    pub fn new(entity: Entity) -> Self {
        Parent { entity }
    }
}

impl Component for Parent {
    type Storage = FlaggedStorage<Self, DenseVecStorage<Self>>;
}

impl specs_hierarchy::Parent for Parent {
    fn parent_entity(&self) -> Entity {
        self.entity
    }
}

/// Hierarchy resource over [`Parent`] links. Maintained by
/// `HierarchySystem<Parent>`; provides child lists in insertion order and a
/// parents-before-children traversal order for the whole graph.
pub type ParentHierarchy = specs_hierarchy::Hierarchy<Parent>;
