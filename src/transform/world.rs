//! World-space queries over the transform hierarchy.
//!
//! Everything here walks the ancestor chain through the component storages on
//! demand and recomputes from scratch; the cached per-frame path is
//! [`TransformSystem`](crate::transform::TransformSystem), which bakes the
//! same composition into `GlobalTransform`.

use failure::Fail;
use nalgebra::{self as na, Matrix4, UnitQuaternion, Vector3};
use specs::prelude::{Entity, WriteStorage};
use specs::storage::GenericReadStorage;

use crate::transform::components::{scaling_about, Parent, Transform};

/// Rejected parent attachment.
#[derive(Debug, Fail)]
pub enum HierarchyError {
    #[fail(display = "entity {:?} cannot be its own parent", entity)]
    SelfParent { entity: Entity },
    #[fail(
        display = "attaching {:?} under {:?} would close a cycle",
        child, parent
    )]
    Cycle { child: Entity, parent: Entity },
}

/// Composes the entity's local transform with every ancestor's, mapping the
/// entity's local coordinates into root space.
///
/// Ancestors contribute only their raw (translation + pivot-rotation)
/// matrices to the product; their per-axis scales are accumulated separately
/// and applied once, about this entity's own pivot, after the chain is folded
/// in. Multiplying full ancestor matrices instead would let off-axis scale
/// combined with rotation bleed spurious shear across hierarchy levels. The
/// entity's own shear is applied innermost; ancestor shear does not propagate.
pub fn world_matrix<T, P>(entity: Entity, transforms: &T, parents: &P) -> Matrix4<f32>
where
    T: GenericReadStorage<Component = Transform>,
    P: GenericReadStorage<Component = Parent>,
{
    let transform = match transforms.get(entity) {
        Some(transform) => transform,
        None => return na::one(),
    };

    let mut world = transform.matrix_raw();
    let mut world_scale = transform.scale;

    let mut ancestor = parents.get(entity).map(|p| p.entity);
    while let Some(current) = ancestor {
        if let Some(t) = transforms.get(current) {
            world = t.matrix_raw() * world;
            world_scale = t.scale.component_mul(&world_scale);
        }
        ancestor = parents.get(current).map(|p| p.entity);
    }

    world * scaling_about(&transform.pivot, &world_scale) * transform.shear.matrix()
}

/// Projects the entity's local position through each ancestor's scale,
/// rotation and translation in turn.
///
/// Narrower contract than [`world_matrix`]: pivots and shear are ignored
/// everywhere along the chain. A position query is about where the node
/// origin sits, not how its space is distorted.
pub fn world_position<T, P>(entity: Entity, transforms: &T, parents: &P) -> Vector3<f32>
where
    T: GenericReadStorage<Component = Transform>,
    P: GenericReadStorage<Component = Parent>,
{
    let mut position = match transforms.get(entity) {
        Some(transform) => transform.position,
        None => return na::zero(),
    };

    let mut ancestor = parents.get(entity).map(|p| p.entity);
    while let Some(current) = ancestor {
        if let Some(t) = transforms.get(current) {
            position = t.scale.component_mul(&position);
            position = t.rotation * position;
            position += t.position;
        }
        ancestor = parents.get(current).map(|p| p.entity);
    }

    position
}

/// Accumulated rotation of the entity's ancestor chain, closest ancestor
/// folded in first.
pub fn world_rotation<T, P>(entity: Entity, transforms: &T, parents: &P) -> UnitQuaternion<f32>
where
    T: GenericReadStorage<Component = Transform>,
    P: GenericReadStorage<Component = Parent>,
{
    let mut rotation = match transforms.get(entity) {
        Some(transform) => transform.rotation,
        None => return UnitQuaternion::identity(),
    };

    let mut ancestor = parents.get(entity).map(|p| p.entity);
    while let Some(current) = ancestor {
        if let Some(t) = transforms.get(current) {
            rotation = t.rotation * rotation;
        }
        ancestor = parents.get(current).map(|p| p.entity);
    }

    rotation
}

/// Sets the entity's local rotation such that its world rotation becomes
/// `rotation`: the parent chain's world rotation is inverted and folded into
/// the target. With no parent the target is taken as-is.
pub fn set_world_rotation<P>(
    entity: Entity,
    rotation: UnitQuaternion<f32>,
    transforms: &mut WriteStorage<'_, Transform>,
    parents: &P,
) where
    P: GenericReadStorage<Component = Parent>,
{
    let local = match parents.get(entity) {
        Some(parent) => world_rotation(parent.entity, &*transforms, parents).inverse() * rotation,
        None => rotation,
    };
    if let Some(transform) = transforms.get_mut(entity) {
        transform.rotation = local;
    }
}

/// Attaches `child` under `parent`, replacing any existing link.
///
/// Self-parenting and attachments that would close a cycle are rejected.
/// The check only covers this entry point; raw `Parent` storage writes stay
/// unchecked, and a cyclic graph makes every world-space query here garbage.
pub fn set_parent(
    child: Entity,
    parent: Entity,
    parents: &mut WriteStorage<'_, Parent>,
) -> Result<(), failure::Error> {
    if child == parent {
        return Err(HierarchyError::SelfParent { entity: child }.into());
    }

    let mut ancestor = parents.get(parent).map(|p| p.entity);
    while let Some(current) = ancestor {
        if current == child {
            return Err(HierarchyError::Cycle { child, parent }.into());
        }
        ancestor = parents.get(current).map(|p| p.entity);
    }

    log::trace!("attaching {:?} under {:?}", child, parent);
    parents.insert(child, Parent::new(parent))?;
    Ok(())
}

/// Detaches the entity from its parent, making it a root. No-op for roots.
pub fn clear_parent(entity: Entity, parents: &mut WriteStorage<'_, Parent>) -> Option<Parent> {
    parents.remove(entity)
}
