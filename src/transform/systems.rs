//! Scene graph system and types
use crate::transform::{
    world, GlobalTransform, HierarchyEvent, Parent, ParentHierarchy, Transform,
};

use specs::prelude::{
    ComponentEvent, Entities, Entity, Join, ReadExpect, ReadStorage, ReaderId, Resources, System,
    WriteStorage,
};

use hibitset::BitSet;

/// Bakes `GlobalTransform` for every entity with a `Transform`, recomputing
/// only entities whose local transform or ancestry changed since the last
/// run. Must run after the hierarchy maintenance system.
pub struct TransformSystem {
    local_modified: BitSet,
    global_modified: BitSet,

    locals_events_id: Option<ReaderId<ComponentEvent>>,

    parent_events_id: Option<ReaderId<HierarchyEvent>>,

    scratch: Vec<Entity>,
}

impl TransformSystem {
    /// Creates a new transform processor.
    pub fn new() -> TransformSystem {
        TransformSystem {
            locals_events_id: None,
            parent_events_id: None,
            local_modified: BitSet::default(),
            global_modified: BitSet::default(),
            scratch: Vec::new(),
        }
    }
}

impl<'a> System<'a> for TransformSystem {
    type SystemData = (
        Entities<'a>,
        ReadExpect<'a, ParentHierarchy>,
        ReadStorage<'a, Transform>,
        ReadStorage<'a, Parent>,
        WriteStorage<'a, GlobalTransform>,
    );
    fn run(&mut self, (entities, hierarchy, locals, parents, mut globals): Self::SystemData) {
        self.local_modified.clear();
        self.global_modified.clear();

        self.scratch.clear();
        self.scratch
            .extend((&*entities, &locals, !&globals).join().map(|d| d.0));
        for entity in &self.scratch {
            globals
                .insert(*entity, GlobalTransform::default())
                .expect("unreachable");
            self.local_modified.add(entity.id());
        }

        locals
            .channel()
            .read(
                self.locals_events_id.as_mut().expect(
                    "`TransformSystem::setup` was not called before `TransformSystem::run`",
                ),
            )
            .for_each(|event| match event {
                ComponentEvent::Inserted(id) | ComponentEvent::Modified(id) => {
                    self.local_modified.add(*id);
                }
                ComponentEvent::Removed(_id) => {}
            });

        for event in hierarchy.changed().read(
            self.parent_events_id
                .as_mut()
                .expect("`TransformSystem::setup` was not called before `TransformSystem::run`"),
        ) {
            match *event {
                // The entity lost its parent (detached, or the parent died).
                // It keeps its local transform and carries on as a root.
                HierarchyEvent::Removed(entity) => {
                    self.local_modified.add(entity.id());
                }
                HierarchyEvent::Modified(entity) => {
                    self.local_modified.add(entity.id());
                }
            }
        }

        // Compute transforms without parents.
        for (entity, _, local, global, _) in (
            &*entities,
            &self.local_modified,
            &locals,
            &mut globals,
            !&parents,
        )
            .join()
        {
            self.global_modified.add(entity.id());
            global.0 = local.matrix();
            debug_assert!(
                global.is_finite(),
                "entity {:?} had a non-finite `Transform`",
                entity
            );
        }

        // Compute transforms with parents, parents before children so
        // dirtiness propagates down in one pass. The recomputation walks the
        // whole ancestor chain: ancestor scale and shear must stay out of the
        // matrix product, so there is no valid `parent_global * local`
        // shortcut here.
        for entity in hierarchy.all() {
            let self_dirty = self.local_modified.contains(entity.id());
            if let (Some(parent), Some(_)) = (parents.get(*entity), locals.get(*entity)) {
                let parent_dirty = self.global_modified.contains(parent.entity.id());
                if parent_dirty || self_dirty {
                    self.global_modified.add(entity.id());
                    let combined = world::world_matrix(*entity, &locals, &parents);

                    if let Some(global) = globals.get_mut(*entity) {
                        global.0 = combined;
                        debug_assert!(
                            global.is_finite(),
                            "entity {:?} had a non-finite `Transform`",
                            entity
                        );
                    }
                }
            }
        }
    }

    fn setup(&mut self, res: &mut Resources) {
        use specs::prelude::SystemData;
        Self::SystemData::setup(res);
        let mut hierarchy = res.fetch_mut::<ParentHierarchy>();
        let mut locals = WriteStorage::<Transform>::fetch(res);
        self.parent_events_id = Some(hierarchy.track());
        self.locals_events_id = Some(locals.register_reader());
    }
}
