//! A simple scene description format which allows defining a transform
//! hierarchy as data: a flat list of nodes, each with a local transform and
//! an optional parent by index.
use crate::transform::{Parent, Transform};

use serde::Deserialize;
use specs::prelude::*;

use std::{fs::File, path::Path};

/// The index of a node in the node list of the scene config
pub type SceneNodeIndex = usize;

/// The root scene configuration. Consists of a list of scene nodes.
#[derive(Debug, Deserialize)]
pub struct SceneConfig {
    pub nodes: Vec<SceneNode>,
}

/// A node in the scene. Must have a transform, and can optionally have a
/// parent.
#[derive(Debug, Deserialize)]
pub struct SceneNode {
    /// The local transform of this node.
    pub transform: Transform,
    /// The parent of this node. This node's transform will be relative to
    /// the parent, if there is one.
    pub parent: Option<SceneNodeIndex>,
}

impl SceneConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, failure::Error> {
        let file = File::open(path.as_ref())?;
        let reader = std::io::BufReader::new(file);
        ron::de::from_reader(reader).map_err(From::from)
    }

    pub fn from_str(source: &str) -> Result<Self, failure::Error> {
        ron::de::from_str(source).map_err(From::from)
    }

    /// Instantiates the nodes into the world and wires up the parent links,
    /// returning the created entities in node-list order.
    ///
    /// The node list is validated first; no entities are created for a
    /// config with dangling, self-referential or cyclic parent indices.
    pub fn load(&self, world: &mut World) -> Result<Vec<Entity>, failure::Error> {
        self.validate()?;

        world.register::<Transform>();
        world.register::<Parent>();

        let mut scene_entities = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            scene_entities.push(world.create_entity().with(node.transform.clone()).build());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(parent_idx) = node.parent {
                let mut parent_storage = world.write_storage::<Parent>();
                parent_storage.insert(
                    scene_entities[i],
                    Parent::new(scene_entities[parent_idx]),
                )?;
            }
        }

        log::debug!("loaded scene with {} nodes", scene_entities.len());
        Ok(scene_entities)
    }

    fn validate(&self) -> Result<(), failure::Error> {
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(parent_idx) = node.parent {
                if parent_idx >= self.nodes.len() {
                    failure::bail!(
                        "node {} refers to parent {} which does not exist",
                        i,
                        parent_idx
                    );
                }
                if parent_idx == i {
                    failure::bail!("node {} is its own parent", i);
                }
            }
        }

        // A chain longer than the node list can only mean the indices loop.
        for start in 0..self.nodes.len() {
            let mut hops = 0;
            let mut current = self.nodes[start].parent;
            while let Some(idx) = current {
                hops += 1;
                if hops > self.nodes.len() {
                    failure::bail!("parent chain starting at node {} never reaches a root", start);
                }
                current = self.nodes[idx].parent;
            }
        }

        Ok(())
    }
}
