use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::gfx::{
    lighting::{LightDescriptor, LightKind},
    sky::{SkyDome, SunSphere},
};

use super::object::Model;

/// Handle of a node in a [`SceneGraph`]
///
/// Ids are dense indices in insertion order and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node holds
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Stand-in for the viewer camera so lights can ride on it
    Camera,
    Light(LightDescriptor),
    Sky(SkyDome),
    Sun(SunSphere),
    Model(Model),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Position relative to the parent, or to the world for root nodes
    pub position: Point3<f32>,
    pub scale: f32,
    pub visible: bool,
    pub parent: Option<NodeId>,
}

/// Owning container of everything the renderer draws
///
/// Nodes are only ever appended.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    camera_node: Option<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference point the camera looks at every frame
    pub fn position(&self) -> Point3<f32> {
        Point3::origin()
    }

    /// Appends a root node
    pub fn add(&mut self, name: &str, kind: NodeKind) -> NodeId {
        self.add_child(None, name, kind)
    }

    /// Appends a node under `parent`, or at the root when `parent` is `None`
    ///
    /// # Panics
    /// Panics if `parent` does not belong to this graph.
    pub fn add_child(&mut self, parent: Option<NodeId>, name: &str, kind: NodeKind) -> NodeId {
        if let Some(parent) = parent {
            assert!(parent.0 < self.nodes.len(), "unknown parent node {:?}", parent);
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            id,
            name: name.to_string(),
            kind,
            position: Point3::origin(),
            scale: 1.0,
            visible: true,
            parent,
        });
        id
    }

    /// Returns the camera node, adding it on first use
    pub fn ensure_camera_node(&mut self) -> NodeId {
        if let Some(id) = self.camera_node {
            return id;
        }
        let id = self.add("camera", NodeKind::Camera);
        self.camera_node = Some(id);
        id
    }

    pub fn camera_node(&self) -> Option<NodeId> {
        self.camera_node
    }

    /// Moves the camera node, if any, to the viewer camera position
    pub fn sync_camera(&mut self, position: Point3<f32>) {
        if let Some(id) = self.camera_node {
            self.nodes[id.0].position = position;
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Position of a node after applying all parent offsets
    pub fn world_position(&self, id: NodeId) -> Option<Point3<f32>> {
        let mut node = self.node(id)?;
        let mut offset: Vector3<f32> = node.position.to_vec();
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            offset += node.position.to_vec();
        }
        Some(Point3::from_vec(offset))
    }

    pub fn lights(&self) -> impl Iterator<Item = (NodeId, &LightDescriptor)> {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Light(light) => Some((n.id, light)),
            _ => None,
        })
    }

    pub fn count_lights(&self, kind: LightKind) -> usize {
        self.lights().filter(|(_, l)| l.kind == kind).count()
    }

    pub fn models(&self) -> impl Iterator<Item = (&SceneNode, &Model)> {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Model(model) => Some((n, model)),
            _ => None,
        })
    }

    pub fn model_count(&self) -> usize {
        self.models().count()
    }

    pub fn sky(&self) -> Option<&SkyDome> {
        self.nodes.iter().find_map(|n| match &n.kind {
            NodeKind::Sky(sky) if n.visible => Some(sky),
            _ => None,
        })
    }

    /// Gets statistics about the scene
    pub fn get_statistics(&self) -> SceneStatistics {
        SceneStatistics {
            node_count: self.nodes.len(),
            light_count: self.lights().count(),
            model_count: self.model_count(),
            total_triangles: self.models().map(|(_, m)| m.triangle_count()).sum(),
            total_vertices: self.models().map(|(_, m)| m.vertex_count()).sum(),
        }
    }
}

/// Scene statistics for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStatistics {
    pub node_count: usize,
    pub light_count: usize,
    pub model_count: usize,
    pub total_triangles: u32,
    pub total_vertices: u32,
}
