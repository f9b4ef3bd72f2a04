//! Scene collaborator
//!
//! The player touches the scene only after the first successful explicit load:
//! every renderable node gets the default material in each of its slots, and
//! every node carrying a stream-derived mesh is excluded from persistence.
//!
//! [`SimpleScene`] is a flat list of nodes that is enough for headless hosts and
//! tests.

use crate::render::api::MaterialHandle;

/// Identifies a node of a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Scene graph interface used by the stream player
pub trait SceneGraph {
    /// Material assigned to freshly imported renderers
    fn default_material(&self) -> Option<MaterialHandle>;

    /// Nodes that carry a renderer
    fn renderable_nodes(&self) -> Vec<NodeId>;

    /// Number of material slots of a renderable node
    fn material_slot_count(&self, node: NodeId) -> usize;

    /// Materials currently assigned to a node
    fn materials(&self, node: NodeId) -> &[MaterialHandle];

    /// Replace every material of a node
    fn set_materials(&mut self, node: NodeId, materials: Vec<MaterialHandle>);

    /// Nodes whose mesh is produced by the stream
    fn mesh_nodes(&self) -> Vec<NodeId>;

    /// Keep a node's mesh out of saved scenes
    fn exclude_mesh_from_save(&mut self, node: NodeId);

    /// Whether a node's mesh is kept out of saved scenes
    fn is_mesh_excluded_from_save(&self, node: NodeId) -> bool;
}

/// One node of a [`SimpleScene`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneNode {
    /// Node identifier
    pub id: NodeId,
    /// Materials, one per slot; empty for nodes without a renderer
    pub materials: Vec<MaterialHandle>,
    /// Whether the node carries a renderer
    pub renderable: bool,
    /// Whether the node's mesh comes from the stream
    pub has_stream_mesh: bool,
    /// Whether the mesh is kept out of saved scenes
    pub mesh_excluded: bool,
}

/// Flat list scene graph
#[derive(Debug, Default)]
pub struct SimpleScene {
    default_material: Option<MaterialHandle>,
    nodes: Vec<SceneNode>,
    next_id: u64,
}

impl SimpleScene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default material
    pub const fn with_default_material(mut self, material: MaterialHandle) -> Self {
        self.default_material = Some(material);
        self
    }

    /// Add a renderable node with the given material slots
    pub fn add_renderer(&mut self, materials: Vec<MaterialHandle>, has_stream_mesh: bool) -> NodeId {
        self.push(SceneNode {
            id: NodeId(0),
            materials,
            renderable: true,
            has_stream_mesh,
            mesh_excluded: false,
        })
    }

    /// Add a node without a renderer
    pub fn add_empty(&mut self) -> NodeId {
        self.push(SceneNode {
            id: NodeId(0),
            materials: Vec::new(),
            renderable: false,
            has_stream_mesh: false,
            mesh_excluded: false,
        })
    }

    /// Look a node up
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, mut node: SceneNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.id = id;
        self.nodes.push(node);
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }
}

impl SceneGraph for SimpleScene {
    fn default_material(&self) -> Option<MaterialHandle> {
        self.default_material
    }

    fn renderable_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().filter(|node| node.renderable).map(|node| node.id).collect()
    }

    fn material_slot_count(&self, node: NodeId) -> usize {
        self.node(node).map_or(0, |node| node.materials.len())
    }

    fn materials(&self, node: NodeId) -> &[MaterialHandle] {
        self.node(node).map(|node| node.materials.as_slice()).unwrap_or_default()
    }

    fn set_materials(&mut self, node: NodeId, materials: Vec<MaterialHandle>) {
        if let Some(node) = self.node_mut(node) {
            node.materials = materials;
        }
    }

    fn mesh_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.has_stream_mesh)
            .map(|node| node.id)
            .collect()
    }

    fn exclude_mesh_from_save(&mut self, node: NodeId) {
        if let Some(node) = self.node_mut(node) {
            node.mesh_excluded = true;
        }
    }

    fn is_mesh_excluded_from_save(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(|node| node.mesh_excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_queries() {
        let mut scene = SimpleScene::new().with_default_material(MaterialHandle(9));
        let mesh = scene.add_renderer(vec![MaterialHandle(1), MaterialHandle(2)], true);
        let plain = scene.add_renderer(vec![MaterialHandle(3)], false);
        let empty = scene.add_empty();

        assert_eq!(scene.len(), 3);
        assert_eq!(scene.default_material(), Some(MaterialHandle(9)));
        assert_eq!(scene.renderable_nodes(), vec![mesh, plain]);
        assert_eq!(scene.mesh_nodes(), vec![mesh]);
        assert_eq!(scene.material_slot_count(mesh), 2);
        assert_eq!(scene.material_slot_count(empty), 0);
        assert_eq!(scene.material_slot_count(NodeId(99)), 0);
    }

    #[test]
    fn test_material_and_persistence_updates() {
        let mut scene = SimpleScene::new();
        let node = scene.add_renderer(vec![MaterialHandle(1)], true);

        scene.set_materials(node, vec![MaterialHandle(5)]);
        scene.exclude_mesh_from_save(node);
        scene.exclude_mesh_from_save(NodeId(42));

        assert_eq!(scene.materials(node), &[MaterialHandle(5)]);
        assert!(scene.is_mesh_excluded_from_save(node));
        assert!(!scene.is_mesh_excluded_from_save(NodeId(42)));
    }
}
