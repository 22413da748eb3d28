use glam::{Mat4, Vec3};
use slotmap::SlotMap;

use crate::resources::{BoundingBox, MaterialKey, MeshKey};
use crate::scene::NodeKey;
use crate::scene::node::SceneNode;

/// The scene graph: a node arena plus hierarchy bookkeeping.
///
/// This is an explicit context struct; nothing here is process-global, so
/// multiple independent graphs can coexist (and tests get deterministic
/// setup/teardown).
///
/// # Transform resolution
///
/// Setters on [`SceneNode`] only mark nodes dirty. World matrices are
/// resolved either lazily per node through [`SceneGraph::transform`] or
/// eagerly for the whole graph through [`SceneGraph::update_transforms`],
/// which the renderer expects to run once per frame before command
/// gathering.
#[derive(Default)]
pub struct SceneGraph {
    pub(crate) nodes: SlotMap<NodeKey, SceneNode>,
    root_nodes: Vec<NodeKey>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
        }
    }

    /// Starts building a node with the fluent builder.
    pub fn build_node(&mut self) -> NodeBuilder<'_> {
        NodeBuilder::new(self)
    }

    /// Inserts a node as a root.
    pub fn add_node(&mut self, node: SceneNode) -> NodeKey {
        let key = self.nodes.insert(node);
        self.root_nodes.push(key);
        key
    }

    /// Inserts a node as a child of `parent`.
    pub fn add_to_parent(&mut self, node: SceneNode, parent: NodeKey) -> NodeKey {
        let key = self.nodes.insert(node);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(key);
        }
        if let Some(c) = self.nodes.get_mut(key) {
            c.parent = Some(parent);
        }
        key
    }

    /// Re-parents `child` under `parent`.
    ///
    /// The child is detached from its previous parent (or the root list)
    /// first, so a node never appears in two child lists. The child is
    /// marked dirty since its world transform now composes differently.
    pub fn attach(&mut self, child: NodeKey, parent: NodeKey) {
        if child == parent {
            log::warn!("Cannot attach node to itself");
            return;
        }

        self.unlink(child);

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        } else {
            log::error!("Parent node not found during attach");
            self.root_nodes.push(child);
            return;
        }

        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.dirty = true;
        }
    }

    /// Detaches `child` from its parent and moves it to the root list.
    pub fn detach(&mut self, child: NodeKey) {
        if !self.nodes.contains_key(child) {
            return;
        }
        self.unlink(child);
        self.root_nodes.push(child);
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
            c.dirty = true;
        }
    }

    /// Removes `child` from its parent's child list or the root list,
    /// without touching the node's own parent field.
    fn unlink(&mut self, child: NodeKey) {
        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(p) = old_parent {
            if let Some(node) = self.nodes.get_mut(p)
                && let Some(i) = node.children.iter().position(|&k| k == child)
            {
                node.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&k| k == child) {
            self.root_nodes.remove(i);
        }
    }

    /// Removes a node and, recursively, its entire subtree.
    pub fn remove(&mut self, key: NodeKey) {
        let children = match self.nodes.get(key) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.remove(child);
        }
        self.unlink(key);
        self.nodes.remove(key);
    }

    // ========================================================================
    // Access
    // ========================================================================

    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    #[must_use]
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    #[must_use]
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map_or(&[], |n| n.children.as_slice())
    }

    /// Returns the child at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range; an out-of-range child index is
    /// a logic bug in calling code, not a runtime condition.
    #[must_use]
    pub fn child_by_index(&self, key: NodeKey, index: usize) -> NodeKey {
        let children = self.children(key);
        assert!(
            index < children.len(),
            "child index {index} out of range ({} children)",
            children.len()
        );
        children[index]
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeKey] {
        &self.root_nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &SceneNode)> {
        self.nodes.iter()
    }

    // ========================================================================
    // Transform resolution
    // ========================================================================

    /// Resolves and returns the node's world matrix.
    ///
    /// If the node or any ancestor is dirty, the chain is recomputed from
    /// the highest dirty ancestor down to this node. Recomputing an
    /// ancestor marks its children dirty, so siblings off the resolved
    /// chain pick up the change lazily on their own next access. Calling
    /// this twice without an intervening setter returns identical results.
    pub fn transform(&mut self, key: NodeKey) -> Option<Mat4> {
        self.nodes.get(key)?;

        // Ancestor chain, root first.
        let mut chain = Vec::new();
        let mut cursor = Some(key);
        while let Some(k) = cursor {
            chain.push(k);
            cursor = self.nodes.get(k).and_then(|n| n.parent);
        }
        chain.reverse();

        let first_dirty = chain
            .iter()
            .position(|&k| self.nodes.get(k).is_some_and(|n| n.dirty));

        if let Some(start) = first_dirty {
            let mut parent_world = if start == 0 {
                self.nodes
                    .get(chain[0])
                    .and_then(|n| n.parent)
                    .and_then(|p| self.nodes.get(p))
                    .map_or(Mat4::IDENTITY, |p| p.transform)
            } else {
                self.nodes[chain[start - 1]].transform
            };

            for &k in &chain[start..] {
                // Children inherit the change lazily.
                let children = self.nodes[k].children.clone();
                for c in children {
                    if let Some(child) = self.nodes.get_mut(c) {
                        child.dirty = true;
                    }
                }
                let node = &mut self.nodes[k];
                node.transform = parent_world * node.local_matrix();
                node.dirty = false;
                parent_world = node.transform;
            }
        }

        Some(self.nodes[key].transform)
    }

    /// Eagerly recomputes world matrices for the whole graph.
    ///
    /// Runs iteratively with an explicit stack, so deep hierarchies cannot
    /// overflow the call stack. When `update_prev` is true, each node's
    /// current world matrix is copied into its previous-transform slot
    /// before recomputation; call with `true` exactly once per frame,
    /// before command gathering. A parent's change cascades to children
    /// even when a child is not locally dirty.
    pub fn update_transforms(&mut self, update_prev: bool) {
        let mut stack: Vec<(NodeKey, Mat4, bool)> = Vec::with_capacity(64);
        for &root in self.root_nodes.iter().rev() {
            stack.push((root, Mat4::IDENTITY, false));
        }

        while let Some((key, parent_world, parent_changed)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };

            if update_prev {
                node.prev_transform = node.transform;
            }

            let changed = node.dirty || parent_changed;
            if changed {
                node.transform = parent_world * node.local_matrix();
                node.dirty = false;
            }

            let world = node.transform;
            for i in (0..node.children.len()).rev() {
                let child = node.children[i];
                stack.push((child, world, changed));
            }
        }
    }

    /// The node's bounding box in world space, per its cached transform.
    #[must_use]
    pub fn world_bounds(&self, key: NodeKey) -> Option<BoundingBox> {
        let node = self.nodes.get(key)?;
        Some(node.bounds.transform(&node.transform))
    }
}

/// Fluent construction of a [`SceneNode`] inside a [`SceneGraph`].
pub struct NodeBuilder<'a> {
    graph: &'a mut SceneGraph,
    node: SceneNode,
    parent: Option<NodeKey>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(graph: &'a mut SceneGraph) -> Self {
        Self {
            graph,
            node: SceneNode::new(),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.node.set_position(position);
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, axis: Vec3, angle: f32) -> Self {
        self.node.set_rotation(axis, angle);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.node.set_uniform_scale(scale);
        self
    }

    #[must_use]
    pub fn with_mesh(mut self, mesh: MeshKey) -> Self {
        self.node.mesh = Some(mesh);
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: MaterialKey) -> Self {
        self.node.material = Some(material);
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.node.bounds = bounds;
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: NodeKey) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Inserts the node into the graph and returns its key.
    pub fn build(self) -> NodeKey {
        match self.parent {
            Some(parent) => self.graph.add_to_parent(self.node, parent),
            None => self.graph.add_node(self.node),
        }
    }
}
