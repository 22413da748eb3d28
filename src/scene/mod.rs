//! Scene graph system.
//!
//! Manages the scene hierarchy and the data that hangs off it:
//! - `SceneNode`: a tree node carrying a transform and drawable references
//! - `SceneGraph`: the node arena and hierarchy operations
//! - `Camera`: view/projection state plus the culling frustum
//! - `DirectionalLight` / `PointLight`: per-frame light sources

pub mod camera;
pub mod graph;
pub mod light;
pub mod node;

pub use camera::{Camera, Frustum, ProjectionKind};
pub use graph::{NodeBuilder, SceneGraph};
pub use light::{DirectionalLight, PointLight};
pub use node::SceneNode;

use slotmap::new_key_type;

new_key_type! {
    /// Generation-checked handle to a node in a [`SceneGraph`].
    pub struct NodeKey;
}
