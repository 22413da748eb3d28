#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod assets;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use assets::{NullLoader, ResourceLoader};
pub use errors::{RenderError, Result};
pub use renderer::{
    CommandBuffer, DeviceCall, GlobalUniforms, HeadlessDevice, PbrCapture, PbrSystem,
    RenderCommand, RenderDevice, RenderOptions, RenderTargetDesc, RenderTargetId, Renderer,
    ShaderHandle, StateCache, TextureHandle,
};
pub use resources::{
    BoundingBox, Material, MaterialKey, MaterialKind, MaterialLibrary, MeshData, MeshKey,
    MeshRegistry, UniformValue,
};
pub use scene::{Camera, DirectionalLight, Frustum, NodeKey, PointLight, SceneGraph, SceneNode};
