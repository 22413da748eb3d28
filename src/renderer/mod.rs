//! The deferred render pipeline.
//!
//! Provides:
//! - `RenderDevice`: the abstract GPU backend contract, plus a recording
//!   headless implementation
//! - `StateCache`: redundant-state-change suppression
//! - `CommandBuffer` / `RenderCommand`: per-frame command accumulation
//! - `GlobalUniforms`: the per-frame camera uniform block
//! - `PbrSystem`: environment capture into irradiance/prefiltered maps
//! - `Renderer`: the frame orchestrator

pub mod command;
pub mod device;
pub mod pbr;
pub mod renderer;
pub mod state;
pub mod uniforms;

pub use command::{CommandBuffer, RenderCommand};
pub use device::{
    Attachment, DeviceCall, HeadlessDevice, RenderDevice, RenderTargetDesc, RenderTargetId,
    ShaderHandle, TextureHandle,
};
pub use pbr::{PbrCapture, PbrSystem};
pub use renderer::{RenderOptions, Renderer};
pub use state::StateCache;
pub use uniforms::GlobalUniforms;
