//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`RenderError`] covers all failure modes including:
//! - Shader and texture resolution failures
//! - Material template lookups
//! - GPU target and cubemap allocation failures
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, RenderError>`.
//!
//! Resource errors are recoverable values that callers must check; logic
//! errors (child index out of bounds, and similar programmer mistakes) are
//! panics, not `Err` values.

use thiserror::Error;

/// The main error type for the Kiln render pipeline.
///
/// Each variant carries enough context to produce an actionable
/// diagnostic without a debugger attached.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// The requested shader source could not be resolved by the loader.
    #[error("Shader not found: {name} ({path})")]
    ShaderNotFound {
        /// Registered shader name
        name: String,
        /// Source path that failed to resolve
        path: String,
    },

    /// A shader compiled or linked with errors.
    #[error("Shader '{name}' failed at {stage} stage: {log}")]
    ShaderCompile {
        /// Registered shader name
        name: String,
        /// Stage that reported the failure (vertex, fragment, link)
        stage: String,
        /// Backend compile/link log
        log: String,
    },

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// The requested texture could not be resolved by the loader.
    #[error("Texture not found: {name} ({path})")]
    TextureNotFound {
        /// Registered texture name
        name: String,
        /// Source path that failed to resolve
        path: String,
    },

    /// A material template lookup failed.
    #[error("Material template does not exist: {0}")]
    UnknownMaterialTemplate(String),

    /// A handle referred to a resource that no longer exists.
    #[error("Invalid handle: {context}")]
    InvalidHandle {
        /// Description of what was being accessed
        context: String,
    },

    // ========================================================================
    // GPU Allocation Errors
    // ========================================================================
    /// Render target or cubemap allocation failed on the device.
    #[error("Render target allocation failed: {label}: {reason}")]
    TargetAllocation {
        /// Target label for diagnostics
        label: String,
        /// Backend-reported reason
        reason: String,
    },
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
