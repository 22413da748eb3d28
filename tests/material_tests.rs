//! Material library tests
//!
//! Tests for:
//! - Template instantiation as a deep copy
//! - Unknown template and missing shader error paths
//! - Texture-miss degradation
//! - Custom and post-process material tagging

use kiln::assets::{NullLoader, ResourceLoader};
use kiln::errors::RenderError;
use kiln::renderer::device::ShaderHandle;
use kiln::resources::library::MaterialLibrary;
use kiln::resources::material::{MaterialKind, UniformValue};

fn library() -> MaterialLibrary {
    let mut loader = NullLoader::new();
    MaterialLibrary::new(&mut loader).expect("library construction with a working loader")
}

// ============================================================================
// Templates
// ============================================================================

#[test]
fn built_in_templates_are_registered() {
    let library = library();
    assert!(library.template("default").is_some());
    assert!(library.template("glass").is_some());
    assert!(library.template("alpha blend").is_some());
    assert!(library.template("alpha discard").is_some());
}

#[test]
fn create_material_is_a_deep_copy() {
    let mut library = library();
    let key = library.create_material("default").unwrap();

    // Copy has the template's content...
    {
        let template = library.template("default").unwrap();
        let instance = library.get(key).unwrap();
        assert_eq!(template.samplers().len(), instance.samplers().len());
        assert_eq!(template.kind, instance.kind);
        assert_ne!(template.uuid, instance.uuid);
    }

    // ...and mutating the copy leaves the template untouched.
    library
        .get_mut(key)
        .unwrap()
        .set_float("roughness", 0.25);
    let template = library.template("default").unwrap();
    assert!(template.uniform("roughness").is_none());
    assert_eq!(
        library.get(key).unwrap().uniform("roughness"),
        Some(&UniformValue::Float(0.25))
    );
}

#[test]
fn instances_are_independent_of_each_other() {
    let mut library = library();
    let a = library.create_material("default").unwrap();
    let b = library.create_material("default").unwrap();

    library.get_mut(a).unwrap().set_float("metallic", 1.0);

    assert!(library.get(b).unwrap().uniform("metallic").is_none());
}

#[test]
fn unknown_template_is_an_error() {
    let mut library = library();
    let result = library.create_material("does not exist");
    assert!(matches!(
        result,
        Err(RenderError::UnknownMaterialTemplate(name)) if name == "does not exist"
    ));
}

#[test]
fn alpha_templates_route_transparent() {
    let library = library();
    assert_eq!(library.template("glass").unwrap().kind, MaterialKind::Transparent);
    assert!(library.template("glass").unwrap().blend);
    assert_eq!(
        library.template("alpha blend").unwrap().kind,
        MaterialKind::Transparent
    );
    // Cutout stays on the deferred path, it just draws both faces.
    let discard = library.template("alpha discard").unwrap();
    assert_eq!(discard.kind, MaterialKind::Opaque);
    assert!(!discard.cull);
}

// ============================================================================
// Error paths
// ============================================================================

#[test]
fn missing_internal_shader_fails_construction() {
    let mut loader = NullLoader::new();
    loader.mark_shader_missing("deferred ambient");
    let result = MaterialLibrary::new(&mut loader);
    assert!(matches!(
        result,
        Err(RenderError::ShaderNotFound { name, .. }) if name == "deferred ambient"
    ));
}

#[test]
fn missing_template_shader_fails_construction() {
    let mut loader = NullLoader::new();
    loader.mark_shader_missing("glass");
    assert!(MaterialLibrary::new(&mut loader).is_err());
}

#[test]
fn missing_texture_degrades_instead_of_failing() {
    let mut loader = NullLoader::new();
    loader.mark_texture_missing("default albedo");
    let library = MaterialLibrary::new(&mut loader).expect("texture misses are non-fatal");

    // The binding is skipped; the rest of the template is intact.
    let template = library.template("default").unwrap();
    assert!(template.sampler("TexAlbedo").is_none());
    assert!(template.sampler("TexNormal").is_some());
}

// ============================================================================
// Custom & post-process materials
// ============================================================================

#[test]
fn custom_material_wraps_caller_shader() {
    let mut loader = NullLoader::new();
    let mut library = MaterialLibrary::new(&mut loader).unwrap();
    let shader = loader
        .load_shader("my custom", "shaders/custom.vs", "shaders/custom.fs", &[])
        .unwrap();

    let key = library.create_custom_material(shader);
    let material = library.get(key).unwrap();
    assert_eq!(material.shader(), shader);
    assert_eq!(material.kind, MaterialKind::Opaque);
}

#[test]
fn post_processing_material_is_tagged_and_depthless() {
    let mut loader = NullLoader::new();
    let mut library = MaterialLibrary::new(&mut loader).unwrap();
    let shader = loader
        .load_shader("tonemap", "shaders/screen_quad.vs", "shaders/tonemap.fs", &[])
        .unwrap();

    let key = library.create_post_processing_material(shader);
    let material = library.get(key).unwrap();
    assert_eq!(material.kind, MaterialKind::PostProcess);
    assert!(!material.depth_test);
    assert!(!material.depth_write);
    assert!(!material.shadow_cast);
}

#[test]
fn shader_handles_come_from_the_loader_only() {
    // A material is only constructible from a handle the loader vended;
    // the type system enforces the "no material from an invalid shader"
    // contract, so this is just a smoke check of the plumbing.
    let mut loader = NullLoader::new();
    let shader = loader
        .load_shader("s", "shaders/s.vs", "shaders/s.fs", &[])
        .unwrap();
    assert_eq!(shader, ShaderHandle::new(0));
}
