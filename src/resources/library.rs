use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use xxhash_rust::xxh3::xxh3_64;

use crate::assets::ResourceLoader;
use crate::errors::{RenderError, Result};
use crate::renderer::device::ShaderHandle;
use crate::resources::MaterialKey;
use crate::resources::material::{Material, MaterialKind};

/// Hashed string id for template lookup.
#[inline]
fn sid(name: &str) -> u64 {
    xxh3_64(name.as_bytes())
}

/// Registry of template materials and the pool of instantiated copies.
///
/// Templates are canonical configurations looked up by hashed name;
/// [`MaterialLibrary::create_material`] deep-copies one into the instance
/// pool and returns a key. The pool owns instance storage, so everything
/// is reclaimed in one sweep when the library drops, while callers hold
/// plain keys.
///
/// The library also owns the shader handles for the internal deferred
/// passes (ambient/irradiance/directional/point lighting, shadow casting,
/// blit, light debug). Any of those failing to load is an immediate
/// error: a deferred renderer without its lighting shaders cannot
/// meaningfully degrade.
pub struct MaterialLibrary {
    templates: FxHashMap<u64, Material>,
    materials: SlotMap<MaterialKey, Material>,

    // internal pass shaders
    pub(crate) deferred_ambient_shader: ShaderHandle,
    pub(crate) deferred_irradiance_shader: ShaderHandle,
    pub(crate) deferred_directional_shader: ShaderHandle,
    pub(crate) deferred_point_shader: ShaderHandle,
    pub(crate) dir_shadow_shader: ShaderHandle,
    pub(crate) blit_shader: ShaderHandle,
    pub(crate) debug_light_shader: ShaderHandle,
}

impl MaterialLibrary {
    pub fn new(loader: &mut dyn ResourceLoader) -> Result<Self> {
        let deferred_ambient_shader = loader.load_shader(
            "deferred ambient",
            "shaders/deferred/screen_ambient.vs",
            "shaders/deferred/ambient.fs",
            &[],
        )?;
        let deferred_irradiance_shader = loader.load_shader(
            "deferred irradiance",
            "shaders/deferred/ambient_irradiance.vs",
            "shaders/deferred/ambient_irradiance.fs",
            &[],
        )?;
        let deferred_directional_shader = loader.load_shader(
            "deferred directional",
            "shaders/deferred/screen_directional.vs",
            "shaders/deferred/directional.fs",
            &[],
        )?;
        let deferred_point_shader = loader.load_shader(
            "deferred point",
            "shaders/deferred/point.vs",
            "shaders/deferred/point.fs",
            &[],
        )?;
        let dir_shadow_shader = loader.load_shader(
            "shadow directional",
            "shaders/shadow_cast.vs",
            "shaders/shadow_cast.fs",
            &[],
        )?;
        let blit_shader =
            loader.load_shader("blit", "shaders/screen_quad.vs", "shaders/default_blit.fs", &[])?;
        let debug_light_shader =
            loader.load_shader("debug light", "shaders/light.vs", "shaders/light.fs", &[])?;

        let mut library = Self {
            templates: FxHashMap::default(),
            materials: SlotMap::with_key(),
            deferred_ambient_shader,
            deferred_irradiance_shader,
            deferred_directional_shader,
            deferred_point_shader,
            dir_shadow_shader,
            blit_shader,
            debug_light_shader,
        };

        library.generate_default_templates(loader)?;
        Ok(library)
    }

    /// Builds the built-in templates: the default deferred G-buffer
    /// material plus the forward glass / alpha-blend / alpha-discard set.
    ///
    /// Shader misses abort construction. Texture misses degrade: the
    /// template stays usable without that binding and the shader's
    /// placeholder fallback shows instead, which is the intended behavior
    /// for missing content.
    fn generate_default_templates(&mut self, loader: &mut dyn ResourceLoader) -> Result<()> {
        // default render material (deferred path)
        let default_shader = loader.load_shader(
            "default",
            "shaders/deferred/g_buffer.vs",
            "shaders/deferred/g_buffer.fs",
            &[],
        )?;
        let mut default_mat = Material::new(default_shader);
        default_mat.kind = MaterialKind::Opaque;
        Self::bind_template_texture(loader, &mut default_mat, "TexAlbedo", "default albedo", "textures/checkerboard.png", 3);
        Self::bind_template_texture(loader, &mut default_mat, "TexNormal", "default normal", "textures/norm.png", 4);
        Self::bind_template_texture(loader, &mut default_mat, "TexMetallic", "default metallic", "textures/black.png", 5);
        Self::bind_template_texture(loader, &mut default_mat, "TexRoughness", "default roughness", "textures/checkerboard.png", 6);
        self.register_template("default", default_mat);

        // glass material
        let glass_shader = loader.load_shader(
            "glass",
            "shaders/forward_render.vs",
            "shaders/forward_render.fs",
            &["ALPHA_BLEND"],
        )?;
        let mut glass_mat = Material::new(glass_shader);
        glass_mat.make_transparent();
        Self::bind_template_texture(loader, &mut glass_mat, "TexAlbedo", "glass albedo", "textures/glass.png", 0);
        Self::bind_template_texture(loader, &mut glass_mat, "TexNormal", "glass normal", "textures/pbr/plastic/normal.png", 1);
        Self::bind_template_texture(loader, &mut glass_mat, "TexMetallic", "glass metallic", "textures/pbr/plastic/metallic.png", 2);
        Self::bind_template_texture(loader, &mut glass_mat, "TexRoughness", "glass roughness", "textures/pbr/plastic/roughness.png", 3);
        Self::bind_template_texture(loader, &mut glass_mat, "TexAO", "glass ao", "textures/pbr/plastic/ao.png", 4);
        self.register_template("glass", glass_mat);

        // alpha blend material
        let alpha_blend_shader = loader.load_shader(
            "alpha blend",
            "shaders/forward_render.vs",
            "shaders/forward_render.fs",
            &["ALPHA_BLEND"],
        )?;
        let mut alpha_blend_mat = Material::new(alpha_blend_shader);
        alpha_blend_mat.make_transparent();
        self.register_template("alpha blend", alpha_blend_mat);

        // alpha cutout material
        let alpha_discard_shader = loader.load_shader(
            "alpha discard",
            "shaders/forward_render.vs",
            "shaders/forward_render.fs",
            &["ALPHA_DISCARD"],
        )?;
        let mut alpha_discard_mat = Material::new(alpha_discard_shader);
        alpha_discard_mat.cull = false;
        self.register_template("alpha discard", alpha_discard_mat);

        Ok(())
    }

    fn bind_template_texture(
        loader: &mut dyn ResourceLoader,
        material: &mut Material,
        uniform: &'static str,
        name: &str,
        path: &str,
        unit: u32,
    ) {
        match loader.load_texture(name, path) {
            Ok(texture) => material.set_texture(uniform, texture, unit),
            Err(err) => {
                log::warn!("Template texture '{name}' unavailable, binding skipped: {err}");
            }
        }
    }

    /// Registers (or replaces) a template under `name`.
    pub fn register_template(&mut self, name: &str, mut material: Material) {
        material.name = Some(name.to_owned().into());
        self.templates.insert(sid(name), material);
    }

    #[must_use]
    pub fn template(&self, name: &str) -> Option<&Material> {
        self.templates.get(&sid(name))
    }

    /// Instantiates a template material by name.
    ///
    /// The copy is deep: mutating the instance's uniforms or samplers
    /// never affects the template. An unknown template is an error the
    /// caller must handle.
    pub fn create_material(&mut self, base: &str) -> Result<MaterialKey> {
        let Some(template) = self.templates.get(&sid(base)) else {
            log::warn!("Material template '{base}' requested, but template does not exist");
            return Err(RenderError::UnknownMaterialTemplate(base.to_owned()));
        };
        let instance = template.instantiate();
        Ok(self.materials.insert(instance))
    }

    /// Wraps a caller-supplied shader in a fresh opaque material with a
    /// custom forward path.
    pub fn create_custom_material(&mut self, shader: ShaderHandle) -> MaterialKey {
        let material = Material::new(shader);
        self.materials.insert(material)
    }

    /// Wraps a caller-supplied shader in a post-processing material.
    pub fn create_post_processing_material(&mut self, shader: ShaderHandle) -> MaterialKey {
        let mut material = Material::new(shader);
        material.kind = MaterialKind::PostProcess;
        material.depth_test = false;
        material.depth_write = false;
        material.shadow_cast = false;
        material.shadow_receive = false;
        self.materials.insert(material)
    }

    /// Adds an already-built material to the instance pool.
    pub fn insert(&mut self, material: Material) -> MaterialKey {
        self.materials.insert(material)
    }

    #[must_use]
    pub fn get(&self, key: MaterialKey) -> Option<&Material> {
        self.materials.get(key)
    }

    #[must_use]
    pub fn get_mut(&mut self, key: MaterialKey) -> Option<&mut Material> {
        self.materials.get_mut(key)
    }

    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.materials.len()
    }

    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }
}
