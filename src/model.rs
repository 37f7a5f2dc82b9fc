//! Model loading: a glTF document flattened into meshes plus the shared,
//! de-duplicated textures its materials reference.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use gltf::buffer::Source;
use gltf::Gltf;
use log::{error, trace, warn};

use crate::cache::ResourceCache;
use crate::mesh::{Mesh, Vertex};
use crate::shader::ShaderProgram;
use crate::surface::{Surface, SurfaceShared};
use crate::texture::SharedTexture;

/// Shared-ownership handle to a model, as produced by the resource cache.
pub type SharedModel = Rc<RefCell<Model>>;

/// The texture-binding categories resolved from a material, in binding-table
/// order. Names are the label plus a 1-based index ("diffuse1", ...).
const DIFFUSE: &str = "diffuse";
const SPECULAR: &str = "specular";
const AMBIENT: &str = "ambient";
const NORMAL: &str = "normal";
const HEIGHT: &str = "height";

fn binding_name(label: &str, index: usize) -> String {
    format!("{label}{index}")
}

/// An ordered collection of meshes loaded from one model file, sharing
/// de-duplicated textures through the [`ResourceCache`].
pub struct Model {
    meshes: Vec<Mesh>,
    /// Directory the model file lives in; relative texture URIs resolve
    /// against it.
    directory: PathBuf,
    /// Every distinct texture any mesh in this model references, for
    /// whole-model surface registration.
    textures: Vec<SharedTexture>,
}

impl Model {
    /// Parses the model file at `path`. Failure is recoverable: a parse
    /// error, unreadable buffer data, or a rootless scene logs a diagnostic
    /// and yields an empty model.
    pub fn load(path: impl AsRef<Path>, cache: &mut ResourceCache) -> Model {
        let path = path.as_ref();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut model = Model {
            meshes: Vec::new(),
            directory,
            textures: Vec::new(),
        };
        if let Err(err) = model.load_from_path(path, cache) {
            error!("failed to load model {}: {err}", path.display());
            model.meshes.clear();
            model.textures.clear();
        }
        model
    }

    /// Registers every referenced texture and then every mesh on `surface`,
    /// so draw-time binding finds the textures in place.
    pub fn register_on_surface(&mut self, surface: &Surface) {
        self.register_on_shared(surface.shared());
    }

    pub(crate) fn register_on_shared(&mut self, shared: &Rc<SurfaceShared>) {
        for texture in &self.textures {
            texture.borrow_mut().register_on_shared(shared);
        }
        for mesh in &mut self.meshes {
            mesh.register_on_shared(shared);
        }
    }

    /// Renders every mesh with `program`, in mesh-list order.
    pub fn render(&self, program: &ShaderProgram) {
        for mesh in &self.meshes {
            mesh.render(program);
        }
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn textures(&self) -> &[SharedTexture] {
        &self.textures
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    fn load_from_path(&mut self, path: &Path, cache: &mut ResourceCache) -> Result<(), String> {
        trace!("loading model from {}", path.display());
        let gltf = Gltf::open(path).map_err(|err| format!("parse error: {err}"))?;

        // Pull in every buffer the document references before walking it.
        let mut buffers = Vec::new();
        for buffer in gltf.buffers() {
            let data = match buffer.source() {
                Source::Uri(uri) => {
                    let buffer_path = self.directory.join(uri);
                    std::fs::read(&buffer_path).map_err(|err| {
                        format!("buffer {} unreadable: {err}", buffer_path.display())
                    })?
                }
                Source::Bin => gltf
                    .blob
                    .clone()
                    .ok_or_else(|| "binary chunk missing".to_string())?,
            };
            buffers.push(data);
        }

        let roots: Vec<gltf::Node> = match gltf.default_scene() {
            Some(scene) => scene.nodes().collect(),
            None => gltf.scenes().flat_map(|scene| scene.nodes()).collect(),
        };
        if roots.is_empty() {
            return Err("document has no root nodes".into());
        }

        for node in roots {
            self.process_node(&node, &buffers, cache);
        }
        Ok(())
    }

    /// Depth-first: this node's mesh, then its children.
    fn process_node(&mut self, node: &gltf::Node, buffers: &[Vec<u8>], cache: &mut ResourceCache) {
        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                self.process_primitive(&primitive, buffers, cache);
            }
        }
        for child in node.children() {
            self.process_node(&child, buffers, cache);
        }
    }

    fn process_primitive(
        &mut self,
        primitive: &gltf::Primitive,
        buffers: &[Vec<u8>],
        cache: &mut ResourceCache,
    ) {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

        let Some(positions) = reader.read_positions() else {
            warn!("primitive without positions skipped");
            return;
        };
        let positions: Vec<[f32; 3]> = positions.collect();
        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .map(|normals| normals.collect())
            .unwrap_or_default();
        let tex_coords: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|coords| coords.into_f32().collect())
            .unwrap_or_default();

        // Attributes the source lacks fall back to zero.
        let vertices: Vec<Vertex> = positions
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex {
                position: *position,
                normal: normals.get(i).copied().unwrap_or([0.0; 3]),
                tex_coords: tex_coords.get(i).copied().unwrap_or([0.0; 2]),
            })
            .collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };

        let bindings = self.build_texture_bindings(&primitive.material(), cache);
        self.meshes.push(Mesh::new(vertices, indices, bindings, None));
    }

    /// Resolves the material's texture slots into a binding table. The
    /// height category of the naming scheme has no glTF slot and stays
    /// empty.
    fn build_texture_bindings(
        &mut self,
        material: &gltf::Material,
        cache: &mut ResourceCache,
    ) -> BTreeMap<String, SharedTexture> {
        let pbr = material.pbr_metallic_roughness();
        let categories: [(&str, Option<gltf::texture::Texture>); 5] = [
            (DIFFUSE, pbr.base_color_texture().map(|info| info.texture())),
            (
                SPECULAR,
                pbr.metallic_roughness_texture().map(|info| info.texture()),
            ),
            (
                AMBIENT,
                material.occlusion_texture().map(|info| info.texture()),
            ),
            (NORMAL, material.normal_texture().map(|info| info.texture())),
            // glTF materials carry no height-map slot; the category exists
            // only in the binding-name scheme.
            (HEIGHT, None),
        ];

        let mut bindings = BTreeMap::new();
        for (label, texture) in categories {
            let mut bound = 0;
            if let Some(texture) = texture {
                if let Some(shared) = self.resolve_material_texture(&texture, cache) {
                    bound += 1;
                    bindings.insert(binding_name(label, bound), shared);
                }
            }
        }
        bindings
    }

    /// Loads one material texture through the de-duplication cache. Missing
    /// files and embedded images are skipped with a diagnostic.
    fn resolve_material_texture(
        &mut self,
        texture: &gltf::texture::Texture,
        cache: &mut ResourceCache,
    ) -> Option<SharedTexture> {
        let uri = match texture.source().source() {
            gltf::image::Source::Uri { uri, .. } => uri,
            gltf::image::Source::View { .. } => {
                warn!("embedded texture images are not supported; skipping");
                return None;
            }
        };

        let mut texture_path = PathBuf::from(uri);
        if texture_path.is_relative() {
            texture_path = self.directory.join(texture_path);
        }
        if !texture_path.exists() {
            warn!(
                "texture file {} not found; skipping",
                texture_path.display()
            );
            return None;
        }

        let shared = cache.load_texture(&texture_path)?;
        if !self
            .textures
            .iter()
            .any(|existing| Rc::ptr_eq(existing, &shared))
        {
            self.textures.push(Rc::clone(&shared));
        }
        Some(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;

    #[test]
    fn binding_names_are_label_plus_one_based_index() {
        assert_eq!(binding_name(DIFFUSE, 1), "diffuse1");
        assert_eq!(binding_name(SPECULAR, 2), "specular2");
    }

    #[test]
    fn missing_file_yields_empty_model() {
        let mut cache = ResourceCache::new();
        let model = Model::load("/definitely/not/here.gltf", &mut cache);
        assert!(model.is_empty());
        assert!(model.textures().is_empty());
    }

    #[test]
    fn corrupt_file_yields_empty_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gltf");
        std::fs::write(&path, b"{ not gltf ]").unwrap();

        let mut cache = ResourceCache::new();
        let model = Model::load(&path, &mut cache);
        assert!(model.is_empty());
    }

    #[test]
    fn triangle_extracts_vertices_and_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_fixtures::write_triangle_gltf(dir.path());

        let mut cache = ResourceCache::new();
        let model = Model::load(&path, &mut cache);

        assert_eq!(model.meshes().len(), 1);
        let mesh = &model.meshes()[0];
        assert_eq!(mesh.indices(), &[0, 1, 2]);

        let vertices = mesh.vertices();
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[2].position, [0.0, 1.0, 0.0]);
        // No texcoords in the source: fall back to zero.
        assert!(vertices.iter().all(|v| v.tex_coords == [0.0, 0.0]));
    }

    #[test]
    fn node_tree_is_traversed_and_textures_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_fixtures::write_textured_gltf(dir.path());

        let mut cache = ResourceCache::new();
        let model = Model::load(&path, &mut cache);

        // Two meshes: one on the root node, one on its child.
        assert_eq!(model.meshes().len(), 2);

        // Both materials reference the same image file; exactly one decoded
        // texture exists and both binding tables share it.
        assert_eq!(model.textures().len(), 1);
        assert_eq!(cache.live_texture_count(), 1);
        let first = model.meshes()[0].texture_bindings().get("diffuse1").unwrap();
        let second = model.meshes()[1].texture_bindings().get("diffuse1").unwrap();
        assert!(Rc::ptr_eq(first, second));
        assert!(first.borrow().is_loaded());
    }

    #[test]
    fn unindexed_primitive_gets_sequential_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_fixtures::write_textured_gltf(dir.path());

        let mut cache = ResourceCache::new();
        let model = Model::load(&path, &mut cache);

        // The child node's primitive carries no index accessor.
        assert_eq!(model.meshes()[1].indices(), &[0, 1, 2]);
    }
}
