//! On-disk asset fixtures shared by the loader-facing tests.

use std::path::{Path, PathBuf};

/// A 2x2 RGBA PNG with per-pixel distinct colors.
pub(crate) fn write_png(dir: &Path, name: &str) -> PathBuf {
    let mut image = image::RgbaImage::new(2, 2);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = image::Rgba([(x * 255) as u8, (y * 255) as u8, 0, 255]);
    }
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

/// External buffer shared by the glTF fixtures: three vec3 positions
/// (0,0,0), (1,0,0), (0,1,0) followed by three u32 indices 0, 1, 2.
fn write_triangle_bin(dir: &Path) {
    let mut bytes = Vec::with_capacity(48);
    for value in [
        0.0f32, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0,
    ] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    for index in [0u32, 1, 2] {
        bytes.extend_from_slice(&index.to_le_bytes());
    }
    std::fs::write(dir.join("tri.bin"), bytes).unwrap();
}

/// One node, one mesh, one indexed triangle, no material.
pub(crate) fn write_triangle_gltf(dir: &Path) -> PathBuf {
    write_triangle_bin(dir);
    let json = r#"{
  "asset": {"version": "2.0"},
  "scene": 0,
  "scenes": [{"nodes": [0]}],
  "nodes": [{"mesh": 0}],
  "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
  "buffers": [{"uri": "tri.bin", "byteLength": 48}],
  "bufferViews": [
    {"buffer": 0, "byteOffset": 0, "byteLength": 36},
    {"buffer": 0, "byteOffset": 36, "byteLength": 12}
  ],
  "accessors": [
    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
     "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
    {"bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR"}
  ]
}"#;
    let path = dir.join("triangle.gltf");
    std::fs::write(&path, json).unwrap();
    path
}

/// A root node and a child node, each with a triangle mesh; both materials
/// reference the same image file, and the child's primitive carries no
/// index accessor.
pub(crate) fn write_textured_gltf(dir: &Path) -> PathBuf {
    write_triangle_bin(dir);
    write_png(dir, "checker.png");
    let json = r#"{
  "asset": {"version": "2.0"},
  "scene": 0,
  "scenes": [{"nodes": [0]}],
  "nodes": [
    {"mesh": 0, "children": [1]},
    {"mesh": 1}
  ],
  "meshes": [
    {"primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]},
    {"primitives": [{"attributes": {"POSITION": 0}, "material": 0}]}
  ],
  "materials": [
    {"pbrMetallicRoughness": {"baseColorTexture": {"index": 0}}}
  ],
  "textures": [{"source": 0}],
  "images": [{"uri": "checker.png"}],
  "buffers": [{"uri": "tri.bin", "byteLength": 48}],
  "bufferViews": [
    {"buffer": 0, "byteOffset": 0, "byteLength": 36},
    {"buffer": 0, "byteOffset": 36, "byteLength": 12}
  ],
  "accessors": [
    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
     "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
    {"bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR"}
  ]
}"#;
    let path = dir.join("textured.gltf");
    std::fs::write(&path, json).unwrap();
    path
}
