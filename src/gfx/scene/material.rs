//! Surface materials of loaded models
//!
//! Materials come from MTL files. Only the parts the renderer shades with are
//! kept: a base colour, an opacity, a roughness estimate and the decoded
//! diffuse map. Diffuse maps are fetched and decoded during material preload.

use std::{path::PathBuf, sync::Arc};

/// Colour used for meshes without a resolvable material
pub const DEFAULT_BASE_COLOR: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

/// Decoded RGBA8 pixels of a diffuse map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// Decodes an encoded image (PNG, JPEG, TGA or BMP) into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub roughness: f32,
    /// Asset path of the diffuse map, set once it has been decoded
    pub diffuse_texture: Option<PathBuf>,
    pub diffuse_map: Option<Arc<TextureImage>>,
}

impl Material {
    pub fn new(name: &str, base_color: [f32; 4], roughness: f32) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            roughness,
            diffuse_texture: None,
            diffuse_map: None,
        }
    }

    /// Converts a parsed MTL entry. `index` names materials that have no name.
    pub fn from_mtl(mtl: &tobj::Material, index: usize) -> Self {
        let name = if mtl.name.is_empty() {
            format!("material_{}", index)
        } else {
            mtl.name.clone()
        };

        let diffuse = mtl.diffuse.unwrap_or([0.8, 0.8, 0.8]);
        Material::new(
            &name,
            [
                diffuse[0],
                diffuse[1],
                diffuse[2],
                mtl.dissolve.unwrap_or(1.0), // Alpha from dissolve
            ],
            1.0 - (mtl.shininess.unwrap_or(32.0) / 128.0).clamp(0.0, 1.0),
        )
    }

    /// Attaches a decoded diffuse map loaded from `path`.
    pub fn set_diffuse_map(&mut self, path: PathBuf, image: TextureImage) {
        self.diffuse_texture = Some(path);
        self.diffuse_map = Some(Arc::new(image));
    }

    pub fn is_textured(&self) -> bool {
        self.diffuse_map.is_some()
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::new("default", DEFAULT_BASE_COLOR, 0.75)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn mtl_values_map_onto_material() {
        let mtl = tobj::Material {
            name: "hull".to_string(),
            diffuse: Some([0.2, 0.3, 0.4]),
            dissolve: Some(0.5),
            shininess: Some(64.0),
            ..Default::default()
        };
        let material = Material::from_mtl(&mtl, 3);
        assert_eq!(material.name, "hull");
        assert_eq!(material.base_color, [0.2, 0.3, 0.4, 0.5]);
        assert!((material.roughness - 0.5).abs() < 1e-6);
    }

    #[test]
    fn unnamed_mtl_gets_indexed_name_and_defaults() {
        let material = Material::from_mtl(&tobj::Material::default(), 2);
        assert_eq!(material.name, "material_2");
        assert_eq!(material.base_color, DEFAULT_BASE_COLOR);
        assert!(!material.is_textured());
    }

    #[test]
    fn png_decodes_to_rgba() {
        let mut png = Vec::new();
        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let decoded = TextureImage::decode(&png).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.rgba.len(), 3 * 2 * 4);
        assert_eq!(&decoded.rgba[..4], &[10, 20, 30, 255]);

        assert!(TextureImage::decode(b"not an image").is_err());
    }
}
