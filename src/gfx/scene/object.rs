use cgmath::Point3;

use super::{material::Material, vertex::Vertex3D};

/// Triangle mesh of a loaded model
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    /// Index into the owning model's material list
    pub material_index: Option<usize>,
}

impl Mesh {
    /// Builds a mesh from flat attribute arrays as tobj returns them.
    ///
    /// `texcoords` holds OBJ coordinates (origin bottom-left) and may be empty,
    /// in which case every vertex samples the map at (0, 0).
    pub fn new(
        name: impl Into<String>,
        positions: &[f32],
        normals: &[f32],
        texcoords: &[f32],
        indices: Vec<u32>,
        material_index: Option<usize>,
    ) -> Self {
        let vertices = positions
            .chunks_exact(3)
            .zip(normals.chunks_exact(3))
            .enumerate()
            .map(|(i, (p, n))| {
                let uv = match texcoords.get(i * 2..i * 2 + 2) {
                    Some(uv) => [uv[0], 1.0 - uv[1]],
                    None => [0.0, 0.0],
                };
                Vertex3D::new([p[0], p[1], p[2]], [n[0], n[1], n[2]], uv)
            })
            .collect();

        Self {
            name: name.into(),
            vertices,
            indices,
            material_index,
        }
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count() / 3
    }

    /// Smooth per-vertex normals from face normals, for OBJ files without `vn`
    pub fn calculate_face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
        let vertex_count = positions.len() / 3;
        let mut normals = vec![0.0; positions.len()];
        let mut counts = vec![0u32; vertex_count];

        let vertex = |i: usize| [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]];

        for triangle in indices.chunks_exact(3) {
            let i0 = triangle[0] as usize;
            let i1 = triangle[1] as usize;
            let i2 = triangle[2] as usize;
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let (v0, v1, v2) = (vertex(i0), vertex(i1), vertex(i2));
            let edge1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
            let edge2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

            let face_normal = [
                edge1[1] * edge2[2] - edge1[2] * edge2[1],
                edge1[2] * edge2[0] - edge1[0] * edge2[2],
                edge1[0] * edge2[1] - edge1[1] * edge2[0],
            ];

            for &vertex_idx in &[i0, i1, i2] {
                normals[vertex_idx * 3] += face_normal[0];
                normals[vertex_idx * 3 + 1] += face_normal[1];
                normals[vertex_idx * 3 + 2] += face_normal[2];
                counts[vertex_idx] += 1;
            }
        }

        for i in 0..vertex_count {
            if counts[i] == 0 {
                continue;
            }
            let n = &mut normals[i * 3..i * 3 + 3];
            let length = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            if length > 0.0 {
                n.iter_mut().for_each(|c| *c /= length);
            }
        }

        normals
    }
}

/// A model decoded from an OBJ/MTL pair
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    /// Builds a model from tobj output, binding meshes to `materials` by index.
    pub fn from_tobj(name: &str, models: &[tobj::Model], materials: Vec<Material>) -> Self {
        let meshes = models
            .iter()
            .map(|m| {
                let mesh = &m.mesh;
                let normals = if !mesh.normals.is_empty()
                    && mesh.normals.len() == mesh.positions.len()
                {
                    mesh.normals.clone()
                } else {
                    Mesh::calculate_face_normals(&mesh.positions, &mesh.indices)
                };
                let material_index = mesh.material_id.filter(|&id| id < materials.len());
                Mesh::new(
                    m.name.clone(),
                    &mesh.positions,
                    &normals,
                    &mesh.texcoords,
                    mesh.indices.clone(),
                    material_index,
                )
            })
            .collect();

        Self {
            name: name.to_string(),
            meshes,
            materials,
        }
    }

    pub fn material_for(&self, mesh: &Mesh) -> Option<&Material> {
        mesh.material_index.and_then(|i| self.materials.get(i))
    }

    pub fn vertex_count(&self) -> u32 {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> u32 {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Axis-aligned bounds of all vertices in model space
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let mut positions = self
            .meshes
            .iter()
            .flat_map(|m| m.vertices().iter().map(|v| v.position));
        let first = positions.next()?;
        let (min, max) = positions.fold((first, first), |(mut min, mut max), p| {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
            (min, max)
        });
        Some((Point3::from(min), Point3::from(max)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_positions() -> Vec<f32> {
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
    }

    #[test]
    fn face_normals_point_along_winding() {
        let normals = Mesh::calculate_face_normals(&triangle_positions(), &[0, 1, 2]);
        assert_eq!(normals, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let normals = Mesh::calculate_face_normals(&triangle_positions(), &[0, 1, 7]);
        assert!(normals.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn texcoords_are_flipped_to_top_left_origin() {
        let positions = triangle_positions();
        let normals = Mesh::calculate_face_normals(&positions, &[0, 1, 2]);
        let mesh = Mesh::new("tri", &positions, &normals, &[0.0, 0.0, 1.0, 0.25], vec![0, 1, 2], None);

        assert_eq!(mesh.vertices()[0].tex_coords, [0.0, 1.0]);
        assert_eq!(mesh.vertices()[1].tex_coords, [1.0, 0.75]);
        // no coordinate for the third vertex
        assert_eq!(mesh.vertices()[2].tex_coords, [0.0, 0.0]);
    }

    #[test]
    fn model_bounds_and_counts() {
        let positions = triangle_positions();
        let normals = Mesh::calculate_face_normals(&positions, &[0, 1, 2]);
        let model = Model {
            name: "tri".into(),
            meshes: vec![Mesh::new("tri", &positions, &normals, &[], vec![0, 1, 2], Some(4))],
            materials: vec![Material::default()],
        };

        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.triangle_count(), 1);
        let (min, max) = model.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));
        // dangling material index falls back to nothing
        assert!(model.material_for(&model.meshes[0]).is_none());
    }
}
