//! Mesh pieces and tangent-space computation

use glam::{Vec2, Vec3, Vec4};

/// One renderable piece of a chunk: a center patch or one border variant.
///
/// `normals` and `tangents` are empty until computed; when present they
/// have one entry per vertex. Tangent `w` holds the bitangent sign.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshPiece {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
}

impl MeshPiece {
    /// Build a piece from positions, deriving UVs as `xy * uv_scale`
    pub fn from_positions(vertices: Vec<Vec3>, uv_scale: f32) -> Self {
        let uvs = vertices.iter().map(|v| Vec2::new(v.x, v.y) * uv_scale).collect();
        Self { vertices, uvs, ..Default::default() }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Index count is a multiple of 3, every index is in range and each
    /// attribute array is either empty or one entry per vertex.
    pub fn is_well_formed(&self) -> bool {
        let n = self.vertices.len();
        let attr_ok = |len: usize| len == 0 || len == n;

        self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < n)
            && attr_ok(self.uvs.len())
            && attr_ok(self.normals.len())
            && attr_ok(self.tangents.len())
    }

    /// Fill normals and tangents using the given solver
    pub fn compute_tangents(&mut self, solver: &dyn TangentSolver) {
        let (normals, tangents) = solver.compute(&self.vertices, &self.indices, &self.uvs);
        self.normals = normals;
        self.tangents = tangents;
    }

    /// Copy the listed vertices (with every attribute present) into a new
    /// piece without triangles.
    pub fn extract(&self, picks: &[usize]) -> MeshPiece {
        fn pick<T: Copy>(src: &[T], picks: &[usize]) -> Vec<T> {
            if src.is_empty() {
                Vec::new()
            } else {
                picks.iter().map(|&i| src[i]).collect()
            }
        }

        MeshPiece {
            vertices: pick(&self.vertices, picks),
            indices: Vec::new(),
            uvs: pick(&self.uvs, picks),
            normals: pick(&self.normals, picks),
            tangents: pick(&self.tangents, picks),
        }
    }
}

/// Per-vertex normal and tangent computation
///
/// Pure given its inputs; shared across generation workers.
pub trait TangentSolver: Send + Sync {
    /// Returns one normal and one tangent per vertex
    fn compute(&self, vertices: &[Vec3], indices: &[u32], uvs: &[Vec2]) -> (Vec<Vec3>, Vec<Vec4>);
}

/// Area-weighted smooth normals with UV-aligned tangents
#[derive(Clone, Copy, Debug, Default)]
pub struct FaceWeightedTangents;

const UV_DET_EPSILON: f32 = 1e-12;

impl TangentSolver for FaceWeightedTangents {
    fn compute(&self, vertices: &[Vec3], indices: &[u32], uvs: &[Vec2]) -> (Vec<Vec3>, Vec<Vec4>) {
        let n = vertices.len();
        let has_uvs = uvs.len() == n;

        let mut normals = vec![Vec3::ZERO; n];
        let mut tan = vec![Vec3::ZERO; n];
        let mut bitan = vec![Vec3::ZERO; n];

        for tri in indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0 >= n || i1 >= n || i2 >= n {
                continue;
            }

            let e1 = vertices[i1] - vertices[i0];
            let e2 = vertices[i2] - vertices[i0];
            // Length is twice the triangle area
            let face = e1.cross(e2);
            for i in [i0, i1, i2] {
                normals[i] += face;
            }

            if has_uvs {
                let d1 = uvs[i1] - uvs[i0];
                let d2 = uvs[i2] - uvs[i0];
                let det = d1.x * d2.y - d2.x * d1.y;
                if det.abs() > UV_DET_EPSILON {
                    let r = 1.0 / det;
                    let t = (e1 * d2.y - e2 * d1.y) * r;
                    let b = (e2 * d1.x - e1 * d2.x) * r;
                    for i in [i0, i1, i2] {
                        tan[i] += t;
                        bitan[i] += b;
                    }
                }
            }
        }

        let mut tangents = Vec::with_capacity(n);
        for i in 0..n {
            let mut normal = normals[i].normalize_or_zero();
            if normal == Vec3::ZERO {
                normal = Vec3::Z;
            }
            normals[i] = normal;

            let mut t = (tan[i] - normal * normal.dot(tan[i])).normalize_or_zero();
            if t == Vec3::ZERO {
                t = normal.any_orthonormal_vector();
            }
            let w = if normal.cross(t).dot(bitan[i]) < 0.0 { -1.0 } else { 1.0 };
            tangents.push(t.extend(w));
        }

        (normals, tangents)
    }
}

/// Two triangles per quad over a row-major `cols` x `rows` vertex grid.
///
/// Rows run along +y and columns along +x, so with `(a, b, c), (a, c, d)`
/// every triangle is counter-clockwise seen from +z.
pub fn grid_triangles(cols: usize, rows: usize) -> Vec<u32> {
    if cols < 2 || rows < 2 {
        return Vec::new();
    }

    let mut indices = Vec::with_capacity((cols - 1) * (rows - 1) * 6);
    for y in 0..rows - 1 {
        for x in 0..cols - 1 {
            let a = (y * cols + x) as u32;
            let b = a + 1;
            let c = a + cols as u32 + 1;
            let d = a + cols as u32;
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }
    indices
}

/// Reverse the winding of every triangle in place
pub fn mirror_winding(indices: &mut [u32]) {
    for tri in indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_grid(n: usize) -> MeshPiece {
        let mut vertices = Vec::new();
        for y in 0..n {
            for x in 0..n {
                vertices.push(Vec3::new(x as f32, y as f32, 0.0));
            }
        }
        let mut piece = MeshPiece::from_positions(vertices, 1.0);
        piece.indices = grid_triangles(n, n);
        piece
    }

    #[test]
    fn test_grid_triangle_counts() {
        assert_eq!(grid_triangles(7, 7).len(), 6 * 6 * 6);
        assert_eq!(grid_triangles(7, 4).len(), 6 * 3 * 6);
        assert!(grid_triangles(1, 5).is_empty());
        assert!(grid_triangles(0, 0).is_empty());
    }

    #[test]
    fn test_flat_grid_normals_up() {
        let mut piece = flat_grid(4);
        piece.compute_tangents(&FaceWeightedTangents);

        assert!(piece.is_well_formed());
        for n in &piece.normals {
            assert!((*n - Vec3::Z).length() < 1e-6, "normal {:?}", n);
        }
        for t in &piece.tangents {
            assert!((t.truncate() - Vec3::X).length() < 1e-5, "tangent {:?}", t);
            assert_eq!(t.w, 1.0);
        }
    }

    #[test]
    fn test_mirrored_winding_flips_normals() {
        let mut piece = flat_grid(3);
        mirror_winding(&mut piece.indices);
        piece.compute_tangents(&FaceWeightedTangents);
        for n in &piece.normals {
            assert!((*n + Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_slope_normal_tilts() {
        let mut piece = flat_grid(3);
        for v in &mut piece.vertices {
            v.z = v.x;
        }
        piece.compute_tangents(&FaceWeightedTangents);
        let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
        for n in &piece.normals {
            assert!((*n - expected).length() < 1e-5);
        }
        for (t, n) in piece.tangents.iter().zip(&piece.normals) {
            assert!(t.truncate().dot(*n).abs() < 1e-5);
        }
    }

    #[test]
    fn test_degenerate_uvs_fall_back() {
        let mut piece = flat_grid(2);
        piece.uvs = vec![Vec2::ZERO; 4];
        piece.compute_tangents(&FaceWeightedTangents);
        for (t, n) in piece.tangents.iter().zip(&piece.normals) {
            assert!((t.truncate().length() - 1.0).abs() < 1e-5);
            assert!(t.truncate().dot(*n).abs() < 1e-5);
        }
    }

    #[test]
    fn test_extract_and_well_formed() {
        let mut piece = flat_grid(3);
        piece.compute_tangents(&FaceWeightedTangents);

        let sub = piece.extract(&[0, 1, 3, 4]);
        assert_eq!(sub.vertex_count(), 4);
        assert_eq!(sub.normals.len(), 4);
        assert_eq!(sub.vertices[2], Vec3::new(0.0, 1.0, 0.0));
        assert!(sub.is_well_formed());

        let bad = MeshPiece { vertices: vec![Vec3::ZERO; 2], indices: vec![0, 1, 2], ..Default::default() };
        assert!(!bad.is_well_formed());
        let bad = MeshPiece { vertices: vec![Vec3::ZERO; 3], indices: vec![0, 1], ..Default::default() };
        assert!(!bad.is_well_formed());
    }
}
