//! Procedural icosphere mesh generation.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::collections::HashMap;

/// Vertex data for the sphere mesh (position + normal)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Unit icosphere: a subdivided icosahedron projected onto the sphere.
/// For a unit sphere centered at the origin the normal equals the position.
pub struct SphereMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl SphereMesh {
    /// Build an icosphere with the given subdivision level.
    ///
    /// Level 0 is the bare icosahedron (12 vertices, 20 faces); each level
    /// splits every triangle into four.
    pub fn icosphere(subdivisions: u32) -> Self {
        // Golden-ratio icosahedron
        let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let mut positions: Vec<Vec3> = [
            (-1.0, phi, 0.0),
            (1.0, phi, 0.0),
            (-1.0, -phi, 0.0),
            (1.0, -phi, 0.0),
            (0.0, -1.0, phi),
            (0.0, 1.0, phi),
            (0.0, -1.0, -phi),
            (0.0, 1.0, -phi),
            (phi, 0.0, -1.0),
            (phi, 0.0, 1.0),
            (-phi, 0.0, -1.0),
            (-phi, 0.0, 1.0),
        ]
        .iter()
        .map(|&(x, y, z)| Vec3::new(x, y, z).normalize())
        .collect();

        let mut faces: Vec<[u32; 3]> = vec![
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        for _ in 0..subdivisions {
            let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
            let mut next_faces = Vec::with_capacity(faces.len() * 4);

            // Shared midpoint lookup keeps the mesh watertight
            let mut midpoint = |a: u32, b: u32, positions: &mut Vec<Vec3>| -> u32 {
                let key = if a < b { (a, b) } else { (b, a) };
                *midpoints.entry(key).or_insert_with(|| {
                    let mid = ((positions[a as usize] + positions[b as usize]) / 2.0).normalize();
                    positions.push(mid);
                    (positions.len() - 1) as u32
                })
            };

            for [a, b, c] in faces {
                let ab = midpoint(a, b, &mut positions);
                let bc = midpoint(b, c, &mut positions);
                let ca = midpoint(c, a, &mut positions);

                next_faces.push([a, ab, ca]);
                next_faces.push([b, bc, ab]);
                next_faces.push([c, ca, bc]);
                next_faces.push([ab, bc, ca]);
            }

            faces = next_faces;
        }

        let vertices = positions
            .iter()
            .map(|p| Vertex {
                position: p.to_array(),
                normal: p.to_array(),
            })
            .collect();

        let indices = faces.iter().flatten().copied().collect();

        Self { vertices, indices }
    }
}
