use std::f32::consts::PI;

use crate::model::{MeshData, ModelVertex, Submesh};

/// Generates a UV sphere as a single triangle-list submesh.
///
/// `sector_count` is clamped to at least 3 and `stack_count` to at least 2.
pub fn generate_sphere(radius: f32, sector_count: u32, stack_count: u32) -> MeshData {
    let sector_count = sector_count.max(3);
    let stack_count = stack_count.max(2);

    let mut vertices: Vec<ModelVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    let sector_step = 2.0 * PI / sector_count as f32;
    let stack_step = PI / stack_count as f32;

    // Build the vertex buffer data (position, normal), pole to pole
    for i in 0..=stack_count {
        let stack_angle = PI / 2.0 - i as f32 * stack_step;
        let xy = stack_angle.cos();
        let z = stack_angle.sin();

        for j in 0..=sector_count {
            let sector_angle = j as f32 * sector_step;
            let normal = [xy * sector_angle.cos(), xy * sector_angle.sin(), z];

            vertices.push(ModelVertex {
                position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
            })
        }
    }

    // We emit two triangles per quad as we loop, with `k1` being the top
    // vertices and `k2` being the bottom vertices. The first and last stacks
    // collapse to a single triangle at the poles.
    //  k1--k1+1
    //  |  / |
    //  | /  |
    //  k2--k2+1
    for i in 0..stack_count {
        // Top row
        let mut k1 = i * (sector_count + 1);
        // Bottom row
        let mut k2 = k1 + (sector_count + 1);

        for _j in 0..sector_count {
            if i != 0 {
                indices.extend_from_slice(&[k1, k2, k1 + 1]);
            }

            if i != stack_count - 1 {
                indices.extend_from_slice(&[k1 + 1, k2, k2 + 1]);
            }

            k1 += 1;
            k2 += 1;
        }
    }

    let index_count = indices.len() as u32;
    MeshData {
        name: format!("sphere_r{}_{}x{}", radius, sector_count, stack_count),
        vertices,
        indices,
        submeshes: vec![Submesh {
            index_start: 0,
            index_count,
        }],
    }
}
