use ndtree_blocks_core::prelude::*;

/// The leaves of a tree of `max_height` whose centers lie inside the largest sphere centered in the leaf lattice.
pub fn sphere_leaves(max_height: Height) -> Vec<OctreeIndex> {
    let edge_length = 1 << max_height;
    let radius = edge_length as f32 / 2.0;

    let mut leaves = Vec::new();
    for z in 0..edge_length {
        for y in 0..edge_length {
            for x in 0..edge_length {
                let p = PointN([x, y, z]);
                let distance_squared = p
                    .0
                    .iter()
                    .map(|&c| (c as f32 + 0.5 - radius).powi(2))
                    .sum::<f32>();
                if distance_squared < radius * radius {
                    leaves.push(OctreeIndex::new(0, p));
                }
            }
        }
    }

    leaves
}
