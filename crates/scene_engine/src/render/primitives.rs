//! Primitive geometry for tests and demos

use super::mesh::Vertex;

/// Unit cube spanning -1..1 on every axis: 8 vertices, 36 indices
pub fn cube() -> (Vec<Vertex>, Vec<u32>) {
    let vertices = vec![
        // Front face
        Vertex::new([-1.0, -1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        Vertex::new([1.0, -1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
        Vertex::new([1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
        Vertex::new([-1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        // Back face
        Vertex::new([-1.0, -1.0, -1.0], [0.0, 0.0, -1.0], [1.0, 0.0]),
        Vertex::new([-1.0, 1.0, -1.0], [0.0, 0.0, -1.0], [1.0, 1.0]),
        Vertex::new([1.0, 1.0, -1.0], [0.0, 0.0, -1.0], [0.0, 1.0]),
        Vertex::new([1.0, -1.0, -1.0], [0.0, 0.0, -1.0], [0.0, 0.0]),
    ];

    let indices = vec![
        // Front
        0, 1, 2, 2, 3, 0,
        // Back
        4, 5, 6, 6, 7, 4,
        // Left
        4, 0, 3, 3, 5, 4,
        // Right
        1, 7, 6, 6, 2, 1,
        // Top
        3, 2, 6, 6, 5, 3,
        // Bottom
        4, 7, 1, 1, 0, 4,
    ];

    (vertices, indices)
}

/// Unit quad in the XY plane facing +Z: 4 vertices, 6 indices
pub fn quad() -> (Vec<Vertex>, Vec<u32>) {
    let vertices = vec![
        Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        Vertex::new([0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
        Vertex::new([0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
        Vertex::new([-0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
    ];

    (vertices, vec![0, 1, 2, 2, 3, 0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_sizes() {
        let (vertices, indices) = cube();
        assert_eq!(vertices.len(), 8);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));

        let (vertices, indices) = quad();
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }
}
