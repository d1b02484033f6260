//! Upload target and draw list for finished chunk meshes.
//!
//! The upload stage hands every freshly built mesh to a [`MeshSink`] on the
//! render thread. [`MeshStore`] is the in-memory sink: it keeps one vertex
//! buffer and live vertex count per chunk, and produces the per-frame list of
//! draw calls for the chunks the camera can see.

use std::collections::HashMap;

use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::engine_state::rendering::frustum::Frustum;
use crate::engine_state::rendering::vertex::PackedVertex;
use crate::engine_state::voxels::chunk::coords::ChunkId;
use crate::engine_state::voxels::chunk::CHUNK_DIMENSION;

/// Receiver of finished chunk meshes.
///
/// Called from the thread that drains the upload queue, which is the only
/// thread that may touch GPU-side buffers.
pub trait MeshSink {
    /// Replaces whatever was stored for `id` with `vertices`.
    fn upload(&mut self, id: ChunkId, coords: Point3<i32>, vertices: &[PackedVertex]);
}

/// One non-indexed triangle-list draw of a chunk.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub chunk_id: ChunkId,
    /// World position of the chunk's local origin, `coords * 16`.
    pub translation: Vector3<f32>,
    pub vertex_count: usize,
}

impl DrawCall {
    /// Model matrix placing the chunk's local vertex positions in the world.
    pub fn world_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
    }
}

/// A chunk mesh as the renderer sees it.
#[derive(Clone, Debug)]
pub struct UploadedMesh {
    pub coords: Point3<i32>,
    pub vertices: Vec<PackedVertex>,
    pub draw_count: usize,
}

impl Default for UploadedMesh {
    fn default() -> Self {
        Self {
            coords: Point3::new(0, 0, 0),
            vertices: Vec::new(),
            draw_count: 0,
        }
    }
}

/// In-memory [`MeshSink`] that backs the draw pass.
#[derive(Default)]
pub struct MeshStore {
    meshes: HashMap<ChunkId, UploadedMesh>,
    uploads: usize,
}

impl MeshSink for MeshStore {
    fn upload(&mut self, id: ChunkId, coords: Point3<i32>, vertices: &[PackedVertex]) {
        let mesh = self.meshes.entry(id).or_default();
        mesh.coords = coords;
        mesh.vertices.clear();
        mesh.vertices.extend_from_slice(vertices);
        mesh.draw_count = vertices.len();
        self.uploads += 1;
    }
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The uploaded mesh of a chunk, if it has one.
    pub fn mesh(&self, id: ChunkId) -> Option<&UploadedMesh> {
        self.meshes.get(&id)
    }

    /// Forgets a chunk's mesh.
    pub fn remove(&mut self, id: ChunkId) -> Option<UploadedMesh> {
        self.meshes.remove(&id)
    }

    /// Number of chunks with an uploaded mesh.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Total uploads received, including re-uploads of the same chunk.
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    /// Sum of live vertex counts over every stored mesh.
    pub fn total_vertices(&self) -> usize {
        self.meshes.values().map(|mesh| mesh.draw_count).sum()
    }

    /// Builds this frame's draw list.
    ///
    /// Each chunk is approximated by its bounding sphere, moved into camera
    /// space with `view` and tested against `frustum`. Empty meshes are
    /// skipped. The list is ordered by chunk id.
    ///
    /// # Arguments
    /// * `view` - World-to-camera matrix
    /// * `frustum` - Camera-space frustum
    pub fn draw_chunks(&self, view: &Matrix4<f32>, frustum: &Frustum) -> Vec<DrawCall> {
        let dim = CHUNK_DIMENSION as f32;
        let radius = Vector3::new(0.5 * dim, 0.5 * dim, 0.5 * dim).magnitude();

        let mut calls: Vec<DrawCall> = self
            .meshes
            .iter()
            .filter(|(_, mesh)| mesh.draw_count > 0)
            .filter_map(|(&chunk_id, mesh)| {
                let coords = mesh.coords.cast::<f32>()?;
                let center = Point3::new(
                    dim * (coords.x + 0.5),
                    dim * (coords.y + 0.5),
                    dim * (coords.z + 0.5),
                );
                let view_center = Point3::from_homogeneous(*view * center.to_homogeneous());

                frustum
                    .intersects_sphere(view_center, radius)
                    .then(|| DrawCall {
                        chunk_id,
                        translation: Vector3::new(coords.x * dim, coords.y * dim, coords.z * dim),
                        vertex_count: mesh.draw_count,
                    })
            })
            .collect();

        calls.sort_by_key(|call| call.chunk_id);
        calls
    }
}
