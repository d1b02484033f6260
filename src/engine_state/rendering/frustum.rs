//! View-frustum culling in camera space.
//!
//! The frustum is six half-spaces built from the projection parameters
//! directly rather than extracted from a projection matrix, so changing the
//! field of view or the aspect ratio only recomputes the planes it affects.
//! Camera space is right-handed with the camera looking down -z.

use cgmath::{InnerSpace, Point3, Rad, Vector3};

/// A half-space: points with a non-negative distance are inside.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    /// Unit normal pointing into the frustum
    pub normal: Vector3<f32>,
    /// Any point on the plane
    pub origin: Point3<f32>,
}

impl Plane {
    /// Signed distance from the plane to `p` along its normal.
    pub fn distance_to(&self, p: Point3<f32>) -> f32 {
        (p - self.origin).dot(self.normal)
    }
}

const NEAR: usize = 0;
const FAR: usize = 1;
const TOP: usize = 2;
const BOTTOM: usize = 3;
const LEFT: usize = 4;
const RIGHT: usize = 5;

/// Six-plane camera frustum.
#[derive(Clone, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
    half_fov_vertical: Rad<f32>,
    aspect: f32,
}

impl Frustum {
    /// Builds a frustum.
    ///
    /// # Arguments
    /// * `fov` - Full vertical field of view
    /// * `aspect` - Width over height
    /// * `near`, `far` - Clip distances in front of the camera
    pub fn new<F: Into<Rad<f32>>>(fov: F, aspect: f32, near: f32, far: f32) -> Self {
        let origin = Point3::new(0.0, 0.0, 0.0);
        let blank = Plane {
            normal: Vector3::new(0.0, 0.0, 0.0),
            origin,
        };

        let mut planes = [blank; 6];
        planes[NEAR] = Plane {
            normal: Vector3::new(0.0, 0.0, -1.0),
            origin: Point3::new(0.0, 0.0, -near),
        };
        planes[FAR] = Plane {
            normal: Vector3::new(0.0, 0.0, 1.0),
            origin: Point3::new(0.0, 0.0, -far),
        };

        let mut frustum = Self {
            planes,
            half_fov_vertical: Rad(0.0),
            aspect,
        };
        frustum.update_fov(fov);
        frustum
    }

    /// Changes the vertical field of view; recomputes all four side planes.
    pub fn update_fov<F: Into<Rad<f32>>>(&mut self, fov: F) {
        self.half_fov_vertical = fov.into() / 2.0;
        let (s, c) = self.half_fov_vertical.0.sin_cos();
        self.planes[TOP].normal = Vector3::new(0.0, -c, -s);
        self.planes[BOTTOM].normal = Vector3::new(0.0, c, -s);
        self.update_aspect(self.aspect);
    }

    /// Changes the aspect ratio; recomputes only the left and right planes.
    pub fn update_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        let half_fov_horizontal = (self.half_fov_vertical.0.tan() * aspect).atan();
        let (s, c) = half_fov_horizontal.sin_cos();
        self.planes[LEFT].normal = Vector3::new(-c, 0.0, -s);
        self.planes[RIGHT].normal = Vector3::new(c, 0.0, -s);
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Whether a camera-space point is inside every plane.
    pub fn intersects_point(&self, p: Point3<f32>) -> bool {
        self.planes.iter().all(|plane| plane.distance_to(p) >= 0.0)
    }

    /// Whether any part of a camera-space sphere can be inside the frustum.
    ///
    /// A sphere is rejected only when it lies entirely behind one plane, so
    /// some spheres near frustum corners are kept although they're outside.
    pub fn intersects_sphere(&self, center: Point3<f32>, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to(center) >= -radius)
    }
}
