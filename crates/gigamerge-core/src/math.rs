//! Math utilities
//!
//! Re-exports from glam plus the bounding volumes used by merged meshes.

pub use glam::{Affine3A, Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from center and half-extents
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the half-extents of the AABB
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Merge with another AABB
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center of the sphere
    pub center: Vec3,
    /// Radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a new bounding sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Box and sphere sharing one origin.
///
/// This is the bounds representation stored on every batch element: the
/// sphere gives a cheap early-out, the box a tighter test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSphereBounds {
    /// Shared center of the box and the sphere
    pub origin: Vec3,
    /// Half-size of the box along each axis
    pub box_extent: Vec3,
    /// Radius of the sphere
    pub sphere_radius: f32,
}

impl BoxSphereBounds {
    /// Zero-sized bounds at the origin
    pub const ZERO: Self = Self {
        origin: Vec3::ZERO,
        box_extent: Vec3::ZERO,
        sphere_radius: 0.0,
    };

    /// Create bounds from all three parts
    pub fn new(origin: Vec3, box_extent: Vec3, sphere_radius: f32) -> Self {
        Self {
            origin,
            box_extent,
            sphere_radius,
        }
    }

    /// Create bounds enclosing an AABB
    pub fn from_aabb(aabb: &Aabb) -> Self {
        let box_extent = aabb.half_extents();
        Self {
            origin: aabb.center(),
            box_extent,
            sphere_radius: box_extent.length(),
        }
    }

    /// Get the box part as an AABB
    pub fn to_aabb(&self) -> Aabb {
        Aabb::from_center_half_extents(self.origin, self.box_extent)
    }

    /// Get the sphere part
    pub fn to_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.origin, self.sphere_radius)
    }

    /// Bounds enclosing both `self` and `other`
    pub fn union(&self, other: &BoxSphereBounds) -> BoxSphereBounds {
        let aabb = self.to_aabb().merge(&other.to_aabb());
        let origin = aabb.center();
        let box_extent = aabb.half_extents();

        let radius = (self.origin.distance(origin) + self.sphere_radius)
            .max(other.origin.distance(origin) + other.sphere_radius)
            .min(box_extent.length());

        Self {
            origin,
            box_extent,
            sphere_radius: radius,
        }
    }

    /// Transform the bounds by an affine transform.
    ///
    /// The origin moves as a point, the box extent goes through the absolute
    /// linear part, and the sphere grows by the largest axis scale.
    pub fn transform_by(&self, transform: &Affine3A) -> BoxSphereBounds {
        let m = transform.matrix3;
        let e = self.box_extent;
        let box_extent = Vec3::from(m.x_axis.abs()) * e.x
            + Vec3::from(m.y_axis.abs()) * e.y
            + Vec3::from(m.z_axis.abs()) * e.z;

        let max_scale = m
            .x_axis
            .length()
            .max(m.y_axis.length())
            .max(m.z_axis.length());

        Self {
            origin: transform.transform_point3(self.origin),
            box_extent,
            sphere_radius: self.sphere_radius * max_scale,
        }
    }
}

impl Default for BoxSphereBounds {
    fn default() -> Self {
        Self::ZERO
    }
}

/// A plane in 3D space (ax + by + cz + d = 0)
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Normal vector
    pub normal: Vec3,
    /// Distance from origin
    pub distance: f32,
}

impl Plane {
    /// Create a new plane
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Get the signed distance from a point to the plane
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Frustum for culling
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Frustum planes (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from a view-projection matrix
    pub fn from_matrix(matrix: Mat4) -> Self {
        let rows = [matrix.row(0), matrix.row(1), matrix.row(2), matrix.row(3)];

        Self {
            planes: [
                Self::normalize_plane(rows[3] + rows[0]),
                Self::normalize_plane(rows[3] - rows[0]),
                Self::normalize_plane(rows[3] + rows[1]),
                Self::normalize_plane(rows[3] - rows[1]),
                // glam projections use a 0..1 depth range
                Self::normalize_plane(rows[2]),
                Self::normalize_plane(rows[3] - rows[2]),
            ],
        }
    }

    fn normalize_plane(plane: Vec4) -> Plane {
        let length = Vec3::new(plane.x, plane.y, plane.z).length();
        if length > 0.0 {
            Plane {
                normal: Vec3::new(plane.x, plane.y, plane.z) / length,
                distance: plane.w / length,
            }
        } else {
            Plane::new(Vec3::ZERO, 0.0)
        }
    }

    /// Check if an AABB intersects the frustum
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            // Find the positive vertex (furthest along the plane normal)
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }

    /// Check if a sphere intersects the frustum
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        for plane in &self.planes {
            if plane.distance_to_point(sphere.center) < -sphere.radius {
                return false;
            }
        }
        true
    }

    /// Sphere early-out, then the box test
    pub fn intersects_bounds(&self, bounds: &BoxSphereBounds) -> bool {
        self.intersects_sphere(&bounds.to_sphere()) && self.intersects_aabb(&bounds.to_aabb())
    }
}
