//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the two small value types the streaming and
//! rendering code pass around: a rigid node [`Transform`] and axis-aligned [`Bounds`].

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// World transform of the node that owns a point cloud
///
/// Only position and rotation take part in instanced point placement; the
/// per-point scale comes from the renderer's point size instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub const fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Move a node-local point into world space
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.rotation * point + self.position
    }
}

/// Build a translation + uniform scale matrix with no rotation
pub fn translation_scale(translation: &Vec3, scale: f32) -> Mat4 {
    Mat4::new_translation(translation) * Mat4::new_scaling(scale)
}

/// Axis-aligned bounding volume stored as center + half extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Center of the box
    pub center: Vec3,
    /// Half size along each axis
    pub extents: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            center: Vec3::zeros(),
            extents: Vec3::zeros(),
        }
    }
}

impl Bounds {
    /// Create bounds from a center and half extents
    pub const fn new(center: Vec3, extents: Vec3) -> Self {
        Self { center, extents }
    }

    /// Smallest bounds enclosing every point, or empty bounds at the origin
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };

        let (min, max) = points.iter().skip(1).fold((*first, *first), |(min, max), p| {
            (min.inf(p), max.sup(p))
        });

        Self {
            center: (min + max) * 0.5,
            extents: (max - min) * 0.5,
        }
    }

    /// Same center, extents grown by `extra` on every axis
    pub fn expanded_by(&self, extra: &Vec3) -> Self {
        Self {
            center: self.center,
            extents: self.extents + extra,
        }
    }

    /// Minimum corner
    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    /// Maximum corner
    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }
}
