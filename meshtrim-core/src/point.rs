//! Point and vector aliases

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// Widen a single precision point
#[inline]
pub fn to_point3d(p: &Point3f) -> Point3d {
    Point3d::new(p.x as f64, p.y as f64, p.z as f64)
}

/// Narrow a double precision point
#[inline]
pub fn to_point3f(p: &Point3d) -> Point3f {
    Point3f::new(p.x as f32, p.y as f32, p.z as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_precision_conversion() {
        let p = Point3f::new(1.5, -2.25, 3.0);
        let wide = to_point3d(&p);
        assert_relative_eq!(wide.x, 1.5);
        assert_relative_eq!(wide.y, -2.25);
        let narrow = to_point3f(&wide);
        assert_eq!(narrow, p);
    }
}
