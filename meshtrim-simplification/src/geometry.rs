//! Triangle geometry shared by the quality metrics

use meshtrim_core::Point3d;

/// Triangle corners
pub type Triangle = [Point3d; 3];

/// Area of a triangle
#[inline]
pub fn triangle_area(t: &Triangle) -> f64 {
    (t[1] - t[0]).cross(&(t[2] - t[0])).norm() * 0.5
}

/// Normalised aspect ratio `√3·L²/(4A)` with `L` the longest edge.
///
/// Equals 1 for an equilateral triangle and grows without bound as the
/// triangle degenerates; a zero-area triangle yields infinity.
pub fn aspect_ratio(t: &Triangle) -> f64 {
    let longest_sq = [
        (t[1] - t[0]).norm_squared(),
        (t[2] - t[1]).norm_squared(),
        (t[0] - t[2]).norm_squared(),
    ]
    .into_iter()
    .fold(0.0f64, f64::max);
    let area = triangle_area(t);
    if area <= f64::EPSILON * longest_sq.max(f64::MIN_POSITIVE) {
        return f64::INFINITY;
    }
    3.0f64.sqrt() * longest_sq / (4.0 * area)
}

/// Closest point on triangle to point p (Ericson's method).
pub fn closest_point_on_triangle(p: &Point3d, t: &Triangle) -> Point3d {
    let (t0, t1, t2) = (&t[0], &t[1], &t[2]);
    let ab = t1 - t0;
    let ac = t2 - t0;
    let ap = p - t0;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *t0;
    }

    let bp = p - t1;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *t1;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return Point3d::from(t0.coords + ab * v);
    }

    let cp = p - t2;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *t2;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return Point3d::from(t0.coords + ac * w);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return Point3d::from(t1.coords + (t2 - t1) * w);
    }

    let sum = va + vb + vc;
    if sum.abs() <= f64::MIN_POSITIVE {
        // Degenerate triangle
        return *t0;
    }
    let denom = 1.0 / sum;
    let v = vb * denom;
    let w = vc * denom;
    Point3d::from(t0.coords + ab * v + ac * w)
}

/// Euclidean distance from a point to a triangle
#[inline]
pub fn point_triangle_distance(p: &Point3d, t: &Triangle) -> f64 {
    (p - closest_point_on_triangle(p, t)).norm()
}
