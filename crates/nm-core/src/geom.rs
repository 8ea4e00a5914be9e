use core::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(self, other: Self) -> f64 {
        (other - self).norm()
    }

    /// Point at fraction `t` of the way from `self` to `other`.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn normalize(self) -> Self {
        let n = self.norm();
        if n == 0.0 {
            Self::default()
        } else {
            self * (1.0 / n)
        }
    }
}

impl Add<Vec3> for Point3 {
    type Output = Point3;

    fn add(self, rhs: Vec3) -> Self::Output {
        Point3 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub<Vec3> for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Vec3) -> Self::Output {
        Point3 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Sub<Point3> for Point3 {
    type Output = Vec3;

    fn sub(self, rhs: Point3) -> Self::Output {
        Vec3 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Self::Output {
        Vec3 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Self::Output {
        Vec3 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Self::Output {
        Vec3 {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Self::Output {
        rhs * self
    }
}

/// Cumulative arc length along a polyline; `out[0] == 0` and `out.last()` is
/// the total length. Empty input yields an empty vector.
pub fn arc_lengths(points: &[Point3]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    let mut acc = 0.0_f64;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += points[i - 1].distance(*p);
        }
        out.push(acc);
    }
    out
}

/// Distance from `p` to the closed segment `a..b`, together with the segment
/// parameter of the closest point (clamped to `[0, 1]`).
pub fn distance_to_segment(p: Point3, a: Point3, b: Point3) -> (f64, f64) {
    let ab = b - a;
    let len2 = ab.dot(ab);
    if len2 == 0.0 {
        return (p.distance(a), 0.0);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p.distance(a.lerp(b, t)), t)
}

#[cfg(test)]
mod tests {
    use super::{Point3, Vec3, arc_lengths, distance_to_segment};

    #[test]
    fn vec_ops_and_normalize() {
        let a = Vec3::new(3.0, 4.0, 0.0);
        let b = Vec3::new(1.0, -2.0, 2.0);

        assert_eq!(a + b, Vec3::new(4.0, 2.0, 2.0));
        assert_eq!(a - b, Vec3::new(2.0, 6.0, -2.0));
        assert!((a.dot(b) + 5.0).abs() < 1e-12);
        assert!((a.norm() - 5.0).abs() < 1e-12);

        let n = a.normalize();
        assert!((n.norm() - 1.0).abs() < 1e-12);

        let z = Vec3::default().normalize();
        assert_eq!(z, Vec3::default());
    }

    #[test]
    fn cross_is_orthogonal() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(a.cross(b), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn point_vec_ops() {
        let p = Point3::new(2.0, 3.0, 1.0);
        let v = Vec3::new(0.5, -1.0, 2.0);

        assert_eq!(p + v, Point3::new(2.5, 2.0, 3.0));
        assert_eq!(p - v, Point3::new(1.5, 4.0, -1.0));
        assert_eq!(p - Point3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(
            Point3::new(0.0, 0.0, 0.0).lerp(Point3::new(2.0, 4.0, 6.0), 0.5),
            Point3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn arc_lengths_accumulate() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 4.0, 0.0),
            Point3::new(3.0, 4.0, 2.0),
        ];
        assert_eq!(arc_lengths(&pts), vec![0.0, 5.0, 7.0]);
        assert!(arc_lengths(&[]).is_empty());
    }

    #[test]
    fn segment_distance_clamps_to_ends() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(10.0, 0.0, 0.0);

        let (d, t) = distance_to_segment(Point3::new(5.0, 2.0, 0.0), a, b);
        assert!((d - 2.0).abs() < 1e-12);
        assert!((t - 0.5).abs() < 1e-12);

        let (d, t) = distance_to_segment(Point3::new(-3.0, 4.0, 0.0), a, b);
        assert!((d - 5.0).abs() < 1e-12);
        assert_eq!(t, 0.0);
    }
}
