use std::ops::{Add, Index, Mul, Neg, Sub};
use serde::{Deserialize, Serialize};
use units::Length;

/// Displacement or direction in 3D. Directions of travel are kept normalized
/// by their users; nothing here enforces it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: Length,
    pub y: Length,
    pub z: Length,
}

pub trait Dot<RHS> {
    type Output;
    fn dot(self, other: RHS) -> Self::Output;
}

impl Dot<Vector> for Vector {
    type Output = Length;
    fn dot(self, other: Vector) -> Self::Output {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl Add for Vector {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Vector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self::Output { Vector::new(-self.x, -self.y, -self.z) }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Vector {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl Mul<Vector> for f64 {
    type Output = Vector;
    fn mul(self, rhs: Vector) -> Self::Output { rhs * self }
}

impl Index<usize> for Vector {
    type Output = Length;
    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("index {index} is out of bounds [0,2]")
        }
    }
}

impl Vector {

    pub fn new(x: Length, y: Length, z: Length) -> Self { Self { x, y, z } }

    pub fn zero() -> Self { Self::new(0.0, 0.0, 0.0) }

    pub fn unit_z() -> Self { Self::new(0.0, 0.0, 1.0) }

    /// Unit vector from polar angle `theta` (measured from +z) and azimuth `phi`
    pub fn from_angles(theta: f64, phi: f64) -> Self {
        let (sin_t, cos_t) = theta.sin_cos();
        let (sin_p, cos_p) = phi.sin_cos();
        Self::new(sin_t * cos_p, sin_t * sin_p, cos_t)
    }

    pub fn magnitude(&self) -> Length {
        let &Self { x, y, z } = self;
        (x*x + y*y + z*z).sqrt()
    }

    pub fn norm(self) -> Length { self.magnitude() }

    pub fn normalize(self) -> Self {
        let m = self.magnitude();
        if m == 0.0 { self } else { self * (1.0 / m) }
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(self.y * other.z - self.z * other.y,
                  self.z * other.x - self.x * other.z,
                  self.x * other.y - self.y * other.x)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

}
