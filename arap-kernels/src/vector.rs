use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A 3D vector. Used for positions, angle triples and per-axis diagonals.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct V3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl V3 {
    /// All zeroes.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// All ones.
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    #[inline(always)]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline(always)]
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    #[inline(always)]
    pub fn dot(&self, rhs: &Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline(always)]
    pub fn magnitude_squared(&self) -> f64 {
        self.dot(self)
    }

    /// Component-wise product.
    #[inline(always)]
    pub fn hadamard(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }

    /// x + y + z
    #[inline(always)]
    pub fn component_sum(&self) -> f64 {
        self.x + self.y + self.z
    }

    /// Largest absolute component.
    #[inline(always)]
    pub fn inf_norm(&self) -> f64 {
        libm::fmax(libm::fmax(self.x.abs(), self.y.abs()), self.z.abs())
    }

    #[inline(always)]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    #[inline(always)]
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Component by axis index (0, 1 or 2).
    #[inline(always)]
    pub fn get(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    #[inline(always)]
    pub fn get_mut(&mut self, axis: usize) -> &mut f64 {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }
}

impl From<[f64; 3]> for V3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl Add for V3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for V3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for V3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for V3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<V3> for f64 {
    type Output = V3;

    fn mul(self, rhs: V3) -> Self::Output {
        rhs * self
    }
}

impl AddAssign for V3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for V3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// Row-major 3x3 matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct M3 {
    /// `rows[r][c]`
    pub rows: [[f64; 3]; 3],
}

impl M3 {
    /// All zeroes.
    pub const ZERO: Self = Self {
        rows: [[0.0; 3]; 3],
    };

    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    #[inline(always)]
    pub const fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self { rows }
    }

    /// Build a matrix whose columns are `c0`, `c1`, `c2`.
    #[inline(always)]
    pub fn from_columns(c0: V3, c1: V3, c2: V3) -> Self {
        Self::from_rows([[c0.x, c1.x, c2.x], [c0.y, c1.y, c2.y], [c0.z, c1.z, c2.z]])
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }

    #[inline(always)]
    pub fn transpose(&self) -> Self {
        let r = &self.rows;
        Self::from_rows([
            [r[0][0], r[1][0], r[2][0]],
            [r[0][1], r[1][1], r[2][1]],
            [r[0][2], r[1][2], r[2][2]],
        ])
    }

    #[inline(always)]
    pub fn diagonal(&self) -> V3 {
        V3::new(self.rows[0][0], self.rows[1][1], self.rows[2][2])
    }

    #[inline(always)]
    fn row(&self, r: usize) -> V3 {
        V3::from(self.rows[r])
    }
}

impl Mul<V3> for M3 {
    type Output = V3;

    fn mul(self, v: V3) -> Self::Output {
        V3::new(self.row(0).dot(&v), self.row(1).dot(&v), self.row(2).dot(&v))
    }
}

impl Mul for M3 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        let mut out = Self::ZERO;
        for r in 0..3 {
            for c in 0..3 {
                out.rows[r][c] = (0..3).map(|k| self.rows[r][k] * rhs.rows[k][c]).sum();
            }
        }
        out
    }
}

impl Mul<f64> for M3 {
    type Output = Self;

    fn mul(mut self, rhs: f64) -> Self::Output {
        self.rows
            .iter_mut()
            .flatten()
            .for_each(|entry| *entry *= rhs);
        self
    }
}

impl Add for M3 {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        for (lhs, rhs) in self.rows.iter_mut().flatten().zip(rhs.rows.iter().flatten()) {
            *lhs += rhs;
        }
        self
    }
}

impl AddAssign for M3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for M3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}
