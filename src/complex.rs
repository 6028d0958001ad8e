//! Minimal complex number types used by the spectrum/DFT toolkit.
//!
//! The crate hand-rolls these rather than reaching for a linear-algebra
//! crate: the DFT/Spectrum layer only ever needs basic arithmetic and
//! magnitude/conjugate, and a two-field plain-old-data struct keeps
//! `Array` byte-reinterpretation straightforward.

use std::ops::{Add, Div, Mul, Sub};

use crate::array::{Element, TypeTag};

/// A double-precision complex number, laid out as two adjacent `f64`s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Complex64 {
    /// Real part.
    pub re: f64,
    /// Imaginary part.
    pub im: f64,
}

impl Complex64 {
    /// The complex number `re + 0i`.
    pub fn real(re: f64) -> Self {
        Complex64 { re, im: 0.0 }
    }

    /// Zero.
    pub fn zero() -> Self {
        Complex64 { re: 0.0, im: 0.0 }
    }

    /// Constructs from polar form (magnitude, angle in radians).
    pub fn from_polar(r: f64, theta: f64) -> Self {
        Complex64 {
            re: r * theta.cos(),
            im: r * theta.sin(),
        }
    }

    /// Magnitude (`|z|`).
    pub fn abs(&self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Squared magnitude (`|z|^2`), avoiding a sqrt.
    pub fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// Complex conjugate.
    pub fn conj(&self) -> Self {
        Complex64 {
            re: self.re,
            im: -self.im,
        }
    }

    /// Phase angle in radians.
    pub fn arg(&self) -> f64 {
        self.im.atan2(self.re)
    }
}

impl Add for Complex64 {
    type Output = Complex64;
    fn add(self, rhs: Self) -> Self {
        Complex64 {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl Sub for Complex64 {
    type Output = Complex64;
    fn sub(self, rhs: Self) -> Self {
        Complex64 {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl Mul for Complex64 {
    type Output = Complex64;
    fn mul(self, rhs: Self) -> Self {
        Complex64 {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl Mul<f64> for Complex64 {
    type Output = Complex64;
    fn mul(self, rhs: f64) -> Self {
        Complex64 {
            re: self.re * rhs,
            im: self.im * rhs,
        }
    }
}

impl Div<f64> for Complex64 {
    type Output = Complex64;
    fn div(self, rhs: f64) -> Self {
        Complex64 {
            re: self.re / rhs,
            im: self.im / rhs,
        }
    }
}

impl Div for Complex64 {
    type Output = Complex64;
    fn div(self, rhs: Self) -> Self {
        let d = rhs.norm_sqr();
        Complex64 {
            re: (self.re * rhs.re + self.im * rhs.im) / d,
            im: (self.im * rhs.re - self.re * rhs.im) / d,
        }
    }
}

unsafe impl Element for Complex64 {
    const TAG: TypeTag = TypeTag::ComplexF64;
}
