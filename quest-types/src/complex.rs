//! # Complex, ComplexMatrix2 e Vector
//!
//! Espelhos `#[repr(C)]` dos tipos de valor da biblioteca QuEST. O layout
//! precisa bater campo a campo com o header C, já que esses valores são
//! passados por valor através da FFI.

use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Número complexo (`Complex` no header C)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Complex {
    pub real: f64,
    pub imag: f64,
}

impl Complex {
    /// Cria número complexo
    pub const fn new(real: f64, imag: f64) -> Self {
        Self { real, imag }
    }

    /// Zero complexo
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Um complexo
    pub const ONE: Self = Self::new(1.0, 0.0);

    /// Unidade imaginária
    pub const I: Self = Self::new(0.0, 1.0);

    /// Meio
    pub const HALF: Self = Self::new(0.5, 0.0);

    /// 1/√2
    pub const SQRT2_INV: Self = Self::new(FRAC_1_SQRT_2, 0.0);

    /// Conjugado
    pub fn conj(self) -> Self {
        Self::new(self.real, -self.imag)
    }

    /// Módulo ao quadrado
    pub fn norm_sq(self) -> f64 {
        self.real * self.real + self.imag * self.imag
    }

    /// Módulo
    pub fn abs(self) -> f64 {
        self.norm_sq().sqrt()
    }

    /// Multiplicação por escalar
    pub fn scale(self, s: f64) -> Self {
        Self::new(self.real * s, self.imag * s)
    }
}

impl Add for Complex {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.real + other.real, self.imag + other.imag)
    }
}

impl Sub for Complex {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.real - other.real, self.imag - other.imag)
    }
}

impl Mul for Complex {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self::new(
            self.real * other.real - self.imag * other.imag,
            self.real * other.imag + self.imag * other.real,
        )
    }
}

impl Div for Complex {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        let denom = other.norm_sq();
        Self::new(
            (self.real * other.real + self.imag * other.imag) / denom,
            (self.imag * other.real - self.real * other.imag) / denom,
        )
    }
}

impl Neg for Complex {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.real, -self.imag)
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:15.13},{:15.13})", self.real, self.imag)
    }
}

/// Matriz 2x2 complexa (`ComplexMatrix2` no header C)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct ComplexMatrix2 {
    pub r0c0: Complex,
    pub r0c1: Complex,
    pub r1c0: Complex,
    pub r1c1: Complex,
}

impl ComplexMatrix2 {
    /// Cria matriz a partir das linhas
    pub const fn new(r0c0: Complex, r0c1: Complex, r1c0: Complex, r1c1: Complex) -> Self {
        Self { r0c0, r0c1, r1c0, r1c1 }
    }

    /// Matriz identidade
    pub const fn identity() -> Self {
        Self::new(Complex::ONE, Complex::ZERO, Complex::ZERO, Complex::ONE)
    }

    /// Determinante
    pub fn determinant(&self) -> Complex {
        self.r0c0 * self.r1c1 - self.r1c0 * self.r0c1
    }

    /// |det|
    pub fn abs(&self) -> f64 {
        self.determinant().abs()
    }

    /// Multiplicação de matrizes
    pub fn mul(&self, other: &ComplexMatrix2) -> ComplexMatrix2 {
        ComplexMatrix2 {
            r0c0: self.r0c0 * other.r0c0 + self.r0c1 * other.r1c0,
            r0c1: self.r0c0 * other.r0c1 + self.r0c1 * other.r1c1,
            r1c0: self.r1c0 * other.r0c0 + self.r1c1 * other.r1c0,
            r1c1: self.r1c0 * other.r0c1 + self.r1c1 * other.r1c1,
        }
    }

    /// Transposta conjugada (dagger)
    pub fn dagger(&self) -> ComplexMatrix2 {
        ComplexMatrix2 {
            r0c0: self.r0c0.conj(),
            r0c1: self.r1c0.conj(),
            r1c0: self.r0c1.conj(),
            r1c1: self.r1c1.conj(),
        }
    }

    /// Verifica se M·M† = I dentro da tolerância
    pub fn is_unitary(&self, tolerance: f64) -> bool {
        let product = self.mul(&self.dagger());
        let identity = Self::identity();

        [
            (product.r0c0, identity.r0c0),
            (product.r0c1, identity.r0c1),
            (product.r1c0, identity.r1c0),
            (product.r1c1, identity.r1c1),
        ]
        .iter()
        .all(|(a, b)| (*a - *b).abs() <= tolerance)
    }
}

impl fmt::Display for ComplexMatrix2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{},{}]", self.r0c0, self.r0c1, self.r1c0, self.r1c1)
    }
}

/// Vetor 3D (`Vector` no header C), usado como eixo de rotação
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const X_DIR: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y_DIR: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z_DIR: Self = Self::new(0.0, 0.0, 1.0);
}

impl Add for Vector {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?},{:?},{:?}]", self.x, self.y, self.z)
    }
}
