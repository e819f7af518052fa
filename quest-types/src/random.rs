//! Complexos e unitárias aleatórias para testes customizados

use rand::Rng;

use crate::complex::{Complex, ComplexMatrix2};

/// Complexo aleatório de módulo 1
pub fn rand_norm_comp<R: Rng + ?Sized>(rng: &mut R) -> Complex {
    let raw = Complex::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));
    let norm = raw.abs();
    if norm == 0.0 {
        return Complex::ONE;
    }
    raw.scale(1.0 / norm)
}

/// Par (α, β) com |α|² + |β|² = 1
pub fn rand_norm_comp_pair<R: Rng + ?Sized>(rng: &mut R) -> (Complex, Complex) {
    (
        rand_norm_comp(rng) * Complex::SQRT2_INV,
        rand_norm_comp(rng) * Complex::SQRT2_INV,
    )
}

/// Unitária 2x2 aleatória na forma `[[a, b], [-b*, a*]]`
pub fn rand_norm_mat<R: Rng + ?Sized>(rng: &mut R) -> ComplexMatrix2 {
    let (a, b) = rand_norm_comp_pair(rng);
    ComplexMatrix2::new(a, b, Complex::ZERO - b.conj(), a.conj())
}
