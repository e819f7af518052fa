//! Conversão de tokens de arquivos de teste em valores

use crate::complex::{Complex, ComplexMatrix2, Vector};
use crate::error::{TypesError, TypesResult};

/// Lista de reais separados por vírgula: `"0.5,1,-2e-3"`
pub fn parse_reals(token: &str) -> TypesResult<Vec<f64>> {
    token
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| TypesError::BadArray(token.to_string()))
        })
        .collect()
}

/// Lista de inteiros separados por vírgula: `"0,1,2"`
pub fn parse_ints(token: &str) -> TypesResult<Vec<i64>> {
    token
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| TypesError::BadArray(token.to_string()))
        })
        .collect()
}

/// Complexo no formato `(re,im)`; os parênteses são opcionais
pub fn parse_complex(token: &str) -> TypesResult<Complex> {
    let inner = token.trim().trim_start_matches('(').trim_end_matches(')');
    let parts = parse_reals(inner)?;
    Complex::from_reals(&parts)
}

fn expect_len(kind: &'static str, values: &[f64], expected: usize) -> TypesResult<()> {
    if values.len() != expected {
        return Err(TypesError::WrongLength {
            kind,
            expected,
            received: values.len(),
        });
    }
    Ok(())
}

impl Complex {
    /// `[re, im]`
    pub fn from_reals(values: &[f64]) -> TypesResult<Self> {
        expect_len("Complex", values, 2)?;
        Ok(Self::new(values[0], values[1]))
    }
}

impl Vector {
    /// `[x, y, z]`
    pub fn from_reals(values: &[f64]) -> TypesResult<Self> {
        expect_len("Vector", values, 3)?;
        Ok(Self::new(values[0], values[1], values[2]))
    }
}

impl ComplexMatrix2 {
    /// Oito reais intercalados (re, im) em ordem de linha
    pub fn from_reals(values: &[f64]) -> TypesResult<Self> {
        expect_len("ComplexMatrix2", values, 8)?;
        let c = |i: usize| Complex::new(values[2 * i], values[2 * i + 1]);
        Ok(Self::new(c(0), c(1), c(2), c(3)))
    }
}

/// Separa reais intercalados em (partes reais, partes imaginárias)
pub fn split_interleaved(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let reals = values.iter().step_by(2).copied().collect();
    let imags = values.iter().skip(1).step_by(2).copied().collect();
    (reals, imags)
}
