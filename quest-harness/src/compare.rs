//! Tolerance comparisons between observed and expected results.
//!
//! All comparisons are inclusive: a difference equal to the tolerance passes.

use quest_types::Complex;

use crate::error::{HarnessError, Result};
use crate::state::StateSnapshot;

pub fn compare_reals(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Real and imaginary parts are checked separately.
pub fn compare_complex(a: Complex, b: Complex, tolerance: f64) -> bool {
    compare_reals(a.real, b.real, tolerance) && compare_reals(a.imag, b.imag, tolerance)
}

/// Compare two registers amplitude by amplitude.
///
/// Density matrices are compared over every element of the matrix.
pub fn compare_states(a: &StateSnapshot, b: &StateSnapshot, tolerance: f64) -> Result<bool> {
    if a.is_density != b.is_density {
        return Err(HarnessError::NotBothDensity);
    }
    if a.num_qubits != b.num_qubits || a.amps.len() != b.amps.len() {
        return Err(HarnessError::SizeMismatch);
    }

    if a.is_density {
        let dim = a.dim();
        for col in 0..dim {
            for row in 0..dim {
                if !compare_complex(a.density_amp(row, col), b.density_amp(row, col), tolerance) {
                    return Ok(false);
                }
            }
        }
        return Ok(true);
    }

    Ok(a
        .amps
        .iter()
        .zip(&b.amps)
        .all(|(x, y)| compare_complex(*x, *y, tolerance)))
}
