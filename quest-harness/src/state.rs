//! Owned copies of register contents.

use std::fmt;

use quest_types::Complex;

/// Amplitudes of a state vector or density matrix, in library storage order.
///
/// Density matrices are stored column by column: element `(row, col)` lives
/// at index `row + col * 2^n`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub num_qubits: i32,
    pub is_density: bool,
    pub amps: Vec<Complex>,
}

impl StateSnapshot {
    pub fn new(num_qubits: i32, is_density: bool, amps: Vec<Complex>) -> Self {
        Self {
            num_qubits,
            is_density,
            amps,
        }
    }

    /// Number of stored amplitudes for a register of this shape.
    ///
    /// `num_qubits` must be below 32 for density matrices and below 63 for
    /// state vectors, as checked when registers are prepared.
    pub fn amps_for(num_qubits: i32, is_density: bool) -> usize {
        let represented = if is_density { 2 * num_qubits } else { num_qubits };
        1usize << represented
    }

    /// Side length of the density matrix, or the vector length.
    pub fn dim(&self) -> usize {
        1usize << self.num_qubits
    }

    pub fn amp(&self, index: usize) -> Complex {
        self.amps[index]
    }

    pub fn density_amp(&self, row: usize, col: usize) -> Complex {
        self.amps[row + col * self.dim()]
    }
}

impl fmt::Display for StateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for amp in &self.amps {
            writeln!(f, "{amp}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amps_for() {
        assert_eq!(StateSnapshot::amps_for(3, false), 8);
        assert_eq!(StateSnapshot::amps_for(3, true), 64);
    }

    #[test]
    fn test_density_indexing_is_column_major() {
        let amps = (0..4).map(|i| Complex::new(i as f64, 0.0)).collect();
        let rho = StateSnapshot::new(1, true, amps);
        assert_eq!(rho.density_amp(1, 0).real, 1.0);
        assert_eq!(rho.density_amp(0, 1).real, 2.0);
    }

    #[test]
    fn test_display_one_amp_per_line() {
        let s = StateSnapshot::new(1, false, vec![Complex::ONE, Complex::ZERO]);
        let text = s.to_string();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("(1.0000000000000,"));
    }
}
