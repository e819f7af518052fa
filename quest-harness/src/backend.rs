//! The seam between the harness and a simulator implementation.

use std::fmt;

use quest_types::Complex;

use crate::catalogue::Signature;
use crate::error::Result;
use crate::marshal::{Arg, Value};
use crate::state::StateSnapshot;

/// Handle to a register owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterId(u64);

impl RegisterId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A simulator the harness can drive.
///
/// [`NativeBackend`](crate::native::NativeBackend) forwards everything to the
/// QuEST shared library; tests plug in an in-process fake.
pub trait Backend {
    /// Create a state vector, or a density matrix when `density` is set.
    fn create_register(&mut self, num_qubits: i32, density: bool) -> Result<RegisterId>;

    fn destroy_register(&mut self, register: RegisterId) -> Result<()>;

    fn init_zero_state(&mut self, register: RegisterId) -> Result<()>;

    fn init_plus_state(&mut self, register: RegisterId) -> Result<()>;

    fn init_debug_state(&mut self, register: RegisterId) -> Result<()>;

    fn init_classical_state(&mut self, register: RegisterId, state: i64) -> Result<()>;

    /// Overwrite amplitudes starting at `start`; `reals` and `imags` have equal length.
    fn set_amps(&mut self, register: RegisterId, start: i64, reals: &[f64], imags: &[f64]) -> Result<()>;

    fn num_qubits(&self, register: RegisterId) -> Result<i32>;

    fn is_density_matrix(&self, register: RegisterId) -> Result<bool>;

    /// Total number of stored amplitudes (4^n for density matrices).
    fn num_amps(&self, register: RegisterId) -> Result<i64>;

    fn amp(&mut self, register: RegisterId, index: i64) -> Result<Complex>;

    fn density_amp(&mut self, register: RegisterId, row: i64, col: i64) -> Result<Complex>;

    /// Whether `name` can be called through [`Backend::call`].
    fn has_function(&self, name: &str) -> bool;

    /// Invoke `signature.name` with already coerced arguments.
    fn call(&mut self, signature: &Signature, args: &[Arg]) -> Result<Value>;

    /// Copy the register contents out in storage order.
    fn snapshot(&mut self, register: RegisterId) -> Result<StateSnapshot> {
        let num_qubits = self.num_qubits(register)?;
        let is_density = self.is_density_matrix(register)?;

        let mut amps = Vec::with_capacity(StateSnapshot::amps_for(num_qubits, is_density));
        if is_density {
            let dim = 1i64 << num_qubits;
            for col in 0..dim {
                for row in 0..dim {
                    amps.push(self.density_amp(register, row, col)?);
                }
            }
        } else {
            for index in 0..self.num_amps(register)? {
                amps.push(self.amp(register, index)?);
            }
        }

        Ok(StateSnapshot::new(num_qubits, is_density, amps))
    }
}
