//! Estruturas C da biblioteca QuEST
//!
//! `Qureg` e `QuESTEnv` são passados por valor para quase todas as funções
//! da API; a ordem e o tipo dos campos seguem o header `QuEST.h`.

use std::ffi::{c_char, c_int, c_longlong};
use std::ptr;

/// Par de ponteiros para as partes real e imaginária de um vetor de amplitudes
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct ComplexArray {
    pub real: *mut f64,
    pub imag: *mut f64,
}

impl ComplexArray {
    /// Vista sobre dois buffers do chamador
    ///
    /// Os ponteiros só são válidos enquanto `reals` e `imags` viverem.
    pub fn from_slices(reals: &mut [f64], imags: &mut [f64]) -> Self {
        Self {
            real: reals.as_mut_ptr(),
            imag: imags.as_mut_ptr(),
        }
    }
}

impl Default for ComplexArray {
    fn default() -> Self {
        Self {
            real: ptr::null_mut(),
            imag: ptr::null_mut(),
        }
    }
}

/// Buffer do log QASM mantido pela biblioteca
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct QasmLogger {
    pub buffer: *mut c_char,
    pub buffer_size: c_int,
    pub buffer_fill: c_int,
    pub is_logging: c_int,
}

/// Registrador quântico: vetor de estado ou matriz densidade
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct Qureg {
    pub is_density_matrix: c_int,
    pub num_qubits_represented: c_int,
    pub num_qubits_in_state_vec: c_int,
    pub num_amps_per_chunk: c_longlong,
    pub num_amps_total: c_longlong,
    pub chunk_id: c_int,
    pub num_chunks: c_int,
    pub state_vec: ComplexArray,
    pub pair_state_vec: ComplexArray,
    pub device_state_vec: ComplexArray,
    pub first_level_reduction: *mut f64,
    pub second_level_reduction: *mut f64,
    pub qasm_log: *mut QasmLogger,
}

impl Qureg {
    pub fn is_density(&self) -> bool {
        self.is_density_matrix != 0
    }
}

/// Ambiente de execução (`QuESTEnv`)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct QuestEnv {
    pub rank: c_int,
    pub num_ranks: c_int,
}
