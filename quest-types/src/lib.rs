//! # quest-types — tipos de valor da API QuEST
//!
//! Espelhos C-compatíveis dos valores trocados com a biblioteca QuEST
//! (`Complex`, `ComplexMatrix2`, `Vector`, `Qureg`, `QuESTEnv`) e a conversão
//! dos tokens textuais dos arquivos `.test` nesses valores.
//!
//! ## Exemplo
//!
//! ```
//! use quest_types::{parse_complex, Complex, ComplexMatrix2};
//!
//! let amp = parse_complex("(0.5,0.0)").unwrap();
//! assert_eq!(amp, Complex::HALF);
//! assert!(ComplexMatrix2::identity().is_unitary(1e-12));
//! ```

pub mod complex;
pub mod error;
pub mod ffi;
pub mod parse;
pub mod random;

pub use complex::{Complex, ComplexMatrix2, Vector};
pub use error::{TypesError, TypesResult};
pub use ffi::{ComplexArray, QasmLogger, QuestEnv, Qureg};
pub use parse::{parse_complex, parse_ints, parse_reals, split_interleaved};
pub use random::{rand_norm_comp, rand_norm_comp_pair, rand_norm_mat};
