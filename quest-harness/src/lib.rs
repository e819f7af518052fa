//! # quest-harness - test runner for the QuEST simulator library
//!
//! Loads a compiled QuEST build, reads per-function `.test` files, calls
//! each function through the FFI with arguments coerced from the file, and
//! compares the resulting states or values within a tolerance.
//!
//! ## Architecture
//!
//! ```text
//! unitPath/<function>.test
//!     ↓ reader      (comments, brackets, tokens)
//! argument tokens
//!     ↓ marshal     (token → Arg by the catalogue signature)
//! Backend::call
//!     ↓ native      (typed extern "C" pointers from libloading)
//! Value / StateSnapshot
//!     ↓ compare     (|a - b| <= tolerance)
//! TestResults → QuESTLog.log
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use quest_harness::{HarnessConfig, NativeBackend, Session};
//!
//! let config = HarnessConfig::default();
//! let backend = NativeBackend::load(&config.library)?;
//! let mut session = Session::init(&config, config.catalogue()?, backend)?;
//! session.run_set("gates")?;
//! let summary = session.finalise()?;
//! assert!(summary.all_passed());
//! # Ok::<(), quest_harness::HarnessError>(())
//! ```

pub mod backend;
pub mod catalogue;
pub mod compare;
pub mod config;
pub mod custom;
pub mod error;
pub mod generate;
pub mod library;
pub mod marshal;
pub mod native;
pub mod reader;
pub mod results;
pub mod session;
pub mod state;

pub use backend::{Backend, RegisterId};
pub use catalogue::{ALL_SET, Catalogue, CatalogueSpec, FunctionSpec, NO_GENERATE_SET, Signature, Testee};
pub use compare::{compare_complex, compare_reals, compare_states};
pub use config::{DEFAULT_TOLERANCE, HarnessConfig};
pub use error::{HarnessError, Result};
pub use generate::{gen_test, gen_tests};
pub use library::NativeLibrary;
pub use marshal::{Arg, CType, Value, coerce};
pub use native::NativeBackend;
pub use reader::{TestFile, first_line_tag, parse_args, remove_brackets};
pub use results::{Summary, TestResults};
pub use session::{CustomTest, RegisterKind, Session};
pub use state::StateSnapshot;
