//! Backend that drives the QuEST shared library.
//!
//! The library is called through typed `extern "C"` function pointers. Each
//! signature shape the catalogue uses has one arm in [`dispatch!`]; a
//! testee whose shape is missing fails with `UnsupportedSignature` instead
//! of being called with a guessed ABI.

use std::collections::HashMap;
use std::ffi::{c_int, c_longlong};
use std::path::Path;

use quest_types::{Complex, ComplexMatrix2, QuestEnv, Qureg, Vector};
use tracing::{debug, warn};

use crate::backend::{Backend, RegisterId};
use crate::catalogue::Signature;
use crate::error::{HarnessError, Result};
use crate::library::NativeLibrary;
use crate::marshal::{Arg, CType, Value};

type Registers = HashMap<RegisterId, Qureg>;

type CreateEnvFn = unsafe extern "C" fn() -> QuestEnv;
type DestroyEnvFn = unsafe extern "C" fn(QuestEnv);
type CreateQuregFn = unsafe extern "C" fn(c_int, QuestEnv) -> Qureg;
type DestroyQuregFn = unsafe extern "C" fn(Qureg, QuestEnv);
type InitFn = unsafe extern "C" fn(Qureg);
type InitClassicalFn = unsafe extern "C" fn(Qureg, c_longlong);
type SetAmpsFn = unsafe extern "C" fn(Qureg, c_longlong, *mut f64, *mut f64, c_longlong);
type GetAmpFn = unsafe extern "C" fn(Qureg, c_longlong) -> Complex;
type GetDensityAmpFn = unsafe extern "C" fn(Qureg, c_longlong, c_longlong) -> Complex;

/// Rust type of each [`CType`] at the ABI level.
macro_rules! c_type {
    (Void) => { () };
    (Int) => { c_int };
    (LongLong) => { c_longlong };
    (Real) => { f64 };
    (Complex) => { Complex };
    (ComplexMatrix2) => { ComplexMatrix2 };
    (Vector) => { Vector };
    (IntPtr) => { *mut c_int };
    (RealPtr) => { *mut f64 };
    (Qureg) => { Qureg };
}

/// Match a signature against the supported shapes and call through the
/// matching function pointer type.
macro_rules! dispatch {
    ($library:expr, $registers:expr, $sig:expr, $args:expr;
     $( $ret:ident ( $($arg:ident),* ) ),* $(,)?) => {
        match ($sig.ret, $sig.args.as_slice()) {
            $(
                (CType::$ret, [$(CType::$arg),*]) => {
                    type Entry = unsafe extern "C" fn($(c_type!($arg)),*) -> c_type!($ret);
                    // SAFETY: the catalogue signature says the symbol has this type.
                    let entry: Entry = unsafe { $library.function::<Entry>(&$sig.name)? };
                    let mut slots = $args.iter();
                    // SAFETY: pointer arguments borrow from `$args`, which
                    // outlives the call.
                    let out = unsafe {
                        entry($(
                            <c_type!($arg) as FromArg>::from_arg(next_slot(&mut slots, &$sig.name)?, $registers)?
                        ),*)
                    };
                    Ok(IntoValue::into_value(out))
                }
            )*
            _ => Err(HarnessError::UnsupportedSignature {
                name: $sig.name.clone(),
                signature: $sig.to_string(),
            }),
        }
    };
}

fn next_slot<'a>(slots: &mut std::slice::Iter<'a, Arg>, func: &str) -> Result<&'a Arg> {
    slots.next().ok_or_else(|| HarnessError::BadArguments {
        func: func.to_string(),
        reason: "too few arguments".to_string(),
    })
}

/// Extract the ABI value for one parameter.
trait FromArg: Sized {
    fn from_arg(arg: &Arg, registers: &Registers) -> Result<Self>;
}

fn mismatch(expected: &str, arg: &Arg) -> HarnessError {
    HarnessError::BadArguments {
        func: String::new(),
        reason: format!("expected {expected}, got {}", arg.type_name()),
    }
}

impl FromArg for c_int {
    fn from_arg(arg: &Arg, _: &Registers) -> Result<Self> {
        match arg {
            Arg::Int(v) => Ok(*v),
            other => Err(mismatch("int", other)),
        }
    }
}

impl FromArg for c_longlong {
    fn from_arg(arg: &Arg, _: &Registers) -> Result<Self> {
        match arg {
            Arg::LongLong(v) => Ok(*v),
            other => Err(mismatch("long long", other)),
        }
    }
}

impl FromArg for f64 {
    fn from_arg(arg: &Arg, _: &Registers) -> Result<Self> {
        match arg {
            Arg::Real(v) => Ok(*v),
            other => Err(mismatch("qreal", other)),
        }
    }
}

impl FromArg for Complex {
    fn from_arg(arg: &Arg, _: &Registers) -> Result<Self> {
        match arg {
            Arg::Complex(v) => Ok(*v),
            other => Err(mismatch("Complex", other)),
        }
    }
}

impl FromArg for ComplexMatrix2 {
    fn from_arg(arg: &Arg, _: &Registers) -> Result<Self> {
        match arg {
            Arg::Matrix2(v) => Ok(*v),
            other => Err(mismatch("ComplexMatrix2", other)),
        }
    }
}

impl FromArg for Vector {
    fn from_arg(arg: &Arg, _: &Registers) -> Result<Self> {
        match arg {
            Arg::Vector(v) => Ok(*v),
            other => Err(mismatch("Vector", other)),
        }
    }
}

impl FromArg for *mut c_int {
    fn from_arg(arg: &Arg, _: &Registers) -> Result<Self> {
        match arg {
            // The library only reads through these pointers.
            Arg::IntArray(v) => Ok(v.as_ptr() as *mut c_int),
            other => Err(mismatch("int*", other)),
        }
    }
}

impl FromArg for *mut f64 {
    fn from_arg(arg: &Arg, _: &Registers) -> Result<Self> {
        match arg {
            Arg::RealArray(v) => Ok(v.as_ptr() as *mut f64),
            other => Err(mismatch("qreal*", other)),
        }
    }
}

impl FromArg for Qureg {
    fn from_arg(arg: &Arg, registers: &Registers) -> Result<Self> {
        match arg {
            Arg::Register(id) => registers.get(id).copied().ok_or(HarnessError::UnknownRegister(*id)),
            other => Err(mismatch("Qureg", other)),
        }
    }
}

trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Void
    }
}

impl IntoValue for c_int {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for c_longlong {
    fn into_value(self) -> Value {
        Value::LongLong(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Real(self)
    }
}

impl IntoValue for Complex {
    fn into_value(self) -> Value {
        Value::Complex(self)
    }
}

/// QuEST loaded from a shared library.
///
/// Owns the library environment and every register it created; both are
/// released on drop.
pub struct NativeBackend {
    library: NativeLibrary,
    env: QuestEnv,
    registers: Registers,
    next_id: u64,
}

impl NativeBackend {
    /// Load the library and create its environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let library = NativeLibrary::load(path)?;
        // SAFETY: createQuESTEnv takes no arguments and returns the env by value.
        let env = unsafe {
            let create: CreateEnvFn = library.function("createQuESTEnv")?;
            create()
        };
        debug!(library = library.path(), rank = env.rank, ranks = env.num_ranks, "QuEST environment created");

        Ok(Self {
            library,
            env,
            registers: HashMap::new(),
            next_id: 0,
        })
    }

    pub fn library_path(&self) -> &str {
        self.library.path()
    }

    fn qureg(&self, register: RegisterId) -> Result<Qureg> {
        self.registers
            .get(&register)
            .copied()
            .ok_or(HarnessError::UnknownRegister(register))
    }

    fn init_with(&mut self, name: &str, register: RegisterId) -> Result<()> {
        let qureg = self.qureg(register)?;
        // SAFETY: all QuEST initialisers take the register by value.
        unsafe {
            let init: InitFn = self.library.function(name)?;
            init(qureg);
        }
        Ok(())
    }

    fn release(&mut self, qureg: Qureg) -> Result<()> {
        // SAFETY: `qureg` came from createQureg/createDensityQureg with this env.
        unsafe {
            let destroy: DestroyQuregFn = self.library.function("destroyQureg")?;
            destroy(qureg, self.env);
        }
        Ok(())
    }
}

impl Backend for NativeBackend {
    fn create_register(&mut self, num_qubits: i32, density: bool) -> Result<RegisterId> {
        let name = if density { "createDensityQureg" } else { "createQureg" };
        // SAFETY: both constructors take (int, QuESTEnv) and return a Qureg.
        let qureg = unsafe {
            let create: CreateQuregFn = self.library.function(name)?;
            create(num_qubits, self.env)
        };

        let id = RegisterId::new(self.next_id);
        self.next_id += 1;
        self.registers.insert(id, qureg);
        debug!(%id, num_qubits, density, "register created");
        Ok(id)
    }

    fn destroy_register(&mut self, register: RegisterId) -> Result<()> {
        let qureg = self
            .registers
            .remove(&register)
            .ok_or(HarnessError::UnknownRegister(register))?;
        self.release(qureg)
    }

    fn init_zero_state(&mut self, register: RegisterId) -> Result<()> {
        self.init_with("initZeroState", register)
    }

    fn init_plus_state(&mut self, register: RegisterId) -> Result<()> {
        self.init_with("initPlusState", register)
    }

    fn init_debug_state(&mut self, register: RegisterId) -> Result<()> {
        self.init_with("initDebugState", register)
    }

    fn init_classical_state(&mut self, register: RegisterId, state: i64) -> Result<()> {
        let qureg = self.qureg(register)?;
        // SAFETY: initClassicalState(Qureg, long long).
        unsafe {
            let init: InitClassicalFn = self.library.function("initClassicalState")?;
            init(qureg, state);
        }
        Ok(())
    }

    fn set_amps(&mut self, register: RegisterId, start: i64, reals: &[f64], imags: &[f64]) -> Result<()> {
        if reals.len() != imags.len() {
            return Err(HarnessError::BadArguments {
                func: "setAmps".to_string(),
                reason: format!("{} real parts but {} imaginary parts", reals.len(), imags.len()),
            });
        }
        let qureg = self.qureg(register)?;
        // SAFETY: setAmps only reads `numAmps` values from each buffer.
        unsafe {
            let set: SetAmpsFn = self.library.function("setAmps")?;
            set(
                qureg,
                start,
                reals.as_ptr() as *mut f64,
                imags.as_ptr() as *mut f64,
                reals.len() as c_longlong,
            );
        }
        Ok(())
    }

    fn num_qubits(&self, register: RegisterId) -> Result<i32> {
        Ok(self.qureg(register)?.num_qubits_represented)
    }

    fn is_density_matrix(&self, register: RegisterId) -> Result<bool> {
        Ok(self.qureg(register)?.is_density())
    }

    fn num_amps(&self, register: RegisterId) -> Result<i64> {
        Ok(self.qureg(register)?.num_amps_total)
    }

    fn amp(&mut self, register: RegisterId, index: i64) -> Result<Complex> {
        let qureg = self.qureg(register)?;
        // SAFETY: getAmp(Qureg, long long) -> Complex.
        unsafe {
            let get: GetAmpFn = self.library.function("getAmp")?;
            Ok(get(qureg, index))
        }
    }

    fn density_amp(&mut self, register: RegisterId, row: i64, col: i64) -> Result<Complex> {
        let qureg = self.qureg(register)?;
        // SAFETY: getDensityAmp(Qureg, long long, long long) -> Complex.
        unsafe {
            let get: GetDensityAmpFn = self.library.function("getDensityAmp")?;
            Ok(get(qureg, row, col))
        }
    }

    fn has_function(&self, name: &str) -> bool {
        self.library.has_symbol(name)
    }

    fn call(&mut self, signature: &Signature, args: &[Arg]) -> Result<Value> {
        if args.len() != signature.args.len() {
            return Err(HarnessError::ArgumentCount {
                func: signature.name.clone(),
                expected: signature.args.len(),
                received: args.len(),
            });
        }
        debug!(func = %signature.name, %signature, "calling");

        let library = &self.library;
        let registers = &self.registers;
        let result = (|| -> Result<Value> {
            dispatch!(library, registers, signature, args;
                Void(Qureg),
                Void(Qureg, Int),
                Void(Qureg, Int, Int),
                Void(Qureg, Int, Real),
                Void(Qureg, Int, Int, Real),
                Void(Qureg, Int, Real, Vector),
                Void(Qureg, Int, Int, Real, Vector),
                Void(Qureg, Int, Complex, Complex),
                Void(Qureg, Int, Int, Complex, Complex),
                Void(Qureg, Int, ComplexMatrix2),
                Void(Qureg, Int, Int, ComplexMatrix2),
                Void(Qureg, IntPtr, Int),
                Void(Qureg, IntPtr, Int, Real),
                Void(Qureg, IntPtr, Int, Int, ComplexMatrix2),
                Void(Qureg, LongLong),
                Void(Qureg, LongLong, RealPtr, RealPtr, LongLong),
                Int(Qureg),
                Int(Qureg, Int),
                LongLong(Qureg),
                Real(Qureg),
                Real(Qureg, Int, Int),
                Real(Qureg, LongLong),
                Complex(Qureg, LongLong),
                Complex(Qureg, LongLong, LongLong),
            )
        })();

        result.map_err(|err| match err {
            HarnessError::BadArguments { reason, .. } => HarnessError::BadArguments {
                func: signature.name.clone(),
                reason,
            },
            other => other,
        })
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        let live: Vec<Qureg> = self.registers.drain().map(|(_, q)| q).collect();
        for qureg in live {
            if let Err(err) = self.release(qureg) {
                warn!(%err, "failed to destroy register");
            }
        }

        // SAFETY: the env was created by createQuESTEnv in `load`.
        match unsafe { self.library.function::<DestroyEnvFn>("destroyQuESTEnv") } {
            Ok(destroy) => unsafe { destroy(self.env) },
            Err(err) => warn!(%err, "failed to destroy QuEST environment"),
        }
    }
}
