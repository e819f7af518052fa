//! Type coercion from test-file tokens to FFI argument values.
//!
//! Every argument of a testee is declared with a [`CType`]. The tokens read
//! from a `.test` line are converted with [`coerce`] into an owned [`Arg`],
//! which the backend then hands to the native function.

use std::ffi::{c_int, c_long};
use std::fmt;

use quest_types::{Complex, ComplexMatrix2, Vector, parse_complex, parse_ints, parse_reals, split_interleaved};

use crate::backend::RegisterId;
use crate::error::{HarnessError, Result};

/// C types that can appear in a testee signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CType {
    Int,
    Long,
    ULong,
    LongLong,
    /// `qreal`, built as double precision
    Real,
    Complex,
    ComplexMatrix2,
    Vector,
    ComplexArray,
    RealPtr,
    IntPtr,
    LongPtr,
    Qureg,
    Env,
    /// Return type only
    Void,
}

impl CType {
    /// Parse a C spelling (`long long int`, `qreal *`) or a ctypes spelling
    /// (`c_longlong`, `LP_c_double`).
    pub fn parse(s: &str) -> Option<Self> {
        let normalised = s.split_whitespace().collect::<Vec<_>>().join(" ").replace(" *", "*");

        let ty = match normalised.as_str() {
            "int" | "c_int" => CType::Int,
            "long" | "long int" | "c_long" => CType::Long,
            "unsigned long" | "unsigned long int" | "c_ulong" => CType::ULong,
            "long long" | "long long int" | "c_longlong" => CType::LongLong,
            "qreal" | "double" | "c_double" => CType::Real,
            "Complex" => CType::Complex,
            "ComplexMatrix2" => CType::ComplexMatrix2,
            "Vector" => CType::Vector,
            "ComplexArray" => CType::ComplexArray,
            "qreal*" | "double*" | "LP_c_double" => CType::RealPtr,
            "int*" | "LP_c_int" => CType::IntPtr,
            "long*" | "long int*" | "LP_c_long" => CType::LongPtr,
            "Qureg" => CType::Qureg,
            "QuESTEnv" => CType::Env,
            "void" | "None" => CType::Void,
            _ => return None,
        };
        Some(ty)
    }

    /// C spelling used in signatures and messages.
    pub fn name(&self) -> &'static str {
        match self {
            CType::Int => "int",
            CType::Long => "long",
            CType::ULong => "unsigned long",
            CType::LongLong => "long long",
            CType::Real => "qreal",
            CType::Complex => "Complex",
            CType::ComplexMatrix2 => "ComplexMatrix2",
            CType::Vector => "Vector",
            CType::ComplexArray => "ComplexArray",
            CType::RealPtr => "qreal*",
            CType::IntPtr => "int*",
            CType::LongPtr => "long*",
            CType::Qureg => "Qureg",
            CType::Env => "QuESTEnv",
            CType::Void => "void",
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An argument ready to cross the FFI boundary.
///
/// Arrays own their storage so pointers handed to the library stay valid for
/// the whole call.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(c_int),
    Long(i64),
    ULong(u64),
    LongLong(i64),
    Real(f64),
    Complex(Complex),
    Matrix2(ComplexMatrix2),
    Vector(Vector),
    ComplexArray { reals: Vec<f64>, imags: Vec<f64> },
    RealArray(Vec<f64>),
    IntArray(Vec<c_int>),
    LongArray(Vec<c_long>),
    Register(RegisterId),
}

impl Arg {
    pub fn type_name(&self) -> &'static str {
        match self {
            Arg::Int(_) => "int",
            Arg::Long(_) => "long",
            Arg::ULong(_) => "unsigned long",
            Arg::LongLong(_) => "long long",
            Arg::Real(_) => "qreal",
            Arg::Complex(_) => "Complex",
            Arg::Matrix2(_) => "ComplexMatrix2",
            Arg::Vector(_) => "Vector",
            Arg::ComplexArray { .. } => "ComplexArray",
            Arg::RealArray(_) => "qreal*",
            Arg::IntArray(_) => "int*",
            Arg::LongArray(_) => "long*",
            Arg::Register(_) => "Qureg",
        }
    }
}

/// Convert one token into the argument representation of `ty`.
///
/// `func` only feeds error messages.
pub fn coerce(ty: CType, token: &str, func: &str) -> Result<Arg> {
    let token = token.trim();
    let bad = |expected: &str| HarnessError::BadArguments {
        func: func.to_string(),
        reason: format!("expected {expected}, received {token:?}"),
    };

    let arg = match ty {
        CType::Int => Arg::Int(token.parse().map_err(|_| bad("int"))?),
        CType::Long => Arg::Long(token.parse().map_err(|_| bad("long"))?),
        CType::ULong => Arg::ULong(token.parse().map_err(|_| bad("unsigned long"))?),
        CType::LongLong => Arg::LongLong(token.parse().map_err(|_| bad("long long"))?),
        CType::Real => Arg::Real(token.parse().map_err(|_| bad("qreal"))?),
        CType::Complex => Arg::Complex(parse_complex(token)?),
        CType::ComplexMatrix2 => Arg::Matrix2(ComplexMatrix2::from_reals(&parse_reals(token)?)?),
        CType::Vector => Arg::Vector(Vector::from_reals(&parse_reals(token)?)?),
        CType::ComplexArray => {
            let (reals, imags) = split_interleaved(&parse_reals(token)?);
            Arg::ComplexArray { reals, imags }
        }
        CType::RealPtr => Arg::RealArray(parse_reals(token)?),
        CType::IntPtr => Arg::IntArray(
            parse_ints(token)?
                .into_iter()
                .map(c_int::try_from)
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| bad("int array"))?,
        ),
        CType::LongPtr => Arg::LongArray(
            parse_ints(token)?
                .into_iter()
                .map(c_long::try_from)
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| bad("long array"))?,
        ),
        CType::Qureg | CType::Env | CType::Void => {
            return Err(HarnessError::UnknownType {
                ty: ty.name().to_string(),
                func: func.to_string(),
            });
        }
    };
    Ok(arg)
}

/// Value returned by a native call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Void,
    Int(i32),
    LongLong(i64),
    Real(f64),
    Complex(Complex),
}

impl Value {
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::LongLong(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<Complex> {
        match self {
            Value::Complex(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::LongLong(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v:?}"),
            Value::Complex(c) => write!(f, "{c}"),
        }
    }
}
