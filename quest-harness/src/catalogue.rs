//! Catalogue of testable library functions.
//!
//! # Signature format
//!
//! ```text
//! (Qureg, int, qreal) -> void
//! (Qureg, long long) -> Complex
//! ```
//!
//! # Catalogue files
//!
//! ```toml
//! [[function]]
//! name = "rotateX"
//! signature = "(Qureg, int, qreal) -> void"
//! defaults = ["0", "0.3"]
//!
//! [sets]
//! rotations = ["rotateX"]
//! ```
//!
//! `defaults` lists a token for every argument after the leading register
//! and is only needed to generate test files.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::marshal::CType;

/// Set that always names every registered testee.
pub const ALL_SET: &str = "all";

/// Set listing testees excluded from test generation.
pub const NO_GENERATE_SET: &str = "don't_generate";

const BUILTIN_API: &str = include_str!("quest_api.toml");

/// Native function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub args: Vec<CType>,
    pub ret: CType,
}

impl Signature {
    pub fn new(name: impl Into<String>, args: Vec<CType>, ret: CType) -> Self {
        Self {
            name: name.into(),
            args,
            ret,
        }
    }

    /// Parse `(arg, ...) -> ret` for the function `name`.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let err = |reason: String| HarnessError::Signature {
            name: name.to_string(),
            reason,
        };

        let text = text.trim();
        let rest = text
            .strip_prefix('(')
            .ok_or_else(|| err("expected '(' at start of signature".to_string()))?;
        let close = rest
            .find(')')
            .ok_or_else(|| err("unmatched '(' in signature".to_string()))?;

        let args_str = &rest[..close];
        let ret_str = rest[close + 1..]
            .trim()
            .strip_prefix("->")
            .ok_or_else(|| err("expected '->' after argument list".to_string()))?
            .trim();

        let mut args = Vec::new();
        if !args_str.trim().is_empty() {
            for part in args_str.split(',') {
                let ty = CType::parse(part)
                    .ok_or_else(|| err(format!("unknown argument type '{}'", part.trim())))?;
                if ty == CType::Void {
                    return Err(err("void is not an argument type".to_string()));
                }
                args.push(ty);
            }
        }

        let ret = CType::parse(ret_str).ok_or_else(|| err(format!("unknown return type '{ret_str}'")))?;

        Ok(Self::new(name, args, ret))
    }

    /// Whether the first argument is the register under test.
    pub fn takes_register(&self) -> bool {
        self.args.first() == Some(&CType::Qureg)
    }

    /// Arguments supplied by test-file tokens.
    pub fn test_args(&self) -> &[CType] {
        if self.takes_register() {
            &self.args[1..]
        } else {
            &self.args
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<&str> = self.args.iter().map(CType::name).collect();
        write!(f, "({}) -> {}", args.join(", "), self.ret)
    }
}

/// A library function registered for testing.
#[derive(Debug, Clone, PartialEq)]
pub struct Testee {
    pub signature: Signature,
    /// One token per test argument; `None` means no test can be generated.
    pub defaults: Option<Vec<String>>,
    /// Run against density matrices instead of state vectors.
    pub density: bool,
}

impl Testee {
    pub fn name(&self) -> &str {
        &self.signature.name
    }
}

/// `[[function]]` entry of a catalogue file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub signature: String,

    #[serde(default)]
    pub defaults: Option<Vec<String>>,

    #[serde(default)]
    pub density: bool,
}

/// Functions and sets as written in TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogueSpec {
    #[serde(default, rename = "function")]
    pub functions: Vec<FunctionSpec>,

    #[serde(default)]
    pub sets: BTreeMap<String, Vec<String>>,
}

impl CatalogueSpec {
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| HarnessError::Config(format!("Failed to parse catalogue: {}", e)))
    }
}

/// Registered testees, in registration order, plus named sets.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    testees: Vec<Testee>,
    index: HashMap<String, usize>,
    sets: BTreeMap<String, Vec<String>>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The QuEST API functions shipped with the harness.
    pub fn builtin() -> Result<Self> {
        let mut catalogue = Self::new();
        catalogue.merge(&CatalogueSpec::from_str(BUILTIN_API)?)?;
        Ok(catalogue)
    }

    /// Register every function, then every set, of `entries`.
    pub fn merge(&mut self, entries: &CatalogueSpec) -> Result<()> {
        for func in &entries.functions {
            let signature = Signature::parse(&func.name, &func.signature)?;
            self.register(Testee {
                signature,
                defaults: func.defaults.clone(),
                density: func.density,
            })?;
        }
        for (name, members) in &entries.sets {
            self.add_set(name, members.clone())?;
        }
        Ok(())
    }

    pub fn register(&mut self, testee: Testee) -> Result<()> {
        let name = testee.name().to_string();
        if self.index.contains_key(&name) {
            return Err(HarnessError::DuplicateFunction(name));
        }

        if let Some(defaults) = &testee.defaults {
            let expected = testee.signature.test_args().len();
            if defaults.len() != expected {
                return Err(HarnessError::ArgumentCount {
                    func: name,
                    expected,
                    received: defaults.len(),
                });
            }
        }

        self.index.insert(name, self.testees.len());
        self.testees.push(testee);
        Ok(())
    }

    /// Add (or extend) a named set. Members must already be registered.
    pub fn add_set(&mut self, name: &str, members: Vec<String>) -> Result<()> {
        if let Some(missing) = members.iter().find(|m| !self.index.contains_key(m.as_str())) {
            return Err(HarnessError::UnknownFunction(missing.clone()));
        }
        let set = self.sets.entry(name.to_string()).or_default();
        for member in members {
            if !set.contains(&member) {
                set.push(member);
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Testee> {
        self.index.get(name).map(|&i| &self.testees[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn list_funcs(&self) -> &[Testee] {
        &self.testees
    }

    pub fn list_funcnames(&self) -> Vec<&str> {
        self.testees.iter().map(Testee::name).collect()
    }

    pub fn sets(&self) -> &BTreeMap<String, Vec<String>> {
        &self.sets
    }

    /// Function names selected by `name`: a set, `all`, or a single function.
    pub fn resolve(&self, name: &str) -> Result<Vec<String>> {
        if let Some(members) = self.sets.get(name) {
            return Ok(members.clone());
        }
        if name == ALL_SET {
            return Ok(self.list_funcnames().into_iter().map(str::to_string).collect());
        }
        if self.contains(name) {
            return Ok(vec![name.to_string()]);
        }
        Err(HarnessError::UnknownFunction(name.to_string()))
    }

    pub fn is_generation_excluded(&self, name: &str) -> bool {
        self.sets
            .get(NO_GENERATE_SET)
            .is_some_and(|set| set.iter().any(|m| m == name))
    }
}
