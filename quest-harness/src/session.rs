//! A test session: one backend, one catalogue, one result log.
//!
//! The session owns everything a run needs and exposes the runner
//! operations: run a set of standard test files, run a single file, and
//! dispatch to custom tests registered by name.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufWriter};
use std::path::{Path, PathBuf};

use quest_types::{parse_reals, split_interleaved};
use tracing::{debug, info, warn};

use crate::backend::{Backend, RegisterId};
use crate::catalogue::{Catalogue, Testee};
use crate::compare::{compare_complex, compare_reals, compare_states};
use crate::config::HarnessConfig;
use crate::custom;
use crate::error::{HarnessError, Result};
use crate::marshal::{Arg, CType, Value, coerce};
use crate::reader::{TestFile, first_line_tag, is_custom_tag, parse_args};
use crate::results::{Summary, TestResults};
use crate::state::StateSnapshot;

/// Test implemented in Rust, run in place of a standard test file.
pub type CustomTest<B> = fn(&mut Session<B>) -> Result<()>;

/// How a fresh register is initialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    /// `Z`: |0...0>
    Zero,
    /// `P`: uniform superposition
    Plus,
    /// `D`: the library's debug state
    Debug,
    /// `B`: classical basis state from a bit string
    BitState,
    /// `C`: explicit interleaved amplitudes
    Custom,
}

impl RegisterKind {
    /// Case-insensitive single-letter code.
    pub fn parse(code: &str) -> Result<Self> {
        match code.to_ascii_uppercase().as_str() {
            "Z" => Ok(RegisterKind::Zero),
            "P" => Ok(RegisterKind::Plus),
            "D" => Ok(RegisterKind::Debug),
            "B" => Ok(RegisterKind::BitState),
            "C" => Ok(RegisterKind::Custom),
            other => Err(HarnessError::Init(format!(
                "Unrecognised qubit initialisation state \"{other}\""
            ))),
        }
    }

    pub fn code(&self) -> char {
        match self {
            RegisterKind::Zero => 'Z',
            RegisterKind::Plus => 'P',
            RegisterKind::Debug => 'D',
            RegisterKind::BitState => 'B',
            RegisterKind::Custom => 'C',
        }
    }

    /// Prefix of the pass label in the result log.
    pub fn label(&self) -> &'static str {
        match self {
            RegisterKind::Zero => "Zero ",
            RegisterKind::Plus => "Plus ",
            RegisterKind::Debug => "Debug ",
            RegisterKind::BitState => "BitState ",
            RegisterKind::Custom => "Custom ",
        }
    }

    /// Whether the kind takes an init token after the qubit count.
    pub fn needs_init(&self) -> bool {
        matches!(self, RegisterKind::BitState | RegisterKind::Custom)
    }
}

/// Result of checking one test case.
enum Outcome {
    Pass,
    /// Lines of actual/expected pairs for the log
    Fail(Vec<String>),
}

pub struct Session<B: Backend> {
    backend: B,
    catalogue: Catalogue,
    unit_path: PathBuf,
    results: TestResults,
    custom: HashMap<String, CustomTest<B>>,
}

impl<B: Backend> Session<B> {
    /// Start a session from a config: opens (truncates) the log file and
    /// checks that every catalogue function is available from `backend`.
    pub fn init(config: &HarnessConfig, catalogue: Catalogue, backend: B) -> Result<Self> {
        config.validate()?;

        if let Some(missing) = catalogue
            .list_funcnames()
            .into_iter()
            .find(|name| !backend.has_function(name))
        {
            return Err(HarnessError::MissingSymbol(missing.to_string()));
        }

        let log = File::create(&config.log_file).map_err(|e| {
            HarnessError::Config(format!("Failed to open log {}: {}", config.log_file.display(), e))
        })?;
        let results = TestResults::new(Box::new(BufWriter::new(log)), config.tolerance, !config.quiet);

        info!(
            library = %config.library.display(),
            unit_path = %config.unit_path.display(),
            functions = catalogue.list_funcs().len(),
            "test session started"
        );

        Ok(Self::new(backend, catalogue, config.unit_path.clone(), results))
    }

    /// Session with explicit parts and the builtin custom tests registered.
    pub fn new(backend: B, catalogue: Catalogue, unit_path: impl Into<PathBuf>, results: TestResults) -> Self {
        let mut session = Self {
            backend,
            catalogue,
            unit_path: unit_path.into(),
            results,
            custom: HashMap::new(),
        };
        for (name, test) in custom::builtin::<B>() {
            session.register_custom(name, test);
        }
        session
    }

    /// Print the totals, flush the log and release the backend.
    pub fn finalise(mut self) -> Result<Summary> {
        self.results.print_results()?;
        self.results.flush()?;
        let summary = self.results.summary();
        info!(%summary, "test session finished");
        Ok(summary)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn unit_path(&self) -> &Path {
        &self.unit_path
    }

    pub fn results(&self) -> &TestResults {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut TestResults {
        &mut self.results
    }

    pub fn tolerance(&self) -> f64 {
        self.results.tolerance
    }

    /// Register (or replace) a custom test.
    pub fn register_custom(&mut self, name: impl Into<String>, test: CustomTest<B>) {
        self.custom.insert(name.into(), test);
    }

    pub fn has_custom(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Call a catalogue function with already built arguments.
    pub fn call(&mut self, name: &str, args: &[Arg]) -> Result<Value> {
        let testee = self
            .catalogue
            .get(name)
            .ok_or_else(|| HarnessError::UnknownFunction(name.to_string()))?;
        if args.len() != testee.signature.args.len() {
            return Err(HarnessError::ArgumentCount {
                func: name.to_string(),
                expected: testee.signature.args.len(),
                received: args.len(),
            });
        }
        debug!(function = name, "call");
        self.backend.call(&testee.signature, args)
    }

    /// Create a register of `num_qubits` qubits initialised as `kind`.
    ///
    /// `init` is the bit string for [`RegisterKind::BitState`] or the
    /// interleaved amplitudes for [`RegisterKind::Custom`]. Initialisation
    /// problems are [`HarnessError::Init`] and no register is left behind.
    pub fn prepare_register(
        &mut self,
        num_qubits: i32,
        kind: RegisterKind,
        init: Option<&str>,
        density: bool,
    ) -> Result<RegisterId> {
        // a density matrix stores 2^(2n) amplitudes
        let limit = if density { 32 } else { 63 };
        if !(0..limit).contains(&num_qubits) {
            return Err(HarnessError::Init(format!("Bad number of qubits {num_qubits}")));
        }
        let init = init.unwrap_or("");

        let classical = match kind {
            RegisterKind::BitState => {
                if init.is_empty() || init.chars().any(|c| c != '0' && c != '1') {
                    return Err(HarnessError::Init(format!("Expected qubit state, received {init}")));
                }
                if init.len() != num_qubits as usize {
                    return Err(HarnessError::Init(format!(
                        "Bad number of states expected {}, received {}",
                        num_qubits,
                        init.len()
                    )));
                }
                Some(i64::from_str_radix(init, 2).map_err(|_| {
                    HarnessError::Init(format!("Expected qubit state, received {init}"))
                })?)
            }
            _ => None,
        };

        let amps = match kind {
            RegisterKind::Custom => {
                if density {
                    return Err(HarnessError::Init(
                        "Custom initialisation is not supported for density matrices".to_string(),
                    ));
                }
                let values = parse_reals(init)?;
                let num_amps = StateSnapshot::amps_for(num_qubits, false);
                if values.len() != 2 * num_amps {
                    return Err(HarnessError::Init(format!(
                        "Bad number of states expected {}, received {}",
                        num_amps,
                        values.len() / 2
                    )));
                }
                Some(split_interleaved(&values))
            }
            _ => None,
        };

        let register = self.backend.create_register(num_qubits, density)?;
        let initialised = match kind {
            RegisterKind::Zero => self.backend.init_zero_state(register),
            RegisterKind::Plus => self.backend.init_plus_state(register),
            RegisterKind::Debug => self.backend.init_debug_state(register),
            RegisterKind::BitState => self
                .backend
                .init_classical_state(register, classical.unwrap_or_default()),
            RegisterKind::Custom => {
                let (reals, imags) = amps.unwrap_or_default();
                self.backend.set_amps(register, 0, &reals, &imags)
            }
        };

        if let Err(err) = initialised {
            self.backend.destroy_register(register)?;
            return Err(err);
        }
        Ok(register)
    }

    /// Coerce `tokens` by the testee's signature and call it on `register`.
    ///
    /// No call is made unless every token coerced.
    pub fn invoke(&mut self, testee: &Testee, register: RegisterId, tokens: &[String]) -> Result<Value> {
        let signature = &testee.signature;
        let expected = signature.test_args();
        if tokens.len() != expected.len() {
            return Err(HarnessError::ArgumentCount {
                func: testee.name().to_string(),
                expected: expected.len(),
                received: tokens.len(),
            });
        }

        let mut args = Vec::with_capacity(signature.args.len());
        if signature.takes_register() {
            args.push(Arg::Register(register));
        }
        for (&ty, token) in expected.iter().zip(tokens) {
            args.push(coerce(ty, token, testee.name())?);
        }

        debug!(function = testee.name(), %register, args = tokens.len(), "invoke");
        self.backend.call(signature, &args)
    }

    /// Run every test case of an open test file against `testee`.
    pub fn run_test<R: BufRead>(&mut self, testee: &Testee, file: &mut TestFile<R>) -> Result<()> {
        info!(function = testee.name(), file = file.name(), tests = file.num_tests(), "running test file");

        for _ in 0..file.num_tests() {
            let (line, comments) = file.readline_with_comments()?;
            let mut tokens = parse_args(&line).into_iter();

            let (Some(code), Some(count)) = (tokens.next(), tokens.next()) else {
                return Err(file.error(format!("Expected register type and qubit count, received {line}")));
            };
            let kind = RegisterKind::parse(&code).map_err(|e| file.locate(e))?;
            let num_qubits: i32 = count
                .parse()
                .map_err(|_| file.error(format!("Bad number of qubits {count}")))?;
            let init = if kind.needs_init() {
                Some(tokens.next().ok_or_else(|| file.error("Missing initial state"))?)
            } else {
                None
            };
            let args: Vec<String> = tokens.collect();

            let register = self
                .prepare_register(num_qubits, kind, init.as_deref(), testee.density)
                .map_err(|e| file.locate(e))?;
            let outcome = self.check(testee, register, num_qubits, &args, file);
            self.backend.destroy_register(register)?;

            match outcome? {
                Outcome::Pass => {
                    let label = format!("{}{}", kind.label(), init.as_deref().unwrap_or(""));
                    self.results.pass_test(&label)?;
                }
                Outcome::Fail(lines) => {
                    if comments.is_empty() {
                        self.results
                            .log(format_args!("Testing {} failed in {}", testee.name(), file.name()))?;
                    } else {
                        self.results.log(format_args!(
                            "Test {}:{} failed in {}",
                            testee.name(),
                            comments.join("\n"),
                            file.name()
                        ))?;
                    }
                    for line in lines {
                        self.results.log(line)?;
                    }
                    self.results.fail_test("", "")?;
                }
            }
        }
        Ok(())
    }

    fn check<R: BufRead>(
        &mut self,
        testee: &Testee,
        register: RegisterId,
        num_qubits: i32,
        args: &[String],
        file: &mut TestFile<R>,
    ) -> Result<Outcome> {
        let ret = testee.signature.ret;
        if !matches!(ret, CType::Void | CType::Complex | CType::Real | CType::Int | CType::LongLong) {
            return Err(HarnessError::UnsupportedReturn(ret.name().to_string()));
        }

        let value = self.invoke(testee, register, args)?;
        let tolerance = self.tolerance();
        let unexpected = || HarnessError::UnsupportedReturn(format!("{value:?}"));

        let outcome = match ret {
            CType::Void => {
                let expected = file.read_state(num_qubits, testee.density)?;
                let actual = self.backend.snapshot(register)?;
                if compare_states(&actual, &expected, tolerance)? {
                    Outcome::Pass
                } else {
                    Outcome::Fail(
                        actual
                            .amps
                            .iter()
                            .zip(&expected.amps)
                            .map(|(a, b)| format!("{a} {b}"))
                            .collect(),
                    )
                }
            }
            CType::Complex => {
                let expected = file.read_complex()?;
                let actual = value.as_complex().ok_or_else(unexpected)?;
                scalar_outcome(compare_complex(actual, expected, tolerance), actual, expected)
            }
            CType::Real => {
                let expected = file.read_real()?;
                let actual = value.as_real().ok_or_else(unexpected)?;
                scalar_outcome(compare_reals(actual, expected, tolerance), actual, expected)
            }
            _ => {
                let expected = file.read_int()?;
                let actual = value.as_integer().ok_or_else(unexpected)?;
                scalar_outcome(actual == expected, actual, expected)
            }
        };
        Ok(outcome)
    }

    /// Run the standard test file of each function in `functions`.
    ///
    /// A missing file or an error inside one file is logged as a failure
    /// and the run moves on to the next function.
    pub fn run_std_test(&mut self, functions: &[String], name: &str) -> Result<()> {
        self.results.write_term(format_args!("Running tests {name}: "))?;

        for func in functions {
            self.results.log(format_args!("\nRunning test {func}"))?;

            let path = self.unit_path.join(format!("{func}.test"));
            if !path.is_file() {
                warn!(function = %func, path = %path.display(), "test file not found");
                self.results.log(HarnessError::FileNotFound(path.display().to_string()))?;
                self.results.fail_test("", "")?;
                continue;
            }

            if let Err(err) = self.run_function_file(func, &path) {
                warn!(function = %func, error = %err, "test file aborted");
                self.results.log(&err)?;
                self.results.fail_test("", "")?;
            }
        }

        self.results.write_term('\n')?;
        Ok(())
    }

    fn run_function_file(&mut self, func: &str, path: &Path) -> Result<()> {
        if is_custom_tag(&first_line_tag(path)?) {
            return self.run_custom(func);
        }
        let testee = self
            .catalogue
            .get(func)
            .cloned()
            .ok_or_else(|| HarnessError::UnknownFunction(func.to_string()))?;
        let mut file = TestFile::open(path)?;
        self.run_test(&testee, &mut file)
    }

    /// Run the standard tests of a set, `all`, or a single function.
    pub fn run_set(&mut self, name: &str) -> Result<()> {
        let functions = self.catalogue.resolve(name)?;
        self.run_std_test(&functions, name)
    }

    /// Run one test file given as a path or as a name under the unit path.
    ///
    /// The file's first-line tag picks the function under test.
    pub fn run_cust_test(&mut self, target: &str) -> Result<()> {
        let direct = PathBuf::from(target);
        let under_unit = self.unit_path.join(format!("{target}.test"));
        let path = if direct.is_file() {
            direct
        } else if under_unit.is_file() {
            under_unit
        } else {
            self.results.log(HarnessError::FileNotFound(target.to_string()))?;
            self.results.fail_test("", "")?;
            self.results.write_term('\n')?;
            return Ok(());
        };

        self.results
            .write_term(format_args!("Running test {}: ", path.display()))?;

        if path.extension().is_none_or(|ext| ext != "test") {
            return Err(HarnessError::UnrecognisedFiletype(path.display().to_string()));
        }

        let tag = first_line_tag(&path)?;
        if is_custom_tag(&tag) {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.run_custom(&name)?;
        } else {
            let testee = self
                .catalogue
                .get(&tag)
                .cloned()
                .ok_or(HarnessError::UnknownFunction(tag))?;
            let mut file = TestFile::open(&path)?;
            self.run_test(&testee, &mut file)?;
        }

        self.results.write_term('\n')?;
        Ok(())
    }

    /// Run the custom test registered as `name`.
    pub fn run_custom(&mut self, name: &str) -> Result<()> {
        let test = self
            .custom
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::UnknownFunction(name.to_string()))?;
        info!(test = name, "running custom test");
        test(self)
    }
}

fn scalar_outcome<T: std::fmt::Display>(passed: bool, actual: T, expected: T) -> Outcome {
    if passed {
        Outcome::Pass
    } else {
        Outcome::Fail(vec![format!("{actual} {expected}")])
    }
}
