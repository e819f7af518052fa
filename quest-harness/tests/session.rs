//! Session tests against an in-process backend.

use std::collections::HashMap;
use std::f64::consts::FRAC_1_SQRT_2;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use quest_harness::{
    Arg, Backend, Catalogue, CatalogueSpec, HarnessConfig, HarnessError, RegisterId, RegisterKind, Result,
    Session, Signature, TestResults, Value, gen_test, gen_tests,
};
use quest_types::Complex;
use tempfile::TempDir;

// ============================================================================
// Fake backend
// ============================================================================

struct FakeRegister {
    num_qubits: i32,
    density: bool,
    amps: Vec<Complex>,
}

impl FakeRegister {
    fn dim(&self) -> usize {
        1 << self.num_qubits
    }
}

/// Small simulator implementing just the functions these tests use.
#[derive(Default)]
struct FakeBackend {
    registers: HashMap<RegisterId, FakeRegister>,
    next_id: u64,
    calls: Vec<String>,
}

const FAKE_FUNCTIONS: &[&str] = &[
    "pauliX",
    "densityPauliX",
    "unitary",
    "calcTotalProb",
    "getNumQubits",
    "getAmp",
];

impl FakeBackend {
    fn live(&self) -> usize {
        self.registers.len()
    }

    fn reg(&mut self, id: RegisterId) -> Result<&mut FakeRegister> {
        self.registers.get_mut(&id).ok_or(HarnessError::UnknownRegister(id))
    }
}

fn register_arg(args: &[Arg]) -> RegisterId {
    match args.first() {
        Some(Arg::Register(id)) => *id,
        other => panic!("expected register, got {other:?}"),
    }
}

impl Backend for FakeBackend {
    fn create_register(&mut self, num_qubits: i32, density: bool) -> Result<RegisterId> {
        self.next_id += 1;
        let id = RegisterId::new(self.next_id);
        let n = if density { 2 * num_qubits } else { num_qubits };
        self.registers.insert(
            id,
            FakeRegister {
                num_qubits,
                density,
                amps: vec![Complex::ZERO; 1 << n],
            },
        );
        Ok(id)
    }

    fn destroy_register(&mut self, register: RegisterId) -> Result<()> {
        self.registers
            .remove(&register)
            .map(|_| ())
            .ok_or(HarnessError::UnknownRegister(register))
    }

    fn init_zero_state(&mut self, register: RegisterId) -> Result<()> {
        self.init_classical_state(register, 0)
    }

    fn init_plus_state(&mut self, register: RegisterId) -> Result<()> {
        let reg = self.reg(register)?;
        let norm = 1.0 / reg.dim() as f64;
        let value = if reg.density { norm } else { norm.sqrt() };
        reg.amps.fill(Complex::new(value, 0.0));
        Ok(())
    }

    fn init_debug_state(&mut self, register: RegisterId) -> Result<()> {
        let reg = self.reg(register)?;
        for (i, amp) in reg.amps.iter_mut().enumerate() {
            *amp = Complex::new((2 * i) as f64 / 10.0, (2 * i + 1) as f64 / 10.0);
        }
        Ok(())
    }

    fn init_classical_state(&mut self, register: RegisterId, state: i64) -> Result<()> {
        let reg = self.reg(register)?;
        let dim = reg.dim();
        let index = state as usize;
        reg.amps.fill(Complex::ZERO);
        if reg.density {
            reg.amps[index + index * dim] = Complex::ONE;
        } else {
            reg.amps[index] = Complex::ONE;
        }
        Ok(())
    }

    fn set_amps(&mut self, register: RegisterId, start: i64, reals: &[f64], imags: &[f64]) -> Result<()> {
        let reg = self.reg(register)?;
        for (offset, (re, im)) in reals.iter().zip(imags).enumerate() {
            reg.amps[start as usize + offset] = Complex::new(*re, *im);
        }
        Ok(())
    }

    fn num_qubits(&self, register: RegisterId) -> Result<i32> {
        self.registers
            .get(&register)
            .map(|r| r.num_qubits)
            .ok_or(HarnessError::UnknownRegister(register))
    }

    fn is_density_matrix(&self, register: RegisterId) -> Result<bool> {
        self.registers
            .get(&register)
            .map(|r| r.density)
            .ok_or(HarnessError::UnknownRegister(register))
    }

    fn num_amps(&self, register: RegisterId) -> Result<i64> {
        self.registers
            .get(&register)
            .map(|r| r.amps.len() as i64)
            .ok_or(HarnessError::UnknownRegister(register))
    }

    fn amp(&mut self, register: RegisterId, index: i64) -> Result<Complex> {
        Ok(self.reg(register)?.amps[index as usize])
    }

    fn density_amp(&mut self, register: RegisterId, row: i64, col: i64) -> Result<Complex> {
        let reg = self.reg(register)?;
        let dim = reg.dim();
        Ok(reg.amps[row as usize + col as usize * dim])
    }

    fn has_function(&self, name: &str) -> bool {
        FAKE_FUNCTIONS.contains(&name)
    }

    fn call(&mut self, signature: &Signature, args: &[Arg]) -> Result<Value> {
        self.calls.push(signature.name.clone());
        let id = register_arg(args);
        let reg = self.reg(id)?;

        match signature.name.as_str() {
            "pauliX" | "densityPauliX" => {
                let Some(Arg::Int(target)) = args.get(1) else {
                    panic!("pauliX takes a target qubit");
                };
                let mask = 1usize << target;
                let old = reg.amps.clone();
                if reg.density {
                    let dim = reg.dim();
                    for col in 0..dim {
                        for row in 0..dim {
                            reg.amps[row + col * dim] = old[(row ^ mask) + (col ^ mask) * dim];
                        }
                    }
                } else {
                    for (i, amp) in reg.amps.iter_mut().enumerate() {
                        *amp = old[i ^ mask];
                    }
                }
                Ok(Value::Void)
            }
            "unitary" => {
                let (Some(Arg::Int(target)), Some(Arg::Matrix2(m))) = (args.get(1), args.get(2)) else {
                    panic!("unitary takes a target and a matrix");
                };
                assert!(!reg.density, "fake unitary only acts on state vectors");
                let mask = 1usize << target;
                let old = reg.amps.clone();
                for i in (0..old.len()).filter(|i| i & mask == 0) {
                    let (a, b) = (old[i], old[i | mask]);
                    reg.amps[i] = m.r0c0 * a + m.r0c1 * b;
                    reg.amps[i | mask] = m.r1c0 * a + m.r1c1 * b;
                }
                Ok(Value::Void)
            }
            "calcTotalProb" => {
                let total = if reg.density {
                    let dim = reg.dim();
                    (0..dim).map(|i| reg.amps[i + i * dim].real).sum()
                } else {
                    reg.amps.iter().map(|a| a.norm_sq()).sum()
                };
                Ok(Value::Real(total))
            }
            "getNumQubits" => Ok(Value::Int(reg.num_qubits)),
            "getAmp" => {
                let Some(Arg::LongLong(index)) = args.get(1) else {
                    panic!("getAmp takes an index");
                };
                Ok(Value::Complex(reg.amps[*index as usize]))
            }
            other => Err(HarnessError::UnknownFunction(other.to_string())),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

const CATALOGUE: &str = r#"
[[function]]
name = "pauliX"
signature = "(Qureg, int) -> void"
defaults = ["0"]

[[function]]
name = "unitary"
signature = "(Qureg, int, ComplexMatrix2) -> void"

[[function]]
name = "calcTotalProb"
signature = "(Qureg) -> qreal"
defaults = []

[[function]]
name = "getNumQubits"
signature = "(Qureg) -> int"

[[function]]
name = "getAmp"
signature = "(Qureg, long long int) -> Complex"
defaults = ["1"]

[sets]
basic = ["pauliX", "calcTotalProb"]
"don't_generate" = ["getAmp"]
"#;

#[derive(Clone, Default)]
struct SharedLog(Arc<Mutex<Vec<u8>>>);

impl SharedLog {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn catalogue() -> Catalogue {
    let mut catalogue = Catalogue::new();
    catalogue.merge(&CatalogueSpec::from_str(CATALOGUE).unwrap()).unwrap();
    catalogue
}

fn session(unit_path: &Path) -> (Session<FakeBackend>, SharedLog) {
    let log = SharedLog::default();
    let results = TestResults::with_terminal(Box::new(log.clone()), Box::new(io::sink()), 1e-6, false);
    let session = Session::new(FakeBackend::default(), catalogue(), unit_path, results);
    (session, log)
}

/// Session whose catalogue also holds the functions of `extra`.
fn session_with(unit_path: &Path, extra: &str) -> (Session<FakeBackend>, SharedLog) {
    let mut catalogue = catalogue();
    catalogue.merge(&CatalogueSpec::from_str(extra).unwrap()).unwrap();
    let log = SharedLog::default();
    let results = TestResults::with_terminal(Box::new(log.clone()), Box::new(io::sink()), 1e-6, false);
    let session = Session::new(FakeBackend::default(), catalogue, unit_path, results);
    (session, log)
}

fn write_test(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

const PAULI_X_TEST: &str = "\
# pauliX
2
# flip qubit 0
Z 2 0
(0,0)
(1,0)
(0,0)
(0,0)
B 2 10 1   # |10> -> |00>
(1.0,0.0)
(0,0)
(0,0)
(0,0)
";

// ============================================================================
// Standard tests
// ============================================================================

#[test]
fn test_run_set_passes() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "pauliX.test", PAULI_X_TEST);
    let (mut session, log) = session(dir.path());

    session.run_set("pauliX").unwrap();

    let summary = session.results().summary();
    assert_eq!((summary.passes, summary.fails, summary.num_tests), (2, 0, 2));
    let log = log.contents();
    assert!(log.contains("\nRunning test pauliX\n"));
    assert!(log.contains("Zero Passed\n"));
    assert!(log.contains("BitState 10 Passed\n"));
    assert_eq!(session.backend().live(), 0);
}

#[test]
fn test_failure_logs_comments_and_amplitudes() {
    let dir = TempDir::new().unwrap();
    let wrong = PAULI_X_TEST.replacen("(0,0)\n(1,0)", "(1,0)\n(0,0)", 1);
    write_test(&dir, "pauliX.test", &wrong);
    let (mut session, log) = session(dir.path());

    session.run_set("pauliX").unwrap();

    let summary = session.results().summary();
    assert_eq!((summary.passes, summary.fails), (1, 1));
    let log = log.contents();
    assert!(log.contains("Test pauliX:flip qubit 0 failed in pauliX.test\n"));
    assert!(log.contains("(0.0000000000000,0.0000000000000) (1.0000000000000,0.0000000000000)\n"));
}

#[test]
fn test_failure_without_comments() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "getNumQubits.test", "# getNumQubits\n1\nZ 3\n4\n");
    let (mut session, log) = session(dir.path());

    session.run_set("getNumQubits").unwrap();

    assert_eq!(session.results().fails, 1);
    let log = log.contents();
    assert!(log.contains("Testing getNumQubits failed in getNumQubits.test\n3 4\n"));
}

#[test]
fn test_scalar_returns() {
    let dir = TempDir::new().unwrap();
    // debug state on 1 qubit: (0, 0.1), (0.2, 0.3)
    write_test(&dir, "calcTotalProb.test", "# calcTotalProb\n2\nP 2\n1.0\nD 1\n0.14\n");
    write_test(&dir, "getNumQubits.test", "# getNumQubits\n1\nZ 3\n3\n");
    write_test(
        &dir,
        "getAmp.test",
        &format!("# getAmp\n1\nP 1 1\n({FRAC_1_SQRT_2},0)\n"),
    );
    let (mut session, _) = session(dir.path());

    session
        .run_std_test(
            &["calcTotalProb".into(), "getNumQubits".into(), "getAmp".into()],
            "scalars",
        )
        .unwrap();

    let summary = session.results().summary();
    assert_eq!((summary.passes, summary.fails), (4, 0));
}

#[test]
fn test_missing_file_fails_and_run_continues() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "pauliX.test", PAULI_X_TEST);
    let (mut session, log) = session(dir.path());

    session
        .run_std_test(&["getAmp".into(), "pauliX".into()], "mixed")
        .unwrap();

    let summary = session.results().summary();
    assert_eq!((summary.passes, summary.fails), (2, 1));
    let expected = format!("File {} not found", dir.path().join("getAmp.test").display());
    assert!(log.contents().contains(&expected));
}

#[test]
fn test_argument_count_mismatch_is_logged() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "pauliX.test", "# pauliX\n1\nZ 2\n(1,0)\n(0,0)\n(0,0)\n(0,0)\n");
    let (mut session, log) = session(dir.path());

    session.run_set("pauliX").unwrap();

    assert_eq!(session.results().fails, 1);
    assert!(log
        .contents()
        .contains("Bad argument list in pauliX expected 1, recieved 0"));
    assert!(session.backend().calls.is_empty());
    assert_eq!(session.backend().live(), 0);
}

#[test]
fn test_bad_argument_token_is_logged() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "rotateX.test", "# rotateX\n1\nZ 1 0 abc\n(1,0)\n(0,0)\n");
    let (mut session, log) = session_with(
        dir.path(),
        "[[function]]\nname = \"rotateX\"\nsignature = \"(Qureg, int, qreal) -> void\"\n",
    );

    session.run_set("rotateX").unwrap();

    assert_eq!(session.results().fails, 1);
    assert!(log
        .contents()
        .contains("Bad arguments in function rotateX: expected qreal, received \"abc\""));
    assert!(session.backend().calls.is_empty());
    assert_eq!(session.backend().live(), 0);
}

#[test]
fn test_unsupported_return_type_is_logged() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "getEnv.test", "# getEnv\n1\nZ 1\n(1,0)\n");
    let (mut session, log) = session_with(
        dir.path(),
        "[[function]]\nname = \"getEnv\"\nsignature = \"(Qureg) -> QuESTEnv\"\n",
    );

    session.run_std_test(&["getEnv".into()], "env").unwrap();

    assert_eq!(session.results().fails, 1);
    assert!(log.contents().contains("Cannot test type QuESTEnv currently"));
    assert!(session.backend().calls.is_empty());
    assert_eq!(session.backend().live(), 0);
}

#[test]
fn test_density_state_comparison() {
    let dir = TempDir::new().unwrap();
    let mut catalogue = catalogue();
    catalogue
        .merge(
            &CatalogueSpec::from_str(
                r#"
[[function]]
name = "densityPauliX"
signature = "(Qureg, int) -> void"
defaults = ["0"]
density = true
"#,
            )
            .unwrap(),
        )
        .unwrap();

    // |0><0| -> |1><1|: element (1, 1) at index 1 + 1 * 2
    write_test(
        &dir,
        "densityPauliX.test",
        "# densityPauliX\n1\nZ 1 0\n(0,0)\n(0,0)\n(0,0)\n(1,0)\n",
    );
    let results = TestResults::with_terminal(Box::new(io::sink()), Box::new(io::sink()), 1e-6, false);
    let mut session = Session::new(FakeBackend::default(), catalogue, dir.path(), results);

    session.run_set("densityPauliX").unwrap();

    assert_eq!(session.results().passes, 1);
}

// ============================================================================
// Single files and custom tests
// ============================================================================

#[test]
fn test_run_cust_test_by_name_and_path() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "flip.test", PAULI_X_TEST);
    let (mut session, _) = session(dir.path());

    session.run_cust_test("flip").unwrap();
    let path = dir.path().join("flip.test");
    session.run_cust_test(path.to_str().unwrap()).unwrap();

    assert_eq!(session.results().passes, 4);
}

#[test]
fn test_run_cust_test_errors() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "ghost.test", "# ghostGate\n1\nZ 1\n");
    write_test(&dir, "notes.txt", "# pauliX\n");
    write_test(&dir, "badkind.test", "# pauliX\n1\nX 2 0\n");
    let (mut session, log) = session(dir.path());

    let err = session.run_cust_test("ghost").unwrap_err();
    assert_eq!(err.to_string(), "Function ghostGate does not exist");

    let notes = dir.path().join("notes.txt");
    let err = session.run_cust_test(notes.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, HarnessError::UnrecognisedFiletype(_)));

    let err = session.run_cust_test("badkind").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unrecognised qubit initialisation state \"X\" in badkind.test at line 3"
    );

    session.run_cust_test("nowhere").unwrap();
    assert_eq!(session.results().fails, 1);
    assert!(log.contents().contains("File nowhere not found"));
}

#[test]
fn test_custom_tagged_file_runs_builtin_initialisation() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "initialisation.test", "# Custom\n");
    let (mut session, log) = session(dir.path());

    session.run_cust_test("initialisation").unwrap();

    let summary = session.results().summary();
    // zero, plus and all-ones registers of 1..=3 qubits, as vectors and matrices
    assert_eq!((summary.passes, summary.fails), (18, 0));
    assert!(log.contents().contains("BitState 111 3 qubits density Passed"));
    assert_eq!(session.backend().live(), 0);
}

#[test]
fn test_random_unitary_custom_test() {
    let dir = TempDir::new().unwrap();
    let (mut session, _) = session(dir.path());

    session.run_custom("random_unitary").unwrap();

    // one case per target qubit of 1, 2 and 3 qubit registers
    let summary = session.results().summary();
    assert_eq!((summary.passes, summary.fails), (6, 0));
    assert_eq!(session.backend().calls.iter().filter(|c| *c == "unitary").count(), 6);
}

#[test]
fn test_custom_tag_in_standard_run() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "calcTotalProb.test", "# Python\n");
    let (mut session, log) = session(dir.path());

    session.register_custom("calcTotalProb", |s: &mut Session<FakeBackend>| {
        s.results_mut().pass_test("scripted")?;
        Ok(())
    });
    session.run_set("calcTotalProb").unwrap();

    assert_eq!(session.results().passes, 1);
    assert!(log.contents().contains("scripted Passed"));
}

// ============================================================================
// Registers
// ============================================================================

#[test]
fn test_prepare_register_validation() {
    let dir = TempDir::new().unwrap();
    let (mut session, _) = session(dir.path());

    let err = session
        .prepare_register(3, RegisterKind::BitState, Some("012"), false)
        .unwrap_err();
    assert_eq!(err.to_string(), "Expected qubit state, received 012");

    let err = session
        .prepare_register(2, RegisterKind::BitState, Some("1"), false)
        .unwrap_err();
    assert_eq!(err.to_string(), "Bad number of states expected 2, received 1");

    let err = session
        .prepare_register(1, RegisterKind::Custom, Some("1,0,0"), false)
        .unwrap_err();
    assert_eq!(err.to_string(), "Bad number of states expected 2, received 1");

    assert!(session
        .prepare_register(1, RegisterKind::Custom, Some("1,0,0,0"), true)
        .is_err());
    assert_eq!(session.backend().live(), 0);

    let err = session
        .prepare_register(40, RegisterKind::Zero, None, true)
        .unwrap_err();
    assert_eq!(err.to_string(), "Bad number of qubits 40");
    assert!(session.prepare_register(32, RegisterKind::Plus, None, true).is_err());
    assert_eq!(session.backend().live(), 0);

    let id = session
        .prepare_register(1, RegisterKind::Custom, Some("0.6,0,0,0.8"), false)
        .unwrap();
    let state = session.backend_mut().snapshot(id).unwrap();
    assert_eq!(state.amps, vec![Complex::new(0.6, 0.0), Complex::new(0.0, 0.8)]);
}

// ============================================================================
// Generation
// ============================================================================

#[test]
fn test_generate_then_run() {
    let dir = TempDir::new().unwrap();
    let (mut session, _) = session(dir.path());

    let written = gen_tests(&mut session, &["all".into()]).unwrap();
    // getAmp is excluded, getNumQubits and unitary have no defaults
    assert_eq!(written, 2);
    assert!(!dir.path().join("getAmp.test").exists());
    assert!(!dir.path().join("getNumQubits.test").exists());

    let generated = fs::read_to_string(dir.path().join("pauliX.test")).unwrap();
    let mut lines = generated.lines();
    assert_eq!(lines.next(), Some("# pauliX"));
    assert_eq!(lines.next(), Some("3"));
    assert_eq!(lines.next(), Some("Z 3 0"));
    assert_eq!(generated.lines().count(), 2 + 3 * (1 + 8));

    session.run_set("basic").unwrap();
    let summary = session.results().summary();
    assert_eq!((summary.passes, summary.fails), (6, 0));
}

#[test]
fn test_gen_test_without_defaults() {
    let dir = TempDir::new().unwrap();
    let (mut session, _) = session(dir.path());
    let testee = session.catalogue().get("getNumQubits").cloned().unwrap();
    let path = dir.path().join("getNumQubits.test");

    assert!(!gen_test(&mut session, &testee, &path).unwrap());
    assert!(!path.exists());
}

#[test]
fn test_generated_list_default_reads_back() {
    let dir = TempDir::new().unwrap();
    let (mut session, _) = session(dir.path());
    let mut testee = session.catalogue().get("unitary").cloned().unwrap();
    testee.defaults = Some(vec!["0".into(), "[1, 0, 0, 0, 0, 0, 1, 0]".into()]);

    assert!(gen_test(&mut session, &testee, &dir.path().join("unitary.test")).unwrap());
    let generated = fs::read_to_string(dir.path().join("unitary.test")).unwrap();
    assert_eq!(generated.lines().nth(2), Some("Z 3 0 1,0,0,0,0,0,1,0"));

    session.run_std_test(&["unitary".into()], "unitary").unwrap();
    let summary = session.results().summary();
    assert_eq!((summary.passes, summary.fails), (3, 0));
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[test]
fn test_init_requires_every_function() {
    let dir = TempDir::new().unwrap();
    let config = HarnessConfig {
        log_file: dir.path().join("QuESTLog.log"),
        unit_path: dir.path().to_path_buf(),
        ..HarnessConfig::default()
    };

    let mut catalogue = catalogue();
    catalogue
        .merge(
            &CatalogueSpec::from_str("[[function]]\nname = \"hadamard\"\nsignature = \"(Qureg, int) -> void\"\n")
                .unwrap(),
        )
        .unwrap();
    let err = Session::init(&config, catalogue, FakeBackend::default()).err().unwrap();
    assert_eq!(err.to_string(), "hadamard not found in QuEST API");
}

#[test]
fn test_init_and_finalise_write_log() {
    let dir = TempDir::new().unwrap();
    write_test(&dir, "pauliX.test", PAULI_X_TEST);
    let config = HarnessConfig {
        log_file: dir.path().join("QuESTLog.log"),
        unit_path: dir.path().to_path_buf(),
        quiet: true,
        ..HarnessConfig::default()
    };

    let mut session = Session::init(&config, catalogue(), FakeBackend::default()).unwrap();
    session.run_set("pauliX").unwrap();
    let summary = session.finalise().unwrap();

    assert!(summary.all_passed());
    assert_eq!(summary.to_string(), "Passed 2 of 2 tests, 0 failed.");
    let log = fs::read_to_string(dir.path().join("QuESTLog.log")).unwrap();
    assert!(log.contains("BitState 10 Passed"));
}
