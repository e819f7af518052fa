//! Generation of standard test files from a trusted library build.
//!
//! Each generated file holds three cases on 3 qubits (zero, plus and debug
//! registers) called with the testee's default arguments. The expected
//! values are whatever the library returns, so generated files pin the
//! current behaviour rather than prove it correct.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::backend::{Backend, RegisterId};
use crate::catalogue::Testee;
use crate::error::Result;
use crate::marshal::{CType, Value};
use crate::reader::remove_brackets;
use crate::session::{RegisterKind, Session};

const GEN_QUBITS: i32 = 3;
const GEN_KINDS: [RegisterKind; 3] = [RegisterKind::Zero, RegisterKind::Plus, RegisterKind::Debug];

/// Write a test file for `testee` to `path`.
///
/// Returns `false` without touching `path` when the testee has no default
/// arguments.
pub fn gen_test<B: Backend>(session: &mut Session<B>, testee: &Testee, path: &Path) -> Result<bool> {
    let Some(defaults) = &testee.defaults else {
        warn!(
            "Unable to generate test for function {} invalid default arguments",
            testee.name()
        );
        return Ok(false);
    };
    // one whitespace-free token per argument, as the reader splits lines
    let tokens: Vec<String> = defaults
        .iter()
        .map(|d| remove_brackets(d).split_whitespace().collect::<String>())
        .collect();

    let mut out = format!("# {}\n{}\n", testee.name(), GEN_KINDS.len());

    for kind in GEN_KINDS {
        let mut line = format!("{} {}", kind.code(), GEN_QUBITS);
        for token in &tokens {
            line.push(' ');
            line.push_str(token);
        }
        line.push('\n');
        out.push_str(&line);

        let register = session.prepare_register(GEN_QUBITS, kind, None, testee.density)?;
        let observed = observe(session, testee, register, &tokens);
        session.backend_mut().destroy_register(register)?;
        out.push_str(&observed?);
    }

    fs::write(path, out)?;
    info!(function = testee.name(), path = %path.display(), "generated test file");
    Ok(true)
}

fn observe<B: Backend>(
    session: &mut Session<B>,
    testee: &Testee,
    register: RegisterId,
    tokens: &[String],
) -> Result<String> {
    let value = session.invoke(testee, register, tokens)?;
    if testee.signature.ret == CType::Void {
        return Ok(session.backend_mut().snapshot(register)?.to_string());
    }
    Ok(match value {
        Value::Void => String::new(),
        other => format!("{other}\n"),
    })
}

/// Generate files under the unit path for every testee of `sets`, skipping
/// those listed in `don't_generate`. Returns the number of files written.
pub fn gen_tests<B: Backend>(session: &mut Session<B>, sets: &[String]) -> Result<usize> {
    let mut seen = HashSet::new();
    let mut written = 0;

    for set in sets {
        for name in session.catalogue().resolve(set)? {
            if session.catalogue().is_generation_excluded(&name) || !seen.insert(name.clone()) {
                continue;
            }
            let Some(testee) = session.catalogue().get(&name).cloned() else {
                continue;
            };
            let path = session.unit_path().join(format!("{name}.test"));
            if gen_test(session, &testee, &path)? {
                written += 1;
            }
        }
    }
    Ok(written)
}
