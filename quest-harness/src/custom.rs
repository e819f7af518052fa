//! Custom tests built into the harness.
//!
//! A custom test is run when a `.test` file is tagged `Custom` (or
//! `Python`) on its first line; the file name selects the test.

use quest_types::rand_norm_mat;

use crate::backend::Backend;
use crate::compare::compare_reals;
use crate::error::{HarnessError, Result};
use crate::marshal::{Arg, Value};
use crate::session::{CustomTest, RegisterKind, Session};

/// Name and entry point of every builtin custom test.
pub fn builtin<B: Backend>() -> Vec<(&'static str, CustomTest<B>)> {
    vec![
        ("initialisation", initialisation::<B> as CustomTest<B>),
        ("random_unitary", random_unitary::<B> as CustomTest<B>),
    ]
}

/// Freshly initialised registers must be normalised.
pub fn initialisation<B: Backend>(session: &mut Session<B>) -> Result<()> {
    for density in [false, true] {
        for num_qubits in 1..=3 {
            let all_ones = "1".repeat(num_qubits as usize);
            let cases = [
                (RegisterKind::Zero, None),
                (RegisterKind::Plus, None),
                (RegisterKind::BitState, Some(all_ones.as_str())),
            ];

            for (kind, init) in cases {
                let register = session.prepare_register(num_qubits, kind, init, density)?;
                let total = session.call("calcTotalProb", &[Arg::Register(register)]);
                session.backend_mut().destroy_register(register)?;

                let total = real(total?)?;
                let label = format!(
                    "{}{}{} qubits{}",
                    kind.label(),
                    init.map(|s| format!("{s} ")).unwrap_or_default(),
                    num_qubits,
                    if density { " density" } else { "" }
                );
                let passed = compare_reals(total, 1.0, session.tolerance());
                session
                    .results_mut()
                    .validate(passed, &label, &format!("total probability {total:?}"))?;
            }
        }
    }
    Ok(())
}

/// Random single-qubit unitaries keep a state vector normalised.
pub fn random_unitary<B: Backend>(session: &mut Session<B>) -> Result<()> {
    let mut rng = rand::thread_rng();

    for num_qubits in 1..=3 {
        for target in 0..num_qubits {
            let matrix = rand_norm_mat(&mut rng);
            let register = session.prepare_register(num_qubits, RegisterKind::Plus, None, false)?;
            let total = session
                .call(
                    "unitary",
                    &[Arg::Register(register), Arg::Int(target), Arg::Matrix2(matrix)],
                )
                .and_then(|_| session.call("calcTotalProb", &[Arg::Register(register)]));
            session.backend_mut().destroy_register(register)?;

            let total = real(total?)?;
            let label = format!("Unitary {matrix} on qubit {target} of {num_qubits}");
            let passed = compare_reals(total, 1.0, session.tolerance());
            session
                .results_mut()
                .validate(passed, &label, &format!("total probability {total:?}"))?;
        }
    }
    Ok(())
}

fn real(value: Value) -> Result<f64> {
    match value {
        Value::Real(p) => Ok(p),
        other => Err(HarnessError::UnsupportedReturn(format!("{other:?}"))),
    }
}
