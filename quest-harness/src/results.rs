//! Pass/fail bookkeeping and the flat result log.

use std::fmt;
use std::io::{self, Write};

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub passes: usize,
    pub fails: usize,
    pub num_tests: usize,
}

impl Summary {
    pub fn all_passed(&self) -> bool {
        self.fails == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Passed {} of {} tests, {} failed.",
            self.passes, self.num_tests, self.fails
        )
    }
}

/// Running totals plus the two output streams: the result log, and the
/// terminal that receives `.`/`F` progress marks.
pub struct TestResults {
    pub passes: usize,
    pub fails: usize,
    pub num_tests: usize,
    pub tolerance: f64,
    pub print_to_screen: bool,
    log: Box<dyn Write>,
    term: Box<dyn Write>,
}

impl TestResults {
    /// Results written to `log`, with progress on stdout.
    pub fn new(log: Box<dyn Write>, tolerance: f64, print_to_screen: bool) -> Self {
        Self::with_terminal(log, Box::new(io::stdout()), tolerance, print_to_screen)
    }

    pub fn with_terminal(
        log: Box<dyn Write>,
        term: Box<dyn Write>,
        tolerance: f64,
        print_to_screen: bool,
    ) -> Self {
        Self {
            passes: 0,
            fails: 0,
            num_tests: 0,
            tolerance,
            print_to_screen,
            log,
            term,
        }
    }

    /// Append one line to the result log.
    pub fn log(&mut self, line: impl fmt::Display) -> io::Result<()> {
        writeln!(self.log, "{line}")
    }

    /// Write to the terminal unless quiet. No newline is added.
    pub fn write_term(&mut self, text: impl fmt::Display) -> io::Result<()> {
        if self.print_to_screen {
            write!(self.term, "{text}")?;
            self.term.flush()?;
        }
        Ok(())
    }

    pub fn pass_test(&mut self, label: &str) -> io::Result<()> {
        self.write_term('.')?;
        self.log(format_args!("{} Passed", label.trim()))?;
        self.num_tests += 1;
        self.passes += 1;
        Ok(())
    }

    pub fn fail_test(&mut self, label: &str, message: &str) -> io::Result<()> {
        self.write_term('F')?;
        if !label.is_empty() || !message.is_empty() {
            self.log(format_args!("Test {label} failed: {message}"))?;
        }
        self.num_tests += 1;
        self.fails += 1;
        Ok(())
    }

    pub fn validate(&mut self, passed: bool, label: &str, message: &str) -> io::Result<()> {
        if passed {
            self.pass_test(label)
        } else {
            self.fail_test(label, message)
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            passes: self.passes,
            fails: self.fails,
            num_tests: self.num_tests,
        }
    }

    pub fn print_results(&mut self) -> io::Result<()> {
        let summary = self.summary();
        self.write_term(format_args!("\n{summary}\n"))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.log.flush()?;
        self.term.flush()
    }
}

impl fmt::Debug for TestResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResults")
            .field("passes", &self.passes)
            .field("fails", &self.fails)
            .field("num_tests", &self.num_tests)
            .field("tolerance", &self.tolerance)
            .field("print_to_screen", &self.print_to_screen)
            .finish_non_exhaustive()
    }
}
