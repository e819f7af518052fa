//! Reader for `.test` files.
//!
//! # File Format
//!
//! ```text
//! # pauliX
//! 3
//! # flip the lowest qubit of |00>
//! Z 2 0
//! (0.0,0.0)
//! (1.0,0.0)
//! (0.0,0.0)
//! (0.0,0.0)
//! ...
//! ```
//!
//! The first non-comment line is the number of tests. Each test is an
//! argument line (register kind, qubit count, optional init token, function
//! arguments) followed by the expected output: one complex amplitude per
//! line for functions returning nothing, or a single value otherwise.
//! Everything after `#` on a line is ignored; full comment lines directly
//! above an argument line are kept as that test's description.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quest_types::{Complex, parse_complex};

use crate::error::{HarnessError, Result};
use crate::state::StateSnapshot;

/// An open test file positioned after its header.
pub struct TestFile<R = BufReader<File>> {
    reader: R,
    name: String,
    line: usize,
    num_tests: usize,
}

impl TestFile {
    /// Open `path` and read the test-count header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|_| HarnessError::FileNotFound(path.display().to_string()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_reader(name, BufReader::new(file))
    }
}

impl<R: BufRead> TestFile<R> {
    /// Wrap any reader; `name` only appears in messages.
    pub fn from_reader(name: impl Into<String>, reader: R) -> Result<Self> {
        let mut file = Self {
            reader,
            name: name.into(),
            line: 0,
            num_tests: 0,
        };

        let header = file.readline()?;
        file.num_tests = header.parse().map_err(|_| {
            file.error(format!(
                "Header of file :\n{header}\n does not contain the number of tests"
            ))
        })?;
        Ok(file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of the last line read (1-based).
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn num_tests(&self) -> usize {
        self.num_tests
    }

    /// Error located at the current line.
    pub fn error(&self, message: impl Into<String>) -> HarnessError {
        HarnessError::file(message, &self.name, self.line)
    }

    /// Attach the current position to a register initialisation error.
    pub fn locate(&self, err: HarnessError) -> HarnessError {
        match err {
            HarnessError::Init(message) => self.error(message),
            other => other,
        }
    }

    /// Next line with content, comments removed.
    pub fn readline(&mut self) -> Result<String> {
        self.readline_with_comments().map(|(line, _)| line)
    }

    /// Next line with content, plus the text of the comment lines skipped
    /// on the way.
    pub fn readline_with_comments(&mut self) -> Result<(String, Vec<String>)> {
        let mut skipped = Vec::new();
        let mut buf = String::new();

        loop {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                return Err(self.error("Unexpected end of file"));
            }
            self.line += 1;

            let content = match buf.find('#') {
                Some(pos) => &buf[..pos],
                None => buf.as_str(),
            }
            .trim();

            if !content.is_empty() {
                return Ok((content.to_string(), skipped));
            }

            let comment = buf.trim_start_matches('#').trim();
            if !comment.is_empty() {
                skipped.push(comment.to_string());
            }
        }
    }

    pub fn read_complex(&mut self) -> Result<Complex> {
        let line = self.readline()?;
        parse_complex(&line).map_err(|_| self.error(format!("Bad complex value {line:?}")))
    }

    pub fn read_real(&mut self) -> Result<f64> {
        let line = self.readline()?;
        line.parse().map_err(|_| self.error(format!("Bad real value {line:?}")))
    }

    pub fn read_int(&mut self) -> Result<i64> {
        let line = self.readline()?;
        line.parse().map_err(|_| self.error(format!("Bad integer value {line:?}")))
    }

    /// Read the expected amplitudes of an `num_qubits` register.
    pub fn read_state(&mut self, num_qubits: i32, density: bool) -> Result<StateSnapshot> {
        let count = StateSnapshot::amps_for(num_qubits, density);
        let mut amps = Vec::with_capacity(count);
        for _ in 0..count {
            let line = self.readline()?;
            amps.push(parse_complex(&line).map_err(|_| self.error("Bad state line"))?);
        }
        Ok(StateSnapshot::new(num_qubits, density, amps))
    }
}

/// Delete every bracket character so arrays and complexes become plain
/// comma lists.
pub fn remove_brackets(line: &str) -> String {
    line.chars().filter(|c| !"[{()}]".contains(*c)).collect()
}

/// Split an argument line into tokens, keeping comma lists together.
pub fn parse_args(line: &str) -> Vec<String> {
    remove_brackets(line).split_whitespace().map(str::to_string).collect()
}

/// First raw line of `path` with leading `#` and spaces removed: the
/// function a file tests, or `Python`/`Custom` for scripted tests.
pub fn first_line_tag(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|_| HarnessError::FileNotFound(path.display().to_string()))?;
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first)?;
    Ok(first.trim_start_matches(['#', ' ']).trim().to_string())
}

/// Whether a first-line tag marks a scripted test.
pub fn is_custom_tag(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("python") || tag.eq_ignore_ascii_case("custom")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn test_file(content: &str) -> Result<TestFile<Cursor<Vec<u8>>>> {
        TestFile::from_reader("sample.test", Cursor::new(content.as_bytes().to_vec()))
    }

    #[test]
    fn test_header_skips_comments() {
        let file = test_file("# hadamard\n\n  # note\n2 # tests\n").unwrap();
        assert_eq!(file.num_tests(), 2);
        assert_eq!(file.line(), 4);
    }

    #[test]
    fn test_bad_header() {
        let err = test_file("# hadamard\nthree\n").err().unwrap();
        assert_eq!(
            err.to_string(),
            "Header of file :\nthree\n does not contain the number of tests in sample.test at line 2"
        );
    }

    #[test]
    fn test_readline_collects_comments() {
        let mut file = test_file("1\n# first\n#second\n\nZ 3 0 # trailing\n").unwrap();
        let (line, comments) = file.readline_with_comments().unwrap();
        assert_eq!(line, "Z 3 0");
        assert_eq!(comments, vec!["first", "second"]);
    }

    #[test]
    fn test_unexpected_eof() {
        let mut file = test_file("1\n# only a comment\n").unwrap();
        let err = file.readline().unwrap_err();
        assert_eq!(err.to_string(), "Unexpected end of file in sample.test at line 2");
    }

    #[test]
    fn test_read_state() {
        let mut file = test_file("1\n(1,0)\n(0, 0)\n").unwrap();
        let state = file.read_state(1, false).unwrap();
        assert_eq!(state.amps, vec![Complex::ONE, Complex::ZERO]);
    }

    #[test]
    fn test_read_density_state_needs_four_to_the_n() {
        let mut file = test_file("1\n(1,0)\n(0,0)\n(0,0)\n").unwrap();
        let err = file.read_state(1, true).unwrap_err();
        assert!(err.to_string().starts_with("Unexpected end of file"));
    }

    #[test]
    fn test_bad_state_line() {
        let mut file = test_file("1\n(1,zero)\n").unwrap();
        let err = file.read_state(1, false).unwrap_err();
        assert_eq!(err.to_string(), "Bad state line in sample.test at line 2");
    }

    #[test]
    fn test_read_scalars() {
        let mut file = test_file("1\n0.5\n3\n(0,1)\n").unwrap();
        assert_eq!(file.read_real().unwrap(), 0.5);
        assert_eq!(file.read_int().unwrap(), 3);
        assert_eq!(file.read_complex().unwrap(), Complex::I);
    }

    #[test]
    fn test_parse_args_removes_brackets() {
        assert_eq!(
            parse_args("C 1 [0.6,0,0,0.8] (0.5,0.5) {1}"),
            vec!["C", "1", "0.6,0,0,0.8", "0.5,0.5", "1"]
        );
        assert_eq!(remove_brackets("[(1,0),(0,1)]"), "1,0,0,1");
    }

    #[test]
    fn test_first_line_tag() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hadamard.test");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "# Python").unwrap();
        writeln!(f, "1").unwrap();
        drop(f);

        let tag = first_line_tag(&path).unwrap();
        assert_eq!(tag, "Python");
        assert!(is_custom_tag(&tag));
        assert!(!is_custom_tag("hadamard"));
    }

    #[test]
    fn test_open_missing_file() {
        let err = TestFile::open(Path::new("/nonexistent/x.test")).err().unwrap();
        assert!(matches!(err, HarnessError::FileNotFound(_)));
    }
}
