//! Hard structure constraints.
//!
//! Constraints come from two sources:
//!
//! - an inline dot-bracket string found in a record's ancillary lines, and
//! - command files (`F`/`P` lines) loaded once at startup and applied to every record.
//!
//! Both are folded into a [`HardConstraints`] value that the fold engine consults
//! for every pair and every unpaired nucleotide. Positions are 0-based internally
//! and 1-based in command files.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::warn;

use crate::errors::{MultifoldError, Result};
use crate::sequence::remove_cut_point;

/// Direction in which a nucleotide is required to pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairDirection {
    Any,
    Downstream,
    Upstream,
}

/// Per-nucleotide and per-pair hard constraints for one sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardConstraints {
    len: usize,
    may_be_unpaired: Vec<bool>,
    may_pair: Vec<bool>,
    partner: Vec<Option<usize>>,
    direction: Vec<PairDirection>,
    forbidden: HashSet<(usize, usize)>,
    forced: HashSet<(usize, usize)>,
}

impl HardConstraints {
    /// Constraints admitting every structure of a sequence of `len` nucleotides.
    #[must_use]
    pub fn unconstrained(len: usize) -> Self {
        Self {
            len,
            may_be_unpaired: vec![true; len],
            may_pair: vec![true; len],
            partner: vec![None; len],
            direction: vec![PairDirection::Any; len],
            forbidden: HashSet::new(),
            forced: HashSet::new(),
        }
    }

    /// Number of nucleotides covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length sequence.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if no constraint has been added.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::unconstrained(self.len)
    }

    /// Whether nucleotide `i` may stay unpaired.
    #[inline]
    #[must_use]
    pub fn unpaired_allowed(&self, i: usize) -> bool {
        self.may_be_unpaired[i]
    }

    /// Whether the pair `(i, j)` with `i < j` is admissible.
    #[inline]
    #[must_use]
    pub fn pair_allowed(&self, i: usize, j: usize) -> bool {
        if !self.may_pair[i] || !self.may_pair[j] {
            return false;
        }
        if self.partner[i].is_some_and(|p| p != j) || self.partner[j].is_some_and(|p| p != i) {
            return false;
        }
        if self.direction[i] == PairDirection::Upstream
            || self.direction[j] == PairDirection::Downstream
        {
            return false;
        }
        !self.forbidden.contains(&(i, j))
    }

    /// Whether `(i, j)` was explicitly requested (allows non-canonical pairs).
    #[inline]
    #[must_use]
    pub fn is_forced(&self, i: usize, j: usize) -> bool {
        self.forced.contains(&(i, j))
    }

    /// Applies a dot-bracket constraint of exactly `len` characters.
    ///
    /// | symbol | meaning |
    /// |--------|---------|
    /// | `.`    | no constraint |
    /// | `x`    | must stay unpaired |
    /// | `\|`   | must be paired |
    /// | `<`    | paired with a downstream nucleotide |
    /// | `>`    | paired with an upstream nucleotide |
    /// | `()`   | may only pair with each other; must pair if `enforce` |
    ///
    /// # Errors
    ///
    /// Returns an error on unbalanced brackets, unknown symbols or a length mismatch.
    pub fn apply_dot_bracket(&mut self, structure: &str, enforce: bool) -> Result<()> {
        let symbols = structure.as_bytes();
        if symbols.len() != self.len {
            return Err(MultifoldError::InvalidConstraint {
                reason: format!(
                    "constraint length {} differs from sequence length {}",
                    symbols.len(),
                    self.len
                ),
            });
        }

        let mut stack = Vec::new();
        for (i, &symbol) in symbols.iter().enumerate() {
            match symbol {
                b'.' => {}
                b'x' => {
                    self.may_pair[i] = false;
                }
                b'|' => {
                    self.may_be_unpaired[i] = false;
                }
                b'<' => {
                    self.may_be_unpaired[i] = false;
                    self.direction[i] = PairDirection::Downstream;
                }
                b'>' => {
                    self.may_be_unpaired[i] = false;
                    self.direction[i] = PairDirection::Upstream;
                }
                b'(' => stack.push(i),
                b')' => {
                    let Some(open) = stack.pop() else {
                        return Err(MultifoldError::InvalidConstraint {
                            reason: format!("unbalanced ')' at position {}", i + 1),
                        });
                    };
                    self.restrict_pair(open, i, enforce);
                }
                other => {
                    return Err(MultifoldError::InvalidConstraint {
                        reason: format!(
                            "unknown symbol '{}' at position {}",
                            char::from(other),
                            i + 1
                        ),
                    });
                }
            }
        }

        if let Some(open) = stack.pop() {
            return Err(MultifoldError::InvalidConstraint {
                reason: format!("unbalanced '(' at position {}", open + 1),
            });
        }
        Ok(())
    }

    /// Applies command-file constraints.
    ///
    /// # Errors
    ///
    /// Returns [`MultifoldError::ConstraintOutOfRange`] if a command addresses a position
    /// beyond the sequence, or [`MultifoldError::InvalidConstraint`] for a helix whose
    /// pairs would cross themselves.
    pub fn apply_commands(&mut self, commands: &[ConstraintCommand]) -> Result<()> {
        for command in commands {
            command.check_range(self.len)?;
            match command.kind {
                CommandKind::Force => {
                    for (i, j) in command.pairs()? {
                        self.restrict_pair(i, j, true);
                    }
                }
                CommandKind::Prohibit if command.j == 0 => {
                    for i in command.i - 1..command.i - 1 + command.k {
                        self.may_pair[i] = false;
                    }
                }
                CommandKind::Prohibit => {
                    for pair in command.pairs()? {
                        self.forbidden.insert(pair);
                    }
                }
            }
        }
        Ok(())
    }

    fn restrict_pair(&mut self, i: usize, j: usize, enforce: bool) {
        self.partner[i] = Some(j);
        self.partner[j] = Some(i);
        self.forced.insert((i, j));
        if enforce {
            self.may_be_unpaired[i] = false;
            self.may_be_unpaired[j] = false;
        }
    }
}

/// Kind of a command-file constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `F i j k`: force the helix (i,j), (i+1,j-1), ... of k pairs.
    Force,
    /// `P i j k`: prohibit those pairs; `P i 0 k`: positions i..i+k-1 may not pair.
    Prohibit,
}

/// One parsed command-file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintCommand {
    /// Command kind.
    pub kind: CommandKind,
    /// 1-based first position.
    pub i: usize,
    /// 1-based partner position, 0 for position-only commands.
    pub j: usize,
    /// Helix / stretch length.
    pub k: usize,
    /// The original line, for messages.
    pub text: String,
}

impl ConstraintCommand {
    fn check_range(&self, len: usize) -> Result<()> {
        let reach_i = self.i + self.k - 1;
        let out_of_range = if reach_i > len {
            Some(reach_i)
        } else if self.j > len {
            Some(self.j)
        } else {
            None
        };
        match out_of_range {
            Some(position) => Err(MultifoldError::ConstraintOutOfRange {
                command: self.text.clone(),
                position,
                length: len,
            }),
            None => Ok(()),
        }
    }

    /// The 0-based pairs covered by a pair command.
    fn pairs(&self) -> Result<Vec<(usize, usize)>> {
        (0..self.k)
            .map(|m| {
                let (i, j) = (self.i + m, self.j.checked_sub(m).unwrap_or(0));
                if j <= i {
                    return Err(MultifoldError::InvalidConstraint {
                        reason: format!("command '{}' describes crossing pairs", self.text),
                    });
                }
                Ok((i - 1, j - 1))
            })
            .collect()
    }
}

/// Parses constraint commands from a reader.
///
/// Blank lines and `#` comments are skipped; unknown commands are logged and ignored.
///
/// # Errors
///
/// Returns [`MultifoldError::InvalidFileFormat`] for lines whose fields are not numbers.
pub fn parse_commands<R: BufRead>(reader: R, source: &str) -> Result<Vec<ConstraintCommand>> {
    let mut commands = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source_err| MultifoldError::UnreadableFile {
            file_type: "constraint".to_string(),
            path: source.to_string(),
            source: source_err,
        })?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let mut fields = text.split_whitespace();
        let kind = match fields.next() {
            Some("F") => CommandKind::Force,
            Some("P") => CommandKind::Prohibit,
            Some(other) => {
                warn!("Ignoring unsupported constraint command '{other}' in {source}");
                continue;
            }
            None => continue,
        };

        let numbers: Vec<usize> =
            fields.take(3).map(str::parse).collect::<std::result::Result<_, _>>().map_err(
                |e| MultifoldError::InvalidFileFormat {
                    file_type: "constraint".to_string(),
                    path: source.to_string(),
                    reason: format!("line {}: {e}", index + 1),
                },
            )?;
        let (i, j, k) = match numbers.as_slice() {
            [i, j, k] => (*i, *j, *k),
            [i, j] => (*i, *j, 1),
            _ => {
                return Err(MultifoldError::InvalidFileFormat {
                    file_type: "constraint".to_string(),
                    path: source.to_string(),
                    reason: format!("line {}: expected 'CMD i j [k]'", index + 1),
                });
            }
        };
        if i == 0 || k == 0 || (kind == CommandKind::Force && j == 0) {
            return Err(MultifoldError::InvalidFileFormat {
                file_type: "constraint".to_string(),
                path: source.to_string(),
                reason: format!("line {}: positions are 1-based and k must be >= 1", index + 1),
            });
        }
        commands.push(ConstraintCommand { kind, i, j, k, text: text.to_string() });
    }
    Ok(commands)
}

/// Reads a constraint command file.
///
/// # Errors
///
/// Returns [`MultifoldError::UnreadableFile`] if the file cannot be opened, or any
/// parse error from [`parse_commands`].
pub fn read_command_file<P: AsRef<Path>>(path: P) -> Result<Vec<ConstraintCommand>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| MultifoldError::UnreadableFile {
        file_type: "constraint".to_string(),
        path: path.display().to_string(),
        source,
    })?;
    parse_commands(BufReader::new(file), &path.display().to_string())
}

/// Result of extracting an inline constraint from a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineConstraint {
    /// The dot-bracket constraint, padded to the sequence length; `None` if missing.
    pub structure: Option<String>,
    /// Recoverable problems to report for the record.
    pub warnings: Vec<String>,
}

/// Extracts the dot-bracket constraint from a record's ancillary lines.
///
/// Only the first whitespace-separated token of each line is used. Multi-line
/// records concatenate all lines; single-line records use the first line only.
///
/// # Errors
///
/// Fatal problems: the strand separator disagrees with the sequence's
/// (`CutPointMismatch`), or the constraint is longer than the sequence
/// (`ConstraintTooLong`).
pub fn extract_inline_constraint(
    rest: &[String],
    multiline: bool,
    sequence_len: usize,
    sequence_split: Option<usize>,
    number: u64,
) -> Result<InlineConstraint> {
    let tokens = rest.iter().filter_map(|line| line.split_whitespace().next());
    let raw: String = if multiline { tokens.collect() } else { tokens.take(1).collect() };

    let mut result = InlineConstraint::default();
    if raw.is_empty() {
        result.warnings.push("Structure constraint is missing".to_string());
        return Ok(result);
    }

    let (mut structure, split) = remove_cut_point(&raw, number)?;
    if split != sequence_split {
        return Err(MultifoldError::CutPointMismatch {
            sequence: sequence_split,
            structure: split,
        });
    }

    let len = structure.len();
    if len > sequence_len {
        return Err(MultifoldError::ConstraintTooLong { constraint: len, sequence: sequence_len });
    }
    if len < sequence_len {
        result.warnings.push("Structure constraint is shorter than sequence".to_string());
        structure.extend(std::iter::repeat_n('.', sequence_len - len));
    }
    result.structure = Some(structure);
    Ok(result)
}
