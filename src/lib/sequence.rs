//! RNA sequence utilities.
//!
//! Alphabet normalization and handling of the `&` strand separator that joins the
//! two strands of a dimer. Positions of the separator are expressed as the length
//! of the first strand (the "split"), so `"GGG&CCC"` has split `Some(3)`.

use crate::errors::{MultifoldError, Result};

/// The character joining two strands of a dimer.
pub const STRAND_SEPARATOR: char = '&';

/// Converts a DNA/RNA letter to its uppercase RNA form.
///
/// `T`/`t` become `U` when `dna_to_rna` is set; all letters are uppercased.
#[inline]
#[must_use]
pub const fn normalize_base(base: char, dna_to_rna: bool) -> char {
    let upper = base.to_ascii_uppercase();
    if dna_to_rna && upper == 'T' { 'U' } else { upper }
}

/// Normalizes a sequence: uppercase, optionally substituting `T` by `U`.
///
/// Normalization is idempotent.
///
/// # Examples
///
/// ```
/// use multifold_lib::sequence::normalize;
///
/// assert_eq!(normalize("acgt&Tt", true), "ACGU&UU");
/// assert_eq!(normalize("acgt", false), "ACGT");
/// assert_eq!(normalize(&normalize("acgt", true), true), "ACGU");
/// ```
#[must_use]
pub fn normalize(sequence: &str, dna_to_rna: bool) -> String {
    sequence.chars().map(|c| normalize_base(c, dna_to_rna)).collect()
}

/// Counts the strands of a sequence or structure string.
#[must_use]
pub fn strand_count(text: &str) -> usize {
    text.matches(STRAND_SEPARATOR).count() + 1
}

/// Removes the strand separator, returning the plain string and the split.
///
/// # Errors
///
/// Returns [`MultifoldError::TooManyStrands`] if more than one separator is present;
/// `number` identifies the record in that error.
///
/// # Examples
///
/// ```
/// use multifold_lib::sequence::remove_cut_point;
///
/// assert_eq!(remove_cut_point("GGG&CCCC", 0).unwrap(), ("GGGCCCC".to_string(), Some(3)));
/// assert_eq!(remove_cut_point("GGGCCCC", 0).unwrap(), ("GGGCCCC".to_string(), None));
/// assert!(remove_cut_point("A&C&G", 0).is_err());
/// ```
pub fn remove_cut_point(text: &str, number: u64) -> Result<(String, Option<usize>)> {
    let strands = strand_count(text);
    if strands > 2 {
        return Err(MultifoldError::TooManyStrands { number, strands });
    }
    match text.split_once(STRAND_SEPARATOR) {
        Some((first, second)) => {
            let split = first.chars().count();
            Ok((format!("{first}{second}"), Some(split)))
        }
        None => Ok((text.to_string(), None)),
    }
}

/// Re-inserts the strand separator after `split` characters.
///
/// # Examples
///
/// ```
/// use multifold_lib::sequence::insert_cut_point;
///
/// assert_eq!(insert_cut_point("((..))", Some(2)), "((&..))");
/// assert_eq!(insert_cut_point("((..))", None), "((..))");
/// ```
#[must_use]
pub fn insert_cut_point(text: &str, split: Option<usize>) -> String {
    match split.and_then(|split| char_offset(text, split)) {
        Some(offset) => {
            let mut out = String::with_capacity(text.len() + 1);
            out.push_str(&text[..offset]);
            out.push(STRAND_SEPARATOR);
            out.push_str(&text[offset..]);
            out
        }
        None => text.to_string(),
    }
}

/// Returns the two strands of a plain (separator-free) dimer sequence.
///
/// `split` counts characters; a split beyond the end leaves the second strand empty.
#[must_use]
pub fn strands(plain: &str, split: usize) -> (&str, &str) {
    plain.split_at(char_offset(plain, split).unwrap_or(plain.len()))
}

/// Byte offset of the `chars`-th character, or `None` if `text` is shorter.
fn char_offset(text: &str, chars: usize) -> Option<usize> {
    text.char_indices().map(|(offset, _)| offset).chain(std::iter::once(text.len())).nth(chars)
}

/// Finds the first character that cannot be part of a nucleotide sequence.
///
/// Sequences are made of ASCII letters and at most one strand separator. Returns the
/// 1-based position and the character.
///
/// # Examples
///
/// ```
/// use multifold_lib::sequence::find_invalid_base;
///
/// assert_eq!(find_invalid_base("GGG&CCC"), None);
/// assert_eq!(find_invalid_base("GGNNCC"), None);
/// assert_eq!(find_invalid_base("AÉ&CC"), Some((2, 'É')));
/// assert_eq!(find_invalid_base("GG-CC"), Some((3, '-')));
/// ```
#[must_use]
pub fn find_invalid_base(sequence: &str) -> Option<(usize, char)> {
    sequence
        .chars()
        .enumerate()
        .find(|&(_, c)| !c.is_ascii_alphabetic() && c != STRAND_SEPARATOR)
        .map(|(index, c)| (index + 1, c))
}

/// True if a dimer consists of two identical strands, which makes its
/// structure space rotationally symmetric.
#[must_use]
pub fn is_homodimer(plain: &str, split: Option<usize>) -> bool {
    split.is_some_and(|split| {
        let (a, b) = strands(plain, split);
        !a.is_empty() && a == b
    })
}
