use crate::constants::{ALPHABET_SIZE, MARK_SENTINEL_TEXT};
use crate::error::InvalidPattern;
use std::sync::LazyLock;

/// scanner for the sentinel marker, built once per process
static SENTINEL: LazyLock<MarkerScanner> = LazyLock::new(|| {
    MarkerScanner::new(MARK_SENTINEL_TEXT.as_bytes()).expect("sentinel marker is not empty")
});

/// the shared scanner for `MARK_SENTINEL_TEXT`
pub fn sentinel() -> &'static MarkerScanner {
    &SENTINEL
}

/// returns the offset of the first sentinel marker in `bytes`, if any
pub fn index_of_marker(bytes: &[u8]) -> Option<usize> {
    sentinel().find(bytes)
}

/// boyer-moore search for a fixed byte pattern
///
/// the shift tables depend only on the pattern, so a scanner is immutable
/// after construction and can be shared between threads
#[derive(Debug, Clone)]
pub struct MarkerScanner {
    needle: Vec<u8>,
    bad_char: [usize; ALPHABET_SIZE],
    good_suffix: Vec<usize>,
}

impl MarkerScanner {
    pub fn new(needle: &[u8]) -> Result<Self, InvalidPattern> {
        if needle.is_empty() {
            return Err(InvalidPattern);
        }
        Ok(Self {
            needle: needle.to_vec(),
            bad_char: bad_char_table(needle),
            good_suffix: good_suffix_table(needle),
        })
    }

    /// returns the lowest index at which the pattern occurs in `haystack`
    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        let needle = &self.needle;
        let last = needle.len() - 1;

        let mut i = last;
        while i < haystack.len() {
            // compare right to left; `i` never drops below `j`
            let mut j = last;
            while needle[j] == haystack[i] {
                if j == 0 {
                    return Some(i);
                }
                i -= 1;
                j -= 1;
            }
            i += self.good_suffix[last - j].max(self.bad_char[alphabet_slot(haystack[i])]);
        }
        None
    }
}

/// bytes outside the alphabet share its last slot
fn alphabet_slot(byte: u8) -> usize {
    usize::from(byte).min(ALPHABET_SIZE - 1)
}

/// shift for a mismatched byte: its distance from the end of the needle at its
/// rightmost occurrence, excluding the final position
fn bad_char_table(needle: &[u8]) -> [usize; ALPHABET_SIZE] {
    let mut table = [needle.len(); ALPHABET_SIZE];
    let last = needle.len() - 1;
    for (i, &byte) in needle[..last].iter().enumerate() {
        table[alphabet_slot(byte)] = last - i;
    }
    table
}

/// shift for a mismatch after `k` matched bytes, indexed by `k`
fn good_suffix_table(needle: &[u8]) -> Vec<usize> {
    let len = needle.len();
    let mut table = vec![0; len];

    // matched suffix occurs nowhere else: align the longest prefix that is
    // also a suffix, or skip the needle entirely
    let mut last_prefix_position = len;
    for i in (1..=len).rev() {
        if is_prefix(needle, i) {
            last_prefix_position = i;
        }
        table[len - i] = last_prefix_position - i + len;
    }

    // matched suffix reoccurs inside the needle
    for i in 0..len - 1 {
        let suffix_len = suffix_length(needle, i);
        table[suffix_len] = len - 1 - i + suffix_len;
    }

    table
}

/// is `needle[p..]` a prefix of `needle`?
fn is_prefix(needle: &[u8], p: usize) -> bool {
    needle[p..].iter().zip(needle).all(|(a, b)| a == b)
}

/// length of the longest substring ending at `p` that is a suffix of `needle`
fn suffix_length(needle: &[u8], p: usize) -> usize {
    needle[..=p]
        .iter()
        .rev()
        .zip(needle.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
}
