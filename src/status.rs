use crate::error::{ParseError, ParseErrorKind};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Write;

/// separator between the original and new path of a rename or copy
const ARROW: &str = " -> ";

/// the state of one side (index or working tree) of a changed path
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    #[default]
    Unmodified,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Untracked,
}

impl FileState {
    /// look up the state for a porcelain status code
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            ' ' => Some(Self::Unmodified),
            '?' => Some(Self::Untracked),
            'M' => Some(Self::Modified),
            'A' => Some(Self::Added),
            'D' => Some(Self::Deleted),
            'R' => Some(Self::Renamed),
            'C' => Some(Self::Copied),
            'U' => Some(Self::Unmerged),
            _ => None,
        }
    }

    /// the porcelain status code for this state
    pub fn code(self) -> char {
        match self {
            Self::Unmodified => ' ',
            Self::Untracked => '?',
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Unmerged => 'U',
        }
    }
}

/// a single changed path reported by `git status --porcelain`
///
/// serialises with the keys of the original file entry format
/// (`old_state`, `state`, `path`, `orig_path`, `old_mode`, `mode`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub old_state: FileState, // index
    #[serde(rename = "state")]
    pub new_state: FileState, // working tree
    pub path: String,
    #[serde(rename = "orig_path")]
    pub original_path: Option<String>, // set only when the line had a rename arrow
    pub old_mode: Option<String>,
    #[serde(rename = "mode")]
    pub new_mode: Option<String>,
}

impl FileEntry {
    pub fn new(old_state: FileState, new_state: FileState, path: impl Into<String>) -> Self {
        Self {
            old_state,
            new_state,
            path: path.into(),
            original_path: None,
            old_mode: None,
            new_mode: None,
        }
    }

    #[must_use]
    pub fn with_original_path(mut self, original_path: impl Into<String>) -> Self {
        self.original_path = Some(original_path.into());
        self
    }

    /// render this entry as the porcelain line it would be parsed from
    pub fn to_porcelain_line(&self) -> String {
        let mut line = String::new();
        line.push(self.old_state.code());
        line.push(self.new_state.code());
        line.push(' ');
        if let Some(original_path) = &self.original_path {
            line.push_str(&quote_path(original_path));
            line.push_str(ARROW);
        }
        line.push_str(&quote_path(&self.path));
        line
    }
}

impl std::fmt::Display for FileEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_porcelain_line())
    }
}

/// parse the output of `git status --porcelain` into entries, in input order
///
/// any malformed line fails the whole parse
pub fn parse_status(text: &str) -> Result<Vec<FileEntry>, ParseError> {
    if text.trim_end().is_empty() {
        return Ok(Vec::new());
    }

    text.trim_end_matches(['\n', '\r'])
        .lines()
        .enumerate()
        .map(|(index, line)| {
            parse_line(line).map_err(|kind| ParseError {
                line_number: index + 1,
                line: line.to_string(),
                kind,
            })
        })
        .collect()
}

/// parse a single `XY path` or `XY orig -> path` line
fn parse_line(line: &str) -> Result<FileEntry, ParseErrorKind> {
    let mut parser = LineParser::new(line);

    let old_state = parser.read_state()?;
    let new_state = parser.read_state()?;
    if !parser.read(" ") {
        return Err(ParseErrorKind::MissingSeparator);
    }

    let path = parser.read_path()?;
    let entry = if parser.is_done() {
        FileEntry::new(old_state, new_state, path)
    } else {
        if !parser.read(ARROW) {
            return Err(ParseErrorKind::TrailingContent(parser.rest.to_string()));
        }
        let new_path = parser.read_path()?;
        FileEntry::new(old_state, new_state, new_path).with_original_path(path)
    };

    if !parser.is_done() {
        return Err(ParseErrorKind::TrailingContent(parser.rest.to_string()));
    }
    Ok(entry)
}

/// cursor over the unconsumed remainder of a line
struct LineParser<'a> {
    rest: &'a str,
}

impl<'a> LineParser<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn is_done(&self) -> bool {
        self.rest.is_empty()
    }

    /// consume `token` if the remainder starts with it
    fn read(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn read_state(&mut self) -> Result<FileState, ParseErrorKind> {
        let mut chars = self.rest.chars();
        let code = chars.next().ok_or(ParseErrorKind::MissingStateCode)?;
        self.rest = chars.as_str();
        FileState::from_code(code).ok_or(ParseErrorKind::UnknownStateCode(code))
    }

    /// read a path, either quoted or verbatim up to the rename arrow or end of line
    fn read_path(&mut self) -> Result<String, ParseErrorKind> {
        if self.rest.starts_with('"') {
            return self.read_quoted_path();
        }

        let end = self.rest.find(ARROW).unwrap_or(self.rest.len());
        if end == 0 {
            return Err(ParseErrorKind::MissingPath);
        }
        let (path, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(path.to_string())
    }

    /// read a double-quoted path, undoing git's c-style escaping
    fn read_quoted_path(&mut self) -> Result<String, ParseErrorKind> {
        let bytes = self.rest.as_bytes();
        let mut decoded = Vec::new();
        let mut i = 1;

        loop {
            match bytes.get(i) {
                None => return Err(ParseErrorKind::UnterminatedQuote),
                Some(b'"') => break,
                Some(b'\\') => {
                    let escaped = *bytes.get(i + 1).ok_or(ParseErrorKind::UnterminatedQuote)?;
                    let (byte, len) = match escaped {
                        b'"' | b'\\' => (escaped, 2),
                        b'a' => (0x07, 2),
                        b'b' => (0x08, 2),
                        b't' => (b'\t', 2),
                        b'n' => (b'\n', 2),
                        b'v' => (0x0b, 2),
                        b'f' => (0x0c, 2),
                        b'r' => (b'\r', 2),
                        b'0'..=b'3' => (octal_byte(bytes.get(i + 1..i + 4))?, 4),
                        _ => return Err(ParseErrorKind::InvalidEscape),
                    };
                    decoded.push(byte);
                    i += len;
                }
                Some(&byte) => {
                    decoded.push(byte);
                    i += 1;
                }
            }
        }

        // `i` is at the closing quote, which is ascii so this is a char boundary
        self.rest = &self.rest[i + 1..];
        if decoded.is_empty() {
            return Err(ParseErrorKind::MissingPath);
        }
        String::from_utf8(decoded).map_err(|_| ParseErrorKind::InvalidUtf8)
    }
}

/// decode a three digit octal escape such as `303`
fn octal_byte(digits: Option<&[u8]>) -> Result<u8, ParseErrorKind> {
    let digits = digits.ok_or(ParseErrorKind::InvalidEscape)?;
    digits.iter().try_fold(0u8, |acc, &digit| match digit {
        b'0'..=b'7' => acc
            .checked_mul(8)
            .and_then(|acc| acc.checked_add(digit - b'0'))
            .ok_or(ParseErrorKind::InvalidEscape),
        _ => Err(ParseErrorKind::InvalidEscape),
    })
}

/// quote a path the way git does when it contains whitespace or special characters
pub fn quote_path(path: &str) -> Cow<'_, str> {
    let needs_quoting = path
        .bytes()
        .any(|b| b == b' ' || b == b'"' || b == b'\\' || b < 0x20 || b >= 0x7f);
    if !needs_quoting {
        return Cow::Borrowed(path);
    }

    let mut quoted = String::with_capacity(path.len() + 2);
    quoted.push('"');
    for byte in path.bytes() {
        match byte {
            b'"' => quoted.push_str("\\\""),
            b'\\' => quoted.push_str("\\\\"),
            0x07 => quoted.push_str("\\a"),
            0x08 => quoted.push_str("\\b"),
            b'\t' => quoted.push_str("\\t"),
            b'\n' => quoted.push_str("\\n"),
            0x0b => quoted.push_str("\\v"),
            0x0c => quoted.push_str("\\f"),
            b'\r' => quoted.push_str("\\r"),
            0x20..0x7f => quoted.push(char::from(byte)),
            _ => {
                let _ = write!(quoted, "\\{byte:03o}");
            }
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}
