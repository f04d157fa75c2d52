//! Parse Utilities
//!
//! Source locations attached to elements and compile errors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chars;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ParseLocation {
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl ParseLocation {
    pub fn new(offset: usize, line: usize, col: usize) -> Self {
        ParseLocation { offset, line, col }
    }

    /// Compute the 1-based line and column of `offset` within `source`.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let mut line = 1;
        let mut col = 1;
        for ch in source[..offset].chars() {
            if ch == chars::NEWLINE {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        ParseLocation::new(offset, line, col)
    }

    /// Return the source line containing the location.
    pub fn get_context<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.lines().nth(self.line.checked_sub(1)?)
    }
}

impl fmt::Display for ParseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}
