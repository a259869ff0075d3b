// SPDX-License-Identifier: AGPL-3.0-or-later
//! Parser for parenthesized tree text.
//!
//! Grammar: a node is either a leaf label or `(left,right)label`, with
//! every node labeled; an optional trailing `;` and surrounding
//! whitespace are accepted. Labels run up to the next structural
//! character and must be non-numeric and unique (enforced by tree
//! construction).
//!
//! Example: `((a,b)m,c)r` is the three-leaf caterpillar rooted at `r`.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::recon::tree::Tree;

struct Cursor<'a> {
    text: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text: text.as_bytes(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.text.len() && self.text[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.text.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(Error::Tree(format!(
                "expected '{}' at byte {}, found '{}'",
                byte as char, self.pos, b as char
            ))),
            None => Err(Error::Tree(format!(
                "expected '{}' at byte {}, found end of input",
                byte as char, self.pos
            ))),
        }
    }

    fn label(&mut self) -> Result<String> {
        self.skip_whitespace();
        let start = self.pos;
        while self.pos < self.text.len() {
            let b = self.text[self.pos];
            if b == b'(' || b == b')' || b == b',' || b == b';' || b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(Error::Tree(format!("missing label at byte {start}")));
        }
        // Parsed from ASCII structural scanning of valid UTF-8 input.
        Ok(String::from_utf8_lossy(&self.text[start..self.pos]).into_owned())
    }

    /// One node; appends its vertex entry and returns its label.
    fn node(&mut self, entries: &mut Vec<(String, Option<(String, String)>)>) -> Result<String> {
        if self.peek() == Some(b'(') {
            self.pos += 1;
            let left = self.node(entries)?;
            self.expect(b',')?;
            let right = self.node(entries)?;
            self.expect(b')')?;
            let name = self.label()?;
            entries.push((name.clone(), Some((left, right))));
            Ok(name)
        } else {
            let name = self.label()?;
            entries.push((name.clone(), None));
            Ok(name)
        }
    }
}

/// Parse tree text into a validated [`Tree`].
///
/// # Errors
///
/// Returns [`Error::Tree`] on malformed text or an invalid tree
/// (duplicate or numeric labels, non-binary structure).
pub fn parse(text: &str) -> Result<Tree> {
    let mut cursor = Cursor::new(text);
    let mut entries = Vec::new();
    cursor.node(&mut entries)?;
    if cursor.peek() == Some(b';') {
        cursor.pos += 1;
    }
    if let Some(b) = cursor.peek() {
        return Err(Error::Tree(format!(
            "trailing input at byte {}: '{}'",
            cursor.pos, b as char
        )));
    }
    Tree::from_vertex_pairs(&entries)
}

/// Parse a tree from a file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, otherwise as
/// [`parse`].
pub fn parse_file(path: &Path) -> Result<Tree> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}
