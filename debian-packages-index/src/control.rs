// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Control file paragraphs as found in `Packages` indices.

See <https://www.debian.org/doc/debian-policy/ch-controlfields.html>
for the canonical source of truth for how control files work.

Paragraphs are held as the exact lines they were read from. No field is
re-formatted, validated or re-ordered, so content written back out is the
content that was read.
*/

use {
    crate::error::{PackagesIndexError, Result},
    std::io::Write,
};

/// Whether a line, stripped of its terminator, separates paragraphs.
///
/// Only truly empty lines do. A line holding just spaces or tabs is paragraph
/// content and is retained.
fn is_separator(line: &str) -> bool {
    line.is_empty()
}

fn strip_line_terminator(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

/// A paragraph in a control file describing a single package.
///
/// A stanza is an ordered series of lines. A line begins a field (`Name: value`) or,
/// if it starts with whitespace, continues the value of the previous field.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Stanza {
    lines: Vec<String>,
}

impl Stanza {
    /// Construct an instance from lines without line terminators.
    pub fn from_lines(lines: impl IntoIterator<Item = impl ToString>) -> Self {
        Self {
            lines: lines.into_iter().map(|l| l.to_string()).collect(),
        }
    }

    /// Parse text holding exactly one paragraph.
    ///
    /// Surrounding blank lines are tolerated. Text without any content or with
    /// multiple paragraphs is rejected.
    pub fn parse_str(s: &str) -> Result<Self> {
        let mut stanzas = PackagesIndex::parse_str(s).into_stanzas();

        match (stanzas.next(), stanzas.next()) {
            (Some(stanza), None) => Ok(stanza),
            (None, _) => Err(PackagesIndexError::MalformedStanza(
                "no paragraph content".to_string(),
            )),
            (Some(_), Some(_)) => Err(PackagesIndexError::MalformedStanza(format!(
                "expected 1 paragraph; got {}",
                2 + stanzas.count()
            ))),
        }
    }

    /// Whether the stanza has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Iterate over lines in this stanza, in their original order.
    pub fn iter_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.as_str())
    }

    /// Obtain the value of the named field.
    ///
    /// Field names are compared case insensitively. Only the value on the line
    /// defining the field is returned; continuation lines are not included.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.lines
            .iter()
            .filter(|l| !l.starts_with([' ', '\t']))
            .filter_map(|l| l.split_once(':'))
            .find(|(field, _)| field.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
    }

    /// Whether a named field is present in this stanza.
    pub fn has_field(&self, name: &str) -> bool {
        self.field_str(name).is_some()
    }

    /// The `Package` field value.
    ///
    /// This is the identity of the stanza within an index.
    pub fn package(&self) -> Option<&str> {
        self.field_str("Package")
    }

    /// The `Version` field value.
    pub fn version_str(&self) -> Option<&str> {
        self.field_str("Version")
    }

    /// The `Architecture` field value.
    pub fn architecture(&self) -> Option<&str> {
        self.field_str("Architecture")
    }

    /// Serialize the stanza to a writer.
    ///
    /// Every line is terminated by a newline. No trailing empty line is written.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for line in &self.lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }

        Ok(())
    }
}

impl std::fmt::Display for Stanza {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }

        Ok(())
    }
}

/// Holds parsing state for control files.
///
/// Instances are fed lines of text and emit [Stanza] instances as they are completed.
#[derive(Clone, Debug, Default)]
pub struct StanzaParser {
    stanza: Stanza,
}

impl StanzaParser {
    /// Write a line to the parser.
    ///
    /// A trailing `\n` or `\r\n` is removed. If the line terminates an in-progress
    /// stanza, that stanza is returned.
    pub fn write_line(&mut self, line: &str) -> Option<Stanza> {
        let line = strip_line_terminator(line);

        if is_separator(line) {
            if self.stanza.is_empty() {
                None
            } else {
                Some(std::mem::take(&mut self.stanza))
            }
        } else {
            self.stanza.lines.push(line.to_string());
            None
        }
    }

    /// Finish parsing, consuming self.
    ///
    /// Returns the in-progress stanza, if any.
    pub fn finish(self) -> Option<Stanza> {
        if self.stanza.is_empty() {
            None
        } else {
            Some(self.stanza)
        }
    }
}

/// The content of a `Packages` index.
///
/// An index is an ordered series of stanzas. When serialized, stanzas are separated
/// by exactly one empty line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PackagesIndex {
    stanzas: Vec<Stanza>,
}

impl PackagesIndex {
    /// Parse an index from a string.
    ///
    /// Empty input yields an empty index.
    pub fn parse_str(s: &str) -> Self {
        let mut stanzas = vec![];
        let mut parser = StanzaParser::default();

        for line in s.lines() {
            if let Some(stanza) = parser.write_line(line) {
                stanzas.push(stanza);
            }
        }

        stanzas.extend(parser.finish());

        Self { stanzas }
    }

    /// Construct an instance from stanzas.
    ///
    /// Empty stanzas are dropped since they can't be represented.
    pub fn from_stanzas(stanzas: impl IntoIterator<Item = Stanza>) -> Self {
        Self {
            stanzas: stanzas.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    /// Number of stanzas in this index.
    pub fn len(&self) -> usize {
        self.stanzas.len()
    }

    /// Whether the index holds no stanzas.
    pub fn is_empty(&self) -> bool {
        self.stanzas.is_empty()
    }

    /// Append a stanza to the end of this index.
    ///
    /// Empty stanzas are ignored.
    pub fn push(&mut self, stanza: Stanza) {
        if !stanza.is_empty() {
            self.stanzas.push(stanza);
        }
    }

    /// Retain only stanzas for which the predicate returns true.
    ///
    /// Relative order of retained stanzas is preserved.
    pub fn retain(&mut self, f: impl FnMut(&Stanza) -> bool) {
        self.stanzas.retain(f);
    }

    /// Obtain stanzas in this index.
    pub fn stanzas(&self) -> impl Iterator<Item = &Stanza> {
        self.stanzas.iter()
    }

    /// Obtain stanzas in this index, consuming self.
    pub fn into_stanzas(self) -> impl Iterator<Item = Stanza> {
        self.stanzas.into_iter()
    }

    /// Serialize the index to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (i, stanza) in self.stanzas.iter().enumerate() {
            if i > 0 {
                writer.write_all(b"\n")?;
            }
            stanza.write(writer)?;
        }

        Ok(())
    }
}

impl std::fmt::Display for PackagesIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, stanza) in self.stanzas.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", stanza)?;
        }

        Ok(())
    }
}
