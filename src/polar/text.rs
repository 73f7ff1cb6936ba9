//! The `[Section]` grammar shared by Polar text exports.
//!
//! Every line is either a section header or content of the section opened
//! last. Content before the first header is ignored.

use std::collections::BTreeMap;

use csv::{ReaderBuilder, Trim};
use either::Either::{self, Left, Right};
use tracing::trace;

use crate::Error;

/// The lines of one section, without the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub name: &'a str,
    pub lines: Vec<&'a str>,
}

/// A text document split into sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document<'a> {
    sections: Vec<Section<'a>>,
}

/// Classify a line as a section header (carrying the name) or content.
fn classify(line: &str) -> Either<&str, &str> {
    let trimmed = line.trim();

    match trimmed.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
        Some(name) => Left(name.trim()),
        None => Right(trimmed),
    }
}

impl<'a> Document<'a> {
    pub fn parse(text: &'a str) -> Self {
        let mut sections: Vec<Section<'a>> = Vec::new();

        for line in text.lines() {
            match classify(line) {
                Left(name) => sections.push(Section {
                    name,
                    lines: Vec::new(),
                }),
                Right(content) => match sections.last_mut() {
                    Some(section) => section.lines.push(content),
                    None if content.is_empty() => {}
                    None => trace!(line = content, "content before the first section"),
                },
            }
        }

        Self { sections }
    }

    /// The first section of that name, compared case-insensitively.
    pub fn section(&self, name: &str) -> Option<&Section<'a>> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section<'a>> {
        self.sections.iter()
    }
}

impl<'a> Section<'a> {
    /// Content lines that are not blank.
    pub fn content(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.lines.iter().copied().filter(|l| !l.is_empty())
    }

    /// `Key=Value` pairs. Lines without `=` are ignored; later keys win.
    pub fn pairs(&self) -> BTreeMap<&'a str, &'a str> {
        self.content()
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect()
    }

    /// The section as a table of whitespace-separated cells.
    pub fn rows(&self) -> Result<Vec<Vec<String>>, Error> {
        let text = self.content().collect::<Vec<_>>().join("\n");

        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        reader
            .records()
            .map(|record| {
                let record = record.map_err(|e| {
                    Error::CorruptFile(format!("[{}] row: {e}", self.name))
                })?;

                // Some exports pad with spaces instead of tabs.
                Ok(record
                    .iter()
                    .flat_map(str::split_whitespace)
                    .map(str::to_owned)
                    .collect())
            })
            .collect()
    }
}

/// Parse an integer cell of a data row.
pub fn integer(section: &str, cell: Option<impl AsRef<str>>) -> Result<i64, Error> {
    let cell = cell.ok_or_else(|| Error::CorruptFile(format!("[{section}] row is too short")))?;
    let cell = cell.as_ref();

    cell.parse()
        .map_err(|_| Error::CorruptFile(format!("[{section}] malformed number {cell:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "\
stray
[Params]
Version=106
 Monitor = 12

[HRData]
120\t250
121 251\t3

[note]
Hello
";

    #[test]
    fn sections_and_pairs() {
        let document = Document::parse(TEXT);

        assert_eq!(document.sections().count(), 3);
        assert!(document.section("NOTE").is_some());
        assert!(document.section("Trip").is_none());

        let params = document.section("Params").unwrap().pairs();
        assert_eq!(params.get("Version"), Some(&"106"));
        assert_eq!(params.get("Monitor"), Some(&"12"));
    }

    #[test]
    fn whitespace_rows() {
        let document = Document::parse(TEXT);
        let rows = document.section("HRData").unwrap().rows().unwrap();

        assert_eq!(rows, [vec!["120", "250"], vec!["121", "251", "3"]]);
        assert_eq!(integer("HRData", rows[1].get(2)).unwrap(), 3);
        assert!(integer("HRData", rows[0].get(2)).is_err());
    }

    #[test]
    fn malformed_numbers() {
        assert!(matches!(
            integer("HRData", Some("12a")),
            Err(Error::CorruptFile(_))
        ));
    }
}
