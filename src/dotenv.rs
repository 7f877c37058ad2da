//! Line-preserving `.env` model.
//!
//! A [`Document`] keeps one [`Line`] per input line, in file order. Lines that
//! look like `KEY=VALUE` become [`Line::Entry`]; everything else (comments,
//! blank lines, malformed content) is kept as [`Line::Verbatim`] and rendered
//! back untouched. That ordering is what lets a merge rewrite a handful of
//! keys while the rest of the file survives as the user wrote it.
//!
//! ```text
//! KEY1=value1
//! # a comment, preserved verbatim
//!
//! KEY3=
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    convert::Infallible,
    fmt,
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;

/// Keys to overwrite, mapped to their new values.
pub type Replacements = BTreeMap<String, String>;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\r|\n").expect("line break pattern is valid"));

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s\x{FEFF}]*([A-Za-z0-9_.-]+)[\s\x{FEFF}]*=(.*)$")
        .expect("entry pattern is valid")
});

// A byte order mark counts as whitespace, so a BOM-prefixed first line is
// still an entry.
fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == BOM
}

const BOM: char = '\u{feff}';

/// A single line of a `.env` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Comment, blank line or anything that is not `KEY=VALUE`.
    Verbatim(String),
    /// A recognised assignment. `value` is already trimmed.
    Entry { key: String, value: String },
}

impl Line {
    fn parse(raw: &str) -> Self {
        match ENTRY.captures(raw) {
            Some(caps) => Line::Entry {
                key: caps[1].to_string(),
                value: caps
                    .get(2)
                    .map_or("", |m| m.as_str())
                    .trim_matches(is_blank)
                    .to_string(),
            },
            None => Line::Verbatim(raw.to_string()),
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Verbatim(text) => f.write_str(text),
            Line::Entry { key, value } => write!(f, "{key}={value}"),
        }
    }
}

/// Outcome of [`Document::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Replacement keys that matched at least one entry.
    pub updated: Vec<String>,
    /// Replacement keys with no entry in the document. These are never appended.
    pub missing: Vec<String>,
}

/// An ordered, parsed `.env` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    lines: Vec<Line>,
}

impl Document {
    /// Parses `contents` into one record per line.
    ///
    /// `\r\n`, `\r` and `\n` all end a line. A trailing terminator yields a
    /// trailing empty [`Line::Verbatim`], and empty input yields a single one.
    /// Parsing never fails.
    pub fn parse(contents: &str) -> Self {
        Self {
            lines: LINE_BREAK.split(contents).map(Line::parse).collect(),
        }
    }

    /// Renders the document, joining lines with `\n`.
    ///
    /// No terminator follows the last line, but a file that ended in a
    /// terminator parsed into a trailing blank line, so it still ends in `\n`.
    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Value of the first entry named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Entry keys in file order, duplicates included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, .. } => Some(key.as_str()),
            Line::Verbatim(_) => None,
        })
    }

    /// Overwrites the value of every entry whose key is in `replacements`.
    ///
    /// Verbatim lines and unlisted entries are left alone, and keys absent from
    /// the document are reported in [`Applied::missing`] rather than added.
    pub fn apply(&mut self, replacements: &Replacements) -> Applied {
        let mut hit = BTreeSet::new();
        for line in &mut self.lines {
            if let Line::Entry { key, value } = line {
                if let Some(new) = replacements.get(key.as_str()) {
                    value.clone_from(new);
                    hit.insert(key.clone());
                }
            }
        }

        let (updated, missing): (Vec<_>, Vec<_>) = replacements
            .keys()
            .cloned()
            .partition(|key| hit.contains(key));
        Applied { updated, missing }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, line) in self.lines.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{line}")?;
        }
        Ok(())
    }
}

impl FromStr for Document {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
