//! Structured labels embedded in commit messages.
//!
//! A label is a whole message line of the form `Name=Value` or
//! `Name: Value` where the name starts with an uppercase letter. Labels
//! carry migration metadata between repositories, most importantly the
//! origin revision stamp that lets a destination remember how far it has
//! migrated.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// One label line: `Name=Value` or `Name: Value`. Names start with an
/// uppercase letter (so prose like `fixes: typo` is not a label) but may
/// continue in mixed case; `Change-Id` and `GitOrigin-RevId` are labels.
/// The value needs at least one non-whitespace character.
static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][A-Za-z0-9_-]*) *[:=] *(\S.*?)\s*$").expect("label pattern is valid")
});

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

/// A `(name, value)` pair extracted from one commit-message line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    /// The label name, e.g. `GitOrigin-RevId`.
    pub name: String,
    /// The label value with surrounding whitespace trimmed; internal
    /// whitespace is preserved.
    pub value: String,
}

impl Label {
    /// Parse a single message line. Returns `None` for prose lines.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let captures = LABEL_LINE.captures(line)?;
        Some(Self {
            name: captures[1].to_owned(),
            value: captures[2].to_owned(),
        })
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_separator() {
        let label = Label::parse("BUG=1234").unwrap();
        assert_eq!(label.name, "BUG");
        assert_eq!(label.value, "1234");
    }

    #[test]
    fn colon_separator() {
        let label = Label::parse("Change-Id: I6cab6dc80fc3").unwrap();
        assert_eq!(label.name, "Change-Id");
        assert_eq!(label.value, "I6cab6dc80fc3");
    }

    #[test]
    fn value_whitespace_trimmed_outside_preserved_inside() {
        let label = Label::parse("NOTE=  keep  this  spacing  ").unwrap();
        assert_eq!(label.value, "keep  this  spacing");
    }

    #[test]
    fn name_may_contain_digits_underscore_dash() {
        assert!(Label::parse("A1_B-C=x").is_some());
    }

    #[test]
    fn lowercase_start_is_prose() {
        assert!(Label::parse("fixes=1234").is_none());
    }

    #[test]
    fn empty_value_is_prose() {
        assert!(Label::parse("BUG=").is_none());
        assert!(Label::parse("BUG:   ").is_none());
    }

    #[test]
    fn ordinary_sentences_are_prose() {
        assert!(Label::parse("Fix the frobnicator when idle.").is_none());
        assert!(Label::parse("").is_none());
        assert!(Label::parse("  indented: nope").is_none());
    }

    #[test]
    fn display_round_trips_the_pair() {
        let label = Label::parse("GitOrigin-RevId: abc123").unwrap();
        assert_eq!(format!("{label}"), "GitOrigin-RevId=abc123");
        let reparsed = Label::parse(&format!("{label}")).unwrap();
        assert_eq!(reparsed, label);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            // Formatting an extracted label and extracting again preserves
            // the (name, value) pair.
            #[test]
            fn extraction_idempotent(
                name in "[A-Z][A-Z0-9_-]{0,10}",
                value in "[a-zA-Z0-9][a-zA-Z0-9 ._-]{0,20}",
            ) {
                let line = format!("{name}={value}");
                if let Some(label) = Label::parse(&line) {
                    let reparsed = Label::parse(&format!("{label}")).unwrap();
                    prop_assert_eq!(reparsed, label);
                }
            }
        }
    }
}
