//! Authorship mapping between origin and destination.
//!
//! An [`Author`] is a validated `name <email>` pair. An [`Authoring`]
//! policy decides which author a destination commit carries: the origin
//! author unchanged, a fixed default, or the origin author only when the
//! email is whitelisted.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, Result};

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

/// A commit author: non-empty name plus an email that is either empty or
/// of the `local@domain` form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Author {
    name: String,
    email: String,
}

impl Author {
    /// Create a validated author.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let email = email.into();
        if name.trim().is_empty() {
            return Err(MigrationError::config("author name is empty"));
        }
        if !email.is_empty() && !is_plausible_email(&email) {
            return Err(MigrationError::config(format!(
                "author email '{email}' is not of the form local@domain"
            )));
        }
        Ok(Self { name, email })
    }

    /// Placeholder for commits whose author header is absent.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            name: "Unknown".to_owned(),
            email: String::new(),
        }
    }

    /// Parse the `Name <email>` form used by git and by configuration files.
    /// `<>` yields an empty email.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (Some(open), Some(close)) = (input.rfind('<'), input.rfind('>')) else {
            return Err(MigrationError::config(format!(
                "author '{input}' is not of the form 'Name <email>'"
            )));
        };
        if close < open {
            return Err(MigrationError::config(format!(
                "author '{input}' is not of the form 'Name <email>'"
            )));
        }
        let name = input[..open].trim();
        let email = input[open + 1..close].trim();
        Self::new(name, email)
    }

    /// The author's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The author's email, possibly empty.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Case-insensitive email comparison, the equality used for whitelist
    /// membership.
    #[must_use]
    pub fn same_email(&self, other: &str) -> bool {
        self.email.eq_ignore_ascii_case(other)
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

impl FromStr for Author {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Author {
    type Error = MigrationError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Author> for String {
    fn from(author: Author) -> Self {
        author.to_string()
    }
}

// ---------------------------------------------------------------------------
// Authoring
// ---------------------------------------------------------------------------

/// How destination authorship is derived from origin authorship.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthoringMode {
    /// Keep the origin author unchanged.
    #[default]
    PassThrough,
    /// Always use the configured default author.
    UseDefault,
    /// Keep the origin author when the email is whitelisted, otherwise use
    /// the default author.
    Whitelist,
}

/// An authorship policy. The default author is present by construction
/// whenever the mode needs one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authoring {
    mode: AuthoringMode,
    default_author: Option<Author>,
    /// Lowercased whitelisted emails.
    whitelist: BTreeSet<String>,
}

impl Authoring {
    /// Pass origin authors through unchanged.
    #[must_use]
    pub const fn pass_through() -> Self {
        Self {
            mode: AuthoringMode::PassThrough,
            default_author: None,
            whitelist: BTreeSet::new(),
        }
    }

    /// Replace every origin author with `default_author`.
    #[must_use]
    pub fn use_default(default_author: Author) -> Self {
        Self {
            mode: AuthoringMode::UseDefault,
            default_author: Some(default_author),
            whitelist: BTreeSet::new(),
        }
    }

    /// Keep whitelisted origin authors, replace everyone else with
    /// `default_author`.
    pub fn whitelist<I, S>(default_author: Author, emails: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let whitelist: BTreeSet<String> = emails
            .into_iter()
            .map(|e| e.as_ref().to_ascii_lowercase())
            .collect();
        if whitelist.is_empty() {
            return Err(MigrationError::config(
                "whitelist authoring requires at least one whitelisted email",
            ));
        }
        Ok(Self {
            mode: AuthoringMode::Whitelist,
            default_author: Some(default_author),
            whitelist,
        })
    }

    /// Map an origin author to the author the destination commit carries.
    #[must_use]
    pub fn resolve(&self, origin_author: &Author) -> Author {
        match self.mode {
            AuthoringMode::PassThrough => origin_author.clone(),
            AuthoringMode::UseDefault => self.default(),
            AuthoringMode::Whitelist => {
                if self
                    .whitelist
                    .contains(&origin_author.email().to_ascii_lowercase())
                {
                    origin_author.clone()
                } else {
                    self.default()
                }
            }
        }
    }

    fn default(&self) -> Author {
        self.default_author
            .clone()
            .expect("default author present for non-pass-through modes by construction")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
