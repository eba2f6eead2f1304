//! MIME header handling.

use crate::error::{Error, Result};
use std::fmt;

/// Ordered collection of header fields.
///
/// Fields serialize in the order they were first set, so composing the
/// same message twice yields the same header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing an existing value in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid field name or the value
    /// contains CR or LF.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        validate(&name, &value)?;

        match self
            .fields
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
        Ok(())
    }

    /// Gets a header value (case-insensitive name).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns an iterator over all headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of header fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no header is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn validate(name: &str, value: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(Error::InvalidHeader {
            name: name.to_string(),
            reason: "invalid field name".into(),
        });
    }
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidHeader {
            name: name.to_string(),
            reason: "value contains a line break".into(),
        });
    }
    Ok(())
}

impl fmt::Display for Headers {
    /// Writes `Name: value` lines terminated by CRLF. Empty values are
    /// written as a bare `Name:`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            if value.is_empty() {
                write!(f, "{name}:\r\n")?;
            } else {
                write!(f, "{name}: {value}\r\n")?;
            }
        }
        Ok(())
    }
}
