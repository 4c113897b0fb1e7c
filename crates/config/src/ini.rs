//! A small ini-style parser: `[section]` headers, `key = value` pairs,
//! `#`/`;` comments, blank lines. No nesting, no multi-line values.

use std::collections::HashMap;

use crate::error::ConfigError;

/// A parsed ini file: section name → key → raw string value.
#[derive(Debug, Clone, Default)]
pub struct Ini {
    sections: HashMap<String, HashMap<String, String>>,
}

impl Ini {
    /// Parses `text` into sections and key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedLine`] for any non-blank,
    /// non-comment line that is neither a `[section]` header nor a
    /// `key = value` pair.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current = String::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(stripped) = line.strip_prefix('[') {
                let Some(name) = stripped.strip_suffix(']') else {
                    return Err(ConfigError::MalformedLine {
                        line: idx + 1,
                        text: raw_line.to_string(),
                    });
                };
                current = name.trim().to_string();
                sections.entry(current.clone()).or_default();
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedLine {
                    line: idx + 1,
                    text: raw_line.to_string(),
                });
            };
            if current.is_empty() {
                return Err(ConfigError::MalformedLine {
                    line: idx + 1,
                    text: raw_line.to_string(),
                });
            }
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }

        Ok(Self { sections })
    }

    /// Reads a required string key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if `section.key` is absent.
    pub fn get(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingKey {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    /// Reads an optional string key.
    #[must_use]
    pub fn get_opt(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section).and_then(|s| s.get(key)).map(String::as_str)
    }

    /// Reads a required key and parses it via [`std::str::FromStr`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if absent, or
    /// [`ConfigError::InvalidValue`] if present but unparsable.
    pub fn get_parsed<T: std::str::FromStr>(&self, section: &str, key: &str) -> Result<T, ConfigError> {
        let raw = self.get(section, key)?;
        raw.parse().map_err(|_| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
        })
    }
}
