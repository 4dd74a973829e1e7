//! Field annotation parsing.
//!
//! Every field carries raw annotation text in two namespaces, `sql` and
//! `tagmodel`. Both hold `;`-separated settings of the form `KEY` or
//! `KEY:value`:
//!
//! ```text
//! #[tagmodel = "column:F_enabled"]
//! #[sql = "type:tinyint(8) unsigned;not null;default:1;unique_index:I_org;unique_index:I_cert"]
//! ```
//!
//! Parsing never fails. Keys are trimmed and uppercased; values keep everything
//! after the first `:`. A key repeated within or across namespaces accumulates
//! its values joined by `:`, which is how multi-valued settings such as unique
//! index groups are expressed.

use std::collections::BTreeMap;

use serde::Serialize;

/// Annotation text attached to a single field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StructTag {
    /// The `sql` namespace.
    pub sql: &'static str,
    /// The `tagmodel` namespace.
    pub tagmodel: &'static str,
}

impl StructTag {
    /// Create a tag from both namespaces.
    pub const fn new(sql: &'static str, tagmodel: &'static str) -> Self {
        Self { sql, tagmodel }
    }

    /// True if the field is excluded from persistence altogether (`-`).
    pub fn is_ignored(&self) -> bool {
        self.sql.trim() == "-" || self.tagmodel.trim() == "-"
    }

    /// True if neither namespace has any text.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty() && self.tagmodel.is_empty()
    }

    /// Parse both namespaces into one settings map.
    pub fn settings(&self) -> TagSettings {
        TagSettings::parse([self.sql, self.tagmodel])
    }
}

/// Parsed annotation settings, keyed by uppercased setting name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSettings {
    settings: BTreeMap<String, String>,
}

impl TagSettings {
    /// Parse any number of annotation strings, in order, into one map.
    pub fn parse<'a, I>(sources: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parsed = Self::default();
        for source in sources {
            for segment in source.split(';') {
                let (key, value) = match segment.split_once(':') {
                    Some((key, value)) => (normalize_key(key), value.to_string()),
                    None => {
                        let key = normalize_key(segment);
                        let value = key.clone();
                        (key, value)
                    }
                };
                if key.is_empty() {
                    continue;
                }
                parsed.insert(key, value);
            }
        }
        parsed
    }

    fn insert(&mut self, key: String, value: String) {
        self.settings
            .entry(key)
            .and_modify(|existing| {
                existing.push(':');
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    /// Look up a setting by key (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(&normalize_key(key)).map(String::as_str)
    }

    /// Look up a setting, treating an empty value as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// True if the key is present (case-insensitive).
    pub fn contains(&self, key: &str) -> bool {
        self.settings.contains_key(&normalize_key(key))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// True if nothing was parsed.
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Iterate settings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

/// Parse a [`StructTag`] into [`TagSettings`].
pub fn parse_tag_settings(tag: &StructTag) -> TagSettings {
    tag.settings()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_concatenate_across_namespaces() {
        let tag = StructTag::new(
            "type:tinyint(8) unsigned;not null;default:1;unique_index:I_organization;unique_index:I_certificate",
            "column:F_enabled",
        );
        let settings = tag.settings();
        assert_eq!(
            settings.get("UNIQUE_INDEX"),
            Some("I_organization:I_certificate")
        );
        assert_eq!(settings.get("COLUMN"), Some("F_enabled"));
        assert_eq!(settings.get("TYPE"), Some("tinyint(8) unsigned"));
        assert_eq!(settings.get("DEFAULT"), Some("1"));
    }

    #[test]
    fn test_key_without_value_maps_to_itself() {
        let settings = TagSettings::parse(["primary_key; not null "]);
        assert_eq!(settings.get("PRIMARY_KEY"), Some("PRIMARY_KEY"));
        assert_eq!(settings.get("NOT NULL"), Some("NOT NULL"));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let settings = TagSettings::parse(["ForeignKey:OwnerRef"]);
        assert!(settings.contains("foreignkey"));
        assert_eq!(settings.get("FOREIGNKEY"), Some("OwnerRef"));
    }

    #[test]
    fn test_value_keeps_everything_after_first_colon() {
        let settings = TagSettings::parse(["default:'12:30:00'"]);
        assert_eq!(settings.get("DEFAULT"), Some("'12:30:00'"));
    }

    #[test]
    fn test_same_key_twice_in_one_namespace() {
        let settings = TagSettings::parse(["KEY:value1;KEY:value2"]);
        assert_eq!(settings.get("KEY"), Some("value1:value2"));
        assert_eq!(settings.len(), 1);
    }

    #[test]
    fn test_malformed_input_degrades() {
        let settings = TagSettings::parse([";;:orphan; ;size:"]);
        assert_eq!(settings.get("SIZE"), Some(""));
        assert_eq!(settings.get_non_empty("SIZE"), None);
        assert_eq!(settings.len(), 1);
        assert!(TagSettings::parse([""]).is_empty());
    }

    #[test]
    fn test_ignored_tag() {
        assert!(StructTag::new("-", "").is_ignored());
        assert!(StructTag::new("", " - ").is_ignored());
        assert!(!StructTag::new("type:text", "").is_ignored());
        assert!(StructTag::default().is_empty());
    }
}
