//! Identifier to database-name conversion.
//!
//! Column names come from [`to_db_name`], an acronym-aware camel to snake case
//! transform. Table names are the column-style name of the type, pluralized by
//! [`pluralize`] unless singular tables are configured.

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use regex::Regex;

/// Suffix rewrite rules for table pluralization, tried in order.
const PLURAL_RULES: &[(&str, &str)] = &[
    ("ch$", "ches"),
    ("ss$", "sses"),
    ("sh$", "shes"),
    ("day$", "days"),
    ("y$", "ies"),
    ("x$", "xes"),
    ("([^s])s$", "${1}sses"),
    ("([^s])s?$", "${1}s"),
];

fn plural_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        PLURAL_RULES
            .iter()
            .filter_map(|(pattern, replacement)| match Regex::new(pattern) {
                Ok(regex) => Some((regex, *replacement)),
                Err(e) => {
                    tracing::error!(pattern, error = %e, "Invalid pluralization rule");
                    None
                }
            })
            .collect()
    })
}

/// Pluralize a snake_case table name.
///
/// The first matching rule is applied once:
///
/// ```
/// use tagmodel_core::naming::pluralize;
///
/// assert_eq!(pluralize("category"), "categories");
/// assert_eq!(pluralize("box"), "boxes");
/// assert_eq!(pluralize("user"), "users");
/// ```
pub fn pluralize(name: &str) -> String {
    for (regex, replacement) in plural_rules() {
        if regex.is_match(name) {
            return regex.replace(name, *replacement).into_owned();
        }
    }
    name.to_string()
}

/// Conversions already computed, shared by every caller in the process.
struct NameCache {
    names: RwLock<HashMap<String, String>>,
}

impl NameCache {
    fn new() -> Self {
        Self {
            names: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_convert(&self, name: &str) -> String {
        {
            let names = self.names.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(converted) = names.get(name) {
                return converted.clone();
            }
        }

        let converted = snake_case(name);
        {
            let mut names = self.names.write().unwrap_or_else(PoisonError::into_inner);
            names.insert(name.to_string(), converted.clone());
        }
        converted
    }
}

fn name_cache() -> &'static NameCache {
    static CACHE: OnceLock<NameCache> = OnceLock::new();
    CACHE.get_or_init(NameCache::new)
}

/// Convert an identifier to a database column name.
///
/// An underscore is inserted before an uppercase letter that follows a
/// lowercase letter or digit, and before the last capital of an acronym that
/// starts a new word:
///
/// ```
/// use tagmodel_core::naming::to_db_name;
///
/// assert_eq!(to_db_name("UserId"), "user_id");
/// assert_eq!(to_db_name("HTTPServer"), "http_server");
/// assert_eq!(to_db_name("UserID"), "user_id");
/// assert_eq!(to_db_name("owner_type"), "owner_type");
/// ```
pub fn to_db_name(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    name_cache().get_or_convert(name)
}

fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}

/// Derive a table name from a declared type name.
pub fn default_table_name(type_name: &str, singular: bool) -> String {
    let name = to_db_name(type_name);
    if singular { name } else { pluralize(&name) }
}
