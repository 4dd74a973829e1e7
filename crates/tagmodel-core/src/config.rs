//! Resolution configuration.
//!
//! A [`Config`] is owned by a [`ModelCache`](crate::ModelCache); metadata cached
//! under one configuration is never shared with another.

use std::fmt;
use std::sync::Arc;

/// Hook applied to a model's raw table name whenever the name is displayed or
/// used to build a query.
pub type TableNameHandler = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Process-wide naming and strictness settings.
#[derive(Clone, Default)]
pub struct Config {
    /// Keep derived table names singular (`user` instead of `users`).
    pub singular_table: bool,
    /// Report relationship candidates with no locatable foreign key as errors
    /// from [`ModelCache::try_get`](crate::ModelCache::try_get).
    pub strict: bool,
    /// Optional post-processing of table names.
    pub table_name_handler: Option<TableNameHandler>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("singular_table", &self.singular_table)
            .field("strict", &self.strict)
            .field(
                "table_name_handler",
                &self.table_name_handler.as_ref().map(|_| "<fn>"),
            )
            .finish()
    }
}

impl Config {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable singular table names.
    pub fn singular_table(mut self, singular: bool) -> Self {
        self.singular_table = singular;
        self
    }

    /// Enable or disable strict relationship checking.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the table name post-processing hook.
    ///
    /// # Example
    ///
    /// ```
    /// use tagmodel_core::Config;
    ///
    /// let config = Config::new().table_name_handler(|name| format!("app_{name}"));
    /// assert_eq!(config.apply_table_name("users"), "app_users");
    /// ```
    pub fn table_name_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.table_name_handler = Some(Arc::new(handler));
        self
    }

    /// Run the table name hook, if any, over a raw table name.
    pub fn apply_table_name(&self, raw: &str) -> String {
        match &self.table_name_handler {
            Some(handler) => handler(raw),
            None => raw.to_string(),
        }
    }
}
