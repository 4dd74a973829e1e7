//! SQL column definitions derived from field annotations.
//!
//! The column type comes from the `TYPE` setting when present and from the
//! [`Dialect`] otherwise. Constraint settings are appended in a fixed order:
//! `NOT NULL`, `UNIQUE`, `DEFAULT <value>`.

use crate::field::FieldMetadata;

/// Database dialect collaborator.
pub trait Dialect {
    /// Dialect name for logs.
    fn name(&self) -> &'static str;

    /// SQL type for `field` with the given size and auto increment flag.
    fn sql_tag(&self, field: &FieldMetadata, size: usize, auto_increment: bool) -> String;
}

/// Render the SQL column definition of `field`.
pub fn column_definition(field: &FieldMetadata, dialect: &dyn Dialect) -> String {
    let sql_type = match field.sql_type() {
        Some(explicit) => explicit.to_string(),
        None => {
            if !field.tag.sql.trim().is_empty() {
                tracing::warn!(
                    field = %field.name,
                    dialect = dialect.name(),
                    "sql annotation has no type"
                );
            }
            let auto_increment = field.is_auto_increment || field.is_primary_key;
            dialect.sql_tag(field, field.size(), auto_increment)
        }
    };

    let mut parts = vec![sql_type];
    if field.is_not_null() {
        parts.push("NOT NULL".to_string());
    }
    if field.is_unique() {
        parts.push("UNIQUE".to_string());
    }
    if let Some(default) = field.default_value() {
        parts.push(format!("DEFAULT {default}"));
    }
    parts.join(" ")
}

/// True if an existing column definition is compatible with `field`.
///
/// Tokens are compared case-insensitively up to the shorter of the two
/// definitions. Fields marked `IGNORE_MIGRATE` always match.
pub fn matches_column(field: &FieldMetadata, existing: &str, dialect: &dyn Dialect) -> bool {
    if field.ignore_migrate() {
        return true;
    }
    let expected = column_definition(field, dialect);
    expected
        .split_whitespace()
        .zip(existing.split_whitespace())
        .all(|(want, have)| want.eq_ignore_ascii_case(have))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{FieldDescriptor, FieldType, Reflect};

    struct TestDialect;

    impl Dialect for TestDialect {
        fn name(&self) -> &'static str {
            "test"
        }

        fn sql_tag(&self, field: &FieldMetadata, size: usize, auto_increment: bool) -> String {
            match &field.field_type {
                FieldType::Scalar(name) if name.ends_with("String") => format!("varchar({size})"),
                _ if auto_increment => "integer AUTO_INCREMENT".to_string(),
                _ => "bigint".to_string(),
            }
        }
    }

    fn field(name: &'static str, ty: FieldType, sql: &'static str, tm: &'static str) -> FieldMetadata {
        FieldMetadata::from_descriptor(&FieldDescriptor::new(name, ty).sql(sql).tagmodel(tm))
    }

    #[test]
    fn test_explicit_type_and_constraints() {
        let f = field(
            "Enabled",
            bool::field_type(),
            "type:tinyint(8) unsigned;not null;unique;default:1",
            "",
        );
        assert_eq!(
            column_definition(&f, &TestDialect),
            "tinyint(8) unsigned NOT NULL UNIQUE DEFAULT 1"
        );
    }

    #[test]
    fn test_dialect_type_with_size() {
        let f = field("Name", String::field_type(), "", "size:64");
        assert_eq!(column_definition(&f, &TestDialect), "varchar(64)");

        let f = field("Title", String::field_type(), "", "");
        assert_eq!(column_definition(&f, &TestDialect), "varchar(255)");
    }

    #[test]
    fn test_primary_key_is_auto_increment() {
        let f = field("Id", i64::field_type(), "", "primary_key");
        assert_eq!(column_definition(&f, &TestDialect), "integer AUTO_INCREMENT");
        let f = field("Count", i64::field_type(), "not null", "");
        assert_eq!(column_definition(&f, &TestDialect), "bigint NOT NULL");
    }

    #[test]
    fn test_matches_column() {
        let f = field("Enabled", bool::field_type(), "type:tinyint(8);not null", "");
        assert!(matches_column(&f, "TINYINT(8)  not null", &TestDialect));
        assert!(matches_column(&f, "tinyint(8)", &TestDialect));
        assert!(!matches_column(&f, "int(11) NOT NULL", &TestDialect));
    }

    #[test]
    fn test_ignore_migrate_always_matches() {
        let f = field("Legacy", i64::field_type(), "type:int", "ignore_migrate");
        assert!(matches_column(&f, "varchar(10)", &TestDialect));
    }
}
