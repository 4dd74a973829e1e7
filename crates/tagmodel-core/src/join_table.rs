//! Join table descriptors for many-to-many relationships.
//!
//! A join table holds exactly two foreign keys: one referencing the owning
//! model and one referencing the associated model. The descriptor produces no
//! rows or schema itself; query builders use it for three-way joins and for
//! writing junction rows.

use serde::Serialize;

use crate::model::ModelType;

/// One foreign key column of a join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinTableForeignKey {
    /// Column on the join table, e.g. `user_id`.
    pub column_name: String,
    /// Column it references on the endpoint model, e.g. `id`.
    pub association_column_name: String,
}

/// One endpoint of a join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinTableSource {
    /// The endpoint model.
    pub model_type: ModelType,
    /// The join-table column referencing it.
    pub foreign_key: JoinTableForeignKey,
}

/// Descriptor of a synthetic many-to-many join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinTableHandler {
    /// Join table name, as given by the `MANY2MANY` setting.
    pub table_name: String,
    /// Owning side.
    pub source: JoinTableSource,
    /// Associated side.
    pub destination: JoinTableSource,
}

impl JoinTableHandler {
    /// Describe the join table `table_name` linking `source` to `destination`.
    ///
    /// `source_key` is the owning side's foreign key column on the join table and
    /// `source_primary` the column it references; likewise for the destination.
    pub fn new(
        table_name: impl Into<String>,
        source: ModelType,
        source_key: (String, String),
        destination: ModelType,
        destination_key: (String, String),
    ) -> Self {
        let (source_column, source_primary) = source_key;
        let (destination_column, destination_primary) = destination_key;
        Self {
            table_name: table_name.into(),
            source: JoinTableSource {
                model_type: source,
                foreign_key: JoinTableForeignKey {
                    column_name: source_column,
                    association_column_name: source_primary,
                },
            },
            destination: JoinTableSource {
                model_type: destination,
                foreign_key: JoinTableForeignKey {
                    column_name: destination_column,
                    association_column_name: destination_primary,
                },
            },
        }
    }

    /// The two join-table columns, source first.
    pub fn columns(&self) -> [&str; 2] {
        [
            self.source.foreign_key.column_name.as_str(),
            self.destination.foreign_key.column_name.as_str(),
        ]
    }

    /// `INNER JOIN` fragment connecting the join table to the destination table.
    ///
    /// ```ignore
    /// // INNER JOIN user_languages ON user_languages.language_id = languages.id
    /// handler.join_clause("languages");
    /// ```
    pub fn join_clause(&self, destination_table: &str) -> String {
        format!(
            "INNER JOIN {join} ON {join}.{column} = {destination}.{primary}",
            join = self.table_name,
            column = self.destination.foreign_key.column_name,
            destination = destination_table,
            primary = self.destination.foreign_key.association_column_name,
        )
    }

    /// Condition restricting join rows to one source row.
    pub fn source_condition(&self) -> String {
        format!(
            "{}.{} = ?",
            self.table_name, self.source.foreign_key.column_name
        )
    }
}
