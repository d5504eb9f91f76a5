use rusqlite::{Connection, Result as SqlResult};
use log::info;

use crate::fitting::basis;

/// Column holding the batch / creation timestamp in both tables.
pub const TIME_COLUMN: &str = "timeCreated";

/// SQL text for the training and coefficient tables. Coefficient columns are
/// generated from the monomial basis so the DDL, the INSERT and the SELECT
/// can never disagree on order.
pub struct DatabaseSchema {
    training_table: String,
    coefficient_table: String,
}

impl DatabaseSchema {
    pub fn new(training_table: &str, coefficient_table: &str) -> Self {
        Self {
            training_table: training_table.to_string(),
            coefficient_table: coefficient_table.to_string(),
        }
    }

    pub fn training_table(&self) -> &str {
        &self.training_table
    }

    pub fn coefficient_table(&self) -> &str {
        &self.coefficient_table
    }

    /// x columns followed by y columns, in basis order.
    pub fn coefficient_columns() -> Vec<String> {
        let mut columns = basis::column_names("x");
        columns.extend(basis::column_names("y"));
        columns
    }

    pub fn create_training_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" \
             (x INTEGER, y INTEGER, L45 REAL, L90 REAL, {} TEXT);",
            self.training_table, TIME_COLUMN
        )
    }

    pub fn insert_training_sql(&self) -> String {
        format!(
            "INSERT INTO \"{}\" (x, y, L45, L90, {}) VALUES (?1, ?2, ?3, ?4, ?5);",
            self.training_table, TIME_COLUMN
        )
    }

    pub fn select_batches_sql(&self) -> String {
        format!(
            "SELECT DISTINCT {} FROM \"{}\" ORDER BY {} DESC;",
            TIME_COLUMN, self.training_table, TIME_COLUMN
        )
    }

    pub fn select_batch_sql(&self) -> String {
        format!(
            "SELECT x, y, L45, L90 FROM \"{}\" WHERE {} = ?1 ORDER BY rowid;",
            self.training_table, TIME_COLUMN
        )
    }

    pub fn create_coefficient_table_sql(&self) -> String {
        let columns: Vec<String> = Self::coefficient_columns()
            .into_iter()
            .map(|c| format!("{} REAL", c))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({}, {} TEXT);",
            self.coefficient_table,
            columns.join(", "),
            TIME_COLUMN
        )
    }

    pub fn insert_coefficients_sql(&self) -> String {
        let columns = Self::coefficient_columns();
        let placeholders: Vec<String> =
            (1..=columns.len() + 1).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO \"{}\" ({}, {}) VALUES ({});",
            self.coefficient_table,
            columns.join(", "),
            TIME_COLUMN,
            placeholders.join(", ")
        )
    }

    /// Coefficients of the newest row, selected by column name.
    pub fn select_latest_coefficients_sql(&self) -> String {
        format!(
            "SELECT {}, {} FROM \"{}\" ORDER BY {} DESC, rowid DESC LIMIT 1;",
            Self::coefficient_columns().join(", "),
            TIME_COLUMN,
            self.coefficient_table,
            TIME_COLUMN
        )
    }

    pub fn create_training_table(&self, conn: &Connection) -> SqlResult<()> {
        conn.execute(&self.create_training_table_sql(), [])?;
        Ok(())
    }

    pub fn create_coefficient_table(&self, conn: &Connection) -> SqlResult<()> {
        conn.execute(&self.create_coefficient_table_sql(), [])?;
        info!("Coefficient table {} ready", self.coefficient_table);
        Ok(())
    }

    /// Whether `table` exists in the main schema.
    pub fn table_exists(conn: &Connection, table: &str) -> SqlResult<bool> {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| Ok(row.get::<_, i64>(0)? > 0),
        )
    }
}

impl Default for DatabaseSchema {
    fn default() -> Self {
        Self::new("trainingData", "coefficients")
    }
}
