use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension, Row};
use log::{debug, info, warn};
use std::path::Path;

use super::schema::DatabaseSchema;
use crate::config::DatabaseConfig;
use crate::error::{FitError, FitResult};
use crate::types::coefficients::COEFFICIENT_COUNT;
use crate::types::{CalibrationSample, CoefficientRow};

/// Owns the one SQLite connection used by a calibration run. Dropping the
/// store closes the connection.
pub struct CalibrationStore {
    conn: Connection,
    schema: DatabaseSchema,
}

impl CalibrationStore {
    /// Open an existing database file. A missing file is an error rather than
    /// a freshly created empty database.
    pub fn open(config: &DatabaseConfig) -> FitResult<Self> {
        let path = Path::new(&config.path);
        if !path.exists() {
            return Err(FitError::MissingDatabase(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        info!("Database connection established at: {}", path.display());

        Ok(Self::with_connection(conn, config))
    }

    /// Open or create the database file.
    pub fn create(config: &DatabaseConfig) -> FitResult<Self> {
        let conn = Connection::open(&config.path)?;
        info!("Database connection established at: {}", config.path);
        Ok(Self::with_connection(conn, config))
    }

    pub fn open_in_memory(config: &DatabaseConfig) -> FitResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::with_connection(conn, config))
    }

    fn with_connection(conn: Connection, config: &DatabaseConfig) -> Self {
        Self {
            conn,
            schema: DatabaseSchema::new(&config.training_table, &config.coefficient_table),
        }
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The database engine's local date-time, `YYYY-MM-DD HH:MM:SS`.
    pub fn current_datetime(&self) -> FitResult<String> {
        let now = self
            .conn
            .query_row("SELECT datetime('now','localtime');", [], |row| row.get::<_, String>(0))?;
        Ok(now)
    }

    // 获取所有训练批次时间（最新在前）
    pub fn batches(&self) -> FitResult<Vec<String>> {
        if !DatabaseSchema::table_exists(&self.conn, self.schema.training_table())? {
            warn!("Training table {} does not exist", self.schema.training_table());
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&self.schema.select_batches_sql())?;
        let rows = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;

        let mut batches = Vec::new();
        for row in rows {
            if let Some(batch) = row? {
                batches.push(batch);
            }
        }
        Ok(batches)
    }

    /// Most recent batch timestamp.
    pub fn latest_batch(&self) -> FitResult<String> {
        self.batches()?
            .into_iter()
            .next()
            .ok_or(FitError::NoTrainingData)
    }

    pub fn load_batch(&self, batch: &str) -> FitResult<Vec<CalibrationSample>> {
        let mut stmt = self.conn.prepare(&self.schema.select_batch_sql())?;
        let mut rows = stmt.query([batch])?;

        let mut samples = Vec::new();
        while let Some(row) = rows.next()? {
            samples.push(parse_sample_row(row, samples.len())?);
        }

        info!("Loaded {} samples for batch {}", samples.len(), batch);
        Ok(samples)
    }

    pub fn ensure_training_table(&self) -> FitResult<()> {
        self.schema.create_training_table(&self.conn)?;
        Ok(())
    }

    /// Store one batch of samples under `time_created`, in one transaction.
    pub fn insert_samples(
        &mut self,
        samples: &[CalibrationSample],
        time_created: &str,
    ) -> FitResult<usize> {
        if samples.is_empty() {
            warn!("No samples to save");
            return Ok(0);
        }

        self.ensure_training_table()?;
        let sql = self.schema.insert_training_sql();

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for s in samples {
                stmt.execute(rusqlite::params![s.x, s.y, s.l45, s.l90, time_created])?;
            }
        }
        tx.commit()?;

        info!("Saved {} samples for batch {}", samples.len(), time_created);
        Ok(samples.len())
    }

    pub fn ensure_coefficient_table(&self) -> FitResult<()> {
        self.schema.create_coefficient_table(&self.conn)?;
        Ok(())
    }

    /// Append one coefficient row. Repeated calls add repeated rows.
    pub fn insert_coefficients(&mut self, row: &CoefficientRow) -> FitResult<()> {
        self.ensure_coefficient_table()?;
        let sql = self.schema.insert_coefficients_sql();

        let flat = row.flattened();
        let mut values: Vec<rusqlite::types::Value> = flat.iter().map(|v| (*v).into()).collect();
        values.push(row.time_created.clone().into());

        let tx = self.conn.transaction()?;
        tx.execute(&sql, params_from_iter(values))?;
        tx.commit()?;

        info!("Inserted coefficient row created at {}", row.time_created);
        Ok(())
    }

    /// Newest coefficient row, if any has been written.
    pub fn latest_coefficients(&self) -> FitResult<Option<CoefficientRow>> {
        if !DatabaseSchema::table_exists(&self.conn, self.schema.coefficient_table())? {
            return Ok(None);
        }

        let row = self
            .conn
            .query_row(&self.schema.select_latest_coefficients_sql(), [], |row| {
                let mut values = [0.0; COEFFICIENT_COUNT];
                for (i, v) in values.iter_mut().enumerate() {
                    *v = row.get(i)?;
                }
                let time_created: String = row.get(COEFFICIENT_COUNT)?;
                Ok(CoefficientRow::from_flat(&values, time_created))
            })
            .optional()?;

        if let Some(r) = &row {
            debug!("Latest coefficients created at {}", r.time_created);
        }
        Ok(row)
    }

    pub fn coefficient_row_count(&self) -> FitResult<usize> {
        if !DatabaseSchema::table_exists(&self.conn, self.schema.coefficient_table())? {
            return Ok(0);
        }
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", self.schema.coefficient_table());
        let count = self.conn.query_row(&sql, [], |row| row.get::<_, i64>(0))?;
        Ok(count as usize)
    }
}

fn parse_sample_row(row: &Row<'_>, index: usize) -> FitResult<CalibrationSample> {
    let field = |i: usize, name: &str| -> FitResult<f64> {
        let malformed = |detail: String| {
            FitError::MalformedSample(format!("row {} column {} {}", index, name, detail))
        };
        row.get::<_, Option<f64>>(i)
            .map_err(|e| malformed(format!("is not numeric: {}", e)))?
            .ok_or_else(|| malformed("is NULL".to_string()))
    };

    Ok(CalibrationSample::new(
        field(0, "x")?,
        field(1, "y")?,
        field(2, "L45")?,
        field(3, "L90")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitting::basis::TERM_COUNT;

    fn store() -> CalibrationStore {
        CalibrationStore::open_in_memory(&DatabaseConfig::default()).unwrap()
    }

    #[test]
    fn current_datetime_has_sqlite_format() {
        let now = store().current_datetime().unwrap();
        let parsed = chrono::NaiveDateTime::parse_from_str(&now, "%Y-%m-%d %H:%M:%S");
        assert!(parsed.is_ok(), "{}", now);
    }

    #[test]
    fn latest_batch_without_data_is_an_error() {
        let mut s = store();
        assert!(matches!(s.latest_batch(), Err(FitError::NoTrainingData)));

        s.ensure_training_table().unwrap();
        assert!(matches!(s.latest_batch(), Err(FitError::NoTrainingData)));

        s.insert_samples(&[CalibrationSample::new(1.0, 2.0, 0.1, 0.2)], "2020-01-01 10:00:00")
            .unwrap();
        assert_eq!(s.latest_batch().unwrap(), "2020-01-01 10:00:00");
    }

    #[test]
    fn latest_batch_picks_newest_and_loads_only_it() {
        let mut s = store();
        s.insert_samples(&[CalibrationSample::new(1.0, 1.0, 0.1, 0.1)], "2020-01-01 10:00:00")
            .unwrap();
        s.insert_samples(
            &[
                CalibrationSample::new(5.0, 6.0, 0.5, 0.6),
                CalibrationSample::new(7.0, 8.0, 0.7, 0.8),
            ],
            "2020-03-01 09:00:00",
        )
        .unwrap();
        s.insert_samples(&[CalibrationSample::new(2.0, 2.0, 0.2, 0.2)], "2020-02-01 10:00:00")
            .unwrap();

        assert_eq!(
            s.batches().unwrap(),
            vec!["2020-03-01 09:00:00", "2020-02-01 10:00:00", "2020-01-01 10:00:00"]
        );

        let latest = s.latest_batch().unwrap();
        let samples = s.load_batch(&latest).unwrap();
        assert_eq!(
            samples,
            vec![
                CalibrationSample::new(5.0, 6.0, 0.5, 0.6),
                CalibrationSample::new(7.0, 8.0, 0.7, 0.8),
            ]
        );
    }

    #[test]
    fn null_reading_is_malformed() {
        let s = store();
        s.ensure_training_table().unwrap();
        s.connection()
            .execute(
                "INSERT INTO trainingData VALUES (1, 2, NULL, 0.5, 'T1')",
                [],
            )
            .unwrap();
        assert!(matches!(s.load_batch("T1"), Err(FitError::MalformedSample(_))));
    }

    #[test]
    fn text_reading_is_malformed() {
        let mut s = store();
        s.insert_samples(&[CalibrationSample::new(3.0, 4.0, 0.3, 0.4)], "T1").unwrap();
        s.connection()
            .execute("INSERT INTO trainingData VALUES (1, 2, 'abc', 0.5, 'T1')", [])
            .unwrap();

        match s.load_batch("T1") {
            Err(FitError::MalformedSample(msg)) => {
                assert!(msg.contains("row 1 column L45"), "{}", msg)
            }
            other => panic!("expected MalformedSample, got {:?}", other),
        }
    }

    #[test]
    fn coefficients_round_trip_by_position() {
        let mut s = store();
        assert!(s.latest_coefficients().unwrap().is_none());

        let x: [f64; TERM_COUNT] = std::array::from_fn(|i| i as f64 + 0.5);
        let y: [f64; TERM_COUNT] = std::array::from_fn(|i| -(i as f64) - 0.25);
        let row = CoefficientRow::new(x, y, "2020-04-01 12:00:00");
        s.insert_coefficients(&row).unwrap();

        assert_eq!(s.latest_coefficients().unwrap(), Some(row.clone()));

        // Raw positional read: x fit in columns 0..15, y fit in 15..30.
        let raw: Vec<f64> = s
            .connection()
            .query_row("SELECT * FROM coefficients", [], |r| {
                (0..30).map(|i| r.get::<_, f64>(i)).collect::<Result<Vec<_>, _>>()
            })
            .unwrap();
        assert_eq!(&raw[..15], &x[..]);
        assert_eq!(&raw[15..], &y[..]);
    }

    #[test]
    fn repeated_insert_appends() {
        let mut s = store();
        let row = CoefficientRow::new([1.0; TERM_COUNT], [2.0; TERM_COUNT], "2020-04-01 12:00:00");
        s.insert_coefficients(&row).unwrap();
        s.insert_coefficients(&row).unwrap();
        assert_eq!(s.coefficient_row_count().unwrap(), 2);
    }

    #[test]
    fn open_refuses_missing_file() {
        let config = DatabaseConfig {
            path: std::env::temp_dir()
                .join("sensefit-does-not-exist.db")
                .to_string_lossy()
                .into_owned(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(CalibrationStore::open(&config), Err(FitError::MissingDatabase(_))));
    }
}
