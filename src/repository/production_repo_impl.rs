// ==========================================
// 停机申报引擎 - 小时产量 Repository 实现
// ==========================================
// 表: hourly_production_record / downtime_entry
// 约束: 记录表不存停机合计, 停机明细单独存储
// ==========================================

use crate::db::{enum_column, open_sqlite_connection};
use crate::domain::production::{DowntimeEntry, HourlyProductionRecord, ProductionRecordFilter};
use crate::domain::types::Shift;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::production_repo::ProductionRecordRepository;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const RECORD_COLUMNS: &str = r#"
    record_id, production_date, shift, hour, line_id, part_id,
    output, target, headcount, updated_at
"#;

fn map_record(row: &Row<'_>) -> SqliteResult<HourlyProductionRecord> {
    Ok(HourlyProductionRecord {
        record_id: row.get(0)?,
        production_date: row.get(1)?,
        shift: enum_column(row, 2, Shift::parse)?,
        hour: row.get(3)?,
        line_id: row.get(4)?,
        part_id: row.get(5)?,
        output: row.get(6)?,
        target: row.get(7)?,
        headcount: row.get(8)?,
        downtimes: Vec::new(),
        updated_at: row.get(9)?,
    })
}

fn map_downtime(row: &Row<'_>) -> SqliteResult<DowntimeEntry> {
    Ok(DowntimeEntry {
        entry_id: row.get(0)?,
        hourly_record_id: row.get(1)?,
        duration_minutes: row.get(2)?,
        problem_type_id: row.get(3)?,
        declaration_id: row.get(4)?,
        note: row.get(5)?,
        recorded_at: row.get(6)?,
    })
}

pub struct SqliteProductionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProductionRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS hourly_production_record (
              record_id TEXT PRIMARY KEY,
              production_date TEXT NOT NULL,
              shift TEXT NOT NULL,
              hour INTEGER NOT NULL,
              line_id TEXT NOT NULL,
              part_id TEXT NOT NULL,
              output INTEGER NOT NULL DEFAULT 0,
              target INTEGER NOT NULL DEFAULT 0,
              headcount INTEGER NOT NULL DEFAULT 0,
              updated_at TEXT NOT NULL,
              UNIQUE(production_date, shift, hour, line_id, part_id)
            );
            CREATE INDEX IF NOT EXISTS idx_hourly_record_shift
              ON hourly_production_record(production_date, shift, line_id);

            CREATE TABLE IF NOT EXISTS downtime_entry (
              entry_id TEXT PRIMARY KEY,
              hourly_record_id TEXT NOT NULL,
              duration_minutes INTEGER NOT NULL,
              problem_type_id TEXT,
              declaration_id TEXT,
              note TEXT,
              recorded_at TEXT NOT NULL,
              FOREIGN KEY (hourly_record_id) REFERENCES hourly_production_record(record_id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_downtime_entry_record
              ON downtime_entry(hourly_record_id);
            "#,
        )?;
        Ok(())
    }
}

#[async_trait]
impl ProductionRecordRepository for SqliteProductionRepository {
    async fn list(&self, filter: &ProductionRecordFilter) -> RepositoryResult<Vec<HourlyProductionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM hourly_production_record
            WHERE production_date = ?1 AND shift = ?2 AND line_id = ?3
            "#,
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt
            .query_map(
                params![filter.production_date, filter.shift.as_str(), filter.line_id],
                map_record,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        // 夜班跨零点, 按班内顺序排序
        let order = filter.shift.hours();
        rows.sort_by_key(|r| {
            (
                order.iter().position(|h| *h == r.hour).unwrap_or(usize::MAX),
                r.part_id.clone(),
            )
        });
        Ok(rows)
    }

    async fn get(&self, record_id: &str) -> RepositoryResult<Option<HourlyProductionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM hourly_production_record WHERE record_id = ?1",
            RECORD_COLUMNS
        );
        Ok(conn.query_row(&sql, params![record_id], map_record).optional()?)
    }

    async fn save(&self, record: &HourlyProductionRecord) -> RepositoryResult<HourlyProductionRecord> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO hourly_production_record (
                record_id, production_date, shift, hour, line_id, part_id,
                output, target, headcount, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(production_date, shift, hour, line_id, part_id) DO UPDATE SET
                output = excluded.output,
                target = excluded.target,
                headcount = excluded.headcount,
                updated_at = excluded.updated_at
            "#,
            params![
                record.record_id,
                record.production_date,
                record.shift.as_str(),
                record.hour,
                record.line_id,
                record.part_id,
                record.output,
                record.target,
                record.headcount,
                record.updated_at,
            ],
        )?;

        let sql = format!(
            r#"
            SELECT {} FROM hourly_production_record
            WHERE production_date = ?1 AND shift = ?2 AND hour = ?3 AND line_id = ?4 AND part_id = ?5
            "#,
            RECORD_COLUMNS
        );
        let saved = conn.query_row(
            &sql,
            params![
                record.production_date,
                record.shift.as_str(),
                record.hour,
                record.line_id,
                record.part_id,
            ],
            map_record,
        )?;
        Ok(saved)
    }

    async fn list_downtimes(&self, hourly_record_id: &str) -> RepositoryResult<Vec<DowntimeEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT entry_id, hourly_record_id, duration_minutes, problem_type_id,
                   declaration_id, note, recorded_at
            FROM downtime_entry
            WHERE hourly_record_id = ?1
            ORDER BY recorded_at ASC, entry_id ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![hourly_record_id], map_downtime)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    async fn save_downtime(&self, entry: &DowntimeEntry) -> RepositoryResult<DowntimeEntry> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO downtime_entry (
                entry_id, hourly_record_id, duration_minutes, problem_type_id,
                declaration_id, note, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(entry_id) DO UPDATE SET
                duration_minutes = excluded.duration_minutes,
                problem_type_id = excluded.problem_type_id,
                declaration_id = excluded.declaration_id,
                note = excluded.note
            "#,
            params![
                entry.entry_id,
                entry.hourly_record_id,
                entry.duration_minutes,
                entry.problem_type_id,
                entry.declaration_id,
                entry.note,
                entry.recorded_at,
            ],
        )?;
        Ok(entry.clone())
    }
}
