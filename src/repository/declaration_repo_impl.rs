// ==========================================
// 停机申报引擎 - 停机工单 Repository 实现
// ==========================================
// 职责: 实现工单持久化（使用 rusqlite）
// 表: downtime_declaration / declaration_history
// 约束:
// - 工单编号 DT-YYYYMMDD-NNNN 按日递增
// - 流转在同一事务内做 状态比较 + 更新 + 审计写入
// ==========================================

use crate::db::{enum_column, open_sqlite_connection, optional_enum_column};
use crate::domain::declaration::{
    DeclarationFilter, DeclarationHistoryEntry, DowntimeDeclaration, NewDeclaration,
    TransitionRecord,
};
use crate::domain::types::{DeclarationStatus, DeclarationType, ImpactLevel, TransitionAction};
use crate::repository::declaration_repo::DeclarationRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const DECLARATION_COLUMNS: &str = r#"
    declaration_id, ticket_number, impact_level, declaration_type,
    workstation_id, machine_id, production_line_id, zone_id,
    reason, description, problem_type_id, duration_minutes, estimated_resolution_at,
    status, assigned_technician, resolution_notes, cancel_reason,
    declared_at, acknowledged_at, started_at, resolved_at, cancelled_at,
    notify_maintenance, declared_by
"#;

fn map_declaration(row: &Row<'_>) -> rusqlite::Result<DowntimeDeclaration> {
    Ok(DowntimeDeclaration {
        declaration_id: row.get(0)?,
        ticket_number: row.get(1)?,
        impact_level: enum_column(row, 2, ImpactLevel::parse)?,
        declaration_type: enum_column(row, 3, DeclarationType::parse)?,
        workstation_id: row.get(4)?,
        machine_id: row.get(5)?,
        production_line_id: row.get(6)?,
        zone_id: row.get(7)?,
        reason: row.get(8)?,
        description: row.get(9)?,
        problem_type_id: row.get(10)?,
        duration_minutes: row.get(11)?,
        estimated_resolution_at: row.get(12)?,
        status: enum_column(row, 13, DeclarationStatus::parse)?,
        assigned_technician: row.get(14)?,
        resolution_notes: row.get(15)?,
        cancel_reason: row.get(16)?,
        declared_at: row.get(17)?,
        acknowledged_at: row.get(18)?,
        started_at: row.get(19)?,
        resolved_at: row.get(20)?,
        cancelled_at: row.get(21)?,
        notify_maintenance: row.get::<_, i64>(22)? != 0,
        declared_by: row.get(23)?,
    })
}

fn map_history(row: &Row<'_>) -> rusqlite::Result<DeclarationHistoryEntry> {
    Ok(DeclarationHistoryEntry {
        history_id: row.get(0)?,
        declaration_id: row.get(1)?,
        action: row.get(2)?,
        from_status: optional_enum_column(row, 3, DeclarationStatus::parse)?,
        to_status: enum_column(row, 4, DeclarationStatus::parse)?,
        actor: row.get(5)?,
        detail: row.get(6)?,
        occurred_at: row.get(7)?,
    })
}

// ==========================================
// SqliteDeclarationRepository
// ==========================================
pub struct SqliteDeclarationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDeclarationRepository {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建（多个仓储共享同一连接）
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

    /// 确保表存在（如果不存在则创建）
    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS downtime_declaration (
              declaration_id TEXT PRIMARY KEY,
              ticket_number TEXT NOT NULL UNIQUE,
              impact_level TEXT NOT NULL,
              declaration_type TEXT NOT NULL,
              workstation_id TEXT NOT NULL,
              machine_id TEXT,
              production_line_id TEXT,
              zone_id TEXT,
              reason TEXT NOT NULL,
              description TEXT,
              problem_type_id TEXT,
              duration_minutes INTEGER NOT NULL,
              estimated_resolution_at TEXT,
              status TEXT NOT NULL,
              assigned_technician TEXT,
              resolution_notes TEXT,
              cancel_reason TEXT,
              declared_at TEXT NOT NULL,
              acknowledged_at TEXT,
              started_at TEXT,
              resolved_at TEXT,
              cancelled_at TEXT,
              notify_maintenance INTEGER NOT NULL DEFAULT 0,
              declared_by TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_declaration_status
              ON downtime_declaration(status, declared_at DESC);
            CREATE INDEX IF NOT EXISTS idx_declaration_line
              ON downtime_declaration(production_line_id, declared_at DESC);

            CREATE TABLE IF NOT EXISTS declaration_history (
              history_id TEXT PRIMARY KEY,
              declaration_id TEXT NOT NULL,
              action TEXT NOT NULL,
              from_status TEXT,
              to_status TEXT NOT NULL,
              actor TEXT,
              detail TEXT,
              occurred_at TEXT NOT NULL,
              FOREIGN KEY (declaration_id) REFERENCES downtime_declaration(declaration_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_declaration_history_declaration
              ON declaration_history(declaration_id, occurred_at);
            "#,
        )?;
        Ok(())
    }

    /// 生成当日下一个工单编号
    fn next_ticket_number(tx: &Transaction<'_>, now: DateTime<Utc>) -> RepositoryResult<String> {
        let prefix = format!("DT-{}-", now.format("%Y%m%d"));
        let max_seq: Option<i64> = tx.query_row(
            "SELECT MAX(CAST(substr(ticket_number, ?2) AS INTEGER)) FROM downtime_declaration WHERE ticket_number LIKE ?1",
            params![format!("{}%", prefix), (prefix.len() + 1) as i64],
            |row| row.get(0),
        )?;
        Ok(format!("{}{:04}", prefix, max_seq.unwrap_or(0) + 1))
    }

    fn load_tx(tx: &Transaction<'_>, declaration_id: &str) -> RepositoryResult<DowntimeDeclaration> {
        let sql = format!(
            "SELECT {} FROM downtime_declaration WHERE declaration_id = ?1",
            DECLARATION_COLUMNS
        );
        tx.query_row(&sql, params![declaration_id], map_declaration)
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("DowntimeDeclaration", declaration_id))
    }

    fn insert_history_tx(
        tx: &Transaction<'_>,
        declaration_id: &str,
        action: &str,
        from_status: Option<DeclarationStatus>,
        to_status: DeclarationStatus,
        actor: Option<&str>,
        detail: Option<&str>,
        occurred_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO declaration_history (
                history_id, declaration_id, action, from_status, to_status, actor, detail, occurred_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                Uuid::new_v4().to_string(),
                declaration_id,
                action,
                from_status.map(|s| s.as_str()),
                to_status.as_str(),
                actor,
                detail,
                occurred_at,
            ],
        )?;
        Ok(())
    }

    fn stale_status(declaration_id: &str, expected: DeclarationStatus, actual: DeclarationStatus) -> RepositoryError {
        RepositoryError::OptimisticLockFailure {
            declaration_id: declaration_id.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[async_trait]
impl DeclarationRepository for SqliteDeclarationRepository {
    async fn create(&self, payload: &NewDeclaration) -> RepositoryResult<DowntimeDeclaration> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();

        let declaration = DowntimeDeclaration {
            declaration_id: Uuid::new_v4().to_string(),
            ticket_number: Self::next_ticket_number(&tx, now)?,
            impact_level: payload.impact_level,
            declaration_type: payload.declaration_type,
            workstation_id: payload.workstation_id.clone(),
            machine_id: payload.machine_id.clone(),
            production_line_id: payload.production_line_id.clone(),
            zone_id: payload.zone_id.clone(),
            reason: payload.reason.clone(),
            description: payload.description.clone(),
            problem_type_id: payload.problem_type_id.clone(),
            duration_minutes: payload.duration_minutes,
            estimated_resolution_at: payload.estimated_resolution_at,
            status: DeclarationStatus::Declared,
            assigned_technician: None,
            resolution_notes: None,
            cancel_reason: None,
            declared_at: now,
            acknowledged_at: None,
            started_at: None,
            resolved_at: None,
            cancelled_at: None,
            notify_maintenance: payload.notify_maintenance,
            declared_by: payload.declared_by.clone(),
        };

        let sql = format!(
            "INSERT INTO downtime_declaration ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            DECLARATION_COLUMNS
        );
        tx.execute(
            &sql,
            params![
                declaration.declaration_id,
                declaration.ticket_number,
                declaration.impact_level.as_str(),
                declaration.declaration_type.as_str(),
                declaration.workstation_id,
                declaration.machine_id,
                declaration.production_line_id,
                declaration.zone_id,
                declaration.reason,
                declaration.description,
                declaration.problem_type_id,
                declaration.duration_minutes,
                declaration.estimated_resolution_at,
                declaration.status.as_str(),
                declaration.assigned_technician,
                declaration.resolution_notes,
                declaration.cancel_reason,
                declaration.declared_at,
                declaration.acknowledged_at,
                declaration.started_at,
                declaration.resolved_at,
                declaration.cancelled_at,
                declaration.notify_maintenance as i64,
                declaration.declared_by,
            ],
        )?;

        Self::insert_history_tx(
            &tx,
            &declaration.declaration_id,
            "create",
            None,
            DeclarationStatus::Declared,
            declaration.declared_by.as_deref(),
            Some(&declaration.reason),
            now,
        )?;

        tx.commit()?;
        Ok(declaration)
    }

    async fn get(&self, declaration_id: &str) -> RepositoryResult<Option<DowntimeDeclaration>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM downtime_declaration WHERE declaration_id = ?1",
            DECLARATION_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![declaration_id], map_declaration)
            .optional()?)
    }

    async fn list(&self, filter: &DeclarationFilter) -> RepositoryResult<Vec<DowntimeDeclaration>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM downtime_declaration
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR production_line_id = ?2)
            ORDER BY declared_at DESC, ticket_number DESC
            "#,
            DECLARATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![filter.status.map(|s| s.as_str()), filter.line_id],
                map_declaration,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn transition(
        &self,
        declaration_id: &str,
        record: &TransitionRecord,
    ) -> RepositoryResult<DowntimeDeclaration> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut declaration = Self::load_tx(&tx, declaration_id)?;
        if declaration.status != record.from_status {
            return Err(Self::stale_status(declaration_id, record.from_status, declaration.status));
        }

        record.apply_to(&mut declaration);

        let affected = tx.execute(
            r#"
            UPDATE downtime_declaration SET
                status = ?3,
                assigned_technician = ?4,
                resolution_notes = ?5,
                cancel_reason = ?6,
                acknowledged_at = ?7,
                started_at = ?8,
                resolved_at = ?9,
                cancelled_at = ?10
            WHERE declaration_id = ?1 AND status = ?2
            "#,
            params![
                declaration_id,
                record.from_status.as_str(),
                declaration.status.as_str(),
                declaration.assigned_technician,
                declaration.resolution_notes,
                declaration.cancel_reason,
                declaration.acknowledged_at,
                declaration.started_at,
                declaration.resolved_at,
                declaration.cancelled_at,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::DatabaseTransactionError(format!(
                "工单 {} 状态更新未生效",
                declaration_id
            )));
        }

        let detail = match record.action {
            TransitionAction::Resolve => record.resolution_notes.as_deref(),
            TransitionAction::Cancel => record.cancel_reason.as_deref(),
            _ => None,
        };
        Self::insert_history_tx(
            &tx,
            declaration_id,
            record.action.as_str(),
            Some(record.from_status),
            record.to_status,
            record.assigned_technician.as_deref(),
            detail,
            record.occurred_at,
        )?;

        tx.commit()?;
        Ok(declaration)
    }

    async fn assign_problem_type(
        &self,
        declaration_id: &str,
        problem_type_id: &str,
        expected_status: DeclarationStatus,
    ) -> RepositoryResult<DowntimeDeclaration> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut declaration = Self::load_tx(&tx, declaration_id)?;
        if declaration.status != expected_status {
            return Err(Self::stale_status(declaration_id, expected_status, declaration.status));
        }

        tx.execute(
            "UPDATE downtime_declaration SET problem_type_id = ?2 WHERE declaration_id = ?1",
            params![declaration_id, problem_type_id],
        )?;
        Self::insert_history_tx(
            &tx,
            declaration_id,
            "assign_problem_type",
            Some(declaration.status),
            declaration.status,
            None,
            Some(problem_type_id),
            Utc::now(),
        )?;
        tx.commit()?;

        declaration.problem_type_id = Some(problem_type_id.to_string());
        Ok(declaration)
    }

    async fn delete(
        &self,
        declaration_id: &str,
        expected_status: DeclarationStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let declaration = Self::load_tx(&tx, declaration_id)?;
        if declaration.status != expected_status {
            return Err(Self::stale_status(declaration_id, expected_status, declaration.status));
        }

        tx.execute(
            "DELETE FROM downtime_declaration WHERE declaration_id = ?1 AND status = ?2",
            params![declaration_id, expected_status.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn history(&self, declaration_id: &str) -> RepositoryResult<Vec<DeclarationHistoryEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT history_id, declaration_id, action, from_status, to_status, actor, detail, occurred_at
            FROM declaration_history
            WHERE declaration_id = ?1
            ORDER BY occurred_at ASC, rowid ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![declaration_id], map_history)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
