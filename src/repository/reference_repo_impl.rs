// ==========================================
// 停机申报引擎 - 参考数据 Repository 实现
// ==========================================
// 职责: 参考数据只读查询（使用 rusqlite）
// 说明: upsert_* 仅供本地开发/测试装载数据, 不属于引擎接口
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::reference::{
    HeadcountRequirement, Machine, Part, PartLineAssignment, ProblemType, ProductionLine,
    Workstation,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::reference_repo::{
    AssignmentFilter, HeadcountFilter, ReferenceDataRepository, WorkstationFilter,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct SqliteReferenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReferenceRepository {
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
            CREATE TABLE IF NOT EXISTS production_line (
              line_id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              project_id TEXT
            );

            CREATE TABLE IF NOT EXISTS workstation (
              workstation_id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              line_id TEXT,
              project_id TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_workstation_line ON workstation(line_id);

            CREATE TABLE IF NOT EXISTS machine (
              machine_id TEXT PRIMARY KEY,
              workstation_id TEXT NOT NULL,
              name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_machine_workstation ON machine(workstation_id);

            CREATE TABLE IF NOT EXISTS problem_type (
              problem_type_id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              category TEXT
            );

            CREATE TABLE IF NOT EXISTS part (
              part_id TEXT PRIMARY KEY,
              part_number TEXT NOT NULL,
              default_target INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS part_line_assignment (
              assignment_id TEXT PRIMARY KEY,
              part_id TEXT NOT NULL,
              line_id TEXT NOT NULL,
              target_override INTEGER,
              is_active INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_assignment_line_part
              ON part_line_assignment(line_id, part_id);

            CREATE TABLE IF NOT EXISTS headcount_requirement (
              requirement_id TEXT PRIMARY KEY,
              line_id TEXT NOT NULL,
              part_id TEXT,
              operators_required INTEGER NOT NULL DEFAULT 0,
              technicians_required INTEGER NOT NULL DEFAULT 0,
              quality_agents_required INTEGER NOT NULL DEFAULT 0,
              is_active INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_headcount_line_part
              ON headcount_requirement(line_id, part_id);
            "#,
        )?;
        Ok(())
    }

    // ===== 数据装载（开发/测试）=====

    pub fn upsert_line(&self, line: &ProductionLine) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO production_line (line_id, name, project_id) VALUES (?1, ?2, ?3)",
            params![line.line_id, line.name, line.project_id],
        )?;
        Ok(())
    }

    pub fn upsert_workstation(&self, ws: &Workstation) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO workstation (workstation_id, name, line_id, project_id) VALUES (?1, ?2, ?3, ?4)",
            params![ws.workstation_id, ws.name, ws.line_id, ws.project_id],
        )?;
        Ok(())
    }

    pub fn upsert_machine(&self, machine: &Machine) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO machine (machine_id, workstation_id, name) VALUES (?1, ?2, ?3)",
            params![machine.machine_id, machine.workstation_id, machine.name],
        )?;
        Ok(())
    }

    pub fn upsert_problem_type(&self, problem: &ProblemType) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO problem_type (problem_type_id, name, category) VALUES (?1, ?2, ?3)",
            params![problem.problem_type_id, problem.name, problem.category],
        )?;
        Ok(())
    }

    pub fn upsert_part(&self, part: &Part) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO part (part_id, part_number, default_target) VALUES (?1, ?2, ?3)",
            params![part.part_id, part.part_number, part.default_target],
        )?;
        Ok(())
    }

    pub fn upsert_assignment(&self, a: &PartLineAssignment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO part_line_assignment (
                assignment_id, part_id, line_id, target_override, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![a.assignment_id, a.part_id, a.line_id, a.target_override, a.is_active as i64],
        )?;
        Ok(())
    }

    pub fn upsert_headcount_requirement(&self, r: &HeadcountRequirement) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO headcount_requirement (
                requirement_id, line_id, part_id,
                operators_required, technicians_required, quality_agents_required, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                r.requirement_id,
                r.line_id,
                r.part_id,
                r.operators_required,
                r.technicians_required,
                r.quality_agents_required,
                r.is_active as i64,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl ReferenceDataRepository for SqliteReferenceRepository {
    async fn list_lines(&self) -> RepositoryResult<Vec<ProductionLine>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT line_id, name, project_id FROM production_line ORDER BY line_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ProductionLine {
                    line_id: row.get(0)?,
                    name: row.get(1)?,
                    project_id: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    async fn list_workstations(&self, filter: &WorkstationFilter) -> RepositoryResult<Vec<Workstation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT workstation_id, name, line_id, project_id FROM workstation
            WHERE (?1 IS NULL OR line_id = ?1)
              AND (?2 IS NULL OR project_id = ?2)
            ORDER BY workstation_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![filter.line_id, filter.project_id], |row| {
                Ok(Workstation {
                    workstation_id: row.get(0)?,
                    name: row.get(1)?,
                    line_id: row.get(2)?,
                    project_id: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    async fn list_machines(&self, workstation_id: Option<&str>) -> RepositoryResult<Vec<Machine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT machine_id, workstation_id, name FROM machine
            WHERE (?1 IS NULL OR workstation_id = ?1)
            ORDER BY machine_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![workstation_id], |row| {
                Ok(Machine {
                    machine_id: row.get(0)?,
                    workstation_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    async fn list_problem_types(&self) -> RepositoryResult<Vec<ProblemType>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT problem_type_id, name, category FROM problem_type ORDER BY problem_type_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ProblemType {
                    problem_type_id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    async fn list_parts(&self) -> RepositoryResult<Vec<Part>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT part_id, part_number, default_target FROM part ORDER BY part_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Part {
                    part_id: row.get(0)?,
                    part_number: row.get(1)?,
                    default_target: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    async fn list_assignments(&self, filter: &AssignmentFilter) -> RepositoryResult<Vec<PartLineAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT assignment_id, part_id, line_id, target_override, is_active
            FROM part_line_assignment
            WHERE (?1 IS NULL OR part_id = ?1)
              AND (?2 IS NULL OR line_id = ?2)
              AND (?3 = 0 OR is_active = 1)
            ORDER BY assignment_id
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![filter.part_id, filter.line_id, filter.active_only as i64],
                |row| {
                    Ok(PartLineAssignment {
                        assignment_id: row.get(0)?,
                        part_id: row.get(1)?,
                        line_id: row.get(2)?,
                        target_override: row.get(3)?,
                        is_active: row.get::<_, i64>(4)? != 0,
                    })
                },
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    async fn list_headcount_requirements(
        &self,
        filter: &HeadcountFilter,
    ) -> RepositoryResult<Vec<HeadcountRequirement>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT requirement_id, line_id, part_id,
                   operators_required, technicians_required, quality_agents_required, is_active
            FROM headcount_requirement
            WHERE (?1 IS NULL OR line_id = ?1)
              AND (?2 IS NULL OR part_id = ?2)
              AND (?3 = 0 OR is_active = 1)
            ORDER BY requirement_id
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![filter.line_id, filter.part_id, filter.active_only as i64],
                |row| {
                    Ok(HeadcountRequirement {
                        requirement_id: row.get(0)?,
                        line_id: row.get(1)?,
                        part_id: row.get(2)?,
                        operators_required: row.get(3)?,
                        technicians_required: row.get(4)?,
                        quality_agents_required: row.get(5)?,
                        is_active: row.get::<_, i64>(6)? != 0,
                    })
                },
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}
