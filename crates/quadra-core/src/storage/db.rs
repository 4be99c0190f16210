//! SQLite-based storage for tasks and time blocks.
//!
//! Every task and block row carries a `version` column; updates execute
//! `UPDATE ... WHERE id = ? AND version = ?` against the version the
//! caller loaded, so a racing writer turns into a [`ConcurrencyError`]
//! instead of a lost update. Multi-record mutations (allocation commit,
//! block cancellation, optimizer application) run in a single
//! transaction, which also keeps a block's quota contribution — derived
//! from block rows — atomic with its status change.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use super::migrations;
use crate::block::{BlockStatus, TimeBlock};
use crate::domain::Domain;
use crate::error::{ConcurrencyError, DatabaseError, Result};
use crate::task::{Task, TaskStatus};

// === Helper Functions ===

/// Parse domain from database string, falling back to Life.
fn parse_domain(domain_str: &str) -> Domain {
    domain_str.parse().unwrap_or(Domain::Life)
}

/// Parse task status from database string.
fn parse_task_status(status_str: &str) -> TaskStatus {
    match status_str {
        "scheduled" => TaskStatus::Scheduled,
        "in_progress" => TaskStatus::InProgress,
        "completed" => TaskStatus::Completed,
        "cancelled" => TaskStatus::Cancelled,
        "deferred" => TaskStatus::Deferred,
        _ => TaskStatus::Pending,
    }
}

/// Parse block status from database string.
fn parse_block_status(status_str: &str) -> BlockStatus {
    match status_str {
        "active" => BlockStatus::Active,
        "completed" => BlockStatus::Completed,
        "cancelled" => BlockStatus::Cancelled,
        _ => BlockStatus::Planned,
    }
}

/// Parse datetime from RFC3339 string with fallback to current time.
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_datetime_opt(dt_str: Option<String>) -> Option<DateTime<Utc>> {
    dt_str.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Build a Task from a database row (column order per TASK_COLUMNS).
fn row_to_task(row: &rusqlite::Row) -> std::result::Result<Task, rusqlite::Error> {
    let domain_str: String = row.get(2)?;
    let status_str: String = row.get(4)?;
    let due_at: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        domain: parse_domain(&domain_str),
        priority: row.get::<_, i64>(3)? as u8,
        status: parse_task_status(&status_str),
        estimated_minutes: row.get::<_, i64>(5)? as u32,
        actual_minutes: row.get::<_, Option<i64>>(6)?.map(|m| m as u32),
        due_at: parse_datetime_opt(due_at),
        created_at: parse_datetime_fallback(&created_at),
        updated_at: parse_datetime_fallback(&updated_at),
        version: row.get(10)?,
        ai_priority_score: row.get(11)?,
        ai_complexity_score: row.get(12)?,
        linked_time_block_id: row.get(13)?,
        quota_exceeded: row.get(14)?,
    })
}

const TASK_COLUMNS: &str = "id, title, domain, priority, status, estimated_minutes, \
     actual_minutes, due_at, created_at, updated_at, version, ai_priority_score, \
     ai_complexity_score, linked_time_block_id, quota_exceeded";

/// Build a TimeBlock from a database row (column order per BLOCK_COLUMNS).
fn row_to_block(row: &rusqlite::Row) -> std::result::Result<TimeBlock, rusqlite::Error> {
    let start_time: String = row.get(1)?;
    let end_time: String = row.get(2)?;
    let domain_str: String = row.get(3)?;
    let status_str: String = row.get(5)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(TimeBlock {
        id: row.get(0)?,
        start_time: parse_datetime_fallback(&start_time),
        end_time: parse_datetime_fallback(&end_time),
        domain: parse_domain(&domain_str),
        linked_task_id: row.get(4)?,
        status: parse_block_status(&status_str),
        productivity_rating: row.get::<_, Option<i64>>(6)?.map(|r| r as u8),
        quota_exceeded: row.get(7)?,
        version: row.get(8)?,
        created_at: parse_datetime_fallback(&created_at),
        updated_at: parse_datetime_fallback(&updated_at),
    })
}

const BLOCK_COLUMNS: &str = "id, start_time, end_time, domain, linked_task_id, status, \
     productivity_rating, quota_exceeded, version, created_at, updated_at";

/// Version-guarded task update; usable inside a transaction.
fn update_task_guarded(
    conn: &Connection,
    task: &Task,
    expected_version: i64,
) -> Result<()> {
    let rows = conn.execute(
        "UPDATE tasks SET title = ?1, domain = ?2, priority = ?3, status = ?4,
             estimated_minutes = ?5, actual_minutes = ?6, due_at = ?7, updated_at = ?8,
             version = ?9, ai_priority_score = ?10, ai_complexity_score = ?11,
             linked_time_block_id = ?12, quota_exceeded = ?13
         WHERE id = ?14 AND version = ?15",
        params![
            task.title,
            task.domain.as_str(),
            task.priority as i64,
            task.status.as_str(),
            task.estimated_minutes as i64,
            task.actual_minutes.map(|m| m as i64),
            task.due_at.map(|d| d.to_rfc3339()),
            task.updated_at.to_rfc3339(),
            task.version,
            task.ai_priority_score,
            task.ai_complexity_score,
            task.linked_time_block_id,
            task.quota_exceeded,
            task.id,
            expected_version,
        ],
    )?;
    if rows == 0 {
        return Err(ConcurrencyError {
            record: "task",
            id: task.id.clone(),
            expected_version,
        }
        .into());
    }
    Ok(())
}

/// Version-guarded block update; usable inside a transaction.
fn update_block_guarded(
    conn: &Connection,
    block: &TimeBlock,
    expected_version: i64,
) -> Result<()> {
    let rows = conn.execute(
        "UPDATE time_blocks SET start_time = ?1, end_time = ?2, domain = ?3,
             linked_task_id = ?4, status = ?5, productivity_rating = ?6,
             quota_exceeded = ?7, version = ?8, updated_at = ?9
         WHERE id = ?10 AND version = ?11",
        params![
            block.start_time.to_rfc3339(),
            block.end_time.to_rfc3339(),
            block.domain.as_str(),
            block.linked_task_id,
            block.status.as_str(),
            block.productivity_rating.map(|r| r as i64),
            block.quota_exceeded,
            block.version,
            block.updated_at.to_rfc3339(),
            block.id,
            expected_version,
        ],
    )?;
    if rows == 0 {
        return Err(ConcurrencyError {
            record: "time_block",
            id: block.id.clone(),
            expected_version,
        }
        .into());
    }
    Ok(())
}

fn insert_block(conn: &Connection, block: &TimeBlock) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO time_blocks ({BLOCK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
        params![
            block.id,
            block.start_time.to_rfc3339(),
            block.end_time.to_rfc3339(),
            block.domain.as_str(),
            block.linked_task_id,
            block.status.as_str(),
            block.productivity_rating.map(|r| r as i64),
            block.quota_exceeded,
            block.version,
            block.created_at.to_rfc3339(),
            block.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// SQLite database for tasks and time blocks.
pub struct ScheduleDb {
    conn: Connection,
}

impl ScheduleDb {
    /// Open (creating if needed) the database at the default path.
    pub fn open() -> Result<Self> {
        let dir = super::data_dir().map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Self::open_at(dir.join("quadra.db"))
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // === Tasks ===

    /// Insert a new task.
    pub fn create_task(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"),
            params![
                task.id,
                task.title,
                task.domain.as_str(),
                task.priority as i64,
                task.status.as_str(),
                task.estimated_minutes as i64,
                task.actual_minutes.map(|m| m as i64),
                task.due_at.map(|d| d.to_rfc3339()),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
                task.version,
                task.ai_priority_score,
                task.ai_complexity_score,
                task.linked_time_block_id,
                task.quota_exceeded,
            ],
        )?;
        Ok(())
    }

    /// Fetch a task by id.
    pub fn get_task(&self, id: &str) -> Result<Task> {
        self.conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?
            .ok_or_else(|| {
                DatabaseError::NotFound {
                    kind: "task",
                    id: id.to_string(),
                }
                .into()
            })
    }

    /// List tasks, optionally filtered by status and/or domain.
    pub fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        domain: Option<Domain>,
    ) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at, id"
        ))?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks
            .into_iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .filter(|t| domain.map_or(true, |d| t.domain == d))
            .collect())
    }

    /// Version-guarded single-task update. `expected_version` is the
    /// version the caller loaded before mutating.
    pub fn update_task(&self, task: &Task, expected_version: i64) -> Result<()> {
        update_task_guarded(&self.conn, task, expected_version)
    }

    // === Time blocks ===

    /// Insert a new block.
    pub fn create_block(&self, block: &TimeBlock) -> Result<()> {
        insert_block(&self.conn, block)
    }

    /// Fetch a block by id.
    pub fn get_block(&self, id: &str) -> Result<TimeBlock> {
        self.conn
            .query_row(
                &format!("SELECT {BLOCK_COLUMNS} FROM time_blocks WHERE id = ?1"),
                params![id],
                row_to_block,
            )
            .optional()?
            .ok_or_else(|| {
                DatabaseError::NotFound {
                    kind: "time_block",
                    id: id.to_string(),
                }
                .into()
            })
    }

    /// All blocks ordered by start time.
    pub fn list_blocks(&self) -> Result<Vec<TimeBlock>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BLOCK_COLUMNS} FROM time_blocks ORDER BY start_time, id"
        ))?;
        let blocks = stmt
            .query_map([], row_to_block)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(blocks)
    }

    /// Blocks whose start falls on the given calendar day.
    pub fn blocks_for_day(&self, day: NaiveDate) -> Result<Vec<TimeBlock>> {
        Ok(self
            .list_blocks()?
            .into_iter()
            .filter(|b| b.day() == day)
            .collect())
    }

    /// Version-guarded single-block update.
    pub fn update_block(&self, block: &TimeBlock, expected_version: i64) -> Result<()> {
        update_block_guarded(&self.conn, block, expected_version)
    }

    // === Transactional commits ===

    /// Commit an allocation: insert the block and move its task to
    /// scheduled, atomically. `expected_task_version` is the task version
    /// loaded before the allocator ran.
    pub fn commit_allocation(
        &mut self,
        task: &Task,
        block: &TimeBlock,
        expected_task_version: i64,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        insert_block(&tx, block)?;
        update_task_guarded(&tx, task, expected_task_version)?;
        tx.commit()?;
        Ok(())
    }

    /// Commit a block status change together with its task's, atomically.
    pub fn commit_block_and_task(
        &mut self,
        block: &TimeBlock,
        expected_block_version: i64,
        task: Option<(&Task, i64)>,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        update_block_guarded(&tx, block, expected_block_version)?;
        if let Some((task, expected_task_version)) = task {
            update_task_guarded(&tx, task, expected_task_version)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Apply a set of re-placed blocks in one transaction. Each entry is
    /// the mutated block plus the version it was loaded at.
    pub fn commit_placements(&mut self, blocks: &[(TimeBlock, i64)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (block, expected_version) in blocks {
            update_block_guarded(&tx, block, *expected_version)?;
        }
        tx.commit()?;
        Ok(())
    }
}
