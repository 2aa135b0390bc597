//! `SQLite` implementation of [`ScheduleRepository`].
//!
//! Targets, days and execution results are stored as JSON columns; the
//! time of day and action as their display strings.

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use powerhub_app::ports::ScheduleRepository;
use powerhub_domain::device::PowerAction;
use powerhub_domain::error::{NotFoundError, PowerHubError};
use powerhub_domain::id::ScheduleId;
use powerhub_domain::schedule::{
    DaysOfWeek, ExecutionResult, Schedule, ScheduleTarget, ScheduleTime,
};
use powerhub_domain::time::Timestamp;

use crate::error::{StorageError, decode, parse_timestamp};

/// Wrapper for converting database rows into domain [`Schedule`].
struct Wrapper(Schedule);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Schedule> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let scheduled_time: String = row.try_get("scheduled_time")?;
        let devices_json: String = row.try_get("devices")?;
        let action: String = row.try_get("action")?;
        let days_json: String = row.try_get("days_of_week")?;
        let repeat_weekly: bool = row.try_get("repeat_weekly")?;
        let is_active: bool = row.try_get("is_active")?;
        let last_executed: Option<String> = row.try_get("last_executed")?;
        let results_json: String = row.try_get("last_execution_results")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        let devices: Vec<ScheduleTarget> = serde_json::from_str(&devices_json).map_err(decode)?;
        let days_of_week: DaysOfWeek = serde_json::from_str(&days_json).map_err(decode)?;
        let last_execution_results: Vec<ExecutionResult> =
            serde_json::from_str(&results_json).map_err(decode)?;

        Ok(Self(Schedule {
            id: ScheduleId::from_str(&id).map_err(decode)?,
            name,
            scheduled_time: ScheduleTime::from_str(&scheduled_time).map_err(decode)?,
            devices,
            action: PowerAction::from_str(&action).map_err(decode)?,
            days_of_week,
            repeat_weekly,
            is_active,
            last_executed: last_executed.as_deref().map(parse_timestamp).transpose()?,
            last_execution_results,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        }))
    }
}

/// JSON-encoded columns of a schedule.
struct Encoded {
    devices: String,
    days_of_week: String,
    results: String,
}

impl Encoded {
    fn of(schedule: &Schedule) -> Result<Self, StorageError> {
        Ok(Self {
            devices: serde_json::to_string(&schedule.devices)?,
            days_of_week: serde_json::to_string(&schedule.days_of_week)?,
            results: serde_json::to_string(&schedule.last_execution_results)?,
        })
    }
}

const INSERT: &str = "INSERT INTO schedules (id, name, scheduled_time, devices, action, days_of_week, repeat_weekly, is_active, last_executed, last_execution_results, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM schedules WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM schedules ORDER BY scheduled_time, name";
const UPDATE: &str = "UPDATE schedules SET name = ?, scheduled_time = ?, devices = ?, action = ?, days_of_week = ?, repeat_weekly = ?, is_active = ?, updated_at = ? WHERE id = ?";
const RECORD_EXECUTION: &str = "UPDATE schedules SET last_executed = ?, last_execution_results = ?, updated_at = ? WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM schedules WHERE id = ?";

/// `SQLite`-backed schedule repository.
#[derive(Clone)]
pub struct SqliteScheduleRepository {
    pool: SqlitePool,
}

impl SqliteScheduleRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ScheduleRepository for SqliteScheduleRepository {
    fn create(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let encoded = Encoded::of(&schedule)?;
            sqlx::query(INSERT)
                .bind(schedule.id.to_string())
                .bind(&schedule.name)
                .bind(schedule.scheduled_time.to_string())
                .bind(encoded.devices)
                .bind(schedule.action.to_string())
                .bind(encoded.days_of_week)
                .bind(schedule.repeat_weekly)
                .bind(schedule.is_active)
                .bind(schedule.last_executed.map(|ts| ts.to_rfc3339()))
                .bind(encoded.results)
                .bind(schedule.created_at.to_rfc3339())
                .bind(schedule.updated_at.to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(schedule)
        }
    }

    fn get_by_id(
        &self,
        id: ScheduleId,
    ) -> impl Future<Output = Result<Option<Schedule>, PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    /// Rows that no longer decode are skipped with a warning so a single
    /// corrupt record cannot stall the trigger engine.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Schedule>, PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<SqliteRow> = sqlx::query(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows
                .iter()
                .filter_map(|row| match Wrapper::from_row(row) {
                    Ok(w) => Some(w.0),
                    Err(error) => {
                        let id: Option<String> = row.try_get("id").ok();
                        tracing::warn!(?id, %error, "skipping undecodable schedule row");
                        None
                    }
                })
                .collect())
        }
    }

    fn update(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let encoded = Encoded::of(&schedule)?;
            let result = sqlx::query(UPDATE)
                .bind(&schedule.name)
                .bind(schedule.scheduled_time.to_string())
                .bind(encoded.devices)
                .bind(schedule.action.to_string())
                .bind(encoded.days_of_week)
                .bind(schedule.repeat_weekly)
                .bind(schedule.is_active)
                .bind(schedule.updated_at.to_rfc3339())
                .bind(schedule.id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(NotFoundError {
                    entity: "Schedule",
                    id: schedule.id.to_string(),
                }
                .into());
            }
            Ok(schedule)
        }
    }

    fn delete(&self, id: ScheduleId) -> impl Future<Output = Result<bool, PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_BY_ID)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(result.rows_affected() > 0)
        }
    }

    fn record_execution(
        &self,
        id: ScheduleId,
        executed_at: Timestamp,
        results: Vec<ExecutionResult>,
    ) -> impl Future<Output = Result<(), PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let results = serde_json::to_string(&results).map_err(StorageError::from)?;
            let executed_at = executed_at.to_rfc3339();
            sqlx::query(RECORD_EXECUTION)
                .bind(&executed_at)
                .bind(results)
                .bind(&executed_at)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}
