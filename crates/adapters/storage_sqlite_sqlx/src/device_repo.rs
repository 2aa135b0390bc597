//! `SQLite` implementation of [`DeviceRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use powerhub_app::ports::DeviceRepository;
use powerhub_domain::device::{Category, Credentials, Device, PowerState};
use powerhub_domain::error::PowerHubError;
use powerhub_domain::id::DeviceId;
use powerhub_domain::time::Timestamp;

use crate::error::{StorageError, decode, parse_timestamp};

/// Wrapper for converting database rows into domain [`Device`].
struct Wrapper(Device);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Device> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let category: String = row.try_get("category")?;
        let address: String = row.try_get("address")?;
        let credentials: Option<String> = row.try_get("credentials")?;
        let state: String = row.try_get("state")?;
        let last_error: Option<String> = row.try_get("last_error")?;
        let timestamp: String = row.try_get("timestamp")?;

        let credentials = credentials
            .map(|json| serde_json::from_str::<Credentials>(&json))
            .transpose()
            .map_err(decode)?;

        Ok(Self(Device {
            id: DeviceId::from_str(&id).map_err(decode)?,
            name,
            category: Category::from_str(&category).map_err(decode)?,
            address,
            credentials,
            state: PowerState::from_str(&state).map_err(decode)?,
            last_error,
            timestamp: parse_timestamp(&timestamp)?,
        }))
    }
}

const INSERT: &str = "INSERT INTO devices (id, name, category, address, credentials, state, last_error, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";
const UPSERT_BY_NAME: &str = "INSERT INTO devices (id, name, category, address, credentials, state, last_error, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
     ON CONFLICT (name) DO UPDATE SET category = excluded.category, address = excluded.address, credentials = excluded.credentials \
     RETURNING *";
const SELECT_BY_ID: &str = "SELECT * FROM devices WHERE id = ?";
const SELECT_BY_NAME: &str = "SELECT * FROM devices WHERE name = ?";
const SELECT_BY_CATEGORY: &str = "SELECT * FROM devices WHERE category = ? ORDER BY name";
const SELECT_ALL: &str = "SELECT * FROM devices ORDER BY name";
const UPDATE_STATE: &str =
    "UPDATE devices SET state = ?, last_error = ?, timestamp = ? WHERE id = ? RETURNING *";
const UPDATE_STATE_IF: &str = "UPDATE devices SET state = ?, last_error = ?, timestamp = ? \
     WHERE id = ? AND state = ? AND timestamp = ? RETURNING *";

fn credentials_json(device: &Device) -> Result<Option<String>, StorageError> {
    Ok(device
        .credentials
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?)
}

/// `SQLite`-backed device repository.
#[derive(Clone)]
pub struct SqliteDeviceRepository {
    pool: SqlitePool,
}

impl SqliteDeviceRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DeviceRepository for SqliteDeviceRepository {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let credentials = credentials_json(&device)?;
            sqlx::query(INSERT)
                .bind(device.id.to_string())
                .bind(&device.name)
                .bind(device.category.as_str())
                .bind(&device.address)
                .bind(credentials)
                .bind(device.state.as_str())
                .bind(&device.last_error)
                .bind(device.timestamp.to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(device)
        }
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
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

    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let pool = self.pool.clone();
        let name = name.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_NAME)
                .bind(name)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn find_by_category(
        &self,
        category: Category,
    ) -> impl Future<Output = Result<Vec<Device>, PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_CATEGORY)
                .bind(category.as_str())
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn update_state(
        &self,
        id: DeviceId,
        state: PowerState,
        last_error: Option<String>,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(UPDATE_STATE)
                .bind(state.as_str())
                .bind(last_error)
                .bind(timestamp.to_rfc3339())
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn update_state_if(
        &self,
        expected: &Device,
        state: PowerState,
        last_error: Option<String>,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let pool = self.pool.clone();
        let id = expected.id.to_string();
        let expected_state = expected.state.as_str();
        let expected_timestamp = expected.timestamp.to_rfc3339();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(UPDATE_STATE_IF)
                .bind(state.as_str())
                .bind(last_error)
                .bind(timestamp.to_rfc3339())
                .bind(id)
                .bind(expected_state)
                .bind(expected_timestamp)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn upsert_by_name(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<Device, PowerHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let credentials = credentials_json(&device)?;
            let row: Wrapper = sqlx::query_as(UPSERT_BY_NAME)
                .bind(device.id.to_string())
                .bind(&device.name)
                .bind(device.category.as_str())
                .bind(&device.address)
                .bind(credentials)
                .bind(device.state.as_str())
                .bind(&device.last_error)
                .bind(device.timestamp.to_rfc3339())
                .fetch_one(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use powerhub_domain::time::now;

    async fn setup() -> SqliteDeviceRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteDeviceRepository::new(db.pool().clone())
    }

    fn projector() -> Device {
        Device::builder()
            .name("proj1")
            .category(Category::Projector)
            .address("192.168.1.40")
            .credentials(Credentials {
                password: Some("panasonic".to_string()),
                ..Credentials::default()
            })
            .state(PowerState::Off)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_and_retrieve_device_when_valid() {
        let repo = setup().await;
        let device = projector();
        let id = device.id;

        repo.create(device).await.unwrap();

        let fetched = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "proj1");
        assert_eq!(fetched.category, Category::Projector);
        assert_eq!(fetched.state, PowerState::Off);
        assert_eq!(
            fetched.credentials.and_then(|c| c.password).as_deref(),
            Some("panasonic")
        );
    }

    #[tokio::test]
    async fn should_return_none_when_device_not_found() {
        let repo = setup().await;
        assert!(repo.get_by_id(DeviceId::new()).await.unwrap().is_none());
        assert!(repo.find_by_name("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_reject_duplicate_names() {
        let repo = setup().await;
        repo.create(projector()).await.unwrap();

        let result = repo.create(projector()).await;
        assert!(matches!(result, Err(PowerHubError::Storage(_))));
    }

    #[tokio::test]
    async fn should_find_devices_by_name_and_category() {
        let repo = setup().await;
        repo.create(projector()).await.unwrap();
        let plug = Device::builder()
            .name("lobby")
            .category(Category::Light)
            .address("192.168.1.60")
            .build()
            .unwrap();
        repo.create(plug).await.unwrap();

        let found = repo.find_by_name("lobby").await.unwrap().unwrap();
        assert_eq!(found.category, Category::Light);

        let lights = repo.find_by_category(Category::Light).await.unwrap();
        assert_eq!(lights.len(), 1);
        assert!(repo.find_by_category(Category::Computer).await.unwrap().is_empty());
        assert_eq!(repo.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_update_state_error_and_timestamp_together() {
        let repo = setup().await;
        let device = projector();
        let id = device.id;
        repo.create(device).await.unwrap();

        let at = now();
        let updated = repo
            .update_state(id, PowerState::Error, Some("timed out".to_string()), at)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.state, PowerState::Error);
        assert_eq!(updated.last_error.as_deref(), Some("timed out"));

        let fetched = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.state, PowerState::Error);
        assert_eq!(fetched.timestamp.timestamp_micros(), at.timestamp_micros());

        let cleared = repo
            .update_state(id, PowerState::On, None, now())
            .await
            .unwrap()
            .unwrap();
        assert!(cleared.last_error.is_none());
    }

    #[tokio::test]
    async fn should_return_none_when_updating_state_of_missing_device() {
        let repo = setup().await;
        let result = repo
            .update_state(DeviceId::new(), PowerState::On, None, now())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_apply_conditional_state_update_when_record_unchanged() {
        let repo = setup().await;
        let created = repo.create(projector()).await.unwrap();
        let read = repo.get_by_id(created.id).await.unwrap().unwrap();

        let updated = repo
            .update_state_if(&read, PowerState::On, None, now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.state, PowerState::On);
    }

    #[tokio::test]
    async fn should_skip_conditional_state_update_when_record_written_since_read() {
        let repo = setup().await;
        let created = repo.create(projector()).await.unwrap();
        let stale = repo.get_by_id(created.id).await.unwrap().unwrap();
        repo.update_state(created.id, PowerState::PendingOn, None, now())
            .await
            .unwrap();

        let result = repo
            .update_state_if(&stale, PowerState::On, None, now())
            .await
            .unwrap();

        assert!(result.is_none());
        let stored = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.state, PowerState::PendingOn);
    }

    #[tokio::test]
    async fn should_keep_id_and_state_when_upserting_existing_name() {
        let repo = setup().await;
        let original = projector();
        let id = original.id;
        repo.create(original).await.unwrap();
        repo.update_state(id, PowerState::On, None, now()).await.unwrap();

        let mut replacement = projector();
        replacement.address = "192.168.1.41".to_string();
        let saved = repo.upsert_by_name(replacement).await.unwrap();

        assert_eq!(saved.id, id);
        assert_eq!(saved.state, PowerState::On);
        assert_eq!(saved.address, "192.168.1.41");
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_insert_when_upserting_new_name() {
        let repo = setup().await;
        let device = projector();
        let id = device.id;

        let saved = repo.upsert_by_name(device).await.unwrap();
        assert_eq!(saved.id, id);
        assert!(repo.get_by_id(id).await.unwrap().is_some());
    }
}
