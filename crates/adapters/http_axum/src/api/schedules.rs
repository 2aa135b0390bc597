//! JSON REST handlers for schedules.
//!
//! Request bodies carry plain strings and integers and are converted into
//! domain types here, so every malformed field is reported as a
//! [`ValidationError`] rather than a deserialization rejection.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use powerhub_app::ports::{DevicePublisher, DeviceRepository, ScheduleRepository};
use powerhub_app::services::schedule_service::ScheduleFilter;
use powerhub_domain::device::{Category, PowerAction};
use powerhub_domain::error::ValidationError;
use powerhub_domain::id::{DeviceId, ScheduleId};
use powerhub_domain::schedule::{
    DaysOfWeek, Schedule, SchedulePatch, ScheduleTarget, ScheduleTime,
};

use crate::error::ApiError;
use crate::state::AppState;

/// One target device in a request body.
#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub device_id: String,
    pub category: String,
}

impl TryFrom<TargetRequest> for ScheduleTarget {
    type Error = ValidationError;

    fn try_from(req: TargetRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            device_id: parse_id(&req.device_id)?,
            category: Category::from_str(&req.category)?,
        })
    }
}

/// Request body for creating a schedule.
#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scheduled_time: String,
    #[serde(default)]
    pub devices: Vec<TargetRequest>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub days_of_week: Vec<i64>,
    pub repeat_weekly: Option<bool>,
    pub is_active: Option<bool>,
}

impl CreateScheduleRequest {
    fn into_schedule(self) -> Result<Schedule, ApiError> {
        let mut builder = Schedule::builder()
            .name(self.name)
            .scheduled_time(ScheduleTime::from_str(&self.scheduled_time)?)
            .devices(targets(self.devices)?)
            .action(PowerAction::from_str(&self.action)?)
            .days_of_week(DaysOfWeek::try_from(self.days_of_week)?);
        if let Some(repeat) = self.repeat_weekly {
            builder = builder.repeat_weekly(repeat);
        }
        if let Some(active) = self.is_active {
            builder = builder.is_active(active);
        }
        Ok(builder.build()?)
    }
}

/// Request body for a partial schedule update.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateScheduleRequest {
    pub name: Option<String>,
    pub scheduled_time: Option<String>,
    pub devices: Option<Vec<TargetRequest>>,
    pub action: Option<String>,
    pub days_of_week: Option<Vec<i64>>,
    pub repeat_weekly: Option<bool>,
    pub is_active: Option<bool>,
}

impl TryFrom<UpdateScheduleRequest> for SchedulePatch {
    type Error = ValidationError;

    fn try_from(req: UpdateScheduleRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: req.name,
            scheduled_time: req
                .scheduled_time
                .as_deref()
                .map(ScheduleTime::from_str)
                .transpose()?,
            devices: req.devices.map(targets).transpose()?,
            action: req.action.as_deref().map(PowerAction::from_str).transpose()?,
            days_of_week: req.days_of_week.map(DaysOfWeek::try_from).transpose()?,
            repeat_weekly: req.repeat_weekly,
            is_active: req.is_active,
        })
    }
}

/// Query string of the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub is_active: Option<bool>,
    pub device_id: Option<String>,
    pub day: Option<i64>,
    pub action: Option<String>,
}

impl TryFrom<ListQuery> for ScheduleFilter {
    type Error = ValidationError;

    fn try_from(query: ListQuery) -> Result<Self, Self::Error> {
        let day = query
            .day
            .map(|day| match u8::try_from(day) {
                Ok(d) if d <= 6 => Ok(d),
                _ => Err(ValidationError::DayOutOfRange(day)),
            })
            .transpose()?;
        Ok(Self {
            is_active: query.is_active,
            device_id: query
                .device_id
                .as_deref()
                .map(parse_id::<DeviceId>)
                .transpose()?,
            day,
            action: query.action.as_deref().map(PowerAction::from_str).transpose()?,
        })
    }
}

fn parse_id<T: FromStr>(raw: &str) -> Result<T, ValidationError> {
    T::from_str(raw).map_err(|_| ValidationError::InvalidId(raw.to_string()))
}

fn targets(requests: Vec<TargetRequest>) -> Result<Vec<ScheduleTarget>, ValidationError> {
    requests.into_iter().map(ScheduleTarget::try_from).collect()
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Schedule>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get and update endpoints.
pub enum GetResponse {
    Ok(Json<Schedule>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Schedule>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/schedules` — list schedules, optionally filtered.
pub async fn list<DR, SR, P>(
    State(state): State<AppState<DR, SR, P>>,
    Query(query): Query<ListQuery>,
) -> Result<ListResponse, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    let filter = ScheduleFilter::try_from(query)?;
    let schedules = state.schedule_service.list_schedules(&filter).await?;
    Ok(ListResponse::Ok(Json(schedules)))
}

/// `GET /api/schedules/{id}` — get a schedule by id.
pub async fn get<DR, SR, P>(
    State(state): State<AppState<DR, SR, P>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    let id: ScheduleId = parse_id(&id)?;
    let schedule = state.schedule_service.get_schedule(id).await?;
    Ok(GetResponse::Ok(Json(schedule)))
}

/// `POST /api/schedules` — create a schedule.
pub async fn create<DR, SR, P>(
    State(state): State<AppState<DR, SR, P>>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<CreateResponse, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    let schedule = req.into_schedule()?;
    let created = state.schedule_service.create_schedule(schedule).await?;
    Ok(CreateResponse::Created(Json(created)))
}

/// `PATCH /api/schedules/{id}` — update some fields of a schedule.
pub async fn update<DR, SR, P>(
    State(state): State<AppState<DR, SR, P>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateScheduleRequest>,
) -> Result<GetResponse, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    let id: ScheduleId = parse_id(&id)?;
    let patch = SchedulePatch::try_from(req)?;
    let updated = state.schedule_service.update_schedule(id, patch).await?;
    Ok(GetResponse::Ok(Json(updated)))
}

/// `DELETE /api/schedules/{id}` — delete a schedule.
pub async fn delete<DR, SR, P>(
    State(state): State<AppState<DR, SR, P>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    let id: ScheduleId = parse_id(&id)?;
    state.schedule_service.delete_schedule(id).await?;
    Ok(DeleteResponse::NoContent)
}
