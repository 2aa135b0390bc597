//! Wake/shutdown command handlers.
//!
//! The response is sent as soon as the driver accepted the command; the
//! outcome is confirmed in the background and reaches clients through the
//! live update stream.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use powerhub_app::ports::{DevicePublisher, DeviceRepository, ScheduleRepository};
use powerhub_domain::device::{Category, PowerAction};

use crate::error::ApiError;
use crate::state::AppState;

/// Body of an accepted command.
#[derive(Debug, Serialize)]
pub struct CommandBody {
    pub success: bool,
    pub message: String,
}

/// Possible responses from the command endpoints.
pub enum CommandResponse {
    Accepted(Json<CommandBody>),
}

impl IntoResponse for CommandResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted(json) => json.into_response(),
        }
    }
}

/// `POST /{category}/wake/{name}` — power a device on.
pub async fn wake<DR, SR, P>(
    State(state): State<AppState<DR, SR, P>>,
    Path((category, name)): Path<(String, String)>,
) -> Result<CommandResponse, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    run(&state, &category, &name, PowerAction::On).await
}

/// `POST /{category}/shutdown/{name}` — power a device off.
pub async fn shutdown<DR, SR, P>(
    State(state): State<AppState<DR, SR, P>>,
    Path((category, name)): Path<(String, String)>,
) -> Result<CommandResponse, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    run(&state, &category, &name, PowerAction::Off).await
}

async fn run<DR, SR, P>(
    state: &AppState<DR, SR, P>,
    category: &str,
    name: &str,
    action: PowerAction,
) -> Result<CommandResponse, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    let category = Category::from_str(category)?;
    let accepted = state
        .executor
        .execute_by_name(category, name, action)
        .await?;
    Ok(CommandResponse::Accepted(Json(CommandBody {
        success: true,
        message: accepted.message,
    })))
}
