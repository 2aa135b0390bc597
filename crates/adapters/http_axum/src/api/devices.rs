//! Read-only device handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use powerhub_app::ports::{DevicePublisher, DeviceRepository, ScheduleRepository};
use powerhub_domain::device::Device;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Device>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<Device>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/devices` — list all devices.
pub async fn list<DR, SR, P>(
    State(state): State<AppState<DR, SR, P>>,
) -> Result<ListResponse, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    let devices = state.device_service.list_devices().await?;
    Ok(ListResponse::Ok(Json(devices)))
}

/// `GET /api/devices/{name}` — get a device by name.
pub async fn get<DR, SR, P>(
    State(state): State<AppState<DR, SR, P>>,
    Path(name): Path<String>,
) -> Result<GetResponse, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    let device = state.device_service.get_device(&name).await?;
    Ok(GetResponse::Ok(Json(device)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use powerhub_domain::device::{Category, Credentials, PowerState};
    use tower::ServiceExt;

    use crate::router::build;
    use crate::testing::{body_json, device, request, test_state};

    #[tokio::test]
    async fn should_list_devices_without_credentials() {
        let mut proj = device("proj1", Category::Projector, PowerState::On);
        proj.credentials = Some(Credentials {
            password: Some("admin1".to_string()),
            ..Credentials::default()
        });
        let (state, _) = test_state(vec![proj, device("lobby", Category::Light, PowerState::Off)]);
        let app = build(state);

        let response = app
            .oneshot(request("GET", "/api/devices", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let devices = body.as_array().unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices.iter().all(|d| d.get("credentials").is_none()));
    }

    #[tokio::test]
    async fn should_get_device_by_name() {
        let (state, _) = test_state(vec![device("pc1", Category::Computer, PowerState::Off)]);
        let app = build(state);

        let response = app
            .oneshot(request("GET", "/api/devices/pc1", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "pc1");
        assert_eq!(body["state"], "OFF");
        assert_eq!(body["category"], "computer");
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_device_name() {
        let (state, _) = test_state(vec![]);
        let app = build(state);

        let response = app
            .oneshot(request("GET", "/api/devices/ghost", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
