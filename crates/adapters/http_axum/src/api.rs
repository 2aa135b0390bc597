//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod commands;
#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod schedules;
pub mod sse;

use axum::Router;
use axum::routing::{get, post};

use powerhub_app::ports::{DevicePublisher, DeviceRepository, ScheduleRepository};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<DR, SR, P>() -> Router<AppState<DR, SR, P>>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    Router::new()
        // Devices
        .route("/devices", get(devices::list::<DR, SR, P>))
        .route("/devices/{name}", get(devices::get::<DR, SR, P>))
        // Schedules
        .route(
            "/schedules",
            get(schedules::list::<DR, SR, P>).post(schedules::create::<DR, SR, P>),
        )
        .route(
            "/schedules/{id}",
            get(schedules::get::<DR, SR, P>)
                .patch(schedules::update::<DR, SR, P>)
                .delete(schedules::delete::<DR, SR, P>),
        )
        // Live updates
        .route("/stream", get(sse::stream::<DR, SR, P>))
}

/// Build the command routes served at the root.
pub fn command_routes<DR, SR, P>() -> Router<AppState<DR, SR, P>>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/{category}/wake/{name}", post(commands::wake::<DR, SR, P>))
        .route(
            "/{category}/shutdown/{name}",
            post(commands::shutdown::<DR, SR, P>),
        )
}
