//! Server-Sent Events (SSE) stream for live device updates.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;

use powerhub_app::ports::{DevicePublisher, DeviceRepository, ScheduleRepository};

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/stream` — SSE stream of device state.
///
/// The first frame is an `INITIAL_STATE` snapshot of every device, followed
/// by one `DEVICE_UPDATE` frame per state write. The observer is removed
/// from the bus as soon as the client disconnects and the stream is dropped.
pub async fn stream<DR, SR, P>(
    State(state): State<AppState<DR, SR, P>>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, ApiError>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    let (initial, subscription) = state.bus.connect(state.device_service.repo()).await?;

    let frames = tokio_stream::once(initial)
        .chain(subscription)
        .filter_map(|notification| match Event::default().json_data(&notification) {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                tracing::warn!(%err, kind = notification.kind(), "failed to encode notification");
                None
            }
        });

    Ok(Sse::new(frames).keep_alive(KeepAlive::default()))
}
