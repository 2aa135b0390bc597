//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use powerhub_app::ports::{DevicePublisher, DeviceRepository, ScheduleRepository};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Merges the command routes at `/` and the JSON API under `/api`.
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<DR, SR, P>(state: AppState<DR, SR, P>) -> Router
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .merge(crate::api::command_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{request, test_state};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let (state, _) = test_state(vec![]);
        let app = build(state);

        let response = app.oneshot(request("GET", "/health", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_route() {
        let (state, _) = test_state(vec![]);
        let app = build(state);

        let response = app
            .oneshot(request("GET", "/nowhere", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
