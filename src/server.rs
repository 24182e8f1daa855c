//! Local view server for the dashboard

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Json, Redirect},
    routing::{get, post},
    Router,
};
use log::{info, warn};
use serde_json::json;
use tokio::net::TcpListener;

use crate::api::client::GridApi;
use crate::api::types::GridId;
use crate::dashboard::{render_dashboard, Dashboard, DashboardSnapshot};
use crate::errors::{DashboardError, DashboardResult};

type DashboardState<A> = Arc<Dashboard<A>>;

/// Routes of the view server
pub fn router<A: GridApi + 'static>(dashboard: DashboardState<A>) -> Router {
    Router::new()
        .route("/", get(dashboard_handler::<A>))
        .route("/api/view", get(view_handler::<A>))
        .route("/api/grid/:id/toggle", post(toggle_handler::<A>))
        .with_state(dashboard)
}

/// Serve the dashboard on an already bound listener
pub async fn serve<A: GridApi + 'static>(
    listener: TcpListener,
    dashboard: DashboardState<A>,
) -> DashboardResult<()> {
    axum::serve(listener, router(dashboard)).await?;
    Ok(())
}

/// Bind `host:port` and serve the dashboard until the process exits
pub async fn start_server<A: GridApi + 'static>(
    dashboard: DashboardState<A>,
    host: &str,
    port: u16,
) -> DashboardResult<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| DashboardError::Server(format!("Invalid address {}:{}: {}", host, port, e)))?;
    let listener = TcpListener::bind(addr).await?;

    info!("Dashboard server running on http://{}", addr);
    serve(listener, dashboard).await
}

async fn dashboard_handler<A: GridApi + 'static>(
    State(dashboard): State<DashboardState<A>>,
) -> Html<String> {
    let snapshot = dashboard.snapshot().await;
    Html(render_dashboard(&snapshot))
}

async fn view_handler<A: GridApi + 'static>(
    State(dashboard): State<DashboardState<A>>,
) -> Json<DashboardSnapshot> {
    Json(dashboard.snapshot().await)
}

async fn toggle_handler<A: GridApi + 'static>(
    State(dashboard): State<DashboardState<A>>,
    Path(grid_id): Path<GridId>,
) -> Result<Redirect, (StatusCode, Json<serde_json::Value>)> {
    match dashboard.toggle_grid(grid_id).await {
        Ok(_) => Ok(Redirect::to("/")),
        Err(e) => {
            warn!("Toggle of grid {} failed: {}", grid_id, e);
            let status = match &e {
                DashboardError::InvalidInput(_) => StatusCode::NOT_FOUND,
                _ => e
                    .status_code()
                    .filter(|s| *s >= 400)
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
            };
            Err((status, Json(json!({ "error": e.user_message() }))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::api::mock::MockGridApi;
    use crate::api::types::GridSnapshot;
    use crate::dashboard::{DashboardOptions, GridCard, NoOpListener, PageLayout};
    use crate::form::FormInputs;

    async fn spawn_server() -> (String, Arc<MockGridApi>) {
        let api = Arc::new(MockGridApi::new());
        api.set_snapshot(
            3,
            GridSnapshot {
                grid_levels: vec![10.0, 11.0, 12.0],
                current_price: Some(11.2),
                ..Default::default()
            },
        )
        .await;

        let dashboard = Arc::new(Dashboard::new(
            api.clone(),
            PageLayout::new(vec![GridCard::new(3, false)]),
            FormInputs::default(),
            DashboardOptions::default(),
            Arc::new(NoOpListener),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, dashboard));
        (format!("http://{}", addr), api)
    }

    #[tokio::test]
    async fn test_page_and_view() {
        let (base, _) = spawn_server().await;

        let page = reqwest::get(format!("{}/", base)).await.unwrap().text().await.unwrap();
        assert!(page.contains("toggleForm3"));

        let body = reqwest::get(format!("{}/api/view", base)).await.unwrap().text().await.unwrap();
        let view: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(view["grids"][0]["card"]["id"], 3);
        assert_eq!(view["refresh_interval_secs"], 30);
    }

    #[tokio::test]
    async fn test_toggle_route() {
        let (base, api) = spawn_server().await;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        let response = client.post(format!("{}/api/grid/3/toggle", base)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(*api.toggled.lock().await, vec![3]);

        let body = client.get(format!("{}/api/view", base)).send().await.unwrap().text().await.unwrap();
        let view: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(view["grids"][0]["card"]["active"], false);
        assert_eq!(view["grids"][0]["card"]["requested"], true);
        assert_eq!(view["grids"][0]["chart"]["chart"]["labels"].as_array().unwrap().len(), 3);

        let missing = client.post(format!("{}/api/grid/8/toggle", base)).send().await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_refused_toggle_is_bad_gateway() {
        let (base, api) = spawn_server().await;
        api.set_form_error(Some(DashboardError::status(
            302,
            Some("Please set up your API keys first".into()),
        )))
        .await;
        let client = reqwest::Client::new();

        let response = client.post(format!("{}/api/grid/3/toggle", base)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
        assert_eq!(body["error"], "Please set up your API keys first");

        let view = reqwest::get(format!("{}/api/view", base)).await.unwrap().text().await.unwrap();
        let view: serde_json::Value = serde_json::from_str(&view).unwrap();
        assert_eq!(view["grids"][0]["card"]["active"], false);
        assert!(view["grids"][0]["card"]["requested"].is_null());
    }
}
