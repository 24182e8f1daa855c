//! Grid Dashboard Binary
//!
//! Polls a grid-bot service and keeps the dashboard view current, optionally
//! serving it as an HTML page.
//!
//! ## Setup
//!
//! 1. Copy `config.example.toml` to `config.toml` and point `api.base_url`
//!    at the grid service. Any key can be overridden from the environment or
//!    a `.env` file, e.g. `APP_API__BASE_URL=http://127.0.0.1:5000`.
//!
//! 2. Run the dashboard:
//!    ```bash
//!    cargo run --bin grid_dashboard -- --config config.toml
//!    ```

use std::env;
use std::sync::Arc;

use log::{error, info};

use grid_dashboard::config::Settings;
use grid_dashboard::dashboard::{Dashboard, LogListener};
use grid_dashboard::form::FormEvent;
use grid_dashboard::{server, HttpGridApi};

#[tokio::main]
async fn main() {
    // Load .env file
    let dotenv = dotenvy::dotenv();

    // Parse arguments
    let args: Vec<String> = env::args().collect();
    let config_path = if args.len() > 2 && args[1] == "--config" {
        args[2].clone()
    } else {
        "config".to_string()
    };

    let settings = match Settings::new(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
            error!("Failed to load config '{}': {}", config_path, e);
            return;
        }
    };

    // Setup Logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", &settings.log.level);
    }
    env_logger::try_init().ok();

    match dotenv {
        Ok(path) => info!("Loaded environment from: {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let api = match HttpGridApi::new(&settings.api) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return;
        }
    };
    info!("Using grid service at {}", api.base_url());

    let dashboard = Arc::new(Dashboard::from_settings(api, &settings, Arc::new(LogListener)));
    dashboard.init().await;

    if let Some(symbol) = settings.dashboard.default_symbol.clone() {
        info!("Preselecting {}", symbol);
        dashboard.handle_form_event(FormEvent::SymbolSelected(Some(symbol))).await;
    }

    if settings.server.enabled {
        let server_dashboard = dashboard.clone();
        let host = settings.server.host.clone();
        let port = settings.server.port;
        tokio::spawn(async move {
            if let Err(e) = server::start_server(server_dashboard, &host, port).await {
                error!("Dashboard server stopped: {}", e);
            }
        });
    }

    dashboard
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await;

    info!("Shutting down");
}
