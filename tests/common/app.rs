use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use mastery_backend::config::Config;
use mastery_backend::engine::config::EngineConfig;
use mastery_backend::engine::MasteryEngine;
use mastery_backend::routes::build_router;
use mastery_backend::state::AppState;
use mastery_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    _temp_dir: TempDir,
}

async fn spawn_with_limits(api_limit: u64) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("mastery-test.sled");

    // Construct the Config directly instead of through set_var, which races
    // across parallel test threads.
    let test_secret = format!("integration-test-jwt-secret-{}", uuid::Uuid::new_v4());

    let config = Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string_lossy().to_string(),
        jwt_secret: test_secret,
        jwt_expires_in_hours: 24,
        cors_origin: "http://localhost:5173".to_string(),
        trust_proxy: false,
        rate_limit: mastery_backend::config::RateLimitConfig {
            window_secs: 60,
            max_requests: api_limit,
        },
        engine: mastery_backend::config::EngineEnvConfig {
            readiness_cache_ttl_secs: 30,
            momentum_half_life_days: 7.0,
        },
    };

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let engine = Arc::new(MasteryEngine::new(
        EngineConfig::from_env(&config.engine),
        store.clone(),
    ));
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(store, engine, &config, shutdown_tx);

    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_server() -> TestApp {
    spawn_with_limits(500).await
}

#[allow(dead_code)]
pub async fn spawn_test_server_with_limits(api_limit: u64) -> TestApp {
    spawn_with_limits(api_limit).await
}
