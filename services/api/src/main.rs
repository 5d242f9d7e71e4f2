//! API Service - Facility search and asset lookup over the in-memory registry
//!
//! Endpoints:
//! - GET  /health - Health check
//! - POST /api/facilities/search - Ranked facility search within a unit
//! - POST /api/assets/lookup - Exact asset lookup by site and patrimonial code
//! - GET  /api/units/:code - Public unit data (no password)
//! - GET  /debug/facilities - Facility directory key sample
//!
//! The registry is loaded once before the listener binds; a load failure
//! stops startup.

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use registry::facilities::DirectorySummary;
use registry::keys::unit_key;
use registry::{AssetLookup, Config, FacilityRecord, Registry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// State
// ============================================================================

struct AppState {
    registry: Arc<Registry>,
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    q: String,
    /// Caller's unit code; normally supplied by the session layer
    #[serde(default)]
    unit_code: String,
}

#[derive(Deserialize)]
struct LookupRequest {
    #[serde(default)]
    site: String,
    #[serde(default)]
    code: String,
}

#[derive(Deserialize)]
struct DebugQuery {
    #[serde(default)]
    unit_code: String,
}

#[derive(Serialize)]
struct DebugResponse {
    unit_code: String,
    unit_key: String,
    #[serde(flatten)]
    summary: DirectorySummary,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Json<Vec<FacilityRecord>> {
    let hits = state
        .registry
        .facilities
        .search(&req.unit_code, &req.q)
        .into_iter()
        .cloned()
        .collect();
    Json(hits)
}

async fn lookup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LookupRequest>,
) -> impl IntoResponse {
    match state.registry.assets.lookup(&req.site, &req.code) {
        Ok(found) => Json(AssetLookup::from(found)).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

async fn unit_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    match state.registry.units.get(&code) {
        Some(unit) => Json(unit.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Unit not found: {}", code),
            }),
        )
            .into_response(),
    }
}

async fn debug_facilities_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DebugQuery>,
) -> Json<DebugResponse> {
    Json(DebugResponse {
        unit_key: unit_key(&params.unit_code),
        unit_code: params.unit_code,
        summary: state.registry.facilities.summary(5),
    })
}

fn router(state: Arc<AppState>) -> Router {
    // CORS for web frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/facilities/search", post(search_handler))
        .route("/api/assets/lookup", post(lookup_handler))
        .route("/api/units/:code", get(unit_handler))
        .route("/debug/facilities", get(debug_facilities_handler))
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let bind = std::env::var("API_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let config = Config::from_env();

    info!(
        users = %config.users.path.display(),
        facilities = %config.facilities.path.display(),
        assets = %config.assets.path.display(),
        "loading registry"
    );
    let registry = Registry::load(&config).context("Failed to load registry sources")?;

    let state = Arc::new(AppState {
        registry: Arc::new(registry),
    });
    let app = router(state);

    info!(%bind, "API listening");
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry::{AssetIndex, AssetRecord, FacilityDirectory, UnitDirectory};

    fn state() -> Arc<AppState> {
        let mut facilities = FacilityDirectory::default();
        for (name, code) in [("SAN ROQUE HEALTH CENTER", "001"), ("SAN MARTIN CLINIC", "002")] {
            facilities.insert(
                "1685",
                FacilityRecord {
                    facility_code: code.to_string(),
                    facility_name: name.to_string(),
                    category: "I-3".to_string(),
                },
            );
        }

        let mut assets = AssetIndex::default();
        assets.insert(
            "centro de salud san roque".to_string(),
            "0012345678901".to_string(),
            AssetRecord {
                denomination: "MONITOR".to_string(),
                brand: "LG".to_string(),
                model: "24MK".to_string(),
                serial: "SN-1".to_string(),
                age_years: "5".to_string(),
            },
        );

        Arc::new(AppState {
            registry: Arc::new(Registry {
                units: UnitDirectory::default(),
                facilities,
                assets,
            }),
        })
    }

    #[tokio::test]
    async fn test_search_handler_returns_ranked_hits() {
        let Json(hits) = search_handler(
            State(state()),
            Json(SearchRequest {
                q: "san roque".to_string(),
                unit_code: "145-1685".to_string(),
            }),
        )
        .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].facility_code, "001");
    }

    #[tokio::test]
    async fn test_search_handler_empty_query() {
        let Json(hits) = search_handler(
            State(state()),
            Json(SearchRequest {
                q: String::new(),
                unit_code: "1685".to_string(),
            }),
        )
        .await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_handler_found_not_found_and_bad_request() {
        let found = lookup_handler(
            State(state()),
            Json(LookupRequest {
                site: "C.S. SAN ROQUE — 9999".to_string(),
                code: "0012345678901".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(found.status(), StatusCode::OK);

        let missing = lookup_handler(
            State(state()),
            Json(LookupRequest {
                site: "C.S. SAN ROQUE".to_string(),
                code: "1".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(missing.status(), StatusCode::OK);

        let invalid = lookup_handler(
            State(state()),
            Json(LookupRequest {
                site: "C.S. SAN ROQUE".to_string(),
                code: String::new(),
            }),
        )
        .await
        .into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unit_handler_not_found() {
        let response = unit_handler(State(state()), Path("145-1685".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_debug_handler_reports_unit_key() {
        let Json(body) = debug_facilities_handler(
            State(state()),
            Query(DebugQuery {
                unit_code: "145-1685".to_string(),
            }),
        )
        .await;
        assert_eq!(body.unit_key, "1685");
        assert_eq!(body.summary.records, 2);
    }
}
