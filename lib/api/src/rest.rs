use crate::explainer::GeminiExplainer;
use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer, ResponseError, Result as ActixResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use soilmatch_matcher::MatchEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Errors surfaced by the HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request body must be a JSON object")]
    InvalidBody,
    #[error("Invalid request: {0}")]
    MalformedRequest(String),
    #[error(transparent)]
    Match(#[from] soilmatch_core::Error),
    #[error("Matching task failed: {0}")]
    Task(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody | ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Match(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status == StatusCode::BAD_REQUEST {
            self.to_string()
        } else {
            error!(error = %self, "Request failed");
            "Soil data processing error. Please check server logs.".to_string()
        };
        HttpResponse::build(status).json(serde_json::json!({ "error": message }))
    }
}

#[derive(Deserialize)]
struct PredictParams {
    k: Option<usize>,
    max_results: Option<usize>,
}

#[derive(Deserialize)]
struct ExplainRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    soil_conditions: String,
}

#[derive(Serialize)]
struct FeatureInfo {
    key: String,
    name: String,
    description: String,
    range: [f64; 2],
    mean: f64,
    observed: Option<ObservedStats>,
}

#[derive(Serialize)]
struct ObservedStats {
    min: f64,
    max: f64,
    mean: f64,
    present: usize,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(
        engine: Arc<MatchEngine>,
        explainer: Arc<GeminiExplainer>,
        port: u16,
        static_dir: Option<PathBuf>,
    ) -> std::io::Result<()> {
        Self::bind(engine, explainer, port, static_dir)?.await
    }

    /// Bind the listening socket and return the server without awaiting it.
    /// Must be called inside an actix system.
    pub fn bind(
        engine: Arc<MatchEngine>,
        explainer: Arc<GeminiExplainer>,
        port: u16,
        static_dir: Option<PathBuf>,
    ) -> std::io::Result<Server> {
        info!(port, "Starting REST API");
        let server = HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            let mut app = App::new()
                .wrap(cors)
                .app_data(web::Data::new(engine.clone()))
                .app_data(web::Data::new(explainer.clone()))
                .configure(configure);

            if let Some(dir) = &static_dir {
                app = app.service(actix_files::Files::new("/", dir).index_file("index.html"));
            }
            app
        })
        .bind(("0.0.0.0", port))?
        .run();
        Ok(server)
    }
}

/// Register the API routes. Expects `Arc<MatchEngine>` and
/// `Arc<GeminiExplainer>` in the app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::MalformedRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::MalformedRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(health))
    .route("/api/features", web::get().to(list_features))
    .route("/predict", web::post().to(predict))
    .route("/explain_microbe", web::post().to(explain_microbe));
}

async fn health(engine: web::Data<Arc<MatchEngine>>) -> ActixResult<HttpResponse> {
    let store = engine.store();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "polygons": store.len(),
        "occurrences": store.occurrences().len(),
    })))
}

async fn list_features(engine: web::Data<Arc<MatchEngine>>) -> ActixResult<HttpResponse> {
    let summary = engine.feature_summary();
    let features: Vec<FeatureInfo> = engine
        .catalog()
        .iter()
        .map(|spec| FeatureInfo {
            key: spec.key.clone(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            range: [spec.min, spec.max],
            mean: spec.mean,
            observed: summary.iter().find(|s| s.key == spec.key).map(|s| ObservedStats {
                min: s.min,
                max: s.max,
                mean: s.mean,
                present: s.present,
            }),
        })
        .collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "features": features })))
}

async fn predict(
    engine: web::Data<Arc<MatchEngine>>,
    params: web::Query<PredictParams>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let Value::Object(query) = body.into_inner() else {
        return Err(ApiError::InvalidBody);
    };
    let engine: Arc<MatchEngine> = engine.get_ref().clone();
    let k = params.k.unwrap_or(engine.config().neighbors);
    let max_results = params.max_results.unwrap_or(engine.config().max_results);

    let response = web::block(move || run_match(&engine, &query, k, max_results))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))??;
    Ok(HttpResponse::Ok().json(response))
}

fn run_match(
    engine: &MatchEngine,
    query: &Map<String, Value>,
    k: usize,
    max_results: usize,
) -> Result<soilmatch_matcher::MatchResponse, ApiError> {
    Ok(engine.match_json(query, k, max_results)?)
}

async fn explain_microbe(
    explainer: web::Data<Arc<GeminiExplainer>>,
    req: web::Json<ExplainRequest>,
) -> ActixResult<HttpResponse> {
    let explanation = explainer.explain(&req.name, &req.soil_conditions).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "explanation": explanation })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainer::{ExplainerConfig, MISSING_KEY_MESSAGE};
    use actix_web::http::header::ContentType;
    use actix_web::test;
    use soilmatch_core::{FeatureCatalog, Geometry, OccurrenceRecord, Polygon, ReferenceStore, SoilPolygon};
    use soilmatch_matcher::MatchConfig;

    fn engine() -> Arc<MatchEngine> {
        let polygon = SoilPolygon::from_pairs(
            [
                ("TEXT", Some(2.0)),
                ("OC_TOP_P", Some(88.0)),
                ("AWC_TOP_P", Some(90.0)),
                ("CEC_TOP_P", Some(90.0)),
                ("PHYSCHIM", Some(3.0)),
            ],
            Some(Geometry::Polygon(Polygon::rectangle(0.0, 0.0, 10.0, 10.0))),
        );
        let store = ReferenceStore::new(
            FeatureCatalog::soil_defaults(),
            vec![polygon],
            vec![OccurrenceRecord::new("Bacillus X", 5.0, 5.0)],
        )
        .unwrap();
        Arc::new(MatchEngine::build(store, MatchConfig::default()).unwrap())
    }

    fn explainer() -> Arc<GeminiExplainer> {
        Arc::new(GeminiExplainer::new(ExplainerConfig::default()).unwrap())
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(engine()))
                    .app_data(web::Data::new(explainer()))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_predict_match() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!({
                "TEXT": 2.0, "OC_TOP_P": 88, "AWC_TOP_P": 90, "CEC_TOP_P": 90, "PHYSCHIM": 3
            }))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        let microbes = resp["microbes"].as_array().unwrap();
        assert_eq!(microbes.len(), 1);
        assert_eq!(microbes[0]["name"], "Bacillus X");
        assert_eq!(microbes[0]["probability"], 1.0);
        assert!(resp.get("message").is_none());
    }

    #[actix_web::test]
    async fn test_predict_validation_error() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!({"PHYSCHIM": 15}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("Value for PHYSCHIM must be between"));
    }

    #[actix_web::test]
    async fn test_predict_rejects_non_object() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!([1, 2, 3]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_predict_malformed_json_returns_error_object() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict")
            .insert_header(ContentType::json())
            .set_payload(r#"{"TEXT": "#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request:"));

        let req = test::TestRequest::post()
            .uri("/predict")
            .insert_header(ContentType::plaintext())
            .set_payload("TEXT=2")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn test_predict_bad_query_param_returns_error_object() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict?k=many")
            .set_json(serde_json::json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn test_bind_fails_on_occupied_port() {
        let listener = std::net::TcpListener::bind(("0.0.0.0", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let result = RestApi::bind(engine(), explainer(), port, None);
        assert!(result.is_err());
    }

    #[actix_web::test]
    async fn test_predict_zero_results() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict?max_results=0")
            .set_json(serde_json::json!({}))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert!(resp["microbes"].as_array().unwrap().is_empty());
        assert!(resp["message"].is_string());
    }

    #[actix_web::test]
    async fn test_features_and_health() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/features").to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        let features = resp["features"].as_array().unwrap();
        assert_eq!(features.len(), 5);
        assert_eq!(features[0]["key"], "TEXT");
        assert_eq!(features[0]["observed"]["present"], 1);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["polygons"], 1);
        assert_eq!(resp["occurrences"], 1);
    }

    #[actix_web::test]
    async fn test_explain_without_key() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/explain_microbe")
            .set_json(serde_json::json!({"name": "Bacillus X", "soil_conditions": "Soil pH=3.0"}))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["explanation"], MISSING_KEY_MESSAGE);
    }
}
