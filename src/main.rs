use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use skillmatch::config::Settings;
use skillmatch::engine::Engine;
use skillmatch::models::ErrorResponse;
use skillmatch::routes::{self, matches::AppState};
use skillmatch::services::{GeminiClient, InMemoryStore};

/// JSON error for payload and query extraction failures
#[derive(Debug)]
struct PayloadError(ErrorResponse);

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.0.error, self.0.message)
    }
}

impl error::ResponseError for PayloadError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(&self.0)
    }
}

/// Handle JSON payload errors
fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    info!("JSON payload error on {}: {}", req.path(), err);
    PayloadError(ErrorResponse {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    })
    .into()
}

/// Handle query payload errors
fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    PayloadError(ErrorResponse {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    })
    .into()
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Configuration error: {}", e)))?;

    init_logging(&settings.logging.level, &settings.logging.format);
    info!("Starting skillmatch scoring service...");

    let taxonomy = settings.taxonomy.load().map_err(|e| {
        error!("Failed to load skill taxonomy: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
    })?;
    info!("Skill taxonomy {} loaded ({} skills)", taxonomy.version(), taxonomy.entries().len());

    let engine_config = settings.engine_config();
    info!("Scoring config fingerprint {}", engine_config.fingerprint());

    let store = Arc::new(InMemoryStore::new());
    let mut engine = Engine::in_memory(store, Arc::new(taxonomy), engine_config);

    let keys = settings.providers.key_ring();
    if keys.is_empty() {
        warn!("No provider keys configured; embeddings and recommendations are disabled");
    } else {
        info!("Provider key ring initialized ({} keys, {:?})", keys.len(), settings.providers.key_policy);
        let gemini = GeminiClient::new(settings.providers.gemini.clone(), keys).map_err(|e| {
            error!("Failed to build provider client: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;
        let gemini = Arc::new(gemini);
        engine = engine.with_embedder(gemini.clone()).with_generator(gemini);
    }

    let app_state = AppState {
        engine: Arc::new(engine),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
