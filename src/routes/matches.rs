use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::engine::{Engine, ScoreOptions};
use crate::error::EngineError;
use crate::models::{
    Application, CompareQuery, ErrorResponse, ExplanationQuery, ExtractSkillsRequest,
    FairnessRequest, HealthResponse, PostingRequirements, PostingSearch, RankRequest,
    ResumeProfile,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Configure all matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/postings/extract-skills", web::post().to(extract_skills))
        .route("/postings/{posting_id}", web::put().to(put_posting))
        .route("/postings/{posting_id}/rank", web::post().to(rank_candidates))
        .route("/postings/{posting_id}/compare", web::get().to(compare_candidates))
        .route("/postings/{posting_id}/fairness", web::post().to(fairness_check))
        .route("/postings/{posting_id}/audit", web::get().to(audit_trail))
        .route(
            "/postings/{posting_id}/candidates/{resume_id}/explanation",
            web::get().to(get_explanation),
        )
        .route("/resumes/{resume_id}", web::put().to(put_resume))
        .route(
            "/resumes/{resume_id}/recommendations",
            web::post().to(recommend_postings),
        )
        .route("/applications", web::post().to(post_application));
}

/// HTTP status for an engine error
pub fn status_for(error: &EngineError) -> u16 {
    match error {
        EngineError::InvalidRequest(_)
        | EngineError::InvalidRubric { .. }
        | EngineError::InvalidPosting(_)
        | EngineError::PostingMismatch { .. } => 400,
        EngineError::NotFound(_) => 404,
        EngineError::MissingEmbedding { .. }
        | EngineError::InvalidEmbedding(_)
        | EngineError::StaleData { .. }
        | EngineError::SchemaValidation(_)
        | EngineError::MissingEvidence { .. }
        | EngineError::ConsentRequired { .. } => 422,
        EngineError::ProviderTimeout { .. } | EngineError::Provider(_) => 503,
        EngineError::Storage(_) => 500,
    }
}

fn error_response(error: EngineError) -> HttpResponse {
    let status_code = status_for(&error);
    if status_code >= 500 {
        tracing::error!("Request failed: {}", error);
    } else {
        tracing::info!("Request rejected: {}", error);
    }

    let body = ErrorResponse {
        error: error.kind().to_string(),
        message: error.to_string(),
        status_code,
    };
    match status_code {
        400 => HttpResponse::BadRequest().json(body),
        404 => HttpResponse::NotFound().json(body),
        422 => HttpResponse::UnprocessableEntity().json(body),
        503 => HttpResponse::ServiceUnavailable().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let stats = state.engine.cache_stats().await;

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        taxonomy_version: state.engine.taxonomy().version().to_string(),
        cached_explanations: stats.entries,
        timestamp: chrono::Utc::now(),
    })
}

/// Store a posting and compute its embedding
///
/// PUT /api/v1/postings/{posting_id}
async fn put_posting(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PostingRequirements>,
) -> impl Responder {
    let mut posting = body.into_inner();
    posting.posting_id = path.into_inner();

    if let Err(errors) = posting.validate() {
        return validation_failed(errors);
    }

    let posting_id = posting.posting_id.clone();
    let content_hash = posting.content_hash();
    match state.engine.index_posting(posting).await {
        Ok(()) => {
            tracing::info!("Indexed posting {}", posting_id);
            HttpResponse::Ok().json(json!({ "postingId": posting_id, "contentHash": content_hash }))
        }
        Err(e) => error_response(e),
    }
}

/// Store a parsed resume and compute its embedding
///
/// PUT /api/v1/resumes/{resume_id}
async fn put_resume(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ResumeProfile>,
) -> impl Responder {
    let mut resume = body.into_inner();
    resume.resume_id = path.into_inner();

    let resume_id = resume.resume_id.clone();
    let content_hash = resume.content_hash();
    match state.engine.index_resume(resume).await {
        Ok(()) => {
            tracing::info!("Indexed resume {}", resume_id);
            HttpResponse::Ok().json(json!({ "resumeId": resume_id, "contentHash": content_hash }))
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/applications
async fn post_application(state: web::Data<AppState>, body: web::Json<Application>) -> impl Responder {
    let application = body.into_inner();
    let response = json!({
        "candidateId": application.candidate_id,
        "postingId": application.posting_id,
        "resumeId": application.resume_id,
    });

    match state.engine.record_application(application).await {
        Ok(()) => HttpResponse::Ok().json(response),
        Err(e) => error_response(e),
    }
}

/// Full explanation for one resume on one posting
///
/// GET /api/v1/postings/{posting_id}/candidates/{resume_id}/explanation?blind=&recommendation=
async fn get_explanation(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<ExplanationQuery>,
) -> impl Responder {
    let (posting_id, resume_id) = path.into_inner();
    let options = ScoreOptions {
        blind_mode: query.blind,
        with_recommendation: query.recommendation,
    };

    match state
        .engine
        .score_candidate(&resume_id, &posting_id, options, &query.actor)
        .await
    {
        Ok(explanation) => HttpResponse::Ok().json(explanation),
        Err(e) => error_response(e),
    }
}

/// Rank candidates for a posting
///
/// POST /api/v1/postings/{posting_id}/rank
///
/// Request body:
/// ```json
/// {
///   "filters": { "minScore": 60, "skills": { "skills": ["React"], "mode": "all" } },
///   "sort": { "key": "score", "order": "desc" },
///   "pagination": { "page": 1, "pageSize": 20 },
///   "mode": { "type": "applicants_only", "useTailored": true }
/// }
/// ```
async fn rank_candidates(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<RankRequest>,
) -> impl Responder {
    if let Err(errors) = body.validate() {
        tracing::info!("Validation failed for rank request: {:?}", errors);
        return validation_failed(errors);
    }

    let posting_id = path.into_inner();
    match state.engine.rank_candidates(&posting_id, &body).await {
        Ok(result) => {
            tracing::info!(
                "Returning {} of {} candidates for posting {} ({} failed)",
                result.results.len(),
                result.total_after_filter,
                posting_id,
                result.failures.len()
            );
            HttpResponse::Ok().json(result)
        }
        Err(e) => error_response(e),
    }
}

/// Rank the stored postings for one resume
///
/// POST /api/v1/resumes/{resume_id}/recommendations
async fn recommend_postings(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PostingSearch>,
) -> impl Responder {
    if let Err(errors) = body.validate() {
        return validation_failed(errors);
    }

    let resume_id = path.into_inner();
    match state.engine.recommend_postings(&resume_id, &body).await {
        Ok(result) => {
            tracing::info!(
                "Returning {} of {} postings for resume {}",
                result.results.len(),
                result.total_after_filter,
                resume_id
            );
            HttpResponse::Ok().json(result)
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/postings/{posting_id}/compare?a={candidate}&b={candidate}
async fn compare_candidates(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CompareQuery>,
) -> impl Responder {
    let posting_id = path.into_inner();
    match state
        .engine
        .compare_candidates(&posting_id, &query.a, &query.b, &query.actor)
        .await
    {
        Ok(comparison) => HttpResponse::Ok().json(comparison),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/postings/{posting_id}/fairness
async fn fairness_check(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<FairnessRequest>,
) -> impl Responder {
    if let Err(errors) = body.validate() {
        return validation_failed(errors);
    }

    let posting_id = path.into_inner();
    match state
        .engine
        .run_fairness_check(
            &posting_id,
            &body.candidate_ids,
            body.group_attribute.as_ref(),
            body.top_k,
            &body.actor,
        )
        .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/postings/{posting_id}/audit
async fn audit_trail(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.engine.audit_trail(&path).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/postings/extract-skills
async fn extract_skills(state: web::Data<AppState>, body: web::Json<ExtractSkillsRequest>) -> impl Responder {
    if let Err(errors) = body.validate() {
        return validation_failed(errors);
    }

    match state.engine.extract_posting_skills(&body.description).await {
        Ok(extraction) => HttpResponse::Ok().json(extraction),
        Err(e) => error_response(e),
    }
}
