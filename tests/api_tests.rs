// HTTP surface tests

mod common;

use actix_web::{test, web, App};
use serde_json::Value;
use std::sync::Arc;

use common::{application, engine, posting, resume};
use skillmatch::models::{FairnessRequest, GroupAttribute, RankRequest};
use skillmatch::routes::{self, matches::AppState};
use skillmatch::services::InMemoryStore;

fn state() -> AppState {
    AppState {
        engine: Arc::new(engine(Arc::new(InMemoryStore::new()))),
    }
}

#[actix_web::test]
async fn test_health() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state()))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["taxonomy_version"], "builtin-1");
}

#[actix_web::test]
async fn test_index_score_and_rank_over_http() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state()))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::put()
        .uri("/api/v1/postings/p1")
        .set_json(posting("ignored", &["React", "Node.js"], &["TypeScript"]))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["postingId"], "p1");

    for (candidate, name) in [("c1", "Alice Moreau"), ("c2", "Bram Visser")] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/resumes/r-{}", candidate))
            .set_json(resume(candidate, name, &["React", "Node.js"]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/applications")
        .set_json(application("c1", "p1", "r-c1"))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let req = test::TestRequest::get()
        .uri("/api/v1/postings/p1/candidates/r-c1/explanation?blind=true")
        .to_request();
    let explanation: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(explanation["candidateId"], "c1");
    assert_eq!(explanation["componentScores"]["skills"], 70.0);
    assert_eq!(explanation["provenance"]["blindMode"], true);

    let req = test::TestRequest::post()
        .uri("/api/v1/postings/p1/rank")
        .set_json(RankRequest::default())
        .to_request();
    let ranking: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ranking["results"].as_array().map(Vec::len), Some(2));
    assert_eq!(ranking["totalPages"], 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/postings/p1/compare?a=c1&b=c2")
        .to_request();
    let comparison: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comparison["postingId"], "p1");

    let req = test::TestRequest::get().uri("/api/v1/postings/p1/audit").to_request();
    let trail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(trail.as_array().map(Vec::len), Some(3));
}

#[actix_web::test]
async fn test_error_statuses() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state()))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/postings/nope/candidates/r1/explanation")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_found");

    let mut bad = posting("p1", &["React"], &[]);
    bad.rubric_weights.skills = 0.9;
    let req = test::TestRequest::put()
        .uri("/api/v1/postings/p1")
        .set_json(bad)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);

    let req = test::TestRequest::put()
        .uri("/api/v1/postings/p1")
        .set_json(posting("p1", &["React"], &[]))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let request = FairnessRequest {
        candidate_ids: vec!["c1".to_string()],
        group_attribute: Some(GroupAttribute {
            name: "gender".to_string(),
            consent: false,
            groups: Default::default(),
        }),
        top_k: None,
        actor: "auditor".to_string(),
    };
    let req = test::TestRequest::post()
        .uri("/api/v1/postings/p1/fairness")
        .set_json(request)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 422);

    let req = test::TestRequest::post()
        .uri("/api/v1/postings/p1/rank")
        .set_json(serde_json::json!({ "pagination": { "page": 1, "pageSize": 500 } }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);

    let req = test::TestRequest::post()
        .uri("/api/v1/postings/extract-skills")
        .set_json(serde_json::json!({ "description": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
}

#[actix_web::test]
async fn test_recommend_postings_over_http() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state()))
            .configure(routes::configure_routes),
    )
    .await;

    for (id, required) in [("p1", ["React", "Node.js"]), ("p2", ["Python", "Django"])] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/postings/{}", id))
            .set_json(posting("ignored", &required, &[]))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }
    let req = test::TestRequest::put()
        .uri("/api/v1/resumes/r-c1")
        .set_json(resume("c1", "Alice Moreau", &["React", "Node.js"]))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let req = test::TestRequest::post()
        .uri("/api/v1/resumes/r-c1/recommendations")
        .set_json(serde_json::json!({ "filters": { "location": "berlin" } }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["resumeId"], "r-c1");
    assert_eq!(body["results"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["results"][0]["postingId"], "p1");
    assert_eq!(body["failures"].as_array().map(Vec::len), Some(0));

    let req = test::TestRequest::post()
        .uri("/api/v1/resumes/r-c1/recommendations")
        .set_json(serde_json::json!({ "pagination": { "page": 0 } }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);

    let req = test::TestRequest::post()
        .uri("/api/v1/resumes/r-missing/recommendations")
        .set_json(serde_json::json!({}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);
}
