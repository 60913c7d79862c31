use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{Duration, NaiveDate};
use serde_json::json;
use tower::ServiceExt;

use super::export::{load_records, registration_date, to_csv_string};
use super::{
    export_file_name, review_router, ReviewApi, ReviewBoard, ReviewError, ReviewQuery,
    ReviewService, StatusFilter, EXPORT_HEADERS,
};
use crate::access::AccessError;
use crate::workflows::intake::domain::{ApplicationId, ApplicationRecord, ApplicationStatus};
use crate::workflows::intake::tests::common::*;

fn seeded_records() -> Vec<ApplicationRecord> {
    let mut carla = record("app-3", "Carla Dias", ApplicationStatus::Approved, 30);
    carla.payload.course = "Sistemas de Informação".to_string();
    vec![
        record("app-1", "Ana Souza", ApplicationStatus::Pending, 10),
        record("app-2", "Bruno Alves", ApplicationStatus::Reviewing, 20),
        carla,
    ]
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date")
}

fn query(status: StatusFilter, search: &str) -> ReviewQuery {
    ReviewQuery {
        status,
        search: search.to_string(),
    }
}

#[test]
fn board_sorts_newest_first_and_counts_statuses() {
    let board = ReviewBoard::new(seeded_records());

    let names: Vec<&str> = board
        .records()
        .iter()
        .map(|record| record.payload.full_name.as_str())
        .collect();
    assert_eq!(names, vec!["Carla Dias", "Bruno Alves", "Ana Souza"]);

    let counts = board.counts();
    assert_eq!(counts.all, 3);
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.reviewing, 1);
    assert_eq!(counts.approved, 1);
    assert_eq!(counts.rejected, 0);
}

#[test]
fn search_matches_name_email_or_course_ignoring_case() {
    let board = ReviewBoard::new(seeded_records());

    assert_eq!(board.filtered(StatusFilter::All, "BRUNO").len(), 1);
    assert_eq!(board.filtered(StatusFilter::All, "sistemas").len(), 1);
    assert_eq!(board.filtered(StatusFilter::All, "ana@example").len(), 3);
    assert_eq!(board.filtered(StatusFilter::All, "  ").len(), 3);
    assert_eq!(
        board
            .filtered(StatusFilter::Only(ApplicationStatus::Pending), "carla")
            .len(),
        0
    );
}

#[test]
fn status_filter_parses_tab_names() {
    assert_eq!("all".parse::<StatusFilter>(), Ok(StatusFilter::All));
    assert_eq!("".parse::<StatusFilter>(), Ok(StatusFilter::All));
    assert_eq!(
        "Reviewing".parse::<StatusFilter>(),
        Ok(StatusFilter::Only(ApplicationStatus::Reviewing))
    );
    assert!("archived".parse::<StatusFilter>().is_err());
}

#[test]
fn empty_export_is_header_only() {
    let csv = to_csv_string(std::iter::empty()).expect("csv");
    let expected = EXPORT_HEADERS
        .iter()
        .map(|header| format!("\"{header}\""))
        .collect::<Vec<_>>()
        .join(",");
    assert_eq!(csv.lines().collect::<Vec<_>>(), vec![expected.as_str()]);
}

#[test]
fn export_rows_quote_every_cell_and_use_labels() {
    let mut row = record("app-1", "Ana \"Aninha\" Souza", ApplicationStatus::Reviewing, 0);
    row.payload.interest_areas = vec![
        "Redes e Infraestrutura".to_string(),
        "Recursos Humanos".to_string(),
    ];

    let csv = to_csv_string([&row]).expect("csv");
    let line = csv.lines().nth(1).expect("data row");

    assert!(line.starts_with("\"Ana \"\"Aninha\"\" Souza\",\"ana@example.org\""));
    assert!(line.contains("\"Redes e Infraestrutura; Recursos Humanos\""));
    assert!(line.contains("\"Em análise\""));
    assert!(line.ends_with("\"01/03/2025\""));
}

#[test]
fn registration_dates_use_brasilia_calendar_day() {
    let just_after_midnight_utc = base_time() - Duration::hours(11);
    assert_eq!(registration_date(just_after_midnight_utc), "28/02/2025");
    assert_eq!(registration_date(base_time()), "01/03/2025");
}

#[test]
fn export_name_carries_the_date() {
    assert_eq!(export_file_name(today()), "candidaturas_2025-03-10.csv");
}

#[test]
fn stored_records_load_from_json_dump() {
    let raw = serde_json::to_string(&seeded_records()).expect("serialize");
    let loaded = load_records(raw.as_bytes()).expect("load");
    assert_eq!(loaded, seeded_records());
}

#[tokio::test]
async fn listing_is_admin_only_and_filtered() {
    let service = ReviewService::new(
        Arc::new(MemoryApplicationStore::seeded(seeded_records())),
        policy(),
    );

    assert!(matches!(
        service.list(Some(&candidate()), &ReviewQuery::default()).await,
        Err(ReviewError::Access(AccessError::Forbidden))
    ));

    let listing = service
        .list(
            Some(&admin()),
            &query(StatusFilter::Only(ApplicationStatus::Approved), ""),
        )
        .await
        .expect("listing");
    assert_eq!(listing.applications.len(), 1);
    assert_eq!(listing.applications[0].payload.full_name, "Carla Dias");
    assert_eq!(listing.counts.all, 3);
}

#[tokio::test]
async fn status_change_updates_cache_and_store() {
    let store = MemoryApplicationStore::seeded(seeded_records());
    let service = ReviewService::new(Arc::new(store.clone()), policy());
    service
        .list(Some(&admin()), &ReviewQuery::default())
        .await
        .expect("load board");
    let id = ApplicationId("app-1".to_string());

    let updated = service
        .update_status(Some(&admin()), &id, ApplicationStatus::Approved)
        .await
        .expect("status change");

    assert_eq!(updated.status, ApplicationStatus::Approved);
    assert_eq!(service.cached_status(&id), Some(ApplicationStatus::Approved));
    let stored = store
        .records()
        .into_iter()
        .find(|record| record.id == id)
        .expect("stored row");
    assert_eq!(stored.status, ApplicationStatus::Approved);
}

#[tokio::test]
async fn refused_status_change_rolls_back() {
    let store = MemoryApplicationStore::seeded(seeded_records());
    let service = ReviewService::new(Arc::new(store.clone()), policy());
    service
        .list(Some(&admin()), &ReviewQuery::default())
        .await
        .expect("load board");
    store.reject_status_changes();
    let id = ApplicationId("app-2".to_string());

    let err = service
        .update_status(Some(&admin()), &id, ApplicationStatus::Rejected)
        .await
        .expect_err("store refuses");

    assert!(matches!(err, ReviewError::Store(_)));
    assert_eq!(service.cached_status(&id), Some(ApplicationStatus::Reviewing));
}

#[tokio::test]
async fn unknown_application_is_not_found() {
    let service = ReviewService::new(Arc::new(MemoryApplicationStore::default()), policy());
    assert!(matches!(
        service
            .update_status(
                Some(&admin()),
                &ApplicationId("app-404".to_string()),
                ApplicationStatus::Approved,
            )
            .await,
        Err(ReviewError::NotFound)
    ));
}

#[tokio::test]
async fn export_uses_the_filtered_view() {
    let service = ReviewService::new(
        Arc::new(MemoryApplicationStore::seeded(seeded_records())),
        policy(),
    );

    let export = service
        .export(Some(&admin()), &query(StatusFilter::All, "bruno"), today())
        .await
        .expect("export");

    assert_eq!(export.file_name, "candidaturas_2025-03-10.csv");
    assert_eq!(export.body.lines().count(), 2);
    assert!(export.body.contains("Bruno Alves"));
}

#[tokio::test]
async fn export_route_downloads_csv() {
    let identity = FakeIdentity::default();
    let token = identity.signed_in(&admin());
    let router = review_router(ReviewApi {
        service: Arc::new(ReviewService::new(
            Arc::new(MemoryApplicationStore::default()),
            policy(),
        )),
        identity: Arc::new(identity),
    });

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/admin/applications/export?status=all")
                .header(header::AUTHORIZATION, token.clone())
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .expect("ascii header")
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"candidaturas_"));

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/admin/applications")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(
            Request::patch("/api/v1/admin/applications/app-404/status")
                .header(header::AUTHORIZATION, token)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "status": "approved" }).to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
