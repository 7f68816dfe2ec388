// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Record collections, the public site and the screening questionnaire.

use axum::http::{header, StatusCode};
use school_portal::models::Role;
use serde_json::json;

mod common;
use common::{body_json, create_test_app, request, TestApp};

async fn create(app: &TestApp, token: &str, path: &str, body: serde_json::Value) -> String {
    let response = app.send(request("POST", path, Some(token), Some(body))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_teacher_creates_and_updates_remark() {
    let app = create_test_app();
    let t1 = app.seed_user("t1", Role::Teacher).await;
    let t2 = app.seed_user("t2", Role::Teacher).await;

    let response = app
        .send(request(
            "POST",
            "/api/remarks",
            Some(&t1),
            Some(json!({ "studentId": "R-1", "text": "Helped a classmate", "category": "behaviour" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap();
    assert!(!id.is_empty());
    assert_eq!(created["createdBy"], "t1");

    let response = app
        .send(request(
            "PUT",
            &format!("/api/remarks/{}", id),
            Some(&t2),
            Some(json!({ "studentId": "R-1", "text": "Helped two classmates" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["createdBy"], "t1");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert_eq!(updated["updatedBy"], "t2");
    assert_eq!(updated["text"], "Helped two classmates");
}

#[tokio::test]
async fn test_invalid_record_rejected() {
    let app = create_test_app();
    let teacher = app.seed_user("t1", Role::Teacher).await;

    let response = app
        .send(request(
            "POST",
            "/api/remarks",
            Some(&teacher),
            Some(json!({ "studentId": "R-1", "text": "" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_student_sees_only_own_remarks() {
    let app = create_test_app();
    let teacher = app.seed_user("t1", Role::Teacher).await;
    let student = app.seed_user("R-1", Role::Student).await;

    let own = create(
        &app,
        &teacher,
        "/api/remarks",
        json!({ "studentId": "R-1", "text": "Great week" }),
    )
    .await;
    let other = create(
        &app,
        &teacher,
        "/api/remarks",
        json!({ "studentId": "R-2", "text": "Needs to focus" }),
    )
    .await;

    // The studentId filter is ignored for students
    let response = app
        .send(request("GET", "/api/remarks?studentId=R-2", Some(&student), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let remarks = body_json(response).await;
    let remarks = remarks.as_array().unwrap();
    assert_eq!(remarks.len(), 1);
    assert_eq!(remarks[0]["id"], own.as_str());

    let response = app
        .send(request("GET", &format!("/api/remarks/{}", own), Some(&student), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(request("GET", &format!("/api/remarks/{}", other), Some(&student), None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Staff see everything
    let response = app
        .send(request("GET", "/api/remarks", Some(&teacher), None))
        .await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_student_cannot_write_records() {
    let app = create_test_app();
    let student = app.seed_user("R-1", Role::Student).await;

    let response = app
        .send(request(
            "POST",
            "/api/reports",
            Some(&student),
            Some(json!({
                "studentId": "R-1",
                "term": "Term 1",
                "subjects": [{ "subject": "Maths", "marks": 100, "maxMarks": 100 }]
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_report_carries_percentage_and_grade() {
    let app = create_test_app();
    let teacher = app.seed_user("t1", Role::Teacher).await;
    let student = app.seed_user("R-1", Role::Student).await;

    let response = app
        .send(request(
            "POST",
            "/api/reports",
            Some(&teacher),
            Some(json!({
                "studentId": "R-1",
                "term": "Term 1",
                "subjects": [
                    { "subject": "Maths", "marks": 45, "maxMarks": 50 },
                    { "subject": "English", "marks": 80, "maxMarks": 100 }
                ],
                "percentage": 100.0,
                "grade": "A+"
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["percentage"], 83.3);
    assert_eq!(created["grade"], "A");
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .send(request("GET", &format!("/api/reports/{}", id), Some(&student), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["percentage"], 83.3);
    assert_eq!(fetched["grade"], "A");

    let response = app
        .send(request(
            "PUT",
            &format!("/api/reports/{}", id),
            Some(&teacher),
            Some(json!({
                "studentId": "R-1",
                "term": "Term 1",
                "subjects": [{ "subject": "Maths", "marks": 20, "maxMarks": 50 }]
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["percentage"], 40.0);
    assert_eq!(updated["grade"], "F");

    let response = app
        .send(request("GET", "/api/reports", Some(&teacher), None))
        .await;
    let reports = body_json(response).await;
    assert_eq!(reports[0]["percentage"], 40.0);
    assert_eq!(reports[0]["grade"], "F");
}

#[tokio::test]
async fn test_events_admin_only_writes() {
    let app = create_test_app();
    let admin = app.seed_user("a1", Role::Admin).await;
    let teacher = app.seed_user("t1", Role::Teacher).await;
    let event = json!({ "title": "Sports Day", "date": "2026-11-14" });

    let response = app
        .send(request("POST", "/api/events", Some(&teacher), Some(event.clone())))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let id = create(&app, &admin, "/api/events", event).await;

    let response = app
        .send(request("DELETE", &format!("/api/events/{}", id), Some(&teacher), None))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(request("DELETE", &format!("/api/events/{}", id), Some(&admin), None))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .send(request("DELETE", &format!("/api/events/{}", id), Some(&admin), None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_finance_summary() {
    let app = create_test_app();
    let admin = app.seed_user("a1", Role::Admin).await;
    let teacher = app.seed_user("t1", Role::Teacher).await;

    for record in [
        json!({ "studentId": "R-1", "kind": "fee", "amount": 5000.0, "description": "Term fee", "date": "2026-10-01" }),
        json!({ "studentId": "R-1", "kind": "payment", "amount": 3000.0, "description": "Part payment", "date": "2026-10-05" }),
        json!({ "kind": "expense", "amount": 1200.0, "description": "Chalk and paper", "date": "2026-10-06" }),
    ] {
        create(&app, &admin, "/api/finance", record).await;
    }

    let response = app
        .send(request("GET", "/api/finance/summary", Some(&teacher), None))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(request("GET", "/api/finance/summary", Some(&admin), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["totalFees"], 5000.0);
    assert_eq!(summary["outstanding"], 2000.0);
    assert_eq!(summary["net"], 1800.0);
    assert_eq!(summary["balances"]["R-1"], 2000.0);
}

#[tokio::test]
async fn test_student_reads_own_finance_records() {
    let app = create_test_app();
    let admin = app.seed_user("a1", Role::Admin).await;
    let student = app.seed_user("R-1", Role::Student).await;

    create(
        &app,
        &admin,
        "/api/finance",
        json!({ "studentId": "R-1", "kind": "fee", "amount": 100.0, "description": "Trip", "date": "2026-10-01" }),
    )
    .await;
    create(
        &app,
        &admin,
        "/api/finance",
        json!({ "kind": "expense", "amount": 50.0, "description": "Bus", "date": "2026-10-01" }),
    )
    .await;

    let response = app
        .send(request("GET", "/api/finance", Some(&student), None))
        .await;
    let records = body_json(response).await;
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["description"], "Trip");
}

#[tokio::test]
async fn test_public_site_shows_only_public_items() {
    let app = create_test_app();
    let admin = app.seed_user("a1", Role::Admin).await;

    create(&app, &admin, "/api/events", json!({ "title": "Annual Day", "date": "2026-12-20" })).await;
    create(&app, &admin, "/api/events", json!({ "title": "Open House", "date": "2026-11-02" })).await;
    create(
        &app,
        &admin,
        "/api/events",
        json!({ "title": "Staff meeting", "date": "2026-11-01", "isPublic": false }),
    )
    .await;
    create(
        &app,
        &admin,
        "/api/photos",
        json!({ "url": "https://cdn.school.test/a.jpg", "caption": "Assembly" }),
    )
    .await;
    create(
        &app,
        &admin,
        "/api/photos",
        json!({ "url": "https://cdn.school.test/b.jpg", "isPublic": false }),
    )
    .await;

    let response = app.send(request("GET", "/public/events", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=300"
    );
    let events = body_json(response).await;
    let titles: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Open House", "Annual Day"]);
    assert!(events[0].get("createdBy").is_none());

    let response = app.send(request("GET", "/public/gallery", None, None)).await;
    let photos = body_json(response).await;
    assert_eq!(photos.as_array().unwrap().len(), 1);
    assert_eq!(photos[0]["caption"], "Assembly");
}

#[tokio::test]
async fn test_mchat_screening() {
    let app = create_test_app();
    let token = app.seed_user("t1", Role::Teacher).await;

    let response = app
        .send(request("GET", "/api/assessments/mchat", Some(&token), None))
        .await;
    let questions = body_json(response).await;
    assert_eq!(questions["questions"].as_array().unwrap().len(), 5);

    let response = app
        .send(request(
            "POST",
            "/api/assessments/mchat",
            Some(&token),
            Some(json!({ "answers": ["no", "no", "no", "yes", "yes"] })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["score"], 3);
    assert_eq!(result["risk"], "Medium");

    let response = app
        .send(request(
            "POST",
            "/api/assessments/mchat",
            Some(&token),
            Some(json!({ "answers": ["no"] })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
