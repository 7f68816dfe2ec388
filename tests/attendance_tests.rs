// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance marking and the date policy, end to end.
//!
//! Dates are computed relative to the real current date, since the
//! policy is always evaluated against "today" in the school timezone.

use axum::http::StatusCode;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use school_portal::models::Role;
use school_portal::services::attendance_policy::school_today;
use serde_json::json;

mod common;
use common::{body_json, create_test_app, request};

fn today() -> NaiveDate {
    school_today(0)
}

/// Most recent date inside the edit window that is not a Sunday.
fn allowed_date() -> NaiveDate {
    (0..=3)
        .map(|d| today() - Duration::days(d))
        .find(|d| d.weekday() != Weekday::Sun)
        .unwrap()
}

fn sheet(date: NaiveDate, entries: serde_json::Value) -> serde_json::Value {
    json!({
        "date": date.format("%Y-%m-%d").to_string(),
        "class": "5A",
        "entries": entries
    })
}

fn two_students() -> serde_json::Value {
    json!([
        { "studentId": "R-1", "status": "present" },
        { "studentId": "R-2", "status": "absent" }
    ])
}

#[tokio::test]
async fn test_eligibility_future_date() {
    let app = create_test_app();
    let token = app.seed_user("t1", Role::Teacher).await;
    let tomorrow = today() + Duration::days(1);

    let response = app
        .send(request(
            "GET",
            &format!("/api/attendance/eligibility?date={}", tomorrow),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["allowed"], false);
    assert_eq!(body["reason"], "future_date");
    assert_eq!(body["message"], "Cannot mark attendance for future dates");
}

#[tokio::test]
async fn test_eligibility_outside_window() {
    let app = create_test_app();
    let token = app.seed_user("t1", Role::Teacher).await;
    let old = today() - Duration::days(10);

    let response = app
        .send(request(
            "GET",
            &format!("/api/attendance/eligibility?date={}", old),
            Some(&token),
            None,
        ))
        .await;
    let body = body_json(response).await;
    assert_eq!(body["allowed"], false);
    assert_eq!(body["reason"], "outside_edit_window");
}

#[tokio::test]
async fn test_eligibility_allowed_and_malformed() {
    let app = create_test_app();
    let token = app.seed_user("t1", Role::Teacher).await;

    let response = app
        .send(request(
            "GET",
            &format!("/api/attendance/eligibility?date={}", allowed_date()),
            Some(&token),
            None,
        ))
        .await;
    let body = body_json(response).await;
    assert_eq!(body["allowed"], true);
    assert!(body.get("reason").is_none());

    let response = app
        .send(request(
            "GET",
            "/api/attendance/eligibility?date=19-10-2026",
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_teacher_marks_and_updates_sheet() {
    let app = create_test_app();
    let t1 = app.seed_user("t1", Role::Teacher).await;
    let t2 = app.seed_user("t2", Role::Teacher).await;
    let date = allowed_date();

    let response = app
        .send(request("PUT", "/api/attendance", Some(&t1), Some(sheet(date, two_students()))))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    assert_eq!(created["id"], format!("5A_{}", date));
    assert_eq!(created["createdBy"], "t1");

    let response = app
        .send(request(
            "PUT",
            "/api/attendance",
            Some(&t2),
            Some(sheet(
                date,
                json!([
                    { "studentId": "R-1", "status": "late" },
                    { "studentId": "R-2", "status": "present" }
                ]),
            )),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["createdBy"], "t1");
    assert_eq!(updated["updatedBy"], "t2");

    let response = app
        .send(request(
            "GET",
            &format!("/api/attendance?date={}&class=5A", date),
            Some(&t1),
            None,
        ))
        .await;
    let body = body_json(response).await;
    assert_eq!(body["summary"], json!({ "present": 1, "absent": 0, "late": 1 }));
}

#[tokio::test]
async fn test_teacher_bound_by_window_admin_exempt() {
    let app = create_test_app();
    let teacher = app.seed_user("t1", Role::Teacher).await;
    let admin = app.seed_user("a1", Role::Admin).await;
    let old = today() - Duration::days(10);

    let response = app
        .send(request("PUT", "/api/attendance", Some(&teacher), Some(sheet(old, two_students()))))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "date_not_allowed");
    assert_eq!(
        body["details"],
        "Attendance can only be edited for the last 3 days"
    );

    let response = app
        .send(request("PUT", "/api/attendance", Some(&admin), Some(sheet(old, two_students()))))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Nobody records the future
    let tomorrow = today() + Duration::days(1);
    let response = app
        .send(request("PUT", "/api/attendance", Some(&admin), Some(sheet(tomorrow, two_students()))))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_holiday_blocks_marking_immediately() {
    let app = create_test_app();
    let teacher = app.seed_user("t1", Role::Teacher).await;
    let admin = app.seed_user("a1", Role::Admin).await;
    let date = allowed_date();

    // Warm the holiday cache before the holiday exists
    let response = app
        .send(request(
            "GET",
            &format!("/api/attendance/eligibility?date={}", date),
            Some(&teacher),
            None,
        ))
        .await;
    assert_eq!(body_json(response).await["allowed"], true);

    let response = app
        .send(request(
            "POST",
            "/api/holidays",
            Some(&admin),
            Some(json!({ "date": date.to_string(), "name": "Founders Day" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(request("PUT", "/api/attendance", Some(&teacher), Some(sheet(date, two_students()))))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["details"], "Attendance cannot be marked on holidays");

    let response = app
        .send(request(
            "GET",
            &format!("/api/holidays?year={}", date.year()),
            Some(&teacher),
            None,
        ))
        .await;
    let holidays = body_json(response).await;
    assert_eq!(holidays[0]["name"], "Founders Day");

    let response = app
        .send(request(
            "DELETE",
            &format!("/api/holidays/{}", date),
            Some(&admin),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .send(request("PUT", "/api/attendance", Some(&teacher), Some(sheet(date, two_students()))))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_teacher_cannot_manage_holidays() {
    let app = create_test_app();
    let teacher = app.seed_user("t1", Role::Teacher).await;

    let response = app
        .send(request(
            "POST",
            "/api/holidays",
            Some(&teacher),
            Some(json!({ "date": "2026-12-25", "name": "Winter break" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_duplicate_student_rejected() {
    let app = create_test_app();
    let teacher = app.seed_user("t1", Role::Teacher).await;

    let response = app
        .send(request(
            "PUT",
            "/api/attendance",
            Some(&teacher),
            Some(sheet(
                allowed_date(),
                json!([
                    { "studentId": "R-1", "status": "present" },
                    { "studentId": "R-1", "status": "absent" }
                ]),
            )),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_student_cannot_mark_and_sees_only_own_entry() {
    let app = create_test_app();
    let teacher = app.seed_user("t1", Role::Teacher).await;
    // Seeded students belong to class 5A
    let student = app.seed_user("R-1", Role::Student).await;
    let date = allowed_date();

    let response = app
        .send(request("PUT", "/api/attendance", Some(&student), Some(sheet(date, two_students()))))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.send(request("PUT", "/api/attendance", Some(&teacher), Some(sheet(date, two_students()))))
        .await;

    let response = app
        .send(request(
            "GET",
            &format!("/api/attendance?date={}&class=5A", date),
            Some(&student),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entries = body["record"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["studentId"], "R-1");

    let response = app
        .send(request(
            "GET",
            &format!("/api/attendance?date={}&class=6B", date),
            Some(&student),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
