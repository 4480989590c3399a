//! The server-held focus timer.

use axum::http::StatusCode;
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

mod common;
use common::{create_test_app, empty, form, get, json};

#[tokio::test]
async fn test_fresh_timer_is_idle_focus() {
    let app = create_test_app();
    let cookie = app.sign_in("learner@example.com").await;

    let (status, _, body) = app.send(get("/timer", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phase"], "focus");
    assert_eq!(body["data"]["state"], "idle");
    assert_eq!(body["data"]["display"], "25:00");
    assert!(body["data"].get("completed_phase").is_none());
}

#[tokio::test]
async fn test_pause_and_resume_keep_remaining_time() {
    let app = create_test_app();
    let cookie = app.sign_in("learner@example.com").await;

    app.send(empty("POST", "/timer/start", &cookie)).await;
    app.clock.advance(Duration::minutes(10));
    let (status, _, body) = app.send(empty("POST", "/timer/pause", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "paused");
    assert_eq!(body["data"]["display"], "15:00");

    // Time spent paused does not count.
    app.clock.advance(Duration::hours(1));
    let (_, _, body) = app.send(empty("POST", "/timer/start", &cookie)).await;
    assert_eq!(body["data"]["state"], "running");
    assert_eq!(body["data"]["remaining_seconds"], 15 * 60);
}

#[tokio::test]
async fn test_invalid_transitions_conflict() {
    let app = create_test_app();
    let cookie = app.sign_in("learner@example.com").await;

    let (status, _, body) = app.send(empty("POST", "/timer/pause", &cookie)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "The timer is not running");

    app.send(empty("POST", "/timer/start", &cookie)).await;
    let (status, _, _) = app.send(empty("POST", "/timer/start", &cookie)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_finished_focus_records_pomodoro_and_starts_break() {
    let app = create_test_app();
    let cookie = app.sign_in("learner@example.com").await;
    app.send(form(
        "POST",
        "/logs",
        &cookie,
        "study_date=2025-03-10&content=Async+Rust&duration_minutes=10",
    ))
    .await;

    app.send(empty("POST", "/timer/start", &cookie)).await;
    app.clock.advance(Duration::minutes(26));

    let (status, _, body) = app.send(get("/timer", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed_phase"], "focus");
    assert_eq!(body["data"]["recorded_pomodoro"]["duration_minutes"], 25);
    assert_eq!(body["data"]["phase"], "break");
    assert_eq!(body["data"]["state"], "idle");
    assert_eq!(body["data"]["display"], "05:00");

    // Reported once only.
    let (_, _, body) = app.send(get("/timer", &cookie)).await;
    assert!(body["data"].get("completed_phase").is_none());

    let (_, _, today) = app.send(get("/pomodoros/today", &cookie)).await;
    assert_eq!(today["data"]["count"], 1);
    let (_, _, logs) = app.send(get("/logs", &cookie)).await;
    assert_eq!(logs["data"]["logs"][0]["duration_minutes"], 35);
}

#[tokio::test]
async fn test_finished_break_records_nothing() {
    let app = create_test_app();
    let cookie = app.sign_in("learner@example.com").await;

    let (status, _, body) = app
        .send(json("POST", "/timer/phase", &cookie, json!({ "phase": "break" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phase"], "break");

    app.send(empty("POST", "/timer/start", &cookie)).await;
    app.clock.advance(Duration::minutes(5));
    let (_, _, body) = app.send(get("/timer", &cookie)).await;
    assert_eq!(body["data"]["completed_phase"], "break");
    assert!(body["data"].get("recorded_pomodoro").is_none());
    assert_eq!(body["data"]["phase"], "focus");

    let (_, _, today) = app.send(get("/pomodoros/today", &cookie)).await;
    assert_eq!(today["data"]["count"], 0);
}

#[tokio::test]
async fn test_timers_are_per_user() {
    let app = create_test_app();
    let alice = app.sign_in("alice@example.com").await;
    let bob = app.sign_in("bob@example.com").await;

    app.send(empty("POST", "/timer/start", &alice)).await;
    let (_, _, body) = app.send(get("/timer", &bob)).await;
    assert_eq!(body["data"]["state"], "idle");
}

#[tokio::test]
async fn test_late_poll_stamps_the_pomodoro_when_focus_ran_out() {
    let app = create_test_app();
    let cookie = app.sign_in("learner@example.com").await;
    app.send(form(
        "POST",
        "/logs",
        &cookie,
        "study_date=2025-03-10&content=Async+Rust&duration_minutes=10",
    ))
    .await;
    app.send(empty("POST", "/timer/start", &cookie)).await;

    // Nobody looks at the timer again until the next morning.
    app.clock.set(Utc.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap());
    let (status, _, body) = app.send(get("/timer", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    let recorded = &body["data"]["recorded_pomodoro"];
    assert_eq!(recorded["completed_at"], "2025-03-10T12:25:00Z");
    assert!(recorded["study_log_id"].is_string());

    let (_, _, today) = app.send(get("/pomodoros/today", &cookie)).await;
    assert_eq!(today["data"]["count"], 0);
    let (_, _, logs) = app.send(get("/logs", &cookie)).await;
    assert_eq!(logs["data"]["logs"][0]["study_date"], "2025-03-10");
    assert_eq!(logs["data"]["logs"][0]["duration_minutes"], 35);
}

#[tokio::test]
async fn test_failed_record_is_retried_on_the_next_request() {
    let app = create_test_app();
    let cookie = app.sign_in("learner@example.com").await;
    app.send(empty("POST", "/timer/start", &cookie)).await;
    app.clock.advance(Duration::minutes(26));

    app.db.fail_writes(true);
    let (status, _, body) = app.send(get("/timer", &cookie)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    app.db.fail_writes(false);
    let (status, _, body) = app.send(get("/timer", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed_phase"], "focus");
    assert_eq!(body["data"]["recorded_pomodoro"]["completed_at"], "2025-03-10T12:25:00Z");
    assert_eq!(body["data"]["phase"], "break");

    let (_, _, today) = app.send(get("/pomodoros/today", &cookie)).await;
    assert_eq!(today["data"]["count"], 1);
}

#[tokio::test]
async fn test_idle_focus_timers_are_not_kept_in_memory() {
    let app = create_test_app();
    let cookie = app.sign_in("learner@example.com").await;

    app.send(get("/timer", &cookie)).await;
    assert_eq!(app.state.timers.tracked(), 0);

    app.send(empty("POST", "/timer/start", &cookie)).await;
    assert_eq!(app.state.timers.tracked(), 1);

    app.send(empty("POST", "/timer/reset", &cookie)).await;
    assert_eq!(app.state.timers.tracked(), 0);
}
