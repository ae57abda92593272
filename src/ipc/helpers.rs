use crate::db;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{Course, Role, User};
use crate::store::{Catalog, Store};
use chrono::{NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::Connection;
use uuid::Uuid;

pub type HandlerResult = Result<serde_json::Value, HandlerErr>;

/// Runs a handler against the open workspace and wraps its outcome.
pub fn with_conn(
    state: &mut AppState,
    req: &Request,
    f: fn(&Connection, &serde_json::Value) -> HandlerResult,
) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn load_catalog(conn: &Connection) -> Result<Catalog, HandlerErr> {
    db::load_catalog(conn).map_err(HandlerErr::query)
}

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Required string that must not be blank once trimmed.
pub fn required_text(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let raw = required_str(params, key)?;
    let t = raw.trim();
    if t.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(t.to_string())
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(HandlerErr::bad_params(format!(
                    "{} must be string or null",
                    key
                )));
            };
            let t = s.trim();
            Ok(if t.is_empty() { None } else { Some(t.to_string()) })
        }
    }
}

pub fn required_f64(params: &serde_json::Value, key: &str) -> Result<f64, HandlerErr> {
    let v = params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    v.as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number", key)))
}

pub fn optional_bool(params: &serde_json::Value, key: &str) -> Result<Option<bool>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a boolean", key))),
    }
}

pub fn required_array<'a>(
    params: &'a serde_json::Value,
    key: &str,
) -> Result<&'a Vec<serde_json::Value>, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn parse_date(raw: &str, key: &str) -> Result<NaiveDate, HandlerErr> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

pub fn parse_time(raw: &str, key: &str) -> Result<NaiveTime, HandlerErr> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| HandlerErr::bad_params(format!("{} must be HH:MM", key)))
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn find_course<'a>(catalog: &'a Catalog, course_id: &str) -> Result<&'a Course, HandlerErr> {
    catalog
        .course(course_id)
        .ok_or_else(|| HandlerErr::not_found("course"))
}

pub fn find_student<'a>(catalog: &'a Catalog, student_id: &str) -> Result<&'a User, HandlerErr> {
    catalog
        .user(student_id)
        .filter(|u| u.role == Role::Student)
        .ok_or_else(|| HandlerErr::not_found("student"))
}

pub fn ensure_enrolled(course: &Course, student_id: &str) -> Result<(), HandlerErr> {
    if course.student_ids.iter().any(|id| id == student_id) {
        return Ok(());
    }
    Err(HandlerErr::new(
        "not_enrolled",
        format!("student {} is not enrolled in {}", student_id, course.id),
    )
    .with_details(serde_json::json!({ "studentId": student_id, "courseId": course.id })))
}

pub fn user_name(catalog: &Catalog, id: &str, fallback: &str) -> String {
    catalog
        .user(id)
        .map(|u| u.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}
