use crate::calc;
use crate::db;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    ensure_enrolled, find_course, load_catalog, new_id, now_rfc3339, optional_str, parse_date,
    parse_time, required_array, required_text, with_conn, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceRecord, AttendanceSession, AttendanceStatus};
use crate::store::Store;
use rusqlite::Connection;
use serde_json::json;

fn course_open(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let course_id = required_text(params, "courseId")?;
    let catalog = load_catalog(conn)?;
    let course = find_course(&catalog, &course_id)?;
    let policy = db::attendance_policy(conn);

    let students: Vec<serde_json::Value> = catalog
        .course_students(&course.id)
        .into_iter()
        .map(|s| {
            json!({
                "studentId": s.id,
                "name": s.name,
                "email": s.email,
                "attendanceRate": calc::student_attendance_rate(&catalog, &course.id, &s.id),
            })
        })
        .collect();

    Ok(json!({
        "courseId": course.id,
        "courseTitle": course.title,
        "sessions": catalog.course_sessions(&course.id),
        "stats": calc::course_attendance_stats(&catalog, &course.id, policy),
        "students": students,
        "policy": policy,
    }))
}

fn session_open(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let session_id = required_text(params, "sessionId")?;
    let catalog = load_catalog(conn)?;
    let session = catalog
        .attendance_session(&session_id)
        .ok_or_else(|| HandlerErr::not_found("attendance session"))?;

    let rows: Vec<serde_json::Value> = catalog
        .course_students(&session.course_id)
        .into_iter()
        .map(|s| {
            let record = catalog
                .attendance_records
                .iter()
                .find(|r| r.session_id == session.id && r.student_id == s.id);
            json!({
                "studentId": s.id,
                "name": s.name,
                "record": record,
            })
        })
        .collect();

    Ok(json!({
        "session": session,
        "courseTitle": catalog
            .course(&session.course_id)
            .map(|c| c.title.as_str())
            .unwrap_or(calc::UNKNOWN_COURSE),
        "students": rows,
    }))
}

fn session_create(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let course_id = required_text(params, "courseId")?;
    let title = required_text(params, "title")?;
    let date = required_text(params, "date")?;
    parse_date(&date, "date")?;
    let start_time = required_text(params, "startTime")?;
    let end_time = required_text(params, "endTime")?;
    let start = parse_time(&start_time, "startTime")?;
    let end = parse_time(&end_time, "endTime")?;
    if start >= end {
        return Err(HandlerErr::bad_params("startTime must be before endTime")
            .with_details(json!({ "startTime": start_time, "endTime": end_time })));
    }

    let catalog = load_catalog(conn)?;
    let course = find_course(&catalog, &course_id)?;
    let created_by = optional_str(params, "createdBy")?.unwrap_or_else(|| course.lecturer_id.clone());

    let session = AttendanceSession {
        id: new_id(),
        course_id: course.id.clone(),
        title,
        date,
        start_time,
        end_time,
        description: optional_str(params, "description")?,
        created_by,
    };
    db::insert_attendance_session(conn, &session).map_err(HandlerErr::update)?;
    tracing::info!(session_id = %session.id, course_id = %session.course_id, "attendance session created");
    Ok(json!({ "sessionId": session.id }))
}

/// Marks attendance for one session. A later mark for the same student
/// replaces the earlier one; only present and late marks carry a timestamp.
fn record(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let session_id = required_text(params, "sessionId")?;
    let raw_records = required_array(params, "records")?;

    let catalog = load_catalog(conn)?;
    let session = catalog
        .attendance_session(&session_id)
        .ok_or_else(|| HandlerErr::not_found("attendance session"))?;
    let course = find_course(&catalog, &session.course_id)?;
    let now = now_rfc3339();

    let mut records: Vec<AttendanceRecord> = Vec::with_capacity(raw_records.len());
    for raw in raw_records {
        let student_id = required_text(raw, "studentId")?;
        ensure_enrolled(course, &student_id)?;
        if records.iter().any(|r| r.student_id == student_id) {
            return Err(HandlerErr::bad_params("student appears more than once in records")
                .with_details(json!({ "studentId": student_id })));
        }
        let status_raw = required_text(raw, "status")?;
        let status = AttendanceStatus::parse(&status_raw).ok_or_else(|| {
            HandlerErr::bad_params("status must be one of: present, absent, late, excused")
                .with_details(json!({ "studentId": student_id, "status": status_raw }))
        })?;
        let existing_id = catalog
            .attendance_records
            .iter()
            .find(|r| r.session_id == session.id && r.student_id == student_id)
            .map(|r| r.id.clone());
        records.push(AttendanceRecord {
            id: existing_id.unwrap_or_else(new_id),
            session_id: session.id.clone(),
            student_id,
            status,
            timestamp: status.is_attended().then(|| now.clone()),
            notes: optional_str(raw, "notes")?,
        });
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    for r in &records {
        db::upsert_attendance_record(&tx, r).map_err(|e| {
            HandlerErr::update(e).with_details(json!({ "table": "attendance_records" }))
        })?;
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;
    tracing::info!(session_id = %session.id, saved = records.len(), "attendance recorded");
    Ok(json!({ "saved": records.len() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.courseOpen" => Some(with_conn(state, req, course_open)),
        "attendance.sessionOpen" => Some(with_conn(state, req, session_open)),
        "attendance.sessionCreate" => Some(with_conn(state, req, session_create)),
        "attendance.record" => Some(with_conn(state, req, record)),
        _ => None,
    }
}
