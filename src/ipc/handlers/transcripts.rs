use crate::calc;
use crate::db;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    find_student, load_catalog, new_id, now_rfc3339, optional_str, required_text, user_name,
    with_conn, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{TranscriptFormat, TranscriptRequest, TranscriptStatus};
use crate::store::Store;
use rusqlite::Connection;
use serde_json::json;

fn list(conn: &Connection, _params: &serde_json::Value) -> HandlerResult {
    let catalog = load_catalog(conn)?;
    let requests: Vec<serde_json::Value> = catalog
        .transcript_requests
        .iter()
        .map(|r| {
            json!({
                "request": r,
                "studentName": user_name(&catalog, &r.student_id, "Unknown Student"),
            })
        })
        .collect();
    Ok(json!({ "requests": requests }))
}

fn request(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let student_id = required_text(params, "studentId")?;
    let format_raw = required_text(params, "format")?;
    let format = TranscriptFormat::parse(&format_raw).ok_or_else(|| {
        HandlerErr::bad_params("format must be one of: detailed, summary")
            .with_details(json!({ "format": format_raw }))
    })?;

    let catalog = load_catalog(conn)?;
    find_student(&catalog, &student_id)?;

    let req = TranscriptRequest {
        id: new_id(),
        student_id,
        request_date: now_rfc3339(),
        status: TranscriptStatus::Pending,
        format,
    };
    db::insert_transcript_request(conn, &req).map_err(HandlerErr::update)?;
    tracing::info!(request_id = %req.id, student_id = %req.student_id, format = format.as_str(), "transcript requested");
    Ok(json!({ "requestId": req.id }))
}

/// Generates the transcript a request asks for. Opening a pending request
/// marks it completed.
fn open(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let request_id = required_text(params, "requestId")?;
    let catalog = load_catalog(conn)?;
    let req = catalog
        .transcript_request(&request_id)
        .ok_or_else(|| HandlerErr::not_found("transcript request"))?;
    let transcript = calc::compose_transcript(&catalog, &req.student_id, None)
        .ok_or_else(|| HandlerErr::not_found("student").with_details(json!({ "studentId": req.student_id })))?;
    let transcript = match req.format {
        TranscriptFormat::Detailed => transcript,
        TranscriptFormat::Summary => transcript.into_summary(),
    };
    tracing::debug!(
        request_id = %req.id,
        courses = transcript.courses().count(),
        "transcript composed"
    );

    let mut request = req.clone();
    if request.status == TranscriptStatus::Pending {
        db::complete_transcript_request(conn, &request.id).map_err(HandlerErr::update)?;
        request.status = TranscriptStatus::Completed;
        tracing::info!(request_id = %request.id, "transcript request completed");
    }

    Ok(json!({
        "request": request,
        "transcript": transcript,
        "generatedDate": now_rfc3339(),
    }))
}

fn student_transcript(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let student_id = required_text(params, "studentId")?;
    let course_id = optional_str(params, "courseId")?;
    let catalog = load_catalog(conn)?;
    if let Some(c) = course_id.as_deref() {
        if catalog.course(c).is_none() {
            return Err(HandlerErr::not_found("course"));
        }
    }
    let transcript = calc::compose_transcript(&catalog, &student_id, course_id.as_deref())
        .ok_or_else(|| HandlerErr::not_found("student"))?;
    Ok(json!(transcript))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "transcripts.list" => Some(with_conn(state, req, list)),
        "transcripts.request" => Some(with_conn(state, req, request)),
        "transcripts.open" => Some(with_conn(state, req, open)),
        "students.transcript" => Some(with_conn(state, req, student_transcript)),
        _ => None,
    }
}
