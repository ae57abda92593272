use crate::calc::AttendancePolicy;
use crate::db;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{optional_bool, with_conn, HandlerResult};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn settings_get(conn: &Connection, _params: &serde_json::Value) -> HandlerResult {
    Ok(json!({ "attendance": db::attendance_policy(conn) }))
}

fn settings_update(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let mut policy = db::attendance_policy(conn);
    if let Some(section) = params.get("attendance") {
        if !section.is_object() {
            return Err(HandlerErr::bad_params("attendance must be an object"));
        }
        if let Some(v) = optional_bool(section, "countMissingAsAbsent")? {
            policy = AttendancePolicy {
                count_missing_as_absent: v,
            };
        }
        let value = serde_json::to_value(policy).map_err(HandlerErr::update)?;
        db::settings_set_json(conn, db::SETTINGS_ATTENDANCE, &value).map_err(|e| {
            HandlerErr::update(e).with_details(json!({ "table": "settings" }))
        })?;
        tracing::info!(
            count_missing_as_absent = policy.count_missing_as_absent,
            "attendance policy updated"
        );
    }
    Ok(json!({ "attendance": policy }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(with_conn(state, req, settings_get)),
        "settings.update" => Some(with_conn(state, req, settings_update)),
        _ => None,
    }
}
