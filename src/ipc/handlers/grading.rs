use crate::calc;
use crate::db;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{
    ensure_enrolled, find_course, load_catalog, new_id, now_rfc3339, optional_str, required_array,
    required_f64, required_text, with_conn, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{CourseGradingSchema, GradeComponent, GradeComponentType, StudentGradeEntry};
use crate::store::Store;
use rusqlite::Connection;
use serde_json::json;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Pure lookup; answers without an open workspace.
fn handle_grade_point(req: &Request) -> serde_json::Value {
    match required_f64(&req.params, "percentage") {
        Ok(percentage) => ok(&req.id, json!(calc::grade_point(percentage))),
        Err(e) => e.response(&req.id),
    }
}

fn schema_open(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let course_id = required_text(params, "courseId")?;
    let catalog = load_catalog(conn)?;
    let course = find_course(&catalog, &course_id)?;
    let schema = catalog.grading_schema_for(&course.id);
    Ok(json!({
        "courseId": course.id,
        "courseTitle": course.title,
        "schema": schema,
        "totalWeight": schema.map(|s| s.total_weight()).unwrap_or(0.0),
    }))
}

fn parse_component(raw: &serde_json::Value, idx: usize) -> Result<GradeComponent, HandlerErr> {
    let at = |message: &str| {
        HandlerErr::bad_params(format!("components[{}]: {}", idx, message))
            .with_details(json!({ "index": idx }))
    };
    if !raw.is_object() {
        return Err(at("must be an object"));
    }
    let name = required_text(raw, "name").map_err(|_| at("name is required"))?;
    let kind_raw = required_text(raw, "type").map_err(|_| at("type is required"))?;
    let kind = GradeComponentType::parse(&kind_raw).ok_or_else(|| at("unknown component type"))?;
    let weight = required_f64(raw, "weight").map_err(|_| at("weight must be a number"))?;
    if !(0.0..=100.0).contains(&weight) {
        return Err(at("weight must be between 0 and 100"));
    }
    let max_points = required_f64(raw, "maxPoints").map_err(|_| at("maxPoints must be a number"))?;
    if max_points <= 0.0 {
        return Err(at("maxPoints must be > 0"));
    }
    Ok(GradeComponent {
        id: optional_str(raw, "id")?.unwrap_or_else(new_id),
        name,
        kind,
        weight,
        max_points,
        description: optional_str(raw, "description")?,
    })
}

/// Saves the whole schema for a course. Weights must total 100; aggregation
/// itself never checks this, so it is enforced here on write.
fn schema_save(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let course_id = required_text(params, "courseId")?;
    let raw_components = required_array(params, "components")?;
    if raw_components.is_empty() {
        return Err(HandlerErr::new("invalid_schema", "schema needs at least one component"));
    }
    let components = raw_components
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_component(raw, i))
        .collect::<Result<Vec<_>, _>>()?;
    for (i, c) in components.iter().enumerate() {
        if components[..i].iter().any(|prev| prev.id == c.id) {
            return Err(HandlerErr::bad_params("component ids must be unique")
                .with_details(json!({ "componentId": c.id })));
        }
    }
    let total_weight: f64 = components.iter().map(|c| c.weight).sum();
    if (total_weight - 100.0).abs() > WEIGHT_TOLERANCE {
        return Err(HandlerErr::new(
            "invalid_schema",
            format!("total weight must be 100% (currently {}%)", total_weight),
        )
        .with_details(json!({ "totalWeight": total_weight })));
    }

    let catalog = load_catalog(conn)?;
    let course = find_course(&catalog, &course_id)?;
    let now = now_rfc3339();
    if let Some(taken) = components.iter().find(|c| {
        catalog
            .grading_schemas
            .iter()
            .any(|s| s.course_id != course.id && s.component(&c.id).is_some())
    }) {
        return Err(HandlerErr::bad_params("component id is used by another course")
            .with_details(json!({ "componentId": taken.id })));
    }
    let existing = catalog.grading_schema_for(&course.id);
    let schema = CourseGradingSchema {
        id: existing.map(|s| s.id.clone()).unwrap_or_else(new_id),
        course_id: course.id.clone(),
        components,
        created_at: existing
            .map(|s| s.created_at.clone())
            .unwrap_or_else(|| now.clone()),
        updated_at: now,
    };

    let tx = conn.unchecked_transaction().map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    let removed_entries = db::save_grading_schema(&tx, &schema).map_err(|e| {
        HandlerErr::update(e).with_details(json!({ "table": "grade_components" }))
    })?;
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;
    tracing::info!(
        course_id = %schema.course_id,
        components = schema.components.len(),
        removed_entries,
        "grading schema saved"
    );
    Ok(json!({
        "schemaId": schema.id,
        "totalWeight": total_weight,
        "removedEntries": removed_entries,
    }))
}

fn course_open(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let course_id = required_text(params, "courseId")?;
    let catalog = load_catalog(conn)?;
    let book = calc::course_grade_book(&catalog, &course_id)
        .ok_or_else(|| HandlerErr::not_found("course"))?;
    Ok(json!(book))
}

/// Records one component's points for several students. Points are clamped
/// into [0, maxPoints] and the percentage is derived from them.
fn entries_submit(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let course_id = required_text(params, "courseId")?;
    let component_id = required_text(params, "componentId")?;
    let raw_entries = required_array(params, "entries")?;

    let catalog = load_catalog(conn)?;
    let course = find_course(&catalog, &course_id)?;
    let schema = catalog
        .grading_schema_for(&course.id)
        .ok_or_else(|| HandlerErr::not_found("grading schema"))?;
    let component = schema
        .component(&component_id)
        .ok_or_else(|| HandlerErr::not_found("grade component"))?;
    let graded_by = optional_str(params, "gradedBy")?.unwrap_or_else(|| course.lecturer_id.clone());
    let graded_at = now_rfc3339();

    let mut entries: Vec<StudentGradeEntry> = Vec::with_capacity(raw_entries.len());
    for raw in raw_entries {
        let student_id = required_text(raw, "studentId")?;
        ensure_enrolled(course, &student_id)?;
        if entries.iter().any(|e| e.student_id == student_id) {
            return Err(HandlerErr::bad_params("student appears more than once in entries")
                .with_details(json!({ "studentId": student_id })));
        }
        let points = required_f64(raw, "points")?.clamp(0.0, component.max_points);
        entries.push(StudentGradeEntry {
            id: new_id(),
            student_id,
            component_id: component.id.clone(),
            course_id: course.id.clone(),
            points,
            percentage: 100.0 * points / component.max_points,
            feedback: optional_str(raw, "feedback")?,
            graded_at: graded_at.clone(),
            graded_by: graded_by.clone(),
        });
    }

    let tx = conn.unchecked_transaction().map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    for e in &entries {
        db::upsert_grade_entry(&tx, e).map_err(|err| {
            HandlerErr::update(err).with_details(json!({ "table": "student_grade_entries" }))
        })?;
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;
    tracing::info!(
        course_id = %course.id,
        component_id = %component.id,
        saved = entries.len(),
        "grade entries submitted"
    );
    Ok(json!({ "saved": entries.len() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grading.gradePoint" => Some(handle_grade_point(req)),
        "grading.schemaOpen" => Some(with_conn(state, req, schema_open)),
        "grading.schemaSave" => Some(with_conn(state, req, schema_save)),
        "grading.courseOpen" => Some(with_conn(state, req, course_open)),
        "grading.entriesSubmit" => Some(with_conn(state, req, entries_submit)),
        _ => None,
    }
}
