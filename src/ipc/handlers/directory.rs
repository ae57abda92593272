use crate::db;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    find_course, load_catalog, new_id, optional_str, required_f64, required_text, user_name,
    with_conn, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Course, Role, User};
use crate::store::Store;
use rusqlite::Connection;
use serde_json::json;

fn users_list(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let role = match optional_str(params, "role")? {
        None => None,
        Some(raw) => Some(Role::parse(&raw).ok_or_else(|| {
            HandlerErr::bad_params("role must be one of: student, lecturer")
                .with_details(json!({ "role": raw }))
        })?),
    };
    let catalog = load_catalog(conn)?;
    let users: Vec<&User> = catalog
        .users
        .iter()
        .filter(|u| role.map(|r| u.role == r).unwrap_or(true))
        .collect();
    Ok(json!({ "users": users }))
}

fn users_create(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let name = required_text(params, "name")?;
    let email = required_text(params, "email")?;
    if !email.contains('@') {
        return Err(HandlerErr::bad_params("email must contain @"));
    }
    let role_raw = required_text(params, "role")?;
    let role = Role::parse(&role_raw)
        .ok_or_else(|| HandlerErr::bad_params("role must be one of: student, lecturer"))?;

    let user = User {
        id: new_id(),
        name,
        email,
        role,
    };
    db::insert_user(conn, &user).map_err(HandlerErr::update)?;
    tracing::info!(user_id = %user.id, role = role.as_str(), "user created");
    Ok(json!({ "userId": user.id }))
}

fn courses_list(conn: &Connection, _params: &serde_json::Value) -> HandlerResult {
    let catalog = load_catalog(conn)?;
    let courses: Vec<serde_json::Value> = catalog
        .courses
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "title": c.title,
                "description": c.description,
                "lecturerId": c.lecturer_id,
                "lecturerName": user_name(&catalog, &c.lecturer_id, "Unknown"),
                "studentCount": c.student_ids.len(),
                "credits": catalog.course_credits(&c.id),
                "semester": catalog.course_semester(&c.id),
            })
        })
        .collect();
    Ok(json!({ "courses": courses }))
}

fn courses_open(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let course_id = required_text(params, "courseId")?;
    let catalog = load_catalog(conn)?;
    let course = find_course(&catalog, &course_id)?;
    let assignments: Vec<_> = catalog
        .assignments
        .iter()
        .filter(|a| a.course_id == course.id)
        .collect();
    Ok(json!({
        "course": course,
        "lecturer": catalog.user(&course.lecturer_id),
        "students": catalog.course_students(&course.id),
        "assignments": assignments,
        "credits": catalog.course_credits(&course.id),
        "semester": catalog.course_semester(&course.id),
        "hasGradingSchema": catalog.grading_schema_for(&course.id).is_some(),
    }))
}

fn courses_create(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let title = required_text(params, "title")?;
    let description = optional_str(params, "description")?.unwrap_or_default();
    let lecturer_id = required_text(params, "lecturerId")?;

    let catalog = load_catalog(conn)?;
    match catalog.user(&lecturer_id) {
        Some(u) if u.role == Role::Lecturer => {}
        Some(_) => return Err(HandlerErr::bad_params("lecturerId must name a lecturer")),
        None => return Err(HandlerErr::not_found("lecturer")),
    }

    let mut student_ids: Vec<String> = Vec::new();
    if let Some(raw) = params.get("studentIds").filter(|v| !v.is_null()) {
        let Some(items) = raw.as_array() else {
            return Err(HandlerErr::bad_params("studentIds must be an array"));
        };
        for item in items {
            let Some(id) = item.as_str() else {
                return Err(HandlerErr::bad_params("studentIds must contain strings"));
            };
            if catalog.user(id).map(|u| u.role) != Some(Role::Student) {
                return Err(HandlerErr::not_found("student").with_details(json!({ "studentId": id })));
            }
            if !student_ids.iter().any(|s| s == id) {
                student_ids.push(id.to_string());
            }
        }
    }

    let course = Course {
        id: new_id(),
        title,
        description,
        lecturer_id,
        student_ids,
    };
    db::insert_course(conn, &course).map_err(HandlerErr::update)?;
    tracing::info!(course_id = %course.id, students = course.student_ids.len(), "course created");
    Ok(json!({ "courseId": course.id }))
}

fn courses_set_catalog(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let course_id = required_text(params, "courseId")?;
    let credits = required_f64(params, "credits")?;
    if credits < 0.0 {
        return Err(HandlerErr::bad_params("credits must be >= 0"));
    }
    let semester = optional_str(params, "semester")?;
    let changed = db::set_course_catalog(conn, &course_id, Some(credits), semester.as_deref())
        .map_err(HandlerErr::update)?;
    if changed == 0 {
        return Err(HandlerErr::not_found("course"));
    }
    let catalog = load_catalog(conn)?;
    Ok(json!({
        "courseId": course_id,
        "credits": catalog.course_credits(&course_id),
        "semester": catalog.course_semester(&course_id),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.list" => Some(with_conn(state, req, users_list)),
        "users.create" => Some(with_conn(state, req, users_create)),
        "courses.list" => Some(with_conn(state, req, courses_list)),
        "courses.open" => Some(with_conn(state, req, courses_open)),
        "courses.create" => Some(with_conn(state, req, courses_create)),
        "courses.setCatalog" => Some(with_conn(state, req, courses_set_catalog)),
        _ => None,
    }
}
