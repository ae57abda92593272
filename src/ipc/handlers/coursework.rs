use crate::calc::{UNKNOWN_ASSIGNMENT, UNKNOWN_COURSE};
use crate::db;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    ensure_enrolled, find_course, find_student, load_catalog, new_id, now_rfc3339, optional_str,
    parse_date, required_f64, required_text, user_name, with_conn, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Assignment, Grade, Submission};
use crate::store::Store;
use rusqlite::Connection;
use serde_json::json;

fn assignments_list(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let course_id = optional_str(params, "courseId")?;
    let catalog = load_catalog(conn)?;
    let rows: Vec<serde_json::Value> = catalog
        .assignments
        .iter()
        .filter(|a| course_id.as_deref().map(|c| a.course_id == c).unwrap_or(true))
        .map(|a| {
            let submission_count = catalog
                .submissions
                .iter()
                .filter(|s| s.assignment_id == a.id)
                .count();
            json!({
                "assignment": a,
                "courseTitle": catalog
                    .course(&a.course_id)
                    .map(|c| c.title.as_str())
                    .unwrap_or(UNKNOWN_COURSE),
                "submissionCount": submission_count,
            })
        })
        .collect();
    Ok(json!({ "assignments": rows }))
}

fn assignments_open(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let assignment_id = required_text(params, "assignmentId")?;
    let catalog = load_catalog(conn)?;
    let assignment = catalog
        .assignment(&assignment_id)
        .ok_or_else(|| HandlerErr::not_found("assignment"))?;
    let submissions: Vec<serde_json::Value> = catalog
        .submissions
        .iter()
        .filter(|s| s.assignment_id == assignment.id)
        .map(|s| {
            json!({
                "submission": s,
                "studentName": user_name(&catalog, &s.student_id, "Unknown Student"),
                "grade": catalog.grades.iter().find(|g| g.submission_id == s.id),
            })
        })
        .collect();
    Ok(json!({
        "assignment": assignment,
        "courseTitle": catalog
            .course(&assignment.course_id)
            .map(|c| c.title.as_str())
            .unwrap_or(UNKNOWN_COURSE),
        "submissions": submissions,
    }))
}

fn assignments_create(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let course_id = required_text(params, "courseId")?;
    let title = required_text(params, "title")?;
    let description = optional_str(params, "description")?.unwrap_or_default();
    let due_date = required_text(params, "dueDate")?;
    parse_date(&due_date, "dueDate")?;
    let max_points = required_f64(params, "maxPoints")?;
    if max_points <= 0.0 {
        return Err(HandlerErr::bad_params("maxPoints must be > 0"));
    }

    let catalog = load_catalog(conn)?;
    find_course(&catalog, &course_id)?;

    let assignment = Assignment {
        id: new_id(),
        course_id,
        title,
        description,
        due_date,
        max_points,
    };
    db::insert_assignment(conn, &assignment).map_err(HandlerErr::update)?;
    tracing::info!(assignment_id = %assignment.id, course_id = %assignment.course_id, "assignment created");
    Ok(json!({ "assignmentId": assignment.id }))
}

fn submissions_create(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let assignment_id = required_text(params, "assignmentId")?;
    let student_id = required_text(params, "studentId")?;
    let content = required_text(params, "content")?;
    let attachment_url = optional_str(params, "attachmentUrl")?;

    let catalog = load_catalog(conn)?;
    let assignment = catalog
        .assignment(&assignment_id)
        .ok_or_else(|| HandlerErr::not_found("assignment"))?;
    find_student(&catalog, &student_id)?;
    let course = find_course(&catalog, &assignment.course_id)?;
    ensure_enrolled(course, &student_id)?;

    let submission = Submission {
        id: new_id(),
        assignment_id,
        student_id,
        submitted_at: now_rfc3339(),
        content,
        attachment_url,
    };
    db::insert_submission(conn, &submission).map_err(HandlerErr::update)?;
    tracing::info!(submission_id = %submission.id, assignment_id = %submission.assignment_id, "submission received");
    Ok(json!({ "submissionId": submission.id, "submittedAt": submission.submitted_at }))
}

fn grades_list(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let student_id = optional_str(params, "studentId")?;
    let course_id = optional_str(params, "courseId")?;
    let catalog = load_catalog(conn)?;

    let mut groups: Vec<(String, Vec<serde_json::Value>)> = Vec::new();
    for g in catalog.grades.iter().filter(|g| {
        student_id.as_deref().map(|s| g.student_id == s).unwrap_or(true)
            && course_id.as_deref().map(|c| g.course_id == c).unwrap_or(true)
    }) {
        let assignment = catalog.assignment(&g.assignment_id);
        let max_points = assignment.map(|a| a.max_points).unwrap_or(0.0);
        let percentage = if max_points > 0.0 {
            100.0 * g.points / max_points
        } else {
            0.0
        };
        let line = json!({
            "grade": g,
            "assignmentTitle": assignment.map(|a| a.title.as_str()).unwrap_or(UNKNOWN_ASSIGNMENT),
            "courseTitle": catalog.course(&g.course_id).map(|c| c.title.as_str()).unwrap_or(UNKNOWN_COURSE),
            "maxPoints": max_points,
            "percentage": percentage,
        });
        match groups.iter_mut().find(|(id, _)| *id == g.student_id) {
            Some((_, lines)) => lines.push(line),
            None => groups.push((g.student_id.clone(), vec![line])),
        }
    }

    let students: Vec<serde_json::Value> = groups
        .into_iter()
        .map(|(id, grades)| {
            json!({
                "studentId": id,
                "studentName": user_name(&catalog, &id, "Unknown Student"),
                "grades": grades,
            })
        })
        .collect();
    Ok(json!({ "students": students }))
}

fn grades_create(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let submission_id = required_text(params, "submissionId")?;
    let points = required_f64(params, "points")?;
    let feedback = optional_str(params, "feedback")?;

    let catalog = load_catalog(conn)?;
    let submission = catalog
        .submission(&submission_id)
        .ok_or_else(|| HandlerErr::not_found("submission"))?;
    let assignment = catalog
        .assignment(&submission.assignment_id)
        .ok_or_else(|| HandlerErr::not_found("assignment"))?;
    if points < 0.0 || points > assignment.max_points {
        return Err(HandlerErr::bad_params(format!(
            "points must be between 0 and {}",
            assignment.max_points
        ))
        .with_details(json!({ "points": points, "maxPoints": assignment.max_points })));
    }

    // Regrading a submission keeps its grade id.
    let existing_id = catalog
        .grades
        .iter()
        .find(|g| g.submission_id == submission.id)
        .map(|g| g.id.clone());
    let grade = Grade {
        id: existing_id.unwrap_or_else(new_id),
        submission_id: submission.id.clone(),
        assignment_id: assignment.id.clone(),
        student_id: submission.student_id.clone(),
        course_id: assignment.course_id.clone(),
        points,
        feedback,
        graded_at: now_rfc3339(),
    };
    db::upsert_grade(conn, &grade).map_err(HandlerErr::update)?;
    tracing::info!(grade_id = %grade.id, submission_id = %grade.submission_id, "submission graded");
    Ok(json!({ "gradeId": grade.id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.list" => Some(with_conn(state, req, assignments_list)),
        "assignments.open" => Some(with_conn(state, req, assignments_open)),
        "assignments.create" => Some(with_conn(state, req, assignments_create)),
        "submissions.create" => Some(with_conn(state, req, submissions_create)),
        "grades.list" => Some(with_conn(state, req, grades_list)),
        "grades.create" => Some(with_conn(state, req, grades_create)),
        _ => None,
    }
}
