mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{approx, f64_at, request_err_code, request_ok, spawn_sidecar, str_at, temp_dir};

fn graded_course(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    tag: &str,
    lecturer_id: &str,
    student_id: &str,
    points: f64,
) -> String {
    let course = request_ok(
        stdin,
        reader,
        &format!("{}-course", tag),
        "courses.create",
        json!({ "title": format!("Course {}", tag), "lecturerId": lecturer_id, "studentIds": [student_id] }),
    );
    let course_id = str_at(&course, "/courseId").to_string();
    let assignment = request_ok(
        stdin,
        reader,
        &format!("{}-assignment", tag),
        "assignments.create",
        json!({
            "courseId": course_id,
            "title": format!("Essay {}", tag),
            "dueDate": "2025-03-01",
            "maxPoints": 100,
        }),
    );
    let submission = request_ok(
        stdin,
        reader,
        &format!("{}-submission", tag),
        "submissions.create",
        json!({
            "assignmentId": str_at(&assignment, "/assignmentId"),
            "studentId": student_id,
            "content": "done",
        }),
    );
    let _ = request_ok(
        stdin,
        reader,
        &format!("{}-grade", tag),
        "grades.create",
        json!({ "submissionId": str_at(&submission, "/submissionId"), "points": points }),
    );
    course_id
}

#[test]
fn transcript_gpa_is_credit_weighted_per_semester_and_overall() {
    let workspace = temp_dir("lmsd-transcript-gpa");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy(), "seedDemo": false }),
    );
    let lecturer = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "users.create",
        json!({ "name": "Hopper", "email": "hopper@example.edu", "role": "lecturer" }),
    );
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "users.create",
        json!({ "name": "Lovelace", "email": "lovelace@example.edu", "role": "student" }),
    );
    let lecturer_id = str_at(&lecturer, "/userId").to_string();
    let student_id = str_at(&student, "/userId").to_string();

    let course_a = graded_course(&mut stdin, &mut reader, "a", &lecturer_id, &student_id, 90.0);
    let course_b = graded_course(&mut stdin, &mut reader, "b", &lecturer_id, &student_id, 75.0);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "courses.setCatalog",
        json!({ "courseId": course_a, "credits": 3, "semester": "Fall 2024" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "courses.setCatalog",
        json!({ "courseId": course_b, "credits": 4, "semester": "Spring 2025" }),
    );

    let transcript = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.transcript",
        json!({ "studentId": student_id }),
    );
    approx(f64_at(&transcript, "/totalCredits"), 7.0);
    approx(f64_at(&transcript, "/overallGpa"), (3.7 * 3.0 + 2.0 * 4.0) / 7.0);
    assert_eq!(str_at(&transcript, "/semesters/0/semester"), "Fall 2024");
    approx(f64_at(&transcript, "/semesters/0/gpa"), 3.7);
    assert_eq!(str_at(&transcript, "/semesters/0/courses/0/letterGrade"), "A-");
    assert_eq!(str_at(&transcript, "/semesters/1/semester"), "Spring 2025");
    approx(f64_at(&transcript, "/semesters/1/gpa"), 2.0);
    assert_eq!(str_at(&transcript, "/semesters/1/courses/0/letterGrade"), "C");
    assert_eq!(
        str_at(&transcript, "/semesters/1/courses/0/grades/0/assignmentTitle"),
        "Essay b"
    );

    let filtered = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "students.transcript",
        json!({ "studentId": student_id, "courseId": course_b }),
    );
    approx(f64_at(&filtered, "/overallGpa"), 2.0);
    assert_eq!(
        filtered.get("semesters").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    // A course with no catalog entry lands in "Unknown" with no credits.
    let _ = graded_course(&mut stdin, &mut reader, "c", &lecturer_id, &student_id, 100.0);
    let transcript = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "students.transcript",
        json!({ "studentId": student_id }),
    );
    assert_eq!(str_at(&transcript, "/semesters/2/semester"), "Unknown");
    approx(f64_at(&transcript, "/semesters/2/credits"), 0.0);
    approx(f64_at(&transcript, "/overallGpa"), (3.7 * 3.0 + 2.0 * 4.0) / 7.0);

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "9",
        "students.transcript",
        json!({ "studentId": lecturer_id }),
    );
    assert_eq!(code, "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn transcript_requests_complete_on_open() {
    let workspace = temp_dir("lmsd-transcript-requests");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let listed = request_ok(&mut stdin, &mut reader, "2", "transcripts.list", json!({}));
    let requests = listed.get("requests").and_then(|v| v.as_array()).expect("requests");
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .any(|r| r.get("studentName").and_then(|v| v.as_str()) == Some("Jane Smith")));

    let detailed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "transcripts.open",
        json!({ "requestId": "tr1" }),
    );
    assert_eq!(str_at(&detailed, "/request/status"), "completed");
    assert_eq!(str_at(&detailed, "/transcript/studentName"), "John Doe");
    assert_eq!(str_at(&detailed, "/transcript/semesters/0/semester"), "Spring 2025");
    assert_eq!(str_at(&detailed, "/transcript/semesters/0/courses/0/letterGrade"), "B");
    approx(f64_at(&detailed, "/transcript/overallGpa"), 3.0);
    approx(f64_at(&detailed, "/transcript/totalCredits"), 3.0);
    assert_eq!(
        detailed
            .pointer("/transcript/semesters/0/courses/0/grades")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    let requested = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "transcripts.request",
        json!({ "studentId": "s2", "format": "summary" }),
    );
    let request_id = str_at(&requested, "/requestId").to_string();
    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "transcripts.open",
        json!({ "requestId": request_id }),
    );
    assert_eq!(str_at(&summary, "/request/status"), "completed");
    assert_eq!(str_at(&summary, "/request/format"), "summary");
    assert!(summary
        .pointer("/transcript/semesters/0/courses/0/grades")
        .and_then(|v| v.as_array())
        .map(|a| a.is_empty())
        .unwrap_or(false));
    approx(f64_at(&summary, "/transcript/overallGpa"), 3.7);

    let listed = request_ok(&mut stdin, &mut reader, "6", "transcripts.list", json!({}));
    let statuses: Vec<&str> = listed
        .get("requests")
        .and_then(|v| v.as_array())
        .expect("requests")
        .iter()
        .filter_map(|r| r.pointer("/request/status").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses.iter().filter(|s| **s == "pending").count(), 1);

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "7",
        "transcripts.request",
        json!({ "studentId": "l1", "format": "detailed" }),
    );
    assert_eq!(code, "not_found");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "8",
        "transcripts.request",
        json!({ "studentId": "s1", "format": "pdf" }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
