mod test_support;

use serde_json::json;
use test_support::{approx, f64_at, request_err_code, request_ok, spawn_sidecar, str_at, temp_dir};

#[test]
fn course_stats_follow_missing_record_policy() {
    let workspace = temp_dir("lmsd-attendance-policy");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.courseOpen",
        json!({ "courseId": "c1" }),
    );
    let stats = opened.get("stats").cloned().expect("stats");
    assert_eq!(stats.get("expectedAttendances").and_then(|v| v.as_u64()), Some(6));
    assert_eq!(stats.get("presentCount").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(stats.get("lateCount").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(stats.get("absentCount").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(stats.get("missingCount").and_then(|v| v.as_u64()), Some(1));
    approx(f64_at(&stats, "/attendanceRate"), 400.0 / 6.0);
    approx(f64_at(&stats, "/presentRate"), 50.0);
    approx(f64_at(&stats, "/absentRate"), 100.0 / 6.0);
    assert_eq!(
        opened.pointer("/policy/countMissingAsAbsent").and_then(|v| v.as_bool()),
        Some(false)
    );

    assert_eq!(str_at(&opened, "/students/0/studentId"), "s1");
    approx(f64_at(&opened, "/students/0/attendanceRate"), 50.0);
    approx(f64_at(&opened, "/students/1/attendanceRate"), 100.0);
    approx(f64_at(&opened, "/students/2/attendanceRate"), 50.0);

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "settings.update",
        json!({ "attendance": { "countMissingAsAbsent": true } }),
    );
    assert_eq!(
        updated.pointer("/attendance/countMissingAsAbsent").and_then(|v| v.as_bool()),
        Some(true)
    );

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.courseOpen",
        json!({ "courseId": "c1" }),
    );
    assert_eq!(
        opened.pointer("/stats/absentCount").and_then(|v| v.as_u64()),
        Some(2)
    );
    approx(f64_at(&opened, "/stats/absentRate"), 200.0 / 6.0);
    approx(f64_at(&opened, "/stats/attendanceRate"), 400.0 / 6.0);

    let settings = request_ok(&mut stdin, &mut reader, "5", "settings.get", json!({}));
    assert_eq!(
        settings.pointer("/attendance/countMissingAsAbsent").and_then(|v| v.as_bool()),
        Some(true)
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn sessions_are_created_and_records_upserted() {
    let workspace = temp_dir("lmsd-attendance-record");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.sessionCreate",
        json!({
            "courseId": "c2",
            "title": "Backwards",
            "date": "2025-02-01",
            "startTime": "15:00",
            "endTime": "13:00",
        }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.sessionCreate",
        json!({
            "courseId": "c2",
            "title": "Bad date",
            "date": "02/01/2025",
            "startTime": "13:00",
            "endTime": "15:00",
        }),
    );
    assert_eq!(code, "bad_params");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.sessionCreate",
        json!({
            "courseId": "c2",
            "title": "Week 2 Workshop",
            "date": "2025-01-23",
            "startTime": "13:00",
            "endTime": "15:00",
        }),
    );
    let session_id = str_at(&created, "/sessionId").to_string();

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.sessionOpen",
        json!({ "sessionId": session_id }),
    );
    assert_eq!(str_at(&opened, "/session/createdBy"), "l2");
    let rows = opened.get("students").and_then(|v| v.as_array()).expect("students");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.get("record").map(|v| v.is_null()).unwrap_or(false)));

    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.record",
        json!({
            "sessionId": session_id,
            "records": [
                { "studentId": "s1", "status": "late", "notes": "bus" },
                { "studentId": "s2", "status": "absent" },
            ],
        }),
    );
    assert_eq!(saved.get("saved").and_then(|v| v.as_u64()), Some(2));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "attendance.record",
        json!({
            "sessionId": session_id,
            "records": [{ "studentId": "s2", "status": "excused" }],
        }),
    );

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "attendance.sessionOpen",
        json!({ "sessionId": session_id }),
    );
    assert_eq!(str_at(&opened, "/students/0/record/status"), "late");
    assert!(opened.pointer("/students/0/record/timestamp").is_some());
    assert_eq!(str_at(&opened, "/students/1/record/status"), "excused");
    assert!(opened.pointer("/students/1/record/timestamp").is_none());

    let course = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "attendance.courseOpen",
        json!({ "courseId": "c2" }),
    );
    assert_eq!(
        course.pointer("/stats/totalSessions").and_then(|v| v.as_u64()),
        Some(2)
    );
    assert_eq!(
        course.pointer("/stats/excusedCount").and_then(|v| v.as_u64()),
        Some(2)
    );
    approx(f64_at(&course, "/students/0/attendanceRate"), 100.0);
    approx(f64_at(&course, "/students/1/attendanceRate"), 0.0);

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "10",
        "attendance.record",
        json!({
            "sessionId": session_id,
            "records": [{ "studentId": "s3", "status": "present" }],
        }),
    );
    assert_eq!(code, "not_enrolled");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "11",
        "attendance.record",
        json!({
            "sessionId": session_id,
            "records": [{ "studentId": "s1", "status": "asleep" }],
        }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn record_batch_rejects_a_student_listed_twice() {
    let workspace = temp_dir("lmsd-attendance-duplicate");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.record",
        json!({
            "sessionId": "as2",
            "records": [
                { "studentId": "s3", "status": "present" },
                { "studentId": "s3", "status": "absent" },
            ],
        }),
    );
    assert_eq!(code, "bad_params");

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.sessionOpen",
        json!({ "sessionId": "as2" }),
    );
    assert!(opened
        .pointer("/students/2/record")
        .map(|v| v.is_null())
        .unwrap_or(false));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
