//! Demo data seeded into a fresh workspace.

use crate::model::{
    Assignment, AttendanceRecord, AttendanceSession, AttendanceStatus, Course,
    CourseGradingSchema, Grade, GradeComponent, GradeComponentType, Role, StudentGradeEntry,
    Submission, TranscriptFormat, TranscriptRequest, TranscriptStatus, User,
};
use crate::store::Catalog;

fn user(id: &str, name: &str, email: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role,
    }
}

fn assignment(id: &str, course_id: &str, title: &str, description: &str, due: &str) -> Assignment {
    Assignment {
        id: id.to_string(),
        course_id: course_id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        due_date: due.to_string(),
        max_points: 100.0,
    }
}

fn submission(id: &str, assignment_id: &str, student_id: &str, at: &str, content: &str) -> Submission {
    Submission {
        id: id.to_string(),
        assignment_id: assignment_id.to_string(),
        student_id: student_id.to_string(),
        submitted_at: at.to_string(),
        content: content.to_string(),
        attachment_url: Some(format!("/attachments/{}.pdf", id)),
    }
}

fn component(
    id: &str,
    name: &str,
    kind: GradeComponentType,
    weight: f64,
    description: &str,
) -> GradeComponent {
    GradeComponent {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        weight,
        max_points: 100.0,
        description: Some(description.to_string()),
    }
}

fn entry(id: &str, student_id: &str, component_id: &str, points: f64, feedback: &str, at: &str) -> StudentGradeEntry {
    StudentGradeEntry {
        id: id.to_string(),
        student_id: student_id.to_string(),
        component_id: component_id.to_string(),
        course_id: "c1".to_string(),
        points,
        percentage: points,
        feedback: Some(feedback.to_string()),
        graded_at: at.to_string(),
        graded_by: "l1".to_string(),
    }
}

fn session(
    id: &str,
    course_id: &str,
    title: &str,
    date: &str,
    times: (&str, &str),
    description: &str,
    created_by: &str,
) -> AttendanceSession {
    AttendanceSession {
        id: id.to_string(),
        course_id: course_id.to_string(),
        title: title.to_string(),
        date: date.to_string(),
        start_time: times.0.to_string(),
        end_time: times.1.to_string(),
        description: Some(description.to_string()),
        created_by: created_by.to_string(),
    }
}

fn record(
    id: &str,
    session_id: &str,
    student_id: &str,
    status: AttendanceStatus,
    timestamp: Option<&str>,
    notes: Option<&str>,
) -> AttendanceRecord {
    AttendanceRecord {
        id: id.to_string(),
        session_id: session_id.to_string(),
        student_id: student_id.to_string(),
        status,
        timestamp: timestamp.map(|s| s.to_string()),
        notes: notes.map(|s| s.to_string()),
    }
}

pub fn demo_catalog() -> Catalog {
    let users = vec![
        user("l1", "Dr. Smith", "smith@university.edu", Role::Lecturer),
        user("l2", "Prof. Johnson", "johnson@university.edu", Role::Lecturer),
        user("s1", "John Doe", "john@university.edu", Role::Student),
        user("s2", "Jane Smith", "jane@university.edu", Role::Student),
        user("s3", "Bob Brown", "bob@university.edu", Role::Student),
    ];

    let courses = vec![
        Course {
            id: "c1".into(),
            title: "Introduction to Computer Science".into(),
            description: "Basic concepts of computer science and programming".into(),
            lecturer_id: "l1".into(),
            student_ids: vec!["s1".into(), "s2".into(), "s3".into()],
        },
        Course {
            id: "c2".into(),
            title: "Web Development".into(),
            description: "Learn frontend and backend web development".into(),
            lecturer_id: "l2".into(),
            student_ids: vec!["s1".into(), "s2".into()],
        },
    ];

    let assignments = vec![
        assignment(
            "a1",
            "c1",
            "Algorithm Analysis",
            "Analyze the time and space complexity of given algorithms",
            "2025-05-15",
        ),
        assignment(
            "a2",
            "c1",
            "Data Structures Implementation",
            "Implement a linked list and binary search tree",
            "2025-05-25",
        ),
        assignment(
            "a3",
            "c2",
            "Personal Portfolio Website",
            "Build a personal portfolio using HTML, CSS, and JavaScript",
            "2025-05-20",
        ),
    ];

    let submissions = vec![
        submission(
            "sub1",
            "a1",
            "s1",
            "2025-05-12T14:30:00Z",
            "Algorithm analysis submission content here",
        ),
        submission(
            "sub2",
            "a1",
            "s2",
            "2025-05-13T09:15:00Z",
            "My algorithm analysis submission",
        ),
        submission(
            "sub3",
            "a3",
            "s1",
            "2025-05-19T16:45:00Z",
            "Portfolio website submission with GitHub link",
        ),
    ];

    let grades = vec![
        Grade {
            id: "g1".into(),
            submission_id: "sub1".into(),
            assignment_id: "a1".into(),
            student_id: "s1".into(),
            course_id: "c1".into(),
            points: 85.0,
            feedback: Some("Good analysis but missed some edge cases".into()),
            graded_at: "2025-05-16T10:30:00Z".into(),
        },
        Grade {
            id: "g2".into(),
            submission_id: "sub2".into(),
            assignment_id: "a1".into(),
            student_id: "s2".into(),
            course_id: "c1".into(),
            points: 92.0,
            feedback: Some("Excellent work!".into()),
            graded_at: "2025-05-16T11:15:00Z".into(),
        },
    ];

    let grading_schemas = vec![
        CourseGradingSchema {
            id: "gs1".into(),
            course_id: "c1".into(),
            components: vec![
                component("comp1", "Midterm Exam", GradeComponentType::Midterm, 30.0, "Covers first half of the course"),
                component("comp2", "Final Exam", GradeComponentType::Final, 40.0, "Comprehensive exam covering all material"),
                component("comp3", "Programming Assignments", GradeComponentType::Assignment, 20.0, "Average of all programming assignments"),
                component("comp4", "Participation", GradeComponentType::Participation, 10.0, "In-class participation and discussion"),
            ],
            created_at: "2025-01-15T10:00:00Z".into(),
            updated_at: "2025-01-15T10:00:00Z".into(),
        },
        CourseGradingSchema {
            id: "gs2".into(),
            course_id: "c2".into(),
            components: vec![
                component("comp5", "Midterm Project", GradeComponentType::Midterm, 25.0, "Individual project for the first half"),
                component("comp6", "Final Project", GradeComponentType::Final, 35.0, "Comprehensive team project"),
                component("comp7", "Weekly Labs", GradeComponentType::Lab, 25.0, "Average of all weekly lab assignments"),
                component("comp8", "Quizzes", GradeComponentType::Quiz, 15.0, "Average of pop quizzes throughout semester"),
            ],
            created_at: "2025-01-16T10:00:00Z".into(),
            updated_at: "2025-01-16T10:00:00Z".into(),
        },
    ];

    let grade_entries = vec![
        entry(
            "sge1",
            "s1",
            "comp1",
            85.0,
            "Good understanding of concepts, could improve on algorithm analysis",
            "2025-03-15T14:30:00Z",
        ),
        entry(
            "sge2",
            "s1",
            "comp3",
            92.0,
            "Excellent work on programming assignments",
            "2025-03-20T11:15:00Z",
        ),
        entry(
            "sge3",
            "s2",
            "comp1",
            78.0,
            "Good effort, needs to improve on time complexity analysis",
            "2025-03-15T15:00:00Z",
        ),
    ];

    let attendance_sessions = vec![
        session("as1", "c1", "Week 1 Lecture", "2025-01-15", ("09:00", "10:30"), "Introduction to Computer Science Concepts", "l1"),
        session("as2", "c1", "Week 2 Lecture", "2025-01-22", ("09:00", "10:30"), "Algorithms and Data Structures", "l1"),
        session("as3", "c2", "Web Dev Workshop", "2025-01-16", ("13:00", "15:00"), "Frontend Development Introduction", "l2"),
    ];

    use AttendanceStatus::*;
    let attendance_records = vec![
        record("ar1", "as1", "s1", Present, Some("2025-01-15T09:05:00Z"), None),
        record("ar2", "as1", "s2", Present, Some("2025-01-15T08:55:00Z"), None),
        record("ar3", "as1", "s3", Late, Some("2025-01-15T09:20:00Z"), Some("Traffic delay")),
        record("ar4", "as2", "s1", Absent, None, Some("No notification provided")),
        record("ar5", "as2", "s2", Present, Some("2025-01-22T08:50:00Z"), None),
        record("ar6", "as3", "s1", Present, Some("2025-01-16T12:55:00Z"), None),
        record("ar7", "as3", "s2", Excused, None, Some("Medical appointment")),
    ];

    let transcript_requests = vec![
        TranscriptRequest {
            id: "tr1".into(),
            student_id: "s1".into(),
            request_date: "2025-04-15T10:30:00Z".into(),
            status: TranscriptStatus::Completed,
            format: TranscriptFormat::Detailed,
        },
        TranscriptRequest {
            id: "tr2".into(),
            student_id: "s2".into(),
            request_date: "2025-04-20T14:45:00Z".into(),
            status: TranscriptStatus::Pending,
            format: TranscriptFormat::Summary,
        },
    ];

    Catalog {
        users,
        courses,
        assignments,
        submissions,
        grades,
        grading_schemas,
        grade_entries,
        attendance_sessions,
        attendance_records,
        transcript_requests,
        course_credits: [("c1".to_string(), 3.0), ("c2".to_string(), 4.0)]
            .into_iter()
            .collect(),
        course_semesters: [
            ("c1".to_string(), "Spring 2025".to_string()),
            ("c2".to_string(), "Spring 2025".to_string()),
        ]
        .into_iter()
        .collect(),
    }
}
