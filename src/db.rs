use crate::calc::AttendancePolicy;
use crate::model::{
    Assignment, AttendanceRecord, AttendanceSession, AttendanceStatus, Course,
    CourseGradingSchema, Grade, GradeComponent, GradeComponentType, Role, StudentGradeEntry,
    Submission, TranscriptFormat, TranscriptRequest, TranscriptStatus, User,
};
use crate::store::Catalog;
use anyhow::{anyhow, Context};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

pub const DB_FILE: &str = "lmsd.sqlite3";
pub const SETTINGS_ATTENDANCE: &str = "calc.attendance";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let conn = Connection::open(workspace.join(DB_FILE))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            lecturer_id TEXT NOT NULL,
            credits REAL,
            semester TEXT,
            FOREIGN KEY(lecturer_id) REFERENCES users(id)
        );
        CREATE TABLE IF NOT EXISTS course_students(
            course_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            PRIMARY KEY(course_id, student_id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(student_id) REFERENCES users(id)
        );
        CREATE INDEX IF NOT EXISTS idx_course_students_course ON course_students(course_id, sort_order);

        CREATE TABLE IF NOT EXISTS assignments(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            due_date TEXT NOT NULL,
            max_points REAL NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        );
        CREATE INDEX IF NOT EXISTS idx_assignments_course ON assignments(course_id);

        CREATE TABLE IF NOT EXISTS submissions(
            id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            content TEXT NOT NULL,
            attachment_url TEXT,
            FOREIGN KEY(assignment_id) REFERENCES assignments(id),
            FOREIGN KEY(student_id) REFERENCES users(id)
        );
        CREATE INDEX IF NOT EXISTS idx_submissions_assignment ON submissions(assignment_id);

        CREATE TABLE IF NOT EXISTS grades(
            id TEXT PRIMARY KEY,
            submission_id TEXT NOT NULL,
            assignment_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            points REAL NOT NULL,
            feedback TEXT,
            graded_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_grades_student ON grades(student_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_grades_submission ON grades(submission_id);

        CREATE TABLE IF NOT EXISTS grading_schemas(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        );
        CREATE TABLE IF NOT EXISTS grade_components(
            id TEXT PRIMARY KEY,
            schema_id TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            weight REAL NOT NULL,
            max_points REAL NOT NULL,
            description TEXT,
            FOREIGN KEY(schema_id) REFERENCES grading_schemas(id)
        );
        CREATE INDEX IF NOT EXISTS idx_grade_components_schema ON grade_components(schema_id, sort_order);

        CREATE TABLE IF NOT EXISTS student_grade_entries(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            component_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            points REAL NOT NULL,
            percentage REAL NOT NULL,
            feedback TEXT,
            graded_at TEXT NOT NULL,
            graded_by TEXT NOT NULL,
            UNIQUE(student_id, component_id),
            FOREIGN KEY(student_id) REFERENCES users(id)
        );
        CREATE INDEX IF NOT EXISTS idx_grade_entries_course ON student_grade_entries(course_id);

        CREATE TABLE IF NOT EXISTS attendance_sessions(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            title TEXT NOT NULL,
            date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            description TEXT,
            created_by TEXT NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        );
        CREATE INDEX IF NOT EXISTS idx_attendance_sessions_course ON attendance_sessions(course_id);

        CREATE TABLE IF NOT EXISTS attendance_records(
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            status TEXT NOT NULL,
            timestamp TEXT,
            notes TEXT,
            UNIQUE(session_id, student_id),
            FOREIGN KEY(session_id) REFERENCES attendance_sessions(id),
            FOREIGN KEY(student_id) REFERENCES users(id)
        );
        CREATE INDEX IF NOT EXISTS idx_attendance_records_session ON attendance_records(session_id);

        CREATE TABLE IF NOT EXISTS transcript_requests(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            request_date TEXT NOT NULL,
            status TEXT NOT NULL,
            format TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES users(id)
        );

        CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        );",
    )
    .context("failed to create workspace schema")?;

    Ok(conn)
}

pub fn workspace_is_empty(conn: &Connection) -> anyhow::Result<bool> {
    let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
    let courses: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |r| r.get(0))?;
    Ok(users == 0 && courses == 0)
}

/// Writes a full catalog in one transaction. Intended for fresh workspaces;
/// duplicate ids fail the whole seed.
pub fn seed_catalog(conn: &Connection, catalog: &Catalog) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    for u in &catalog.users {
        insert_user(&tx, u)?;
    }
    for c in &catalog.courses {
        insert_course(&tx, c)?;
        let credits = catalog.course_credits.get(&c.id).copied();
        let semester = catalog.course_semesters.get(&c.id).map(|s| s.as_str());
        if credits.is_some() || semester.is_some() {
            set_course_catalog(&tx, &c.id, credits, semester)?;
        }
    }
    for a in &catalog.assignments {
        insert_assignment(&tx, a)?;
    }
    for s in &catalog.submissions {
        insert_submission(&tx, s)?;
    }
    for g in &catalog.grades {
        upsert_grade(&tx, g)?;
    }
    for s in &catalog.grading_schemas {
        save_grading_schema(&tx, s)?;
    }
    for e in &catalog.grade_entries {
        upsert_grade_entry(&tx, e)?;
    }
    for s in &catalog.attendance_sessions {
        insert_attendance_session(&tx, s)?;
    }
    for r in &catalog.attendance_records {
        upsert_attendance_record(&tx, r)?;
    }
    for t in &catalog.transcript_requests {
        insert_transcript_request(&tx, t)?;
    }
    tx.commit().context("failed to commit seed")?;
    Ok(())
}

pub fn insert_user(conn: &Connection, u: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users(id, name, email, role) VALUES(?, ?, ?, ?)",
        (&u.id, &u.name, &u.email, u.role.as_str()),
    )
    .with_context(|| format!("failed to insert user {}", u.id))?;
    Ok(())
}

pub fn insert_course(conn: &Connection, c: &Course) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO courses(id, title, description, lecturer_id) VALUES(?, ?, ?, ?)",
        (&c.id, &c.title, &c.description, &c.lecturer_id),
    )
    .with_context(|| format!("failed to insert course {}", c.id))?;
    for (i, student_id) in c.student_ids.iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO course_students(course_id, student_id, sort_order) VALUES(?, ?, ?)",
            (&c.id, student_id, i as i64),
        )
        .with_context(|| format!("failed to enrol {} in {}", student_id, c.id))?;
    }
    Ok(())
}

/// Sets credits. A `None` semester keeps the stored one.
pub fn set_course_catalog(
    conn: &Connection,
    course_id: &str,
    credits: Option<f64>,
    semester: Option<&str>,
) -> anyhow::Result<usize> {
    let changed = conn.execute(
        "UPDATE courses SET credits = ?, semester = COALESCE(?, semester) WHERE id = ?",
        (credits, semester, course_id),
    )?;
    Ok(changed)
}

pub fn insert_assignment(conn: &Connection, a: &Assignment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO assignments(id, course_id, title, description, due_date, max_points)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &a.id,
            &a.course_id,
            &a.title,
            &a.description,
            &a.due_date,
            a.max_points,
        ),
    )
    .with_context(|| format!("failed to insert assignment {}", a.id))?;
    Ok(())
}

pub fn insert_submission(conn: &Connection, s: &Submission) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO submissions(id, assignment_id, student_id, submitted_at, content, attachment_url)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &s.id,
            &s.assignment_id,
            &s.student_id,
            &s.submitted_at,
            &s.content,
            &s.attachment_url,
        ),
    )
    .with_context(|| format!("failed to insert submission {}", s.id))?;
    Ok(())
}

/// One grade per submission; regrading replaces points, feedback and time.
pub fn upsert_grade(conn: &Connection, g: &Grade) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO grades(id, submission_id, assignment_id, student_id, course_id, points, feedback, graded_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(submission_id) DO UPDATE SET
           points = excluded.points,
           feedback = excluded.feedback,
           graded_at = excluded.graded_at",
        (
            &g.id,
            &g.submission_id,
            &g.assignment_id,
            &g.student_id,
            &g.course_id,
            g.points,
            &g.feedback,
            &g.graded_at,
        ),
    )
    .with_context(|| format!("failed to save grade {}", g.id))?;
    Ok(())
}

/// Inserts or replaces the course's schema. Components are rewritten in the
/// given order and grade entries for dropped components are deleted.
/// Returns the number of entries removed.
pub fn save_grading_schema(conn: &Connection, s: &CourseGradingSchema) -> anyhow::Result<usize> {
    conn.execute(
        "INSERT INTO grading_schemas(id, course_id, created_at, updated_at)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(course_id) DO UPDATE SET updated_at = excluded.updated_at",
        (&s.id, &s.course_id, &s.created_at, &s.updated_at),
    )
    .with_context(|| format!("failed to save grading schema for {}", s.course_id))?;
    let schema_id: String = conn.query_row(
        "SELECT id FROM grading_schemas WHERE course_id = ?",
        [&s.course_id],
        |r| r.get(0),
    )?;
    conn.execute(
        "DELETE FROM grade_components WHERE schema_id = ?",
        [&schema_id],
    )?;
    for (i, c) in s.components.iter().enumerate() {
        conn.execute(
            "INSERT INTO grade_components(id, schema_id, sort_order, name, kind, weight, max_points, description)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            (
                &c.id,
                &schema_id,
                i as i64,
                &c.name,
                c.kind.as_str(),
                c.weight,
                c.max_points,
                &c.description,
            ),
        )
        .with_context(|| format!("failed to insert grade component {}", c.id))?;
    }
    let removed = conn
        .execute(
            "DELETE FROM student_grade_entries
             WHERE course_id = ?
               AND component_id NOT IN (SELECT id FROM grade_components WHERE schema_id = ?)",
            (&s.course_id, &schema_id),
        )
        .with_context(|| format!("failed to prune grade entries for {}", s.course_id))?;
    Ok(removed)
}

pub fn upsert_grade_entry(conn: &Connection, e: &StudentGradeEntry) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO student_grade_entries(
            id, student_id, component_id, course_id, points, percentage, feedback, graded_at, graded_by
         )
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, component_id) DO UPDATE SET
           points = excluded.points,
           percentage = excluded.percentage,
           feedback = excluded.feedback,
           graded_at = excluded.graded_at,
           graded_by = excluded.graded_by",
        (
            &e.id,
            &e.student_id,
            &e.component_id,
            &e.course_id,
            e.points,
            e.percentage,
            &e.feedback,
            &e.graded_at,
            &e.graded_by,
        ),
    )
    .with_context(|| format!("failed to save grade entry {}", e.id))?;
    Ok(())
}

pub fn insert_attendance_session(conn: &Connection, s: &AttendanceSession) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO attendance_sessions(id, course_id, title, date, start_time, end_time, description, created_by)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &s.id,
            &s.course_id,
            &s.title,
            &s.date,
            &s.start_time,
            &s.end_time,
            &s.description,
            &s.created_by,
        ),
    )
    .with_context(|| format!("failed to insert attendance session {}", s.id))?;
    Ok(())
}

pub fn upsert_attendance_record(conn: &Connection, r: &AttendanceRecord) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO attendance_records(id, session_id, student_id, status, timestamp, notes)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(session_id, student_id) DO UPDATE SET
           status = excluded.status,
           timestamp = excluded.timestamp,
           notes = excluded.notes",
        (
            &r.id,
            &r.session_id,
            &r.student_id,
            r.status.as_str(),
            &r.timestamp,
            &r.notes,
        ),
    )
    .with_context(|| format!("failed to save attendance record {}", r.id))?;
    Ok(())
}

pub fn insert_transcript_request(conn: &Connection, t: &TranscriptRequest) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO transcript_requests(id, student_id, request_date, status, format)
         VALUES(?, ?, ?, ?, ?)",
        (
            &t.id,
            &t.student_id,
            &t.request_date,
            t.status.as_str(),
            t.format.as_str(),
        ),
    )
    .with_context(|| format!("failed to insert transcript request {}", t.id))?;
    Ok(())
}

pub fn complete_transcript_request(conn: &Connection, id: &str) -> anyhow::Result<usize> {
    let changed = conn
        .execute(
            "UPDATE transcript_requests SET status = 'completed' WHERE id = ? AND status = 'pending'",
            [id],
        )
        .with_context(|| format!("failed to complete transcript request {}", id))?;
    Ok(changed)
}

fn parse_column<T>(kind: &str, raw: &str, parse: fn(&str) -> Option<T>) -> anyhow::Result<T> {
    parse(raw).ok_or_else(|| anyhow!("unknown {} value in workspace: {}", kind, raw))
}

/// Reads the whole workspace into memory. Rows come back in insertion order
/// so list views match the order entities were created in.
pub fn load_catalog(conn: &Connection) -> anyhow::Result<Catalog> {
    let mut catalog = Catalog::default();

    let mut stmt = conn.prepare("SELECT id, name, email, role FROM users ORDER BY rowid")?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (id, name, email, role) in rows {
        catalog.users.push(User {
            id,
            name,
            email,
            role: parse_column("role", &role, Role::parse)?,
        });
    }

    let mut enrolments: HashMap<String, Vec<String>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT course_id, student_id FROM course_students ORDER BY course_id, sort_order",
    )?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (course_id, student_id) in rows {
        enrolments.entry(course_id).or_default().push(student_id);
    }

    let mut stmt = conn.prepare(
        "SELECT id, title, description, lecturer_id, credits, semester FROM courses ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, Option<f64>>(4)?,
                r.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (id, title, description, lecturer_id, credits, semester) in rows {
        if let Some(c) = credits {
            catalog.course_credits.insert(id.clone(), c);
        }
        if let Some(s) = semester {
            catalog.course_semesters.insert(id.clone(), s);
        }
        let student_ids = enrolments.remove(&id).unwrap_or_default();
        catalog.courses.push(Course {
            id,
            title,
            description,
            lecturer_id,
            student_ids,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT id, course_id, title, description, due_date, max_points FROM assignments ORDER BY rowid",
    )?;
    catalog.assignments = stmt
        .query_map([], |r| {
            Ok(Assignment {
                id: r.get(0)?,
                course_id: r.get(1)?,
                title: r.get(2)?,
                description: r.get(3)?,
                due_date: r.get(4)?,
                max_points: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, assignment_id, student_id, submitted_at, content, attachment_url
         FROM submissions ORDER BY rowid",
    )?;
    catalog.submissions = stmt
        .query_map([], |r| {
            Ok(Submission {
                id: r.get(0)?,
                assignment_id: r.get(1)?,
                student_id: r.get(2)?,
                submitted_at: r.get(3)?,
                content: r.get(4)?,
                attachment_url: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, submission_id, assignment_id, student_id, course_id, points, feedback, graded_at
         FROM grades ORDER BY rowid",
    )?;
    catalog.grades = stmt
        .query_map([], |r| {
            Ok(Grade {
                id: r.get(0)?,
                submission_id: r.get(1)?,
                assignment_id: r.get(2)?,
                student_id: r.get(3)?,
                course_id: r.get(4)?,
                points: r.get(5)?,
                feedback: r.get(6)?,
                graded_at: r.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut components_by_schema: HashMap<String, Vec<GradeComponent>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT schema_id, id, name, kind, weight, max_points, description
         FROM grade_components ORDER BY schema_id, sort_order",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, f64>(4)?,
                r.get::<_, f64>(5)?,
                r.get::<_, Option<String>>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (schema_id, id, name, kind, weight, max_points, description) in rows {
        components_by_schema
            .entry(schema_id)
            .or_default()
            .push(GradeComponent {
                id,
                name,
                kind: parse_column("component type", &kind, GradeComponentType::parse)?,
                weight,
                max_points,
                description,
            });
    }

    let mut stmt = conn.prepare(
        "SELECT id, course_id, created_at, updated_at FROM grading_schemas ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (id, course_id, created_at, updated_at) in rows {
        let components = components_by_schema.remove(&id).unwrap_or_default();
        catalog.grading_schemas.push(CourseGradingSchema {
            id,
            course_id,
            components,
            created_at,
            updated_at,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT id, student_id, component_id, course_id, points, percentage, feedback, graded_at, graded_by
         FROM student_grade_entries ORDER BY rowid",
    )?;
    catalog.grade_entries = stmt
        .query_map([], |r| {
            Ok(StudentGradeEntry {
                id: r.get(0)?,
                student_id: r.get(1)?,
                component_id: r.get(2)?,
                course_id: r.get(3)?,
                points: r.get(4)?,
                percentage: r.get(5)?,
                feedback: r.get(6)?,
                graded_at: r.get(7)?,
                graded_by: r.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, course_id, title, date, start_time, end_time, description, created_by
         FROM attendance_sessions ORDER BY date, start_time, rowid",
    )?;
    catalog.attendance_sessions = stmt
        .query_map([], |r| {
            Ok(AttendanceSession {
                id: r.get(0)?,
                course_id: r.get(1)?,
                title: r.get(2)?,
                date: r.get(3)?,
                start_time: r.get(4)?,
                end_time: r.get(5)?,
                description: r.get(6)?,
                created_by: r.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, session_id, student_id, status, timestamp, notes
         FROM attendance_records ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, Option<String>>(4)?,
                r.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (id, session_id, student_id, status, timestamp, notes) in rows {
        catalog.attendance_records.push(AttendanceRecord {
            id,
            session_id,
            student_id,
            status: parse_column("attendance status", &status, AttendanceStatus::parse)?,
            timestamp,
            notes,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT id, student_id, request_date, status, format
         FROM transcript_requests ORDER BY request_date DESC, rowid",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (id, student_id, request_date, status, format) in rows {
        catalog.transcript_requests.push(TranscriptRequest {
            id,
            student_id,
            request_date,
            status: parse_column("transcript status", &status, TranscriptStatus::parse)?,
            format: parse_column("transcript format", &format, TranscriptFormat::parse)?,
        });
    }

    Ok(catalog)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("invalid json in setting {}", key))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

/// Missing or malformed settings fall back to the default policy.
pub fn attendance_policy(conn: &Connection) -> AttendancePolicy {
    match settings_get_json(conn, SETTINGS_ATTENDANCE) {
        Ok(Some(v)) => serde_json::from_value(v).unwrap_or_else(|e| {
            tracing::warn!("ignoring malformed {} setting: {}", SETTINGS_ATTENDANCE, e);
            AttendancePolicy::default()
        }),
        Ok(None) => AttendancePolicy::default(),
        Err(e) => {
            tracing::warn!("failed to read {} setting: {:#}", SETTINGS_ATTENDANCE, e);
            AttendancePolicy::default()
        }
    }
}
