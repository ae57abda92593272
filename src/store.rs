use crate::model::{
    Assignment, AttendanceRecord, AttendanceSession, Course, CourseGradingSchema, Grade, Role,
    StudentGradeEntry, Submission, TranscriptRequest, User,
};
use std::collections::HashMap;

/// Read-only view over every entity the aggregators consume.
///
/// The calc layer only ever sees this trait, so a workspace loaded from
/// SQLite and a hand-built test catalog are interchangeable.
pub trait Store {
    fn users(&self) -> &[User];
    fn courses(&self) -> &[Course];
    fn assignments(&self) -> &[Assignment];
    fn submissions(&self) -> &[Submission];
    fn grades(&self) -> &[Grade];
    fn grading_schemas(&self) -> &[CourseGradingSchema];
    fn grade_entries(&self) -> &[StudentGradeEntry];
    fn attendance_sessions(&self) -> &[AttendanceSession];
    fn attendance_records(&self) -> &[AttendanceRecord];
    fn transcript_requests(&self) -> &[TranscriptRequest];
    fn course_credits(&self, course_id: &str) -> Option<f64>;
    fn course_semester(&self, course_id: &str) -> Option<&str>;

    fn user(&self, id: &str) -> Option<&User> {
        self.users().iter().find(|u| u.id == id)
    }

    fn course(&self, id: &str) -> Option<&Course> {
        self.courses().iter().find(|c| c.id == id)
    }

    fn assignment(&self, id: &str) -> Option<&Assignment> {
        self.assignments().iter().find(|a| a.id == id)
    }

    fn submission(&self, id: &str) -> Option<&Submission> {
        self.submissions().iter().find(|s| s.id == id)
    }

    fn attendance_session(&self, id: &str) -> Option<&AttendanceSession> {
        self.attendance_sessions().iter().find(|s| s.id == id)
    }

    fn transcript_request(&self, id: &str) -> Option<&TranscriptRequest> {
        self.transcript_requests().iter().find(|r| r.id == id)
    }

    fn grading_schema_for(&self, course_id: &str) -> Option<&CourseGradingSchema> {
        self.grading_schemas()
            .iter()
            .find(|s| s.course_id == course_id)
    }

    fn course_sessions(&self, course_id: &str) -> Vec<&AttendanceSession> {
        self.attendance_sessions()
            .iter()
            .filter(|s| s.course_id == course_id)
            .collect()
    }

    /// Enrolled students in enrolment order. Ids that do not resolve to a
    /// student user are skipped.
    fn course_students(&self, course_id: &str) -> Vec<&User> {
        let Some(course) = self.course(course_id) else {
            return Vec::new();
        };
        course
            .student_ids
            .iter()
            .filter_map(|id| self.user(id))
            .filter(|u| u.role == Role::Student)
            .collect()
    }
}

/// In-memory store. Built from fixtures, from a workspace database, or by
/// hand in tests.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub users: Vec<User>,
    pub courses: Vec<Course>,
    pub assignments: Vec<Assignment>,
    pub submissions: Vec<Submission>,
    pub grades: Vec<Grade>,
    pub grading_schemas: Vec<CourseGradingSchema>,
    pub grade_entries: Vec<StudentGradeEntry>,
    pub attendance_sessions: Vec<AttendanceSession>,
    pub attendance_records: Vec<AttendanceRecord>,
    pub transcript_requests: Vec<TranscriptRequest>,
    pub course_credits: HashMap<String, f64>,
    pub course_semesters: HashMap<String, String>,
}

impl Store for Catalog {
    fn users(&self) -> &[User] {
        &self.users
    }

    fn courses(&self) -> &[Course] {
        &self.courses
    }

    fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    fn grades(&self) -> &[Grade] {
        &self.grades
    }

    fn grading_schemas(&self) -> &[CourseGradingSchema] {
        &self.grading_schemas
    }

    fn grade_entries(&self) -> &[StudentGradeEntry] {
        &self.grade_entries
    }

    fn attendance_sessions(&self) -> &[AttendanceSession] {
        &self.attendance_sessions
    }

    fn attendance_records(&self) -> &[AttendanceRecord] {
        &self.attendance_records
    }

    fn transcript_requests(&self) -> &[TranscriptRequest] {
        &self.transcript_requests
    }

    fn course_credits(&self, course_id: &str) -> Option<f64> {
        self.course_credits.get(course_id).copied()
    }

    fn course_semester(&self, course_id: &str) -> Option<&str> {
        self.course_semesters.get(course_id).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::demo_catalog;

    #[test]
    fn course_students_follow_enrolment_order() {
        let catalog = demo_catalog();
        let names: Vec<&str> = catalog
            .course_students("c1")
            .iter()
            .map(|u| u.name.as_str())
            .collect();
        assert_eq!(names, vec!["John Doe", "Jane Smith", "Bob Brown"]);
    }

    #[test]
    fn course_students_skip_unknown_and_non_student_ids() {
        let mut catalog = demo_catalog();
        catalog.courses[1].student_ids = vec!["l1".into(), "ghost".into(), "s3".into()];
        let ids: Vec<&str> = catalog
            .course_students("c2")
            .iter()
            .map(|u| u.id.as_str())
            .collect();
        assert_eq!(ids, vec!["s3"]);
        assert!(catalog.course_students("missing").is_empty());
    }

    #[test]
    fn lookups_resolve_catalog_info() {
        let catalog = demo_catalog();
        assert_eq!(catalog.course_credits("c2"), Some(4.0));
        assert_eq!(catalog.course_semester("c1"), Some("Spring 2025"));
        assert_eq!(catalog.course_credits("c9"), None);
        assert_eq!(
            catalog.grading_schema_for("c2").map(|s| s.id.as_str()),
            Some("gs2")
        );
        assert_eq!(catalog.course_sessions("c1").len(), 2);
    }
}
