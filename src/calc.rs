use crate::model::{AttendanceStatus, CourseGradingSchema, Grade, Role, StudentGradeEntry, User};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const UNKNOWN_COURSE: &str = "Unknown Course";
pub const UNKNOWN_ASSIGNMENT: &str = "Unknown Assignment";
pub const UNKNOWN_SEMESTER: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradePoint {
    pub grade: &'static str,
    pub points: f64,
    pub description: &'static str,
}

/// Inclusive lower bounds, highest first.
const GRADE_SCALE: [(f64, &str, f64, &str); 12] = [
    (97.0, "A+", 4.0, "Exceptional"),
    (93.0, "A", 4.0, "Excellent"),
    (90.0, "A-", 3.7, "Outstanding"),
    (87.0, "B+", 3.3, "Very Good"),
    (83.0, "B", 3.0, "Good"),
    (80.0, "B-", 2.7, "Above Average"),
    (77.0, "C+", 2.3, "Average"),
    (73.0, "C", 2.0, "Satisfactory"),
    (70.0, "C-", 1.7, "Below Average"),
    (67.0, "D+", 1.3, "Poor"),
    (63.0, "D", 1.0, "Very Poor"),
    (60.0, "D-", 0.7, "Barely Passing"),
];

const FAILING: GradePoint = GradePoint {
    grade: "F",
    points: 0.0,
    description: "Failing",
};

/// Maps a percentage onto the letter scale. Not clamped: anything at or
/// above 97 is A+, anything below 60 (including NaN) is F.
pub fn grade_point(percentage: f64) -> GradePoint {
    GRADE_SCALE
        .iter()
        .find(|(min, ..)| percentage >= *min)
        .map(|&(_, grade, points, description)| GradePoint {
            grade,
            points,
            description,
        })
        .unwrap_or(FAILING)
}

/// Weighted mean of the graded components only. Ungraded components drop out
/// of both sums, so a partly graded schema is normalised over what has been
/// graded so far. Weights are not required to sum to 100 here.
pub fn weighted_grade<'a, I>(entries: I, schema: &CourseGradingSchema) -> f64
where
    I: IntoIterator<Item = &'a StudentGradeEntry>,
{
    let mut weighted_sum = 0.0_f64;
    let mut applied_weight = 0.0_f64;
    for entry in entries {
        let Some(component) = schema.component(&entry.component_id) else {
            continue;
        };
        weighted_sum += entry.percentage * component.weight;
        applied_weight += component.weight;
    }
    if applied_weight > 0.0 {
        weighted_sum / applied_weight
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalGrade {
    pub percentage: f64,
    pub letter_grade: String,
    pub points: f64,
}

impl FinalGrade {
    fn not_available() -> Self {
        Self {
            percentage: 0.0,
            letter_grade: NOT_AVAILABLE.to_string(),
            points: 0.0,
        }
    }
}

pub fn final_grade<'a, I>(entries: I, schema: Option<&CourseGradingSchema>) -> FinalGrade
where
    I: IntoIterator<Item = &'a StudentGradeEntry>,
{
    let Some(schema) = schema else {
        return FinalGrade::not_available();
    };
    let entries: Vec<&StudentGradeEntry> = entries
        .into_iter()
        .filter(|e| schema.component(&e.component_id).is_some())
        .collect();
    if entries.is_empty() {
        return FinalGrade::not_available();
    }
    let percentage = weighted_grade(entries, schema);
    let gp = grade_point(percentage);
    FinalGrade {
        percentage,
        letter_grade: gp.grade.to_string(),
        points: gp.points,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBookRow {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub entries: Vec<StudentGradeEntry>,
    #[serde(rename = "final")]
    pub final_grade: FinalGrade,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBook {
    pub course_id: String,
    pub course_title: String,
    pub schema: Option<CourseGradingSchema>,
    pub rows: Vec<GradeBookRow>,
}

/// Component entries and the running final grade for every enrolled student.
pub fn course_grade_book<S: Store + ?Sized>(store: &S, course_id: &str) -> Option<GradeBook> {
    let course = store.course(course_id)?;
    let schema = store.grading_schema_for(course_id);
    let rows = store
        .course_students(course_id)
        .into_iter()
        .map(|student| {
            let entries: Vec<&StudentGradeEntry> = store
                .grade_entries()
                .iter()
                .filter(|e| e.course_id == course_id && e.student_id == student.id)
                .filter(|e| schema.map(|s| s.component(&e.component_id).is_some()).unwrap_or(true))
                .collect();
            GradeBookRow {
                student_id: student.id.clone(),
                name: student.name.clone(),
                email: student.email.clone(),
                final_grade: final_grade(entries.iter().copied(), schema),
                entries: entries.into_iter().cloned().collect(),
            }
        })
        .collect();
    Some(GradeBook {
        course_id: course.id.clone(),
        course_title: course.title.clone(),
        schema: schema.cloned(),
        rows,
    })
}

/// Percentage of the course's sessions the student attended (present or
/// late). Sessions without a record count against the student; a course with
/// no sessions yields 0.
pub fn student_attendance_rate<S: Store + ?Sized>(
    store: &S,
    course_id: &str,
    student_id: &str,
) -> f64 {
    let sessions = store.course_sessions(course_id);
    if sessions.is_empty() {
        return 0.0;
    }
    let attended = sessions
        .iter()
        .filter(|session| {
            store.attendance_records().iter().any(|r| {
                r.session_id == session.id && r.student_id == student_id && r.status.is_attended()
            })
        })
        .count();
    100.0 * attended as f64 / sessions.len() as f64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePolicy {
    /// Fold (session, student) pairs with no record into the absent count.
    #[serde(default)]
    pub count_missing_as_absent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total_sessions: usize,
    pub total_students: usize,
    pub expected_attendances: usize,
    pub present_count: usize,
    pub late_count: usize,
    pub absent_count: usize,
    pub excused_count: usize,
    pub missing_count: usize,
    pub attendance_rate: f64,
    pub present_rate: f64,
    pub late_rate: f64,
    pub absent_rate: f64,
    pub excused_rate: f64,
}

/// Status breakdown over `sessions × enrolled students` expected attendances.
///
/// With the default policy a missing record is in none of the four counts,
/// so every rate is lowered together.
pub fn course_attendance_stats<S: Store + ?Sized>(
    store: &S,
    course_id: &str,
    policy: AttendancePolicy,
) -> AttendanceStats {
    let session_ids: HashSet<&str> = store
        .course_sessions(course_id)
        .into_iter()
        .map(|s| s.id.as_str())
        .collect();
    let total_sessions = session_ids.len();
    let total_students = store.course(course_id).map(|c| c.student_ids.len()).unwrap_or(0);
    let expected = total_sessions * total_students;

    let mut present = 0_usize;
    let mut late = 0_usize;
    let mut absent = 0_usize;
    let mut excused = 0_usize;
    for r in store
        .attendance_records()
        .iter()
        .filter(|r| session_ids.contains(r.session_id.as_str()))
    {
        match r.status {
            AttendanceStatus::Present => present += 1,
            AttendanceStatus::Late => late += 1,
            AttendanceStatus::Absent => absent += 1,
            AttendanceStatus::Excused => excused += 1,
        }
    }
    let recorded = present + late + absent + excused;
    let missing = expected.saturating_sub(recorded);
    if policy.count_missing_as_absent {
        absent += missing;
    }

    let rate = |count: usize| {
        if expected > 0 {
            100.0 * count as f64 / expected as f64
        } else {
            0.0
        }
    };

    AttendanceStats {
        total_sessions,
        total_students,
        expected_attendances: expected,
        present_count: present,
        late_count: late,
        absent_count: absent,
        excused_count: excused,
        missing_count: missing,
        attendance_rate: rate(present + late),
        present_rate: rate(present),
        late_rate: rate(late),
        absent_rate: rate(absent),
        excused_rate: rate(excused),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeLine {
    pub grade_id: String,
    pub assignment_id: String,
    pub assignment_title: String,
    pub points: f64,
    pub max_points: f64,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub graded_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResult {
    pub course_id: String,
    pub course_title: String,
    pub credits: f64,
    pub semester: String,
    pub total_points: f64,
    pub max_points: f64,
    pub percentage: f64,
    pub letter_grade: String,
    pub grade_points: f64,
    pub description: String,
    pub grades: Vec<GradeLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterResult {
    pub semester: String,
    pub credits: f64,
    pub gpa: f64,
    pub courses: Vec<CourseResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub student_id: String,
    pub student_name: String,
    pub student_email: String,
    pub semesters: Vec<SemesterResult>,
    pub total_credits: f64,
    pub overall_gpa: f64,
}

impl Transcript {
    pub fn courses(&self) -> impl Iterator<Item = &CourseResult> {
        self.semesters.iter().flat_map(|s| s.courses.iter())
    }

    /// Drops per-assignment grade lines, keeping the course and GPA roll-up.
    pub fn into_summary(mut self) -> Self {
        for semester in &mut self.semesters {
            for course in &mut semester.courses {
                course.grades.clear();
            }
        }
        self
    }
}

fn credit_weighted_gpa<'a, I>(courses: I) -> (f64, f64)
where
    I: IntoIterator<Item = &'a CourseResult>,
{
    let mut credits = 0.0_f64;
    let mut weighted = 0.0_f64;
    for c in courses {
        credits += c.credits;
        weighted += c.grade_points * c.credits;
    }
    let gpa = if credits > 0.0 { weighted / credits } else { 0.0 };
    (credits, gpa)
}

fn course_result<S: Store + ?Sized>(store: &S, course_id: &str, grades: &[&Grade]) -> CourseResult {
    let mut total_points = 0.0_f64;
    let mut max_points = 0.0_f64;
    let mut lines = Vec::with_capacity(grades.len());
    for g in grades {
        let assignment = store.assignment(&g.assignment_id);
        if let Some(a) = assignment {
            total_points += g.points;
            max_points += a.max_points;
        }
        let line_max = assignment.map(|a| a.max_points).unwrap_or(0.0);
        lines.push(GradeLine {
            grade_id: g.id.clone(),
            assignment_id: g.assignment_id.clone(),
            assignment_title: assignment
                .map(|a| a.title.clone())
                .unwrap_or_else(|| UNKNOWN_ASSIGNMENT.to_string()),
            points: g.points,
            max_points: line_max,
            percentage: if line_max > 0.0 {
                100.0 * g.points / line_max
            } else {
                0.0
            },
            feedback: g.feedback.clone(),
            graded_at: g.graded_at.clone(),
        });
    }

    let percentage = if max_points > 0.0 {
        100.0 * total_points / max_points
    } else {
        0.0
    };
    let gp = grade_point(percentage);
    CourseResult {
        course_id: course_id.to_string(),
        course_title: store
            .course(course_id)
            .map(|c| c.title.clone())
            .unwrap_or_else(|| UNKNOWN_COURSE.to_string()),
        credits: store.course_credits(course_id).unwrap_or(0.0),
        semester: store
            .course_semester(course_id)
            .unwrap_or(UNKNOWN_SEMESTER)
            .to_string(),
        total_points,
        max_points,
        percentage,
        letter_grade: gp.grade.to_string(),
        grade_points: gp.points,
        description: gp.description.to_string(),
        grades: lines,
    }
}

/// Rolls a student's assignment grades up into per-course results, grouped by
/// semester, with credit-weighted semester and overall GPA.
///
/// Returns `None` only when `student_id` does not name a student. Courses
/// and semesters keep the order in which the student's grades first mention
/// them.
pub fn compose_transcript<S: Store + ?Sized>(
    store: &S,
    student_id: &str,
    course_filter: Option<&str>,
) -> Option<Transcript> {
    let student: &User = store
        .user(student_id)
        .filter(|u| u.role == Role::Student)?;

    let mut by_course: Vec<(String, Vec<&Grade>)> = Vec::new();
    for g in store.grades().iter().filter(|g| g.student_id == student_id) {
        if course_filter.map(|c| c != g.course_id).unwrap_or(false) {
            continue;
        }
        match by_course.iter_mut().find(|(id, _)| *id == g.course_id) {
            Some((_, list)) => list.push(g),
            None => by_course.push((g.course_id.clone(), vec![g])),
        }
    }

    let mut semesters: Vec<SemesterResult> = Vec::new();
    for (course_id, grades) in &by_course {
        let result = course_result(store, course_id, grades);
        match semesters.iter_mut().find(|s| s.semester == result.semester) {
            Some(s) => s.courses.push(result),
            None => semesters.push(SemesterResult {
                semester: result.semester.clone(),
                credits: 0.0,
                gpa: 0.0,
                courses: vec![result],
            }),
        }
    }
    for s in &mut semesters {
        let (credits, gpa) = credit_weighted_gpa(&s.courses);
        s.credits = credits;
        s.gpa = gpa;
    }
    let (total_credits, overall_gpa) =
        credit_weighted_gpa(semesters.iter().flat_map(|s| s.courses.iter()));

    Some(Transcript {
        student_id: student.id.clone(),
        student_name: student.name.clone(),
        student_email: student.email.clone(),
        semesters,
        total_credits,
        overall_gpa,
    })
}
