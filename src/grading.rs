use crate::models::{Assessment, ExamType, Role, Student};

/// Everything the recap and stats views need for one student and exam type.
#[derive(Debug, Clone)]
pub struct StudentAggregate {
    pub student_id: uuid::Uuid,
    pub npm: String,
    pub name: String,
    pub prodi: String,
    pub supervisor1: Option<f64>,
    pub supervisor2: Option<f64>,
    pub examiner1: Option<f64>,
    pub examiner2: Option<f64>,
    pub completion_count: usize,
    pub is_complete: bool,
    pub final_score: f64,
    pub letter: &'static str,
    pub is_pass: bool,
}

impl StudentAggregate {
    pub fn role_total(&self, role: Role) -> Option<f64> {
        match role {
            Role::Supervisor1 => self.supervisor1,
            Role::Supervisor2 => self.supervisor2,
            Role::Examiner1 => self.examiner1,
            Role::Examiner2 => self.examiner2,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.completion_count {
            4 => "complete",
            0 => "none",
            _ => "partial",
        }
    }
}

/// A lecturer who is assigned on the roster but has not submitted a score.
#[derive(Debug, Clone)]
pub struct PendingEvaluator {
    pub evaluator_name: String,
    pub role: Role,
    pub student_name: String,
    pub prodi: String,
}

/// Weighted final score. Missing roles contribute 0; the remaining weights are
/// deliberately not renormalized, so partial scores read low until all four
/// records exist.
pub fn final_score(
    supervisor1: Option<f64>,
    supervisor2: Option<f64>,
    examiner1: Option<f64>,
    examiner2: Option<f64>,
) -> f64 {
    supervisor1.unwrap_or(0.0) * Role::Supervisor1.weight()
        + supervisor2.unwrap_or(0.0) * Role::Supervisor2.weight()
        + examiner1.unwrap_or(0.0) * Role::Examiner1.weight()
        + examiner2.unwrap_or(0.0) * Role::Examiner2.weight()
}

/// Letter buckets are closed at their lower bound; the highest qualifying
/// bucket wins.
pub fn letter_grade(score: f64) -> &'static str {
    if score >= 90.0 {
        "A"
    } else if score >= 85.0 {
        "A-"
    } else if score >= 80.0 {
        "B+"
    } else if score >= 75.0 {
        "B"
    } else if score >= 70.0 {
        "B-"
    } else if score >= 65.0 {
        "C+"
    } else if score >= 60.0 {
        "C"
    } else if score >= 55.0 {
        "C-"
    } else if score >= 50.0 {
        "D"
    } else {
        "E"
    }
}

pub fn is_pass(score: f64) -> bool {
    score >= 55.0
}

/// All ten letters in grade order, for histogram bucketing.
pub const LETTERS: [&str; 10] = ["A", "A-", "B+", "B", "B-", "C+", "C", "C-", "D", "E"];

fn role_total(student: &Student, assessments: &[Assessment], role: Role, exam: ExamType) -> Option<f64> {
    assessments
        .iter()
        .find(|a| a.student_id == student.id && a.role == role && a.exam_type == exam)
        .map(|a| a.total)
}

/// Pure aggregation over whatever data was last fetched; safe to re-run on
/// every change.
pub fn aggregate(student: &Student, assessments: &[Assessment], exam: ExamType) -> StudentAggregate {
    let supervisor1 = role_total(student, assessments, Role::Supervisor1, exam);
    let supervisor2 = role_total(student, assessments, Role::Supervisor2, exam);
    let examiner1 = role_total(student, assessments, Role::Examiner1, exam);
    let examiner2 = role_total(student, assessments, Role::Examiner2, exam);

    let completion_count = [supervisor1, supervisor2, examiner1, examiner2]
        .iter()
        .filter(|t| t.is_some())
        .count();
    let final_score = final_score(supervisor1, supervisor2, examiner1, examiner2);

    StudentAggregate {
        student_id: student.id,
        npm: student.npm.clone(),
        name: student.name.clone(),
        prodi: student.prodi.clone(),
        supervisor1,
        supervisor2,
        examiner1,
        examiner2,
        completion_count,
        is_complete: completion_count == 4,
        final_score,
        letter: letter_grade(final_score),
        is_pass: is_pass(final_score),
    }
}

pub fn aggregate_all(
    students: &[Student],
    assessments: &[Assessment],
    exam: ExamType,
) -> Vec<StudentAggregate> {
    students
        .iter()
        .map(|s| aggregate(s, assessments, exam))
        .collect()
}

/// Cross-join of students x roles, filtered down to assigned-but-unsubmitted
/// evaluators. Placeholder assignments ("" or "-") are not owed anything.
pub fn pending_evaluators(
    students: &[Student],
    assessments: &[Assessment],
    exam: ExamType,
) -> Vec<PendingEvaluator> {
    let mut pending = Vec::new();

    for student in students {
        for role in Role::ALL {
            let assigned = student.evaluator_for(role).trim();
            if assigned.is_empty() || assigned == "-" {
                continue;
            }
            let submitted = assessments
                .iter()
                .any(|a| a.student_id == student.id && a.role == role && a.exam_type == exam);
            if !submitted {
                pending.push(PendingEvaluator {
                    evaluator_name: assigned.to_string(),
                    role,
                    student_name: student.name.clone(),
                    prodi: student.prodi.clone(),
                });
            }
        }
    }

    pending
}
