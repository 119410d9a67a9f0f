use std::collections::HashMap;

use crate::grading::{self, StudentAggregate};
use crate::models::{Assessment, ExamType, Role, Student};

#[derive(Debug, Clone)]
pub struct GradeBucket {
    pub letter: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct RoleAverage {
    pub role: Role,
    pub average: f64,
    pub record_count: usize,
}

#[derive(Debug, Clone)]
pub struct RecapStats {
    pub student_count: usize,
    pub complete_count: usize,
    /// Percent of complete students that pass; 0 when no one is complete.
    pub pass_rate: f64,
    /// Letter counts over complete students only, in grade order A..E.
    pub grade_histogram: Vec<GradeBucket>,
    pub role_averages: Vec<RoleAverage>,
    /// Students with fewer than four records, grouped by program.
    pub incomplete_by_prodi: Vec<(String, usize)>,
    pub pending_count: usize,
}

pub fn summarize(students: &[Student], assessments: &[Assessment], exam: ExamType) -> RecapStats {
    let aggregates = grading::aggregate_all(students, assessments, exam);
    let complete: Vec<&StudentAggregate> = aggregates.iter().filter(|a| a.is_complete).collect();

    let pass_count = complete.iter().filter(|a| a.is_pass).count();
    let pass_rate = if complete.is_empty() {
        0.0
    } else {
        pass_count as f64 / complete.len() as f64 * 100.0
    };

    let grade_histogram = grading::LETTERS
        .into_iter()
        .map(|letter| GradeBucket {
            letter,
            count: complete.iter().filter(|a| a.letter == letter).count(),
        })
        .collect();

    let role_averages = Role::ALL
        .iter()
        .map(|role| {
            let totals: Vec<f64> = aggregates.iter().filter_map(|a| a.role_total(*role)).collect();
            let average = if totals.is_empty() {
                0.0
            } else {
                totals.iter().sum::<f64>() / totals.len() as f64
            };
            RoleAverage {
                role: *role,
                average,
                record_count: totals.len(),
            }
        })
        .collect();

    let mut by_prodi: HashMap<String, usize> = HashMap::new();
    for aggregate in &aggregates {
        if !aggregate.is_complete {
            *by_prodi.entry(aggregate.prodi.clone()).or_insert(0) += 1;
        }
    }
    let mut incomplete_by_prodi: Vec<(String, usize)> = by_prodi.into_iter().collect();
    incomplete_by_prodi.sort_by(|a, b| a.0.cmp(&b.0));

    let pending_count = grading::pending_evaluators(students, assessments, exam).len();

    RecapStats {
        student_count: students.len(),
        complete_count: complete.len(),
        pass_rate,
        grade_histogram,
        role_averages,
        incomplete_by_prodi,
        pending_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExaminerScores, ScoreSheet, SupervisorScores};
    use uuid::Uuid;

    fn student(npm: &str, name: &str, prodi: &str) -> Student {
        Student {
            id: Uuid::new_v4(),
            npm: npm.to_string(),
            name: name.to_string(),
            prodi: prodi.to_string(),
            title: "-".to_string(),
            supervisor1: "Dosen P1".to_string(),
            supervisor2: "Dosen P2".to_string(),
            examiner1: "Dosen U1".to_string(),
            examiner2: "Dosen U2".to_string(),
        }
    }

    fn full_set(s: &Student, exam: ExamType, supervisor_items: u8, examiner_mark: f64) -> Vec<Assessment> {
        let supervisor = SupervisorScores::new([supervisor_items; 20]).unwrap();
        let examiner = ExaminerScores::new(examiner_mark, examiner_mark, examiner_mark, examiner_mark);
        vec![
            Assessment::new(
                s.id,
                Role::Supervisor1,
                exam,
                ScoreSheet::Supervisor(supervisor.clone()),
                None,
            )
            .unwrap(),
            Assessment::new(
                s.id,
                Role::Supervisor2,
                exam,
                ScoreSheet::Supervisor(supervisor),
                None,
            )
            .unwrap(),
            Assessment::new(
                s.id,
                Role::Examiner1,
                exam,
                ScoreSheet::Examiner(examiner.clone()),
                None,
            )
            .unwrap(),
            Assessment::new(
                s.id,
                Role::Examiner2,
                exam,
                ScoreSheet::Examiner(examiner),
                None,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn counts_complete_students_and_pass_rate() {
        let exam = ExamType::ThesisDefense;
        let a = student("K3-2025-001", "Arif Sofyan", "K3");
        let b = student("K3-2025-002", "Budi Rasuanto", "K3");
        let c = student("241013251042", "Lamtiur Sinaga", "Kesling");

        // a: all fives and 90s -> pass; b: all ones and 20s -> fail; c: untouched
        let mut assessments = full_set(&a, exam, 5, 90.0);
        assessments.extend(full_set(&b, exam, 1, 20.0));

        let stats = summarize(&[a, b, c], &assessments, exam);
        assert_eq!(stats.student_count, 3);
        assert_eq!(stats.complete_count, 2);
        assert!((stats.pass_rate - 50.0).abs() < 1e-9);
        assert_eq!(stats.incomplete_by_prodi, vec![("Kesling".to_string(), 1)]);
        // c still owes all four roles
        assert_eq!(stats.pending_count, 4);
    }

    #[test]
    fn histogram_spans_fixed_letter_set_in_order() {
        let exam = ExamType::ProposalSeminar;
        let a = student("201013251003", "Azil Ghaffari", "Kesling");
        let assessments = full_set(&a, exam, 5, 90.0);

        let stats = summarize(&[a], &assessments, exam);
        let letters: Vec<&str> = stats.grade_histogram.iter().map(|b| b.letter).collect();
        assert_eq!(
            letters,
            vec!["A", "A-", "B+", "B", "B-", "C+", "C", "C-", "D", "E"]
        );
        let total: usize = stats.grade_histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 1);
        // all fives + 90s across the board -> weighted final lands in the A bucket
        assert_eq!(stats.grade_histogram[0].count, 1);
    }

    #[test]
    fn role_averages_only_cover_existing_records() {
        let exam = ExamType::ThesisDefense;
        let a = student("211013251002", "Za'im Altof", "Kesling");
        let sheet = ScoreSheet::Supervisor(SupervisorScores::new([4; 20]).unwrap());
        let assessments =
            vec![Assessment::new(a.id, Role::Supervisor1, exam, sheet, None).unwrap()];

        let stats = summarize(&[a], &assessments, exam);
        let s1 = &stats.role_averages[0];
        assert_eq!(s1.role, Role::Supervisor1);
        assert_eq!(s1.record_count, 1);
        assert!((s1.average - 80.0).abs() < 1e-9);
        // roles with no records average 0
        assert_eq!(stats.role_averages[1].record_count, 0);
        assert_eq!(stats.role_averages[1].average, 0.0);
    }

    #[test]
    fn empty_roster_yields_zeroed_stats() {
        let stats = summarize(&[], &[], ExamType::ThesisDefense);
        assert_eq!(stats.student_count, 0);
        assert_eq!(stats.complete_count, 0);
        assert_eq!(stats.pass_rate, 0.0);
        assert_eq!(stats.pending_count, 0);
        assert!(stats.incomplete_by_prodi.is_empty());
    }
}
