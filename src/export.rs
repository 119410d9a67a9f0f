use std::io::Write;

use crate::grading;
use crate::models::{
    Assessment, ExamType, ScoreSheet, Student, SUPERVISOR_RUBRIC_ITEMS,
};

/// Summary recap: one row per student with the four role totals and the
/// derived final grade. Returns the number of data rows written.
pub fn write_summary<W: Write>(
    out: W,
    students: &[Student],
    assessments: &[Assessment],
    exam: ExamType,
) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "npm",
        "name",
        "prodi",
        "supervisor1 (35%)",
        "supervisor2 (25%)",
        "examiner1 (20%)",
        "examiner2 (20%)",
        "final",
        "letter",
        "result",
        "data status",
    ])?;

    let mut rows = 0usize;
    for aggregate in grading::aggregate_all(students, assessments, exam) {
        let cell = |total: Option<f64>| match total {
            Some(value) => format!("{value:.2}"),
            None => "-".to_string(),
        };
        writer.write_record([
            aggregate.npm.clone(),
            aggregate.name.clone(),
            aggregate.prodi.clone(),
            cell(aggregate.supervisor1),
            cell(aggregate.supervisor2),
            cell(aggregate.examiner1),
            cell(aggregate.examiner2),
            format!("{:.2}", aggregate.final_score),
            aggregate.letter.to_string(),
            if aggregate.is_pass { "PASS" } else { "FAIL" }.to_string(),
            aggregate.status_label().to_string(),
        ])?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}

/// Detail archive: one row per assessment with the full rubric breakdown and
/// proceedings, for students that have at least one record.
pub fn write_details<W: Write>(
    out: W,
    students: &[Student],
    assessments: &[Assessment],
    exam: ExamType,
) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "recorded at",
        "exam type",
        "npm",
        "name",
        "prodi",
        "role",
        "evaluator",
        "total",
        "breakdown",
    ])?;

    let mut rows = 0usize;
    for student in students {
        for assessment in assessments
            .iter()
            .filter(|a| a.student_id == student.id && a.exam_type == exam)
        {
            let evaluator = match student.evaluator_for(assessment.role).trim() {
                "" => "-",
                name => name,
            };
            writer.write_record([
                assessment
                    .recorded_at
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                exam.label().to_string(),
                student.npm.clone(),
                student.name.clone(),
                student.prodi.clone(),
                assessment.role.label().to_string(),
                evaluator.to_string(),
                format!("{:.2}", assessment.total),
                breakdown(assessment),
            ])?;
            rows += 1;
        }
    }

    writer.flush()?;
    Ok(rows)
}

/// Roster in the bulk-import column order, so an export re-imports cleanly.
pub fn write_roster<W: Write>(out: W, students: &[Student]) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "name",
        "npm",
        "prodi",
        "title",
        "supervisor1",
        "supervisor2",
        "examiner1",
        "examiner2",
    ])?;

    for student in students {
        writer.write_record([
            student.name.as_str(),
            student.npm.as_str(),
            student.prodi.as_str(),
            student.title.as_str(),
            student.supervisor1.as_str(),
            student.supervisor2.as_str(),
            student.examiner1.as_str(),
            student.examiner2.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(students.len())
}

fn breakdown(assessment: &Assessment) -> String {
    let mut parts: Vec<String> = match &assessment.scores {
        ScoreSheet::Supervisor(scores) => SUPERVISOR_RUBRIC_ITEMS
            .iter()
            .zip(scores.items.iter())
            .enumerate()
            .map(|(idx, (label, value))| format!("{}. {}: {}", idx + 1, label, value))
            .collect(),
        ScoreSheet::Examiner(scores) => vec![
            format!("Sistematika: {}", scores.sistematika),
            format!("Isi: {}", scores.isi),
            format!("Penyajian: {}", scores.penyajian),
            format!("Tanya Jawab: {}", scores.tanya_jawab),
        ],
    };

    if let Some(p) = &assessment.proceedings {
        parts.push(format!(
            "[Proceedings] date: {}, time: {}, events: {}, notes: {}",
            p.date, p.time, p.events, p.notes
        ));
    }

    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExaminerScores, Proceedings, Role, SupervisorScores};
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    fn student(npm: &str) -> Student {
        Student {
            id: Uuid::new_v4(),
            npm: npm.to_string(),
            name: "Riau Ningsih".to_string(),
            prodi: "Kesling".to_string(),
            title: "Analisis Kualitas Air".to_string(),
            supervisor1: "Dr. Ratna".to_string(),
            supervisor2: "Dr. Hadi".to_string(),
            examiner1: "Dr. Sari".to_string(),
            examiner2: "".to_string(),
        }
    }

    fn full_set(s: &Student, exam: ExamType) -> Vec<Assessment> {
        let supervisor = ScoreSheet::Supervisor(SupervisorScores::new([4; 20]).unwrap());
        let examiner = ScoreSheet::Examiner(ExaminerScores::new(70.0, 70.0, 70.0, 70.0));
        vec![
            Assessment::new(s.id, Role::Supervisor1, exam, supervisor.clone(), None).unwrap(),
            Assessment::new(s.id, Role::Supervisor2, exam, supervisor, None).unwrap(),
            Assessment::new(s.id, Role::Examiner1, exam, examiner.clone(), None).unwrap(),
            Assessment::new(s.id, Role::Examiner2, exam, examiner, None).unwrap(),
        ]
    }

    #[test]
    fn summary_final_column_reparses_to_aggregate_value() {
        let exam = ExamType::ThesisDefense;
        let s = student("241013251037");
        let assessments = full_set(&s, exam);
        let expected = grading::aggregate(&s, &assessments, exam).final_score;

        let mut buffer = Vec::new();
        let rows = write_summary(&mut buffer, &[s], &assessments, exam).unwrap();
        assert_eq!(rows, 1);

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let record = reader.records().next().unwrap().unwrap();
        let reparsed: f64 = record[7].parse().unwrap();
        assert!((reparsed - expected).abs() < 0.01);
        assert_eq!(&record[10], "complete");
    }

    #[test]
    fn summary_renders_missing_roles_as_dash() {
        let exam = ExamType::ProposalSeminar;
        let s = student("221013251021");
        let sheet = ScoreSheet::Supervisor(SupervisorScores::new([5; 20]).unwrap());
        let assessments =
            vec![Assessment::new(s.id, Role::Supervisor1, exam, sheet, None).unwrap()];

        let mut buffer = Vec::new();
        write_summary(&mut buffer, &[s], &assessments, exam).unwrap();

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[3], "100.00");
        assert_eq!(&record[4], "-");
        assert_eq!(&record[10], "partial");
    }

    #[test]
    fn details_skip_students_without_records() {
        let exam = ExamType::ThesisDefense;
        let scored = student("221013251018");
        let unscored = student("221013251002");
        let assessments = full_set(&scored, exam);

        let mut buffer = Vec::new();
        let rows = write_details(&mut buffer, &[scored, unscored], &assessments, exam).unwrap();
        assert_eq!(rows, 4);
    }

    #[test]
    fn details_include_rubric_breakdown_and_proceedings() {
        let exam = ExamType::ThesisDefense;
        let s = student("191013251020");
        let sheet = ScoreSheet::Supervisor(SupervisorScores::new([4; 20]).unwrap());
        let proceedings = Proceedings {
            date: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
            time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            events: "ran 15 minutes over".to_string(),
            notes: "revise chapter 3".to_string(),
        };
        let assessments = vec![Assessment::new(
            s.id,
            Role::Supervisor2,
            exam,
            sheet,
            Some(proceedings),
        )
        .unwrap()];

        let mut buffer = Vec::new();
        write_details(&mut buffer, &[s], &assessments, exam).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("1. Kedisiplinan: 4"));
        assert!(text.contains("20. Wawasan Umum diluar Topik: 4"));
        assert!(text.contains("[Proceedings] date: 2026-04-02"));
        assert!(text.contains("revise chapter 3"));
    }

    #[test]
    fn details_render_unassigned_evaluator_as_dash() {
        let exam = ExamType::ThesisDefense;
        let s = student("201013251026");
        let examiner = ScoreSheet::Examiner(ExaminerScores::new(80.0, 80.0, 80.0, 80.0));
        // examiner2 has no roster assignment but a record exists anyway
        let assessments =
            vec![Assessment::new(s.id, Role::Examiner2, exam, examiner, None).unwrap()];

        let mut buffer = Vec::new();
        write_details(&mut buffer, &[s], &assessments, exam).unwrap();
        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[6], "-");
    }

    #[test]
    fn roster_round_trips_import_column_order() {
        let s = student("231013251031");
        let mut buffer = Vec::new();
        let rows = write_roster(&mut buffer, &[s]).unwrap();
        assert_eq!(rows, 1);

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            vec![
                "name",
                "npm",
                "prodi",
                "title",
                "supervisor1",
                "supervisor2",
                "examiner1",
                "examiner2"
            ]
        );
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "Riau Ningsih");
        assert_eq!(&record[1], "231013251031");
    }
}
