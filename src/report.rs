use std::fmt::Write;

use crate::grading;
use crate::models::{Assessment, ExamType, Student};
use crate::stats;

/// Markdown recap for one exam type: headline stats, per-student standings,
/// and outstanding evaluator submissions.
pub fn build_recap(students: &[Student], assessments: &[Assessment], exam: ExamType) -> String {
    let aggregates = grading::aggregate_all(students, assessments, exam);
    let summary = stats::summarize(students, assessments, exam);
    let pending = grading::pending_evaluators(students, assessments, exam);

    let mut output = String::new();

    let _ = writeln!(output, "# Defense Scoring Recap");
    let _ = writeln!(output, "Exam type: {}", exam.label());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- {} students on the roster, {} fully scored",
        summary.student_count, summary.complete_count
    );
    let _ = writeln!(
        output,
        "- Pass rate among complete: {:.1}%",
        summary.pass_rate
    );
    let _ = writeln!(
        output,
        "- Outstanding evaluator submissions: {}",
        summary.pending_count
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Role Averages");
    for role_average in &summary.role_averages {
        if role_average.record_count == 0 {
            let _ = writeln!(output, "- {}: no records yet", role_average.role.label());
        } else {
            let _ = writeln!(
                output,
                "- {}: {:.2} across {} records",
                role_average.role.label(),
                role_average.average,
                role_average.record_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution (complete students)");
    if summary.complete_count == 0 {
        let _ = writeln!(output, "No students are fully scored yet.");
    } else {
        for bucket in &summary.grade_histogram {
            if bucket.count > 0 {
                let _ = writeln!(output, "- {}: {}", bucket.letter, bucket.count);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Standings");
    if aggregates.is_empty() {
        let _ = writeln!(output, "No students on the roster.");
    } else {
        for aggregate in &aggregates {
            if aggregate.is_complete {
                let _ = writeln!(
                    output,
                    "- {} ({}) final {:.2}, {} ({})",
                    aggregate.name,
                    aggregate.npm,
                    aggregate.final_score,
                    aggregate.letter,
                    if aggregate.is_pass { "pass" } else { "fail" }
                );
            } else {
                let _ = writeln!(
                    output,
                    "- {} ({}) {}/4 scores in",
                    aggregate.name, aggregate.npm, aggregate.completion_count
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pending Evaluators");
    if pending.is_empty() {
        let _ = writeln!(output, "Every assigned evaluator has submitted.");
    } else {
        for item in &pending {
            let _ = writeln!(
                output,
                "- {} ({}) owes a score for {} ({})",
                item.evaluator_name,
                item.role.label(),
                item.student_name,
                item.prodi
            );
        }
    }

    output
}
