use anyhow::Context;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    Assessment, ExamType, ExaminerScores, Proceedings, Role, ScoreSheet, Student,
    SupervisorScores,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("7b6f3a51-9d0e-4f4b-8a46-1f2a9c3d5e70")?,
            "241013251042",
            "Lamtiur Sinaga",
            "Kesling",
            "Analisis Kualitas Air Minum Isi Ulang",
        ),
        (
            Uuid::parse_str("2e85c1b4-63a7-45d9-b1c8-904f7e2a6d13")?,
            "221013251010",
            "Riyansyah Amanda Pratama",
            "Kesling",
            "Pengelolaan Limbah Medis Puskesmas",
        ),
        (
            Uuid::parse_str("c4d92f08-17ab-4e6c-9f35-82b0d6a41c57")?,
            "K3-2025-004",
            "Arif Sofyan",
            "K3",
            "Evaluasi Penerapan SMK3 di Proyek Konstruksi",
        ),
    ];

    for (id, npm, name, prodi, title) in students {
        sqlx::query(
            r#"
            INSERT INTO defense_scoring.students
            (id, npm, name, prodi, title, supervisor1, supervisor2, examiner1, examiner2)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (lower(npm)) DO UPDATE
            SET name = EXCLUDED.name, prodi = EXCLUDED.prodi, title = EXCLUDED.title
            "#,
        )
        .bind(id)
        .bind(npm)
        .bind(name)
        .bind(prodi)
        .bind(title)
        .bind("Dr. Ratna Wulandari")
        .bind("Dr. Hadi Pranoto")
        .bind("Dr. Sari Kusuma")
        .bind("Dr. Bimo Santoso")
        .execute(pool)
        .await?;
    }

    let first = find_student(pool, "241013251042")
        .await?
        .context("seed student missing after insert")?;

    let supervisor = Assessment::new(
        first.id,
        Role::Supervisor1,
        ExamType::ThesisDefense,
        ScoreSheet::Supervisor(SupervisorScores::new([4; 20])?),
        None,
    )?;
    upsert_assessment(pool, &supervisor).await?;

    let examiner = Assessment::new(
        first.id,
        Role::Examiner1,
        ExamType::ThesisDefense,
        ScoreSheet::Examiner(ExaminerScores::new(82.0, 78.0, 85.0, 80.0)),
        None,
    )?;
    upsert_assessment(pool, &examiner).await?;

    Ok(())
}

fn student_from_row(row: &sqlx::postgres::PgRow) -> Student {
    Student {
        id: row.get("id"),
        npm: row.get("npm"),
        name: row.get("name"),
        prodi: row.get("prodi"),
        title: row.get("title"),
        supervisor1: row.get("supervisor1"),
        supervisor2: row.get("supervisor2"),
        examiner1: row.get("examiner1"),
        examiner2: row.get("examiner2"),
    }
}

pub async fn list_students(pool: &PgPool, prodi: Option<&str>) -> anyhow::Result<Vec<Student>> {
    let mut query = String::from(
        "SELECT id, npm, name, prodi, title, supervisor1, supervisor2, examiner1, examiner2 \
         FROM defense_scoring.students",
    );
    if prodi.is_some() {
        query.push_str(" WHERE prodi = $1");
    }
    query.push_str(" ORDER BY name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = prodi {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(student_from_row).collect())
}

pub async fn find_student(pool: &PgPool, npm: &str) -> anyhow::Result<Option<Student>> {
    let row = sqlx::query(
        "SELECT id, npm, name, prodi, title, supervisor1, supervisor2, examiner1, examiner2 \
         FROM defense_scoring.students WHERE lower(npm) = lower($1)",
    )
    .bind(npm)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(student_from_row))
}

pub async fn upsert_student(pool: &PgPool, student: &Student) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO defense_scoring.students
        (id, npm, name, prodi, title, supervisor1, supervisor2, examiner1, examiner2)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (lower(npm)) DO UPDATE
        SET name = EXCLUDED.name,
            prodi = EXCLUDED.prodi,
            title = EXCLUDED.title,
            supervisor1 = EXCLUDED.supervisor1,
            supervisor2 = EXCLUDED.supervisor2,
            examiner1 = EXCLUDED.examiner1,
            examiner2 = EXCLUDED.examiner2
        "#,
    )
    .bind(student.id)
    .bind(&student.npm)
    .bind(&student.name)
    .bind(&student.prodi)
    .bind(&student.title)
    .bind(&student.supervisor1)
    .bind(&student.supervisor2)
    .bind(&student.examiner1)
    .bind(&student.examiner2)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_students(pool: &PgPool, ids: &[Uuid]) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM defense_scoring.students WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Bulk roster import. Fixed column order: name, npm, prodi, title,
/// supervisor1, supervisor2, examiner1, examiner2. The header row is skipped,
/// rows without an npm are dropped, and an existing npm (case-insensitive)
/// overwrites that student in place.
pub async fn import_students_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportOutcome> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    let mut outcome = ImportOutcome::default();

    for result in reader.records() {
        let record = result?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();

        let npm = field(1);
        if npm.is_empty() {
            outcome.skipped += 1;
            continue;
        }

        let existing = find_student(pool, &npm).await?;
        let student = Student {
            id: existing.as_ref().map(|s| s.id).unwrap_or_else(Uuid::new_v4),
            npm,
            name: field(0),
            prodi: match field(2).as_str() {
                "" => "K3".to_string(),
                value => value.to_string(),
            },
            title: match field(3).as_str() {
                "" => "-".to_string(),
                value => value.to_string(),
            },
            supervisor1: field(4),
            supervisor2: field(5),
            examiner1: field(6),
            examiner2: field(7),
        };

        upsert_student(pool, &student).await?;
        if existing.is_some() {
            outcome.updated += 1;
        } else {
            outcome.inserted += 1;
        }
    }

    Ok(outcome)
}

fn assessment_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Assessment> {
    let role: String = row.get("role");
    let exam_type: String = row.get("exam_type");
    let scores: Json<ScoreSheet> = row.get("scores");
    let proceedings: Option<Json<Proceedings>> = row.get("proceedings");

    Ok(Assessment {
        id: row.get("id"),
        student_id: row.get("student_id"),
        role: Role::parse(&role)?,
        exam_type: ExamType::parse(&exam_type)?,
        scores: scores.0,
        proceedings: proceedings.map(|p| p.0),
        total: row.get("total"),
        recorded_at: row.get("recorded_at"),
    })
}

pub async fn list_assessments(pool: &PgPool, exam: ExamType) -> anyhow::Result<Vec<Assessment>> {
    let rows = sqlx::query(
        "SELECT id, student_id, role, exam_type, scores, proceedings, total, recorded_at \
         FROM defense_scoring.assessments WHERE exam_type = $1 ORDER BY recorded_at",
    )
    .bind(exam.as_str())
    .fetch_all(pool)
    .await?;

    let mut assessments = Vec::new();
    for row in &rows {
        assessments.push(assessment_from_row(row)?);
    }
    Ok(assessments)
}

/// Idempotent per (exam, role, student) key: a re-save overwrites the previous
/// sheet, last write wins.
pub async fn upsert_assessment(pool: &PgPool, assessment: &Assessment) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO defense_scoring.assessments
        (id, student_id, role, exam_type, scores, proceedings, total, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE
        SET scores = EXCLUDED.scores,
            proceedings = EXCLUDED.proceedings,
            total = EXCLUDED.total,
            recorded_at = EXCLUDED.recorded_at
        "#,
    )
    .bind(&assessment.id)
    .bind(assessment.student_id)
    .bind(assessment.role.as_str())
    .bind(assessment.exam_type.as_str())
    .bind(Json(&assessment.scores))
    .bind(assessment.proceedings.as_ref().map(Json))
    .bind(assessment.total)
    .bind(assessment.recorded_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_assessments(pool: &PgPool, ids: &[String]) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM defense_scoring.assessments WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Clears every role's record for the given students within one exam type,
/// recomputing the deterministic ids rather than trusting caller input.
pub async fn delete_scores_for_students(
    pool: &PgPool,
    student_ids: &[Uuid],
    exam: ExamType,
) -> anyhow::Result<u64> {
    let mut ids = Vec::with_capacity(student_ids.len() * Role::ALL.len());
    for student_id in student_ids {
        for role in Role::ALL {
            ids.push(Assessment::record_id(exam, role, *student_id));
        }
    }
    delete_assessments(pool, &ids).await
}
