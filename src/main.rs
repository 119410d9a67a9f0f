use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod db;
mod export;
mod grading;
mod models;
mod report;
mod stats;

use models::{
    Assessment, ExamType, ExaminerScores, Proceedings, Role, ScoreSheet, Student,
    SupervisorScores,
};

#[derive(Parser)]
#[command(name = "defense-scoring")]
#[command(about = "Thesis and proposal defense scoring for the faculty", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Bulk-import students from a CSV roster
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Export the roster in the import column order
    ExportRoster {
        #[arg(long, default_value = "roster.csv")]
        out: PathBuf,
        #[arg(long)]
        prodi: Option<String>,
    },
    /// Add or update a single student
    AddStudent {
        #[arg(long)]
        npm: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "K3")]
        prodi: String,
        #[arg(long, default_value = "-")]
        title: String,
        #[arg(long, default_value = "")]
        supervisor1: String,
        #[arg(long, default_value = "")]
        supervisor2: String,
        #[arg(long, default_value = "")]
        examiner1: String,
        #[arg(long, default_value = "")]
        examiner2: String,
    },
    /// Remove students by roll number
    RemoveStudent {
        #[arg(long, required = true)]
        npm: Vec<String>,
    },
    /// Save a supervisor rubric sheet (20 comma-separated scores, each 1-5)
    SubmitSupervisor {
        #[arg(long)]
        npm: String,
        #[arg(long, value_enum)]
        role: Role,
        #[arg(long, value_enum)]
        exam: ExamType,
        #[arg(long)]
        scores: String,
        /// Record-of-proceedings fields, Supervisor 2 only
        #[arg(long)]
        session_date: Option<NaiveDate>,
        #[arg(long)]
        session_time: Option<NaiveTime>,
        #[arg(long)]
        events: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Save an examiner component sheet (each component 0-100)
    SubmitExaminer {
        #[arg(long)]
        npm: String,
        #[arg(long, value_enum)]
        role: Role,
        #[arg(long, value_enum)]
        exam: ExamType,
        #[arg(long)]
        sistematika: f64,
        #[arg(long)]
        isi: f64,
        #[arg(long)]
        penyajian: f64,
        #[arg(long)]
        tanya_jawab: f64,
    },
    /// Print the per-student recap table
    Recap {
        #[arg(long, value_enum)]
        exam: ExamType,
        #[arg(long)]
        prodi: Option<String>,
    },
    /// Print dashboard statistics
    Stats {
        #[arg(long, value_enum)]
        exam: ExamType,
    },
    /// List evaluators who still owe scores
    Pending {
        #[arg(long, value_enum)]
        exam: ExamType,
    },
    /// Write the summary recap CSV
    ExportSummary {
        #[arg(long, value_enum)]
        exam: ExamType,
        #[arg(long, default_value = "summary.csv")]
        out: PathBuf,
    },
    /// Write the per-assessment detail archive CSV
    ExportDetails {
        #[arg(long, value_enum)]
        exam: ExamType,
        #[arg(long, default_value = "details.csv")]
        out: PathBuf,
        /// Restrict the archive to one student
        #[arg(long)]
        npm: Option<String>,
    },
    /// Generate a markdown recap report
    Report {
        #[arg(long, value_enum)]
        exam: ExamType,
        #[arg(long, default_value = "recap.md")]
        out: PathBuf,
    },
    /// Delete all score records for the given students within one exam type
    DeleteScores {
        #[arg(long, value_enum)]
        exam: ExamType,
        #[arg(long, required = true)]
        npm: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let outcome = db::import_students_csv(&pool, &csv).await?;
            println!(
                "Imported {} new and {} updated students from {} ({} rows skipped).",
                outcome.inserted,
                outcome.updated,
                csv.display(),
                outcome.skipped
            );
        }
        Commands::ExportRoster { out, prodi } => {
            let students = db::list_students(&pool, prodi.as_deref()).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let rows = export::write_roster(file, &students)?;
            println!("Wrote {} students to {}.", rows, out.display());
        }
        Commands::AddStudent {
            npm,
            name,
            prodi,
            title,
            supervisor1,
            supervisor2,
            examiner1,
            examiner2,
        } => {
            let existing = db::find_student(&pool, &npm).await?;
            let updating = existing.is_some();
            let student = Student {
                id: existing.map(|s| s.id).unwrap_or_else(Uuid::new_v4),
                npm,
                name,
                prodi,
                title,
                supervisor1,
                supervisor2,
                examiner1,
                examiner2,
            };
            db::upsert_student(&pool, &student).await?;
            if updating {
                println!("Updated {} ({}).", student.name, student.npm);
            } else {
                println!("Added {} ({}).", student.name, student.npm);
            }
        }
        Commands::RemoveStudent { npm } => {
            let mut ids = Vec::new();
            for value in &npm {
                let student = db::find_student(&pool, value)
                    .await?
                    .with_context(|| format!("no student with npm {value}"))?;
                ids.push(student.id);
            }
            let removed = db::delete_students(&pool, &ids).await?;
            println!("Removed {removed} students.");
        }
        Commands::SubmitSupervisor {
            npm,
            role,
            exam,
            scores,
            session_date,
            session_time,
            events,
            notes,
        } => {
            if !role.is_supervisor() {
                anyhow::bail!("--role must be supervisor1 or supervisor2");
            }
            let student = db::find_student(&pool, &npm)
                .await?
                .with_context(|| format!("no student with npm {npm}"))?;

            let sheet = SupervisorScores::new(parse_rubric_scores(&scores)?)?;
            let has_proceedings = session_date.is_some()
                || session_time.is_some()
                || events.is_some()
                || notes.is_some();
            let proceedings = has_proceedings.then(|| Proceedings {
                date: session_date.unwrap_or_else(|| Utc::now().date_naive()),
                time: session_time.unwrap_or_else(|| Utc::now().time()),
                events: events.unwrap_or_default(),
                notes: notes.unwrap_or_default(),
            });

            let assessment = Assessment::new(
                student.id,
                role,
                exam,
                ScoreSheet::Supervisor(sheet),
                proceedings,
            )?;
            db::upsert_assessment(&pool, &assessment).await?;
            println!(
                "Saved {} sheet for {} ({}): total {:.0}.",
                role.label(),
                student.name,
                exam.label(),
                assessment.total
            );
        }
        Commands::SubmitExaminer {
            npm,
            role,
            exam,
            sistematika,
            isi,
            penyajian,
            tanya_jawab,
        } => {
            if role.is_supervisor() {
                anyhow::bail!("--role must be examiner1 or examiner2");
            }
            let student = db::find_student(&pool, &npm)
                .await?
                .with_context(|| format!("no student with npm {npm}"))?;

            let sheet = ExaminerScores::new(sistematika, isi, penyajian, tanya_jawab);
            let assessment =
                Assessment::new(student.id, role, exam, ScoreSheet::Examiner(sheet), None)?;
            db::upsert_assessment(&pool, &assessment).await?;
            println!(
                "Saved {} sheet for {} ({}): total {:.2}.",
                role.label(),
                student.name,
                exam.label(),
                assessment.total
            );
        }
        Commands::Recap { exam, prodi } => {
            let students = db::list_students(&pool, prodi.as_deref()).await?;
            let assessments = db::list_assessments(&pool, exam).await?;
            let aggregates = grading::aggregate_all(&students, &assessments, exam);

            if aggregates.is_empty() {
                println!("No students on the roster.");
                return Ok(());
            }

            println!("Recap for {}:", exam.label());
            for aggregate in &aggregates {
                let cell = |total: Option<f64>| match total {
                    Some(value) => format!("{value:.0}"),
                    None => "-".to_string(),
                };
                println!(
                    "- {} ({}, {}) s1 {} s2 {} e1 {} e2 {} | final {:.2} {} {} [{}]",
                    aggregate.name,
                    aggregate.npm,
                    aggregate.prodi,
                    cell(aggregate.supervisor1),
                    cell(aggregate.supervisor2),
                    cell(aggregate.examiner1),
                    cell(aggregate.examiner2),
                    aggregate.final_score,
                    aggregate.letter,
                    if aggregate.is_pass { "PASS" } else { "FAIL" },
                    aggregate.status_label()
                );
            }
        }
        Commands::Stats { exam } => {
            let students = db::list_students(&pool, None).await?;
            let assessments = db::list_assessments(&pool, exam).await?;
            let summary = stats::summarize(&students, &assessments, exam);

            println!("Statistics for {}:", exam.label());
            println!(
                "- {} students, {} fully scored, pass rate {:.1}%",
                summary.student_count, summary.complete_count, summary.pass_rate
            );
            for (prodi, count) in &summary.incomplete_by_prodi {
                println!("- {prodi}: {count} students not yet complete");
            }
            for role_average in &summary.role_averages {
                if role_average.record_count > 0 {
                    println!(
                        "- {} average {:.2} across {} records",
                        role_average.role.label(),
                        role_average.average,
                        role_average.record_count
                    );
                }
            }
            for bucket in &summary.grade_histogram {
                if bucket.count > 0 {
                    println!("- grade {}: {}", bucket.letter, bucket.count);
                }
            }
            println!(
                "- {} evaluator submissions outstanding",
                summary.pending_count
            );
        }
        Commands::Pending { exam } => {
            let students = db::list_students(&pool, None).await?;
            let assessments = db::list_assessments(&pool, exam).await?;
            let pending = grading::pending_evaluators(&students, &assessments, exam);

            if pending.is_empty() {
                println!("Every assigned evaluator has submitted.");
                return Ok(());
            }
            println!("Outstanding submissions for {}:", exam.label());
            for item in &pending {
                println!(
                    "- {} ({}) for {} ({})",
                    item.evaluator_name,
                    item.role.label(),
                    item.student_name,
                    item.prodi
                );
            }
        }
        Commands::ExportSummary { exam, out } => {
            let students = db::list_students(&pool, None).await?;
            let assessments = db::list_assessments(&pool, exam).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let rows = export::write_summary(file, &students, &assessments, exam)?;
            println!("Wrote {} summary rows to {}.", rows, out.display());
        }
        Commands::ExportDetails { exam, out, npm } => {
            let mut students = db::list_students(&pool, None).await?;
            if let Some(value) = &npm {
                let student = db::find_student(&pool, value)
                    .await?
                    .with_context(|| format!("no student with npm {value}"))?;
                students = vec![student];
            }
            let assessments = db::list_assessments(&pool, exam).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let rows = export::write_details(file, &students, &assessments, exam)?;
            println!("Wrote {} detail rows to {}.", rows, out.display());
        }
        Commands::Report { exam, out } => {
            let students = db::list_students(&pool, None).await?;
            let assessments = db::list_assessments(&pool, exam).await?;
            let recap = report::build_recap(&students, &assessments, exam);
            std::fs::write(&out, recap)?;
            println!("Report written to {}.", out.display());
        }
        Commands::DeleteScores { exam, npm } => {
            let mut ids = Vec::new();
            for value in &npm {
                let student = db::find_student(&pool, value)
                    .await?
                    .with_context(|| format!("no student with npm {value}"))?;
                ids.push(student.id);
            }
            let removed = db::delete_scores_for_students(&pool, &ids, exam).await?;
            println!("Deleted {} score records.", removed);
        }
    }

    Ok(())
}

fn parse_rubric_scores(raw: &str) -> anyhow::Result<[u8; 20]> {
    let values: Vec<u8> = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u8>()
                .with_context(|| format!("invalid rubric score: {part:?}"))
        })
        .collect::<anyhow::Result<Vec<u8>>>()?;

    let count = values.len();
    values
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected 20 rubric scores, got {count}"))
}
