use anyhow::bail;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The 20 supervisor rubric criteria, in form order. Labels are the faculty's
/// own wording and appear verbatim in detail exports.
pub const SUPERVISOR_RUBRIC_ITEMS: [&str; 20] = [
    "Kedisiplinan",
    "Kesopanan",
    "Tanggung Jawab",
    "Pemahaman Permasalahan dan Konsep Penelitian",
    "Pemahaman Tujuan Penelitian",
    "Perencanaan Desain Penelitian dan Pemilihan Metode",
    "Pemahaman Instrumen Penelitian",
    "Pemahaman Teknik Pengambilan Data",
    "Pemahaman Metode Analisis Data",
    "Keterkaitan Referensi Permasalahan Penelitian",
    "Sistematika Penulisan",
    "Pemilihan Kata dan Bahasa",
    "Teknik Mengutip Referensi",
    "Kerapian",
    "Efektifitas Penggunaan Waktu",
    "Teknik Pembuatan Powerpoint & Multimedia",
    "Teknik Presentasi Dalam Penyajian",
    "Bahasa Tubuh Dalam Presentasi",
    "Layanan Terhadap Audiens",
    "Wawasan Umum diluar Topik",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ExamType {
    ProposalSeminar,
    ThesisDefense,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::ProposalSeminar => "proposal-seminar",
            ExamType::ThesisDefense => "thesis-defense",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExamType::ProposalSeminar => "Proposal Seminar",
            ExamType::ThesisDefense => "Thesis Defense",
        }
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "proposal-seminar" => Ok(ExamType::ProposalSeminar),
            "thesis-defense" => Ok(ExamType::ThesisDefense),
            other => bail!("unknown exam type: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Role {
    Supervisor1,
    Supervisor2,
    Examiner1,
    Examiner2,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Supervisor1,
        Role::Supervisor2,
        Role::Examiner1,
        Role::Examiner2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Supervisor1 => "supervisor1",
            Role::Supervisor2 => "supervisor2",
            Role::Examiner1 => "examiner1",
            Role::Examiner2 => "examiner2",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Supervisor1 => "Supervisor 1",
            Role::Supervisor2 => "Supervisor 2",
            Role::Examiner1 => "Examiner 1",
            Role::Examiner2 => "Examiner 2",
        }
    }

    /// Share of the final score carried by this role. Shares sum to 1.0.
    pub fn weight(&self) -> f64 {
        match self {
            Role::Supervisor1 => 0.35,
            Role::Supervisor2 => 0.25,
            Role::Examiner1 => 0.20,
            Role::Examiner2 => 0.20,
        }
    }

    pub fn is_supervisor(&self) -> bool {
        matches!(self, Role::Supervisor1 | Role::Supervisor2)
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "supervisor1" => Ok(Role::Supervisor1),
            "supervisor2" => Ok(Role::Supervisor2),
            "examiner1" => Ok(Role::Examiner1),
            "examiner2" => Ok(Role::Examiner2),
            other => bail!("unknown evaluator role: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    pub npm: String,
    pub name: String,
    pub prodi: String,
    pub title: String,
    pub supervisor1: String,
    pub supervisor2: String,
    pub examiner1: String,
    pub examiner2: String,
}

impl Student {
    /// Name of the lecturer assigned to `role`, as entered in the roster.
    /// Empty or "-" means no one is assigned yet.
    pub fn evaluator_for(&self, role: Role) -> &str {
        match role {
            Role::Supervisor1 => &self.supervisor1,
            Role::Supervisor2 => &self.supervisor2,
            Role::Examiner1 => &self.examiner1,
            Role::Examiner2 => &self.examiner2,
        }
    }
}

/// Supervisor rubric sheet: 20 items, each scored 1-5, totalled unweighted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorScores {
    pub items: [u8; 20],
}

impl SupervisorScores {
    pub fn new(items: [u8; 20]) -> anyhow::Result<Self> {
        for (idx, value) in items.iter().enumerate() {
            if !(1..=5).contains(value) {
                bail!(
                    "rubric item {} ({}) must be 1-5, got {}",
                    idx + 1,
                    SUPERVISOR_RUBRIC_ITEMS[idx],
                    value
                );
            }
        }
        Ok(SupervisorScores { items })
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(|v| f64::from(*v)).sum()
    }
}

/// Examiner component weights: sistematika, isi, penyajian, tanya jawab.
pub const EXAMINER_WEIGHTS: [f64; 4] = [0.20, 0.30, 0.20, 0.30];

/// Examiner sheet: four components entered 0-100 and combined by fixed weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExaminerScores {
    pub sistematika: f64,
    pub isi: f64,
    pub penyajian: f64,
    pub tanya_jawab: f64,
}

impl ExaminerScores {
    /// Out-of-range entries are clamped rather than rejected.
    pub fn new(sistematika: f64, isi: f64, penyajian: f64, tanya_jawab: f64) -> Self {
        let clamp = |v: f64| v.clamp(0.0, 100.0);
        ExaminerScores {
            sistematika: clamp(sistematika),
            isi: clamp(isi),
            penyajian: clamp(penyajian),
            tanya_jawab: clamp(tanya_jawab),
        }
    }

    pub fn total(&self) -> f64 {
        self.sistematika * EXAMINER_WEIGHTS[0]
            + self.isi * EXAMINER_WEIGHTS[1]
            + self.penyajian * EXAMINER_WEIGHTS[2]
            + self.tanya_jawab * EXAMINER_WEIGHTS[3]
    }
}

/// Exactly one score kind per record, keyed by who produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreSheet {
    Supervisor(SupervisorScores),
    Examiner(ExaminerScores),
}

impl ScoreSheet {
    pub fn total(&self) -> f64 {
        match self {
            ScoreSheet::Supervisor(s) => s.total(),
            ScoreSheet::Examiner(s) => s.total(),
        }
    }
}

/// Record of proceedings captured alongside the second supervisor's sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proceedings {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub events: String,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct Assessment {
    pub id: String,
    pub student_id: Uuid,
    pub role: Role,
    pub exam_type: ExamType,
    pub scores: ScoreSheet,
    pub proceedings: Option<Proceedings>,
    pub total: f64,
    pub recorded_at: DateTime<Utc>,
}

impl Assessment {
    /// Deterministic key so a re-save overwrites instead of duplicating.
    pub fn record_id(exam_type: ExamType, role: Role, student_id: Uuid) -> String {
        format!("{}-{}-{}", exam_type.as_str(), role.as_str(), student_id)
    }

    pub fn new(
        student_id: Uuid,
        role: Role,
        exam_type: ExamType,
        scores: ScoreSheet,
        proceedings: Option<Proceedings>,
    ) -> anyhow::Result<Self> {
        match (&scores, role.is_supervisor()) {
            (ScoreSheet::Supervisor(_), false) => {
                bail!("{} cannot submit a supervisor rubric sheet", role.label())
            }
            (ScoreSheet::Examiner(_), true) => {
                bail!("{} cannot submit an examiner component sheet", role.label())
            }
            _ => {}
        }
        if proceedings.is_some() && role != Role::Supervisor2 {
            bail!("record of proceedings is only taken by Supervisor 2");
        }
        let total = scores.total();
        Ok(Assessment {
            id: Assessment::record_id(exam_type, role, student_id),
            student_id,
            role,
            exam_type,
            scores,
            proceedings,
            total,
            recorded_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervisor_total_is_plain_sum() {
        let scores = SupervisorScores::new([3; 20]).unwrap();
        assert_eq!(scores.total(), 60.0);
        let scores = SupervisorScores::new([5; 20]).unwrap();
        assert_eq!(scores.total(), 100.0);
        let scores = SupervisorScores::new([1; 20]).unwrap();
        assert_eq!(scores.total(), 20.0);
    }

    #[test]
    fn supervisor_rejects_out_of_range_items() {
        let mut items = [3u8; 20];
        items[7] = 0;
        assert!(SupervisorScores::new(items).is_err());
        items[7] = 6;
        assert!(SupervisorScores::new(items).is_err());
    }

    #[test]
    fn examiner_total_applies_fixed_weights() {
        let scores = ExaminerScores::new(80.0, 90.0, 70.0, 60.0);
        let expected = 80.0 * 0.20 + 90.0 * 0.30 + 70.0 * 0.20 + 60.0 * 0.30;
        assert!((scores.total() - expected).abs() < 1e-9);
    }

    #[test]
    fn examiner_clamps_entries_into_bounds() {
        let scores = ExaminerScores::new(150.0, -20.0, 100.0, 0.0);
        assert_eq!(scores.sistematika, 100.0);
        assert_eq!(scores.isi, 0.0);
        assert!(scores.total() >= 0.0 && scores.total() <= 100.0);
    }

    #[test]
    fn record_id_is_deterministic_per_key() {
        let student = Uuid::new_v4();
        let a = Assessment::record_id(ExamType::ThesisDefense, Role::Supervisor1, student);
        let b = Assessment::record_id(ExamType::ThesisDefense, Role::Supervisor1, student);
        assert_eq!(a, b);
        let c = Assessment::record_id(ExamType::ProposalSeminar, Role::Supervisor1, student);
        assert_ne!(a, c);
    }

    #[test]
    fn proceedings_only_accepted_for_supervisor2() {
        let student = Uuid::new_v4();
        let proceedings = Proceedings {
            date: NaiveDate::from_ymd_opt(2026, 3, 12).unwrap(),
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            events: "none".to_string(),
            notes: "minor revisions".to_string(),
        };
        let sheet = ScoreSheet::Supervisor(SupervisorScores::new([4; 20]).unwrap());
        let err = Assessment::new(
            student,
            Role::Supervisor1,
            ExamType::ThesisDefense,
            sheet.clone(),
            Some(proceedings.clone()),
        );
        assert!(err.is_err());
        let ok = Assessment::new(
            student,
            Role::Supervisor2,
            ExamType::ThesisDefense,
            sheet,
            Some(proceedings),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn sheet_kind_must_match_role() {
        let student = Uuid::new_v4();
        let examiner_sheet = ScoreSheet::Examiner(ExaminerScores::new(80.0, 80.0, 80.0, 80.0));
        assert!(Assessment::new(
            student,
            Role::Supervisor1,
            ExamType::ThesisDefense,
            examiner_sheet,
            None,
        )
        .is_err());

        let supervisor_sheet = ScoreSheet::Supervisor(SupervisorScores::new([4; 20]).unwrap());
        assert!(Assessment::new(
            student,
            Role::Examiner1,
            ExamType::ThesisDefense,
            supervisor_sheet,
            None,
        )
        .is_err());
    }

    #[test]
    fn score_sheet_serializes_with_kind_tag() {
        let sheet = ScoreSheet::Examiner(ExaminerScores::new(80.0, 75.0, 90.0, 85.0));
        let json = serde_json::to_value(&sheet).unwrap();
        assert_eq!(json["kind"], "examiner");
        let back: ScoreSheet = serde_json::from_value(json).unwrap();
        assert!((back.total() - sheet.total()).abs() < 1e-9);
    }
}
