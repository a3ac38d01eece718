use serde::{Deserialize, Serialize};

pub const DEFAULT_ROUNDING: i64 = 2;

/// Rounding digit count accepted from course configuration: 0..=5.
pub fn clamp_rounding(n: Option<i64>) -> u32 {
    n.unwrap_or(DEFAULT_ROUNDING).clamp(0, 5) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeStatus {
    #[serde(rename = "ON_TIME")]
    OnTime,
    #[serde(rename = "LATE")]
    Late,
    #[serde(rename = "EXEMPT")]
    Exempt,
}

impl Default for GradeStatus {
    fn default() -> Self {
        GradeStatus::OnTime
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RubricType {
    #[serde(rename = "MANUAL")]
    Manual,
    #[serde(rename = "GENERATED")]
    Generated,
}

/// A weighted category of assignments ("Homework" at 30%). Weights across a
/// course need not sum to 100; the aggregator renormalizes over whichever
/// sections actually carry graded work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSection {
    pub id: String,
    #[serde(default)]
    pub course_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    #[serde(default)]
    pub course_id: Option<String>,
    pub section_id: String,
    pub name: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub max_score: f64,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// One grade per (assignment, student); created on first save and mutated
/// thereafter by the persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub status: GradeStatus,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub rubric_selections: Vec<String>,
}

/// A single gradeable criterion. `id` is assigned positionally once and
/// then never recomputed, so retitling an item keeps stored references
/// valid; only deletion invalidates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricItem {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricPart {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub items: Vec<RubricItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricSection {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub items: Vec<RubricItem>,
    #[serde(default)]
    pub parts: Vec<RubricPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricContent {
    #[serde(default)]
    pub sections: Vec<RubricSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rubric {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub assignment_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<RubricType>,
    #[serde(default)]
    pub content: RubricContent,
    #[serde(default)]
    pub is_active: bool,
}

/// A (label, minimum percent) threshold for letter mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterSplit {
    pub label: String,
    pub min_percent: f64,
}
