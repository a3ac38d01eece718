use serde::Deserialize;
use uuid::Uuid;

use crate::calc::{self, AggregateOptions, GradeReport};
use crate::model::{clamp_rounding, Assignment, Grade, GradeSection, GradeStatus, LetterSplit};

/// Everything the simulator needs, captured at activation time. The
/// simulator owns its copy outright; nothing here aliases or writes back
/// to the caller's records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub sections: Vec<GradeSection>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub grades: Vec<Grade>,
    #[serde(default)]
    pub late_penalty: f64,
    #[serde(default)]
    pub rounding: Option<i64>,
    #[serde(default)]
    pub letter_splits: Vec<LetterSplit>,
    #[serde(default)]
    pub only_graded: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradePatch {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub status: Option<GradeStatus>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Speculative gradebook over a private clone. Every operation is total:
/// unknown ids are no-ops, and nothing is ever persisted or merged back.
#[derive(Debug, Clone)]
pub struct Simulator {
    original: Snapshot,
    working: Snapshot,
}

impl Simulator {
    pub fn start(snapshot: Snapshot) -> Self {
        Simulator {
            original: snapshot.clone(),
            working: snapshot,
        }
    }

    pub fn report(&self) -> GradeReport {
        let w = &self.working;
        calc::aggregate(
            &w.sections,
            &w.assignments,
            &w.grades,
            w.late_penalty,
            clamp_rounding(w.rounding),
            &w.letter_splits,
            AggregateOptions {
                only_graded: w.only_graded,
            },
        )
    }

    fn student_id(&self) -> String {
        self.working
            .grades
            .first()
            .map(|g| g.student_id.clone())
            .unwrap_or_else(|| "what-if".to_string())
    }

    /// Add a client-only assignment, optionally with a speculative score.
    /// Returns the ephemeral id so follow-up edits can target it.
    pub fn add_assignment(
        &mut self,
        name: &str,
        section_id: &str,
        max_score: f64,
        score: Option<f64>,
    ) -> String {
        let id = format!("whatif-{}", Uuid::new_v4());
        self.working.assignments.push(Assignment {
            id: id.clone(),
            course_id: None,
            section_id: section_id.to_string(),
            name: name.to_string(),
            due_date: None,
            max_score,
            kind: None,
        });
        if let Some(score) = score {
            let student_id = self.student_id();
            self.working.grades.push(Grade {
                id: format!("whatif-{}", Uuid::new_v4()),
                assignment_id: id.clone(),
                student_id,
                score,
                status: GradeStatus::OnTime,
                submitted_at: None,
                comment: None,
                is_published: false,
                rubric_selections: Vec::new(),
            });
        }
        id
    }

    pub fn update_assignment(
        &mut self,
        assignment_id: &str,
        name: Option<&str>,
        section_id: Option<&str>,
    ) {
        let Some(a) = self
            .working
            .assignments
            .iter_mut()
            .find(|a| a.id == assignment_id)
        else {
            return;
        };
        if let Some(name) = name {
            a.name = name.to_string();
        }
        if let Some(section_id) = section_id {
            a.section_id = section_id.to_string();
        }
    }

    /// Edit the grade for an assignment in place, creating a speculative
    /// grade when the assignment was not yet graded.
    pub fn update_grade(&mut self, assignment_id: &str, patch: &GradePatch) {
        if !self.working.assignments.iter().any(|a| a.id == assignment_id) {
            return;
        }
        let student_id = self.student_id();
        let idx = match self
            .working
            .grades
            .iter()
            .position(|g| g.assignment_id == assignment_id)
        {
            Some(i) => i,
            None => {
                self.working.grades.push(Grade {
                    id: format!("whatif-{}", Uuid::new_v4()),
                    assignment_id: assignment_id.to_string(),
                    student_id,
                    score: 0.0,
                    status: GradeStatus::OnTime,
                    submitted_at: None,
                    comment: None,
                    is_published: false,
                    rubric_selections: Vec::new(),
                });
                self.working.grades.len() - 1
            }
        };
        let grade = &mut self.working.grades[idx];
        if let Some(score) = patch.score {
            grade.score = score;
        }
        if let Some(status) = patch.status {
            grade.status = status;
        }
        if let Some(submitted_at) = patch.submitted_at.as_ref() {
            grade.submitted_at = Some(submitted_at.clone());
        }
        if let Some(comment) = patch.comment.as_ref() {
            grade.comment = Some(comment.clone());
        }
    }

    pub fn set_section_weight(&mut self, section_id: &str, weight: f64) {
        if let Some(s) = self
            .working
            .sections
            .iter_mut()
            .find(|s| s.id == section_id)
        {
            s.weight = weight;
        }
    }

    pub fn set_late_penalty(&mut self, late_penalty: f64) {
        self.working.late_penalty = late_penalty;
    }

    /// Discard every speculative edit and return to the activation-time
    /// snapshot.
    pub fn revert(&mut self) {
        self.working = self.original.clone();
    }
}
