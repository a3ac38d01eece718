use crate::calc::{self, AggregateOptions};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{clamp_rounding, Assignment, Grade, GradeSection, LetterSplit};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateParams {
    #[serde(default)]
    sections: Vec<GradeSection>,
    #[serde(default)]
    assignments: Vec<Assignment>,
    #[serde(default)]
    grades: Vec<Grade>,
    #[serde(default)]
    late_penalty: f64,
    #[serde(default)]
    rounding: Option<i64>,
    #[serde(default)]
    letter_splits: Vec<LetterSplit>,
    #[serde(default)]
    only_graded: bool,
}

fn handle_aggregate(req: &Request) -> serde_json::Value {
    let params: AggregateParams = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let report = calc::aggregate(
        &params.sections,
        &params.assignments,
        &params.grades,
        params.late_penalty,
        clamp_rounding(params.rounding),
        &params.letter_splits,
        AggregateOptions {
            only_graded: params.only_graded,
        },
    );

    match serde_json::to_value(&report) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.aggregate" => Some(handle_aggregate(req)),
        _ => None,
    }
}
