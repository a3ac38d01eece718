use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::whatif::{GradePatch, Simulator, Snapshot};
use serde_json::json;

fn report_response(req: &Request, sim: &Simulator, extra: Option<(&str, serde_json::Value)>) -> serde_json::Value {
    let report = sim.report();
    let mut result = match serde_json::to_value(&report) {
        Ok(v) => json!({ "report": v }),
        Err(e) => return err(&req.id, "serialize_failed", e.to_string(), None),
    };
    if let Some((key, value)) = extra {
        result[key] = value;
    }
    ok(&req.id, result)
}

fn handle_start(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("snapshot") else {
        return err(&req.id, "bad_params", "missing params.snapshot", None);
    };
    let snapshot: Snapshot = match serde_json::from_value(raw.clone()) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "bad_params", format!("snapshot: {e}"), None),
    };
    let sim = Simulator::start(snapshot);
    let resp = report_response(req, &sim, None);
    state.whatif = Some(sim);
    resp
}

fn with_session<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Simulator, serde_json::Value> {
    state.whatif.as_mut().ok_or_else(|| {
        err(
            &req.id,
            "no_whatif_session",
            "no active what-if session; call whatif.start first",
            None,
        )
    })
}

fn handle_add_assignment(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("What-If Assignment");
    let Some(section_id) = req.params.get("sectionId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.sectionId", None);
    };
    let max_score = req
        .params
        .get("maxScore")
        .and_then(|v| v.as_f64())
        .unwrap_or(100.0);
    let score = req.params.get("score").and_then(|v| v.as_f64());

    let sim = match with_session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let assignment_id = sim.add_assignment(name, section_id, max_score, score);
    report_response(req, sim, Some(("assignmentId", json!(assignment_id))))
}

fn handle_update_assignment(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(assignment_id) = req.params.get("assignmentId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.assignmentId", None);
    };
    let name = req.params.get("name").and_then(|v| v.as_str());
    let section_id = req.params.get("sectionId").and_then(|v| v.as_str());

    let sim = match with_session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    sim.update_assignment(assignment_id, name, section_id);
    report_response(req, sim, None)
}

fn handle_update_grade(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(assignment_id) = req.params.get("assignmentId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.assignmentId", None);
    };
    let patch: GradePatch = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let assignment_id = assignment_id.to_string();
    let sim = match with_session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    sim.update_grade(&assignment_id, &patch);
    report_response(req, sim, None)
}

fn handle_set_section_weight(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(section_id) = req.params.get("sectionId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.sectionId", None);
    };
    let Some(weight) = req.params.get("weight").and_then(|v| v.as_f64()) else {
        return err(&req.id, "bad_params", "missing params.weight", None);
    };

    let section_id = section_id.to_string();
    let sim = match with_session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    sim.set_section_weight(&section_id, weight);
    report_response(req, sim, None)
}

fn handle_set_late_penalty(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(late_penalty) = req.params.get("latePenalty").and_then(|v| v.as_f64()) else {
        return err(&req.id, "bad_params", "missing params.latePenalty", None);
    };

    let sim = match with_session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    sim.set_late_penalty(late_penalty);
    report_response(req, sim, None)
}

fn handle_revert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let sim = match with_session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    sim.revert();
    report_response(req, sim, None)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "whatif.start" => Some(handle_start(state, req)),
        "whatif.addAssignment" => Some(handle_add_assignment(state, req)),
        "whatif.updateAssignment" => Some(handle_update_assignment(state, req)),
        "whatif.updateGrade" => Some(handle_update_grade(state, req)),
        "whatif.setSectionWeight" => Some(handle_set_section_weight(state, req)),
        "whatif.setLatePenalty" => Some(handle_set_late_penalty(state, req)),
        "whatif.revert" => Some(handle_revert(state, req)),
        _ => None,
    }
}
