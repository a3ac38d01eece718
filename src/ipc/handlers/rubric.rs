use crate::ingest;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::Rubric;
use crate::rubric::{self, SatisfiedRef};
use serde_json::json;

fn parse_rubric(req: &Request) -> Result<Rubric, serde_json::Value> {
    let Some(raw) = req.params.get("rubric") else {
        return Err(err(&req.id, "bad_params", "missing params.rubric", None));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("rubric: {e}"), None))
}

/// Satisfied input comes in two shapes: bare item-id strings (UI toggles
/// sending a stored selection set) and full ref objects (automated
/// grading). Both land in the same reconcile call.
fn parse_satisfied(req: &Request) -> Result<Vec<SatisfiedRef>, serde_json::Value> {
    let Some(raw) = req.params.get("satisfied") else {
        return Err(err(&req.id, "bad_params", "missing params.satisfied", None));
    };
    let Some(entries) = raw.as_array() else {
        return Err(err(
            &req.id,
            "bad_params",
            "params.satisfied must be an array",
            None,
        ));
    };

    let mut refs: Vec<SatisfiedRef> = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        if let Some(id) = entry.as_str() {
            refs.push(SatisfiedRef {
                item_id: Some(id.to_string()),
                ..SatisfiedRef::default()
            });
            continue;
        }
        match serde_json::from_value::<SatisfiedRef>(entry.clone()) {
            Ok(r) => refs.push(r),
            Err(e) => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    format!("satisfied[{i}]: {e}"),
                    Some(json!({ "index": i })),
                ))
            }
        }
    }
    Ok(refs)
}

fn handle_assign_ids(req: &Request) -> serde_json::Value {
    let mut r = match parse_rubric(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    rubric::assign_ids(&mut r.content);
    match serde_json::to_value(&r) {
        Ok(v) => ok(&req.id, json!({ "rubric": v })),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

fn handle_validate(req: &Request) -> serde_json::Value {
    let r = match parse_rubric(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let expected = req
        .params
        .get("expectedPoints")
        .or_else(|| req.params.get("maxScore"))
        .and_then(|v| v.as_f64());
    let Some(expected) = expected else {
        return err(
            &req.id,
            "bad_params",
            "missing params.expectedPoints (or params.maxScore)",
            None,
        );
    };
    let check = rubric::validate_points(&r.content, expected);
    ok(&req.id, json!(check))
}

fn handle_reconcile(req: &Request) -> serde_json::Value {
    let r = match parse_rubric(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let all = req
        .params
        .get("all")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let refs = if all {
        rubric::all_refs(&r.content)
    } else {
        match parse_satisfied(req) {
            Ok(refs) => refs,
            Err(resp) => return resp,
        }
    };
    let out = rubric::reconcile(&r.content, &refs);
    match serde_json::to_value(&out) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

fn handle_parse_generated(req: &Request) -> serde_json::Value {
    let Some(text) = req.params.get("text").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.text", None);
    };
    let mut content = match ingest::parse_generated_rubric(text) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "generated_parse_failed", format!("{e:#}"), None),
    };
    rubric::assign_ids(&mut content);

    let check = req
        .params
        .get("expectedPoints")
        .and_then(|v| v.as_f64())
        .map(|expected| rubric::validate_points(&content, expected));

    let mut result = json!({ "rubric": { "content": content } });
    if let Some(check) = check {
        result["check"] = json!(check);
    }
    ok(&req.id, result)
}

fn handle_reconcile_generated(req: &Request) -> serde_json::Value {
    let r = match parse_rubric(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let Some(text) = req.params.get("text").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.text", None);
    };
    let refs = match ingest::parse_generated_refs(text) {
        Ok(refs) => refs,
        Err(e) => return err(&req.id, "generated_parse_failed", format!("{e:#}"), None),
    };
    let out = rubric::reconcile(&r.content, &refs);
    match serde_json::to_value(&out) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "rubric.assignIds" => Some(handle_assign_ids(req)),
        "rubric.validate" => Some(handle_validate(req)),
        "rubric.reconcile" => Some(handle_reconcile(req)),
        "rubric.parseGenerated" => Some(handle_parse_generated(req)),
        "grading.reconcileGenerated" => Some(handle_reconcile_generated(req)),
        _ => None,
    }
}
