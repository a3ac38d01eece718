use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::model::RubricContent;
use crate::rubric::SatisfiedRef;

/// Isolate the one JSON object expected inside free-form generator output:
/// drop code-fence lines, trim to the outermost braces, strip trailing
/// commas, then parse strictly. Anything still unparseable is a hard
/// failure for the calling request.
pub fn extract_json_object(text: &str) -> Result<serde_json::Value> {
    let unfenced: String = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    let start = unfenced.find('{');
    let end = unfenced.rfind('}');
    let (Some(start), Some(end)) = (start, end) else {
        bail!("generated output contains no JSON object");
    };
    if end < start {
        bail!("generated output contains no JSON object");
    }

    let cleaned = strip_trailing_commas(&unfenced[start..=end]);
    serde_json::from_str(&cleaned).context("generated output is not valid JSON after cleanup")
}

/// Remove commas that directly precede a closing brace or bracket, outside
/// string literals. Generators emit these constantly and serde_json
/// rightly rejects them.
fn strip_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = json.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().copied().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// A drafted rubric tree from the generation collaborator. Accepts either
/// the bare `{sections: [...]}` shape or a full record wrapped in
/// `{content: {...}}`.
pub fn parse_generated_rubric(text: &str) -> Result<RubricContent> {
    let value = extract_json_object(text)?;
    let tree = match value.get("content") {
        Some(inner) if inner.is_object() => inner.clone(),
        _ => value,
    };
    serde_json::from_value(tree).context("generated rubric does not match the expected shape")
}

#[derive(Debug, Deserialize)]
struct GeneratedGrading {
    #[serde(default)]
    satisfied: Vec<SatisfiedRef>,
}

/// Satisfied-criteria refs from an automated grading pass. The refs are
/// untrusted; the reconciler's two-stage matching absorbs wrong ids.
pub fn parse_generated_refs(text: &str) -> Result<Vec<SatisfiedRef>> {
    let value = extract_json_object(text)?;
    let grading: GeneratedGrading = serde_json::from_value(value)
        .context("generated grading does not match the expected shape")?;
    Ok(grading.satisfied)
}
