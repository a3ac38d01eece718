use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{RubricContent, RubricItem};

pub const POINTS_TOLERANCE: f64 = 0.01;

/// Fill in missing structural ids from tree positions: `section-{s}`,
/// `part-{s}-{p}`, `item-{s}-{p}-{i}`, and `item-{s}-{i}` for items that
/// hang directly off a section. Ids already present are kept verbatim, so
/// appending a section never renumbers what students' saved selections
/// point at.
pub fn assign_ids(content: &mut RubricContent) {
    for (s, section) in content.sections.iter_mut().enumerate() {
        if section.id.is_none() {
            section.id = Some(format!("section-{s}"));
        }
        for (i, item) in section.items.iter_mut().enumerate() {
            if item.id.is_none() {
                item.id = Some(format!("item-{s}-{i}"));
            }
        }
        for (p, part) in section.parts.iter_mut().enumerate() {
            if part.id.is_none() {
                part.id = Some(format!("part-{s}-{p}"));
            }
            for (i, item) in part.items.iter_mut().enumerate() {
                if item.id.is_none() {
                    item.id = Some(format!("item-{s}-{p}-{i}"));
                }
            }
        }
    }
}

/// Maximum achievable score: every item reachable through exactly one tree
/// path (section-level items plus each part's items).
pub fn total_points(content: &RubricContent) -> f64 {
    let mut total = 0.0;
    for section in &content.sections {
        for item in &section.items {
            total += item.points;
        }
        for part in &section.parts {
            for item in &part.items {
                total += item.points;
            }
        }
    }
    total
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsCheck {
    pub total_points: f64,
    pub is_valid: bool,
    pub expected_points: f64,
}

/// Advisory comparison against the assignment's maxScore. An out-of-balance
/// rubric is a warning the caller may still save, so this is data, not an
/// error.
pub fn validate_points(content: &RubricContent, expected_points: f64) -> PointsCheck {
    let total = total_points(content);
    PointsCheck {
        total_points: total,
        is_valid: (total - expected_points).abs() <= POINTS_TOLERANCE,
        expected_points,
    }
}

/// One satisfied-criterion reference from a grading action. The itemId may
/// be missing or stale when the ref comes from an automated grader, hence
/// the title pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SatisfiedRef {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub criterion: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
struct FlatItem {
    section_title: String,
    item: RubricItem,
}

/// Flattened lookup tables over one rubric tree: canonical id map plus the
/// `"{sectionTitle}||{itemTitle}"` fallback map (title keys lowercased).
struct ItemIndex {
    flat: Vec<FlatItem>,
    by_id: HashMap<String, usize>,
    by_title: HashMap<String, usize>,
}

fn title_key(section: &str, criterion: &str) -> String {
    format!(
        "{}||{}",
        section.trim().to_lowercase(),
        criterion.trim().to_lowercase()
    )
}

fn index_items(content: &RubricContent) -> ItemIndex {
    let mut flat: Vec<FlatItem> = Vec::new();
    for section in &content.sections {
        for item in &section.items {
            flat.push(FlatItem {
                section_title: section.title.clone(),
                item: item.clone(),
            });
        }
        for part in &section.parts {
            for item in &part.items {
                flat.push(FlatItem {
                    section_title: section.title.clone(),
                    item: item.clone(),
                });
            }
        }
    }

    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut by_title: HashMap<String, usize> = HashMap::new();
    for (idx, entry) in flat.iter().enumerate() {
        if let Some(id) = entry.item.id.as_deref() {
            by_id.entry(id.to_string()).or_insert(idx);
        }
        by_title
            .entry(title_key(&entry.section_title, &entry.item.title))
            .or_insert(idx);
    }

    ItemIndex {
        flat,
        by_id,
        by_title,
    }
}

fn resolve_by_id<'a>(index: &'a ItemIndex, satisfied: &SatisfiedRef) -> Option<&'a FlatItem> {
    let id = satisfied.item_id.as_deref()?;
    index.by_id.get(id).map(|&idx| &index.flat[idx])
}

fn resolve_by_title<'a>(index: &'a ItemIndex, satisfied: &SatisfiedRef) -> Option<&'a FlatItem> {
    if satisfied.criterion.trim().is_empty() {
        return None;
    }
    index
        .by_title
        .get(&title_key(&satisfied.section, &satisfied.criterion))
        .map(|&idx| &index.flat[idx])
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileHit {
    pub section: String,
    pub criterion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub points: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub total: f64,
    pub hits: Vec<ReconcileHit>,
    pub feedback_text: String,
}

/// Match satisfied refs back to canonical point values: id map first, title
/// pair second, unmatched contributes 0. Matched refs get their itemId
/// backfilled so the persisted grade carries a durable pointer. Every
/// scoring entry point (single toggle, check-all/uncheck-all, automated
/// grading) goes through here; identical inputs give identical output.
pub fn reconcile(content: &RubricContent, satisfied: &[SatisfiedRef]) -> Reconciliation {
    let index = index_items(content);

    let mut total = 0.0;
    let mut hits: Vec<ReconcileHit> = Vec::with_capacity(satisfied.len());

    for s in satisfied {
        let matched = resolve_by_id(&index, s).or_else(|| resolve_by_title(&index, s));
        let hit = match matched {
            Some(entry) => {
                total += entry.item.points;
                ReconcileHit {
                    section: if s.section.trim().is_empty() {
                        entry.section_title.clone()
                    } else {
                        s.section.clone()
                    },
                    criterion: if s.criterion.trim().is_empty() {
                        entry.item.title.clone()
                    } else {
                        s.criterion.clone()
                    },
                    item_id: entry.item.id.clone().or_else(|| s.item_id.clone()),
                    points: entry.item.points,
                    comment: s
                        .comment
                        .clone()
                        .filter(|c| !c.trim().is_empty())
                        .or_else(|| entry.item.feedback.clone()),
                }
            }
            None => ReconcileHit {
                section: s.section.clone(),
                criterion: s.criterion.clone(),
                item_id: s.item_id.clone(),
                points: 0.0,
                comment: s.comment.clone(),
            },
        };
        hits.push(hit);
    }

    let feedback_text = hits
        .iter()
        .filter_map(|h| h.comment.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    Reconciliation {
        total,
        hits,
        feedback_text,
    }
}

/// Full-set input for "check all": one ref per item, in tree order.
/// "Uncheck all" is reconcile over the empty slice; neither has its own
/// scoring path.
pub fn all_refs(content: &RubricContent) -> Vec<SatisfiedRef> {
    index_items(content)
        .flat
        .iter()
        .map(|entry| SatisfiedRef {
            item_id: entry.item.id.clone(),
            section: entry.section_title.clone(),
            criterion: entry.item.title.clone(),
            comment: None,
        })
        .collect()
}

/// Stored `Grade.rubricSelections` ids as reconciler input. Ids orphaned by
/// a later rubric edit simply resolve to nothing and contribute 0.
pub fn refs_from_selection(item_ids: &[String]) -> Vec<SatisfiedRef> {
    item_ids
        .iter()
        .map(|id| SatisfiedRef {
            item_id: Some(id.clone()),
            ..SatisfiedRef::default()
        })
        .collect()
}
