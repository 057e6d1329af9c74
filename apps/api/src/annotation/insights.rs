//! Turns reviewers' annotations into parsing-quality metrics.
//!
//! Each result item is judged by its control type:
//! * `labels`: the highlighted span should appear in the extracted value of the field the
//!   label names. A hit counts as correct, a miss is recorded as a correction.
//! * `choices` on `section_type`: correct when the reviewer picked the task's section type
//!   (the task's `section_type`, else its section name).
//! * `textarea`: any non-blank text is a correction.
//! * `rating`: below [`LOW_RATING`] is a parsing issue.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::document::FieldStore;
use crate::models::annotation::{
    AnnotatedTask, AnnotationInsights, Correction, ParsingIssue, SectionAccuracy,
};

pub const LOW_RATING: f64 = 3.0;
pub const LOW_ACCURACY: f64 = 0.5;

/// Section name used for tasks that cover a whole document.
pub const DOCUMENT_SECTION: &str = "document";

pub fn analyze(tasks: &[AnnotatedTask]) -> AnnotationInsights {
    let mut insights = AnnotationInsights::default();
    let mut low_rated = BTreeSet::new();

    for task in tasks {
        let section = task.section_name.as_deref().unwrap_or(DOCUMENT_SECTION);
        let fields = task
            .data
            .get("parsed_data")
            .and_then(Value::as_object)
            .map(FieldStore::from_json_object)
            .unwrap_or_default();
        let expected = task
            .data
            .get("section_type")
            .and_then(Value::as_str)
            .unwrap_or(section);

        for annotation in &task.annotations {
            for item in &annotation.result {
                let kind = item.get("type").and_then(Value::as_str).unwrap_or("");
                let from_name = item.get("from_name").and_then(Value::as_str).unwrap_or("");
                let value = item.get("value").unwrap_or(&Value::Null);

                match kind {
                    "labels" => judge_span(&mut insights, &fields, value),
                    "choices" if from_name == "section_type" => {
                        let picked = strings(value.get("choices"));
                        if picked.is_empty() {
                            continue;
                        }
                        let entry = accuracy(&mut insights, section);
                        entry.total += 1;
                        if picked.iter().any(|c| c.eq_ignore_ascii_case(expected)) {
                            entry.correct += 1;
                        }
                    }
                    "textarea" => {
                        let text = strings(value.get("text")).join("\n");
                        if !text.trim().is_empty() {
                            insights.common_corrections.push(Correction {
                                section: section.to_string(),
                                correction: text,
                                original_text: task.original_text.clone(),
                            });
                        }
                    }
                    "rating" => {
                        let rating = value.get("rating").and_then(Value::as_f64).unwrap_or(0.0);
                        if rating < LOW_RATING {
                            insights.parsing_issues.push(ParsingIssue {
                                section: section.to_string(),
                                rating,
                                text: task.original_text.clone(),
                            });
                            low_rated.insert(section.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    let mut flagged: BTreeSet<String> = insights
        .section_accuracy
        .iter()
        .filter(|(_, acc)| acc.total > 0 && acc.ratio() < LOW_ACCURACY)
        .map(|(name, _)| name.clone())
        .collect();
    flagged.extend(low_rated);
    insights.low_accuracy_sections = flagged.into_iter().collect();

    insights
}

fn accuracy<'a>(insights: &'a mut AnnotationInsights, section: &str) -> &'a mut SectionAccuracy {
    insights
        .section_accuracy
        .entry(section.to_string())
        .or_default()
}

fn judge_span(insights: &mut AnnotationInsights, fields: &FieldStore, value: &Value) {
    let span = value
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();

    for label in strings(value.get("labels")) {
        let expected = field_value(fields, &label);
        let hit = !span.is_empty()
            && expected
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&span.to_lowercase()));

        let entry = accuracy(insights, &label);
        entry.total += 1;
        if hit {
            entry.correct += 1;
        } else {
            insights.common_corrections.push(Correction {
                section: label.clone(),
                correction: span.clone(),
                original_text: expected,
            });
        }
    }
}

/// Value of the field a label names, matched case-insensitively. Labels that name no field
/// (fixed vocabularies such as skill categories) are checked against all values.
fn field_value(fields: &FieldStore, label: &str) -> Option<String> {
    if let Some((_, value)) = fields
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label))
    {
        return value.map(str::to_string);
    }
    let all: Vec<&str> = fields.iter().filter_map(|(_, v)| v).collect();
    (!all.is_empty()).then(|| all.join("\n"))
}

/// Accepts a string or an array of strings.
fn strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
