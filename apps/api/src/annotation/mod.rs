// Bridge to the Label Studio annotation service: project setup, task export,
// annotation import and insight computation.

pub mod client;
pub mod configs;
pub mod handlers;
pub mod insights;

use serde_json::{json, Value};

pub use client::{LabelStudioClient, LabelStudioError};

use crate::annotation::client::NewTask;
use crate::annotation::configs::resume_section;
use crate::annotation::insights::DOCUMENT_SECTION;
use crate::document::sync::display_value;
use crate::document::FieldStore;
use crate::models::annotation::ProjectType;

/// Title used when the caller does not name the project.
pub fn default_project_name(project_type: ProjectType) -> &'static str {
    match project_type {
        ProjectType::Generic => "Document Annotation",
        ProjectType::Resume => "Resume Data Annotation",
        ProjectType::Skills => "Skill Extraction",
        ProjectType::Education => "Education Validation",
    }
}

/// Task payload for one document. `document_text` is what reviewers annotate; when the raw
/// text is missing the extracted fields are shown instead.
pub fn document_task(raw_text: &str, fields: &FieldStore, section_name: &str) -> Value {
    let preview = serde_json::to_string_pretty(fields).unwrap_or_default();
    let text = if raw_text.trim().is_empty() {
        fields
            .iter()
            .filter_map(|(name, value)| value.map(|v| format!("{name}: {v}")))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        raw_text.to_string()
    };

    json!({
        "document_text": text,
        "parsed_data": fields,
        "parsed_data_preview": preview,
        "section_name": section_name,
        "timestamp": chrono::Local::now().to_rfc3339(),
    })
}

/// Tasks for one document. Resume projects get one task per present field so reviewers can
/// classify each section; every other project type annotates the whole document.
pub fn build_tasks(
    project_type: ProjectType,
    raw_text: &str,
    fields: &FieldStore,
) -> Vec<NewTask> {
    if project_type == ProjectType::Resume {
        let tasks: Vec<NewTask> = fields
            .iter()
            .filter_map(|(name, value)| {
                let value = value?;
                let mut data = document_task(&display_value(value), fields, name);
                data["section_type"] = Value::from(resume_section(name));
                Some(NewTask { data })
            })
            .collect();
        if !tasks.is_empty() {
            return tasks;
        }
    }
    vec![NewTask {
        data: document_task(raw_text, fields, DOCUMENT_SECTION),
    }]
}
