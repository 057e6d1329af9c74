use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::document::FieldStore;

/// Labeling layout used when creating an annotation project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    #[default]
    Generic,
    Resume,
    Skills,
    Education,
}

impl ProjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Generic => "generic",
            ProjectType::Resume => "resume",
            ProjectType::Skills => "skills",
            ProjectType::Education => "education",
        }
    }
}

/// Annotation project identifier. Accepts `42` or `"42"` on the wire, since the
/// editor forwards whatever the user typed into the project-ID box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(ProjectId)
    }
}

impl<'de> Deserialize<'de> for ProjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(ProjectId(n)),
            Raw::Text(s) => s
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid project id '{s}'"))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Export to annotation service
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationExportRequest {
    #[serde(default)]
    pub parsed_data: FieldStore,
    #[serde(default)]
    pub raw_document_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default)]
    pub project_type: ProjectType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationExportResponse {
    pub success: bool,
    pub project_id: ProjectId,
    pub project_name: String,
    pub tasks_created: usize,
    pub label_studio_url: String,
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Import from annotation service
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationImportRequest {
    pub project_id: Option<ProjectId>,
}

/// One human annotation on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAnnotation {
    pub annotator: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub result: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedTask {
    pub task_id: u64,
    #[serde(default)]
    pub section_name: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub data: Value,
    pub annotations: Vec<TaskAnnotation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionAccuracy {
    pub correct: u32,
    pub total: u32,
}

impl SectionAccuracy {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub section: String,
    pub correction: String,
    #[serde(default)]
    pub original_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingIssue {
    pub section: String,
    pub rating: f64,
    #[serde(default)]
    pub text: Option<String>,
}

/// Metrics computed from reviewers' annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationInsights {
    pub section_accuracy: BTreeMap<String, SectionAccuracy>,
    pub common_corrections: Vec<Correction>,
    pub parsing_issues: Vec<ParsingIssue>,
    /// Sections whose accuracy or rating fell below the review threshold.
    pub low_accuracy_sections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedData {
    pub project_id: ProjectId,
    pub project_title: String,
    pub total_tasks: usize,
    pub annotated_tasks: Vec<AnnotatedTask>,
    pub insights: AnnotationInsights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationImportResponse {
    pub success: bool,
    pub annotated_data: AnnotatedData,
    #[serde(default)]
    pub insights_file: Option<String>,
    #[serde(default)]
    pub insights_download_url: Option<String>,
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Batch annotation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchDocument {
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub parsed_data: FieldStore,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchAnnotationRequest {
    #[serde(default)]
    pub documents_to_annotate: Vec<BatchDocument>,
    #[serde(default)]
    pub project_type: ProjectType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchWorkflow {
    pub project_id: ProjectId,
    pub project_name: String,
    pub total_tasks: usize,
    pub label_studio_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAnnotationResponse {
    pub success: bool,
    pub workflow: BatchWorkflow,
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Status and project listing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    pub task_count: u64,
    pub annotation_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub success: bool,
    pub projects: Vec<ProjectSummary>,
    pub total_projects: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    NotConfigured,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationStatus {
    pub success: bool,
    pub status: ConnectionState,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_projects: Option<usize>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setup_instructions: Vec<String>,
}

/// Steps shown whenever the annotation service is missing or unreachable.
pub fn setup_instructions(url: &str) -> Vec<String> {
    vec![
        "1. Start Label Studio: label-studio start".to_string(),
        format!("2. Go to {url} and create an account"),
        "3. Get your API key from the account settings".to_string(),
        "4. Set environment variable: LABEL_STUDIO_API_KEY=your_key".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_id_accepts_number_and_string() {
        let a: AnnotationImportRequest = serde_json::from_value(json!({"project_id": 7})).unwrap();
        let b: AnnotationImportRequest =
            serde_json::from_value(json!({"project_id": " 7 "})).unwrap();
        assert_eq!(a.project_id, Some(ProjectId(7)));
        assert_eq!(b.project_id, Some(ProjectId(7)));
    }

    #[test]
    fn test_project_id_rejects_text() {
        let r = serde_json::from_value::<AnnotationImportRequest>(json!({"project_id": "abc"}));
        assert!(r.is_err());
    }

    #[test]
    fn test_project_type_defaults_to_generic() {
        let req: AnnotationExportRequest =
            serde_json::from_value(json!({"parsed_data": {"Name": "Jane"}})).unwrap();
        assert_eq!(req.project_type, ProjectType::Generic);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(ConnectionState::NotConfigured).unwrap(),
            json!("not_configured")
        );
    }
}
