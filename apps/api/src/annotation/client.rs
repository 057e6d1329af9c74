/// Label Studio REST client.
///
/// Only the four calls the bridge needs: list projects, create a project, import tasks,
/// export annotated tasks. Authentication uses the legacy `Token` scheme.
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::annotation::ProjectId;

#[derive(Debug, Error)]
pub enum LabelStudioError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Project as returned by `/api/projects`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProject {
    pub id: ProjectId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub task_number: Option<u64>,
    #[serde(default)]
    pub total_annotations_number: Option<u64>,
}

/// `/api/projects` is paginated on recent servers and a bare list on older ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProjectPage {
    Paged { results: Vec<RemoteProject> },
    Plain(Vec<RemoteProject>),
}

#[derive(Serialize)]
struct CreateProject<'a> {
    title: &'a str,
    label_config: &'a str,
}

/// One task to import; `data` keys must match the `$vars` of the labeling config.
#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub data: Value,
}

#[derive(Debug, Deserialize)]
struct ImportSummary {
    #[serde(default)]
    task_count: Option<usize>,
}

/// Task with its annotations, from the JSON export.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportedTask {
    pub id: u64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub annotations: Vec<ExportedAnnotation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportedAnnotation {
    #[serde(default)]
    pub completed_by: Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub result: Vec<Value>,
}

impl ExportedAnnotation {
    /// `completed_by` is a user id, or an expanded user object depending on the export options.
    pub fn annotator(&self) -> String {
        match &self.completed_by {
            Value::Object(user) => ["username", "email"]
                .iter()
                .find_map(|k| user.get(*k).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown")
                .to_string(),
            Value::Number(id) => format!("user {id}"),
            _ => "Unknown".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct LabelStudioClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LabelStudioClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Page in the web UI where a project's tasks are listed.
    pub fn project_url(&self, id: ProjectId) -> String {
        format!("{}/projects/{id}/data", self.base_url)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    fn auth(&self) -> String {
        format!("Token {}", self.api_key)
    }

    async fn check(response: Response) -> Result<Response, LabelStudioError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("detail")
                    .or_else(|| v.get("error"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(body);
        Err(LabelStudioError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn list_projects(&self) -> Result<Vec<RemoteProject>, LabelStudioError> {
        let response = self
            .client
            .get(self.url("/projects"))
            .query(&[("page_size", "1000")])
            .header("Authorization", self.auth())
            .send()
            .await?;
        let page: ProjectPage = Self::check(response).await?.json().await?;
        Ok(match page {
            ProjectPage::Paged { results } => results,
            ProjectPage::Plain(list) => list,
        })
    }

    pub async fn get_project(&self, id: ProjectId) -> Result<RemoteProject, LabelStudioError> {
        let response = self
            .client
            .get(self.url(&format!("/projects/{id}")))
            .header("Authorization", self.auth())
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_project(
        &self,
        title: &str,
        label_config: &str,
    ) -> Result<RemoteProject, LabelStudioError> {
        let response = self
            .client
            .post(self.url("/projects"))
            .header("Authorization", self.auth())
            .json(&CreateProject {
                title,
                label_config,
            })
            .send()
            .await?;
        let project: RemoteProject = Self::check(response).await?.json().await?;
        debug!("Created Label Studio project {} ({})", project.title, project.id);
        Ok(project)
    }

    /// Returns the number of tasks the server reports as created.
    pub async fn import_tasks(
        &self,
        id: ProjectId,
        tasks: &[NewTask],
    ) -> Result<usize, LabelStudioError> {
        let response = self
            .client
            .post(self.url(&format!("/projects/{id}/import")))
            .header("Authorization", self.auth())
            .json(tasks)
            .send()
            .await?;
        let summary: ImportSummary = Self::check(response).await?.json().await?;
        Ok(summary.task_count.unwrap_or(tasks.len()))
    }

    pub async fn export_tasks(&self, id: ProjectId) -> Result<Vec<ExportedTask>, LabelStudioError> {
        let response = self
            .client
            .get(self.url(&format!("/projects/{id}/export")))
            .query(&[("exportType", "JSON")])
            .header("Authorization", self.auth())
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}
