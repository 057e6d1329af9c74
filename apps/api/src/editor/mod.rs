//! Editor session: owns the editing state and drives the backend.
//!
//! Field edits mark the view stale and schedule a regeneration through [`Debouncer`];
//! [`EditorSession::settle`] waits for the quiet window and then rebuilds the delta and its
//! markup from the Field Store. Requests that must not overlap are gated by `loading`.

pub mod debounce;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{ClientError, EditorBackend};
use crate::document::{fields_to_delta, render_html, Delta, ExtractedSnapshot, FieldStore};
use crate::models::annotation::{
    AnnotationExportRequest, AnnotationExportResponse, AnnotationImportRequest,
    AnnotationImportResponse, AnnotationStatus, ConnectionState, ProjectId, ProjectSummary,
    ProjectType,
};
use crate::models::document::{ExportRequest, ExportResponse, SaveRequest, UploadResponse};

pub use debounce::{Debouncer, DEBOUNCE_WINDOW};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditorPhase {
    /// No delta; the placeholder is shown.
    #[default]
    Empty,
    Rendering,
    /// Store mutated, regeneration pending.
    Editing,
}

#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub id: Uuid,
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Everything needed to send an upload after the session borrow is released.
#[derive(Debug, Clone)]
pub struct UploadTicket {
    pub id: Uuid,
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub file: Option<SelectedFile>,
    pub fields: FieldStore,
    pub field_order: Vec<String>,
    pub extracted: Option<ExtractedSnapshot>,
    pub delta: Delta,
    pub html: String,
    pub raw_text: Option<String>,
    pub loading: bool,
    /// Dismissible error banner.
    pub error: Option<String>,
    /// Last success message.
    pub notice: Option<String>,
    pub annotation_status: Option<AnnotationStatus>,
    pub annotation_projects: Vec<ProjectSummary>,
    pub last_annotation_export: Option<AnnotationExportResponse>,
    pub last_annotation_import: Option<AnnotationImportResponse>,
    pub last_export: Option<ExportResponse>,
    pub phase: EditorPhase,
    pub regenerations: u64,
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("{0}")]
    UserInput(String),

    #[error("Another request is still in progress")]
    Busy,

    #[error(transparent)]
    Request(#[from] ClientError),
}

pub struct EditorSession<B: EditorBackend> {
    backend: B,
    state: EditorState,
    debounce: Debouncer<u64>,
    revision: u64,
}

impl<B: EditorBackend> EditorSession<B> {
    pub fn new(backend: B) -> Self {
        Self::with_window(backend, DEBOUNCE_WINDOW)
    }

    pub fn with_window(backend: B, window: std::time::Duration) -> Self {
        Self {
            backend,
            state: EditorState::default(),
            debounce: Debouncer::new(window),
            revision: 0,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ── File selection and upload ───────────────────────────────────────────

    /// Selects a file and resets every document-derived value. Returns the upload ticket id.
    pub fn select_file(
        &mut self,
        name: impl Into<String>,
        content_type: Option<String>,
        bytes: Bytes,
    ) -> Uuid {
        self.reset_document();
        let id = Uuid::new_v4();
        self.state.file = Some(SelectedFile {
            id,
            name: name.into(),
            content_type,
            bytes,
        });
        id
    }

    /// Deselects the file and empties the editor.
    pub fn clear(&mut self) {
        self.reset_document();
        self.state.file = None;
    }

    fn reset_document(&mut self) {
        self.debounce.cancel();
        self.revision += 1;
        let s = &mut self.state;
        s.fields.clear();
        s.field_order.clear();
        s.extracted = None;
        s.delta = Delta::new();
        s.html.clear();
        s.raw_text = None;
        s.error = None;
        s.notice = None;
        s.last_export = None;
        // A response for the previous file will be discarded, so nothing is in flight for us.
        s.loading = false;
        s.phase = EditorPhase::Empty;
    }

    pub fn begin_upload(&mut self) -> Result<UploadTicket, EditorError> {
        let Some(file) = &self.state.file else {
            return Err(self.input_error("Please select a file first."));
        };
        let ticket = UploadTicket {
            id: file.id,
            name: file.name.clone(),
            content_type: file.content_type.clone(),
            bytes: file.bytes.clone(),
        };
        self.start_request()?;
        Ok(ticket)
    }

    /// Applies an upload result. Returns `false` when the ticket no longer matches the
    /// selected file and the result was discarded.
    pub fn finish_upload(
        &mut self,
        ticket: Uuid,
        result: Result<UploadResponse, ClientError>,
    ) -> Result<bool, EditorError> {
        if self.state.file.as_ref().map(|f| f.id) != Some(ticket) {
            debug!("Discarding upload response for stale ticket {ticket}");
            return Ok(false);
        }
        self.state.loading = false;

        match result {
            Ok(response) => {
                let s = &mut self.state;
                s.extracted = Some(ExtractedSnapshot::capture(&response.parsed_data));
                s.fields = response.parsed_data;
                s.field_order = response.parsed_data_order;
                s.raw_text = response.raw_text_content;
                s.html = render_html(&response.quill_content_delta);
                s.delta = response.quill_content_delta;
                s.phase = if s.delta.is_empty() {
                    EditorPhase::Empty
                } else {
                    EditorPhase::Rendering
                };
                s.error = None;
                s.notice = Some("File processed successfully".into());
                info!("Upload processed: {} fields", s.fields.len());
                Ok(true)
            }
            Err(e) => Err(self.request_error(e)),
        }
    }

    pub async fn upload(&mut self) -> Result<bool, EditorError> {
        let ticket = self.begin_upload()?;
        let result = self
            .backend
            .upload(&ticket.name, ticket.content_type.as_deref(), ticket.bytes)
            .await;
        self.finish_upload(ticket.id, result)
    }

    // ── Editing ─────────────────────────────────────────────────────────────

    /// Updates one field and schedules a debounced regeneration.
    pub fn edit_field(&mut self, name: &str, value: Option<String>) {
        self.state.fields.set(name, value);
        self.state.phase = EditorPhase::Editing;
        self.revision += 1;
        self.debounce.trigger(self.revision);
    }

    /// Waits out the quiet window and regenerates. Returns `false` when nothing was pending.
    pub async fn settle(&mut self) -> bool {
        while self.state.phase == EditorPhase::Editing {
            match self.debounce.tick().await {
                Some(rev) if rev == self.revision => {
                    self.regenerate();
                    return true;
                }
                Some(stale) => debug!("Skipping stale regeneration {stale}"),
                None => break,
            }
        }
        false
    }

    /// Rebuilds the delta and markup from the Field Store.
    pub fn regenerate(&mut self) {
        let s = &mut self.state;
        s.delta = fields_to_delta(&s.fields, &s.field_order);
        s.html = render_html(&s.delta);
        s.regenerations += 1;
        s.phase = if s.delta.is_empty() {
            EditorPhase::Empty
        } else {
            EditorPhase::Rendering
        };
    }

    /// Regenerates now if an edit is still waiting for its window.
    fn flush(&mut self) {
        if self.state.phase == EditorPhase::Editing {
            self.debounce.cancel();
            self.regenerate();
        }
    }

    // ── Save and export ─────────────────────────────────────────────────────

    pub async fn save(&mut self) -> Result<String, EditorError> {
        self.flush();
        if self.state.fields.is_empty() && self.state.delta.is_empty() {
            return Err(self.input_error("Nothing to save yet. Upload a document first."));
        }
        self.start_request()?;
        let req = SaveRequest {
            edited_data: self.state.fields.clone(),
            quill_content_delta: self.state.delta.clone(),
        };
        let result = self.backend.save(&req).await;
        let response = self.finish_request(result)?;
        self.state.notice = Some(response.message.clone());
        Ok(response.message)
    }

    pub async fn export(&mut self) -> Result<ExportResponse, EditorError> {
        self.flush();
        if self.state.delta.text().trim().is_empty() {
            return Err(self.input_error("No content to export"));
        }
        self.start_request()?;
        let req = ExportRequest {
            quill_content_delta: self.state.delta.clone(),
        };
        let result = self.backend.export(&req).await;
        let response = self.finish_request(result)?;
        self.state.notice = Some(response.message.clone());
        self.state.last_export = Some(response.clone());
        Ok(response)
    }

    // ── Annotation bridge ───────────────────────────────────────────────────

    pub async fn export_to_annotation(
        &mut self,
        project_type: ProjectType,
        project_name: Option<String>,
    ) -> Result<AnnotationExportResponse, EditorError> {
        if self.state.fields.is_empty() {
            return Err(self.input_error("No parsed data to export. Upload a document first."));
        }
        self.start_request()?;
        let req = AnnotationExportRequest {
            parsed_data: self.state.fields.clone(),
            raw_document_text: self.state.raw_text.clone().unwrap_or_default(),
            project_name,
            project_type,
        };
        let result = self.backend.export_annotations(&req).await;
        let response = self.finish_request(result)?;
        self.state.notice = Some(response.message.clone());
        self.state.last_annotation_export = Some(response.clone());
        Ok(response)
    }

    /// `project_id` is the raw text of the project-ID box.
    pub async fn import_annotations(
        &mut self,
        project_id: &str,
    ) -> Result<AnnotationImportResponse, EditorError> {
        let trimmed = project_id.trim();
        if trimmed.is_empty() {
            return Err(self.input_error("Please enter a project ID"));
        }
        let Ok(id) = trimmed.parse::<ProjectId>() else {
            return Err(self.input_error("Project ID must be a number"));
        };
        self.start_request()?;
        let req = AnnotationImportRequest {
            project_id: Some(id),
        };
        let result = self.backend.import_annotations(&req).await;
        let response = self.finish_request(result)?;
        self.state.notice = Some(response.message.clone());
        self.state.last_annotation_import = Some(response.clone());
        Ok(response)
    }

    /// Never fails: an unreachable backend is recorded as a `disconnected` status.
    pub async fn refresh_annotation_status(&mut self) -> ConnectionState {
        let status = match self.backend.annotation_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!("Annotation status check failed: {e}");
                AnnotationStatus {
                    success: false,
                    status: ConnectionState::Disconnected,
                    url: String::new(),
                    total_projects: None,
                    message: "Could not reach the annotation service".into(),
                    error: Some(e.to_string()),
                    setup_instructions: Vec::new(),
                }
            }
        };
        let state = status.status;
        self.state.annotation_status = Some(status);
        state
    }

    pub async fn load_annotation_projects(&mut self) -> Result<usize, EditorError> {
        self.start_request()?;
        let result = self.backend.annotation_projects().await;
        let response = self.finish_request(result)?;
        self.state.annotation_projects = response.projects;
        Ok(self.state.annotation_projects.len())
    }

    pub fn dismiss_error(&mut self) {
        self.state.error = None;
    }

    // ── Request bookkeeping ─────────────────────────────────────────────────

    fn start_request(&mut self) -> Result<(), EditorError> {
        if self.state.loading {
            return Err(EditorError::Busy);
        }
        self.state.loading = true;
        self.state.error = None;
        Ok(())
    }

    fn finish_request<T>(&mut self, result: Result<T, ClientError>) -> Result<T, EditorError> {
        self.state.loading = false;
        result.map_err(|e| self.request_error(e))
    }

    fn request_error(&mut self, e: ClientError) -> EditorError {
        warn!("Request failed: {e}");
        self.state.error = Some(e.to_string());
        EditorError::Request(e)
    }

    fn input_error(&mut self, message: &str) -> EditorError {
        self.state.error = Some(message.to_string());
        EditorError::UserInput(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::document::Run;
    use crate::models::annotation::{AnnotatedData, AnnotationInsights, ProjectListResponse};
    use crate::models::document::SaveResponse;

    #[derive(Default)]
    struct FakeBackend {
        fail_upload: Option<String>,
        status_unreachable: bool,
        calls: Mutex<Vec<String>>,
        saved: Mutex<Option<SaveRequest>>,
    }

    impl FakeBackend {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn upload_response() -> UploadResponse {
        serde_json::from_value(json!({
            "quill_content_delta": [{"insert": "John Doe\nj@x.com\n"}],
            "parsed_data": {"name": "John Doe", "email": "j@x.com"},
            "parsed_data_order": ["name", "email"],
            "raw_text_content": "John Doe\nj@x.com\n"
        }))
        .unwrap()
    }

    #[async_trait]
    impl EditorBackend for FakeBackend {
        async fn upload(
            &self,
            filename: &str,
            _content_type: Option<&str>,
            _bytes: Bytes,
        ) -> Result<UploadResponse, ClientError> {
            self.record(&format!("upload {filename}"));
            match &self.fail_upload {
                Some(message) => Err(ClientError::Api {
                    status: 400,
                    message: message.clone(),
                }),
                None => Ok(upload_response()),
            }
        }

        async fn save(&self, req: &SaveRequest) -> Result<SaveResponse, ClientError> {
            self.record("save");
            *self.saved.lock().unwrap() = Some(req.clone());
            Ok(SaveResponse {
                message: "Document saved successfully".into(),
            })
        }

        async fn export(&self, _req: &ExportRequest) -> Result<ExportResponse, ClientError> {
            self.record("export");
            Ok(ExportResponse {
                message: "PDF exported successfully".into(),
                filename: "exported_document_1.pdf".into(),
                pdf_download_url: "/download/exported_document_1.pdf".into(),
            })
        }

        async fn export_annotations(
            &self,
            req: &AnnotationExportRequest,
        ) -> Result<AnnotationExportResponse, ClientError> {
            self.record("export_annotations");
            Ok(AnnotationExportResponse {
                success: true,
                project_id: ProjectId(7),
                project_name: req.project_name.clone().unwrap_or_default(),
                tasks_created: 1,
                label_studio_url: "http://ls/projects/7/data".into(),
                message: "Successfully exported 1 tasks to Label Studio".into(),
            })
        }

        async fn import_annotations(
            &self,
            req: &AnnotationImportRequest,
        ) -> Result<AnnotationImportResponse, ClientError> {
            self.record("import_annotations");
            let project_id = req.project_id.unwrap_or(ProjectId(0));
            Ok(AnnotationImportResponse {
                success: true,
                annotated_data: AnnotatedData {
                    project_id,
                    project_title: "P".into(),
                    total_tasks: 0,
                    annotated_tasks: Vec::new(),
                    insights: AnnotationInsights::default(),
                },
                insights_file: None,
                insights_download_url: None,
                message: "Successfully imported 0 annotated tasks".into(),
            })
        }

        async fn annotation_status(&self) -> Result<AnnotationStatus, ClientError> {
            self.record("annotation_status");
            if self.status_unreachable {
                return Err(ClientError::Api {
                    status: 502,
                    message: "Request failed with status 502".into(),
                });
            }
            Ok(AnnotationStatus {
                success: true,
                status: ConnectionState::Connected,
                url: "http://ls".into(),
                total_projects: Some(1),
                message: "Label Studio connection successful".into(),
                error: None,
                setup_instructions: Vec::new(),
            })
        }

        async fn annotation_projects(&self) -> Result<ProjectListResponse, ClientError> {
            self.record("annotation_projects");
            Ok(ProjectListResponse {
                success: true,
                projects: Vec::new(),
                total_projects: 0,
            })
        }
    }

    async fn loaded_session() -> EditorSession<FakeBackend> {
        let mut session = EditorSession::new(FakeBackend::default());
        session.select_file("cv.txt", Some("text/plain".into()), Bytes::from_static(b"x"));
        assert!(session.upload().await.unwrap());
        session
    }

    #[tokio::test]
    async fn test_upload_populates_state() {
        let session = loaded_session().await;
        let s = session.state();

        assert_eq!(s.phase, EditorPhase::Rendering);
        assert_eq!(s.fields.get("name"), Some("John Doe"));
        assert_eq!(s.field_order, vec!["name", "email"]);
        assert_eq!(s.html, "<div>John Doe<br/>j@x.com<br/></div>");
        assert!(s.extracted.as_ref().unwrap().get("email").is_some());
        assert!(!s.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_regenerate_once_with_last_value() {
        let mut session = loaded_session().await;

        for value in ["J", "Ja", "Jane"] {
            session.edit_field("name", Some(value.into()));
            assert_eq!(session.state().phase, EditorPhase::Editing);
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        assert_eq!(session.state().regenerations, 0);

        assert!(session.settle().await);
        let s = session.state();
        assert_eq!(s.regenerations, 1);
        assert_eq!(s.phase, EditorPhase::Rendering);
        assert_eq!(s.delta.runs[1], Run::plain("Jane\n\n"));
        assert!(s.html.contains("Jane"));
        assert!(s.extracted.as_ref().unwrap().is_edited("name", &s.fields));

        assert!(!session.settle().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_waits_for_quiet_window() {
        let mut session = loaded_session().await;
        let start = tokio::time::Instant::now();
        session.edit_field("email", Some("jane@x.com".into()));
        session.settle().await;
        assert!(start.elapsed() >= DEBOUNCE_WINDOW);
    }

    #[tokio::test]
    async fn test_upload_failure_shows_banner_and_keeps_store_empty() {
        let mut session = EditorSession::new(FakeBackend {
            fail_upload: Some("Unsupported file type".into()),
            ..FakeBackend::default()
        });
        session.select_file("a.png", None, Bytes::from_static(b"x"));

        let err = session.upload().await.unwrap_err();

        assert!(matches!(err, EditorError::Request(_)));
        let s = session.state();
        assert_eq!(s.error.as_deref(), Some("Unsupported file type"));
        assert!(s.fields.is_empty());
        assert_eq!(s.phase, EditorPhase::Empty);
        assert!(!s.loading);

        session.dismiss_error();
        assert!(session.state().error.is_none());
    }

    #[tokio::test]
    async fn test_new_selection_resets_and_drops_stale_response() {
        let mut session = loaded_session().await;
        let first = session.select_file("one.txt", None, Bytes::from_static(b"1"));
        let ticket = session.begin_upload().unwrap();
        assert_eq!(ticket.id, first);

        session.select_file("two.txt", None, Bytes::from_static(b"2"));
        let s = session.state();
        assert!(s.fields.is_empty());
        assert!(s.delta.is_empty());
        assert!(s.field_order.is_empty());
        assert_eq!(s.phase, EditorPhase::Empty);

        let applied = session.finish_upload(ticket.id, Ok(upload_response())).unwrap();
        assert!(!applied);
        assert!(session.state().fields.is_empty());
    }

    #[tokio::test]
    async fn test_missing_inputs_never_reach_backend() {
        let mut session = EditorSession::new(FakeBackend::default());

        assert!(matches!(
            session.upload().await,
            Err(EditorError::UserInput(_))
        ));
        assert!(matches!(
            session.import_annotations("  ").await,
            Err(EditorError::UserInput(_))
        ));
        assert!(matches!(
            session.import_annotations("abc").await,
            Err(EditorError::UserInput(_))
        ));
        assert!(matches!(
            session.export().await,
            Err(EditorError::UserInput(_))
        ));
        assert!(session.backend().calls().is_empty());
        assert_eq!(
            session.state().error.as_deref(),
            Some("No content to export")
        );
    }

    #[tokio::test]
    async fn test_busy_gate() {
        let mut session = EditorSession::new(FakeBackend::default());
        session.select_file("cv.txt", None, Bytes::from_static(b"x"));
        let _ticket = session.begin_upload().unwrap();
        assert!(matches!(session.begin_upload(), Err(EditorError::Busy)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_flushes_pending_edit() {
        let mut session = loaded_session().await;
        session.edit_field("name", Some("Jane".into()));

        session.save().await.unwrap();

        let saved = session.backend().saved.lock().unwrap().clone().unwrap();
        assert_eq!(saved.edited_data.get("name"), Some("Jane"));
        assert_eq!(saved.quill_content_delta.runs[1], Run::plain("Jane\n\n"));
        assert_eq!(session.state().phase, EditorPhase::Rendering);
    }

    #[tokio::test]
    async fn test_annotation_round_trip() {
        let mut session = loaded_session().await;

        let exported = session
            .export_to_annotation(ProjectType::Resume, Some("CV".into()))
            .await
            .unwrap();
        assert_eq!(exported.project_id, ProjectId(7));

        let imported = session.import_annotations(" 7 ").await.unwrap();
        assert_eq!(imported.annotated_data.project_id, ProjectId(7));
        assert_eq!(session.load_annotation_projects().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_status_is_disconnected() {
        let mut session = EditorSession::new(FakeBackend {
            status_unreachable: true,
            ..FakeBackend::default()
        });

        assert_eq!(
            session.refresh_annotation_status().await,
            ConnectionState::Disconnected
        );
        let status = session.state().annotation_status.as_ref().unwrap();
        assert_eq!(status.error.as_deref(), Some("Request failed with status 502"));
    }
}
