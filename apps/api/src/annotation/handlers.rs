use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, warn};

use crate::annotation::client::NewTask;
use crate::annotation::configs::labeling_config;
use crate::annotation::insights::analyze;
use crate::annotation::{build_tasks, default_project_name};
use crate::document::FieldStore;
use crate::downloads::{download_url, timestamp};
use crate::errors::AppError;
use crate::models::annotation::{
    setup_instructions, AnnotatedData, AnnotatedTask, AnnotationExportRequest,
    AnnotationExportResponse, AnnotationImportRequest, AnnotationImportResponse, AnnotationStatus,
    BatchAnnotationRequest, BatchAnnotationResponse, BatchWorkflow, ConnectionState,
    ProjectListResponse, ProjectSummary, TaskAnnotation,
};
use crate::state::AppState;

/// POST /export-to-label-studio
pub async fn handle_export(
    State(state): State<AppState>,
    Json(req): Json<AnnotationExportRequest>,
) -> Result<Json<AnnotationExportResponse>, AppError> {
    let ls = state.label_studio()?;
    if req.parsed_data.is_empty() && req.raw_document_text.trim().is_empty() {
        return Err(AppError::Validation("No parsed data provided".into()));
    }

    let base = req
        .project_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(default_project_name(req.project_type));
    let title = format!("{base} - {}", timestamp());

    let config = labeling_config(req.project_type, &req.parsed_data);
    let project = ls.create_project(&title, &config).await?;
    let tasks = build_tasks(req.project_type, &req.raw_document_text, &req.parsed_data);
    let tasks_created = ls.import_tasks(project.id, &tasks).await?;

    info!(
        "Exported document to Label Studio project {} ({} tasks)",
        project.id, tasks_created
    );

    Ok(Json(AnnotationExportResponse {
        success: true,
        project_id: project.id,
        label_studio_url: ls.project_url(project.id),
        project_name: title,
        tasks_created,
        message: format!("Successfully exported {tasks_created} tasks to Label Studio"),
    }))
}

/// POST /import-from-label-studio
pub async fn handle_import(
    State(state): State<AppState>,
    Json(req): Json<AnnotationImportRequest>,
) -> Result<Json<AnnotationImportResponse>, AppError> {
    let ls = state.label_studio()?;
    let project_id = req
        .project_id
        .ok_or_else(|| AppError::Validation("Project ID is required".into()))?;

    let project = ls.get_project(project_id).await?;
    let exported = ls.export_tasks(project_id).await?;
    let total_tasks = exported.len();

    let annotated_tasks: Vec<AnnotatedTask> = exported
        .into_iter()
        .filter(|task| !task.annotations.is_empty())
        .map(|task| AnnotatedTask {
            task_id: task.id,
            section_name: task
                .data
                .get("section_name")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            original_text: task
                .data
                .get("document_text")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            annotations: task
                .annotations
                .iter()
                .map(|a| TaskAnnotation {
                    annotator: a.annotator(),
                    created_at: a.created_at.clone(),
                    result: a.result.clone(),
                })
                .collect(),
            data: task.data,
        })
        .collect();

    let insights = analyze(&annotated_tasks);
    let annotated = AnnotatedData {
        project_id,
        project_title: project.title,
        total_tasks,
        annotated_tasks,
        insights,
    };

    // The report is a convenience; the import itself still succeeds without it.
    let filename = format!("annotation_insights_{project_id}_{}.json", timestamp());
    let (insights_file, insights_download_url) =
        match state.downloads.write_json(&filename, &annotated).await {
            Ok(_) => (Some(filename.clone()), Some(download_url(&filename))),
            Err(e) => {
                warn!("Could not write insights report: {e:#}");
                (None, None)
            }
        };

    let count = annotated.annotated_tasks.len();
    info!("Imported {count} annotated tasks from project {project_id}");

    Ok(Json(AnnotationImportResponse {
        success: true,
        annotated_data: annotated,
        insights_file,
        insights_download_url,
        message: format!("Successfully imported {count} annotated tasks"),
    }))
}

/// POST /batch-annotation
pub async fn handle_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchAnnotationRequest>,
) -> Result<Json<BatchAnnotationResponse>, AppError> {
    let ls = state.label_studio()?;
    if req.documents_to_annotate.is_empty() {
        return Err(AppError::Validation("No documents provided".into()));
    }

    // Generic labels cover every field name seen across the batch.
    let mut all_fields = FieldStore::new();
    for doc in &req.documents_to_annotate {
        for (name, value) in doc.parsed_data.iter() {
            if !all_fields.contains(name) {
                all_fields.set(name, value.map(str::to_string));
            }
        }
    }

    let title = format!(
        "{} Batch - {}",
        default_project_name(req.project_type),
        timestamp()
    );
    let project = ls
        .create_project(&title, &labeling_config(req.project_type, &all_fields))
        .await?;

    let tasks: Vec<NewTask> = req
        .documents_to_annotate
        .iter()
        .flat_map(|doc| build_tasks(req.project_type, &doc.raw_text, &doc.parsed_data))
        .collect();
    let total_tasks = ls.import_tasks(project.id, &tasks).await?;

    info!(
        "Created batch annotation project {} with {} tasks",
        project.id, total_tasks
    );

    Ok(Json(BatchAnnotationResponse {
        success: true,
        workflow: BatchWorkflow {
            project_id: project.id,
            project_name: title,
            total_tasks,
            label_studio_url: ls.project_url(project.id),
        },
        message: format!("Created batch annotation workflow with {total_tasks} total tasks"),
    }))
}

/// GET /label-studio-projects
pub async fn handle_projects(
    State(state): State<AppState>,
) -> Result<Json<ProjectListResponse>, AppError> {
    let ls = state.label_studio()?;
    let projects: Vec<ProjectSummary> = ls
        .list_projects()
        .await?
        .into_iter()
        .map(|p| ProjectSummary {
            id: p.id,
            title: p.title,
            created_at: p.created_at,
            task_count: p.task_number.unwrap_or(0),
            annotation_count: p.total_annotations_number.unwrap_or(0),
        })
        .collect();

    Ok(Json(ProjectListResponse {
        success: true,
        total_projects: projects.len(),
        projects,
    }))
}

/// GET /label-studio-status
pub async fn handle_status(State(state): State<AppState>) -> (StatusCode, Json<AnnotationStatus>) {
    let url = state.config.label_studio_url.clone();

    let Some(ls) = state.label_studio.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(AnnotationStatus {
                success: false,
                status: ConnectionState::NotConfigured,
                message: "Label Studio is not configured. Please set up API key.".into(),
                total_projects: None,
                error: None,
                setup_instructions: setup_instructions(&url),
                url,
            }),
        );
    };

    match ls.list_projects().await {
        Ok(projects) => (
            StatusCode::OK,
            Json(AnnotationStatus {
                success: true,
                status: ConnectionState::Connected,
                total_projects: Some(projects.len()),
                message: "Label Studio connection successful".into(),
                error: None,
                setup_instructions: Vec::new(),
                url,
            }),
        ),
        Err(e) => {
            warn!("Label Studio status check failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AnnotationStatus {
                    success: false,
                    status: ConnectionState::Disconnected,
                    total_projects: None,
                    message: "Label Studio connection failed. Make sure Label Studio is running."
                        .into(),
                    error: Some(e.to_string()),
                    setup_instructions: setup_instructions(&url),
                    url,
                }),
            )
        }
    }
}
