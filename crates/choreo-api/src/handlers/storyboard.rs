//! Storyboard handlers: node CRUD, sequence ingestion and scene rendering.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use choreo_models::{ActionAnalysis, InvalidInput, NodeDraft, NodeId, NodePatch, SceneNode};
use choreo_storyboard::{IngestionReport, NodeDefaults, SequenceIngestion};
use choreo_vendor::{Deployment, StitchRequest, VendorError};

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::handlers::media::{submit_job, JobSubmittedResponse};
use crate::metrics;
use crate::session::Session;
use crate::state::AppState;

/// Optional scene filter for listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListNodesQuery {
    pub scene_id: Option<String>,
}

/// Node selector for update and delete.
#[derive(Debug, Default, Deserialize)]
pub struct NodeQuery {
    pub node_id: Option<String>,
}

impl NodeQuery {
    fn require(self) -> ApiResult<NodeId> {
        self.node_id
            .filter(|id| !id.trim().is_empty())
            .map(NodeId::from)
            .ok_or_else(|| ApiError::bad_request("Node ID is required"))
    }
}

#[derive(Serialize)]
pub struct NodeListResponse {
    pub success: bool,
    pub nodes: Vec<SceneNode>,
}

#[derive(Serialize)]
pub struct NodeResponse {
    pub success: bool,
    pub node: SceneNode,
    pub message: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /api/storyboard[?scene_id=]`
pub async fn list_nodes(
    Session(session): Session,
    ApiQuery(query): ApiQuery<ListNodesQuery>,
) -> ApiResult<Json<NodeListResponse>> {
    let scene = query.scene_id.as_deref().filter(|s| !s.is_empty());
    let nodes = session.storyboard.list(scene).await;

    Ok(Json(NodeListResponse {
        success: true,
        nodes,
    }))
}

/// `POST /api/storyboard`
pub async fn create_node(
    Session(session): Session,
    ApiJson(draft): ApiJson<NodeDraft>,
) -> ApiResult<Json<NodeResponse>> {
    let node = session.storyboard.create(draft).await?;

    Ok(Json(NodeResponse {
        success: true,
        node,
        message: "Storyboard node created successfully".to_string(),
    }))
}

/// `PUT /api/storyboard?node_id=`
///
/// Only fields present in the body change.
pub async fn update_node(
    Session(session): Session,
    ApiQuery(query): ApiQuery<NodeQuery>,
    ApiJson(patch): ApiJson<NodePatch>,
) -> ApiResult<Json<NodeResponse>> {
    let id = query.require()?;
    let node = session.storyboard.update(&id, patch).await?;

    Ok(Json(NodeResponse {
        success: true,
        node,
        message: "Storyboard node updated successfully".to_string(),
    }))
}

/// `DELETE /api/storyboard?node_id=`
pub async fn delete_node(
    Session(session): Session,
    ApiQuery(query): ApiQuery<NodeQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let id = query.require()?;
    session.storyboard.delete(&id).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Storyboard node deleted successfully".to_string(),
    }))
}

/// Ingestion input: either a structured analysis or free text.
#[derive(Debug, Default, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub scene_id: String,
    #[serde(default)]
    pub analysis: Option<ActionAnalysis>,
    #[serde(default)]
    pub text: Option<String>,
    /// Ask the scene-analysis service first, falling back to `@Name` parsing
    #[serde(default)]
    pub analyze: bool,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub scene_id: String,
    /// `analysis` or `text`
    pub source: &'static str,
    pub complete: bool,
    #[serde(flatten)]
    pub report: IngestionReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ActionAnalysis>,
    /// Why the analysis service wasn't used, when it was asked for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_required: Option<bool>,
}

/// `POST /api/storyboard/ingest`
pub async fn ingest_sequence(
    State(state): State<AppState>,
    Session(session): Session,
    ApiJson(request): ApiJson<IngestRequest>,
) -> ApiResult<Json<IngestResponse>> {
    let scene_id = request.scene_id.trim().to_string();
    if scene_id.is_empty() {
        return Err(InvalidInput::new("scene_id", "scene_id is required").into());
    }

    let defaults = NodeDefaults::from_suggestions(&session.preferences.suggestions().await);
    let ingestion = SequenceIngestion::new(&session.storyboard).with_defaults(defaults);

    let mut analysis_error = None;
    let mut setup_required = None;

    let (source, report, analysis) = match (request.analysis, request.text) {
        (Some(analysis), _) => {
            let report = ingestion.ingest_analysis(&scene_id, &analysis.actions).await;
            ("analysis", report, None)
        }
        (None, Some(text)) if !text.trim().is_empty() => {
            let analyzed = if request.analyze {
                match state.vendor.analyzer.analyze(&text, request.context.as_deref()).await {
                    Ok(analysis) if !analysis.actions.is_empty() => Some(analysis),
                    Ok(_) => {
                        analysis_error = Some("Analysis returned no actions".to_string());
                        None
                    }
                    Err(e) => {
                        warn!(scene_id = %scene_id, error = %e, "Scene analysis failed, parsing mentions instead");
                        if let VendorError::Configuration(_) = e {
                            metrics::record_setup_required("scene_analysis");
                            setup_required = Some(true);
                        }
                        analysis_error = Some(e.to_string());
                        None
                    }
                }
            } else {
                None
            };

            match analyzed {
                Some(analysis) => {
                    let report = ingestion.ingest_analysis(&scene_id, &analysis.actions).await;
                    ("analysis", report, Some(analysis))
                }
                None => ("text", ingestion.ingest_text(&scene_id, &text).await, None),
            }
        }
        _ => return Err(ApiError::bad_request("Either analysis or text is required")),
    };

    metrics::record_ingestion(source, report.created.len(), report.failures.len());
    info!(
        scene_id = %scene_id,
        source,
        created = report.created.len(),
        failed = report.failures.len(),
        "Ingested action sequence"
    );

    Ok(Json(IngestResponse {
        success: true,
        scene_id,
        source,
        complete: report.is_complete(),
        report,
        analysis,
        analysis_error,
        setup_required,
    }))
}

/// Render options; anything unset takes the stitching defaults.
#[derive(Debug, Default, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub scene_id: String,
    #[serde(default)]
    pub transition_style: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub audio_enabled: Option<bool>,
    #[serde(default)]
    pub color_grading: Option<String>,
}

/// `POST /api/storyboard/render`
///
/// Snapshots the scene's nodes in order and submits them for stitching.
pub async fn render_scene(
    State(state): State<AppState>,
    Session(session): Session,
    ApiJson(request): ApiJson<RenderRequest>,
) -> ApiResult<Json<JobSubmittedResponse>> {
    let scene_id = request.scene_id.trim();
    if scene_id.is_empty() {
        return Err(InvalidInput::new("scene_id", "scene_id is required").into());
    }

    let nodes = session.storyboard.list(Some(scene_id)).await;
    if nodes.is_empty() {
        return Err(InvalidInput::new(
            "scene_id",
            format!("Scene {scene_id} has no storyboard nodes to render"),
        )
        .into());
    }

    let stitch = StitchRequest {
        transition_style: request.transition_style,
        quality: request.quality,
        fps: request.fps,
        resolution: request.resolution,
        audio_enabled: request.audio_enabled,
        color_grading: request.color_grading,
        ..StitchRequest::from_nodes(&nodes)
    };

    let poller = state.vendor.poller(Deployment::Stitch);
    let job_id = submit_job(poller, stitch.overrides()).await?;
    info!(scene_id = %scene_id, job_id = %job_id, clips = nodes.len(), "Scene render started");

    Ok(Json(
        JobSubmittedResponse::new(
            job_id,
            poller.deployment_id().unwrap_or_default(),
            "Scene render started",
        )
        .with_estimate(stitch.output_duration())
        .with_field("scene_id", scene_id)
        .with_field("clip_count", nodes.len()),
    ))
}
