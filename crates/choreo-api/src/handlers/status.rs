//! Service configuration overview for the setup screen.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use choreo_vendor::Deployment;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ServiceStatus {
    pub name: &'static str,
    pub configured: bool,
    pub endpoint: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
}

#[derive(Serialize)]
pub struct EnvironmentStatus {
    pub runcomfy_api_key: bool,
    pub ai_api_key: bool,
    pub comfyui_base_url: String,
}

#[derive(Serialize)]
pub struct ApiStatus {
    pub apis: BTreeMap<&'static str, ServiceStatus>,
    pub environment: EnvironmentStatus,
    pub setup_needed: Vec<String>,
}

#[derive(Serialize)]
pub struct ApiStatusResponse {
    pub success: bool,
    pub status: ApiStatus,
    pub message: String,
}

fn endpoint_of(deployment: Deployment) -> &'static str {
    match deployment {
        Deployment::VideoGenerate => "/api/video/generate",
        Deployment::Stitch => "/api/video/stitch",
        Deployment::StyleTransfer => "/api/style-transfer",
        Deployment::FusionX => "/api/video/fusionx",
    }
}

/// `GET /api/status`
pub async fn api_status(State(state): State<AppState>) -> Json<ApiStatusResponse> {
    let vendor = &state.vendor;
    let runcomfy = vendor.config.runcomfy_configured();
    let ai = vendor.config.ai.is_configured();

    let mut apis = BTreeMap::new();
    let mut setup_needed = Vec::new();

    if !runcomfy {
        setup_needed.push(
            "RUNCOMFY_API_KEY - Required for video generation, stitching and style transfer".to_string(),
        );
    }
    if !ai {
        setup_needed
            .push("AI_API_KEY - Required for character generation and scene analysis".to_string());
    }

    for &deployment in Deployment::ALL {
        let poller = vendor.poller(deployment);
        if poller.deployment_id().is_none() {
            setup_needed.push(format!(
                "{} - Required for {}",
                deployment.env_var(),
                deployment.display_name()
            ));
        }
        apis.insert(
            deployment.as_str(),
            ServiceStatus {
                name: deployment.display_name(),
                configured: poller.is_configured(),
                endpoint: endpoint_of(deployment),
                deployment_id: poller.deployment_id().map(str::to_string),
            },
        );
    }

    apis.insert(
        "characters",
        ServiceStatus {
            name: "Character Generation",
            configured: vendor.portraits.is_configured(),
            endpoint: "/api/characters/generate",
            deployment_id: None,
        },
    );
    apis.insert(
        "scene_analysis",
        ServiceStatus {
            name: "Scene Analysis",
            configured: vendor.analyzer.is_configured(),
            endpoint: "/api/nlp/analyze",
            deployment_id: None,
        },
    );
    apis.insert(
        "storyboard",
        ServiceStatus {
            name: "Storyboard Management",
            configured: true,
            endpoint: "/api/storyboard",
            deployment_id: None,
        },
    );

    let message = if setup_needed.is_empty() {
        "All APIs are properly configured"
    } else {
        "Some APIs need configuration"
    };

    Json(ApiStatusResponse {
        success: true,
        status: ApiStatus {
            apis,
            environment: EnvironmentStatus {
                runcomfy_api_key: runcomfy,
                ai_api_key: ai,
                comfyui_base_url: vendor.config.base_url.clone(),
            },
            setup_needed,
        },
        message: message.to_string(),
    })
}
