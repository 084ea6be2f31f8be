//! Vendor deployments and the request payloads each one accepts.
//!
//! Every deployment takes `{"overrides": {...}}`; the builders here produce
//! the `overrides` object with defaults filled in.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use choreo_models::{InvalidInput, SceneNode, DEFAULT_NODE_DURATION};

/// Longest video the stitching deployment produces, in seconds.
pub const MAX_OUTPUT_DURATION: f64 = 60.0;

pub const DEFAULT_WORKFLOW_TYPE: &str = "wan2.2_t2v";
pub const DEFAULT_STYLE_PROMPT: &str = "cinematic, dramatic lighting, professional color grading";
pub const DEFAULT_STYLE_INTENSITY: f64 = 0.8;
pub const DEFAULT_NEGATIVE_PROMPT: &str = "blurry, low quality, distorted";

/// A job-based generation deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deployment {
    /// Text/image to video clip
    VideoGenerate,
    /// Multi-clip stitching into one video
    Stitch,
    StyleTransfer,
    /// FusionX text-to-video workflow
    #[serde(rename = "fusionx")]
    FusionX,
}

impl Deployment {
    pub const ALL: &'static [Deployment] = &[
        Deployment::VideoGenerate,
        Deployment::Stitch,
        Deployment::StyleTransfer,
        Deployment::FusionX,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Deployment::VideoGenerate => "video_generate",
            Deployment::Stitch => "stitch",
            Deployment::StyleTransfer => "style_transfer",
            Deployment::FusionX => "fusionx",
        }
    }

    /// Environment variable holding the deployment id.
    pub fn env_var(&self) -> &'static str {
        match self {
            Deployment::VideoGenerate => "VIDEO_DEPLOYMENT_ID",
            Deployment::Stitch => "FRAMEPACK_DEPLOYMENT_ID",
            Deployment::StyleTransfer => "STYLE_TRANSFER_DEPLOYMENT_ID",
            Deployment::FusionX => "FUSIONX_DEPLOYMENT_ID",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Deployment::VideoGenerate => "Video Generation",
            Deployment::Stitch => "Video Stitching",
            Deployment::StyleTransfer => "Video Style Transfer",
            Deployment::FusionX => "FusionX Text-to-Video",
        }
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn required(field: &str, value: &str) -> Result<(), InvalidInput> {
    if value.trim().is_empty() {
        return Err(InvalidInput::new(field, format!("{field} is required")));
    }
    Ok(())
}

/// Request to generate a clip from a prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoGenerateRequest {
    /// Overrides the configured deployment
    #[serde(default)]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(default)]
    pub overrides: Map<String, Value>,
}

impl VideoGenerateRequest {
    pub fn validate_request(&self) -> Result<(), InvalidInput> {
        required("prompt", &self.prompt)
    }

    pub fn workflow_type(&self) -> &str {
        self.workflow_type
            .as_deref()
            .filter(|w| !w.is_empty())
            .unwrap_or(DEFAULT_WORKFLOW_TYPE)
    }

    /// Caller overrides, with `prompt` and `workflow_type` always set.
    pub fn overrides(&self) -> Value {
        let mut overrides = self.overrides.clone();
        overrides.insert("prompt".into(), Value::String(self.prompt.clone()));
        overrides.insert("workflow_type".into(), Value::String(self.workflow_type().to_string()));
        Value::Object(overrides)
    }

    /// Rough generation time in seconds, from prompt length.
    pub fn estimated_duration(&self) -> u64 {
        (self.prompt.split_whitespace().count() as f64 * 0.5).ceil() as u64
    }
}

/// Text-to-video request for the FusionX workflow.
///
/// Zero or empty values fall back to the workflow defaults; `seed` keeps any
/// explicit value and defaults to `-1` (random).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionXRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub num_frames: Option<u32>,
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(default)]
    pub controlnet: Option<Value>,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub steps: Option<u32>,
    #[serde(default)]
    pub cfg_scale: Option<f64>,
}

fn positive_or(value: Option<u32>, default: u32) -> u32 {
    value.filter(|v| *v > 0).unwrap_or(default)
}

impl FusionXRequest {
    pub fn validate_request(&self) -> Result<(), InvalidInput> {
        required("prompt", &self.prompt)
    }

    pub fn num_frames(&self) -> u32 {
        positive_or(self.num_frames, 48)
    }

    pub fn fps(&self) -> u32 {
        positive_or(self.fps, 24)
    }

    /// Length of the generated clip in seconds.
    pub fn clip_duration(&self) -> f64 {
        f64::from(self.num_frames()) / f64::from(self.fps())
    }

    pub fn overrides(&self) -> Value {
        json!({
            "prompt": self.prompt,
            "negative_prompt": self
                .negative_prompt
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(DEFAULT_NEGATIVE_PROMPT),
            "width": positive_or(self.width, 1024),
            "height": positive_or(self.height, 576),
            "num_frames": self.num_frames(),
            "fps": self.fps(),
            "controlnet": self
                .controlnet
                .clone()
                .filter(|c| !c.is_null())
                .unwrap_or_else(|| json!({})),
            "seed": self.seed.unwrap_or(-1),
            "steps": positive_or(self.steps, 25),
            "cfg_scale": self.cfg_scale.filter(|c| *c > 0.0 && c.is_finite()).unwrap_or(7.5),
        })
    }
}

/// One clip of a stitching request, taken from a storyboard node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoClip {
    pub description: String,
    pub characters: Vec<String>,
    pub action: String,
    pub camera: String,
    pub lighting: String,
    pub duration: f64,
}

impl From<&SceneNode> for VideoClip {
    fn from(node: &SceneNode) -> Self {
        Self {
            description: node.description.clone(),
            characters: node.characters.clone(),
            action: node.action.clone(),
            camera: node.camera.to_string(),
            lighting: node.lighting.to_string(),
            duration: node.duration,
        }
    }
}

/// Request to stitch clips into a single video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StitchRequest {
    /// Clip descriptors; free-form so callers can pass vendor-specific clips
    #[serde(default)]
    pub video_clips: Vec<Value>,
    #[serde(default)]
    pub output_duration: Option<f64>,
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
    pub background_music: Option<Value>,
    #[serde(default)]
    pub color_grading: Option<String>,
}

impl StitchRequest {
    /// Stitch an ordered storyboard. Output duration is the clip total, capped.
    pub fn from_nodes(nodes: &[SceneNode]) -> Self {
        let total: f64 = nodes
            .iter()
            .map(|n| if n.duration > 0.0 { n.duration } else { DEFAULT_NODE_DURATION })
            .sum();

        Self {
            video_clips: nodes
                .iter()
                .map(|n| serde_json::to_value(VideoClip::from(n)).unwrap_or(Value::Null))
                .collect(),
            output_duration: Some(total.min(MAX_OUTPUT_DURATION)),
            ..Default::default()
        }
    }

    pub fn validate_request(&self) -> Result<(), InvalidInput> {
        if self.video_clips.is_empty() {
            return Err(InvalidInput::new(
                "video_clips",
                "Video clips array is required and cannot be empty",
            ));
        }
        Ok(())
    }

    /// Requested duration capped to [`MAX_OUTPUT_DURATION`].
    pub fn output_duration(&self) -> f64 {
        self.output_duration
            .filter(|d| *d > 0.0 && d.is_finite())
            .unwrap_or(MAX_OUTPUT_DURATION)
            .min(MAX_OUTPUT_DURATION)
    }

    pub fn overrides(&self) -> Value {
        json!({
            "video_clips": self.video_clips,
            "output_duration": self.output_duration(),
            "transition_style": self.transition_style.as_deref().unwrap_or("smooth"),
            "quality": self.quality.as_deref().unwrap_or("high"),
            "fps": self.fps.filter(|f| *f > 0).unwrap_or(24),
            "resolution": self.resolution.as_deref().unwrap_or("1920x1080"),
            "audio_enabled": self.audio_enabled.unwrap_or(false),
            "background_music": self.background_music.clone().unwrap_or(Value::Null),
            "effects": {
                "color_grading": self.color_grading.as_deref().unwrap_or("cinematic"),
                "motion_smoothing": true,
                "scene_transitions": true,
                "auto_crop": true
            },
            "stitching_options": {
                "enable_smart_cutting": true,
                "scene_detection": true,
                "auto_timing": true,
                "crossfade_duration": 0.5
            }
        })
    }
}

/// Request to restyle an existing video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleTransferRequest {
    #[serde(default)]
    pub video_url: String,
    /// Reference image URL or descriptor
    #[serde(default)]
    pub reference_style: Option<Value>,
    #[serde(default)]
    pub style_prompt: Option<String>,
    #[serde(default)]
    pub overrides: Map<String, Value>,
}

impl StyleTransferRequest {
    pub fn validate_request(&self) -> Result<(), InvalidInput> {
        required("video_url", &self.video_url)
    }

    fn option<'a>(&'a self, key: &str) -> Option<&'a Value> {
        self.overrides.get(key).filter(|v| !v.is_null())
    }

    fn text_or(&self, key: &str, default: &str) -> Value {
        self.option(key)
            .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
            .cloned()
            .unwrap_or_else(|| Value::String(default.to_string()))
    }

    /// Boolean switches default to on; only an explicit `false` turns them off.
    fn switch(&self, key: &str) -> bool {
        self.option(key).and_then(Value::as_bool) != Some(false)
    }

    pub fn overrides(&self) -> Value {
        let intensity = self
            .option("style_intensity")
            .and_then(Value::as_f64)
            .filter(|i| *i > 0.0)
            .unwrap_or(DEFAULT_STYLE_INTENSITY);

        json!({
            "input_video": self.video_url,
            "reference_style": self.reference_style.clone().unwrap_or(Value::Null),
            "style_prompt": self
                .style_prompt
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(DEFAULT_STYLE_PROMPT),
            "style_intensity": intensity,
            "preserve_motion": self.switch("preserve_motion"),
            "color_palette": self.text_or("color_palette", "enhanced"),
            "lighting_style": self.text_or("lighting_style", "dramatic"),
            "texture_detail": self.text_or("texture_detail", "high"),
            "output_resolution": self.text_or("output_resolution", "1920x1080"),
            "quality": self.text_or("quality", "high"),
            "temporal_consistency": self.switch("temporal_consistency"),
            "edge_preservation": self.switch("edge_preservation"),
            "skin_tone_preservation": self.switch("skin_tone_preservation"),
            "artistic_effects": self.option("artistic_effects").cloned().unwrap_or_else(|| json!({})),
            "color_grading": self.text_or("color_grading", "cinematic"),
        })
    }
}
