//! Camera and lighting option sets for storyboard nodes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Camera movement for a storyboard node.
///
/// Declaration order is the option-set order and drives deterministic
/// tie-breaking when ranking preferences.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
pub enum CameraStyle {
    /// Locked-off shot
    #[default]
    Static,
    /// Horizontal pivot
    Pan,
    /// Camera follows the subject
    Track,
    /// Camera moves toward or away on a dolly
    Dolly,
    /// Shoulder-mounted, shaky movement
    Handheld,
}

impl CameraStyle {
    pub const ALL: &'static [CameraStyle] = &[
        CameraStyle::Static,
        CameraStyle::Pan,
        CameraStyle::Track,
        CameraStyle::Dolly,
        CameraStyle::Handheld,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraStyle::Static => "Static",
            CameraStyle::Pan => "Pan",
            CameraStyle::Track => "Track",
            CameraStyle::Dolly => "Dolly",
            CameraStyle::Handheld => "Handheld",
        }
    }

    /// Map free-form suggestion text (e.g. "slow dolly-in") onto an option.
    ///
    /// Exact names win; otherwise the first keyword found decides.
    pub fn from_suggestion(text: &str) -> Option<Self> {
        if let Ok(style) = text.parse() {
            return Some(style);
        }

        let lower = text.to_lowercase();
        const KEYWORDS: &[(&str, CameraStyle)] = &[
            ("handheld", CameraStyle::Handheld),
            ("hand-held", CameraStyle::Handheld),
            ("shaky", CameraStyle::Handheld),
            ("dolly", CameraStyle::Dolly),
            ("push in", CameraStyle::Dolly),
            ("track", CameraStyle::Track),
            ("follow", CameraStyle::Track),
            ("pan", CameraStyle::Pan),
            ("whip", CameraStyle::Pan),
            ("static", CameraStyle::Static),
            ("locked", CameraStyle::Static),
            ("still", CameraStyle::Static),
        ];

        KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, style)| *style)
    }
}

impl fmt::Display for CameraStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CameraStyle {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(CameraStyle::Static),
            "pan" => Ok(CameraStyle::Pan),
            "track" => Ok(CameraStyle::Track),
            "dolly" => Ok(CameraStyle::Dolly),
            "handheld" => Ok(CameraStyle::Handheld),
            _ => Err(StyleParseError::Camera(s.to_string())),
        }
    }
}

/// Lighting setup for a storyboard node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
pub enum LightingStyle {
    #[default]
    Daylight,
    Night,
    Dramatic,
    Neon,
    Firelight,
}

impl LightingStyle {
    pub const ALL: &'static [LightingStyle] = &[
        LightingStyle::Daylight,
        LightingStyle::Night,
        LightingStyle::Dramatic,
        LightingStyle::Neon,
        LightingStyle::Firelight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LightingStyle::Daylight => "Daylight",
            LightingStyle::Night => "Night",
            LightingStyle::Dramatic => "Dramatic",
            LightingStyle::Neon => "Neon",
            LightingStyle::Firelight => "Firelight",
        }
    }

    /// Map free-form suggestion text (e.g. "harsh neon signage") onto an option.
    pub fn from_suggestion(text: &str) -> Option<Self> {
        if let Ok(style) = text.parse() {
            return Some(style);
        }

        let lower = text.to_lowercase();
        const KEYWORDS: &[(&str, LightingStyle)] = &[
            ("neon", LightingStyle::Neon),
            ("fire", LightingStyle::Firelight),
            ("torch", LightingStyle::Firelight),
            ("candle", LightingStyle::Firelight),
            ("dramatic", LightingStyle::Dramatic),
            ("low-key", LightingStyle::Dramatic),
            ("chiaroscuro", LightingStyle::Dramatic),
            ("night", LightingStyle::Night),
            ("moon", LightingStyle::Night),
            ("dark", LightingStyle::Night),
            ("day", LightingStyle::Daylight),
            ("sun", LightingStyle::Daylight),
            ("natural", LightingStyle::Daylight),
        ];

        KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, style)| *style)
    }
}

impl fmt::Display for LightingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LightingStyle {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daylight" => Ok(LightingStyle::Daylight),
            "night" => Ok(LightingStyle::Night),
            "dramatic" => Ok(LightingStyle::Dramatic),
            "neon" => Ok(LightingStyle::Neon),
            "firelight" => Ok(LightingStyle::Firelight),
            _ => Err(StyleParseError::Lighting(s.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StyleParseError {
    #[error("Unknown camera style: {0}")]
    Camera(String),
    #[error("Unknown lighting style: {0}")]
    Lighting(String),
}
