//! Clip requests, responses and the artifacts they produce.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ClipError, GeometryError, Result};
use crate::geometry::{display_to_document, Rect, SizingPolicy};

/// How the output page of a manual clip is sized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizingMode {
    /// Page is the clip plus the margin on each side.
    #[default]
    BoundingBox,
    /// Page has a caller-chosen size; the clip is scaled to fit.
    FixedSize,
}

/// A validated manual clip request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    /// Source page (0-based).
    pub page_index: usize,
    /// Selection in display coordinates, corners in any order.
    pub rect: Rect,
    /// Factor the page was shrunk by on the viewing surface.
    pub display_scale: f64,
    pub sizing_mode: SizingMode,
    pub fixed_width: Option<f64>,
    pub fixed_height: Option<f64>,
}

impl ClipRequest {
    /// Bounding-box request for a selection at the given display scale.
    pub fn new(page_index: usize, rect: Rect, display_scale: f64) -> Self {
        Self {
            page_index,
            rect,
            display_scale,
            sizing_mode: SizingMode::BoundingBox,
            fixed_width: None,
            fixed_height: None,
        }
    }

    /// Switch to a fixed output page size.
    pub fn with_fixed_size(mut self, width: f64, height: f64) -> Self {
        self.sizing_mode = SizingMode::FixedSize;
        self.fixed_width = Some(width);
        self.fixed_height = Some(height);
        self
    }

    /// Selection in document coordinates, normalized.
    pub fn document_rect(&self) -> std::result::Result<Rect, GeometryError> {
        display_to_document(&self.rect, self.display_scale)
    }

    /// Sizing policy, checking that fixed-size requests carry a usable size.
    pub fn sizing_policy(&self) -> std::result::Result<SizingPolicy, GeometryError> {
        match self.sizing_mode {
            SizingMode::BoundingBox => Ok(SizingPolicy::BoundingBox),
            SizingMode::FixedSize => match (self.fixed_width, self.fixed_height) {
                (Some(width), Some(height))
                    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 =>
                {
                    Ok(SizingPolicy::FixedSize { width, height })
                }
                _ => Err(GeometryError::MissingFixedSize),
            },
        }
    }
}

/// Clip request as it arrives at the request boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipPayload {
    /// Source page (1-based).
    pub page_number: i64,
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    /// Display scale.
    pub scale: f64,
    #[serde(default)]
    pub sizing_mode: SizingMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_height: Option<f64>,
}

impl ClipPayload {
    /// Convert into a 0-based [`ClipRequest`].
    pub fn into_request(self) -> Result<ClipRequest> {
        if self.page_number < 1 {
            return Err(ClipError::InvalidRequest(format!(
                "pageNumber must be at least 1, got {}",
                self.page_number
            )));
        }
        let coordinates = [self.start_x, self.start_y, self.end_x, self.end_y];
        if coordinates.iter().any(|c| !c.is_finite()) {
            return Err(ClipError::InvalidRequest(
                "selection coordinates must be finite".to_string(),
            ));
        }

        Ok(ClipRequest {
            page_index: (self.page_number - 1) as usize,
            rect: Rect::new(self.start_x, self.start_y, self.end_x, self.end_y),
            display_scale: self.scale,
            sizing_mode: self.sizing_mode,
            fixed_width: self.fixed_width,
            fixed_height: self.fixed_height,
        })
    }
}

/// Answer to a clip request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClipResponse {
    pub fn ok(id: Uuid) -> Self {
        Self {
            success: true,
            uuid: Some(id.to_string()),
            error: None,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            uuid: None,
            error: Some(error.to_string()),
        }
    }
}

/// One persisted single-clip document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipArtifact {
    pub id: Uuid,
    /// Source page (1-based).
    pub page_number: usize,
    /// File name inside the artifact directory.
    pub file: String,
    pub created_at: DateTime<Utc>,
    /// Monotonic creation counter within the artifact directory.
    pub sequence: u64,
    /// Resolved location, filled in by the store.
    #[serde(skip)]
    pub path: PathBuf,
}

impl ClipArtifact {
    /// Key artifacts are assembled in.
    pub fn order_key(&self) -> (DateTime<Utc>, u64, Uuid) {
        (self.created_at, self.sequence, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_payload_defaults_to_bounding_box() {
        let payload: ClipPayload = serde_json::from_str(
            r#"{"pageNumber": 2, "startX": 100, "startY": 50, "endX": 50, "endY": 200, "scale": 2}"#,
        )
        .unwrap();
        let request = payload.into_request().unwrap();

        assert_eq!(request.page_index, 1);
        assert_eq!(request.sizing_mode, SizingMode::BoundingBox);
        assert_eq!(request.sizing_policy().unwrap(), SizingPolicy::BoundingBox);
        assert_eq!(request.document_rect().unwrap(), Rect::new(25.0, 25.0, 50.0, 100.0));
    }

    #[test]
    fn test_payload_fixed_size() {
        let payload: ClipPayload = serde_json::from_str(
            r#"{"pageNumber": 1, "startX": 0, "startY": 0, "endX": 10, "endY": 10, "scale": 1,
                "sizingMode": "fixed-size", "fixedWidth": 300, "fixedHeight": 200}"#,
        )
        .unwrap();
        let request = payload.into_request().unwrap();

        assert_eq!(
            request.sizing_policy().unwrap(),
            SizingPolicy::FixedSize {
                width: 300.0,
                height: 200.0
            }
        );
    }

    #[test]
    fn test_fixed_size_requires_dimensions() {
        let mut request = ClipRequest::new(0, Rect::new(0.0, 0.0, 1.0, 1.0), 1.0);
        request.sizing_mode = SizingMode::FixedSize;
        assert_eq!(request.sizing_policy(), Err(GeometryError::MissingFixedSize));

        let request = request.with_fixed_size(0.0, 100.0);
        assert_eq!(request.sizing_policy(), Err(GeometryError::MissingFixedSize));
    }

    #[test]
    fn test_page_number_is_one_based() {
        let payload = ClipPayload {
            page_number: 0,
            start_x: 0.0,
            start_y: 0.0,
            end_x: 1.0,
            end_y: 1.0,
            scale: 1.0,
            sizing_mode: SizingMode::BoundingBox,
            fixed_width: None,
            fixed_height: None,
        };
        let err = payload.into_request().unwrap_err();
        assert!(matches!(err, ClipError::InvalidRequest(_)));
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_response_shape() {
        let id = Uuid::nil();
        let json = serde_json::to_value(ClipResponse::ok(id)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "uuid": "00000000-0000-0000-0000-000000000000"})
        );

        let json = serde_json::to_value(ClipResponse::failed("page out of range")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "page out of range"})
        );
    }

    #[test]
    fn test_order_key_follows_creation_time() {
        let created_at = Utc::now();
        let artifact = |sequence, offset| ClipArtifact {
            id: Uuid::new_v4(),
            page_number: 1,
            file: String::new(),
            created_at: created_at + chrono::Duration::seconds(offset),
            sequence,
            path: PathBuf::new(),
        };
        // Older file that was never given an early sequence.
        let (older, newer) = (artifact(5, 0), artifact(0, 10));
        assert!(older.order_key() < newer.order_key());

        // Equal timestamps fall back to the sequence.
        let (first, second) = (artifact(1, 3), artifact(2, 3));
        assert!(first.order_key() < second.order_key());
    }
}
