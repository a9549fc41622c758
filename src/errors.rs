// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scanning core
//!
//! Each layer has its own enum. Everything converts into [`AppError`].

use crate::app::state::CaptureStep;
use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Guided capture errors
    Capture(CaptureError),
    /// Frame extraction errors
    Extraction(ExtractionError),
    /// Foot model errors
    Geometry(GeometryError),
    /// Photo encoding errors
    Photo(PhotoError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Errors raised by the capture controller
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Camera could not be acquired or failed mid-session.
    /// The controller stays in `step` and accepts a retry.
    Device {
        step: CaptureStep,
        error: BackendError,
    },
    /// Transition not allowed from the current step
    InvalidTransition { from: CaptureStep, action: String },
    /// Operation needs a capture step
    NotCapturing(CaptureStep),
    /// Operation needs an active camera session
    NoActiveSession,
    /// Review cannot complete yet
    InsufficientImages { have: usize, need: usize },
    /// A take is already being recorded
    AlreadyRecording,
    /// No take is being recorded
    NotRecording,
    /// Frame extraction failed
    Extraction(ExtractionError),
    /// Photo encoding failed
    Photo(PhotoError),
}

/// Errors raised while turning a take into frames
#[derive(Debug, Clone)]
pub enum ExtractionError {
    /// The take's container is not supported
    UnsupportedContainer(String),
    /// The take is empty
    EmptyTake,
    /// Decoder failure
    DecodeFailed(String),
    /// Duration could not be determined
    UnknownDuration,
    /// Frame encoding failed
    EncodingFailed(String),
    /// Worker task failed
    TaskFailed(String),
}

/// Errors raised by the foot model generator
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A measurement is out of its valid range
    InvalidMeasurement { field: &'static str, value: f32 },
    /// A categorical value could not be parsed
    UnknownCategory { field: &'static str, value: String },
    /// A scan record could not be parsed
    InvalidRecord(String),
    /// Mesh export failed
    ExportFailed(String),
}

/// Photo capture errors
#[derive(Debug, Clone)]
pub enum PhotoError {
    /// No frame available for capture
    NoFrameAvailable,
    /// Frame buffer does not match its declared size
    InvalidFrame(String),
    /// Encoding failed
    EncodingFailed(String),
    /// Save failed
    SaveFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Extraction(e) => write!(f, "Extraction error: {}", e),
            AppError::Geometry(e) => write!(f, "Geometry error: {}", e),
            AppError::Photo(e) => write!(f, "Photo error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Device { step, error } => {
                write!(f, "{} (during {}, retry available)", error.user_message(), step)
            }
            CaptureError::InvalidTransition { from, action } => {
                write!(f, "Cannot {} from {}", action, from)
            }
            CaptureError::NotCapturing(step) => write!(f, "Not in a capture step ({})", step),
            CaptureError::NoActiveSession => write!(f, "No active camera session"),
            CaptureError::InsufficientImages { have, need } => {
                write!(f, "Only {} of {} required images captured", have, need)
            }
            CaptureError::AlreadyRecording => write!(f, "Recording already in progress"),
            CaptureError::NotRecording => write!(f, "No recording in progress"),
            CaptureError::Extraction(e) => write!(f, "Frame extraction failed: {}", e),
            CaptureError::Photo(e) => write!(f, "Photo failed: {}", e),
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionError::UnsupportedContainer(c) => write!(f, "Unsupported container: {}", c),
            ExtractionError::EmptyTake => write!(f, "Recorded take is empty"),
            ExtractionError::DecodeFailed(msg) => write!(f, "Decode failed: {}", msg),
            ExtractionError::UnknownDuration => write!(f, "Could not determine take duration"),
            ExtractionError::EncodingFailed(msg) => write!(f, "Frame encoding failed: {}", msg),
            ExtractionError::TaskFailed(msg) => write!(f, "Worker task failed: {}", msg),
        }
    }
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::InvalidMeasurement { field, value } => {
                write!(f, "Invalid measurement {}: {}", field, value)
            }
            GeometryError::UnknownCategory { field, value } => {
                write!(f, "Unknown {} value: {:?}", field, value)
            }
            GeometryError::InvalidRecord(msg) => write!(f, "Invalid scan record: {}", msg),
            GeometryError::ExportFailed(msg) => write!(f, "Export failed: {}", msg),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::NoFrameAvailable => write!(f, "No frame available for capture"),
            PhotoError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PhotoError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for ExtractionError {}
impl std::error::Error for GeometryError {}
impl std::error::Error for PhotoError {}

// Conversions from sub-errors to AppError
impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        AppError::Extraction(err)
    }
}

impl From<GeometryError> for AppError {
    fn from(err: GeometryError) -> Self {
        AppError::Geometry(err)
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        AppError::Photo(err)
    }
}

impl From<ExtractionError> for CaptureError {
    fn from(err: ExtractionError) -> Self {
        CaptureError::Extraction(err)
    }
}

impl From<PhotoError> for CaptureError {
    fn from(err: PhotoError) -> Self {
        CaptureError::Photo(err)
    }
}

impl From<PhotoError> for ExtractionError {
    fn from(err: PhotoError) -> Self {
        ExtractionError::EncodingFailed(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::SaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_error_names_field() {
        let err = GeometryError::InvalidMeasurement {
            field: "length_mm",
            value: -3.0,
        };
        assert_eq!(err.to_string(), "Invalid measurement length_mm: -3");
    }

    #[test]
    fn test_sub_errors_convert_to_app_error() {
        let app: AppError = ExtractionError::UnknownDuration.into();
        assert!(matches!(app, AppError::Extraction(_)));

        let capture: CaptureError = PhotoError::NoFrameAvailable.into();
        assert!(matches!(capture, CaptureError::Photo(_)));
    }

    #[test]
    fn test_insufficient_images_message() {
        let err = CaptureError::InsufficientImages { have: 7, need: 10 };
        assert_eq!(err.to_string(), "Only 7 of 10 required images captured");
    }
}
