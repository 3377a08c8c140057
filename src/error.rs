/// Error types shared across the extension
use thiserror::Error;

use crate::window::WindowId;

/// Failures talking to the host key-value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage read failed: {0}")]
    Read(String),
    #[error("storage write failed: {0}")]
    Write(String),
    #[error("stored record is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures from host window, tab, badge, or messaging APIs.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host call failed: {0}")]
    Call(String),
    #[error("window {0} no longer exists")]
    WindowGone(WindowId),
    #[error("unexpected host value: {0}")]
    Malformed(String),
}

/// A settings value outside its accepted range, or an unreadable import.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
        value: u32,
    },
    #[error("settings could not be parsed: {0}")]
    Parse(String),
}

/// Failures from the chat collaborator.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("chat service error: {0}")]
    Service(String),
}
