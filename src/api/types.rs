//! API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::LoopExit;
use crate::llm::TokenUsage;

/// Request to generate a presentation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    /// Free-text description of the presentation
    pub task: String,

    /// Number of slides (clamped to 3..=20, default 10)
    pub slide_count: Option<u8>,

    /// Style name, case-insensitive (default Professional)
    pub style: Option<String>,

    /// Color theme name, case-insensitive (default Dark)
    pub color_theme: Option<String>,
}

/// Result of a generation request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTaskResponse {
    /// Unique run identifier
    pub id: Uuid,

    pub status: TaskStatus,

    /// Absolute path of the generated file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Typed failure cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Inference steps issued
    pub steps: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<LoopExit>,

    /// Token usage summed over the run, when the backend reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    /// Detailed execution log
    pub log: Vec<TaskLogEntry>,
}

/// Task status enumeration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// A presentation was produced
    Completed,
    /// No presentation was produced
    Failed,
}

/// A single entry in the task execution log.
#[derive(Debug, Clone, Serialize)]
pub struct TaskLogEntry {
    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Entry type
    pub entry_type: LogEntryType,

    /// Content of the entry
    pub content: String,
}

/// Types of log entries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryType {
    /// Model text emitted alongside or instead of tool calls
    Thinking,
    /// Tool being called
    ToolCall,
    /// Result from a tool
    ToolResult,
    /// Final outcome
    Response,
    /// Error occurred
    Error,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_task_only() {
        let req: CreateTaskRequest =
            serde_json::from_str(r#"{"task":"Quarterly review"}"#).unwrap();
        assert_eq!(req.task, "Quarterly review");
        assert!(req.slide_count.is_none());
        assert!(req.style.is_none());
    }

    #[test]
    fn failed_response_omits_path_and_exit() {
        let resp = CreateTaskResponse {
            id: Uuid::nil(),
            status: TaskStatus::Failed,
            path: None,
            error: Some("boom".into()),
            steps: 1,
            exit: None,
            usage: None,
            log: vec![],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json.get("path").is_none());
        assert!(json.get("exit").is_none());
        assert!(json.get("usage").is_none());
    }

    #[test]
    fn exit_serializes_with_reason_tag() {
        let json = serde_json::to_value(LoopExit::TerminalSeen { step: 2 }).unwrap();
        assert_eq!(json["reason"], "terminal_seen");
        assert_eq!(json["step"], 2);
    }
}
