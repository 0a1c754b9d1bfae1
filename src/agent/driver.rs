//! Bounded tool-calling loop that turns one instruction into one `.pptx` file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use super::artifact;
use super::prompt::build_system_prompt;
use crate::api::types::{LogEntryType, TaskLogEntry};
use crate::config::Config;
use crate::llm::{ChatMessage, LlmClient, LlmError, Role, TokenUsage, ToolCall};
use crate::tools::{ToolError, ToolRegistry, SAVE_PRESENTATION};

/// Why the loop stopped. Every exit proceeds to artifact discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LoopExit {
    /// `save_presentation` was requested at this (0-based) step.
    TerminalSeen { step: usize },
    /// The model answered without requesting any tool at this step.
    NoToolsRequested { step: usize },
    /// All steps were used without a save.
    BudgetExhausted { steps: usize },
}

impl LoopExit {
    /// Number of inference requests issued before this exit.
    pub fn steps_taken(&self) -> usize {
        match *self {
            LoopExit::TerminalSeen { step } | LoopExit::NoToolsRequested { step } => step + 1,
            LoopExit::BudgetExhausted { steps } => steps,
        }
    }
}

impl fmt::Display for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopExit::TerminalSeen { step } => write!(f, "save requested at step {}", step),
            LoopExit::NoToolsRequested { step } => write!(f, "no tool calls at step {}", step),
            LoopExit::BudgetExhausted { steps } => {
                write!(f, "step budget of {} exhausted", steps)
            }
        }
    }
}

/// A successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    /// Absolute path of the renamed presentation.
    pub path: PathBuf,
    pub exit: LoopExit,
    /// Token usage summed over every step, when the backend reports it.
    pub usage: Option<TokenUsage>,
    pub log: Vec<TaskLogEntry>,
}

impl RunOutcome {
    pub fn steps(&self) -> usize {
        self.exit.steps_taken()
    }
}

/// Why a run produced no presentation.
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error("model request failed at step {step}: {source}")]
    Llm {
        step: usize,
        #[source]
        source: LlmError,
    },

    #[error("tool '{tool}' failed at step {step}: {source}")]
    Tool {
        step: usize,
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no .pptx file found in {dir} ({exit})", dir = .dir.display())]
    NoArtifact { dir: PathBuf, exit: LoopExit },

    #[error("artifact discovery failed: {0}")]
    Io(#[from] std::io::Error),
}

impl RunFailure {
    /// Inference requests issued before the failure, 0 when unknown.
    pub fn steps(&self) -> usize {
        match self {
            RunFailure::Llm { step, .. } | RunFailure::Tool { step, .. } => step + 1,
            RunFailure::NoArtifact { exit, .. } => exit.steps_taken(),
            RunFailure::Io(_) => 0,
        }
    }

    pub fn exit(&self) -> Option<LoopExit> {
        match self {
            RunFailure::NoArtifact { exit, .. } => Some(*exit),
            _ => None,
        }
    }
}

/// A failed run together with what it recorded before failing.
#[derive(Debug, Error)]
#[error("{cause}")]
pub struct RunError {
    pub run_id: Uuid,
    pub cause: RunFailure,
    pub usage: Option<TokenUsage>,
    pub log: Vec<TaskLogEntry>,
}

/// Log and token usage accumulated over one run.
#[derive(Default)]
struct RunRecord {
    log: Vec<TaskLogEntry>,
    usage: Option<TokenUsage>,
}

impl RunRecord {
    fn push(&mut self, entry_type: LogEntryType, content: String) {
        self.log.push(TaskLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            entry_type,
            content,
        });
    }

    fn add_usage(&mut self, usage: &TokenUsage) {
        self.usage = Some(self.usage.map_or(*usage, |acc| acc.add(usage)));
    }
}

/// Drives the model through the presentation toolkit.
pub struct PresentationAgent {
    config: Config,
    llm: Arc<dyn LlmClient>,
    http: reqwest::Client,
}

impl PresentationAgent {
    /// Create an agent with an explicit model client.
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("slide_agent/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self { config, llm, http }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one generation request.
    pub async fn run(&self, task: &str) -> Result<RunOutcome, RunError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("presentation_run", %run_id);
        let mut record = RunRecord::default();

        match self.run_inner(task, &mut record).instrument(span).await {
            Ok((path, exit)) => Ok(RunOutcome {
                run_id,
                path,
                exit,
                usage: record.usage,
                log: record.log,
            }),
            Err(cause) => {
                if matches!(cause, RunFailure::NoArtifact { .. } | RunFailure::Io(_)) {
                    record.push(LogEntryType::Error, cause.to_string());
                }
                Err(RunError {
                    run_id,
                    cause,
                    usage: record.usage,
                    log: record.log,
                })
            }
        }
    }

    /// Run one request, collapsing every failure into `None`.
    pub async fn generate(&self, task: &str) -> Option<PathBuf> {
        match self.run(task).await {
            Ok(outcome) => Some(outcome.path),
            Err(e) => {
                error!(run_id = %e.run_id, "Presentation run failed: {}", e);
                None
            }
        }
    }

    async fn run_inner(
        &self,
        task: &str,
        record: &mut RunRecord,
    ) -> Result<(PathBuf, LoopExit), RunFailure> {
        let workspace = self.config.workspace_path.clone();
        // Fixed at start so every file this run claims carries its start time.
        let output_name = artifact::output_file_name(Utc::now().timestamp());
        let tools = ToolRegistry::presentation(
            self.http.clone(),
            self.config.pexels_api_key.clone(),
        );

        info!(
            workspace = %workspace.display(),
            model = %self.config.default_model,
            max_steps = self.config.max_steps,
            "Starting presentation run"
        );

        let exit = self.drive(task, &tools, &workspace, record).await?;
        info!(
            %exit,
            total_tokens = record.usage.map(|u| u.total_tokens),
            "Agent loop finished"
        );

        let path = artifact::claim_latest_presentation(&workspace, &output_name)
            .await?
            .ok_or_else(|| RunFailure::NoArtifact {
                dir: workspace.clone(),
                exit,
            })?;

        record.push(
            LogEntryType::Response,
            format!("Presentation ready at {}", path.display()),
        );
        info!(path = %path.display(), "Presentation run succeeded");

        Ok((path, exit))
    }

    async fn drive(
        &self,
        task: &str,
        tools: &ToolRegistry,
        workspace: &Path,
        record: &mut RunRecord,
    ) -> Result<LoopExit, RunFailure> {
        let mut messages = vec![
            ChatMessage::system(build_system_prompt(tools)),
            ChatMessage::user(task),
        ];
        let tool_schemas = tools.get_tool_schemas();

        for step in 0..self.config.max_steps {
            debug!(step, "Agent step");

            let response = match self
                .llm
                .chat_completion(
                    &self.config.default_model,
                    &messages,
                    Some(tool_schemas.as_slice()),
                )
                .await
            {
                Ok(r) => r,
                Err(source) => {
                    record.push(LogEntryType::Error, format!("Model error: {}", source));
                    return Err(RunFailure::Llm { step, source });
                }
            };

            if let Some(u) = &response.usage {
                record.add_usage(u);
            }
            debug!(step, finish_reason = ?response.finish_reason, "Model responded");
            if let Some(content) = response
                .content
                .as_deref()
                .filter(|c| !c.trim().is_empty())
            {
                debug!(step, content, "Model message");
                record.push(LogEntryType::Thinking, truncate_for_log(content, 2000));
            }

            let tool_calls = response.requested_tools().to_vec();
            if tool_calls.is_empty() {
                info!(step, "No more tool calls");
                return Ok(LoopExit::NoToolsRequested { step });
            }

            messages.push(ChatMessage {
                role: Role::Assistant,
                content: response.content.clone(),
                tool_calls: Some(tool_calls.clone()),
                tool_call_id: None,
            });

            let mut saved = false;
            for tool_call in &tool_calls {
                let result = self
                    .execute_tool_call(step, tool_call, tools, workspace, record)
                    .await?;
                messages.push(ChatMessage::tool_result(tool_call.id.clone(), result));
                saved |= tool_call.function.name == SAVE_PRESENTATION;
            }

            if saved {
                info!(step, "Presentation saved, ending loop");
                return Ok(LoopExit::TerminalSeen { step });
            }
        }

        warn!(steps = self.config.max_steps, "Step budget exhausted without a save");
        Ok(LoopExit::BudgetExhausted {
            steps: self.config.max_steps,
        })
    }

    /// Execute one tool call. Rejections become the tool's reply to the model.
    async fn execute_tool_call(
        &self,
        step: usize,
        tool_call: &ToolCall,
        tools: &ToolRegistry,
        workspace: &Path,
        record: &mut RunRecord,
    ) -> Result<String, RunFailure> {
        let name = &tool_call.function.name;
        record.push(
            LogEntryType::ToolCall,
            format!(
                "Calling tool: {} with args: {}",
                name, tool_call.function.arguments
            ),
        );

        let args: Value =
            serde_json::from_str(&tool_call.function.arguments).unwrap_or(Value::Null);

        let result = match tools.execute(name, args, workspace).await {
            Ok(output) => output,
            Err(ToolError::Rejected(reason)) => {
                warn!(step, tool = %name, %reason, "Tool call rejected");
                format!("Error: {}", reason)
            }
            Err(ToolError::Failed(source)) => {
                record.push(
                    LogEntryType::Error,
                    format!("Tool {} failed: {:#}", name, source),
                );
                return Err(RunFailure::Tool {
                    step,
                    tool: name.clone(),
                    source,
                });
            }
        };

        record.push(LogEntryType::ToolResult, truncate_for_log(&result, 1000));
        Ok(result)
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatResponse, ToolDefinition};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    type Script = Box<dyn Fn(usize) -> Result<ChatResponse, LlmError> + Send + Sync>;

    /// Replays a scripted response per step and records every request.
    struct ScriptedLlm {
        script: Script,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedLlm {
        fn new(
            script: impl Fn(usize) -> Result<ChatResponse, LlmError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Box::new(script),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, index: usize) -> Vec<ChatMessage> {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            messages: &[ChatMessage],
            tools: Option<&[ToolDefinition]>,
        ) -> Result<ChatResponse, LlmError> {
            assert!(tools.is_some_and(|t| !t.is_empty()));
            let step = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(messages.to_vec());
                requests.len() - 1
            };
            (self.script)(step)
        }
    }

    fn text(content: &str) -> ChatResponse {
        ChatResponse {
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    fn calls(step: usize, calls: &[(&str, Value)]) -> ChatResponse {
        let tool_calls = calls
            .iter()
            .enumerate()
            .map(|(i, (name, args))| {
                ToolCall::new(format!("call_{}_{}", step, i), *name, args.clone())
            })
            .collect();
        ChatResponse {
            content: None,
            tool_calls: Some(tool_calls),
            usage: Some(TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            }),
            ..Default::default()
        }
    }

    fn agent(dir: &Path, llm: Arc<ScriptedLlm>) -> PresentationAgent {
        let config = Config::new("test-key".into(), "gpt-4o".into(), dir.to_path_buf());
        PresentationAgent::new(config, llm)
    }

    fn pptx_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn no_tool_calls_and_no_file_is_failure_after_one_step() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(|_| Ok(text("I cannot help with that.")));

        let err = agent(dir.path(), llm.clone())
            .run("Make a deck")
            .await
            .unwrap_err();

        assert_eq!(llm.calls(), 1);
        assert!(matches!(
            err.cause,
            RunFailure::NoArtifact {
                exit: LoopExit::NoToolsRequested { step: 0 },
                ..
            }
        ));
        assert!(err
            .log
            .iter()
            .any(|e| matches!(e.entry_type, LogEntryType::Thinking)));
        assert!(err
            .log
            .iter()
            .any(|e| matches!(e.entry_type, LogEntryType::Error) && e.content.contains(".pptx")));
    }

    #[tokio::test]
    async fn full_tool_sequence_produces_renamed_presentation() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(|step| {
            Ok(match step {
                0 => calls(
                    step,
                    &[("create_presentation", json!({"filename": "output.pptx"}))],
                ),
                1 => calls(
                    step,
                    &[
                        (
                            "add_slide",
                            json!({
                                "title": "Why Renewables Now",
                                "content": "Costs fell\nDemand rose"
                            }),
                        ),
                        (
                            "add_slide",
                            json!({
                                "title": "Solar vs Wind",
                                "content":
                                    "| Metric | Solar | Wind |\n|---|---|---|\n| Cost | Low | Low |"
                            }),
                        ),
                        (
                            "add_slide",
                            json!({"title": "What Comes Next", "content": "Storage\nGrids"}),
                        ),
                    ],
                ),
                2 => calls(
                    step,
                    &[
                        (
                            "add_shape_to_slide",
                            json!({
                                "shape": "pentagon",
                                "title": "Rollout Plan",
                                "content": ">> Step 1: Plan\n>> Step 2: Build"
                            }),
                        ),
                        ("save_presentation", json!({"file_path": "output.pptx"})),
                    ],
                ),
                _ => panic!("no request expected after save"),
            })
        });

        let outcome = agent(dir.path(), llm.clone())
            .run("Renewable energy trends")
            .await
            .unwrap();

        assert_eq!(llm.calls(), 3);
        assert_eq!(outcome.exit, LoopExit::TerminalSeen { step: 2 });
        assert_eq!(outcome.steps(), 3);
        assert_eq!(outcome.usage.map(|u| u.total_tokens), Some(360));

        let name = outcome.path.file_name().unwrap().to_str().unwrap();
        assert!(artifact::is_output_file_name(name), "unexpected name {}", name);
        assert!(outcome.path.is_absolute());
        assert!(outcome.path.exists());
        assert!(!dir.path().join("output.pptx").exists());
        assert!(outcome.log.iter().any(|e| {
            matches!(e.entry_type, LogEntryType::ToolCall)
                && e.content.contains("save_presentation")
        }));
    }

    #[tokio::test]
    async fn uppercase_extension_from_model_is_still_discovered() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(|step| {
            Ok(calls(
                step,
                &[
                    ("create_presentation", json!({"filename": "Deck.PPTX"})),
                    ("add_slide", json!({"title": "Only Slide", "content": "x"})),
                    ("save_presentation", json!({})),
                ],
            ))
        });

        let outcome = agent(dir.path(), llm.clone()).run("tiny").await.unwrap();

        assert_eq!(outcome.exit, LoopExit::TerminalSeen { step: 0 });
        let name = outcome.path.file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(pptx_files(dir.path()), vec![name]);
    }

    #[tokio::test]
    async fn save_on_first_step_stops_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(|step| {
            Ok(calls(
                step,
                &[
                    ("create_presentation", json!({})),
                    ("add_slide", json!({"title": "Only Slide", "content": "x"})),
                    ("save_presentation", json!({})),
                ],
            ))
        });

        let outcome = agent(dir.path(), llm.clone()).run("tiny").await.unwrap();
        assert_eq!(llm.calls(), 1);
        assert_eq!(outcome.exit, LoopExit::TerminalSeen { step: 0 });
    }

    #[tokio::test]
    async fn calls_after_save_in_same_step_still_run() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(|step| {
            Ok(calls(
                step,
                &[
                    ("create_presentation", json!({})),
                    ("save_presentation", json!({})),
                    ("add_slide", json!({"title": "Late Slide", "content": "after save"})),
                ],
            ))
        });

        let outcome = agent(dir.path(), llm.clone()).run("late").await.unwrap();

        assert_eq!(llm.calls(), 1);
        assert_eq!(outcome.exit, LoopExit::TerminalSeen { step: 0 });
        let results: Vec<&str> = outcome
            .log
            .iter()
            .filter(|e| matches!(e.entry_type, LogEntryType::ToolResult))
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[2], "Added slide 1: Late Slide");
    }

    #[tokio::test]
    async fn budget_exhaustion_still_discovers_file_written_mid_loop() {
        let dir = tempfile::tempdir().unwrap();
        let side_file = dir.path().join("written_by_provider.pptx");
        let llm = ScriptedLlm::new(move |step| {
            if step == 4 {
                std::fs::write(&side_file, b"PK").unwrap();
            }
            Ok(calls(
                step,
                &[("add_slide", json!({"title": "Again", "content": "x"}))],
            ))
        });

        let outcome = agent(dir.path(), llm.clone())
            .run("never saves")
            .await
            .unwrap();

        assert_eq!(llm.calls(), 10);
        assert_eq!(outcome.exit, LoopExit::BudgetExhausted { steps: 10 });
        assert!(outcome.path.exists());
    }

    #[tokio::test]
    async fn configured_budget_bounds_inference_steps() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(|step| Ok(calls(step, &[("create_presentation", json!({}))])));
        let config =
            Config::new("k".into(), "m".into(), dir.path().to_path_buf()).with_max_steps(3);

        let err = PresentationAgent::new(config, llm.clone())
            .run("loop forever")
            .await
            .unwrap_err();

        assert_eq!(llm.calls(), 3);
        assert!(matches!(
            err.cause,
            RunFailure::NoArtifact {
                exit: LoopExit::BudgetExhausted { steps: 3 },
                ..
            }
        ));
        assert_eq!(err.usage.map(|u| u.total_tokens), Some(360));
    }

    #[tokio::test]
    async fn conversation_carries_tool_results_and_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(|step| {
            Ok(match step {
                0 => calls(
                    step,
                    &[("add_slide", json!({"title": "Too Early", "content": "x"}))],
                ),
                _ => text("done"),
            })
        });

        let _ = agent(dir.path(), llm.clone()).run("brief").await;

        let first = llm.request(0);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].role, Role::System);
        assert_eq!(first[1].content.as_deref(), Some("brief"));

        let second = llm.request(1);
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, Role::Assistant);
        assert_eq!(second[3].role, Role::Tool);
        assert_eq!(second[3].tool_call_id.as_deref(), Some("call_0_0"));
        assert!(second[3]
            .content
            .as_deref()
            .unwrap()
            .starts_with("Error: No presentation exists yet"));
    }

    #[tokio::test]
    async fn model_error_aborts_and_generate_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(|_| {
            Err(LlmError::Api {
                status: 500,
                body: "upstream down".into(),
            })
        });
        let agent = agent(dir.path(), llm.clone());

        let err = agent.run("anything").await.unwrap_err();
        assert!(matches!(err.cause, RunFailure::Llm { step: 0, .. }));
        assert!(err.log.iter().any(|e| e.content.contains("upstream down")));

        assert!(agent.generate("anything").await.is_none());
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn tool_write_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let llm = ScriptedLlm::new(|step| {
            Ok(calls(
                step,
                &[
                    ("create_presentation", json!({})),
                    ("save_presentation", json!({})),
                ],
            ))
        });
        let config = Config::new("k".into(), "m".into(), missing);

        let err = PresentationAgent::new(config, llm.clone())
            .run("x")
            .await
            .unwrap_err();

        assert_eq!(llm.calls(), 1);
        assert!(matches!(
            err.cause,
            RunFailure::Tool { ref tool, step: 0, .. } if tool == SAVE_PRESENTATION
        ));
    }

    #[tokio::test]
    async fn empty_instruction_is_processed_normally() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(|_| Ok(text("")));

        let err = agent(dir.path(), llm.clone()).run("").await.unwrap_err();

        assert_eq!(llm.request(0)[1].content.as_deref(), Some(""));
        assert!(matches!(err.cause, RunFailure::NoArtifact { .. }));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "ééééé";
        let out = truncate_for_log(s, 3);
        assert!(out.starts_with("é"));
        assert!(out.ends_with("[truncated]"));
    }
}
