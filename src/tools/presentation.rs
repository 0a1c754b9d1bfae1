//! Presentation-building tools: create, add slides, add shapes, save.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{fetch_image, required_str, Tool, ToolError};
use crate::pptx::{self, Deck, ShapeKind};

const DEFAULT_FILE_NAME: &str = "output.pptx";

/// The deck shared by the tools of one registry.
#[derive(Clone, Default)]
pub struct DeckSession {
    deck: Arc<Mutex<Option<Deck>>>,
}

impl DeckSession {
    async fn start(&self, file_name: String) {
        *self.deck.lock().await = Some(Deck::new(file_name));
    }

    async fn with_deck<R>(&self, f: impl FnOnce(&mut Deck) -> R) -> Result<R, ToolError> {
        let mut guard = self.deck.lock().await;
        let deck = guard.as_mut().ok_or_else(|| {
            ToolError::rejected("No presentation exists yet. Call create_presentation first.")
        })?;
        Ok(f(deck))
    }

    /// Number of slides in the current deck, if one was created.
    pub async fn slide_count(&self) -> Option<usize> {
        self.deck.lock().await.as_ref().map(Deck::slide_count)
    }
}

/// Reduce a model-supplied path to a bare `.pptx` file name inside the workspace.
fn sanitize_file_name(raw: Option<&str>) -> String {
    let name = raw
        .and_then(|r| Path::new(r.trim()).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "..")
        .unwrap_or(DEFAULT_FILE_NAME);
    // Discovery matches the lowercase extension only.
    match name.len().checked_sub(5) {
        Some(stem)
            if name.is_char_boundary(stem) && name[stem..].eq_ignore_ascii_case(".pptx") =>
        {
            format!("{}.pptx", &name[..stem])
        }
        _ => format!("{}.pptx", name),
    }
}

fn slide_schema(extra: Value, required: &[&str]) -> Value {
    let mut properties = json!({
        "title": {
            "type": "string",
            "description": "Specific, engaging slide title"
        },
        "content": {
            "type": "string",
            "description": "Slide body. Separate bullet points with '\\n'. \
                            A markdown table (| a | b | rows with a |---| separator) \
                            is rendered as a table."
        }
    });
    if let (Some(props), Some(extra)) = (properties.as_object_mut(), extra.as_object()) {
        props.extend(extra.clone());
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Start a new, empty presentation.
pub struct CreatePresentation {
    session: DeckSession,
}

impl CreatePresentation {
    pub fn new(session: DeckSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Tool for CreatePresentation {
    fn name(&self) -> &str {
        "create_presentation"
    }

    fn description(&self) -> &str {
        "Create a new, empty PowerPoint presentation. Must be called before any slide is added."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "File name for the presentation (default: output.pptx)"
                }
            }
        })
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> Result<String, ToolError> {
        let file_name = sanitize_file_name(args["filename"].as_str());
        self.session.start(file_name.clone()).await;
        tracing::info!(file = %file_name, "Created presentation");
        Ok(format!(
            "Created presentation '{}'. Add slides with add_slide.",
            file_name
        ))
    }
}

/// Append a bullet (or table) slide.
pub struct AddSlide {
    session: DeckSession,
}

impl AddSlide {
    pub fn new(session: DeckSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Tool for AddSlide {
    fn name(&self) -> &str {
        "add_slide"
    }

    fn description(&self) -> &str {
        "Add a slide with a title and bullet-point content. \
         Markdown tables in the content become slide tables."
    }

    fn parameters_schema(&self) -> Value {
        slide_schema(json!({}), &["title", "content"])
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> Result<String, ToolError> {
        let title = required_str(&args, "title")?;
        let content = args["content"].as_str().unwrap_or("");
        let number = self
            .session
            .with_deck(|deck| deck.add_text_slide(title, content))
            .await?;
        Ok(format!("Added slide {}: {}", number, title))
    }
}

/// Append a slide with bullets and a downloaded picture.
pub struct AddImageToSlide {
    session: DeckSession,
    http: reqwest::Client,
}

impl AddImageToSlide {
    pub fn new(session: DeckSession, http: reqwest::Client) -> Self {
        Self { session, http }
    }
}

#[async_trait]
impl Tool for AddImageToSlide {
    fn name(&self) -> &str {
        "add_image_to_slide"
    }

    fn description(&self) -> &str {
        "Add a slide with a title, bullet content on the left and an image \
         (downloaded from image_url) on the right. Use a URL returned by search_image."
    }

    fn parameters_schema(&self) -> Value {
        slide_schema(
            json!({
                "image_url": {
                    "type": "string",
                    "description": "HTTP(S) URL of a PNG, JPEG or GIF image"
                }
            }),
            &["image_url", "title"],
        )
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> Result<String, ToolError> {
        let image_url = required_str(&args, "image_url")?;
        let title = required_str(&args, "title")?;
        let content = args["content"].as_str().unwrap_or("");

        // Fail fast before downloading when there is no deck to add to.
        if self.session.slide_count().await.is_none() {
            return Err(ToolError::rejected(
                "No presentation exists yet. Call create_presentation first.",
            ));
        }

        let image = fetch_image(&self.http, image_url).await?;
        let number = self
            .session
            .with_deck(|deck| deck.add_picture_slide(title, content, image))
            .await?;
        Ok(format!("Added image slide {}: {}", number, title))
    }
}

/// Append a process slide made of arrow shapes.
pub struct AddShapeToSlide {
    session: DeckSession,
}

impl AddShapeToSlide {
    pub fn new(session: DeckSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Tool for AddShapeToSlide {
    fn name(&self) -> &str {
        "add_shape_to_slide"
    }

    fn description(&self) -> &str {
        "Add a step-by-step process slide drawn as a row of arrow shapes, \
         one per content line. Use '>> Step X: ...' lines."
    }

    fn parameters_schema(&self) -> Value {
        slide_schema(
            json!({
                "shape": {
                    "type": "string",
                    "enum": ["pentagon", "chevron"],
                    "description": "Arrow style for the process steps"
                }
            }),
            &["shape", "title", "content"],
        )
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> Result<String, ToolError> {
        let shape: ShapeKind = args["shape"]
            .as_str()
            .unwrap_or("pentagon")
            .parse()
            .map_err(ToolError::Rejected)?;
        let title = required_str(&args, "title")?;
        let content = required_str(&args, "content")?;
        let number = self
            .session
            .with_deck(|deck| deck.add_process_slide(title, content, shape))
            .await?;
        Ok(format!("Added {} process slide {}: {}", shape, number, title))
    }
}

/// Write the deck to disk.
pub struct SavePresentation {
    session: DeckSession,
}

impl SavePresentation {
    pub fn new(session: DeckSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Tool for SavePresentation {
    fn name(&self) -> &str {
        super::SAVE_PRESENTATION
    }

    fn description(&self) -> &str {
        "Save the presentation as a .pptx file in the working directory. Call this last."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description":
                        "File name to save as (default: the name given to create_presentation)"
                }
            }
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> Result<String, ToolError> {
        let requested = args["file_path"].as_str().map(|p| sanitize_file_name(Some(p)));
        let (file_name, slides, bytes) = self
            .session
            .with_deck(|deck| {
                if let Some(name) = requested {
                    deck.set_file_name(name);
                }
                (
                    deck.file_name().to_string(),
                    deck.slide_count(),
                    pptx::write_package(deck),
                )
            })
            .await?;

        let bytes = bytes.context("Failed to serialize presentation")?;
        let path = workspace.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(path = %path.display(), slides, "Saved presentation");
        Ok(format!(
            "Saved presentation with {} slides to {}",
            slides,
            path.display()
        ))
    }
}
