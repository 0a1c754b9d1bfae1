//! In-memory slide deck and its PresentationML (`.pptx`) serialization.
//!
//! The presentation tools mutate a [`Deck`]; `save_presentation` hands it to
//! [`write_package`] which produces a complete OOXML zip container.

mod media;
mod package;
mod slide;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use media::{Image, ImageFormat};
pub use package::write_package;

#[cfg(test)]
pub(crate) use media::tests::TINY_PNG;

/// Errors raised while serializing a deck.
#[derive(Debug, Error)]
pub enum PptxError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xml formatting error")]
    Fmt(#[from] fmt::Error),
}

/// Preset geometry used for process slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Pentagon,
    Chevron,
}

impl ShapeKind {
    /// DrawingML preset geometry name.
    pub fn preset(self) -> &'static str {
        match self {
            // The arrow-like pentagon is called "homePlate" in DrawingML.
            ShapeKind::Pentagon => "homePlate",
            ShapeKind::Chevron => "chevron",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapeKind::Pentagon => "pentagon",
            ShapeKind::Chevron => "chevron",
        })
    }
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pentagon" | "homeplate" => Ok(ShapeKind::Pentagon),
            "chevron" => Ok(ShapeKind::Chevron),
            other => Err(format!(
                "unsupported shape '{}', expected 'pentagon' or 'chevron'",
                other
            )),
        }
    }
}

/// A pipe-delimited table extracted from slide content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

/// What a slide shows below its title.
#[derive(Debug, Clone)]
pub enum SlideBody {
    /// Bullet list, optionally followed by a table.
    Text {
        bullets: Vec<String>,
        table: Option<Table>,
    },
    /// Bullets on the left, picture on the right.
    Picture { bullets: Vec<String>, image: Image },
    /// Row of arrow shapes, one per step.
    Process {
        shape: ShapeKind,
        steps: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Slide {
    pub title: String,
    pub body: SlideBody,
}

/// A presentation under construction.
#[derive(Debug, Clone)]
pub struct Deck {
    file_name: String,
    slides: Vec<Slide>,
}

impl Deck {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            slides: Vec::new(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Add a text slide; markdown tables inside `content` become real tables.
    pub fn add_text_slide(&mut self, title: &str, content: &str) -> usize {
        let (bullets, table) = parse_content(content);
        self.push(title, SlideBody::Text { bullets, table })
    }

    pub fn add_picture_slide(&mut self, title: &str, content: &str, image: Image) -> usize {
        let (bullets, _) = parse_content(content);
        self.push(title, SlideBody::Picture { bullets, image })
    }

    pub fn add_process_slide(&mut self, title: &str, content: &str, shape: ShapeKind) -> usize {
        let steps = content
            .lines()
            .map(|l| l.trim().trim_start_matches(">>").trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        self.push(title, SlideBody::Process { shape, steps })
    }

    fn push(&mut self, title: &str, body: SlideBody) -> usize {
        self.slides.push(Slide {
            title: title.trim().to_string(),
            body,
        });
        self.slides.len()
    }
}

/// Split slide content into bullet lines and an optional pipe table.
///
/// A table needs at least a header row and a `|---|` separator row; pipe lines
/// without a separator are kept as plain bullets.
pub fn parse_content(content: &str) -> (Vec<String>, Option<Table>) {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let pipe_lines: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with('|')).collect();
    let has_separator = pipe_lines.iter().any(|l| is_separator_row(l));

    let table = if pipe_lines.len() >= 2 && has_separator {
        let mut rows = pipe_lines
            .iter()
            .filter(|l| !is_separator_row(l))
            .map(|l| split_row(l));
        rows.next().map(|header| Table {
            header,
            rows: rows.collect(),
        })
    } else {
        None
    };

    let bullets = lines
        .iter()
        .filter(|l| table.is_none() || !l.starts_with('|'))
        .map(|l| strip_bullet(l).to_string())
        .collect();

    (bullets, table)
}

fn is_separator_row(line: &str) -> bool {
    line.contains('-')
        && line
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

fn split_row(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

fn strip_bullet(line: &str) -> &str {
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    line
}

/// Escape XML special characters.
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
