//! Presentation request form: parameters, instruction synthesis, and HTML pages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pptx::escape_xml as escape_html;

pub const MIN_SLIDES: u8 = 3;
pub const MAX_SLIDES: u8 = 20;
pub const DEFAULT_SLIDES: u8 = 10;

pub const EXAMPLE_PROMPTS: [&str; 3] = [
    "Create a 12-slide business presentation about digital marketing trends in 2024 with charts",
    "Make a 5-slide academic presentation about quantum computing basics with diagrams",
    "Generate a 8-slide creative pitch deck for a startup idea about sustainable fashion",
];

/// Generates a closed, case-insensitive option set for a form select.
macro_rules! form_choice {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn lowercase(&self) -> String {
                self.label().to_lowercase()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| format!("unknown {}: {}", stringify!($name), s))
            }
        }
    };
}

form_choice! {
    /// Presentation style offered by the form.
    SlideStyle {
        Professional => "Professional",
        Creative => "Creative",
        Academic => "Academic",
        Minimalist => "Minimalist",
        Business => "Business",
    }
}

form_choice! {
    /// Color theme offered by the form.
    ColorTheme {
        Dark => "Dark",
        Matrix => "Matrix",
        Midnight => "Midnight",
        Cyberpunk => "Cyberpunk",
        Obsidian => "Obsidian",
    }
}

/// Validated form parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationRequest {
    pub task: String,
    pub slide_count: u8,
    pub style: SlideStyle,
    pub color_theme: ColorTheme,
}

impl PresentationRequest {
    pub fn new(
        task: impl Into<String>,
        slide_count: u8,
        style: SlideStyle,
        color_theme: ColorTheme,
    ) -> Self {
        Self {
            task: task.into(),
            slide_count: slide_count.clamp(MIN_SLIDES, MAX_SLIDES),
            style,
            color_theme,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.task.trim().is_empty()
    }

    /// The single instruction handed to the agent.
    pub fn instruction(&self) -> String {
        format!(
            "{}. Make it {} slides in {} style with {} color theme.",
            self.task,
            self.slide_count,
            self.style.lowercase(),
            self.color_theme.lowercase()
        )
    }
}

/// Raw url-encoded body of `POST /generate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub task: String,
    pub slide_count: Option<String>,
    pub style: Option<String>,
    pub color_theme: Option<String>,
}

impl GenerateForm {
    /// Unparseable values fall back to the form defaults.
    pub fn into_request(self) -> PresentationRequest {
        let slide_count = self
            .slide_count
            .and_then(|v| v.trim().parse::<u8>().ok())
            .unwrap_or(DEFAULT_SLIDES);
        let style = self.style.and_then(|v| v.parse().ok()).unwrap_or_default();
        let color_theme = self.color_theme.and_then(|v| v.parse().ok()).unwrap_or_default();
        PresentationRequest::new(self.task, slide_count, style, color_theme)
    }
}

/// What to show beneath the form.
#[derive(Debug, Clone)]
pub enum Notice {
    None,
    Examples,
    BlankTask,
    Success { download_href: String },
    Failure,
}

const STYLE: &str = r#"
:root {
  --primary-color: #9fef00;
  --bg-color: #0a0a0a;
  --text-color: #ffffff;
  --secondary-text: #b3b3b3;
  --card-bg: #1a1a1a;
}
body { background-color: var(--bg-color); color: var(--text-color); font-family: system-ui, sans-serif; margin: 0; }
.layout { display: flex; min-height: 100vh; }
.sidebar { width: 280px; background-color: #111; border-right: 1px solid #333; padding: 1.5rem; }
.main { flex: 1; padding: 2rem; }
.header { text-align: center; margin-bottom: 2rem; }
.title { font-size: 2.2rem; font-weight: 700; color: #ffffff; }
.subtitle { font-size: 1rem; color: var(--secondary-text); }
label { display: block; margin: 1rem 0 0.4rem; font-weight: 600; }
textarea { width: 100%; min-height: 150px; background-color: var(--card-bg); color: var(--text-color); border: 1px solid #333; padding: 0.6rem; box-sizing: border-box; }
select, input[type=range] { width: 100%; background-color: var(--card-bg); color: var(--text-color); accent-color: var(--primary-color); }
.buttons { display: flex; gap: 1rem; margin-top: 1rem; }
button, .download-btn { padding: 0.5rem 1rem; border: 1px solid var(--primary-color); background: var(--card-bg); color: var(--text-color); font-weight: 500; cursor: pointer; text-decoration: none; }
button:hover, .download-btn:hover { opacity: 0.8; }
button.primary, .download-btn { background-color: var(--primary-color); color: #000; font-weight: bold; }
.download-btn { display: block; text-align: center; margin-top: 1rem; }
.success-box { background-color: #1e3a1e; border-radius: 8px; padding: 1rem; margin: 1rem 0; border-left: 4px solid var(--primary-color); }
.info-box { background-color: #10243a; border-radius: 8px; padding: 1rem; margin: 1rem 0; }
.warning-box { background-color: #3a331e; border-radius: 8px; padding: 1rem; margin: 1rem 0; }
.error-box { background-color: #3a1e1e; border-radius: 8px; padding: 1rem; margin: 1rem 0; }
.hint { text-align: center; margin-top: 1rem; color: var(--secondary-text); }
"#;

fn options<T: Copy + PartialEq + fmt::Display>(all: &[T], selected: T) -> String {
    all.iter()
        .map(|v| {
            let attr = if *v == selected { " selected" } else { "" };
            format!("<option value=\"{v}\"{attr}>{v}</option>")
        })
        .collect()
}

fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::None => String::new(),
        Notice::Examples => {
            let items: String = EXAMPLE_PROMPTS
                .iter()
                .map(|p| format!("<li>\"{}\"</li>", escape_html(p)))
                .collect();
            format!(
                "<div class=\"info-box\"><strong>Example Prompts:</strong><ul>{items}</ul></div>"
            )
        }
        Notice::BlankTask => {
            "<div class=\"warning-box\">Please enter a valid presentation request</div>".to_string()
        }
        Notice::Success { download_href } => format!(
            "<div class=\"success-box\">Your presentation has been successfully generated!</div>\
             <a class=\"download-btn\" href=\"{}\">Download PowerPoint File</a>\
             <div class=\"hint\">Need changes? Modify your request above and generate again.</div>",
            escape_html(download_href)
        ),
        Notice::Failure => "<div class=\"error-box\">Failed to generate presentation. \
             Please check your request and try again.</div>"
            .to_string(),
    }
}

/// Render the full page with the form pre-filled from `request`.
pub fn render_page(request: &PresentationRequest, notice: &Notice) -> String {
    let placeholder = format!(
        "Example: 'Create a {}-slide {} presentation about renewable energy trends \
         with statistics and diagrams'",
        request.slide_count,
        request.style.lowercase()
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>AI PowerPoint Generator</title>
<style>{style}</style>
</head>
<body>
<form method="post" action="/generate" class="layout">
  <aside class="sidebar">
    <h2>Presentation Settings</h2>
    <label for="slide_count">Number of slides: <output id="slide_count_value">{count}</output></label>
    <input type="range" id="slide_count" name="slide_count" min="{min}" max="{max}" value="{count}"
      oninput="document.getElementById('slide_count_value').value = this.value">
    <label for="style">Presentation Style</label>
    <select id="style" name="style">{styles}</select>
    <label for="color_theme">Color Theme</label>
    <select id="color_theme" name="color_theme">{themes}</select>
    <hr>
    <h3>About</h3>
    <p>This tool uses AI to generate PowerPoint presentations instantly. Just describe what you need!</p>
  </aside>
  <main class="main">
    <div class="header">
      <div class="title">Smart Presentation Maker</div>
      <div class="subtitle">Create professional presentations in seconds</div>
    </div>
    <label for="task">Presentation Request</label>
    <textarea id="task" name="task" placeholder="{placeholder}">{task}</textarea>
    <div class="buttons">
      <button type="submit" class="primary">Generate Presentation</button>
      <a href="/?examples=1"><button type="button">Show Examples</button></a>
    </div>
    {notice}
  </main>
</form>
</body>
</html>"#,
        style = STYLE,
        count = request.slide_count,
        min = MIN_SLIDES,
        max = MAX_SLIDES,
        styles = options(SlideStyle::ALL, request.style),
        themes = options(ColorTheme::ALL, request.color_theme),
        placeholder = escape_html(&placeholder),
        task = escape_html(&request.task),
        notice = render_notice(notice),
    )
}
