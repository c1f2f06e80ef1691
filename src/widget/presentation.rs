//! Markup rendering for the widget
//!
//! The controller owns all state; a `Presenter` turns a `WidgetView` snapshot
//! into HTML. Two strategies exist: `CdnPresenter` for the self-contained
//! script bundle (semantic classes, inline theme variables) and
//! `UtilityPresenter` for hosts that already ship a utility-first stylesheet.

use pulldown_cmark::{html, Event, Options, Parser};
use std::fmt::Write as _;

use super::{ChatStatus, DisplayState, Position, Suggestion, WidgetController};
use crate::protocol::{UiMessage, UiRole};

pub const WELCOME_HEADING: &str = "Halo, Bapak/Ibu Guru!";
pub const WELCOME_BODY: &str =
    "Saya siap membantu Anda menyusun materi, rencana pembelajaran, atau menjawab pertanyaan seputar pendidikan.";
pub const INPUT_PLACEHOLDER: &str = "Ketik pesan Anda...";
pub const FOOTER_NOTE: &str = "Didukung oleh AI. Mohon verifikasi informasi penting.";

const LIGHT_PALETTE: &[(&str, &str)] = &[
    ("--radius", "0.625rem"),
    ("--background", "#fff"),
    ("--foreground", "#0a0a0a"),
    ("--card", "#fff"),
    ("--card-foreground", "#0a0a0a"),
    ("--popover", "#fff"),
    ("--popover-foreground", "#0a0a0a"),
    ("--primary", "#171717"),
    ("--primary-foreground", "#fafafa"),
    ("--secondary", "#f5f5f5"),
    ("--secondary-foreground", "#171717"),
    ("--muted", "#f5f5f5"),
    ("--muted-foreground", "#737373"),
    ("--accent", "#f5f5f5"),
    ("--accent-foreground", "#171717"),
    ("--destructive", "#e40014"),
    ("--border", "#e5e5e5"),
    ("--input", "#e5e5e5"),
    ("--ring", "#a1a1a1"),
];

const DARK_PALETTE: &[(&str, &str)] = &[
    ("--background", "#0a0a0a"),
    ("--foreground", "#fafafa"),
    ("--card", "#171717"),
    ("--card-foreground", "#fafafa"),
    ("--popover", "#171717"),
    ("--popover-foreground", "#fafafa"),
    ("--primary", "#e5e5e5"),
    ("--primary-foreground", "#171717"),
    ("--secondary", "#262626"),
    ("--secondary-foreground", "#fafafa"),
    ("--muted", "#262626"),
    ("--muted-foreground", "#a1a1a1"),
    ("--accent", "#262626"),
    ("--accent-foreground", "#fafafa"),
    ("--destructive", "#ff6568"),
    ("--border", "#ffffff1a"),
    ("--input", "#ffffff26"),
    ("--ring", "#737373"),
];

/// One rendered chat bubble
#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub role: UiRole,
    pub text: String,
}

impl MessageView {
    fn from_message(message: &UiMessage) -> Self {
        Self {
            role: message.role,
            text: message.text_content(),
        }
    }
}

/// Everything a presenter needs, detached from the controller
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetView {
    pub title: String,
    pub position: Position,
    pub dark_mode: bool,
    pub primary_color: Option<String>,
    pub display: DisplayState,
    pub messages: Vec<MessageView>,
    pub loading: bool,
    pub error: Option<String>,
    pub input: String,
    pub can_send: bool,
    pub suggestions: &'static [Suggestion],
}

impl WidgetView {
    pub fn from_controller(controller: &WidgetController) -> Self {
        let config = controller.config();
        Self {
            title: config.title.clone(),
            position: config.position,
            dark_mode: config.dark_mode,
            primary_color: config.primary_color.clone(),
            display: controller.display_state(),
            messages: controller
                .messages()
                .iter()
                .map(MessageView::from_message)
                .filter(|m| !m.text.is_empty())
                .collect(),
            loading: controller.is_loading(),
            error: match controller.status() {
                ChatStatus::Error(message) => Some(message.clone()),
                _ => None,
            },
            input: controller.input().to_string(),
            can_send: controller.can_send(),
            suggestions: controller.suggestions(),
        }
    }
}

/// Width and height of the chat window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: &'static str,
    pub height: &'static str,
}

pub trait Presenter {
    /// Classes placed on the outermost container
    fn container_classes(&self, view: &WidgetView) -> String;

    /// Inline style for the outermost container
    fn container_style(&self, view: &WidgetView) -> String;

    fn window_size(&self, display: DisplayState) -> WindowSize;

    fn render(&self, view: &WidgetView) -> String {
        let size = self.window_size(view.display);
        let mut out = String::new();
        let _ = write!(
            out,
            r#"<div id="smeduverse-ai-widget" class="{}""#,
            escape(&self.container_classes(view))
        );
        let style = self.container_style(view);
        if !style.is_empty() {
            let _ = write!(out, r#" style="{}""#, escape(&style));
        }
        out.push('>');

        let _ = write!(
            out,
            r#"<section class="smeduverse-window" data-state="{}" style="width: {}; height: {}">"#,
            display_name(view.display),
            size.width,
            size.height
        );
        if view.display != DisplayState::Closed {
            render_window(&mut out, view);
        }
        out.push_str("</section>");

        let _ = write!(
            out,
            r#"<button class="smeduverse-launcher" aria-label="{}" aria-expanded="{}"></button>"#,
            if view.display == DisplayState::Closed {
                "Buka chat"
            } else {
                "Tutup chat"
            },
            view.display != DisplayState::Closed
        );
        out.push_str("</div>");
        out
    }
}

/// Self-contained bundle styling
#[derive(Debug, Clone, Copy, Default)]
pub struct CdnPresenter;

impl Presenter for CdnPresenter {
    fn container_classes(&self, view: &WidgetView) -> String {
        let mut classes = format!("smeduverse-widget {}", view.position.semantic_class());
        if view.dark_mode {
            classes.push_str(" dark");
        }
        classes
    }

    fn container_style(&self, view: &WidgetView) -> String {
        theme_variables(view.dark_mode, view.primary_color.as_deref())
    }

    fn window_size(&self, display: DisplayState) -> WindowSize {
        match display {
            DisplayState::Closed => WindowSize {
                width: "0px",
                height: "0px",
            },
            DisplayState::Open => WindowSize {
                width: "400px",
                height: "600px",
            },
            DisplayState::OpenExpanded => WindowSize {
                width: "920px",
                height: "80vh",
            },
        }
    }
}

/// Styling for hosts with a utility-first stylesheet
#[derive(Debug, Clone, Copy, Default)]
pub struct UtilityPresenter;

impl Presenter for UtilityPresenter {
    fn container_classes(&self, view: &WidgetView) -> String {
        let mut classes = format!(
            "fixed z-99999 flex flex-col gap-4 font-sans {}",
            view.position.utility_classes()
        );
        if view.dark_mode {
            classes.push_str(" dark");
        }
        classes
    }

    fn container_style(&self, view: &WidgetView) -> String {
        match &view.primary_color {
            Some(color) => format!("--primary: {};", color),
            None => String::new(),
        }
    }

    fn window_size(&self, display: DisplayState) -> WindowSize {
        match display {
            DisplayState::Closed => WindowSize {
                width: "0px",
                height: "0px",
            },
            DisplayState::Open => WindowSize {
                width: "550px",
                height: "600px",
            },
            DisplayState::OpenExpanded => WindowSize {
                width: "920px",
                height: "80vh",
            },
        }
    }
}

/// Inline custom properties for the light or dark palette
pub fn theme_variables(dark_mode: bool, primary_color: Option<&str>) -> String {
    let mut vars: Vec<(&str, &str)> = LIGHT_PALETTE.to_vec();
    if dark_mode {
        for &(name, value) in DARK_PALETTE {
            if let Some(slot) = vars.iter_mut().find(|(n, _)| *n == name) {
                slot.1 = value;
            }
        }
    }
    if let Some(color) = primary_color {
        if let Some(slot) = vars.iter_mut().find(|(n, _)| *n == "--primary") {
            slot.1 = color;
        }
    }

    vars.iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render assistant markdown to HTML; raw HTML in the source is escaped
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn render_window(out: &mut String, view: &WidgetView) {
    let _ = write!(
        out,
        r#"<header class="smeduverse-header"><h2>{}</h2><button class="smeduverse-expand" aria-label="{}"></button><button class="smeduverse-close" aria-label="Tutup"></button></header>"#,
        escape(&view.title),
        if view.display == DisplayState::OpenExpanded {
            "Perkecil"
        } else {
            "Perbesar"
        }
    );

    out.push_str(r#"<div class="smeduverse-messages">"#);
    if view.messages.is_empty() {
        render_welcome(out, view.suggestions);
    }
    for message in &view.messages {
        match message.role {
            UiRole::User => {
                let _ = write!(
                    out,
                    r#"<div class="smeduverse-message user">{}</div>"#,
                    escape(&message.text)
                );
            }
            UiRole::Assistant | UiRole::System => {
                let _ = write!(
                    out,
                    r#"<div class="smeduverse-message assistant">{}</div>"#,
                    render_markdown(&message.text)
                );
            }
        }
    }
    if view.loading {
        out.push_str(
            r#"<div class="smeduverse-loading" aria-label="Memuat"><span></span><span></span><span></span></div>"#,
        );
    }
    if let Some(error) = &view.error {
        let _ = write!(
            out,
            r#"<div class="smeduverse-error" role="alert">{}</div>"#,
            escape(error)
        );
    }
    out.push_str("</div>");

    let _ = write!(
        out,
        r#"<form class="smeduverse-input"><textarea placeholder="{}">{}</textarea><button type="submit"{}>Kirim</button></form>"#,
        INPUT_PLACEHOLDER,
        escape(&view.input),
        if view.can_send { "" } else { " disabled" }
    );
    let _ = write!(out, r#"<footer class="smeduverse-footer">{}</footer>"#, FOOTER_NOTE);
}

fn render_welcome(out: &mut String, suggestions: &[Suggestion]) {
    let _ = write!(
        out,
        r#"<div class="smeduverse-welcome"><h3>{}</h3><p>{}</p>"#,
        WELCOME_HEADING, WELCOME_BODY
    );
    for suggestion in suggestions {
        let _ = write!(
            out,
            r#"<button class="smeduverse-suggestion" data-prompt="{}">{}</button>"#,
            escape(suggestion.prompt),
            escape(suggestion.label)
        );
    }
    out.push_str("</div>");
}

fn display_name(display: DisplayState) -> &'static str {
    match display {
        DisplayState::Closed => "closed",
        DisplayState::Open => "open",
        DisplayState::OpenExpanded => "expanded",
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
