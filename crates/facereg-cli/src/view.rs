//! Rendering. The controller decides what changed; a [`View`] draws it.

use crate::state::AppState;
use crate::widget::{RecognizePanel, RegisterPanel, UploadWidget, WidgetKind, WidgetState};
use facereg_core::format::{format_similarity, format_timestamp};
use facereg_core::{FaceRecord, RecognitionMatch};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Register,
    Recognize,
    Manage,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Register => "register",
            Tab::Recognize => "recognize",
            Tab::Manage => "manage",
        }
    }
}

impl std::str::FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" | "reg" => Ok(Tab::Register),
            "recognize" | "rec" => Ok(Tab::Recognize),
            "manage" | "list" => Ok(Tab::Manage),
            other => Err(format!("unknown tab: {other} (register, recognize, manage)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

pub trait View: Send {
    fn status(&mut self, online: bool);
    /// Loading indicator; on while any foreground request is in flight.
    fn busy(&mut self, on: bool);
    fn toast(&mut self, toast: &Toast);
    fn dismiss_toast(&mut self);
    fn tab(&mut self, tab: Tab);
    fn register_form(&mut self, panel: &RegisterPanel);
    fn recognize_form(&mut self, panel: &RecognizePanel);
    /// `None` clears the preview and shows the placeholder.
    fn preview(&mut self, widget: WidgetKind, preview: Option<&str>);
    /// `None` hides the results box.
    fn results(&mut self, results: Option<&[RecognitionMatch]>);
    fn face_list(&mut self, state: &AppState);
    fn confirm(&mut self, prompt: &str);
}

pub const EMPTY_LIST_MESSAGE: &str = "no faces enrolled yet";
pub const NO_MATCH_MESSAGE: &str = "no matching face found";

/// `Ann  person: p1 | registered: 2024-03-05 07:09  remark: front door`
pub fn face_row(face: &FaceRecord) -> String {
    let mut row = format!(
        "{:<20} person: {}",
        face.display_name(),
        face.display_person_id()
    );
    if let Some(ts) = face.create_time.and_then(format_timestamp) {
        row.push_str(&format!(" | registered: {ts}"));
    }
    if let Some(remark) = face.display_remark() {
        row.push_str(&format!("  remark: {remark}"));
    }
    row
}

/// `[high 82.34%] Ann  person: p1  remark: front door`
pub fn match_row(m: &RecognitionMatch) -> String {
    let mut row = format!(
        "[{} {}] {}  person: {}",
        m.level(),
        format_similarity(m.similarity),
        m.display_name(),
        m.display_person_id()
    );
    if let Some(remark) = m.display_remark() {
        row.push_str(&format!("  remark: {remark}"));
    }
    row
}

/// Line-oriented view for the interactive shell.
pub struct TerminalView<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }

    fn image_line(&mut self, widget: &UploadWidget) {
        let image = widget
            .image()
            .map(|i| i.preview())
            .unwrap_or_else(|| "(none, use `image <path>`)".to_string());
        self.line(&format!("  image:     {image}"));
        match widget.state() {
            WidgetState::Submitting { .. } => self.line("  (request in progress)"),
            WidgetState::Failed { error, .. } => self.line(&format!("  last attempt: {error}")),
            WidgetState::Empty | WidgetState::Selected(_) => {}
        }
    }
}

impl<W: Write + Send> View for TerminalView<W> {
    fn status(&mut self, online: bool) {
        let text = if online {
            "service online"
        } else {
            "service offline"
        };
        self.line(&format!("[status] {text}"));
    }

    fn busy(&mut self, on: bool) {
        if on {
            self.line("working...");
        }
    }

    fn toast(&mut self, toast: &Toast) {
        let tag = match toast.level {
            ToastLevel::Success => "ok",
            ToastLevel::Warning => "warn",
            ToastLevel::Error => "error",
        };
        self.line(&format!("[{tag}] {}", toast.message));
    }

    // Printed lines cannot be retracted.
    fn dismiss_toast(&mut self) {}

    fn tab(&mut self, tab: Tab) {
        self.line(&format!("== {} ==", tab.as_str()));
    }

    fn register_form(&mut self, panel: &RegisterPanel) {
        self.image_line(&panel.widget);
        self.line(&format!("  name:      {}", panel.name));
        self.line(&format!("  person id: {}", panel.person_id));
        self.line(&format!("  remark:    {}", panel.remark));
    }

    fn recognize_form(&mut self, panel: &RecognizePanel) {
        self.image_line(&panel.widget);
        self.line(&format!("  threshold: {:.2}", panel.threshold()));
        self.line(&format!("  top k:     {}", panel.top_k));
        if let Some(results) = &panel.results {
            self.results(Some(results));
        }
    }

    fn preview(&mut self, widget: WidgetKind, preview: Option<&str>) {
        match preview {
            Some(p) => self.line(&format!("[{}] image: {p}", widget.as_str())),
            None => self.line(&format!("[{}] image cleared", widget.as_str())),
        }
    }

    fn results(&mut self, results: Option<&[RecognitionMatch]>) {
        let Some(results) = results else {
            return;
        };
        if results.is_empty() {
            self.line(&format!("  {NO_MATCH_MESSAGE}"));
            return;
        }
        for m in results {
            self.line(&format!("  {}", match_row(m)));
        }
    }

    fn face_list(&mut self, state: &AppState) {
        let faces = state.active();
        let scope = if state.is_filtered() { "matching" } else { "total" };
        self.line(&format!("faces ({scope}: {})", faces.len()));
        if faces.is_empty() {
            self.line(&format!("  {EMPTY_LIST_MESSAGE}"));
            self.line("  enroll one from the register tab");
            return;
        }
        for face in faces {
            self.line(&format!("  {}  {}", face.face_id, face_row(face)));
        }
    }

    fn confirm(&mut self, prompt: &str) {
        self.line(&format!("{prompt} [y/N]"));
    }
}
