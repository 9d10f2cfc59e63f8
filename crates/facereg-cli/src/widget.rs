//! Upload widgets and the form panels that own them.

use facereg_core::{ImageUpload, RecognitionMatch};

/// Monotonic id attached to each outgoing request. A completion is applied
/// only if its token is still the latest one issued for that target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

#[derive(Debug, Default)]
pub struct TokenSeq {
    last: u64,
}

impl TokenSeq {
    pub fn issue(&mut self) -> RequestToken {
        self.last += 1;
        RequestToken(self.last)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.last
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Register,
    Recognize,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Register => "register",
            WidgetKind::Recognize => "recognize",
        }
    }
}

#[derive(Debug, Clone)]
pub enum WidgetState {
    Empty,
    Selected(ImageUpload),
    Submitting {
        image: ImageUpload,
        token: RequestToken,
    },
    /// Last submit failed; the image stays selected for a manual retry.
    Failed { image: ImageUpload, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRefusal {
    NothingSelected,
    InFlight,
}

/// How a finished request leaves the widget.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Success; drop the image.
    Reset,
    /// Success; keep the image selected.
    Keep,
    Failed(String),
}

/// Image slot of a form: `Empty → Selected → Submitting → (Empty | Failed)`.
#[derive(Debug)]
pub struct UploadWidget {
    kind: WidgetKind,
    state: WidgetState,
    tokens: TokenSeq,
}

impl UploadWidget {
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            state: WidgetState::Empty,
            tokens: TokenSeq::default(),
        }
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, WidgetState::Submitting { .. })
    }

    pub fn image(&self) -> Option<&ImageUpload> {
        match &self.state {
            WidgetState::Empty => None,
            WidgetState::Selected(image)
            | WidgetState::Submitting { image, .. }
            | WidgetState::Failed { image, .. } => Some(image),
        }
    }

    /// Replace the selection. Refused while a request is in flight.
    pub fn select(&mut self, image: ImageUpload) -> Result<(), SubmitRefusal> {
        if self.is_submitting() {
            return Err(SubmitRefusal::InFlight);
        }
        self.state = WidgetState::Selected(image);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), SubmitRefusal> {
        if self.is_submitting() {
            return Err(SubmitRefusal::InFlight);
        }
        self.state = WidgetState::Empty;
        Ok(())
    }

    /// Move to `Submitting` and hand out the image and token for the request.
    pub fn begin_submit(&mut self) -> Result<(ImageUpload, RequestToken), SubmitRefusal> {
        let image = match &self.state {
            WidgetState::Empty => return Err(SubmitRefusal::NothingSelected),
            WidgetState::Submitting { .. } => return Err(SubmitRefusal::InFlight),
            WidgetState::Selected(image) | WidgetState::Failed { image, .. } => image.clone(),
        };
        let token = self.tokens.issue();
        self.state = WidgetState::Submitting {
            image: image.clone(),
            token,
        };
        Ok((image, token))
    }

    /// Apply a completion. Returns false, changing nothing, when `token`
    /// is not the request the widget is waiting on.
    pub fn finish(&mut self, token: RequestToken, outcome: Outcome) -> bool {
        let image = match &self.state {
            WidgetState::Submitting { image, token: t } if *t == token => image.clone(),
            _ => return false,
        };
        self.state = match outcome {
            Outcome::Reset => WidgetState::Empty,
            Outcome::Keep => WidgetState::Selected(image),
            Outcome::Failed(error) => WidgetState::Failed { image, error },
        };
        true
    }
}

/// Register tab: image plus the person fields.
#[derive(Debug)]
pub struct RegisterPanel {
    pub widget: UploadWidget,
    pub name: String,
    pub person_id: String,
    pub remark: String,
}

impl RegisterPanel {
    pub fn new() -> Self {
        Self {
            widget: UploadWidget::new(WidgetKind::Register),
            name: String::new(),
            person_id: String::new(),
            remark: String::new(),
        }
    }

    /// Clear fields and image. Refused while submitting.
    pub fn reset(&mut self) -> Result<(), SubmitRefusal> {
        self.widget.clear()?;
        self.name.clear();
        self.person_id.clear();
        self.remark.clear();
        Ok(())
    }
}

impl Default for RegisterPanel {
    fn default() -> Self {
        Self::new()
    }
}

/// Recognize tab: image, search parameters, and the last results.
#[derive(Debug)]
pub struct RecognizePanel {
    pub widget: UploadWidget,
    /// Slider position, 0–100; sent as `threshold_pct / 100`.
    pub threshold_pct: u8,
    pub top_k: u32,
    /// `None` while the results box is hidden.
    pub results: Option<Vec<RecognitionMatch>>,
}

impl RecognizePanel {
    pub fn new(threshold: f32, top_k: u32) -> Self {
        Self {
            widget: UploadWidget::new(WidgetKind::Recognize),
            threshold_pct: (threshold * 100.0).round().clamp(0.0, 100.0) as u8,
            top_k,
            results: None,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold_pct as f32 / 100.0
    }
}
