//! Interactive view controller.
//!
//! One task owns the controller and all UI state. User input arrives as
//! [`UiEvent`]s; every service call runs on its own task and reports back
//! as a [`Completion`] on an mpsc channel, so the loop never waits on the
//! network. Debounce, health polling and toast expiry are branches of the
//! same `select!`.

use crate::search::{two_pass_search, Debouncer};
use crate::state::AppState;
use crate::view::{Tab, Toast, ToastLevel, View};
use crate::widget::{
    Outcome, RecognizePanel, RegisterPanel, RequestToken, SubmitRefusal, TokenSeq, UploadWidget,
    WidgetKind,
};
use facereg_api::{ApiError, Config, FaceApi, ListQuery, RecognizeForm, RegisterForm};
use facereg_core::{FaceRecord, ImageUpload, RecognitionMatch};
use std::future::Future;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Input from the user.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    SwitchTab(Tab),
    /// Pick an image for the active tab's form.
    SelectImage(PathBuf),
    RemoveImage,
    SetName(String),
    SetPersonId(String),
    SetRemark(String),
    /// Slider position, 0–100.
    SetThreshold(u32),
    SetTopK(u32),
    /// Submit the active tab's form.
    Submit,
    ResetForm,
    /// Current contents of the search field.
    SearchInput(String),
    ClearSearch,
    Refresh,
    DeleteFace(String),
    DeletePerson(String),
    ResetDatabase,
    Confirm(bool),
    CheckHealth,
    Quit,
}

/// Result of a spawned service call.
#[derive(Debug)]
pub enum Completion {
    Health(bool),
    Registered {
        token: RequestToken,
        result: Result<String, ApiError>,
    },
    Recognized {
        token: RequestToken,
        result: Result<Vec<RecognitionMatch>, ApiError>,
    },
    Listed {
        token: RequestToken,
        load: ListLoad,
        result: Result<Vec<FaceRecord>, ApiError>,
    },
    Mutated {
        action: PendingAction,
        result: Result<(), ApiError>,
    },
}

impl Completion {
    fn is_background(&self) -> bool {
        matches!(self, Completion::Health(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLoad {
    /// Unfiltered reload. `announce` toasts on success.
    Reload { announce: bool },
    Search,
}

/// Destructive action awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteFace(String),
    DeletePerson(String),
    ResetDatabase,
}

impl PendingAction {
    fn prompt(&self) -> String {
        match self {
            PendingAction::DeleteFace(id) => format!("delete face {id}?"),
            PendingAction::DeletePerson(id) => format!("delete every face of person {id}?"),
            PendingAction::ResetDatabase => {
                "WARNING: this deletes all face data and cannot be undone. reset the database?"
                    .to_string()
            }
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            PendingAction::DeleteFace(_) => "face deleted",
            PendingAction::DeletePerson(_) => "person deleted",
            PendingAction::ResetDatabase => "database reset",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            PendingAction::DeleteFace(_) | PendingAction::DeletePerson(_) => "delete failed",
            PendingAction::ResetDatabase => "reset failed",
        }
    }
}

struct ActiveToast {
    expires: Instant,
}

pub struct Controller<V: View> {
    api: Arc<dyn FaceApi>,
    view: V,
    config: Config,
    state: AppState,
    tab: Tab,
    register: RegisterPanel,
    recognize: RecognizePanel,
    list_tokens: TokenSeq,
    search: Debouncer,
    pending: Option<PendingAction>,
    toast: Option<ActiveToast>,
    online: Option<bool>,
    /// All spawned calls not yet applied.
    in_flight: usize,
    /// Spawned calls that drive the loading indicator.
    busy: usize,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl<V: View> Controller<V> {
    pub fn new(api: Arc<dyn FaceApi>, view: V, config: Config) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            view,
            search: Debouncer::new(config.ui.search_debounce()),
            recognize: RecognizePanel::new(config.defaults.threshold, config.defaults.top_k),
            register: RegisterPanel::new(),
            config,
            state: AppState::default(),
            tab: Tab::Register,
            list_tokens: TokenSeq::default(),
            pending: None,
            toast: None,
            online: None,
            in_flight: 0,
            busy: 0,
            tx,
            rx,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    #[cfg(test)]
    pub fn view(&self) -> &V {
        &self.view
    }

    #[cfg(test)]
    pub fn online(&self) -> Option<bool> {
        self.online
    }

    /// Health check, first render and the initial list load.
    pub fn start(&mut self) {
        self.check_health();
        self.render_tab();
        self.reload(false);
    }

    /// Drive the controller until `Quit` or the event source closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<UiEvent>) {
        self.start();
        let mut health = tokio::time::interval(self.config.ui.health_interval());
        health.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick is immediate and `start` already checked.
        health.tick().await;

        loop {
            let search_due = self.search.deadline();
            let toast_due = self.toast.as_ref().map(|t| t.expires);
            let now = Instant::now();

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if self.handle(event).is_break() {
                            break;
                        }
                    }
                    None => break,
                },
                Some(completion) = self.rx.recv() => self.complete(completion),
                _ = health.tick() => self.check_health(),
                _ = sleep_until(search_due.unwrap_or(now)), if search_due.is_some() => {
                    self.flush_search(Instant::now());
                }
                _ = sleep_until(toast_due.unwrap_or(now)), if toast_due.is_some() => {
                    self.expire_toast(Instant::now());
                }
            }
        }
        tracing::debug!(
            in_flight = self.in_flight,
            online = ?self.online,
            "controller stopped"
        );
    }

    /// Apply one user event.
    pub fn handle(&mut self, event: UiEvent) -> ControlFlow<()> {
        tracing::trace!(?event, "ui event");
        // A confirmation only answers the prompt directly before it.
        if !matches!(event, UiEvent::Confirm(_)) {
            if let Some(action) = self.pending.take() {
                tracing::debug!(?action, "confirmation abandoned");
            }
        }
        match event {
            UiEvent::SwitchTab(tab) => {
                self.tab = tab;
                self.render_tab();
            }
            UiEvent::SelectImage(path) => self.select_image(path),
            UiEvent::RemoveImage => self.remove_image(),
            UiEvent::SetName(name) => self.register.name = name,
            UiEvent::SetPersonId(id) => self.register.person_id = id,
            UiEvent::SetRemark(remark) => self.register.remark = remark,
            UiEvent::SetThreshold(pct) => match u8::try_from(pct) {
                Ok(pct) if pct <= 100 => self.recognize.threshold_pct = pct,
                _ => self.notify(ToastLevel::Warning, "threshold must be between 0 and 100"),
            },
            UiEvent::SetTopK(0) => self.notify(ToastLevel::Warning, "top k must be at least 1"),
            UiEvent::SetTopK(k) => self.recognize.top_k = k,
            UiEvent::Submit => match self.tab {
                Tab::Register => self.submit_register(),
                Tab::Recognize => self.submit_recognize(),
                Tab::Manage => self.notify(ToastLevel::Warning, "nothing to submit on this tab"),
            },
            UiEvent::ResetForm => {
                if self.register.reset().is_err() {
                    self.notify(ToastLevel::Warning, "registration in progress");
                } else {
                    self.view.preview(WidgetKind::Register, None);
                }
            }
            UiEvent::SearchInput(text) => {
                self.search.input(text.trim().to_string(), Instant::now());
            }
            UiEvent::ClearSearch => {
                self.search.cancel();
                self.reload(false);
            }
            UiEvent::Refresh => self.reload(true),
            UiEvent::DeleteFace(id) => self.ask(PendingAction::DeleteFace(id)),
            UiEvent::DeletePerson(id) => self.ask(PendingAction::DeletePerson(id)),
            UiEvent::ResetDatabase => self.ask(PendingAction::ResetDatabase),
            UiEvent::Confirm(yes) => self.confirm(yes),
            UiEvent::CheckHealth => self.check_health(),
            UiEvent::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Apply a finished service call.
    pub fn complete(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if !completion.is_background() {
            self.busy = self.busy.saturating_sub(1);
            if self.busy == 0 {
                self.view.busy(false);
            }
        }

        match completion {
            Completion::Health(online) => {
                self.online = Some(online);
                self.view.status(online);
            }
            Completion::Registered { token, result } => self.on_registered(token, result),
            Completion::Recognized { token, result } => self.on_recognized(token, result),
            Completion::Listed {
                token,
                load,
                result,
            } => self.on_listed(token, load, result),
            Completion::Mutated { action, result } => match result {
                Ok(()) => {
                    self.notify(ToastLevel::Success, action.success_message());
                    self.reload(false);
                }
                Err(e) => {
                    let msg = e.user_message(action.failure_message());
                    self.notify(ToastLevel::Error, msg);
                }
            },
        }
    }

    /// Apply completions until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.rx.recv().await {
                Some(completion) => self.complete(completion),
                None => break,
            }
        }
    }

    /// Run the pending search if its quiet period is over.
    pub fn flush_search(&mut self, now: Instant) {
        let Some(keyword) = self.search.take_due(now) else {
            return;
        };
        if keyword.is_empty() {
            self.reload(false);
            return;
        }

        let token = self.list_tokens.issue();
        let api = Arc::clone(&self.api);
        let limit = self.config.defaults.list_limit;
        self.spawn(async move {
            let result = two_pass_search(api.as_ref(), &keyword, limit).await;
            Completion::Listed {
                token,
                load: ListLoad::Search,
                result,
            }
        });
    }

    pub fn expire_toast(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|t| t.expires <= now) {
            self.toast = None;
            self.view.dismiss_toast();
        }
    }

    /// Foreground call: shows the loading indicator until it completes.
    fn spawn<F>(&mut self, call: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.busy += 1;
        if self.busy == 1 {
            self.view.busy(true);
        }
        self.dispatch(call);
    }

    fn spawn_quiet<F>(&mut self, call: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.dispatch(call);
    }

    fn dispatch<F>(&mut self, call: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // The receiver lives as long as the controller.
            let _ = tx.send(call.await);
        });
    }

    fn notify(&mut self, level: ToastLevel, message: impl Into<String>) {
        let toast = Toast {
            level,
            message: message.into(),
        };
        self.view.toast(&toast);
        self.toast = Some(ActiveToast {
            expires: Instant::now() + self.config.ui.toast_lifetime(),
        });
    }

    fn render_tab(&mut self) {
        self.view.tab(self.tab);
        match self.tab {
            Tab::Register => self.view.register_form(&self.register),
            Tab::Recognize => self.view.recognize_form(&self.recognize),
            Tab::Manage => self.view.face_list(&self.state),
        }
    }

    fn check_health(&mut self) {
        let api = Arc::clone(&self.api);
        self.spawn_quiet(async move { Completion::Health(api.check_health().await) });
    }

    fn active_widget(&mut self) -> Option<&mut UploadWidget> {
        match self.tab {
            Tab::Register => Some(&mut self.register.widget),
            Tab::Recognize => Some(&mut self.recognize.widget),
            Tab::Manage => None,
        }
    }

    fn select_image(&mut self, path: PathBuf) {
        let image = match ImageUpload::open(&path, &self.config.upload) {
            Ok(image) => image,
            Err(rejection) => {
                tracing::debug!(path = %path.display(), %rejection, "image rejected");
                self.notify(ToastLevel::Warning, rejection.to_string());
                return;
            }
        };
        let preview = image.preview();
        let Some(widget) = self.active_widget() else {
            self.notify(ToastLevel::Warning, "switch to the register or recognize tab first");
            return;
        };
        let kind = widget.kind();
        match widget.select(image) {
            Ok(()) => self.view.preview(kind, Some(&preview)),
            Err(_) => self.notify(ToastLevel::Warning, "a request is already in progress"),
        }
    }

    fn remove_image(&mut self) {
        let Some(widget) = self.active_widget() else {
            return;
        };
        let kind = widget.kind();
        if widget.clear().is_err() {
            self.notify(ToastLevel::Warning, "a request is already in progress");
            return;
        }
        self.view.preview(kind, None);
        if kind == WidgetKind::Recognize {
            self.recognize.results = None;
            self.view.results(None);
        }
    }

    fn submit_register(&mut self) {
        if self.register.widget.image().is_none() {
            self.notify(ToastLevel::Warning, "upload a face image first");
            return;
        }
        if self.register.name.trim().is_empty() || self.register.person_id.trim().is_empty() {
            self.notify(ToastLevel::Warning, "name and person id are required");
            return;
        }
        let (image, token) = match self.register.widget.begin_submit() {
            Ok(started) => started,
            Err(refusal) => return self.refuse(refusal),
        };
        let form = RegisterForm {
            image,
            name: self.register.name.trim().to_string(),
            person_id: self.register.person_id.trim().to_string(),
            remark: Some(self.register.remark.trim().to_string()).filter(|r| !r.is_empty()),
        };
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.register_face(&form).await;
            Completion::Registered { token, result }
        });
    }

    fn submit_recognize(&mut self) {
        let (image, token) = match self.recognize.widget.begin_submit() {
            Ok(started) => started,
            Err(refusal) => return self.refuse(refusal),
        };
        let form = RecognizeForm {
            image,
            threshold: self.recognize.threshold(),
            top_k: self.recognize.top_k,
        };
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.recognize_face(&form).await;
            Completion::Recognized { token, result }
        });
    }

    fn refuse(&mut self, refusal: SubmitRefusal) {
        let message = match refusal {
            SubmitRefusal::NothingSelected => "upload an image first",
            SubmitRefusal::InFlight => "a request is already in progress",
        };
        self.notify(ToastLevel::Warning, message);
    }

    fn on_registered(&mut self, token: RequestToken, result: Result<String, ApiError>) {
        let outcome = match &result {
            Ok(_) => Outcome::Reset,
            Err(e) => Outcome::Failed(e.user_message("registration failed")),
        };
        if !self.register.widget.finish(token, outcome.clone()) {
            tracing::debug!(?token, "discarding superseded register result");
            return;
        }
        match result {
            Ok(face_id) => {
                tracing::info!(face_id = %face_id, "face registered");
                // Widget is already empty, so this only clears the fields.
                let _ = self.register.reset();
                self.view.preview(WidgetKind::Register, None);
                self.notify(ToastLevel::Success, "face registered");
                self.reload(false);
            }
            Err(e) => {
                tracing::warn!(error = %e, "register failed");
                if let Outcome::Failed(message) = outcome {
                    self.notify(ToastLevel::Error, message);
                }
            }
        }
    }

    fn on_recognized(
        &mut self,
        token: RequestToken,
        result: Result<Vec<RecognitionMatch>, ApiError>,
    ) {
        let outcome = match &result {
            Ok(_) => Outcome::Keep,
            Err(e) => Outcome::Failed(e.user_message("recognition failed")),
        };
        if !self.recognize.widget.finish(token, outcome.clone()) {
            tracing::debug!(?token, "discarding superseded recognize result");
            return;
        }
        match result {
            Ok(matches) => {
                if matches.is_empty() {
                    self.notify(ToastLevel::Warning, "no matching face found");
                } else {
                    self.notify(
                        ToastLevel::Success,
                        format!("recognition finished, {} match(es) found", matches.len()),
                    );
                }
                self.view.results(Some(&matches));
                self.recognize.results = Some(matches);
            }
            Err(_) => {
                self.recognize.results = None;
                self.view.results(None);
                if let Outcome::Failed(message) = outcome {
                    self.notify(ToastLevel::Error, message);
                }
            }
        }
    }

    fn on_listed(
        &mut self,
        token: RequestToken,
        load: ListLoad,
        result: Result<Vec<FaceRecord>, ApiError>,
    ) {
        if !self.list_tokens.is_current(token) {
            tracing::debug!(?token, ?load, "discarding superseded list result");
            return;
        }
        match (load, result) {
            (ListLoad::Reload { announce }, Ok(faces)) => {
                self.state.replace_all(faces);
                self.view.face_list(&self.state);
                if announce {
                    self.notify(ToastLevel::Success, "list refreshed");
                }
            }
            (ListLoad::Reload { .. }, Err(e)) => {
                self.state.clear();
                self.view.face_list(&self.state);
                let msg = format!(
                    "failed to load face list: {}",
                    e.user_message("request failed")
                );
                self.notify(ToastLevel::Error, msg);
            }
            (ListLoad::Search, Ok(faces)) => {
                let empty = faces.is_empty();
                self.state.set_filtered(faces);
                self.view.face_list(&self.state);
                if empty {
                    self.notify(ToastLevel::Warning, "no matching face found");
                }
            }
            (ListLoad::Search, Err(e)) => {
                let msg = format!("search failed: {}", e.user_message("request failed"));
                self.notify(ToastLevel::Error, msg);
            }
        }
    }

    /// Full unfiltered fetch. Supersedes any list or search in flight.
    fn reload(&mut self, announce: bool) {
        let token = self.list_tokens.issue();
        let api = Arc::clone(&self.api);
        let query = ListQuery::all(self.config.defaults.list_limit);
        self.spawn(async move {
            let result = api.list_faces(&query).await;
            Completion::Listed {
                token,
                load: ListLoad::Reload { announce },
                result,
            }
        });
    }

    fn ask(&mut self, action: PendingAction) {
        self.view.confirm(&action.prompt());
        self.pending = Some(action);
    }

    fn confirm(&mut self, yes: bool) {
        let Some(action) = self.pending.take() else {
            self.notify(ToastLevel::Warning, "nothing to confirm");
            return;
        };
        if !yes {
            tracing::debug!(?action, "cancelled");
            return;
        }
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = match &action {
                PendingAction::DeleteFace(id) => api.delete_face(id).await,
                PendingAction::DeletePerson(id) => api.delete_person_faces(id).await,
                PendingAction::ResetDatabase => api.reset_database().await,
            };
            Completion::Mutated { action, result }
        });
    }
}
