//! Keyword search over the face list.

use facereg_api::{ApiError, FaceApi, ListQuery};
use facereg_core::FaceRecord;
use std::time::Duration;
use tokio::time::Instant;

/// Look `keyword` up as a person id first; only if that succeeds with no
/// hits, retry it as a name.
pub async fn two_pass_search(
    api: &dyn FaceApi,
    keyword: &str,
    limit: u32,
) -> Result<Vec<FaceRecord>, ApiError> {
    let by_id = api
        .list_faces(&ListQuery::by_person_id(keyword, limit))
        .await?;
    if !by_id.is_empty() {
        tracing::debug!(keyword, count = by_id.len(), "search matched person id");
        return Ok(by_id);
    }
    let by_name = api.list_faces(&ListQuery::by_name(keyword, limit)).await?;
    tracing::debug!(keyword, count = by_name.len(), "search fell back to name");
    Ok(by_name)
}

/// Holds the latest search input until it has been quiet for `quiet`.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Record new input, restarting the quiet period.
    pub fn input(&mut self, value: String, now: Instant) {
        self.pending = Some((value, now + self.quiet));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// The pending value, if its quiet period has elapsed by `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, at)) if *at <= now => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
