//! Session state machine driving one image through identification.
//!
//! ```text
//! Idle --select--> Ready --submit--> Busy --+--> Succeeded
//!   ^                |                      |
//!   +------clear-----+                      +--> Failed
//! Succeeded/Failed --select--> Ready, --clear--> Idle
//! ```
//!
//! State is published through a `watch` channel and always replaced whole.
//! `submit` takes `&mut self`, so a second submit cannot start while one is
//! in flight.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info_span, Instrument};

use crate::ai::{identify_movie, VisionClient};
use crate::types::{IdentificationOutcome, SelectedImage};

/// What the UI should be showing right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No image selected.
    Idle,
    /// Image selected, not yet submitted.
    Ready { image: SelectedImage },
    /// Request in flight.
    Busy { image: SelectedImage },
    Succeeded { outcome: IdentificationOutcome },
    Failed { message: String },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Ready { .. } => "ready",
            SessionState::Busy { .. } => "busy",
            SessionState::Succeeded { .. } => "succeeded",
            SessionState::Failed { .. } => "failed",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Busy { .. })
    }

    /// The image currently held, if any.
    pub fn image(&self) -> Option<&SelectedImage> {
        match self {
            SessionState::Ready { image } | SessionState::Busy { image } => Some(image),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No image selected")]
    NoImage,

    #[error("An identification is already in progress")]
    Busy,

    #[error("This image has already been identified; select a new image first")]
    AlreadyResolved,
}

/// Owns the session state and the client used to resolve submissions.
pub struct Session {
    client: Arc<dyn VisionClient>,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(client: Arc<dyn VisionClient>) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self { client, state }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every state change, including `Busy`.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Choose an image. Discards any previous outcome or error.
    pub fn select(&mut self, image: SelectedImage) -> Result<(), SessionError> {
        self.ensure_not_busy()?;
        transition(&self.state, SessionState::Ready { image });
        Ok(())
    }

    /// Drop the image and anything derived from it.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.ensure_not_busy()?;
        transition(&self.state, SessionState::Idle);
        Ok(())
    }

    /// Identify the selected image and move to `Succeeded` or `Failed`.
    ///
    /// Only valid from `Ready`. Runs to completion; every failure ends in
    /// `Failed` rather than an `Err`. Returns the final state.
    pub async fn submit(&mut self) -> Result<SessionState, SessionError> {
        let image = match &*self.state.borrow() {
            SessionState::Ready { image } => image.clone(),
            SessionState::Idle => return Err(SessionError::NoImage),
            SessionState::Busy { .. } => return Err(SessionError::Busy),
            SessionState::Succeeded { .. } | SessionState::Failed { .. } => {
                return Err(SessionError::AlreadyResolved)
            }
        };

        transition(
            &self.state,
            SessionState::Busy {
                image: image.clone(),
            },
        );
        let guard = BusyGuard {
            state: &self.state,
            image: Some(image.clone()),
        };

        let span = info_span!(
            "identify",
            mime_type = %image.mime(),
            image_bytes = image.data().len()
        );
        let result = identify_movie(self.client.as_ref(), image)
            .instrument(span)
            .await;
        guard.disarm();

        let next = match result {
            Ok(outcome) => {
                tracing::info!(
                    title = %outcome.result.title,
                    sources = outcome.sources.len(),
                    "Movie identified"
                );
                SessionState::Succeeded { outcome }
            }
            Err(e) => {
                tracing::info!(error = %e, "Identification failed");
                SessionState::Failed {
                    message: e.user_message(),
                }
            }
        };

        transition(&self.state, next.clone());
        Ok(next)
    }

    fn ensure_not_busy(&self) -> Result<(), SessionError> {
        if self.state.borrow().is_busy() {
            return Err(SessionError::Busy);
        }
        Ok(())
    }
}

fn transition(state: &watch::Sender<SessionState>, next: SessionState) {
    let to = next.name();
    let previous = state.send_replace(next);
    tracing::debug!(from = previous.name(), to, "Session state changed");
}

/// Puts the image back to `Ready` if a submit future is dropped mid-flight,
/// so the session never stays `Busy` with nothing running.
struct BusyGuard<'a> {
    state: &'a watch::Sender<SessionState>,
    image: Option<SelectedImage>,
}

impl BusyGuard<'_> {
    fn disarm(mut self) {
        self.image = None;
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if let Some(image) = self.image.take() {
            tracing::warn!("Identification dropped before completion");
            transition(self.state, SessionState::Ready { image });
        }
    }
}
