//! Presenter seam between the round engine and a chat surface.
//!
//! The engine never builds platform UI objects. It hands the presenter a
//! plain [`Content`] descriptor and pulls [`SelectionEvent`]s from a channel
//! until the round resolves.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

use super::error::PresentationError;
use super::source::Sprite;

/// Who started the round and where it should be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerContext {
    pub player: String,
    pub surface: String,
}

impl TriggerContext {
    pub fn new(player: impl Into<String>, surface: impl Into<String>) -> Self {
        Self { player: player.into(), surface: surface.into() }
    }
}

/// One selectable option; `id` is the record id as a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
}

/// What a message should look like. An empty `options` list means the
/// selectable options are cleared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Content {
    pub title: String,
    pub description: String,
    pub image: Option<Sprite>,
    pub options: Vec<ChoiceOption>,
    /// Plain message text shown alongside the embed ("Game Ended").
    pub status: Option<String>,
}

/// Identifies a published message for later updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub surface: String,
    pub message_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only the selecting user sees it.
    Private,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub visibility: Visibility,
}

impl Reply {
    pub fn private(text: impl Into<String>) -> Self {
        Self { text: text.into(), visibility: Visibility::Private }
    }

    pub fn public(text: impl Into<String>) -> Self {
        Self { text: text.into(), visibility: Visibility::Public }
    }
}

/// Acknowledges a single selection on the chat surface.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, reply: Reply) -> Result<(), PresentationError>;
}

/// A user picked one of the published options.
pub struct SelectionEvent {
    pub user: String,
    pub option_id: String,
    pub responder: Box<dyn Responder>,
}

impl SelectionEvent {
    pub fn new(user: impl Into<String>, option_id: impl Into<String>, responder: Box<dyn Responder>) -> Self {
        Self { user: user.into(), option_id: option_id.into(), responder }
    }

    pub async fn respond(&self, reply: Reply) -> Result<(), PresentationError> {
        self.responder.respond(reply).await
    }
}

impl std::fmt::Debug for SelectionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionEvent")
            .field("user", &self.user)
            .field("option_id", &self.option_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Presenter: Send + Sync {
    async fn publish(&self, surface: &str, content: Content) -> Result<MessageHandle, PresentationError>;

    /// Open the selection feed for a published message.
    ///
    /// `player` and `window` are hints for presenters that can filter or
    /// expire on their side; the engine enforces both regardless. The feed
    /// ends when the sender is dropped, and the engine drops the receiver
    /// once the round resolves.
    async fn await_selections(
        &self,
        handle: &MessageHandle,
        player: &str,
        window: Duration,
    ) -> Result<mpsc::Receiver<SelectionEvent>, PresentationError>;

    async fn update(&self, handle: &MessageHandle, content: Content) -> Result<(), PresentationError>;
}
