#![allow(dead_code)]
//! Deterministic collaborators shared by the integration tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use guessmon::game::source::SPRITE_FILE_NAME;
use guessmon::game::{
    Content, MessageHandle, PresentationError, Presenter, Record, RecordSource, Reply, Responder,
    SelectionEvent, Sprite, UpstreamError,
};

pub const PLAYER: &str = "ash";
pub const TARGET: u32 = 25;

#[derive(Default)]
pub struct StubSource {
    /// Fail every record fetch except this id.
    only_ok: Option<u32>,
    fail_all: bool,
    /// Return this id no matter what was asked for.
    collapse_to: Option<u32>,
    fetches: AtomicUsize,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_except(id: u32) -> Self {
        StubSource { only_ok: Some(id), ..Self::default() }
    }

    pub fn failing() -> Self {
        StubSource { fail_all: true, ..Self::default() }
    }

    pub fn collapsing_to(id: u32) -> Self {
        StubSource { collapse_to: Some(id), ..Self::default() }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for StubSource {
    async fn fetch_record(&self, id: u32) -> Result<Record, UpstreamError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let refused = self.fail_all || self.only_ok.map_or(false, |ok| ok != id);
        if refused {
            return Err(UpstreamError::Status { status_code: 503, message: "unavailable".into() });
        }
        let id = self.collapse_to.unwrap_or(id);
        Ok(Record::new(id, format!("Creature {}", id)))
    }

    async fn fetch_sprite(&self, id: u32, revealed: bool) -> Result<Sprite, UpstreamError> {
        Ok(Sprite { url: format!("stub://sprite/{}?show={}", id, revealed), file_name: SPRITE_FILE_NAME.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledged {
    pub event: usize,
    pub user: String,
    pub reply: Reply,
}

struct RecordingResponder {
    event: usize,
    user: String,
    log: Arc<Mutex<Vec<Acknowledged>>>,
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn respond(&self, reply: Reply) -> Result<(), PresentationError> {
        self.log.lock().unwrap().push(Acknowledged { event: self.event, user: self.user.clone(), reply });
        Ok(())
    }
}

/// Presenter that replays a fixed list of `(user, option id)` selections.
#[derive(Default)]
pub struct ScriptedPresenter {
    script: Vec<(String, String)>,
    hold_open: bool,
    fail_publish: bool,
    held: Mutex<Option<mpsc::Sender<SelectionEvent>>>,
    pub published: Mutex<Vec<Content>>,
    pub updates: Mutex<Vec<Content>>,
    pub acks: Arc<Mutex<Vec<Acknowledged>>>,
}

impl ScriptedPresenter {
    pub fn new(script: &[(&str, &str)]) -> Self {
        ScriptedPresenter {
            script: script.iter().map(|(u, o)| (u.to_string(), o.to_string())).collect(),
            ..Self::default()
        }
    }

    /// Keep the feed open after the script so the round has to time out.
    pub fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn rejecting_publish() -> Self {
        ScriptedPresenter { fail_publish: true, ..Self::default() }
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn updates(&self) -> Vec<Content> {
        self.updates.lock().unwrap().clone()
    }

    pub fn acks(&self) -> Vec<Acknowledged> {
        self.acks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Presenter for ScriptedPresenter {
    async fn publish(&self, surface: &str, content: Content) -> Result<MessageHandle, PresentationError> {
        if self.fail_publish {
            return Err(PresentationError::new("missing permissions"));
        }
        let mut published = self.published.lock().unwrap();
        published.push(content);
        Ok(MessageHandle { surface: surface.to_string(), message_id: published.len().to_string() })
    }

    async fn await_selections(
        &self,
        _handle: &MessageHandle,
        _player: &str,
        _window: Duration,
    ) -> Result<mpsc::Receiver<SelectionEvent>, PresentationError> {
        let (tx, rx) = mpsc::channel(self.script.len() + 1);
        for (idx, (user, option)) in self.script.iter().enumerate() {
            let responder = RecordingResponder { event: idx, user: user.clone(), log: Arc::clone(&self.acks) };
            tx.try_send(SelectionEvent::new(user.clone(), option.clone(), Box::new(responder)))
                .map_err(|e| PresentationError::new(e.to_string()))?;
        }
        if self.hold_open {
            *self.held.lock().unwrap() = Some(tx);
        }
        Ok(rx)
    }

    async fn update(&self, _handle: &MessageHandle, content: Content) -> Result<(), PresentationError> {
        self.updates.lock().unwrap().push(content);
        Ok(())
    }
}
