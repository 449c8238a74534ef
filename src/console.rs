//! Terminal presenter for the `play` smoke test.
//!
//! Publishing prints the challenge; selections are read from stdin, one per
//! line, either as an option number (`2`) or a label (`pikachu`). Prefixing a
//! line with `@name` sends it as another user, which exercises the
//! "not your game" path.

use async_trait::async_trait;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::game::presenter::{Responder, Visibility};
use crate::game::{ChoiceOption, Content, MessageHandle, PresentationError, Presenter, Reply, SelectionEvent};

pub struct ConsolePresenter {
    next_id: AtomicU64,
    options: Arc<Mutex<HashMap<String, Vec<ChoiceOption>>>>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        ConsolePresenter { next_id: AtomicU64::new(1), options: Arc::new(Mutex::new(HashMap::new())) }
    }

    fn render(content: &Content) {
        println!("=== {} ===", content.title);
        println!("{}", content.description);
        if let Some(status) = &content.status {
            println!("[{}]", status);
        }
        if let Some(image) = &content.image {
            println!("image: {}", image.url);
        }
        for (idx, option) in content.options.iter().enumerate() {
            println!("  {}) {}", idx + 1, option.label);
        }
    }

    fn remember(&self, message_id: &str, options: &[ChoiceOption]) {
        if let Ok(mut map) = self.options.lock() {
            map.insert(message_id.to_string(), options.to_vec());
        }
    }
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one input line into `(acting user override, option id)`.
pub fn parse_selection(line: &str, options: &[ChoiceOption]) -> Option<(Option<String>, String)> {
    let mut rest = line.trim();
    let mut user = None;
    if let Some(tagged) = rest.strip_prefix('@') {
        let (name, tail) = tagged.split_once(char::is_whitespace)?;
        user = Some(name.to_string());
        rest = tail.trim();
    }
    if rest.is_empty() {
        return None;
    }
    if let Ok(n) = rest.parse::<usize>() {
        if n >= 1 && n <= options.len() {
            return Some((user, options[n - 1].id.clone()));
        }
    }
    options
        .iter()
        .find(|o| o.label.eq_ignore_ascii_case(rest))
        .map(|o| (user, o.id.clone()))
}

struct ConsoleResponder {
    user: String,
}

#[async_trait]
impl Responder for ConsoleResponder {
    async fn respond(&self, reply: Reply) -> Result<(), PresentationError> {
        match reply.visibility {
            Visibility::Private => println!("(to {} only) {}", self.user, reply.text),
            Visibility::Public => println!("{}", reply.text),
        }
        Ok(())
    }
}

#[async_trait]
impl Presenter for ConsolePresenter {
    async fn publish(&self, surface: &str, content: Content) -> Result<MessageHandle, PresentationError> {
        let message_id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        Self::render(&content);
        self.remember(&message_id, &content.options);
        debug!("Published message {} to {}", message_id, surface);
        Ok(MessageHandle { surface: surface.to_string(), message_id })
    }

    async fn await_selections(
        &self,
        handle: &MessageHandle,
        player: &str,
        window: Duration,
    ) -> Result<mpsc::Receiver<SelectionEvent>, PresentationError> {
        let (tx, rx) = mpsc::channel(8);
        let options = Arc::clone(&self.options);
        let message_id = handle.message_id.clone();
        let player = player.to_string();
        println!("Pick an option within {}s:", window.as_secs());

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = tokio::select! {
                    line = lines.next_line() => line,
                    _ = tx.closed() => break,
                };
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => break,
                };
                let current = options
                    .lock()
                    .ok()
                    .and_then(|map| map.get(&message_id).cloned())
                    .unwrap_or_default();
                let Some((as_user, option_id)) = parse_selection(&line, &current) else {
                    println!("Unknown option '{}'", line.trim());
                    continue;
                };
                let user = as_user.unwrap_or_else(|| player.clone());
                trace!("Console selection {} from {}", option_id, user);
                let responder = Box::new(ConsoleResponder { user: user.clone() });
                if tx.send(SelectionEvent::new(user, option_id, responder)).await.is_err() {
                    break;
                }
            }
            debug!("Console selection reader for {} stopped", message_id);
        });
        Ok(rx)
    }

    async fn update(&self, handle: &MessageHandle, content: Content) -> Result<(), PresentationError> {
        Self::render(&content);
        self.remember(&handle.message_id, &content.options);
        Ok(())
    }
}
