//! Round lifecycle: pick a target, build a shuffled choice set, publish the
//! challenge and resolve it from the player's selections.
//!
//! Behavior:
//! - Config is validated before any fetch; invalid rounds never touch the network
//! - Candidate fetches fan out on a `JoinSet`; the first failure cancels the rest
//! - Nothing is published unless every fetch succeeded
//! - Selections are handled in arrival order until Won / Lost / TimedOut
//! - The message is finalized exactly once and the selection feed is closed

use log::{debug, info, trace, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{timeout_at, Instant};

use super::error::{ConfigError, GameError, UpstreamError};
use super::presenter::{ChoiceOption, Content, MessageHandle, Presenter, Reply, SelectionEvent, TriggerContext};
use super::record::Record;
use super::source::RecordSource;
use crate::config::GameConfig;
use crate::logutil::escape_log;
use crate::metrics;

/// Highest id drawn when no explicit target is given (ids start at 1).
pub const ID_DOMAIN_MAX: u32 = 1025;
pub const MAX_CHOICES: u8 = 4;
/// Longest round a caller may ask for; keeps the deadline representable.
pub const MAX_ROUND_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
/// Fetch rounds allowed when filling a choice set with distinct records.
const MAX_CANDIDATE_ATTEMPTS: usize = 5;

pub const DEFAULT_TITLE: &str = "Pokemon Game";
pub const DEFAULT_DESCRIPTION: &str = "Guess the Pokemon";
const NOT_YOUR_GAME: &str = "This game is not for you";
const WRONG_GUESS: &str = "Wrong!";
const GAME_ENDED: &str = "Game Ended";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub title: String,
    pub description: String,
}

impl Default for Presentation {
    fn default() -> Self {
        Presentation { title: DEFAULT_TITLE.to_string(), description: DEFAULT_DESCRIPTION.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundConfig {
    /// Explicit target; drawn from `1..=ID_DOMAIN_MAX` when `None`.
    pub target_id: Option<u32>,
    pub choice_count: u8,
    pub allowed_wrong_guesses: u8,
    pub timeout: Duration,
    pub presentation_override: Option<Presentation>,
}

impl Default for RoundConfig {
    fn default() -> Self {
        RoundConfig {
            target_id: None,
            choice_count: 3,
            allowed_wrong_guesses: 1,
            timeout: Duration::from_millis(60_000),
            presentation_override: None,
        }
    }
}

impl RoundConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CHOICES).contains(&self.choice_count) {
            return Err(ConfigError::ChoiceCount(self.choice_count));
        }
        let max = self.choice_count - 1;
        if self.allowed_wrong_guesses > max {
            return Err(ConfigError::WrongGuesses { got: self.allowed_wrong_guesses, max });
        }
        if self.target_id == Some(0) {
            return Err(ConfigError::TargetId);
        }
        if self.timeout > MAX_ROUND_TIMEOUT {
            return Err(ConfigError::Timeout {
                got_secs: self.timeout.as_secs(),
                max_secs: MAX_ROUND_TIMEOUT.as_secs(),
            });
        }
        Ok(())
    }
}

impl From<&GameConfig> for RoundConfig {
    fn from(game: &GameConfig) -> Self {
        let presentation_override = if game.title.is_some() || game.description.is_some() {
            let fallback = Presentation::default();
            Some(Presentation {
                title: game.title.clone().unwrap_or(fallback.title),
                description: game.description.clone().unwrap_or(fallback.description),
            })
        } else {
            None
        };
        RoundConfig {
            target_id: None,
            choice_count: game.choice_count,
            allowed_wrong_guesses: game.allowed_wrong_guesses,
            timeout: Duration::from_secs(game.timeout_seconds),
            presentation_override,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct RoundReport {
    pub outcome: Outcome,
    pub target: Record,
    pub wrong_guesses: u8,
    pub elapsed: Duration,
}

/// Result of checking one selection against the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Wrong { remaining: u8 },
    OutOfGuesses,
}

/// Mutable state of one round; owned by the resolution loop only.
#[derive(Debug, Clone)]
pub struct RoundState {
    pub target: Record,
    /// Starts at `allowed_wrong_guesses + 1`; the round is lost when it hits 0.
    pub remaining_guesses: u8,
    pub wrong_guesses: u8,
    pub resolved: bool,
}

impl RoundState {
    pub fn new(target: Record, allowed_wrong_guesses: u8) -> Self {
        RoundState {
            target,
            remaining_guesses: allowed_wrong_guesses.saturating_add(1),
            wrong_guesses: 0,
            resolved: false,
        }
    }

    /// Apply the player's selection. Only called while the round is unresolved.
    pub fn guess(&mut self, option_id: &str) -> Verdict {
        debug_assert!(!self.resolved, "guess after the round resolved");
        if option_id == self.target.id.to_string() {
            self.resolved = true;
            return Verdict::Correct;
        }
        self.wrong_guesses += 1;
        self.remaining_guesses = self.remaining_guesses.saturating_sub(1);
        if self.remaining_guesses == 0 {
            self.resolved = true;
            Verdict::OutOfGuesses
        } else {
            Verdict::Wrong { remaining: self.remaining_guesses }
        }
    }

    /// Mark the round resolved; returns false if it already was.
    pub fn resolve(&mut self) -> bool {
        !std::mem::replace(&mut self.resolved, true)
    }
}

/// `count` independent ids from the id domain; duplicates allowed.
pub fn random_ids<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<u32> {
    (0..count).map(|_| rng.gen_range(1..=ID_DOMAIN_MAX)).collect()
}

/// `count` pairwise distinct ids, none of them in `exclude`.
pub fn distinct_ids<R: Rng + ?Sized>(rng: &mut R, count: usize, exclude: &HashSet<u32>) -> Vec<u32> {
    let mut out: Vec<u32> = Vec::with_capacity(count);
    while out.len() < count {
        let id = rng.gen_range(1..=ID_DOMAIN_MAX);
        if !exclude.contains(&id) && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Uniform in-place shuffle (Fisher-Yates).
pub fn shuffle_choices<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

fn option_for(record: &Record) -> ChoiceOption {
    ChoiceOption { id: record.id.to_string(), label: record.name.clone() }
}

/// Orchestrates rounds against a record source and a presenter.
pub struct RoundEngine<S, P> {
    source: Arc<S>,
    presenter: Arc<P>,
}

impl<S, P> Clone for RoundEngine<S, P> {
    fn clone(&self) -> Self {
        RoundEngine { source: Arc::clone(&self.source), presenter: Arc::clone(&self.presenter) }
    }
}

impl<S, P> RoundEngine<S, P>
where
    S: RecordSource + 'static,
    P: Presenter + 'static,
{
    pub fn new(source: Arc<S>, presenter: Arc<P>) -> Self {
        RoundEngine { source, presenter }
    }

    /// Fetch `count` random records concurrently. All or nothing.
    pub async fn fetch_candidates(&self, count: usize) -> Result<Vec<Record>, GameError> {
        let ids = random_ids(&mut rand::thread_rng(), count);
        self.fetch_many(&ids).await
    }

    async fn fetch_many(&self, ids: &[u32]) -> Result<Vec<Record>, GameError> {
        let mut set = JoinSet::new();
        for (slot, &id) in ids.iter().enumerate() {
            let source = Arc::clone(&self.source);
            set.spawn(async move { (slot, source.fetch_record(id).await) });
        }
        let mut fetched: Vec<Option<Record>> = vec![None; ids.len()];
        while let Some(joined) = set.join_next().await {
            let (slot, result) = joined.map_err(|e| GameError::Aborted(e.to_string()))?;
            // Returning here drops the set, which aborts the fetches still in flight.
            fetched[slot] = Some(result?);
        }
        Ok(fetched.into_iter().flatten().collect())
    }

    /// `choice_count` records with distinct ids, the target exactly once, shuffled.
    pub async fn build_choice_set(&self, target: &Record, choice_count: u8) -> Result<Vec<Record>, GameError> {
        let wanted = usize::from(choice_count).saturating_sub(1);
        let mut seen: HashSet<u32> = HashSet::from([target.id]);
        let mut choices: Vec<Record> = Vec::with_capacity(wanted + 1);
        let mut attempts = 0;
        while choices.len() < wanted {
            if attempts == MAX_CANDIDATE_ATTEMPTS {
                return Err(UpstreamError::Exhausted { wanted, attempts }.into());
            }
            attempts += 1;
            let ids = distinct_ids(&mut rand::thread_rng(), wanted - choices.len(), &seen);
            for record in self.fetch_many(&ids).await? {
                if seen.insert(record.id) {
                    choices.push(record);
                } else {
                    debug!("Discarding duplicate candidate {}", record.id);
                }
            }
        }
        choices.push(target.clone());
        shuffle_choices(&mut choices, &mut rand::thread_rng());
        Ok(choices)
    }

    /// Publish a challenge and resolve it on a spawned task.
    pub async fn start_round(&self, trigger: TriggerContext, config: RoundConfig) -> Result<RoundHandle, GameError> {
        let round = self.prepare_round(trigger, config).await?;
        let message = round.message.clone();
        let choices = round.choices.clone();
        let task = tokio::spawn(round.run());
        Ok(RoundHandle { message, choices, task })
    }

    /// Publish a challenge and return the round for the caller to drive.
    pub async fn prepare_round(&self, trigger: TriggerContext, config: RoundConfig) -> Result<Round<S, P>, GameError> {
        config.validate()?;
        match self.publish_round(trigger, config).await {
            Ok(round) => {
                metrics::inc_rounds_started();
                Ok(round)
            }
            Err(e) => {
                metrics::inc_start_failures();
                warn!("Round start failed: {}", e);
                Err(e)
            }
        }
    }

    async fn publish_round(&self, trigger: TriggerContext, config: RoundConfig) -> Result<Round<S, P>, GameError> {
        let target_id = match config.target_id {
            Some(id) => id,
            None => rand::thread_rng().gen_range(1..=ID_DOMAIN_MAX),
        };
        let target = self.source.fetch_record(target_id).await?;
        let choices = self.build_choice_set(&target, config.choice_count).await?;
        let concealed = self.source.fetch_sprite(target.id, false).await?;

        let presentation = config.presentation_override.clone().unwrap_or_default();
        let content = Content {
            title: presentation.title,
            description: presentation.description,
            image: Some(concealed),
            options: choices.iter().map(option_for).collect(),
            status: None,
        };
        let message = self.presenter.publish(&trigger.surface, content.clone()).await?;
        info!(
            "Round published to {} for {} ({} choices, {} wrong guesses allowed)",
            escape_log(&trigger.surface),
            escape_log(&trigger.player),
            choices.len(),
            config.allowed_wrong_guesses
        );
        trace!("Round target is {} ({})", target.id, target.name);

        let selections = match self.presenter.await_selections(&message, &trigger.player, config.timeout).await {
            Ok(rx) => rx,
            Err(e) => {
                // Published but unplayable: take the options back down before failing.
                let cleared = Content { options: Vec::new(), status: Some(GAME_ENDED.to_string()), ..content };
                if let Err(clear_err) = self.presenter.update(&message, cleared).await {
                    warn!("Could not clear options after feed failure: {}", clear_err);
                }
                return Err(e.into());
            }
        };

        // `validate` caps the timeout, so the deadline cannot overflow.
        let started = Instant::now();
        Ok(Round {
            source: Arc::clone(&self.source),
            presenter: Arc::clone(&self.presenter),
            player: trigger.player,
            message,
            content,
            choices,
            selections,
            state: RoundState::new(target, config.allowed_wrong_guesses),
            finalized: false,
            started,
            deadline: started + config.timeout,
        })
    }
}

/// A published round waiting for selections.
pub struct Round<S, P> {
    source: Arc<S>,
    presenter: Arc<P>,
    player: String,
    message: MessageHandle,
    content: Content,
    choices: Vec<Record>,
    selections: mpsc::Receiver<SelectionEvent>,
    state: RoundState,
    finalized: bool,
    started: Instant,
    deadline: Instant,
}

impl<S, P> Round<S, P>
where
    S: RecordSource + 'static,
    P: Presenter + 'static,
{
    pub fn message(&self) -> &MessageHandle {
        &self.message
    }

    pub fn choices(&self) -> &[Record] {
        &self.choices
    }

    /// Consume selections until the round resolves, then finalize the message.
    pub async fn run(mut self) -> Result<RoundReport, GameError> {
        let outcome = loop {
            let event = match timeout_at(self.deadline, self.selections.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    debug!("Selection feed for {} closed early", self.message.message_id);
                    break Outcome::TimedOut;
                }
                Err(_) => break Outcome::TimedOut,
            };

            if event.user != self.player {
                trace!("Ignoring selection from {} (not the player)", escape_log(&event.user));
                acknowledge(&event, Reply::private(NOT_YOUR_GAME)).await;
                continue;
            }

            match self.state.guess(&event.option_id) {
                Verdict::Correct => break Outcome::Won,
                Verdict::Wrong { remaining } => {
                    metrics::inc_wrong_guesses();
                    debug!("Wrong guess '{}', {} left", escape_log(&event.option_id), remaining);
                    acknowledge(&event, Reply::public(WRONG_GUESS)).await;
                }
                Verdict::OutOfGuesses => {
                    metrics::inc_wrong_guesses();
                    acknowledge(&event, Reply::public(WRONG_GUESS)).await;
                    break Outcome::Lost;
                }
            }
        };

        // Stop listening before touching the message again.
        self.selections.close();
        self.finalize(outcome).await?;

        let elapsed = self.started.elapsed();
        metrics::observe_outcome(outcome, elapsed);
        info!("Round {} ended: {:?} after {:?}", self.message.message_id, outcome, elapsed);
        Ok(RoundReport {
            outcome,
            target: self.state.target,
            wrong_guesses: self.state.wrong_guesses,
            elapsed,
        })
    }

    async fn finalize(&mut self, outcome: Outcome) -> Result<(), GameError> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        self.state.resolve();

        let mut content = Content { options: Vec::new(), ..self.content.clone() };
        match outcome {
            Outcome::Won => match self.source.fetch_sprite(self.state.target.id, true).await {
                Ok(sprite) => content.image = Some(sprite),
                Err(e) => warn!("Answer sprite unavailable, keeping concealed image: {}", e),
            },
            Outcome::Lost | Outcome::TimedOut => content.status = Some(GAME_ENDED.to_string()),
        }
        self.presenter.update(&self.message, content).await?;
        Ok(())
    }
}

async fn acknowledge(event: &SelectionEvent, reply: Reply) {
    if let Err(e) = event.respond(reply).await {
        warn!("Could not acknowledge selection from {}: {}", escape_log(&event.user), e);
    }
}

/// An in-flight round running on its own task.
pub struct RoundHandle {
    message: MessageHandle,
    choices: Vec<Record>,
    task: JoinHandle<Result<RoundReport, GameError>>,
}

impl RoundHandle {
    pub fn message(&self) -> &MessageHandle {
        &self.message
    }

    pub fn choices(&self) -> &[Record] {
        &self.choices
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn outcome(self) -> Result<RoundReport, GameError> {
        self.task.await.map_err(|e| GameError::Aborted(e.to_string()))?
    }
}
