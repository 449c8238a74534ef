mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedPresenter, StubSource, PLAYER, TARGET};
use guessmon::game::{
    ConfigError, GameError, Presentation, Record, RoundConfig, RoundEngine, TriggerContext, UpstreamError,
};

fn trigger() -> TriggerContext {
    TriggerContext::new(PLAYER, "channel-1")
}

fn round(choice_count: u8, allowed_wrong_guesses: u8) -> RoundConfig {
    RoundConfig {
        target_id: Some(TARGET),
        choice_count,
        allowed_wrong_guesses,
        timeout: Duration::from_millis(50),
        presentation_override: None,
    }
}

#[tokio::test]
async fn invalid_config_fails_before_any_fetch() {
    let cases = [(0u8, 0u8), (5, 0), (3, 3), (1, 1), (4, 4)];
    for (choices, wrong) in cases {
        let source = Arc::new(StubSource::new());
        let presenter = Arc::new(ScriptedPresenter::new(&[]));
        let engine = RoundEngine::new(Arc::clone(&source), Arc::clone(&presenter));
        let err = engine.start_round(trigger(), round(choices, wrong)).await.err().expect("config error");
        assert!(matches!(err, GameError::Config(_)), "{}/{} gave {:?}", choices, wrong, err);
        assert_eq!(source.fetch_count(), 0);
        assert_eq!(presenter.published_count(), 0);
    }
}

#[tokio::test]
async fn oversized_timeout_fails_before_any_fetch() {
    let source = Arc::new(StubSource::new());
    let presenter = Arc::new(ScriptedPresenter::new(&[(PLAYER, "25")]));
    let engine = RoundEngine::new(Arc::clone(&source), Arc::clone(&presenter));
    let mut cfg = round(3, 1);
    cfg.timeout = Duration::from_secs(u64::MAX);

    // Runs on its own task so a panic would surface as a JoinError instead of aborting the test.
    let joined = tokio::spawn(async move { engine.start_round(trigger(), cfg).await.err() }).await;
    let err = joined.expect("round start must not panic").expect("config error");
    assert!(matches!(err, GameError::Config(ConfigError::Timeout { .. })), "got {:?}", err);
    assert_eq!(source.fetch_count(), 0);
    assert_eq!(presenter.published_count(), 0);
}

#[tokio::test]
async fn every_valid_config_starts() {
    for choices in 1..=4u8 {
        for wrong in 0..choices {
            let presenter = Arc::new(ScriptedPresenter::new(&[(PLAYER, "25")]));
            let engine = RoundEngine::new(Arc::new(StubSource::new()), Arc::clone(&presenter));
            let handle = engine.start_round(trigger(), round(choices, wrong)).await;
            assert!(handle.is_ok(), "{}/{} should start", choices, wrong);
            assert_eq!(handle.unwrap().choices().len(), usize::from(choices));
        }
    }
}

#[tokio::test]
async fn candidate_failure_publishes_nothing() {
    let source = Arc::new(StubSource::failing_except(TARGET));
    let presenter = Arc::new(ScriptedPresenter::new(&[]));
    let engine = RoundEngine::new(Arc::clone(&source), Arc::clone(&presenter));
    let err = engine.start_round(trigger(), round(3, 1)).await.err().expect("upstream error");
    match err {
        GameError::Upstream(UpstreamError::Status { status_code, .. }) => assert_eq!(status_code, 503),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(source.fetch_count() >= 2);
    assert_eq!(presenter.published_count(), 0);
    assert!(presenter.updates().is_empty());
}

#[tokio::test]
async fn target_failure_publishes_nothing() {
    let source = Arc::new(StubSource::failing());
    let presenter = Arc::new(ScriptedPresenter::new(&[]));
    let engine = RoundEngine::new(Arc::clone(&source), Arc::clone(&presenter));
    let err = engine.start_round(trigger(), round(2, 0)).await.err().expect("upstream error");
    assert!(matches!(err, GameError::Upstream(_)));
    assert_eq!(source.fetch_count(), 1, "nothing else is fetched after the target fails");
    assert_eq!(presenter.published_count(), 0);
}

#[tokio::test]
async fn rejected_publish_surfaces_presentation_error() {
    let presenter = Arc::new(ScriptedPresenter::rejecting_publish());
    let engine = RoundEngine::new(Arc::new(StubSource::new()), Arc::clone(&presenter));
    let err = engine.start_round(trigger(), round(2, 1)).await.err().expect("presentation error");
    assert!(matches!(err, GameError::Presentation(_)));
}

#[tokio::test]
async fn presentation_override_is_published() {
    let presenter = Arc::new(ScriptedPresenter::new(&[(PLAYER, "25")]));
    let engine = RoundEngine::new(Arc::new(StubSource::new()), Arc::clone(&presenter));
    let mut cfg = round(2, 0);
    cfg.presentation_override = Some(Presentation { title: "Who's that?".into(), description: "Name it!".into() });
    engine.start_round(trigger(), cfg).await.unwrap().outcome().await.unwrap();
    let published = presenter.published.lock().unwrap().clone();
    assert_eq!(published[0].title, "Who's that?");
    assert_eq!(published[0].description, "Name it!");
}

#[tokio::test]
async fn random_target_is_in_domain() {
    let presenter = Arc::new(ScriptedPresenter::new(&[]));
    let engine = RoundEngine::new(Arc::new(StubSource::new()), Arc::clone(&presenter));
    let mut cfg = round(1, 0);
    cfg.target_id = None;
    let report = engine.start_round(trigger(), cfg).await.unwrap().outcome().await.unwrap();
    assert!((1..=guessmon::game::engine::ID_DOMAIN_MAX).contains(&report.target.id));
}

#[tokio::test]
async fn choice_sets_are_distinct_and_contain_target_once() {
    let engine = RoundEngine::new(Arc::new(StubSource::new()), Arc::new(ScriptedPresenter::new(&[])));
    let target = Record::new(TARGET, "Pikachu");
    for n in 1..=4u8 {
        for _ in 0..50 {
            let set = engine.build_choice_set(&target, n).await.unwrap();
            assert_eq!(set.len(), usize::from(n));
            let ids: HashSet<u32> = set.iter().map(|r| r.id).collect();
            assert_eq!(ids.len(), set.len(), "ids must be pairwise distinct");
            assert_eq!(set.iter().filter(|r| r.id == TARGET).count(), 1);
        }
    }
}

#[tokio::test]
async fn colliding_records_exhaust_attempts() {
    // Every fetch comes back as the target, so no distinct candidate can ever be found.
    let engine = RoundEngine::new(Arc::new(StubSource::collapsing_to(TARGET)), Arc::new(ScriptedPresenter::new(&[])));
    let err = engine.build_choice_set(&Record::new(TARGET, "Pikachu"), 3).await.unwrap_err();
    assert!(matches!(err, GameError::Upstream(UpstreamError::Exhausted { wanted: 2, .. })));
}

#[tokio::test]
async fn fetch_candidates_is_all_or_nothing() {
    let engine = RoundEngine::new(Arc::new(StubSource::new()), Arc::new(ScriptedPresenter::new(&[])));
    let records = engine.fetch_candidates(4).await.unwrap();
    assert_eq!(records.len(), 4);

    let failing = RoundEngine::new(Arc::new(StubSource::failing()), Arc::new(ScriptedPresenter::new(&[])));
    assert!(matches!(failing.fetch_candidates(3).await, Err(GameError::Upstream(_))));
}

#[test]
fn config_errors_are_reported_synchronously() {
    let cfg = round(4, 4);
    assert_eq!(cfg.validate(), Err(ConfigError::WrongGuesses { got: 4, max: 3 }));
}
