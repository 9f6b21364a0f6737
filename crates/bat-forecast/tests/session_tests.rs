//! Integration tests for the thread-safe session handle and its background
//! training path.

mod common;

use bat_forecast::{
    FeatureValue, ForecastError, SessionHandle, SpawnedTraining, StartOutcome, WorkflowController,
    WorkflowState,
};
use common::{ScriptedEngine, configured, ready, sales_dataset, wide_sales_dataset};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::thread;

fn search_calls(session: &SessionHandle<ScriptedEngine>) -> usize {
    session.read(|c| c.engine().search_calls())
}

// ============================================================================
// Background Training
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_training_runs_search() {
    let session = SessionHandle::new(configured(ScriptedEngine::new()));

    let outcome = session.start_training().await.unwrap();

    assert!(matches!(outcome, StartOutcome::Trained(_)));
    assert_eq!(session.state(), WorkflowState::Ready);
    assert_eq!(search_calls(&session), 1);

    let again = session.start_training().await.unwrap();
    assert!(matches!(again, StartOutcome::AlreadyTrained(_)));
    assert_eq!(search_calls(&session), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_starts_search_once() {
    let (engine, release) = ScriptedEngine::gated();
    let session = SessionHandle::new(configured(engine));

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.start_training().await })
    };

    // Wait until the first start has claimed the session.
    while session.state() != WorkflowState::Training {
        tokio::task::yield_now().await;
    }

    let second = session.start_training().await;
    assert!(matches!(
        second,
        Err(ForecastError::ConcurrentAction {
            state: WorkflowState::Training,
            ..
        })
    ));

    // Status stays readable while the search is blocked.
    assert_eq!(session.status().state, WorkflowState::Training);

    release.send(()).unwrap();
    let first = first.await.unwrap().unwrap();

    assert!(matches!(first, StartOutcome::Trained(_)));
    assert_eq!(session.state(), WorkflowState::Ready);
    assert_eq!(search_calls(&session), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_training_failure_is_acknowledged() {
    let session = SessionHandle::new(configured(ScriptedEngine::new()));
    session.read(|c| c.engine().fail_next_search("no model converged"));

    let err = session.start_training().await.unwrap_err();

    assert!(matches!(err, ForecastError::Search(_)));
    let status = session.status();
    assert_eq!(status.state, WorkflowState::Configured);
    assert!(status.leaderboard.is_none());
    assert!(status.last_failure.unwrap().contains("no model converged"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawned_failure_stays_visible() {
    let session = SessionHandle::new(configured(ScriptedEngine::new()));
    session.read(|c| c.engine().fail_next_search("no model converged"));

    let task = match session.spawn_training().unwrap() {
        SpawnedTraining::Running(task) => task,
        other => panic!("expected a running task, got {other:?}"),
    };
    assert!(task.await.unwrap().is_err());

    assert_eq!(session.state(), WorkflowState::Failed);
    assert!(session.acknowledge_failure());
    assert_eq!(session.state(), WorkflowState::Configured);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawn_when_ready_returns_cached_board() {
    let session = SessionHandle::new(configured(ScriptedEngine::new()));
    let trained = session.start_training().await.unwrap().into_leaderboard();

    match session.spawn_training().unwrap() {
        SpawnedTraining::AlreadyTrained(board) => assert_eq!(board, trained),
        other => panic!("expected the cached leaderboard, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dataset_replaced_during_search() {
    let (engine, release) = ScriptedEngine::gated();
    let session = SessionHandle::new(configured(engine));

    let task = match session.spawn_training().unwrap() {
        SpawnedTraining::Running(task) => task,
        other => panic!("expected a running task, got {other:?}"),
    };

    session.load_dataset(wide_sales_dataset());
    session.select_target("revenue").unwrap();
    assert_eq!(session.state(), WorkflowState::Configured);

    release.send(()).unwrap();
    let result = task.await.unwrap();

    assert!(matches!(result, Err(ForecastError::SupersededTraining)));
    assert_eq!(session.state(), WorkflowState::Configured);
    assert!(session.status().leaderboard.is_none());

    // The superseded search has resolved, so the new dataset can train.
    session.start_training().await.unwrap();
    assert_eq!(session.state(), WorkflowState::Ready);
}

// ============================================================================
// Interactive Actions
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_session_through_handle() {
    let session = SessionHandle::new(WorkflowController::new(ScriptedEngine::new()));
    session.load_dataset(sales_dataset());

    let schema = session.select_target("revenue").unwrap();
    session.start_training().await.unwrap();

    let values = bat_forecast::predict::default_values(&schema);
    let result = session.predict(&values).unwrap();
    assert_eq!(result.target, "revenue");

    session.retrain().unwrap();
    assert_eq!(session.state(), WorkflowState::Configured);
    assert!(matches!(
        session.predict(&HashMap::new()),
        Err(ForecastError::NoModel)
    ));
}

// ============================================================================
// In-Flight Predictions
// ============================================================================

fn ny_40() -> bat_forecast::UserValues {
    [
        ("age".to_string(), FeatureValue::from(40i64)),
        ("city".to_string(), FeatureValue::from("NY")),
    ]
    .into_iter()
    .collect()
}

/// Start a prediction on another thread and wait until it holds the session.
fn predict_in_background(
    session: &SessionHandle<ScriptedEngine>,
) -> thread::JoinHandle<bat_forecast::Result<bat_forecast::PredictionResult>> {
    let worker = {
        let session = session.clone();
        thread::spawn(move || session.predict(&ny_40()))
    };
    while session.state() != WorkflowState::Predicting {
        thread::yield_now();
    }
    worker
}

#[test]
fn test_actions_rejected_while_predicting() {
    let (engine, release) = ScriptedEngine::gated_predict();
    let session = SessionHandle::new(ready(engine));

    let worker = predict_in_background(&session);

    // The engine is still scoring; status reads go through.
    assert_eq!(session.status().state, WorkflowState::Predicting);
    assert!(matches!(
        session.retrain(),
        Err(ForecastError::ConcurrentAction {
            state: WorkflowState::Predicting,
            ..
        })
    ));
    assert!(matches!(
        session.predict(&ny_40()),
        Err(ForecastError::ConcurrentAction {
            state: WorkflowState::Predicting,
            ..
        })
    ));
    assert!(matches!(
        session.select_target("age"),
        Err(ForecastError::ConcurrentAction { .. })
    ));
    assert!(matches!(
        session.spawn_training(),
        Err(ForecastError::ConcurrentAction { .. })
    ));

    release.send(()).unwrap();
    let result = worker.join().unwrap().unwrap();

    assert_eq!(result.target, "revenue");
    assert_eq!(session.state(), WorkflowState::Ready);
    assert!(session.status().leaderboard.is_some());
    assert_eq!(session.read(|c| c.engine().predict_calls()), 1);
}

#[test]
fn test_dataset_replaced_during_prediction() {
    let (engine, release) = ScriptedEngine::gated_predict();
    let session = SessionHandle::new(ready(engine));

    let worker = predict_in_background(&session);
    session.load_dataset(wide_sales_dataset());
    assert_eq!(session.state(), WorkflowState::Idle);

    release.send(()).unwrap();
    let result = worker.join().unwrap();

    assert!(matches!(result, Err(ForecastError::StaleModel { .. })));
    assert_eq!(session.state(), WorkflowState::Idle);
}

#[test]
fn test_engine_panic_returns_to_ready() {
    let session = SessionHandle::new(ready(ScriptedEngine::panicking()));

    let err = session.predict(&ny_40()).unwrap_err();

    assert!(matches!(err, ForecastError::Internal(_)));
    assert_eq!(session.state(), WorkflowState::Ready);
    assert!(session.status().leaderboard.is_some());
}

#[test]
fn test_handle_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SessionHandle<ScriptedEngine>>();
}
