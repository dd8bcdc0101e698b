//! End-to-end study flows through `StudySession`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gamestudy_core::{
    Config, Event, IntervalType, MemoryStore, NewTask, StudySession, TimerPhase, UnavailableStore,
};

fn fast_session(backend: Arc<dyn gamestudy_core::KeyValueStore>) -> StudySession {
    StudySession::with_store_and_tick_period(backend, &Config::default(), Duration::from_millis(1))
}

#[tokio::test(start_paused = true)]
async fn two_pomodoros_then_completion() {
    let session = fast_session(Arc::new(MemoryStore::new()));
    let id = session
        .tasks()
        .add_task(NewTask::new("Organic chemistry", 2, 90))
        .unwrap();

    session.start_focus(&id).unwrap();
    tokio::time::sleep(Duration::from_millis(1_510)).await;
    assert_eq!(session.timer().state().interval_type, IntervalType::Break);

    // Break, then a second work interval.
    session.timer().start(&id);
    tokio::time::sleep(Duration::from_millis(310)).await;
    assert_eq!(session.timer().state().interval_type, IntervalType::Work);
    assert_eq!(session.tasks().task(&id).unwrap().pomodoro_count, 1);

    session.start_focus(&id).unwrap();
    tokio::time::sleep(Duration::from_millis(1_510)).await;

    let task = session.tasks().task(&id).unwrap();
    assert_eq!(task.pomodoro_count, 2);
    assert_eq!(task.time_spent_minutes, 50);
    assert_eq!(session.xp().total_xp(), 90);

    session.complete_task(&id).unwrap();
    assert_eq!(session.xp().total_xp(), 90);
    assert!(session.tasks().task(&id).unwrap().is_completed);
}

#[tokio::test(start_paused = true)]
async fn pause_holds_the_countdown() {
    let session = fast_session(Arc::new(MemoryStore::new()));
    let id = session.tasks().add_task(NewTask::new("Essay", 1, 10)).unwrap();

    session.start_focus(&id).unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    session.timer().pause();
    let paused = session.timer().state();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(session.timer().state(), paused);
    assert_eq!(session.timer().phase(), TimerPhase::Paused);
    assert_eq!(session.tasks().task(&id).unwrap().pomodoro_count, 0);

    session.timer().resume();
    assert_eq!(session.timer().state().remaining_secs(), paused.remaining_secs());
}

#[tokio::test(start_paused = true)]
async fn completion_notifies_listeners_once() {
    let session = fast_session(Arc::new(MemoryStore::new()));
    let id = session.tasks().add_task(NewTask::new("Latin", 1, 10)).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    session.timer().listen(move |event| {
        if let Event::WorkIntervalCompleted { task_id, .. } = event {
            sink.lock().unwrap().push(task_id.clone());
        }
    });

    session.start_focus(&id).unwrap();
    tokio::time::sleep(Duration::from_millis(5_000)).await;

    assert_eq!(*seen.lock().unwrap(), vec![id]);
}

#[tokio::test(start_paused = true)]
async fn reset_mid_interval_grants_nothing() {
    let session = fast_session(Arc::new(MemoryStore::new()));
    let id = session.tasks().add_task(NewTask::new("Math", 1, 10)).unwrap();

    session.start_focus(&id).unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;
    session.timer().reset();
    tokio::time::sleep(Duration::from_millis(2_000)).await;

    assert_eq!(session.tasks().task(&id).unwrap().pomodoro_count, 0);
    assert_eq!(session.xp().total_xp(), 0);
    assert_eq!(session.timer().state().display(), "25:00");
}

#[tokio::test(start_paused = true)]
async fn completing_mid_interval_stops_credit() {
    let session = fast_session(Arc::new(MemoryStore::new()));
    let id = session.tasks().add_task(NewTask::new("Quiz", 1, 40)).unwrap();

    session.start_focus(&id).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let done = session.complete_task(&id).unwrap();
    assert_eq!(session.xp().total_xp(), 40);

    tokio::time::sleep(Duration::from_millis(2_000)).await;

    let task = session.tasks().task(&id).unwrap();
    assert_eq!(task.pomodoro_count, 0);
    assert_eq!(task.time_spent_minutes, done.time_spent_minutes);
    assert_eq!(session.xp().total_xp(), 40);
    assert!(session.record_work_interval(&id).is_none());
    assert_eq!(session.xp().total_xp(), 40);

    let timer = session.timer().state();
    assert_eq!(timer.interval_type, IntervalType::Work);
    assert_eq!(timer.display(), "25:00");
    assert_eq!(session.timer().active_task_id(), None);
    assert!(!session.timer().has_tick_source());
}

#[tokio::test(start_paused = true)]
async fn unavailable_storage_still_works_in_memory() {
    let session = fast_session(Arc::new(UnavailableStore));
    assert!(!session.storage().is_durable());

    let id = session.tasks().add_task(NewTask::new("Biology", 1, 30)).unwrap();
    session.start_focus(&id).unwrap();
    tokio::time::sleep(Duration::from_millis(1_510)).await;

    assert_eq!(session.tasks().task(&id).unwrap().pomodoro_count, 1);
    assert_eq!(session.xp().total_xp(), 30);
    session.tasks().set_daily_goal(1.0).unwrap();
    assert_eq!(session.tasks().daily_goal().target_hours, 1.0);

    let fresh = fast_session(Arc::new(UnavailableStore));
    assert!(fresh.tasks().tasks().is_empty());
    assert_eq!(fresh.xp().total_xp(), 0);
}
