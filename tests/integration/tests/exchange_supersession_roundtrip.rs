use std::{sync::Arc, time::Duration};

use decisionator_integration_tests::{send, wait_for, ChannelTransport};
use decisionator_stream::{DecisionSession, ErrorKind, ExchangeError, ExchangePhase};
use tokio::sync::mpsc;

const RESULT: &str = "{\"response\":\"Go with A\",\"original_quote\":\"Go with A.\",\"options\":[{\"title\":\"A\",\"justification\":\"j1\",\"is_chosen\":true},{\"title\":\"B\",\"justification\":\"j2\",\"is_chosen\":false}]}";

#[tokio::test]
async fn integration_observers_see_options_accumulate_then_complete() {
    let (transport, senders) = ChannelTransport::new(1);
    let session = Arc::new(DecisionSession::new(transport));
    let mut updates = session.subscribe();

    let asking = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.ask("letters?").await }
    });

    let submitted = wait_for(&mut updates, |s| s.phase == ExchangePhase::Submitting).await;
    assert!(submitted.options_seen.is_empty());

    let body = &senders[0];
    send(body, "[\"A\",");
    send(body, "\"B\"]");
    let streaming = wait_for(&mut updates, |s| s.options_seen.len() == 2).await;
    assert_eq!(streaming.phase, ExchangePhase::Streaming);
    assert!(streaming.is_visible("A") && streaming.is_visible("B"));

    send(body, "[\"B\"]");
    let repeated = wait_for(&mut updates, |s| s.options_seen.len() == 3).await;
    assert_eq!(repeated.options_seen, vec!["A", "B", "B"]);

    send(body, &RESULT[..10]);
    send(body, &RESULT[10..]);
    let completed = wait_for(&mut updates, |s| s.phase == ExchangePhase::Completed).await;
    assert!(completed.is_visible("A"));
    assert!(!completed.is_visible("B"));

    drop(senders);
    let final_state = asking.await.expect("ask task");
    assert_eq!(final_state.phase, ExchangePhase::Completed);
    assert!(final_state.error.is_none());
}

#[tokio::test]
async fn integration_resubmission_isolates_the_orphaned_stream() {
    let (transport, senders) = ChannelTransport::new(2);
    let session = Arc::new(DecisionSession::new(transport));
    let mut updates = session.subscribe();

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.ask("first").await }
    });
    send(&senders[0], "[\"old\"]");
    wait_for(&mut updates, |s| s.options_seen == ["old"]).await;

    let second = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.ask("second").await }
    });
    let fresh = wait_for(&mut updates, |s| s.query.as_deref() == Some("second")).await;
    assert_eq!(fresh.phase, ExchangePhase::Submitting);
    assert!(fresh.options_seen.is_empty());

    // The orphaned body keeps talking; none of it may land.
    send(&senders[0], "[\"late\"]");
    send(&senders[0], RESULT);
    let orphaned = first.await.expect("first ask task");
    assert_eq!(orphaned.epoch, fresh.epoch);
    assert!(orphaned.options_seen.is_empty());

    send(&senders[1], "[\"A\"]");
    send(&senders[1], RESULT);
    drop(senders);
    let settled = second.await.expect("second ask task");
    assert_eq!(settled.phase, ExchangePhase::Completed);
    assert_eq!(settled.options_seen, vec!["A"]);
    assert_eq!(session.shared().snapshot().epoch, 2);
    assert_eq!(session.transport().queries().await, vec!["first", "second"]);
}

#[tokio::test]
async fn integration_failure_is_local_to_one_exchange() {
    let (transport, senders) = ChannelTransport::new(2);
    let session = DecisionSession::new(transport);

    send(&senders[0], "[\"A\"]");
    senders[0]
        .send(Err(ExchangeError::transport("connection reset")))
        .expect("receiver alive");
    let failed = session.ask("first").await;
    assert_eq!(failed.phase, ExchangePhase::Failed);
    assert_eq!(
        failed.error.as_ref().map(ExchangeError::kind),
        Some(ErrorKind::Transport)
    );

    send(&senders[1], RESULT);
    drop(senders);
    let recovered = session.ask("second").await;
    assert_eq!(recovered.phase, ExchangePhase::Completed);
    assert!(recovered.error.is_none());
    assert!(recovered.options_seen.is_empty());
}

#[tokio::test]
async fn integration_reset_returns_to_idle_and_orphans_stream() {
    let (transport, senders) = ChannelTransport::new(1);
    let session = Arc::new(DecisionSession::new(transport));
    let mut updates = session.subscribe();

    let asking = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.ask("q").await }
    });
    send(&senders[0], "[\"A\"]");
    wait_for(&mut updates, |s| s.options_seen == ["A"]).await;

    session.reset();
    send(&senders[0], RESULT);
    let after = asking.await.expect("ask task");
    assert_eq!(after.phase, ExchangePhase::Idle);
    assert!(after.result.is_none());
    assert!(after.query.is_none());
}

#[tokio::test]
async fn regression_protocol_failure_stops_reading_an_open_body() {
    let (transport, senders) = ChannelTransport::new(2);
    let session = DecisionSession::new(transport);

    send(&senders[0], RESULT);
    send(&senders[0], RESULT);
    let failed = tokio::time::timeout(Duration::from_secs(2), session.ask("q"))
        .await
        .expect("ask returns while the body is still open");
    assert_eq!(failed.phase, ExchangePhase::Failed);
    assert_eq!(
        failed.error.as_ref().map(ExchangeError::kind),
        Some(ErrorKind::Protocol)
    );
    assert!(failed.result.is_some());

    send(&senders[1], "[\"A\"]");
    send(&senders[1], RESULT);
    send(&senders[1], "[\"B\"]");
    let late_options = tokio::time::timeout(Duration::from_secs(2), session.ask("again"))
        .await
        .expect("ask returns after options follow the result");
    assert_eq!(late_options.phase, ExchangePhase::Failed);
    assert_eq!(late_options.options_seen, vec!["A"]);
    assert!(senders.iter().all(mpsc::UnboundedSender::is_closed));
}
