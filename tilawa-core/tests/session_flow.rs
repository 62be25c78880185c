use std::sync::{atomic::Ordering, Arc};
use std::thread;
use std::time::{Duration, Instant};

use tilawa_core::engine::SessionConfig;
use tilawa_core::ipc::events::{ProgressEvent, SessionStatus, SessionStatusEvent};
use tilawa_core::recognizer::{
    event_channel,
    stub::{utterance, ScriptedRecognizer},
    RecognitionErrorKind, RecognitionEvent, RecognitionListener,
};
use tilawa_core::text::passage::AL_FATIHA;
use tilawa_core::{RecitationSession, RecognizerHandle, ReferenceText};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

fn fast_config() -> SessionConfig {
    SessionConfig {
        auto_retry_delay: Duration::from_millis(10),
        dispatch_poll_interval: Duration::from_millis(5),
        ..SessionConfig::default()
    }
}

fn recv_until<T: Clone>(
    rx: &mut broadcast::Receiver<T>,
    timeout: Duration,
    mut done: impl FnMut(&T) -> bool,
) -> T {
    let start = Instant::now();
    loop {
        match rx.try_recv() {
            Ok(ev) if done(&ev) => return ev,
            Ok(_) => continue,
            Err(TryRecvError::Empty) => {
                if start.elapsed() >= timeout {
                    panic!("timed out waiting for event");
                }
                thread::sleep(Duration::from_millis(5));
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => panic!("event channel closed unexpectedly"),
        }
    }
}

#[test]
fn scripted_recitation_completes_through_auto_restarts() {
    let (sink, stream) = event_channel();
    let recognizer = ScriptedRecognizer::from_texts(
        sink,
        &[
            "بسم الله الرحمن الرحيم",
            "الحمد لله رب العالمين",
            "الرحمن الرحيم",
            "مالك يوم الدين",
            "اياك نعبد واياك نستعين",
            "اهدنا الصراط المستقيم",
            "صراط الذين انعمت عليهم",
            "غير المغضوب عليهم ولا الضالين",
        ],
    );
    let counters = recognizer.counters();
    let session = Arc::new(RecitationSession::new(
        fast_config(),
        ReferenceText::new(AL_FATIHA).expect("reference"),
        RecognizerHandle::new(recognizer),
        stream,
    ));
    let mut status_rx = session.subscribe_status();
    let mut progress_rx = session.subscribe_progress();

    let dispatcher = session.spawn_dispatcher().expect("spawn dispatcher");
    assert!(session.toggle_listening().expect("start listening"));

    let completed: SessionStatusEvent =
        recv_until(&mut status_rx, Duration::from_secs(5), |ev| {
            ev.status == SessionStatus::Completed
        });
    let last_progress: ProgressEvent =
        recv_until(&mut progress_rx, Duration::from_secs(1), |ev| {
            ev.progress.last_matched_index == Some(28)
        });

    session.shutdown();
    dispatcher.join().expect("dispatcher thread panicked");

    assert!(!completed.is_listening);
    let full_text = AL_FATIHA.split_whitespace().collect::<Vec<_>>().join(" ");
    assert_eq!(last_progress.progress.recognized_prefix, full_text);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 8);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);

    let diagnostics = session.diagnostics();
    assert_eq!(diagnostics.finals_fed, 8);
    assert_eq!(diagnostics.auto_restarts, 7);
}

#[test]
fn silence_errors_retry_and_network_errors_stop() {
    let (sink, stream) = event_channel();
    let recognizer = ScriptedRecognizer::new(
        sink.clone(),
        vec![
            vec![RecognitionEvent::Error(RecognitionErrorKind::NoSpeechDetected)],
            utterance("بسم الله"),
            vec![RecognitionEvent::Error(RecognitionErrorKind::Network)],
        ],
    );
    let counters = recognizer.counters();
    let session = Arc::new(RecitationSession::new(
        fast_config(),
        ReferenceText::new(AL_FATIHA).expect("reference"),
        RecognizerHandle::new(recognizer),
        stream,
    ));
    let mut status_rx = session.subscribe_status();
    let dispatcher = session.spawn_dispatcher().expect("spawn dispatcher");
    session.toggle_listening().expect("start listening");

    let failed = recv_until(&mut status_rx, Duration::from_secs(5), |ev| {
        matches!(ev.status, SessionStatus::Error(_))
    });

    session.shutdown();
    dispatcher.join().expect("dispatcher thread panicked");

    assert_eq!(
        failed.status,
        SessionStatus::Error(session.config().messages.network.clone())
    );
    assert!(!failed.is_listening);
    assert_eq!(session.progress().last_matched_index, Some(1));
    assert_eq!(counters.starts.load(Ordering::SeqCst), 3);
    assert_eq!(session.diagnostics().recognizer_errors, 2);
    drop(sink);
}

#[test]
fn listener_callbacks_from_another_thread_are_serialized() {
    let (sink, stream) = event_channel();
    let recognizer = ScriptedRecognizer::new(sink.clone(), Vec::new());
    let session = Arc::new(RecitationSession::new(
        fast_config(),
        ReferenceText::new("الحمد لله رب العالمين").expect("reference"),
        RecognizerHandle::new(recognizer),
        stream,
    ));
    let mut progress_rx = session.subscribe_progress();
    let dispatcher = session.spawn_dispatcher().expect("spawn dispatcher");
    session.toggle_listening().expect("start listening");

    let producer = thread::spawn(move || {
        sink.on_ready_for_speech();
        sink.on_partial_hypothesis("الحمد");
        // Repeats the matched "الحمد" first, so its extension is discarded.
        sink.on_partial_hypothesis("الحمد لله");
        sink.on_partial_hypothesis("لله");
        sink.on_end_of_speech();
        sink.on_final_hypothesis("رب");
    });
    producer.join().expect("producer thread panicked");

    let advanced = recv_until(&mut progress_rx, Duration::from_secs(2), |ev| {
        ev.progress.last_matched_index == Some(2)
    });

    session.shutdown();
    dispatcher.join().expect("dispatcher thread panicked");

    assert_eq!(advanced.progress.recognized_prefix, "الحمد لله رب");
    assert_eq!(session.diagnostics().partials_fed, 3);
    assert_eq!(session.diagnostics().advances, 3);
}
