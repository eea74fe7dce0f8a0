use gesture_macros::actions::{MockCall, MockInputBackend};
use gesture_macros::hand_gestures::{
    DispatchOutcome, GestureDispatcher, GestureSignature, Macro, MacroRegistry, RegistryStore,
    SkipReason,
};
use gesture_macros::macros::MacroInterpreter;
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn sig(code: &str) -> GestureSignature {
    code.parse().unwrap()
}

fn write_registry(path: &Path) -> RegistryStore {
    let mut registry = MacroRegistry::new();
    registry.add_or_replace(
        sig("01000"),
        Macro::new("Point", vec!["STRING: one".into()]),
    );
    registry.add_or_replace(
        sig("01100"),
        Macro::new("Peace", vec!["KEY: enter".into(), "STRING: two".into()]),
    );
    let store = RegistryStore::new(path);
    store.save(&registry).unwrap();
    store
}

fn dispatcher(
    store: RegistryStore,
    backend: &MockInputBackend,
    cooldown: Duration,
) -> (GestureDispatcher, Receiver<DispatchOutcome>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let observer = Arc::new(move |outcome: &DispatchOutcome| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(outcome.clone());
        }
    });
    let interpreter =
        MacroInterpreter::new(Arc::new(backend.clone())).with_action_delay(Duration::ZERO);
    (
        GestureDispatcher::new(store, interpreter, observer).with_cooldown(cooldown),
        rx,
    )
}

fn next_finished(rx: &Receiver<DispatchOutcome>) -> DispatchOutcome {
    loop {
        let outcome = rx.recv_timeout(Duration::from_secs(5)).expect("outcome");
        if !matches!(outcome, DispatchOutcome::Started(_)) {
            return outcome;
        }
    }
}

#[test]
fn second_gesture_within_cooldown_is_skipped() {
    let dir = tempdir().unwrap();
    let store = write_registry(&dir.path().join("macros.json"));
    let backend = MockInputBackend::new();
    let (mut dispatcher, rx) = dispatcher(store, &backend, Duration::from_secs(2));

    assert_eq!(
        dispatcher.on_signature(&sig("01000")),
        DispatchOutcome::Started("Point".into())
    );
    assert_eq!(
        dispatcher.on_signature(&sig("01000")),
        DispatchOutcome::Skipped(SkipReason::CooldownActive)
    );
    assert_eq!(next_finished(&rx), DispatchOutcome::Succeeded("Point".into()));
    assert_eq!(backend.calls(), vec![MockCall::Type("one".into())]);
}

#[test]
fn cooldown_expires() {
    let dir = tempdir().unwrap();
    let store = write_registry(&dir.path().join("macros.json"));
    let backend = MockInputBackend::new();
    let (mut dispatcher, _rx) = dispatcher(store, &backend, Duration::from_secs(2));
    let t0 = Instant::now();

    assert!(matches!(
        dispatcher.on_signature_at(&sig("01000"), t0),
        DispatchOutcome::Started(_)
    ));
    dispatcher.wait_idle();
    assert_eq!(
        dispatcher.on_signature_at(&sig("01100"), t0 + Duration::from_millis(1500)),
        DispatchOutcome::Skipped(SkipReason::CooldownActive)
    );
    assert_eq!(
        dispatcher.on_signature_at(&sig("01100"), t0 + Duration::from_secs(2)),
        DispatchOutcome::Started("Peace".into())
    );
    dispatcher.wait_idle();
}

#[test]
fn unknown_gesture_does_not_start_cooldown() {
    let dir = tempdir().unwrap();
    let store = write_registry(&dir.path().join("macros.json"));
    let backend = MockInputBackend::new();
    let (mut dispatcher, _rx) = dispatcher(store, &backend, Duration::from_secs(2));

    assert_eq!(
        dispatcher.on_signature(&sig("11111")),
        DispatchOutcome::Skipped(SkipReason::NoMatch)
    );
    assert!(dispatcher.state().last_fire.is_none());
    assert!(matches!(
        dispatcher.on_signature(&sig("01000")),
        DispatchOutcome::Started(_)
    ));
    dispatcher.wait_idle();
}

#[test]
fn only_one_macro_runs_at_a_time() {
    let dir = tempdir().unwrap();
    let store = write_registry(&dir.path().join("macros.json"));
    let (backend, gate) = MockInputBackend::with_gate();
    let (mut dispatcher, rx) = dispatcher(store, &backend, Duration::ZERO);

    assert_eq!(
        dispatcher.on_signature(&sig("01000")),
        DispatchOutcome::Started("Point".into())
    );
    assert!(dispatcher.is_busy());
    assert_eq!(dispatcher.state().active_macro(), Some("Point"));
    assert_eq!(
        dispatcher.on_signature(&sig("01000")),
        DispatchOutcome::Skipped(SkipReason::Busy)
    );
    assert_eq!(
        dispatcher.on_signature(&sig("01100")),
        DispatchOutcome::Skipped(SkipReason::Busy)
    );
    assert_eq!(
        dispatcher.on_signature(&sig("00000")),
        DispatchOutcome::Skipped(SkipReason::NoMatch)
    );

    assert!(gate.release());
    assert_eq!(next_finished(&rx), DispatchOutcome::Succeeded("Point".into()));
    assert!(!dispatcher.is_busy());
    assert_eq!(dispatcher.state().active_macro(), None);

    assert_eq!(
        dispatcher.on_signature(&sig("01100")),
        DispatchOutcome::Started("Peace".into())
    );
    assert!(gate.release());
    assert!(gate.release());
    assert_eq!(next_finished(&rx), DispatchOutcome::Succeeded("Peace".into()));
    assert_eq!(
        backend.calls(),
        vec![
            MockCall::Type("one".into()),
            MockCall::Key("enter".into()),
            MockCall::Type("two".into()),
        ]
    );
}

#[test]
fn failure_is_reported_to_observer() {
    let dir = tempdir().unwrap();
    let store = write_registry(&dir.path().join("macros.json"));
    let backend = MockInputBackend::new();
    backend.fail_on(MockCall::Key("enter".into()));
    let (mut dispatcher, rx) = dispatcher(store, &backend, Duration::ZERO);

    assert!(matches!(
        dispatcher.on_signature(&sig("01100")),
        DispatchOutcome::Started(_)
    ));
    match next_finished(&rx) {
        DispatchOutcome::Failed { name, error } => {
            assert_eq!(name, "Peace");
            assert!(error.contains("step 1"), "{error}");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(backend.calls(), vec![MockCall::Key("enter".into())]);
    assert!(!dispatcher.is_busy());
}

#[test]
fn started_is_reported_before_completion() {
    let dir = tempdir().unwrap();
    let store = write_registry(&dir.path().join("macros.json"));
    let backend = MockInputBackend::new();
    let (mut dispatcher, rx) = dispatcher(store, &backend, Duration::ZERO);

    dispatcher.on_signature(&sig("01000"));
    let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first, DispatchOutcome::Started("Point".into()));
    assert_eq!(next_finished(&rx), DispatchOutcome::Succeeded("Point".into()));
}

#[test]
fn broken_document_behaves_as_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("macros.json");
    std::fs::write(&path, "[1, 2").unwrap();
    let backend = MockInputBackend::new();
    let (mut dispatcher, rx) = dispatcher(RegistryStore::new(&path), &backend, Duration::ZERO);

    for _ in 0..3 {
        assert_eq!(
            dispatcher.on_signature(&sig("01000")),
            DispatchOutcome::Skipped(SkipReason::NoMatch)
        );
    }
    let reported: Vec<_> = rx.try_iter().collect();
    assert_eq!(reported.len(), 1, "{reported:?}");
    match &reported[0] {
        DispatchOutcome::ConfigError(error) => assert!(error.contains("macros.json"), "{error}"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(reported[0].status_message().starts_with("Config error: "));

    write_registry(&path);
    assert!(matches!(
        dispatcher.on_signature(&sig("01000")),
        DispatchOutcome::Started(_)
    ));
    dispatcher.wait_idle();
}

#[test]
fn registry_edits_are_seen_without_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("macros.json");
    let store = write_registry(&path);
    let backend = MockInputBackend::new();
    let (mut dispatcher, _rx) = dispatcher(store.clone(), &backend, Duration::ZERO);

    store
        .update(|registry| -> anyhow::Result<()> {
            registry.add_or_replace(sig("10001"), Macro::new("Horns", vec!["STRING: x".into()]));
            Ok(())
        })
        .unwrap();
    assert_eq!(
        dispatcher.on_signature(&sig("10001")),
        DispatchOutcome::Started("Horns".into())
    );
    dispatcher.wait_idle();
}

#[test]
fn slow_observer_does_not_stall_dispatch() {
    let dir = tempdir().unwrap();
    let store = write_registry(&dir.path().join("macros.json"));
    let backend = MockInputBackend::new();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel();
    let release_rx = Mutex::new(release_rx);
    let done_tx = Mutex::new(done_tx);
    let observer = Arc::new(move |outcome: &DispatchOutcome| {
        if let DispatchOutcome::Succeeded(name) = outcome {
            if let Ok(tx) = done_tx.lock() {
                let _ = tx.send(name.clone());
            }
            if let Ok(rx) = release_rx.lock() {
                let _ = rx.recv_timeout(Duration::from_secs(5));
            }
        }
    });
    let interpreter =
        MacroInterpreter::new(Arc::new(backend.clone())).with_action_delay(Duration::ZERO);
    let mut dispatcher =
        GestureDispatcher::new(store, interpreter, observer).with_cooldown(Duration::ZERO);

    assert!(matches!(
        dispatcher.on_signature(&sig("01000")),
        DispatchOutcome::Started(_)
    ));
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap(), "Point");

    // The first observer call is still blocked; dispatching must not wait on it.
    let start = Instant::now();
    assert!(!dispatcher.is_busy());
    assert_eq!(
        dispatcher.on_signature(&sig("01100")),
        DispatchOutcome::Started("Peace".into())
    );
    assert!(start.elapsed() < Duration::from_secs(2));

    release_tx.send(()).unwrap();
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap(), "Peace");
    release_tx.send(()).unwrap();
    dispatcher.wait_idle();
}
