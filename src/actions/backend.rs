use crate::actions::keys::{self, Key};
use anyhow::{anyhow, Context};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// OS side effects a macro can trigger.
pub trait InputBackend: Send + Sync {
    fn type_text(&self, text: &str) -> anyhow::Result<()>;
    fn press_and_release(&self, key: &Key) -> anyhow::Result<()>;
    fn open_url(&self, url: &str) -> anyhow::Result<()>;
    fn spawn_detached(&self, command: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInputBackend;

impl InputBackend for SystemInputBackend {
    fn type_text(&self, text: &str) -> anyhow::Result<()> {
        keys::type_text(text).context("type text")
    }

    fn press_and_release(&self, key: &Key) -> anyhow::Result<()> {
        keys::press_and_release(key).context("send key")
    }

    fn open_url(&self, url: &str) -> anyhow::Result<()> {
        open::that(url).with_context(|| format!("open {url}"))
    }

    fn spawn_detached(&self, command: &str) -> anyhow::Result<()> {
        crate::actions::shell::spawn_detached(command)
            .with_context(|| format!("spawn '{command}'"))
    }
}

/// Invocation recorded by [`MockInputBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Type(String),
    Key(String),
    Open(String),
    Spawn(String),
}

#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<MockCall>>,
    fail_on: Mutex<Vec<MockCall>>,
    gate: Mutex<Option<Receiver<()>>>,
}

/// Recording backend for tests and dry runs.
///
/// Calls listed via [`fail_on`](Self::fail_on) return an error. When a gate
/// is installed every call first waits for one token from the matching
/// [`MockGate`], which lets tests hold a macro mid-flight.
#[derive(Clone, Default)]
pub struct MockInputBackend {
    state: Arc<MockState>,
}

pub struct MockGate {
    tx: Sender<()>,
}

impl MockGate {
    /// Let one pending call proceed.
    pub fn release(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

impl MockInputBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gate() -> (Self, MockGate) {
        let backend = Self::new();
        let (tx, rx) = mpsc::channel();
        if let Ok(mut gate) = backend.state.gate.lock() {
            *gate = Some(rx);
        }
        (backend, MockGate { tx })
    }

    pub fn fail_on(&self, call: MockCall) {
        if let Ok(mut fail_on) = self.state.fail_on.lock() {
            fail_on.push(call);
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        match self.state.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(_) => Vec::new(),
        }
    }

    fn record(&self, call: MockCall) -> anyhow::Result<()> {
        {
            let gate = self.state.gate.lock().map_err(|_| anyhow!("lock"))?;
            if let Some(rx) = gate.as_ref() {
                rx.recv().map_err(|_| anyhow!("mock gate closed"))?;
            }
        }
        let fail = self
            .state
            .fail_on
            .lock()
            .map_err(|_| anyhow!("lock"))?
            .contains(&call);
        self.state
            .calls
            .lock()
            .map_err(|_| anyhow!("lock"))?
            .push(call.clone());
        if fail {
            return Err(anyhow!("mock failure for {call:?}"));
        }
        Ok(())
    }
}

impl InputBackend for MockInputBackend {
    fn type_text(&self, text: &str) -> anyhow::Result<()> {
        self.record(MockCall::Type(text.to_string()))
    }

    fn press_and_release(&self, key: &Key) -> anyhow::Result<()> {
        self.record(MockCall::Key(key.label()))
    }

    fn open_url(&self, url: &str) -> anyhow::Result<()> {
        self.record(MockCall::Open(url.to_string()))
    }

    fn spawn_detached(&self, command: &str) -> anyhow::Result<()> {
        self.record(MockCall::Spawn(command.to_string()))
    }
}
