use crate::hand_gestures::db::RegistryStore;
use crate::hand_gestures::engine::GestureSignature;
use crate::macros::MacroInterpreter;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    CooldownActive,
    NoMatch,
    Busy,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::CooldownActive => write!(f, "cooldown active"),
            SkipReason::NoMatch => write!(f, "no matching macro"),
            SkipReason::Busy => write!(f, "another macro is running"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Started(String),
    Succeeded(String),
    Failed { name: String, error: String },
    Skipped(SkipReason),
    /// The macro document could not be loaded; gestures match nothing until
    /// it is fixed.
    ConfigError(String),
}

impl DispatchOutcome {
    /// Line shown in the status bar.
    pub fn status_message(&self) -> String {
        match self {
            DispatchOutcome::Started(name) => format!("Started: {name}"),
            DispatchOutcome::Succeeded(name) => format!("Executed: {name}"),
            DispatchOutcome::Failed { name, error } => format!("Error in {name}: {error}"),
            DispatchOutcome::Skipped(reason) => format!("Skipped: {reason}"),
            DispatchOutcome::ConfigError(error) => format!("Config error: {error}"),
        }
    }
}

/// Receives started and finished executions plus registry load failures.
/// Called from the worker thread for finished ones.
pub trait OutcomeObserver: Send + Sync {
    fn on_outcome(&self, outcome: &DispatchOutcome);
}

impl<F> OutcomeObserver for F
where
    F: Fn(&DispatchOutcome) + Send + Sync,
{
    fn on_outcome(&self, outcome: &DispatchOutcome) {
        self(outcome)
    }
}

/// Background macro run. The worker clears its running flag before
/// reporting, so a finished handle is dropped (detached) rather than joined
/// and a slow observer never stalls the caller.
#[derive(Debug)]
pub struct ExecutionHandle {
    name: String,
    running: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl ExecutionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_alive(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Block until the worker exits.
    pub fn join(self) {
        if self.join.join().is_err() {
            tracing::error!(name = %self.name, "macro worker panicked");
        }
    }
}

/// Per-dispatcher gating state. Never persisted.
#[derive(Debug)]
pub struct DispatchState {
    pub last_fire: Option<Instant>,
    pub cooldown: Duration,
    active: Option<ExecutionHandle>,
}

impl DispatchState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_fire: None,
            cooldown,
            active: None,
        }
    }

    fn cooling_down(&self, now: Instant) -> bool {
        match self.last_fire {
            Some(last) => now.saturating_duration_since(last) < self.cooldown,
            None => false,
        }
    }

    /// Name of the macro currently running, if any.
    pub fn active_macro(&self) -> Option<&str> {
        self.active
            .as_ref()
            .filter(|handle| handle.is_alive())
            .map(ExecutionHandle::name)
    }

    /// Forget the handle of a finished run; `true` while one is still running.
    fn busy(&mut self) -> bool {
        match self.active.take() {
            Some(handle) if handle.is_alive() => {
                self.active = Some(handle);
                true
            }
            Some(_) | None => false,
        }
    }
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

/// Turns recognised gestures into at most one running macro at a time.
pub struct GestureDispatcher {
    store: RegistryStore,
    interpreter: MacroInterpreter,
    observer: Arc<dyn OutcomeObserver>,
    state: DispatchState,
    last_config_error: Option<String>,
}

impl GestureDispatcher {
    pub fn new(
        store: RegistryStore,
        interpreter: MacroInterpreter,
        observer: Arc<dyn OutcomeObserver>,
    ) -> Self {
        Self {
            store,
            interpreter,
            observer,
            state: DispatchState::default(),
            last_config_error: None,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.state.cooldown = cooldown;
        self
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    pub fn is_busy(&mut self) -> bool {
        self.state.busy()
    }

    pub fn on_signature(&mut self, signature: &GestureSignature) -> DispatchOutcome {
        self.on_signature_at(signature, Instant::now())
    }

    pub fn on_signature_at(&mut self, signature: &GestureSignature, now: Instant) -> DispatchOutcome {
        if self.state.cooling_down(now) {
            return DispatchOutcome::Skipped(SkipReason::CooldownActive);
        }

        let registry = match self.store.load() {
            Ok(registry) => {
                self.last_config_error = None;
                registry
            }
            Err(err) => {
                let msg = err.to_string();
                if self.last_config_error.as_deref() != Some(msg.as_str()) {
                    tracing::error!(error = %msg, "gesture macros unavailable");
                    self.observer
                        .on_outcome(&DispatchOutcome::ConfigError(msg.clone()));
                    self.last_config_error = Some(msg);
                }
                return DispatchOutcome::Skipped(SkipReason::NoMatch);
            }
        };
        let Some(entry) = registry.get(signature).cloned() else {
            return DispatchOutcome::Skipped(SkipReason::NoMatch);
        };

        if self.state.busy() {
            tracing::trace!(
                gesture = %signature,
                running = self.state.active_macro().unwrap_or_default(),
                "macro already running"
            );
            return DispatchOutcome::Skipped(SkipReason::Busy);
        }

        self.state.last_fire = Some(now);
        let running = Arc::new(AtomicBool::new(true));
        let interpreter = self.interpreter.clone();
        let observer = Arc::clone(&self.observer);
        let name = entry.name.clone();
        let worker_running = Arc::clone(&running);
        tracing::info!(gesture = %signature, name = %entry.name, "starting macro");
        observer.on_outcome(&DispatchOutcome::Started(name.clone()));
        let join = thread::spawn(move || {
            let outcome = match interpreter.execute(&entry.actions) {
                Ok(()) => {
                    tracing::info!(name = %entry.name, "macro finished");
                    DispatchOutcome::Succeeded(entry.name)
                }
                Err(err) => {
                    tracing::error!(name = %entry.name, error = %err, "macro failed");
                    DispatchOutcome::Failed {
                        name: entry.name,
                        error: err.to_string(),
                    }
                }
            };
            worker_running.store(false, Ordering::SeqCst);
            observer.on_outcome(&outcome);
        });
        self.state.active = Some(ExecutionHandle {
            name: name.clone(),
            running,
            join,
        });
        DispatchOutcome::Started(name)
    }

    /// Block until the in-flight macro, if any, has finished.
    pub fn wait_idle(&mut self) {
        if let Some(handle) = self.state.active.take() {
            handle.join();
        }
    }
}
