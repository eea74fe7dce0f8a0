use crate::actions::{parse_line, Action, InputBackend};
use std::sync::Arc;
use std::time::Duration;

/// Pause after every executed action.
pub const ACTION_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
#[error("step {step} ({line}) failed: {source:#}")]
pub struct ExecutionError {
    /// 1-based position of the failing line in the macro.
    pub step: usize,
    pub line: String,
    #[source]
    pub source: anyhow::Error,
}

/// Runs macro action lines against an [`InputBackend`], stopping at the
/// first failure.
#[derive(Clone)]
pub struct MacroInterpreter {
    backend: Arc<dyn InputBackend>,
    action_delay: Duration,
}

impl MacroInterpreter {
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self {
            backend,
            action_delay: ACTION_DELAY,
        }
    }

    pub fn with_action_delay(mut self, delay: Duration) -> Self {
        self.action_delay = delay;
        self
    }

    pub fn execute<S: AsRef<str>>(&self, lines: &[S]) -> Result<(), ExecutionError> {
        for (i, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            let Some(action) = parse_line(line) else {
                continue;
            };
            tracing::debug!(step = i + 1, kind = action.kind(), "running macro step");
            self.run_action(&action).map_err(|source| ExecutionError {
                step: i + 1,
                line: line.trim().to_string(),
                source,
            })?;
            if !self.action_delay.is_zero() {
                std::thread::sleep(self.action_delay);
            }
        }
        Ok(())
    }

    fn run_action(&self, action: &Action) -> anyhow::Result<()> {
        match action {
            Action::TypeText(text) => self.backend.type_text(text),
            Action::PressKey(key) => self.backend.press_and_release(key),
            Action::OpenUrl(url) => self.backend.open_url(url),
            Action::Wait(delay) => {
                std::thread::sleep(*delay);
                Ok(())
            }
            Action::Spawn(cmd) => self.backend.spawn_detached(cmd),
            Action::Nop => Ok(()),
        }
    }
}
