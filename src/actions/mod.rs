//! Macro action lines.
//!
//! Each stored line is parsed into an [`Action`] before it runs.

use std::time::Duration;

pub mod backend;
pub mod keys;
pub mod shell;

pub use backend::{InputBackend, MockCall, MockGate, MockInputBackend, SystemInputBackend};
pub use keys::{Key, SpecialKey};

const STRING_PREFIX: &str = "STRING:";
const KEY_PREFIX: &str = "KEY:";
const OPEN_PREFIX: &str = "OPEN:";
const WAIT_PREFIX: &str = "WAIT:";
const CMD_PREFIX: &str = "CMD:";

pub const ACTION_HELP: &str = "\
Each line of a macro is one action:

STRING: <text>   Type the text
  Example: STRING: Hello, world!
KEY: <key>       Press and release a key (ctrl, alt, shift, enter, esc, tab,
                 space, backspace, f1..f24, arrows, ...) or a single character
  Example: KEY: enter
OPEN: <url>      Open the URL in the default browser
  Example: OPEN: https://example.com
WAIT: <seconds>  Pause; fractional values allowed
  Example: WAIT: 0.5
CMD: <command>   Start a shell command without waiting for it
  Example: CMD: notepad.exe
# comment        Ignored, as are blank lines

Any other line is typed as-is.";

/// One executable macro step.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    TypeText(String),
    PressKey(Key),
    OpenUrl(String),
    Wait(Duration),
    Spawn(String),
    /// Recognised line with nothing to do (empty URL, unparsable wait, ...).
    Nop,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::TypeText(_) => "type",
            Action::PressKey(_) => "key",
            Action::OpenUrl(_) => "open",
            Action::Wait(_) => "wait",
            Action::Spawn(_) => "cmd",
            Action::Nop => "nop",
        }
    }
}

/// Parse one stored line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Option<Action> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let action = if let Some(text) = line.strip_prefix(STRING_PREFIX) {
        Action::TypeText(text.trim_start().to_string())
    } else if let Some(key) = line.strip_prefix(KEY_PREFIX) {
        Action::PressKey(Key::resolve(key.trim()))
    } else if let Some(url) = line.strip_prefix(OPEN_PREFIX) {
        non_empty(url).map_or(Action::Nop, Action::OpenUrl)
    } else if let Some(secs) = line.strip_prefix(WAIT_PREFIX) {
        parse_wait(secs).map_or(Action::Nop, Action::Wait)
    } else if let Some(cmd) = line.strip_prefix(CMD_PREFIX) {
        non_empty(cmd).map_or(Action::Nop, Action::Spawn)
    } else {
        Action::TypeText(line.to_string())
    };
    Some(action)
}

fn non_empty(payload: &str) -> Option<String> {
    let payload = payload.trim();
    (!payload.is_empty()).then(|| payload.to_string())
}

/// Seconds as a non-negative duration; garbage is `None`.
fn parse_wait(payload: &str) -> Option<Duration> {
    let secs: f64 = payload.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs.max(0.0)).ok()
}
