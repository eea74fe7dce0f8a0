#[cfg(target_os = "windows")]
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    KEYEVENTF_UNICODE, VIRTUAL_KEY,
};

/// Named keys accepted by `KEY:` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKey {
    Ctrl,
    Shift,
    Alt,
    Cmd,
    Enter,
    Tab,
    Esc,
    Space,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    CapsLock,
    Menu,
    PrintScreen,
    F(u8),
}

impl SpecialKey {
    pub fn from_name(name: &str) -> Option<Self> {
        let t = name.trim();
        if t.is_empty() {
            return None;
        }
        let key = match t.to_ascii_lowercase().as_str() {
            "ctrl" | "control" | "ctrl_l" | "ctrl_r" => SpecialKey::Ctrl,
            "shift" | "shift_l" | "shift_r" => SpecialKey::Shift,
            "alt" | "alt_l" | "alt_r" | "alt_gr" => SpecialKey::Alt,
            "cmd" | "cmd_l" | "cmd_r" | "win" | "windows" | "super" => SpecialKey::Cmd,
            "enter" | "return" => SpecialKey::Enter,
            "tab" => SpecialKey::Tab,
            "esc" | "escape" => SpecialKey::Esc,
            "space" => SpecialKey::Space,
            "backspace" | "bksp" => SpecialKey::Backspace,
            "delete" | "del" => SpecialKey::Delete,
            "insert" | "ins" => SpecialKey::Insert,
            "home" => SpecialKey::Home,
            "end" => SpecialKey::End,
            "page_up" | "pageup" | "pgup" => SpecialKey::PageUp,
            "page_down" | "pagedown" | "pgdn" => SpecialKey::PageDown,
            "up" => SpecialKey::Up,
            "down" => SpecialKey::Down,
            "left" => SpecialKey::Left,
            "right" => SpecialKey::Right,
            "caps_lock" | "capslock" => SpecialKey::CapsLock,
            "menu" => SpecialKey::Menu,
            "print_screen" | "printscreen" => SpecialKey::PrintScreen,
            other => return function_key(other),
        };
        Some(key)
    }

    pub fn name(&self) -> String {
        match self {
            SpecialKey::Ctrl => "ctrl".into(),
            SpecialKey::Shift => "shift".into(),
            SpecialKey::Alt => "alt".into(),
            SpecialKey::Cmd => "cmd".into(),
            SpecialKey::Enter => "enter".into(),
            SpecialKey::Tab => "tab".into(),
            SpecialKey::Esc => "esc".into(),
            SpecialKey::Space => "space".into(),
            SpecialKey::Backspace => "backspace".into(),
            SpecialKey::Delete => "delete".into(),
            SpecialKey::Insert => "insert".into(),
            SpecialKey::Home => "home".into(),
            SpecialKey::End => "end".into(),
            SpecialKey::PageUp => "page_up".into(),
            SpecialKey::PageDown => "page_down".into(),
            SpecialKey::Up => "up".into(),
            SpecialKey::Down => "down".into(),
            SpecialKey::Left => "left".into(),
            SpecialKey::Right => "right".into(),
            SpecialKey::CapsLock => "caps_lock".into(),
            SpecialKey::Menu => "menu".into(),
            SpecialKey::PrintScreen => "print_screen".into(),
            SpecialKey::F(n) => format!("f{n}"),
        }
    }

    /// Win32 virtual-key code.
    pub fn vk_code(&self) -> u16 {
        match self {
            SpecialKey::Ctrl => 0x11,
            SpecialKey::Shift => 0x10,
            SpecialKey::Alt => 0x12,
            SpecialKey::Cmd => 0x5B,
            SpecialKey::Enter => 0x0D,
            SpecialKey::Tab => 0x09,
            SpecialKey::Esc => 0x1B,
            SpecialKey::Space => 0x20,
            SpecialKey::Backspace => 0x08,
            SpecialKey::Delete => 0x2E,
            SpecialKey::Insert => 0x2D,
            SpecialKey::Home => 0x24,
            SpecialKey::End => 0x23,
            SpecialKey::PageUp => 0x21,
            SpecialKey::PageDown => 0x22,
            SpecialKey::Up => 0x26,
            SpecialKey::Down => 0x28,
            SpecialKey::Left => 0x25,
            SpecialKey::Right => 0x27,
            SpecialKey::CapsLock => 0x14,
            SpecialKey::Menu => 0x5D,
            SpecialKey::PrintScreen => 0x2C,
            SpecialKey::F(n) => 0x6F + *n as u16, // VK_F1=0x70
        }
    }
}

// F1..F24
fn function_key(t: &str) -> Option<SpecialKey> {
    let n: u8 = t.strip_prefix('f')?.parse().ok()?;
    (1..=24).contains(&n).then_some(SpecialKey::F(n))
}

/// Target of a `KEY:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Special(SpecialKey),
    /// Unrecognised name, pressed as the raw text. Only a single character
    /// can actually be sent.
    Literal(String),
}

impl Key {
    pub fn resolve(payload: &str) -> Self {
        match SpecialKey::from_name(payload) {
            Some(key) => Key::Special(key),
            None => Key::Literal(payload.to_string()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Key::Special(key) => key.name(),
            Key::Literal(text) => text.clone(),
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Key::Literal(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Some(ch),
                    _ => None,
                }
            }
            Key::Special(_) => None,
        }
    }
}

#[cfg(target_os = "windows")]
pub(crate) fn press_and_release(key: &Key) -> anyhow::Result<()> {
    match key {
        Key::Special(special) => {
            let vk = VIRTUAL_KEY(special.vk_code());
            send_vk(vk, KEYBD_EVENT_FLAGS(0))?;
            send_vk(vk, KEYEVENTF_KEYUP)
        }
        Key::Literal(text) => match key.as_char() {
            Some(ch) => send_char(ch),
            None => anyhow::bail!("unknown key '{text}'"),
        },
    }
}

#[cfg(not(target_os = "windows"))]
pub(crate) fn press_and_release(key: &Key) -> anyhow::Result<()> {
    anyhow::bail!(
        "key '{}': key events are only supported on Windows",
        key.label()
    );
}

#[cfg(target_os = "windows")]
pub(crate) fn type_text(text: &str) -> anyhow::Result<()> {
    for ch in text.chars() {
        send_char(ch)?;
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
pub(crate) fn type_text(text: &str) -> anyhow::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    anyhow::bail!("typing text is only supported on Windows");
}

#[cfg(target_os = "windows")]
fn send_vk(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> anyhow::Result<()> {
    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    send_inputs(&[input])
}

/// Send one character as unicode scan codes (surrogate pairs as needed).
#[cfg(target_os = "windows")]
fn send_char(ch: char) -> anyhow::Result<()> {
    let mut buf = [0u16; 2];
    for &code in ch.encode_utf16(&mut buf).iter() {
        let mut input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(0),
                    wScan: code,
                    dwFlags: KEYEVENTF_UNICODE,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        send_inputs(&[input])?;
        input.Anonymous.ki.dwFlags = KEYBD_EVENT_FLAGS(KEYEVENTF_UNICODE.0 | KEYEVENTF_KEYUP.0);
        send_inputs(&[input])?;
    }
    Ok(())
}

#[cfg(target_os = "windows")]
fn send_inputs(inputs: &[INPUT]) -> anyhow::Result<()> {
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent == 0 {
        anyhow::bail!("SendInput returned 0");
    }
    Ok(())
}
