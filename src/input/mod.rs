//! Input domain: shared click/quit flags and the hotkey state machine.
//!
//! The platform listener (see `listener.rs`) translates OS events into
//! [`InputEvent`]s and hands them to [`InputState::handle`] on its own
//! thread. The capture loop and the controller only ever read the flags.
//! Every flag is an atomic, so the listener never blocks and no field
//! is read-modify-written without synchronization.

#[cfg(feature = "input-hooks")]
mod listener;

#[cfg(feature = "input-hooks")]
pub use listener::GlobalInputMonitor;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    Escape,
    /// Function key F1–F12.
    F(u8),
    /// Letter key, lowercase.
    Char(char),
    Other,
}

impl Key {
    fn is_ctrl(self) -> bool {
        matches!(self, Key::ControlLeft | Key::ControlRight)
    }

    fn is_alt(self) -> bool {
        matches!(self, Key::AltLeft | Key::AltRight)
    }
}

/// Platform-neutral input notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    ButtonDown(MouseButton),
    KeyDown(Key),
    KeyUp(Key),
}

/// Modifiers plus trigger key that request shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuitCombo {
    pub ctrl: bool,
    pub alt: bool,
    pub key: Key,
}

impl Default for QuitCombo {
    /// Ctrl+Alt+F12.
    fn default() -> Self {
        Self {
            ctrl: true,
            alt: true,
            key: Key::F(12),
        }
    }
}

impl FromStr for QuitCombo {
    type Err = HotkeyParseError;

    /// Parses `ctrl+alt+f12`, `esc`, `alt+q` and the like. Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut combo = QuitCombo {
            ctrl: false,
            alt: false,
            key: Key::Other,
        };
        let mut trigger = None;

        for part in s.split('+').map(|p| p.trim().to_ascii_lowercase()) {
            match part.as_str() {
                "ctrl" | "control" => combo.ctrl = true,
                "alt" => combo.alt = true,
                "" => return Err(HotkeyParseError::Empty(s.to_string())),
                other => {
                    if trigger.is_some() {
                        return Err(HotkeyParseError::MultipleKeys(s.to_string()));
                    }
                    trigger = Some(parse_key(other)?);
                }
            }
        }

        combo.key = trigger.ok_or_else(|| HotkeyParseError::MissingKey(s.to_string()))?;
        Ok(combo)
    }
}

fn parse_key(name: &str) -> Result<Key, HotkeyParseError> {
    if name == "esc" || name == "escape" {
        return Ok(Key::Escape);
    }
    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        if (1..=12).contains(&n) {
            return Ok(Key::F(n));
        }
    }
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_lowercase() {
            return Ok(Key::Char(c));
        }
    }
    Err(HotkeyParseError::UnknownKey(name.to_string()))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HotkeyParseError {
    #[error("Hotkey '{0}' contains an empty segment")]
    Empty(String),

    #[error("Hotkey '{0}' names more than one trigger key")]
    MultipleKeys(String),

    #[error("Hotkey '{0}' has modifiers but no trigger key")]
    MissingKey(String),

    #[error("Unknown key '{0}' (expected esc, f1-f12 or a letter)")]
    UnknownKey(String),
}

/// Flags shared between the input listener, the capture loop and the
/// controller.
#[derive(Debug)]
pub struct InputState {
    click_pending: AtomicBool,
    ctrl_held: AtomicBool,
    alt_held: AtomicBool,
    quit_requested: AtomicBool,
    combo: QuitCombo,
}

impl InputState {
    pub fn new(combo: QuitCombo) -> Self {
        Self {
            click_pending: AtomicBool::new(false),
            ctrl_held: AtomicBool::new(false),
            alt_held: AtomicBool::new(false),
            quit_requested: AtomicBool::new(false),
            combo,
        }
    }

    pub fn shared(combo: QuitCombo) -> Arc<Self> {
        Arc::new(Self::new(combo))
    }

    /// Apply one platform event. Called from the listener thread.
    pub fn handle(&self, event: InputEvent) {
        match event {
            InputEvent::ButtonDown(MouseButton::Left) => self.mark_click(),
            InputEvent::ButtonDown(_) => {}
            InputEvent::KeyDown(key) => {
                if key.is_ctrl() {
                    self.ctrl_held.store(true, Ordering::Release);
                }
                if key.is_alt() {
                    self.alt_held.store(true, Ordering::Release);
                }
                if key == self.combo.key && self.modifiers_satisfied() {
                    if !self.quit_requested.swap(true, Ordering::AcqRel) {
                        log::info!("[INPUT] Quit key combination pressed");
                    }
                }
            }
            InputEvent::KeyUp(key) => {
                if key.is_ctrl() {
                    self.ctrl_held.store(false, Ordering::Release);
                }
                if key.is_alt() {
                    self.alt_held.store(false, Ordering::Release);
                }
            }
        }
    }

    fn modifiers_satisfied(&self) -> bool {
        (!self.combo.ctrl || self.ctrl_held.load(Ordering::Acquire))
            && (!self.combo.alt || self.alt_held.load(Ordering::Acquire))
    }

    /// Set the pending-click flag. Repeated sets before the next
    /// [`take_click`](Self::take_click) collapse into one click.
    pub fn mark_click(&self) {
        self.click_pending.store(true, Ordering::Release);
    }

    /// Test-and-clear the pending-click flag.
    pub fn take_click(&self) -> bool {
        self.click_pending.swap(false, Ordering::AcqRel)
    }

    pub fn request_quit(&self) {
        self.quit_requested.store(true, Ordering::Release);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested.load(Ordering::Acquire)
    }

    pub fn combo(&self) -> QuitCombo {
        self.combo
    }
}

/// Something that feeds [`InputState`] from OS events.
pub trait InputSource {
    fn start(&mut self, state: Arc<InputState>) -> Result<(), InputError>;
    fn stop(&mut self);
}

/// Input source that delivers nothing; quit then only comes from the
/// presentation window or the tray.
#[derive(Debug, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn start(&mut self, _state: Arc<InputState>) -> Result<(), InputError> {
        log::warn!("[INPUT] No global input hooks in this build, clicks will not be counted");
        Ok(())
    }

    fn stop(&mut self) {}
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Global input listener failed: {0}")]
    Listen(String),

    #[error("Input listener thread could not be spawned: {0}")]
    Spawn(String),
}
