//! Global mouse/keyboard listener using the `rdev` crate.
//!
//! `rdev::listen` blocks its thread for the life of the process and has
//! no unsubscribe call, so stopping only disarms the callback. The
//! thread itself is left to die with the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rdev::{Button, EventType};

use super::{InputError, InputEvent, InputSource, InputState, Key, MouseButton};

/// How long to wait for `rdev::listen` to fail fast (missing
/// accessibility permission, no X display) before assuming it is up.
const STARTUP_GRACE: Duration = Duration::from_millis(250);

pub struct GlobalInputMonitor {
    armed: Arc<AtomicBool>,
    started: bool,
}

impl GlobalInputMonitor {
    pub fn new() -> Self {
        Self {
            armed: Arc::new(AtomicBool::new(false)),
            started: false,
        }
    }
}

impl Default for GlobalInputMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for GlobalInputMonitor {
    fn start(&mut self, state: Arc<InputState>) -> Result<(), InputError> {
        if self.started {
            self.armed.store(true, Ordering::Release);
            return Ok(());
        }

        let armed = Arc::clone(&self.armed);
        armed.store(true, Ordering::Release);
        let (err_tx, err_rx) = mpsc::channel::<String>();

        thread::Builder::new()
            .name("input-listener".into())
            .spawn(move || {
                let mut last_pos = (0.0_f64, 0.0_f64);
                let result = rdev::listen(move |event| {
                    if !armed.load(Ordering::Acquire) {
                        return;
                    }
                    if let EventType::MouseMove { x, y } = event.event_type {
                        last_pos = (x, y);
                        return;
                    }
                    if let Some(ev) = translate(&event.event_type) {
                        if ev == InputEvent::ButtonDown(MouseButton::Left) {
                            log::debug!(
                                "[INPUT] Mouse clicked at ({:.0}, {:.0})",
                                last_pos.0,
                                last_pos.1
                            );
                        }
                        state.handle(ev);
                    }
                });
                if let Err(e) = result {
                    let msg = format!("{:?}", e);
                    log::error!("[INPUT] Listener stopped: {}", msg);
                    let _ = err_tx.send(msg);
                }
            })
            .map_err(|e| InputError::Spawn(e.to_string()))?;

        match err_rx.recv_timeout(STARTUP_GRACE) {
            Ok(msg) => {
                self.armed.store(false, Ordering::Release);
                Err(InputError::Listen(msg))
            }
            Err(_) => {
                self.started = true;
                log::info!("[INPUT] Global mouse/keyboard listener running");
                Ok(())
            }
        }
    }

    fn stop(&mut self) {
        if self.armed.swap(false, Ordering::AcqRel) {
            log::info!("[INPUT] Listener disarmed");
        }
    }
}

/// Map an `rdev` event to the platform-neutral form. Returns `None` for
/// events the state machine does not care about.
fn translate(event: &EventType) -> Option<InputEvent> {
    match event {
        EventType::ButtonPress(button) => Some(InputEvent::ButtonDown(match button {
            Button::Left => MouseButton::Left,
            Button::Right => MouseButton::Right,
            Button::Middle => MouseButton::Middle,
            Button::Unknown(_) => MouseButton::Other,
        })),
        EventType::KeyPress(key) => Some(InputEvent::KeyDown(translate_key(*key))),
        EventType::KeyRelease(key) => Some(InputEvent::KeyUp(translate_key(*key))),
        _ => None,
    }
}

fn translate_key(key: rdev::Key) -> Key {
    use rdev::Key as K;
    match key {
        K::ControlLeft => Key::ControlLeft,
        K::ControlRight => Key::ControlRight,
        K::Alt => Key::AltLeft,
        K::AltGr => Key::AltRight,
        K::Escape => Key::Escape,
        K::F1 => Key::F(1),
        K::F2 => Key::F(2),
        K::F3 => Key::F(3),
        K::F4 => Key::F(4),
        K::F5 => Key::F(5),
        K::F6 => Key::F(6),
        K::F7 => Key::F(7),
        K::F8 => Key::F(8),
        K::F9 => Key::F(9),
        K::F10 => Key::F(10),
        K::F11 => Key::F(11),
        K::F12 => Key::F(12),
        K::KeyA => Key::Char('a'),
        K::KeyB => Key::Char('b'),
        K::KeyC => Key::Char('c'),
        K::KeyD => Key::Char('d'),
        K::KeyE => Key::Char('e'),
        K::KeyF => Key::Char('f'),
        K::KeyG => Key::Char('g'),
        K::KeyH => Key::Char('h'),
        K::KeyI => Key::Char('i'),
        K::KeyJ => Key::Char('j'),
        K::KeyK => Key::Char('k'),
        K::KeyL => Key::Char('l'),
        K::KeyM => Key::Char('m'),
        K::KeyN => Key::Char('n'),
        K::KeyO => Key::Char('o'),
        K::KeyP => Key::Char('p'),
        K::KeyQ => Key::Char('q'),
        K::KeyR => Key::Char('r'),
        K::KeyS => Key::Char('s'),
        K::KeyT => Key::Char('t'),
        K::KeyU => Key::Char('u'),
        K::KeyV => Key::Char('v'),
        K::KeyW => Key::Char('w'),
        K::KeyX => Key::Char('x'),
        K::KeyY => Key::Char('y'),
        K::KeyZ => Key::Char('z'),
        _ => Key::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_modifiers_and_function_keys() {
        assert_eq!(translate_key(rdev::Key::AltGr), Key::AltRight);
        assert_eq!(translate_key(rdev::Key::F12), Key::F(12));
        assert_eq!(translate_key(rdev::Key::KeyQ), Key::Char('q'));
        assert_eq!(translate_key(rdev::Key::ShiftLeft), Key::Other);
    }

    #[test]
    fn ignores_wheel_and_button_release() {
        assert_eq!(translate(&EventType::ButtonRelease(Button::Left)), None);
        assert_eq!(translate(&EventType::Wheel { delta_x: 0, delta_y: 1 }), None);
        assert_eq!(
            translate(&EventType::ButtonPress(Button::Left)),
            Some(InputEvent::ButtonDown(MouseButton::Left))
        );
    }
}
