//! rdev rawインプットアダプター（Infrastructure層）
//!
//! RawInputSourceポートの本番実装。
//! グローバルのキーボード・マウスイベントをrdevで監視し、
//! アクティブな購読へチャネル配信する。
//!
//! rdevのリスナーは停止APIを持たないため、スレッドはプロセスと同寿命。
//! 配信の有効・無効は購読側と共有するフラグで切り替え、
//! 購読のDropで確実に配信が止まる。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Sender};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ports::{RawInputEvent, RawInputSource, RawInputSubscription};
use crate::domain::types::MouseButton;

/// リスナースレッドと共有する配信先
type Sink = Arc<Mutex<Option<(Sender<RawInputEvent>, Arc<AtomicBool>)>>>;

/// グローバル入力監視アダプター
pub struct RdevInputSource {
    sink: Sink,
    listener_spawned: bool,
}

impl RdevInputSource {
    pub fn new() -> Self {
        Self {
            sink: Arc::new(Mutex::new(None)),
            listener_spawned: false,
        }
    }

    fn spawn_listener(&mut self) -> DomainResult<()> {
        let sink = Arc::clone(&self.sink);
        std::thread::Builder::new()
            .name("raw-input-listener".to_string())
            .spawn(move || {
                // ButtonPressに付与する座標は直近のMouseMoveを保持する
                let mut last_pos = (0.0f64, 0.0f64);

                let callback = move |event: rdev::Event| {
                    if let rdev::EventType::MouseMove { x, y } = event.event_type {
                        last_pos = (x, y);
                        return;
                    }

                    let Some(raw) = translate(&event.event_type, last_pos) else {
                        return;
                    };

                    let Ok(mut sink) = sink.lock() else {
                        return;
                    };
                    let delivered = match sink.as_ref() {
                        Some((tx, active)) if active.load(Ordering::Relaxed) => {
                            tx.try_send(raw).is_ok()
                        }
                        _ => false,
                    };
                    if !delivered && sink.is_some() {
                        // 購読が終了済みなら配信先を外す
                        *sink = None;
                    }
                };

                if let Err(e) = rdev::listen(callback) {
                    tracing::error!(error = ?e, "Raw input listener failed");
                }
            })
            .map_err(|e| DomainError::Capture(format!("Failed to spawn listener thread: {}", e)))?;
        Ok(())
    }
}

impl Default for RdevInputSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RawInputSource for RdevInputSource {
    fn subscribe(&mut self) -> DomainResult<RawInputSubscription> {
        let (tx, rx) = bounded(256);
        let active = Arc::new(AtomicBool::new(true));

        {
            let mut sink = self
                .sink
                .lock()
                .map_err(|_| DomainError::Capture("Listener sink poisoned".to_string()))?;
            *sink = Some((tx, Arc::clone(&active)));
        }

        if !self.listener_spawned {
            self.spawn_listener()?;
            self.listener_spawned = true;
        }

        tracing::debug!("Raw input subscription opened");
        Ok(RawInputSubscription::new(rx, active))
    }
}

/// rdevイベントをポートのイベント型へ変換
fn translate(event_type: &rdev::EventType, last_pos: (f64, f64)) -> Option<RawInputEvent> {
    match event_type {
        rdev::EventType::KeyPress(key) => Some(RawInputEvent::KeyDown {
            key: key_name(*key)?,
        }),
        rdev::EventType::KeyRelease(key) => Some(RawInputEvent::KeyUp {
            key: key_name(*key)?,
        }),
        rdev::EventType::Wheel { delta_y, .. } => Some(RawInputEvent::Scroll { delta: *delta_y }),
        rdev::EventType::ButtonPress(button) => {
            let button = match button {
                rdev::Button::Left => MouseButton::Left,
                rdev::Button::Right => MouseButton::Right,
                rdev::Button::Middle => MouseButton::Middle,
                rdev::Button::Unknown(_) => return None,
            };
            Some(RawInputEvent::ButtonPress {
                button,
                x: last_pos.0,
                y: last_pos.1,
            })
        }
        _ => None,
    }
}

/// rdevキーをキャプチャ語彙のキー名へ変換
///
/// バインディングに使えないキー（Backspace等）はNoneで落とす。
/// super/meta系は名前をそのまま流し、キャプチャ側の禁止判定に委ねる。
fn key_name(key: rdev::Key) -> Option<String> {
    use rdev::Key::*;
    let name = match key {
        KeyA => "a",
        KeyB => "b",
        KeyC => "c",
        KeyD => "d",
        KeyE => "e",
        KeyF => "f",
        KeyG => "g",
        KeyH => "h",
        KeyI => "i",
        KeyJ => "j",
        KeyK => "k",
        KeyL => "l",
        KeyM => "m",
        KeyN => "n",
        KeyO => "o",
        KeyP => "p",
        KeyQ => "q",
        KeyR => "r",
        KeyS => "s",
        KeyT => "t",
        KeyU => "u",
        KeyV => "v",
        KeyW => "w",
        KeyX => "x",
        KeyY => "y",
        KeyZ => "z",
        Num0 => "0",
        Num1 => "1",
        Num2 => "2",
        Num3 => "3",
        Num4 => "4",
        Num5 => "5",
        Num6 => "6",
        Num7 => "7",
        Num8 => "8",
        Num9 => "9",
        Kp0 => "kp0",
        Kp1 => "kp1",
        Kp2 => "kp2",
        Kp3 => "kp3",
        Kp4 => "kp4",
        Kp5 => "kp5",
        Kp6 => "kp6",
        Kp7 => "kp7",
        Kp8 => "kp8",
        Kp9 => "kp9",
        ControlLeft => "control_left",
        ControlRight => "control_right",
        ShiftLeft => "shift_left",
        ShiftRight => "shift_right",
        Alt => "alt",
        AltGr => "alt_gr",
        MetaLeft => "meta_left",
        MetaRight => "meta_right",
        Tab => "tab",
        Return => "enter",
        KpReturn => "enter",
        Space => "space",
        Escape => "esc",
        UpArrow => "up",
        DownArrow => "down",
        LeftArrow => "left",
        RightArrow => "right",
        F1 => "f1",
        F2 => "f2",
        F3 => "f3",
        F4 => "f4",
        F5 => "f5",
        F6 => "f6",
        F7 => "f7",
        F8 => "f8",
        F9 => "f9",
        F10 => "f10",
        F11 => "f11",
        F12 => "f12",
        _ => return None,
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::capture::{normalize_key, KeyNormalization};

    #[test]
    fn test_translate_wheel_and_buttons() {
        assert_eq!(
            translate(&rdev::EventType::Wheel { delta_x: 0, delta_y: -2 }, (0.0, 0.0)),
            Some(RawInputEvent::Scroll { delta: -2 })
        );
        assert_eq!(
            translate(&rdev::EventType::ButtonPress(rdev::Button::Left), (12.0, 34.0)),
            Some(RawInputEvent::ButtonPress {
                button: MouseButton::Left,
                x: 12.0,
                y: 34.0
            })
        );
        assert_eq!(
            translate(&rdev::EventType::ButtonPress(rdev::Button::Unknown(9)), (0.0, 0.0)),
            None
        );
    }

    #[test]
    fn test_key_names_normalize_as_expected() {
        // アダプターの語彙がキャプチャ側の正規化と噛み合うことの確認
        assert_eq!(
            normalize_key(&key_name(rdev::Key::ControlLeft).unwrap()),
            KeyNormalization::Accepted("ctrl".to_string())
        );
        assert_eq!(
            normalize_key(&key_name(rdev::Key::Kp7).unwrap()),
            KeyNormalization::Accepted("7".to_string())
        );
        assert!(matches!(
            normalize_key(&key_name(rdev::Key::MetaLeft).unwrap()),
            KeyNormalization::Forbidden(_)
        ));
    }

    #[test]
    fn test_unbindable_keys_are_dropped() {
        assert!(key_name(rdev::Key::Backspace).is_none());
        assert!(key_name(rdev::Key::CapsLock).is_none());
    }
}
