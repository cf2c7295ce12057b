//! enigoアクション実行アダプター（Infrastructure層）
//!
//! ActionExecutorポートの本番実装。
//! 確定したアクション記述子をenigo経由でOS入力イベントとして注入する。

use enigo::{Axis, Button, Direction, Enigo, Key, Keyboard, Mouse, Settings};

use crate::domain::config::ExecutorConfig;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ports::ActionExecutor;
use crate::domain::types::{ActionDescriptor, MouseButton, ScrollDirection};

/// OS入力注入アダプター
pub struct EnigoExecutor {
    enigo: Enigo,
    scroll_unit: i32,
}

impl EnigoExecutor {
    /// 実行アダプターを作成
    ///
    /// # Returns
    /// - `Err(DomainError::Execution)`: プラットフォームの入力バックエンド初期化失敗
    pub fn new(config: &ExecutorConfig) -> DomainResult<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| DomainError::Execution(format!("Failed to initialize input backend: {}", e)))?;
        Ok(Self {
            enigo,
            scroll_unit: config.scroll_unit,
        })
    }

    fn tap_key(&mut self, name: &str) -> DomainResult<()> {
        let key = key_from_name(name)?;
        self.enigo
            .key(key, Direction::Click)
            .map_err(|e| DomainError::Execution(format!("Key injection failed: {}", e)))
    }

    /// 組み合わせキーの注入
    ///
    /// 全キーを正規順で押下し、逆順で解放する。
    /// 途中で失敗した場合も押下済みのキーは解放を試みる。
    fn tap_combo(&mut self, combo: &str) -> DomainResult<()> {
        let keys = combo
            .split('+')
            .map(key_from_name)
            .collect::<DomainResult<Vec<Key>>>()?;
        if keys.is_empty() {
            return Err(DomainError::Execution("Empty combo".to_string()));
        }

        let mut pressed: Vec<Key> = Vec::with_capacity(keys.len());
        let mut failure = None;
        for key in &keys {
            match self.enigo.key(*key, Direction::Press) {
                Ok(()) => pressed.push(*key),
                Err(e) => {
                    failure = Some(format!("Combo press failed: {}", e));
                    break;
                }
            }
        }

        for key in pressed.iter().rev() {
            if let Err(e) = self.enigo.key(*key, Direction::Release) {
                failure.get_or_insert(format!("Combo release failed: {}", e));
            }
        }

        match failure {
            Some(message) => Err(DomainError::Execution(message)),
            None => Ok(()),
        }
    }

    fn scroll(&mut self, direction: ScrollDirection) -> DomainResult<()> {
        // enigoの垂直スクロールは正が下方向
        let amount = match direction {
            ScrollDirection::Up => -self.scroll_unit,
            ScrollDirection::Down => self.scroll_unit,
        };
        self.enigo
            .scroll(amount, Axis::Vertical)
            .map_err(|e| DomainError::Execution(format!("Scroll injection failed: {}", e)))
    }

    fn click(&mut self, button: MouseButton) -> DomainResult<()> {
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        };
        self.enigo
            .button(button, Direction::Click)
            .map_err(|e| DomainError::Execution(format!("Click injection failed: {}", e)))
    }
}

impl ActionExecutor for EnigoExecutor {
    fn execute(&mut self, action: &ActionDescriptor) -> DomainResult<()> {
        match action {
            ActionDescriptor::Key { value } => self.tap_key(value),
            ActionDescriptor::Combo { value } => self.tap_combo(value),
            ActionDescriptor::MouseScroll { value } => self.scroll(*value),
            ActionDescriptor::MouseClick { button } => self.click(*button),
        }
    }
}

/// 正規化済みキー名をenigoのKeyへ変換
///
/// バインディングに現れる語彙のみを扱う。super/meta系は
/// キャプチャ段階で排除されるためここには到達しない。
fn key_from_name(name: &str) -> DomainResult<Key> {
    let key = match name {
        "ctrl" => Key::Control,
        "shift" => Key::Shift,
        "alt" => Key::Alt,
        "tab" => Key::Tab,
        "enter" => Key::Return,
        "space" => Key::Space,
        "esc" => Key::Escape,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => {
                    return Err(DomainError::Execution(format!(
                        "Unmapped key name: {:?}",
                        name
                    )))
                }
            }
        }
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_keys_map() {
        assert_eq!(key_from_name("ctrl").unwrap(), Key::Control);
        assert_eq!(key_from_name("enter").unwrap(), Key::Return);
        assert_eq!(key_from_name("esc").unwrap(), Key::Escape);
        assert_eq!(key_from_name("f11").unwrap(), Key::F11);
    }

    #[test]
    fn test_single_characters_map_to_unicode() {
        assert_eq!(key_from_name("a").unwrap(), Key::Unicode('a'));
        assert_eq!(key_from_name("7").unwrap(), Key::Unicode('7'));
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        assert!(key_from_name("").is_err());
        assert!(key_from_name("pagedown").is_err());
    }
}
