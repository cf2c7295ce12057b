//! アクションレジストリ
//!
//! ジェスチャーコード1..5からアクション記述子へのマッピング。
//! Stabilizerのディスパッチが参照し、キャプチャセッションと
//! 一括ロード/リセットのみが変更する単一の真実源。

use crate::domain::types::{ActionDescriptor, GESTURE_CODE_MAX, GESTURE_CODE_MIN};

/// バインド可能なジェスチャーコード数
pub const SLOT_COUNT: usize = (GESTURE_CODE_MAX - GESTURE_CODE_MIN + 1) as usize;

/// ジェスチャーコード → アクション記述子のマッピング
///
/// # 不変条件
/// 同一の記述子を同時に保持できるジェスチャーコードは最大1つ。
/// `bind`は新しい所有者を登録する前に、他コードの等しい記述子を解除する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionRegistry {
    slots: [Option<ActionDescriptor>; SLOT_COUNT],
}

impl ActionRegistry {
    /// 全コード未設定のレジストリを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// コードを配列インデックスに変換（範囲外は前提条件違反）
    fn slot(gesture: u8) -> usize {
        debug_assert!(
            (GESTURE_CODE_MIN..=GESTURE_CODE_MAX).contains(&gesture),
            "gesture code out of range: {}",
            gesture
        );
        (gesture - GESTURE_CODE_MIN) as usize
    }

    /// 記述子をジェスチャーコードへバインド
    ///
    /// 等しい記述子を保持していた他のコードは未設定に戻される（競合解除）。
    ///
    /// # Returns
    /// - `Some(code)`: 競合解除で未設定に戻されたコード
    /// - `None`: 競合なし
    pub fn bind(&mut self, gesture: u8, action: ActionDescriptor) -> Option<u8> {
        let target = Self::slot(gesture);
        let mut cleared = None;

        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if idx != target && slot.as_ref() == Some(&action) {
                *slot = None;
                cleared = Some(idx as u8 + GESTURE_CODE_MIN);
            }
        }

        self.slots[target] = Some(action);
        cleared
    }

    /// バインディングを解除し、外れた記述子を返す
    pub fn unbind(&mut self, gesture: u8) -> Option<ActionDescriptor> {
        self.slots[Self::slot(gesture)].take()
    }

    /// 読み取り専用ルックアップ（Stabilizerのディスパッチで使用）
    pub fn resolve(&self, gesture: u8) -> Option<&ActionDescriptor> {
        self.slots[Self::slot(gesture)].as_ref()
    }

    /// すべてのバインディングを解除
    pub fn reset_all(&mut self) {
        self.slots = Default::default();
    }

    /// 内容を一括置換（検証済みインポートで使用）
    pub fn replace(&mut self, other: ActionRegistry) {
        self.slots = other.slots;
    }

    /// バインド済みのコードを列挙
    pub fn bound_codes(&self) -> impl Iterator<Item = u8> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(idx, _)| idx as u8 + GESTURE_CODE_MIN)
    }

    /// 全コードにバインディングが設定されているか
    pub fn is_fully_bound(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_some())
    }

    /// (コード, 記述子) の全ペアを列挙（未設定はNone）
    pub fn entries(&self) -> impl Iterator<Item = (u8, Option<&ActionDescriptor>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(idx, slot)| (idx as u8 + GESTURE_CODE_MIN, slot.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{MouseButton, ScrollDirection};

    fn key(value: &str) -> ActionDescriptor {
        ActionDescriptor::Key {
            value: value.to_string(),
        }
    }

    #[test]
    fn test_bind_and_resolve() {
        let mut registry = ActionRegistry::new();
        assert!(registry.resolve(3).is_none());

        registry.bind(3, key("space"));
        assert_eq!(registry.resolve(3), Some(&key("space")));
        assert!(registry.resolve(1).is_none());
    }

    #[test]
    fn test_conflict_clearing() {
        let mut registry = ActionRegistry::new();
        registry.bind(2, key("space"));

        // 同じ記述子を別コードへバインド → 旧所有者は未設定へ
        let cleared = registry.bind(4, key("space"));
        assert_eq!(cleared, Some(2));
        assert!(registry.resolve(2).is_none());
        assert_eq!(registry.resolve(4), Some(&key("space")));
    }

    #[test]
    fn test_no_conflict_for_distinct_descriptors() {
        let mut registry = ActionRegistry::new();
        registry.bind(1, key("a"));
        let cleared = registry.bind(2, key("b"));
        assert!(cleared.is_none());
        assert_eq!(registry.resolve(1), Some(&key("a")));
    }

    #[test]
    fn test_rebind_same_code_is_not_a_conflict() {
        let mut registry = ActionRegistry::new();
        registry.bind(3, key("a"));
        let cleared = registry.bind(3, key("a"));
        assert!(cleared.is_none());
        assert_eq!(registry.resolve(3), Some(&key("a")));
    }

    #[test]
    fn test_single_owner_invariant() {
        let mut registry = ActionRegistry::new();
        let scroll = ActionDescriptor::MouseScroll {
            value: ScrollDirection::Up,
        };
        registry.bind(1, scroll.clone());
        registry.bind(2, scroll.clone());
        registry.bind(5, scroll.clone());

        let owners: Vec<u8> = registry
            .entries()
            .filter(|(_, slot)| *slot == Some(&scroll))
            .map(|(code, _)| code)
            .collect();
        assert_eq!(owners, vec![5]);
    }

    #[test]
    fn test_unbind_and_reset() {
        let mut registry = ActionRegistry::new();
        registry.bind(1, key("a"));
        registry.bind(2, ActionDescriptor::MouseClick {
            button: MouseButton::Left,
        });

        assert_eq!(registry.unbind(1), Some(key("a")));
        assert!(registry.resolve(1).is_none());

        registry.reset_all();
        assert_eq!(registry.bound_codes().count(), 0);
    }

    #[test]
    fn test_fully_bound() {
        let mut registry = ActionRegistry::new();
        for code in 1..=5u8 {
            assert!(!registry.is_fully_bound());
            registry.bind(code, key(&format!("f{}", code)));
        }
        assert!(registry.is_fully_bound());
    }
}
