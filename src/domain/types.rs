/// コア型定義
///
/// Domain層の中心となるデータ構造。
/// ランドマーク観測・ジェスチャーコード・アクション記述子を定義する。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 1つの手の観測に含まれるランドマーク数（MediaPipe Hands準拠）
pub const LANDMARK_COUNT: usize = 21;

/// ジェスチャーコードの下限（バインド可能な最小値）
pub const GESTURE_CODE_MIN: u8 = 1;
/// ジェスチャーコードの上限（片手の指の本数）
pub const GESTURE_CODE_MAX: u8 = 5;

/// ランドマークインデックス（MediaPipe Hands準拠）
pub mod landmark_index {
    pub const WRIST: usize = 0;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_TIP: usize = 20;
}

/// 正規化画像座標の2Dランドマーク（Y軸は下向きが正）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    /// 新しいランドマークを作成
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 手の左右ラベル
///
/// 画像は水平反転済みの前提で、ラベルは物理的な手を指す
/// （物理左手の親指は画面上では右方向に伸びる）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handedness {
    Left,
    Right,
    #[default]
    Unknown,
}

/// 1フレーム分の片手観測
///
/// Hand Pose Sourceがフレームごとに生成する。ライフタイムは1フレームで、
/// コア側は内容を変更しない。
#[derive(Debug, Clone)]
pub struct HandObservation {
    /// ランドマーク列（順序固定、完全な観測では21点）
    pub landmarks: Vec<Landmark>,
    /// 手の左右ラベル
    pub handedness: Handedness,
}

impl HandObservation {
    /// 新しい観測を作成
    pub fn new(landmarks: Vec<Landmark>, handedness: Handedness) -> Self {
        Self {
            landmarks,
            handedness,
        }
    }

    /// 分類に必要な全ランドマークが揃っているか
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= LANDMARK_COUNT
    }

    /// インデックス指定でランドマークを取得
    pub fn landmark(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }
}

/// マウススクロールの方向
///
/// 永続化形式は元設定ファイルと互換の "scroll_up" / "scroll_down"。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ScrollDirection {
    #[serde(rename = "scroll_up")]
    Up,
    #[serde(rename = "scroll_down")]
    Down,
}

/// マウスボタン
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// アクション記述子
///
/// ジェスチャー確定時に注入する入力イベントの閉じたタグ付き表現。
/// 各ケースは必要なフィールドのみを持ち、部分的な記述子は存在しない。
///
/// # 永続化形式（JSON）
/// `{"type": "key", "value": "a"}` のように `type` タグで判別される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ActionDescriptor {
    /// 単一キー押下
    Key { value: String },
    /// 組み合わせキー（正規順で '+' 連結済み）
    Combo { value: String },
    /// マウススクロール1ティック
    MouseScroll { value: ScrollDirection },
    /// マウスクリック
    MouseClick { button: MouseButton },
}

impl ActionDescriptor {
    /// ログ向けの短い表記を返す
    pub fn describe(&self) -> String {
        match self {
            Self::Key { value } => format!("key({})", value),
            Self::Combo { value } => format!("combo({})", value),
            Self::MouseScroll {
                value: ScrollDirection::Up,
            } => "mouse_scroll(up)".to_string(),
            Self::MouseScroll {
                value: ScrollDirection::Down,
            } => "mouse_scroll(down)".to_string(),
            Self::MouseClick { button } => format!("mouse_click({:?})", button),
        }
    }
}
