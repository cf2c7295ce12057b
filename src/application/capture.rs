//! バインディングキャプチャ（Application層）
//!
//! ユーザーがrawインプットを実演して新しいバインディングを教えるモード。
//! キャプチャ中だけrawリスナーを購読し、3種類のコミット経路のいずれかで
//! アクション記述子を組み立ててレジストリへ適用します。
//!
//! # 状態
//! `INACTIVE → CAPTURING → {COMMITTED | CANCELLED}`
//!
//! いずれの終了経路でも購読（RawInputSubscription）はDropで停止する。

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::domain::bindings::ActionRegistry;
use crate::domain::error::DomainResult;
use crate::domain::ports::{RawInputEvent, RawInputSource};
use crate::domain::types::{
    ActionDescriptor, ScrollDirection, GESTURE_CODE_MAX, GESTURE_CODE_MIN,
};

/// 修飾キーの固定優先順（combo整形で先頭に並ぶ）
const MODIFIER_PRECEDENCE: [&str; 5] = ["ctrl", "alt", "shift", "tab", "enter"];

/// イベント待ちのポーリング間隔
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// キー名正規化の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyNormalization {
    /// バインディングに使用できる正規化済みキー名
    Accepted(String),
    /// 禁止修飾キー（super/meta/cmd系）。セッションを中断する
    Forbidden(String),
}

/// rawキー名を正規化する
///
/// - 英字は小文字化
/// - メイン行・テンキーの数字は同一の "0".."9" へ
/// - ctrl/shift/altの左右バリアントは正規名へ集約
/// - super/meta/cmd系は禁止（バインディングには決して入らない）
pub fn normalize_key(raw: &str) -> KeyNormalization {
    let lower = raw.trim().to_lowercase();

    // 修飾キーの左右バリアント集約（"ControlLeft"・"ctrl_r" 等）
    if lower.contains("ctrl") || lower.contains("control") {
        return KeyNormalization::Accepted("ctrl".to_string());
    }
    if lower.contains("shift") {
        return KeyNormalization::Accepted("shift".to_string());
    }
    if lower.contains("alt") {
        return KeyNormalization::Accepted("alt".to_string());
    }

    // プラットフォームのsuper/meta/cmdキーは受け付けない
    let forbidden = ["meta", "cmd", "super", "win", "windows", "command"];
    if forbidden
        .iter()
        .any(|f| lower == *f || lower.starts_with(&format!("{}_", f)) || lower.starts_with(&format!("{}l", f)) || lower.starts_with(&format!("{}r", f)))
    {
        return KeyNormalization::Forbidden(lower);
    }

    // テンキー数字の正規化（"kp5" / "num5" / "numpad5" → "5"）
    for prefix in ["numpad", "num", "kp"] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            if rest.len() == 1 && rest.chars().all(|c| c.is_ascii_digit()) {
                return KeyNormalization::Accepted(rest.to_string());
            }
        }
    }

    KeyNormalization::Accepted(lower)
}

/// 保持キー集合を正規形へ整形する
///
/// 修飾キーを固定優先順で先頭に、残りをアルファベット順に並べて '+' で連結。
/// 押下順が違っても論理的に同じコードは同一の文字列になる
/// （競合検出にバイト同一性が必要なため）。
pub fn format_combo(keys: &BTreeSet<String>) -> String {
    let mut special: Vec<&String> = Vec::new();
    let mut regular: Vec<&String> = Vec::new();

    for key in keys {
        if MODIFIER_PRECEDENCE.contains(&key.as_str()) {
            special.push(key);
        } else {
            regular.push(key);
        }
    }

    special.sort_by_key(|k| {
        MODIFIER_PRECEDENCE
            .iter()
            .position(|m| m == &k.as_str())
            .unwrap_or(usize::MAX)
    });
    regular.sort();

    special
        .into_iter()
        .chain(regular)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("+")
}

/// クリック除外領域（スクリーン座標）
///
/// バインド操作用UIコントロール上のクリックが
/// バインディングとして記録されないようにする。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReservedRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ReservedRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 座標が領域内か判定
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// キャプチャセッションの終了形
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// 記述子が確定した
    Committed(ActionDescriptor),
    /// セッション中断（禁止キー等）。レジストリは変更しない
    Cancelled(String),
}

/// キャプチャセッション（CAPTURING状態の実体）
///
/// 1つのジェスチャーコードに対する短命の状態。
/// 成功・キャンセル・中断のいずれでも破棄される。
#[derive(Debug)]
pub struct CaptureSession {
    gesture: u8,
    held: BTreeSet<String>,
    reserved: Vec<ReservedRegion>,
    finished: bool,
}

impl CaptureSession {
    /// ジェスチャーコードgのキャプチャを開始
    pub fn new(gesture: u8, reserved: Vec<ReservedRegion>) -> Self {
        debug_assert!(
            (GESTURE_CODE_MIN..=GESTURE_CODE_MAX).contains(&gesture),
            "gesture code out of range: {}",
            gesture
        );
        Self {
            gesture,
            held: BTreeSet::new(),
            reserved,
            finished: false,
        }
    }

    /// 対象のジェスチャーコード
    pub fn gesture(&self) -> u8 {
        self.gesture
    }

    /// rawイベントを1件処理する
    ///
    /// # Returns
    /// - `Some(outcome)`: セッション終了（コミットまたはキャンセル）
    /// - `None`: キャプチャ継続
    pub fn handle(&mut self, event: &RawInputEvent) -> Option<CaptureOutcome> {
        if self.finished {
            return None;
        }

        let outcome = match event {
            RawInputEvent::KeyDown { key } => match normalize_key(key) {
                KeyNormalization::Accepted(name) => {
                    self.held.insert(name);
                    None
                }
                KeyNormalization::Forbidden(name) => {
                    tracing::warn!(gesture = self.gesture, key = %name, "Forbidden modifier pressed, cancelling capture");
                    Some(CaptureOutcome::Cancelled(format!(
                        "forbidden key: {}",
                        name
                    )))
                }
            },
            RawInputEvent::KeyUp { .. } => {
                if self.held.is_empty() {
                    // 有効なキーが捕捉される前の解放は無視
                    tracing::debug!(gesture = self.gesture, "Key released with empty held set");
                    None
                } else if self.held.len() == 1 {
                    let value = self
                        .held
                        .iter()
                        .next()
                        .cloned()
                        .unwrap_or_default();
                    Some(CaptureOutcome::Committed(ActionDescriptor::Key { value }))
                } else {
                    Some(CaptureOutcome::Committed(ActionDescriptor::Combo {
                        value: format_combo(&self.held),
                    }))
                }
            }
            RawInputEvent::Scroll { delta } => {
                if *delta == 0 {
                    None
                } else {
                    let value = if *delta > 0 {
                        ScrollDirection::Up
                    } else {
                        ScrollDirection::Down
                    };
                    Some(CaptureOutcome::Committed(ActionDescriptor::MouseScroll {
                        value,
                    }))
                }
            }
            RawInputEvent::ButtonPress { button, x, y } => {
                if self.reserved.iter().any(|region| region.contains(*x, *y)) {
                    // バインドボタン自身へのクリックは記録しない
                    None
                } else {
                    Some(CaptureOutcome::Committed(ActionDescriptor::MouseClick {
                        button: *button,
                    }))
                }
            }
        };

        if outcome.is_some() {
            self.finished = true;
            self.held.clear();
        }
        outcome
    }
}

/// キャプチャの最終結果
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureResult {
    /// バインディング適用済み
    Bound {
        gesture: u8,
        action: ActionDescriptor,
        /// 競合解除で未設定に戻されたコード（フロントエンドの表示更新用）
        cleared: Option<u8>,
    },
    /// キャンセル（レジストリ変更なし）
    Cancelled { reason: String },
}

/// キャプチャモードを実行する
///
/// rawリスナーを購読し、セッションが終了するまでイベントを処理する。
/// コミット時は競合解除ルールつきでレジストリへ適用する。
/// 購読はこの関数のすべての復帰経路でDropにより停止する。
///
/// # Arguments
/// - `gesture`: バインド対象のジェスチャーコード（1..=5）
/// - `registry`: 適用先レジストリ
/// - `input`: rawインプットソース
/// - `reserved`: クリック除外領域
/// - `deadline`: 入力が来ない場合の待ち合わせ上限
pub fn run_capture(
    gesture: u8,
    registry: &mut ActionRegistry,
    input: &mut dyn RawInputSource,
    reserved: &[ReservedRegion],
    deadline: Duration,
) -> DomainResult<CaptureResult> {
    let subscription = input.subscribe()?;
    let mut session = CaptureSession::new(gesture, reserved.to_vec());
    let started = Instant::now();

    tracing::info!(gesture, "Capture mode entered");

    loop {
        if started.elapsed() >= deadline {
            tracing::warn!(gesture, "Capture timed out without input");
            return Ok(CaptureResult::Cancelled {
                reason: "capture timed out".to_string(),
            });
        }

        let Some(event) = subscription.recv_timeout(POLL_INTERVAL) else {
            continue;
        };

        if let Some(outcome) = session.handle(&event) {
            return Ok(match outcome {
                CaptureOutcome::Committed(action) => {
                    let cleared = registry.bind(gesture, action.clone());
                    if let Some(previous) = cleared {
                        tracing::info!(
                            gesture,
                            previous,
                            "Binding conflict resolved, previous owner unbound"
                        );
                    }
                    tracing::info!(gesture, action = %action.describe(), "Binding committed");
                    CaptureResult::Bound {
                        gesture,
                        action,
                        cleared,
                    }
                }
                CaptureOutcome::Cancelled(reason) => {
                    tracing::info!(gesture, %reason, "Capture cancelled");
                    CaptureResult::Cancelled { reason }
                }
            });
        }
    }
}
