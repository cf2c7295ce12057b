//! ジェスチャー安定化（Application層）
//!
//! フレームごとの分類結果を時間軸で安定化する状態機械。
//! 同一の読み値が最小保持時間continuousに続いた時だけ確定イベントを発火し、
//! クールダウンで再発火を抑制し、両手保持タイマーでセッション終了を通知する。
//!
//! # 状態
//! - `IDLE`: 追跡中の読み値なし
//! - `ARMED`: 新しい読み値を観測、保持タイマー進行中
//! - `FIRED`: 読み値を確定済み（コード変化まで再発火しない）

use std::time::{Duration, Instant};

use crate::domain::bindings::ActionRegistry;
use crate::domain::config::StabilizerConfig;
use crate::domain::ports::ActionExecutor;
use crate::domain::types::{GESTURE_CODE_MAX, GESTURE_CODE_MIN};

/// 1フレーム分の手の検出状況
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandsFrame {
    /// 手なし（ジェスチャーコード0として扱う）
    None,
    /// 片手（分類済みジェスチャーコード）
    One(u8),
    /// 両手（片手追跡を中断し、終了タイマーを進める）
    Two,
}

/// 1フレーム評価の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// 状態変化なし、または発火条件未達
    Idle,
    /// 両手保持タイマー満了（セッション終了要求、連続保持につき1回のみ）
    ExitRequested,
    /// ジェスチャー確定＋アクション注入を実施
    Dispatched(u8),
    /// ジェスチャー確定したがアクションなし（未バインド・クールダウン中・コード0）
    Confirmed(u8),
}

/// 時間安定化状態機械
///
/// 単一フレームループから毎フレーム `step` を呼び出す。
/// 分類器エラー（コード0）は「手なし」と同等に中立状態へ退避する。
#[derive(Debug)]
pub struct GestureStabilizer {
    dwell: Duration,
    cooldown: Duration,
    exit_hold: Duration,
    /// 追跡中の読み値（None = 起動直後・両手による中断後）
    tracked_code: Option<u8>,
    /// ARMED状態の開始時刻（None = 未アーム or 発火済み）
    armed_at: Option<Instant>,
    /// 最後にディスパッチした時刻
    last_dispatch: Option<Instant>,
    /// 両手検出の開始時刻（None = 現在両手ではない）
    two_hands_since: Option<Instant>,
    /// 今回の連続両手保持で終了通知済みか
    exit_signalled: bool,
}

impl GestureStabilizer {
    /// 設定から状態機械を作成
    pub fn new(config: &StabilizerConfig) -> Self {
        Self {
            dwell: config.dwell(),
            cooldown: config.cooldown(),
            exit_hold: config.exit_hold(),
            tracked_code: None,
            armed_at: None,
            last_dispatch: None,
            two_hands_since: None,
            exit_signalled: false,
        }
    }

    /// 1フレーム分の遷移を評価する
    ///
    /// フレーム内の順序保証: 分類 → 安定化 → ディスパッチ。
    /// ディスパッチはこの呼び出しの内部で同期的に完了する。
    pub fn step(
        &mut self,
        frame: HandsFrame,
        now: Instant,
        registry: &ActionRegistry,
        executor: &mut dyn ActionExecutor,
    ) -> StepOutcome {
        match frame {
            HandsFrame::Two => {
                // 片手追跡を中断（復帰時は再アームから始まる）
                self.tracked_code = None;
                self.armed_at = None;

                let since = *self.two_hands_since.get_or_insert(now);
                if now.duration_since(since) >= self.exit_hold && !self.exit_signalled {
                    self.exit_signalled = true;
                    tracing::info!(
                        held_secs = self.exit_hold.as_secs_f64(),
                        "Two-hand hold complete, requesting session exit"
                    );
                    return StepOutcome::ExitRequested;
                }
                StepOutcome::Idle
            }
            HandsFrame::One(code) => {
                // 両手タイマーは両手でなくなった瞬間にゼロへ戻る
                self.two_hands_since = None;
                self.exit_signalled = false;

                if self.tracked_code != Some(code) {
                    self.tracked_code = Some(code);
                    self.armed_at = Some(now);
                    return StepOutcome::Idle;
                }

                match self.armed_at {
                    Some(armed_at) if now.duration_since(armed_at) > self.dwell => {
                        // FIRED: このアーミングで一度だけ確定イベントを出す
                        self.armed_at = None;
                        self.dispatch(code, now, registry, executor)
                    }
                    _ => StepOutcome::Idle,
                }
            }
            HandsFrame::None => {
                self.two_hands_since = None;
                self.exit_signalled = false;

                // コード0として扱う。0自体はアクション対象外のためアームしない
                if self.tracked_code != Some(0) {
                    self.tracked_code = Some(0);
                    self.armed_at = None;
                }
                StepOutcome::Idle
            }
        }
    }

    /// 確定したジェスチャーのディスパッチ段
    ///
    /// 未バインド・クールダウン中でも発火済み扱いになる
    /// （コード変化まで再評価しない）。
    fn dispatch(
        &mut self,
        code: u8,
        now: Instant,
        registry: &ActionRegistry,
        executor: &mut dyn ActionExecutor,
    ) -> StepOutcome {
        if !(GESTURE_CODE_MIN..=GESTURE_CODE_MAX).contains(&code) {
            return StepOutcome::Confirmed(code);
        }

        let Some(action) = registry.resolve(code) else {
            tracing::debug!(gesture = code, "Confirmed gesture has no binding");
            return StepOutcome::Confirmed(code);
        };

        if let Some(last) = self.last_dispatch {
            if now.duration_since(last) <= self.cooldown {
                tracing::debug!(gesture = code, "Dispatch suppressed by cooldown");
                return StepOutcome::Confirmed(code);
            }
        }

        tracing::info!(gesture = code, action = %action.describe(), "Dispatching action");
        if let Err(e) = executor.execute(action) {
            // 実行失敗はログのみ。クールダウンは更新してリトライストームを防ぐ
            tracing::warn!(gesture = code, error = %e, "Action execution failed");
        }
        self.last_dispatch = Some(now);
        StepOutcome::Dispatched(code)
    }

    /// 中立状態へ戻す（再設定時に使用）
    pub fn reset(&mut self) {
        self.tracked_code = None;
        self.armed_at = None;
        self.last_dispatch = None;
        self.two_hands_since = None;
        self.exit_signalled = false;
    }
}
