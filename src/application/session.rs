//! 制御セッション（Application層）
//!
//! 知覚 → 分類 → 安定化 → 実行を結ぶ単一スレッドのフレームループ。
//! ポート（HandPoseSource / ActionExecutor）はDIで注入され、
//! 本番・テストどちらのアダプターでも同じループが動きます。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::classifier::GestureClassifier;
use crate::application::stabilizer::{GestureStabilizer, HandsFrame, StepOutcome};
use crate::domain::bindings::ActionRegistry;
use crate::domain::config::AppConfig;
use crate::domain::error::DomainError;
use crate::domain::ports::{ActionExecutor, HandPoseSource};

/// セッション終了理由
#[derive(Debug)]
pub enum SessionEnd {
    /// 両手保持ジェスチャーによるハンズフリー終了
    TwoHandExit,
    /// 外部からのキャンセル要求
    Cancelled,
    /// 観測ソースの失敗（カメラ切断等）
    SourceFailed(DomainError),
}

/// フレームループの統計情報
///
/// 定期的にログへ集計を出力する。フレームレートの劣化や
/// クールダウン抑制の頻度を運用時に確認するための数値。
#[derive(Debug)]
struct SessionStats {
    frames: u64,
    confirmations: u64,
    dispatches: u64,
    suppressed: u64,
    started: Instant,
    last_report: Instant,
    interval: Duration,
}

impl SessionStats {
    fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            frames: 0,
            confirmations: 0,
            dispatches: 0,
            suppressed: 0,
            started: now,
            last_report: now,
            interval,
        }
    }

    fn record(&mut self, outcome: &StepOutcome) {
        self.frames += 1;
        match outcome {
            StepOutcome::Dispatched(_) => {
                self.confirmations += 1;
                self.dispatches += 1;
            }
            StepOutcome::Confirmed(_) => {
                self.confirmations += 1;
                self.suppressed += 1;
            }
            StepOutcome::Idle | StepOutcome::ExitRequested => {}
        }
    }

    /// 出力間隔を超えていれば集計をログへ出す
    fn maybe_report(&mut self, now: Instant) {
        if self.interval.is_zero() || now.duration_since(self.last_report) < self.interval {
            return;
        }
        let elapsed = now.duration_since(self.started).as_secs_f64();
        let fps = if elapsed > 0.0 {
            self.frames as f64 / elapsed
        } else {
            0.0
        };
        tracing::info!(
            frames = self.frames,
            fps = format!("{:.1}", fps),
            confirmations = self.confirmations,
            dispatches = self.dispatches,
            suppressed = self.suppressed,
            "Session statistics"
        );
        self.last_report = now;
    }
}

/// 制御セッションランナー
///
/// `run` はいずれかの終了条件まで呼び出しスレッドをブロックする。
/// キャンセルは `cancel_handle` で取得したフラグを別スレッドから立てる。
pub struct SessionRunner<S: HandPoseSource, E: ActionExecutor> {
    source: S,
    executor: E,
    classifier: GestureClassifier,
    stabilizer: GestureStabilizer,
    registry: ActionRegistry,
    cancel: Arc<AtomicBool>,
    stats: SessionStats,
}

impl<S: HandPoseSource, E: ActionExecutor> SessionRunner<S, E> {
    /// ランナーを構築
    ///
    /// # Arguments
    /// - `config`: 分類・安定化・統計の設定
    /// - `registry`: 実行時に参照するバインディング
    /// - `source`: 手観測ソース
    /// - `executor`: アクション実行アダプター
    pub fn new(config: &AppConfig, registry: ActionRegistry, source: S, executor: E) -> Self {
        Self {
            source,
            executor,
            classifier: GestureClassifier::new(&config.classifier),
            stabilizer: GestureStabilizer::new(&config.stabilizer),
            registry,
            cancel: Arc::new(AtomicBool::new(false)),
            stats: SessionStats::new(config.session.stats_interval()),
        }
    }

    /// 外部からセッションを停止するためのフラグ
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// 現在のバインディング
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// バインディングを差し替える（キャプチャ完了後の反映用）
    pub fn replace_registry(&mut self, registry: ActionRegistry) {
        self.registry = registry;
        // 差し替え直後の誤発火を避けるため中立状態へ戻す
        self.stabilizer.reset();
    }

    /// フレームループを実行する
    ///
    /// フレーム内の処理順は固定: 観測 → 分類 → 安定化 → （必要なら）実行。
    /// 実行失敗はセッションを止めない。観測失敗はセッション終了条件。
    pub fn run(&mut self) -> SessionEnd {
        tracing::info!("Control session started");

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                tracing::info!("Control session cancelled");
                return SessionEnd::Cancelled;
            }

            let observations = match self.source.observe() {
                Ok(observations) => observations,
                Err(e) => {
                    tracing::error!(error = %e, "Hand pose source failed, ending session");
                    return SessionEnd::SourceFailed(e);
                }
            };

            let now = Instant::now();
            let frame = match observations.len() {
                0 => HandsFrame::None,
                1 => HandsFrame::One(self.classifier.classify(&observations[0])),
                // 3以上はトラッキング設定上発生しないが、両手と同等に扱う
                _ => HandsFrame::Two,
            };

            let outcome = self
                .stabilizer
                .step(frame, now, &self.registry, &mut self.executor);
            self.stats.record(&outcome);

            if outcome == StepOutcome::ExitRequested {
                tracing::info!("Control session ended by two-hand hold");
                return SessionEnd::TwoHandExit;
            }

            self.stats.maybe_report(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ActionDescriptor, Handedness};
    use crate::infrastructure::mock_executor::RecordingExecutor;
    use crate::infrastructure::mock_pose::{posed_hand, ScriptedPoseSource};

    /// テスト用の短い時定数（フレーム間隔5msに対して十分小さい）
    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.stabilizer.dwell_ms = 1;
        config.stabilizer.cooldown_ms = 1;
        config.stabilizer.exit_hold_ms = 20;
        config
    }

    fn three_fingers() -> Vec<crate::domain::types::HandObservation> {
        vec![posed_hand(
            [false, true, true, true, false],
            Handedness::Right,
        )]
    }

    fn two_hands() -> Vec<crate::domain::types::HandObservation> {
        vec![
            posed_hand([true; 5], Handedness::Left),
            posed_hand([true; 5], Handedness::Right),
        ]
    }

    #[test]
    fn test_dispatch_through_full_loop() {
        let mut registry = ActionRegistry::new();
        registry.bind(
            3,
            ActionDescriptor::Key {
                value: "space".to_string(),
            },
        );

        // 3本指を4フレーム見せてからスクリプト枯渇でソース失敗
        let source = ScriptedPoseSource::with_interval(
            vec![three_fingers(), three_fingers(), three_fingers(), three_fingers()],
            Duration::from_millis(5),
        );
        let executor = RecordingExecutor::new();
        let probe = executor.clone();
        let mut runner = SessionRunner::new(&fast_config(), registry, source, executor);

        let end = runner.run();
        assert!(matches!(end, SessionEnd::SourceFailed(_)));

        // 保持時間を満たした1回だけ実行されている
        assert_eq!(
            probe.executed(),
            vec![ActionDescriptor::Key {
                value: "space".to_string()
            }]
        );
    }

    #[test]
    fn test_two_hand_hold_ends_session() {
        let frames: Vec<_> = (0..10).map(|_| two_hands()).collect();
        let source = ScriptedPoseSource::with_interval(frames, Duration::from_millis(5));
        let executor = RecordingExecutor::new();
        let mut runner =
            SessionRunner::new(&fast_config(), ActionRegistry::new(), source, executor);

        let end = runner.run();
        assert!(matches!(end, SessionEnd::TwoHandExit));
    }

    #[test]
    fn test_cancel_flag_stops_session() {
        let source = ScriptedPoseSource::with_interval(
            vec![three_fingers(); 100],
            Duration::from_millis(5),
        );
        let executor = RecordingExecutor::new();
        let mut runner =
            SessionRunner::new(&fast_config(), ActionRegistry::new(), source, executor);

        runner.cancel_handle().store(true, Ordering::Relaxed);
        let end = runner.run();
        assert!(matches!(end, SessionEnd::Cancelled));
    }
}
