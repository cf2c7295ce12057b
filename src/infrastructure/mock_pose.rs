//! モック手姿勢アダプター（Infrastructure層）
//!
//! HandPoseSourceポートのテスト実装。
//! 実カメラ・ハンドトラッキングなしで分類器とセッションループを検証する。

use std::collections::VecDeque;
use std::time::Duration;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ports::HandPoseSource;
use crate::domain::types::{
    landmark_index as idx, HandObservation, Handedness, Landmark, LANDMARK_COUNT,
};

/// 指定した指の伸展パターンを持つ合成観測を生成する
///
/// デフォルト分類器設定で意図どおりに分類される既知のジオメトリを組む。
/// 手首〜中指MCPのY距離は0.3（垂直閾値 約0.107）、手のひら幅は0.24
/// （親指閾値 0.072）になる。
///
/// # Arguments
/// - `fingers`: [親指, 人差し指, 中指, 薬指, 小指] の伸展フラグ
/// - `handedness`: 物理的な手の左右（親指の伸展方向が反転する）
pub fn posed_hand(fingers: [bool; 5], handedness: Handedness) -> HandObservation {
    // 判定に関与しない点は手のひら中央付近の充填値
    let mut landmarks = vec![Landmark::new(0.5, 0.7); LANDMARK_COUNT];

    landmarks[idx::WRIST] = Landmark::new(0.5, 0.9);

    // 非親指4本: MCPを一列に並べ、伸展ならTIPを大きく上へ
    let bases = [
        (idx::INDEX_MCP, idx::INDEX_TIP, 0.38),
        (idx::MIDDLE_MCP, idx::MIDDLE_TIP, 0.46),
        (idx::RING_MCP, idx::RING_TIP, 0.54),
        (idx::PINKY_MCP, idx::PINKY_TIP, 0.62),
    ];
    for (i, (mcp, tip, x)) in bases.iter().enumerate() {
        landmarks[*mcp] = Landmark::new(*x, 0.6);
        let tip_y = if fingers[i + 1] { 0.4 } else { 0.58 };
        landmarks[*tip] = Landmark::new(*x, tip_y);
    }

    // 親指: 水平方向の変位で表現。物理左手は画面上で右へ伸びる
    landmarks[idx::THUMB_MCP] = Landmark::new(0.30, 0.75);
    let thumb_delta = if fingers[0] { 0.12 } else { 0.01 };
    let tip_x = match handedness {
        Handedness::Left => 0.30 + thumb_delta,
        Handedness::Right => 0.30 - thumb_delta,
        Handedness::Unknown => 0.30 + thumb_delta,
    };
    landmarks[idx::THUMB_TIP] = Landmark::new(tip_x, 0.72);

    HandObservation::new(landmarks, handedness)
}

/// 事前に組んだフレーム列を順に返すHandPoseSource実装
///
/// フレーム間隔を指定するとカメラのペーシングを模擬できる
/// （時間依存の安定化ロジックをテストするため）。
/// スクリプトが尽きると知覚エラーを返し、セッション終了を誘発する。
pub struct ScriptedPoseSource {
    frames: VecDeque<Vec<HandObservation>>,
    interval: Duration,
}

impl ScriptedPoseSource {
    /// フレーム列からソースを作成（間隔なし）
    pub fn new(frames: Vec<Vec<HandObservation>>) -> Self {
        Self::with_interval(frames, Duration::ZERO)
    }

    /// フレーム間隔付きでソースを作成
    pub fn with_interval(frames: Vec<Vec<HandObservation>>, interval: Duration) -> Self {
        Self {
            frames: frames.into(),
            interval,
        }
    }
}

impl HandPoseSource for ScriptedPoseSource {
    fn observe(&mut self) -> DomainResult<Vec<HandObservation>> {
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        self.frames
            .pop_front()
            .ok_or_else(|| DomainError::Perception("scripted frames exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posed_hand_is_complete() {
        let hand = posed_hand([true; 5], Handedness::Left);
        assert!(hand.is_complete());
        assert_eq!(hand.handedness, Handedness::Left);
    }

    #[test]
    fn test_scripted_source_drains_then_fails() {
        let mut source = ScriptedPoseSource::new(vec![
            vec![posed_hand([false; 5], Handedness::Left)],
            vec![],
        ]);

        assert_eq!(source.observe().unwrap().len(), 1);
        assert_eq!(source.observe().unwrap().len(), 0);
        assert!(matches!(
            source.observe(),
            Err(DomainError::Perception(_))
        ));
    }
}
