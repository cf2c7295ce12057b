//! ジェスチャー分類器（Application層）
//!
//! 片手の観測から伸びている指の本数（ジェスチャーコード0〜5）を導出します。
//! フレームごとに閾値を手の見かけサイズから再計算するため、
//! カメラまでの距離に依存しません。

use crate::domain::config::ClassifierConfig;
use crate::domain::types::{landmark_index as idx, HandObservation, Handedness};

/// 指の本数分類器
///
/// 非親指4本は垂直（Y軸）分離、親指は左右ラベルに応じた水平（X軸）分離で
/// 伸展を判定する。ラベルがUnknownの場合、親指はカウントしない。
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    vertical_divisor: f32,
    thumb_width_fraction: f32,
}

/// (MCPインデックス, TIPインデックス) の非親指4本分のペア
const FINGER_PAIRS: [(usize, usize); 4] = [
    (idx::INDEX_MCP, idx::INDEX_TIP),
    (idx::MIDDLE_MCP, idx::MIDDLE_TIP),
    (idx::RING_MCP, idx::RING_TIP),
    (idx::PINKY_MCP, idx::PINKY_TIP),
];

impl GestureClassifier {
    /// 設定から分類器を作成
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            vertical_divisor: config.vertical_divisor,
            thumb_width_fraction: config.thumb_width_fraction,
        }
    }

    /// 観測をジェスチャーコード（0〜5）へ分類する
    ///
    /// ランドマークが不足している観測は知覚エラーとして扱い、
    /// コード0を返す（呼び出し側へ例外は伝播させない）。
    pub fn classify(&self, observation: &HandObservation) -> u8 {
        if !observation.is_complete() {
            tracing::warn!(
                landmarks = observation.landmarks.len(),
                "Incomplete landmark set, degrading to gesture code 0"
            );
            return 0;
        }

        // is_complete検証済みのためインデックスアクセスは安全
        let lm = |i: usize| observation.landmarks[i];

        let mut count = 0u8;

        // 垂直閾値: 手首〜中指MCPのY距離を手のサイズの代理とする
        let vertical_thresh = (lm(idx::WRIST).y - lm(idx::MIDDLE_MCP).y).abs() / self.vertical_divisor;

        // Y軸は下向きが正のため、指が上に伸びると TIP.y < MCP.y
        for (mcp, tip) in FINGER_PAIRS {
            if lm(mcp).y - lm(tip).y > vertical_thresh {
                count += 1;
            }
        }

        // 親指は水平軸で判定。閾値は手のひら幅（人差し指MCP〜小指MCPのX距離）基準
        let palm_width = (lm(idx::INDEX_MCP).x - lm(idx::PINKY_MCP).x).abs();
        let thumb_thresh = palm_width * self.thumb_width_fraction;

        let thumb_delta = lm(idx::THUMB_TIP).x - lm(idx::THUMB_MCP).x;
        let thumb_extended = match observation.handedness {
            // 物理左手: 反転画像上で伸びた親指は右へ動く
            Handedness::Left => thumb_delta > thumb_thresh,
            // 物理右手: 左右対称のテスト
            Handedness::Right => -thumb_delta > thumb_thresh,
            // ラベル不明時は親指をカウントしない
            Handedness::Unknown => false,
        };
        if thumb_extended {
            count += 1;
        }

        count
    }
}
