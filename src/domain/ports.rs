/// Port定義（Clean Architectureのインターフェース）
///
/// Domain層が外部実装に依存するための抽象trait。
/// Infrastructure層がこれらを実装し、Application層がDIで注入する。

use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::bindings::ActionRegistry;
use crate::domain::error::DomainResult;
use crate::domain::types::{ActionDescriptor, HandObservation, MouseButton};

/// 手姿勢ポート: フレームごとの手観測の取得を抽象化
///
/// カメラ＋ハンドトラッキングの実体は外部コラボレーターであり、
/// ここでは再実装しない。
pub trait HandPoseSource: Send {
    /// 1フレーム分の観測を取得する（ブロッキング）
    ///
    /// # Returns
    /// - `Ok(observations)`: 長さ0〜2の観測リスト
    /// - `Err(DomainError)`: フレーム取得失敗（セッション終了条件）
    fn observe(&mut self) -> DomainResult<Vec<HandObservation>>;
}

/// アクション実行ポート: OS入力注入を抽象化
pub trait ActionExecutor: Send {
    /// 記述子に対応する入力イベントを注入する
    ///
    /// - `key`: 単一キーの押下・解放
    /// - `combo`: 全キーを順に押下し、逆順に解放
    /// - `mouse_scroll`: 固定量のスクロールティック1回
    /// - `mouse_click`: 指定ボタンの押下・解放1回
    ///
    /// # Returns
    /// - `Err(DomainError::Execution)`: 注入失敗。呼び出し側はログのみで継続する。
    fn execute(&mut self, action: &ActionDescriptor) -> DomainResult<()>;
}

/// 設定ストアポート: バインディングの永続化を抽象化
pub trait SettingsStore {
    /// 永続化されたバインディングを読み込む
    ///
    /// ファイル不在は空のレジストリとして扱う。
    fn load(&self) -> DomainResult<ActionRegistry>;

    /// バインディングを永続化する
    fn save(&self, registry: &ActionRegistry) -> DomainResult<()>;
}

/// rawインプットイベント
///
/// キャプチャモード中のみ購読される、正規化前の生イベント。
/// キー名の正規化はApplication層（capture）の責務。
#[derive(Debug, Clone, PartialEq)]
pub enum RawInputEvent {
    /// キー押下（nameはプラットフォーム由来のキー名）
    KeyDown { key: String },
    /// キー解放
    KeyUp { key: String },
    /// スクロール（正=上方向）
    Scroll { delta: i64 },
    /// マウスボタン押下（座標はスクリーン座標）
    ButtonPress { button: MouseButton, x: f64, y: f64 },
}

/// rawインプット購読（有界ライフタイム）
///
/// キャプチャセッション開始時に取得し、Dropで確実に配信を停止する。
/// セッション外でリスナーが入力を横取りし続けないための契約。
pub struct RawInputSubscription {
    rx: Receiver<RawInputEvent>,
    active: Arc<AtomicBool>,
}

impl RawInputSubscription {
    /// 新しい購読を作成
    ///
    /// # Arguments
    /// - `rx`: リスナースレッドからのイベント受信側
    /// - `active`: リスナー側と共有する配信フラグ（Dropでfalseに落とす）
    pub fn new(rx: Receiver<RawInputEvent>, active: Arc<AtomicBool>) -> Self {
        Self { rx, active }
    }

    /// 次のイベントをタイムアウト付きで待つ
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RawInputEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// 購読が配信中か
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

impl Drop for RawInputSubscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Relaxed);
    }
}

/// rawインプットソースポート: グローバル入力監視を抽象化
pub trait RawInputSource {
    /// キーボード・マウスの監視を開始する
    ///
    /// # Returns
    /// - `Ok(subscription)`: イベント購読。Dropで配信停止。
    fn subscribe(&mut self) -> DomainResult<RawInputSubscription>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_subscription_drop_deactivates() {
        let (tx, rx) = bounded(8);
        let active = Arc::new(AtomicBool::new(true));
        let subscription = RawInputSubscription::new(rx, Arc::clone(&active));

        tx.send(RawInputEvent::Scroll { delta: 1 }).unwrap();
        assert_eq!(
            subscription.recv_timeout(Duration::from_millis(10)),
            Some(RawInputEvent::Scroll { delta: 1 })
        );
        assert!(subscription.is_active());

        drop(subscription);
        assert!(!active.load(Ordering::Relaxed));
    }

    #[test]
    fn test_recv_timeout_on_empty_channel() {
        let (_tx, rx) = bounded::<RawInputEvent>(8);
        let subscription = RawInputSubscription::new(rx, Arc::new(AtomicBool::new(true)));
        assert!(subscription.recv_timeout(Duration::from_millis(5)).is_none());
    }
}
