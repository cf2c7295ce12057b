/// エラー型定義
///
/// Domain層の統一エラー型。thiserrorを使用して型安全なエラー処理を提供します。
///
/// # 設計方針
/// - unwrap()の使用を禁止し、明示的なエラーハンドリングを強制
/// - Result型でエラー伝播を明示化
/// - 回復方針をエラー種別で表現（Perceptionは中立状態へ退避、
///   Persistenceは直前のバインディングを維持、Executionはログのみ）

use thiserror::Error;

/// Domain層の統一エラー型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 知覚エラー（不完全なランドマーク列など）
    ///
    /// ジェスチャーコード0へ退避し、呼び出し側へは伝播させない。
    #[error("Perception error: {0}")]
    Perception(String),

    /// バインディングキャプチャ関連のエラー
    #[error("Capture error: {0}")]
    Capture(String),

    /// キャプチャセッションの中断（禁止キー・ユーザーキャンセル）
    ///
    /// レジストリは変更されない。
    #[error("Capture cancelled: {0}")]
    Cancelled(String),

    /// 永続化（設定ファイル）関連のエラー
    ///
    /// ペイロード全体を棄却し、メモリ上のバインディングを維持する。
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// アクション実行（OS入力注入）のエラー
    ///
    /// ログに記録して握りつぶす。クールダウンタイマーは更新される。
    #[error("Execution error: {0}")]
    Execution(String),

    /// 設定関連のエラー
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// その他のエラー
    #[error("Unexpected error: {0}")]
    Other(String),
}

/// Domain層の統一Result型
pub type DomainResult<T> = Result<T, DomainError>;
