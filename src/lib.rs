//! gesturemote: ハンドジェスチャーによるメディア操作パイプライン
//!
//! 手のランドマーク観測を指の本数（ジェスチャーコード0〜5）へ分類し、
//! 時間安定化を経て、バインドされたOS入力アクションを注入する。
//! バインディングはrawインプットの実演でキャプチャし、JSONで永続化する。
//!
//! # レイヤー構成（Clean Architecture）
//! - `domain`: コア型・ポートtrait・レジストリ・設定
//! - `application`: 分類・安定化・キャプチャ・セッションの各ユースケース
//! - `infrastructure`: enigo / rdev / JSONファイルの具象アダプターとモック

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod logging;
