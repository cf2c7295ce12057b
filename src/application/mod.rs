//! Application層: ユースケースの実装
//!
//! Domain層のポートを組み合わせて、分類・安定化・キャプチャ・セッションの
//! 各ユースケースを実現する。Infrastructureの具象型には依存しない。

pub mod capture;
pub mod classifier;
pub mod session;
pub mod stabilizer;
