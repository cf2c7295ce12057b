//! Infrastructure層: ポートの具象実装
//!
//! OS入力注入（enigo）、グローバル入力監視（rdev）、JSON永続化、
//! およびテスト用のモックアダプター。

pub mod enigo_executor;
pub mod json_settings;
pub mod mock_executor;
pub mod mock_pose;
pub mod rdev_input;
