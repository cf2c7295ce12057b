//! モックアクション実行アダプター（Infrastructure層）
//!
//! ActionExecutorポートのテスト実装。
//! OS入力を注入する代わりに実行された記述子を記録する。

use std::sync::{Arc, Mutex};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ports::ActionExecutor;
use crate::domain::types::ActionDescriptor;

/// 実行記録つきモック実行アダプター
///
/// Cloneで記録を共有するハンドルを作れる
/// （実体をランナーへムーブした後も観測できる）。
#[derive(Debug, Clone)]
pub struct RecordingExecutor {
    log: Arc<Mutex<Vec<ActionDescriptor>>>,
    fail: bool,
}

impl RecordingExecutor {
    /// 常に成功するモックを作成
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// 常に実行失敗を返すモックを作成（失敗経路のテスト用）
    pub fn failing() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    /// これまでに成功した実行記録のスナップショット
    pub fn executed(&self) -> Vec<ActionDescriptor> {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutor for RecordingExecutor {
    fn execute(&mut self, action: &ActionDescriptor) -> DomainResult<()> {
        if self.fail {
            tracing::debug!(action = %action.describe(), "Mock execution failing by design");
            return Err(DomainError::Execution(
                "mock executor configured to fail".to_string(),
            ));
        }

        tracing::debug!(action = %action.describe(), "Mock execution recorded");
        if let Ok(mut log) = self.log.lock() {
            log.push(action.clone());
        }
        Ok(())
    }
}
