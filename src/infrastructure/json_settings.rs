//! JSONバインディングストア（Infrastructure層）
//!
//! SettingsStoreポートのファイル実装。
//! ジェスチャーコードを文字列キー "1".."5" とするJSONオブジェクトで永続化する。
//!
//! # 回復方針
//! - 通常ロード: エントリ単位で寛容（壊れたエントリは未設定として継続）
//! - インポート: ペイロード単位で厳格（1つでも不正なら全体を棄却）

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::domain::bindings::ActionRegistry;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ports::SettingsStore;
use crate::domain::types::{ActionDescriptor, GESTURE_CODE_MAX, GESTURE_CODE_MIN};

/// JSONファイルに永続化するバインディングストア
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// 指定パスのストアを作成
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// レジストリをJSONオブジェクトへ変換
    ///
    /// 全コードをキーとして出力し、未設定は null で表す
    /// （エクスポートしたファイルがそのままインポート可能になる）。
    fn to_json(registry: &ActionRegistry) -> DomainResult<Value> {
        let mut map = Map::new();
        for (code, slot) in registry.entries() {
            let value = match slot {
                Some(action) => serde_json::to_value(action).map_err(|e| {
                    DomainError::Persistence(format!("Failed to serialize binding: {}", e))
                })?,
                None => Value::Null,
            };
            map.insert(code.to_string(), value);
        }
        Ok(Value::Object(map))
    }

    /// JSONオブジェクトを厳格に検証してレジストリへ変換
    ///
    /// 全コードのキーが揃い、未知キーがなく、全エントリが
    /// 妥当な記述子（または null）であることを要求する。
    fn from_json_strict(value: &Value) -> DomainResult<ActionRegistry> {
        let map = value
            .as_object()
            .ok_or_else(|| DomainError::Persistence("Payload is not a JSON object".to_string()))?;

        for key in map.keys() {
            let valid = key
                .parse::<u8>()
                .map(|code| (GESTURE_CODE_MIN..=GESTURE_CODE_MAX).contains(&code))
                .unwrap_or(false);
            if !valid {
                return Err(DomainError::Persistence(format!(
                    "Unknown gesture key: {:?}",
                    key
                )));
            }
        }

        let mut registry = ActionRegistry::new();
        for code in GESTURE_CODE_MIN..=GESTURE_CODE_MAX {
            let entry = map.get(&code.to_string()).ok_or_else(|| {
                DomainError::Persistence(format!("Missing gesture key: {}", code))
            })?;
            if entry.is_null() {
                continue;
            }
            let action: ActionDescriptor = serde_json::from_value(entry.clone()).map_err(|e| {
                DomainError::Persistence(format!("Invalid binding for gesture {}: {}", code, e))
            })?;
            registry.bind(code, action);
        }
        Ok(registry)
    }

    /// JSONオブジェクトをエントリ単位で寛容にレジストリへ変換
    fn from_json_lenient(value: &Value) -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        let Some(map) = value.as_object() else {
            tracing::warn!("Bindings payload is not a JSON object, starting unbound");
            return registry;
        };

        for (key, entry) in map {
            let Ok(code) = key.parse::<u8>() else {
                tracing::warn!(key = %key, "Ignoring non-numeric gesture key");
                continue;
            };
            if !(GESTURE_CODE_MIN..=GESTURE_CODE_MAX).contains(&code) {
                tracing::warn!(code, "Ignoring out-of-range gesture key");
                continue;
            }
            if entry.is_null() {
                continue;
            }
            match serde_json::from_value::<ActionDescriptor>(entry.clone()) {
                Ok(action) => {
                    registry.bind(code, action);
                }
                Err(e) => {
                    // 壊れたエントリだけ未設定のまま継続する
                    tracing::warn!(code, error = %e, "Ignoring invalid binding entry");
                }
            }
        }
        registry
    }

    /// レジストリを指定パスへ書き出す（エクスポート）
    pub fn export_to<P: AsRef<Path>>(path: P, registry: &ActionRegistry) -> DomainResult<()> {
        let json = Self::to_json(registry)?;
        let content = serde_json::to_string_pretty(&json).map_err(|e| {
            DomainError::Persistence(format!("Failed to serialize bindings: {}", e))
        })?;
        write_atomic(path.as_ref(), &content)
    }

    /// 指定パスのファイルを厳格に検証して読み込む（インポート）
    ///
    /// 検証に失敗した場合はレジストリを一切変更せずエラーを返す。
    /// 成功時のみ呼び出し側が `ActionRegistry::replace` で反映する。
    pub fn import_from<P: AsRef<Path>>(path: P) -> DomainResult<ActionRegistry> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DomainError::Persistence(format!("Failed to read import file: {}", e))
        })?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| DomainError::Persistence(format!("Import file is not JSON: {}", e)))?;
        Self::from_json_strict(&value)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> DomainResult<ActionRegistry> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "No bindings file, starting unbound");
            return Ok(ActionRegistry::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            DomainError::Persistence(format!("Failed to read bindings file: {}", e))
        })?;

        match serde_json::from_str::<Value>(&content) {
            Ok(value) => {
                let registry = Self::from_json_lenient(&value);
                tracing::info!(
                    path = %self.path.display(),
                    bound = registry.bound_codes().count(),
                    "Bindings loaded"
                );
                Ok(registry)
            }
            Err(e) => {
                // ファイル全体が壊れている場合も起動は継続する
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Bindings file is corrupt, starting unbound"
                );
                Ok(ActionRegistry::new())
            }
        }
    }

    fn save(&self, registry: &ActionRegistry) -> DomainResult<()> {
        Self::export_to(&self.path, registry)?;
        tracing::debug!(path = %self.path.display(), "Bindings saved");
        Ok(())
    }
}

/// 一時ファイル経由で書き込み、renameで置き換える
///
/// 書き込み途中のクラッシュで既存ファイルが壊れないようにする。
fn write_atomic(path: &Path, content: &str) -> DomainResult<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)
        .map_err(|e| DomainError::Persistence(format!("Failed to write bindings file: {}", e)))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| DomainError::Persistence(format!("Failed to replace bindings file: {}", e)))
}
