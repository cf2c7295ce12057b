//! 設定管理
//!
//! TOML設定ファイルの読み込みとDomain型への変換。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::{DomainError, DomainResult};

/// アプリケーション設定のルート構造
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AppConfig {
    /// 分類器設定
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// 時間安定化設定
    #[serde(default)]
    pub stabilizer: StabilizerConfig,
    /// アクション実行設定
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// バインディング永続化設定
    #[serde(default)]
    pub settings: SettingsConfig,
    /// セッション設定
    #[serde(default)]
    pub session: SessionConfig,
}

/// 分類器設定
///
/// 閾値は元実装から経験的に調整された値。導出式は存在しないため、
/// 再導出せず設定値として保持する。
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassifierConfig {
    /// 垂直閾値の除数
    ///
    /// 伸展判定の閾値 = |手首.y - 中指MCP.y| / vertical_divisor。
    /// 手の見かけサイズにスケールするため距離不変になる。
    /// デフォルト: 2.8
    pub vertical_divisor: f32,

    /// 親指判定の手のひら幅比率
    ///
    /// 閾値 = |人差し指MCP.x - 小指MCP.x| * thumb_width_fraction。
    /// デフォルト: 0.3
    pub thumb_width_fraction: f32,
}

impl ClassifierConfig {
    /// デフォルトの垂直閾値除数
    pub const DEFAULT_VERTICAL_DIVISOR: f32 = 2.8;
    /// デフォルトの親指幅比率
    pub const DEFAULT_THUMB_WIDTH_FRACTION: f32 = 0.3;
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            vertical_divisor: Self::DEFAULT_VERTICAL_DIVISOR,
            thumb_width_fraction: Self::DEFAULT_THUMB_WIDTH_FRACTION,
        }
    }
}

/// 時間安定化設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StabilizerConfig {
    /// ジェスチャー確定までの最小保持時間（ミリ秒）
    ///
    /// 単一フレームの誤分類をフィルタする。
    /// デフォルト: 250ms
    pub dwell_ms: u64,

    /// ディスパッチ間の最小間隔（ミリ秒）
    ///
    /// 保持し続けたジェスチャーの毎フレーム再発火を防ぐ。
    /// デフォルト: 400ms
    pub cooldown_ms: u64,

    /// 両手検出でセッション終了までの保持時間（ミリ秒）
    ///
    /// 片手制御ジェスチャーと混同しないハンズフリー終了手段。
    /// デフォルト: 3000ms
    pub exit_hold_ms: u64,
}

impl StabilizerConfig {
    /// デフォルトの保持時間（ミリ秒）
    pub const DEFAULT_DWELL_MS: u64 = 250;
    /// デフォルトのクールダウン（ミリ秒）
    pub const DEFAULT_COOLDOWN_MS: u64 = 400;
    /// デフォルトの両手終了保持時間（ミリ秒）
    pub const DEFAULT_EXIT_HOLD_MS: u64 = 3000;

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn exit_hold(&self) -> Duration {
        Duration::from_millis(self.exit_hold_ms)
    }
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            dwell_ms: Self::DEFAULT_DWELL_MS,
            cooldown_ms: Self::DEFAULT_COOLDOWN_MS,
            exit_hold_ms: Self::DEFAULT_EXIT_HOLD_MS,
        }
    }
}

/// アクション実行設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecutorConfig {
    /// スクロール1ティックの大きさ（スクロール単位）
    ///
    /// 元実装のpyautogui標準単位に合わせている。
    /// デフォルト: 120
    pub scroll_unit: i32,
}

impl ExecutorConfig {
    /// デフォルトのスクロール単位
    pub const DEFAULT_SCROLL_UNIT: i32 = 120;
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            scroll_unit: Self::DEFAULT_SCROLL_UNIT,
        }
    }
}

/// バインディング永続化設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SettingsConfig {
    /// バインディングファイルのパス
    ///
    /// デフォルト: "settings.json"
    pub bindings_path: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            bindings_path: "settings.json".to_string(),
        }
    }
}

/// セッション設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionConfig {
    /// 統計情報の出力間隔（秒）
    pub stats_interval_sec: u64,
}

impl SessionConfig {
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_sec)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stats_interval_sec: 10,
        }
    }
}

impl AppConfig {
    /// TOMLファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> DomainResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| DomainError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    /// デフォルト設定をTOMLファイルに書き出す
    #[allow(dead_code)]
    pub fn write_default<P: AsRef<Path>>(path: P) -> DomainResult<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config).map_err(|e| {
            DomainError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content)
            .map_err(|e| DomainError::Configuration(format!("Failed to write config file: {}", e)))
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> DomainResult<()> {
        if self.classifier.vertical_divisor <= 0.0 {
            return Err(DomainError::Configuration(
                "vertical_divisor must be positive".to_string(),
            ));
        }
        if self.classifier.thumb_width_fraction <= 0.0 {
            return Err(DomainError::Configuration(
                "thumb_width_fraction must be positive".to_string(),
            ));
        }

        if self.stabilizer.dwell_ms == 0 {
            return Err(DomainError::Configuration(
                "dwell_ms must be greater than 0".to_string(),
            ));
        }
        if self.stabilizer.exit_hold_ms == 0 {
            return Err(DomainError::Configuration(
                "exit_hold_ms must be greater than 0".to_string(),
            ));
        }

        if self.executor.scroll_unit == 0 {
            return Err(DomainError::Configuration(
                "scroll_unit must be non-zero".to_string(),
            ));
        }

        if self.settings.bindings_path.is_empty() {
            return Err(DomainError::Configuration(
                "bindings_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.classifier.vertical_divisor, 2.8);
        assert_eq!(config.classifier.thumb_width_fraction, 0.3);
        assert_eq!(config.stabilizer.dwell_ms, 250);
        assert_eq!(config.stabilizer.cooldown_ms, 400);
        assert_eq!(config.stabilizer.exit_hold_ms, 3000);
        assert_eq!(config.executor.scroll_unit, 120);
        assert_eq!(config.settings.bindings_path, "settings.json");
    }

    #[test]
    fn test_duration_helpers() {
        let config = StabilizerConfig::default();
        assert_eq!(config.dwell(), Duration::from_millis(250));
        assert_eq!(config.cooldown(), Duration::from_millis(400));
        assert_eq!(config.exit_hold(), Duration::from_secs(3));
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        // 不正な除数
        config.classifier.vertical_divisor = 0.0;
        assert!(config.validate().is_err());
        config.classifier.vertical_divisor = 2.8;

        // 不正な保持時間
        config.stabilizer.dwell_ms = 0;
        assert!(config.validate().is_err());
        config.stabilizer.dwell_ms = 250;

        // 空のバインディングパス
        config.settings.bindings_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let toml = r#"
            [stabilizer]
            dwell_ms = 100
            cooldown_ms = 400
            exit_hold_ms = 3000
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.stabilizer.dwell_ms, 100);
        assert_eq!(config.classifier.vertical_divisor, 2.8);
        assert_eq!(config.executor.scroll_unit, 120);
    }

    #[test]
    fn test_full_toml_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.stabilizer.dwell_ms, config.stabilizer.dwell_ms);
        assert_eq!(parsed.settings.bindings_path, config.settings.bindings_path);
    }
}
