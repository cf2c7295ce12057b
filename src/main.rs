use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use gesturemote::application::capture::{run_capture, CaptureResult};
use gesturemote::application::session::{SessionEnd, SessionRunner};
use gesturemote::domain::config::AppConfig;
use gesturemote::domain::ports::SettingsStore;
use gesturemote::domain::types::{Handedness, GESTURE_CODE_MAX, GESTURE_CODE_MIN};
use gesturemote::infrastructure::enigo_executor::EnigoExecutor;
use gesturemote::infrastructure::json_settings::JsonSettingsStore;
use gesturemote::infrastructure::mock_pose::{posed_hand, ScriptedPoseSource};
use gesturemote::infrastructure::rdev_input::RdevInputSource;
use gesturemote::logging::init_logging;

fn main() {
    // ログシステムの初期化（非同期ファイル出力）
    let log_dir = PathBuf::from("logs");
    let _guard = init_logging("info", false, Some(log_dir));
    // 注意: _guardはmain終了まで保持する必要がある（Dropでログスレッドが終了）

    tracing::info!("gesturemote starting...");

    match run() {
        Ok(_) => {
            tracing::info!("gesturemote terminated gracefully.");
        }
        Err(e) => {
            tracing::error!("Fatal error: {:?}", e);
            std::process::exit(1);
        }
    }
}

/// アプリケーションのメイン処理
///
/// - 引数なし: 制御セッションを実行
/// - `bind <1..5>`: 指定コードのバインディングキャプチャを実行
fn run() -> anyhow::Result<()> {
    // 設定ファイルの読み込み（存在しない場合はデフォルト設定を使用）
    let config = match AppConfig::from_file("config.toml") {
        Ok(config) => {
            tracing::info!("Loaded configuration from config.toml");
            config
        }
        Err(e) => {
            tracing::warn!("Failed to load config.toml: {:?}, using defaults", e);
            AppConfig::default()
        }
    };

    config.validate().context("Invalid configuration")?;

    tracing::info!(
        "Stabilizer: dwell={}ms, cooldown={}ms, exit_hold={}ms",
        config.stabilizer.dwell_ms,
        config.stabilizer.cooldown_ms,
        config.stabilizer.exit_hold_ms
    );

    let store = JsonSettingsStore::new(&config.settings.bindings_path);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("bind") => {
            let gesture: u8 = args
                .get(1)
                .context("Usage: gesturemote bind <1..5>")?
                .parse()
                .context("Gesture code must be a number")?;
            anyhow::ensure!(
                (GESTURE_CODE_MIN..=GESTURE_CODE_MAX).contains(&gesture),
                "Gesture code must be in 1..=5"
            );
            run_binding_capture(&store, gesture)
        }
        Some("reset") => {
            let mut registry = store.load().context("Failed to load bindings")?;
            registry.reset_all();
            store.save(&registry).context("Failed to save bindings")?;
            println!("All bindings cleared");
            Ok(())
        }
        Some("export") => {
            let path = args.get(1).context("Usage: gesturemote export <path>")?;
            let registry = store.load().context("Failed to load bindings")?;
            JsonSettingsStore::export_to(path, &registry).context("Export failed")?;
            println!("Bindings exported to {}", path);
            Ok(())
        }
        Some("import") => {
            let path = args.get(1).context("Usage: gesturemote import <path>")?;
            // 検証に通った場合のみ既存バインディングを置き換える
            let imported = JsonSettingsStore::import_from(path).context("Import rejected")?;
            let mut registry = store.load().context("Failed to load bindings")?;
            registry.replace(imported);
            store.save(&registry).context("Failed to save bindings")?;
            println!("Bindings imported from {}", path);
            Ok(())
        }
        Some(other) => anyhow::bail!("Unknown command: {}", other),
        None => run_session(&config, &store),
    }
}

/// バインディングキャプチャモード
///
/// グローバル入力監視を開始し、実演された入力を指定コードへバインドして保存する。
fn run_binding_capture(store: &JsonSettingsStore, gesture: u8) -> anyhow::Result<()> {
    let mut registry = store.load().context("Failed to load bindings")?;
    let mut input = RdevInputSource::new();

    tracing::info!(gesture, "Capture mode: demonstrate the input to bind");
    println!("Demonstrate the input to bind to gesture {} (30s timeout)...", gesture);

    let result = run_capture(
        gesture,
        &mut registry,
        &mut input,
        &[],
        Duration::from_secs(30),
    )
    .context("Capture failed")?;

    match result {
        CaptureResult::Bound {
            gesture,
            action,
            cleared,
        } => {
            store.save(&registry).context("Failed to save bindings")?;
            println!("Gesture {} bound to {}", gesture, action.describe());
            if let Some(previous) = cleared {
                println!("Gesture {} was unbound (same action)", previous);
            }
        }
        CaptureResult::Cancelled { reason } => {
            println!("Capture cancelled: {}", reason);
        }
    }
    Ok(())
}

/// 制御セッションモード
///
/// 手観測ソースは外部コラボレーター前提のため、スクリプトアダプターで駆動する
/// （実演: 3本指を保持してディスパッチ、その後両手保持で終了）。
fn run_session(config: &AppConfig, store: &JsonSettingsStore) -> anyhow::Result<()> {
    let registry = store.load().context("Failed to load bindings")?;
    let bound = registry.bound_codes().count();
    tracing::info!(bound, "Bindings loaded");
    if bound == 0 {
        tracing::warn!("No bindings configured, gestures will confirm without actions");
    }

    let executor = EnigoExecutor::new(&config.executor).context("Failed to initialize executor")?;
    let source = demo_pose_script();

    let mut runner = SessionRunner::new(config, registry, source, executor);
    match runner.run() {
        SessionEnd::TwoHandExit => tracing::info!("Session ended by two-hand hold"),
        SessionEnd::Cancelled => tracing::info!("Session cancelled"),
        SessionEnd::SourceFailed(e) => tracing::warn!(error = %e, "Session ended by source failure"),
    }

    store
        .save(runner.registry())
        .context("Failed to save bindings")?;
    Ok(())
}

/// デモ用の観測スクリプト（約30fps）
///
/// 3本指を0.5秒保持し、続けて両手を3.2秒保持してセッションを終える。
fn demo_pose_script() -> ScriptedPoseSource {
    let three = vec![posed_hand([false, true, true, true, false], Handedness::Right)];
    let both = vec![
        posed_hand([true; 5], Handedness::Left),
        posed_hand([true; 5], Handedness::Right),
    ];

    let mut frames = Vec::new();
    frames.extend(std::iter::repeat(three).take(15));
    frames.extend(std::iter::repeat(both).take(96));
    ScriptedPoseSource::with_interval(frames, Duration::from_millis(33))
}
