//! エンドツーエンド統合テスト
//!
//! キャプチャ → 永続化 → セッション実行の全経路を
//! モックアダプターとtempfileで検証する。

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::bounded;
use tempfile::tempdir;

use gesturemote::application::capture::{run_capture, CaptureResult};
use gesturemote::application::session::{SessionEnd, SessionRunner};
use gesturemote::domain::bindings::ActionRegistry;
use gesturemote::domain::config::AppConfig;
use gesturemote::domain::error::DomainResult;
use gesturemote::domain::ports::{
    RawInputEvent, RawInputSource, RawInputSubscription, SettingsStore,
};
use gesturemote::domain::types::{ActionDescriptor, HandObservation, Handedness};
use gesturemote::infrastructure::json_settings::JsonSettingsStore;
use gesturemote::infrastructure::mock_executor::RecordingExecutor;
use gesturemote::infrastructure::mock_pose::{posed_hand, ScriptedPoseSource};

/// テスト用の短い時定数
fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.stabilizer.dwell_ms = 1;
    config.stabilizer.cooldown_ms = 1;
    config.stabilizer.exit_hold_ms = 20;
    config
}

/// 事前に組んだrawイベント列を流すソース
struct ScriptedInput {
    events: Vec<RawInputEvent>,
}

impl RawInputSource for ScriptedInput {
    fn subscribe(&mut self) -> DomainResult<RawInputSubscription> {
        let (tx, rx) = bounded(64);
        for event in self.events.drain(..) {
            let _ = tx.send(event);
        }
        Ok(RawInputSubscription::new(
            rx,
            Arc::new(AtomicBool::new(true)),
        ))
    }
}

fn three_fingers() -> Vec<HandObservation> {
    vec![posed_hand(
        [false, true, true, true, false],
        Handedness::Right,
    )]
}

fn two_hands() -> Vec<HandObservation> {
    vec![
        posed_hand([true; 5], Handedness::Left),
        posed_hand([true; 5], Handedness::Right),
    ]
}

#[test]
fn persisted_binding_dispatches_and_two_hands_end_session() {
    let dir = tempdir().unwrap();
    let store = JsonSettingsStore::new(dir.path().join("settings.json"));

    // バインディングを保存してから読み直す（プロセス再起動の模擬）
    let mut registry = ActionRegistry::new();
    registry.bind(
        3,
        ActionDescriptor::Key {
            value: "space".to_string(),
        },
    );
    store.save(&registry).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded, registry);

    // 3本指を保持 → ディスパッチ、その後両手保持 → セッション終了
    let mut frames: Vec<_> = (0..4).map(|_| three_fingers()).collect();
    frames.extend((0..10).map(|_| two_hands()));
    let source = ScriptedPoseSource::with_interval(frames, Duration::from_millis(5));

    let executor = RecordingExecutor::new();
    let probe = executor.clone();
    let mut runner = SessionRunner::new(&fast_config(), loaded, source, executor);

    let end = runner.run();
    assert!(matches!(end, SessionEnd::TwoHandExit));
    assert_eq!(
        probe.executed(),
        vec![ActionDescriptor::Key {
            value: "space".to_string()
        }]
    );
}

#[test]
fn captured_combo_flows_into_session() {
    let dir = tempdir().unwrap();
    let store = JsonSettingsStore::new(dir.path().join("settings.json"));
    let mut registry = store.load().unwrap();

    // 実演: ctrl+shift+a を押して解放
    let mut input = ScriptedInput {
        events: vec![
            RawInputEvent::KeyDown {
                key: "ControlLeft".to_string(),
            },
            RawInputEvent::KeyDown {
                key: "ShiftLeft".to_string(),
            },
            RawInputEvent::KeyDown {
                key: "a".to_string(),
            },
            RawInputEvent::KeyUp {
                key: "a".to_string(),
            },
        ],
    };
    let result = run_capture(
        2,
        &mut registry,
        &mut input,
        &[],
        Duration::from_secs(1),
    )
    .unwrap();

    let expected = ActionDescriptor::Combo {
        value: "ctrl+shift+a".to_string(),
    };
    assert_eq!(
        result,
        CaptureResult::Bound {
            gesture: 2,
            action: expected.clone(),
            cleared: None,
        }
    );
    store.save(&registry).unwrap();

    // 再読込したバインディングで2本指ジェスチャーが実行される
    let loaded = store.load().unwrap();
    let frames: Vec<_> = (0..4)
        .map(|_| {
            vec![posed_hand(
                [false, true, true, false, false],
                Handedness::Left,
            )]
        })
        .collect();
    let source = ScriptedPoseSource::with_interval(frames, Duration::from_millis(5));

    let executor = RecordingExecutor::new();
    let probe = executor.clone();
    let mut runner = SessionRunner::new(&fast_config(), loaded, source, executor);

    let end = runner.run();
    assert!(matches!(end, SessionEnd::SourceFailed(_)));
    assert_eq!(probe.executed(), vec![expected]);
}

#[test]
fn forbidden_key_during_capture_preserves_saved_bindings() {
    let dir = tempdir().unwrap();
    let store = JsonSettingsStore::new(dir.path().join("settings.json"));

    let mut registry = ActionRegistry::new();
    registry.bind(
        1,
        ActionDescriptor::Key {
            value: "p".to_string(),
        },
    );
    store.save(&registry).unwrap();

    let mut input = ScriptedInput {
        events: vec![RawInputEvent::KeyDown {
            key: "meta_left".to_string(),
        }],
    };
    let result = run_capture(
        4,
        &mut registry,
        &mut input,
        &[],
        Duration::from_secs(1),
    )
    .unwrap();
    assert!(matches!(result, CaptureResult::Cancelled { .. }));

    // キャンセル後もディスク上のバインディングは元のまま
    let loaded = store.load().unwrap();
    assert_eq!(
        loaded.resolve(1),
        Some(&ActionDescriptor::Key {
            value: "p".to_string()
        })
    );
    assert!(loaded.resolve(4).is_none());
}

#[test]
fn import_is_all_or_nothing_across_restart() {
    let dir = tempdir().unwrap();
    let settings_path = dir.path().join("settings.json");
    let store = JsonSettingsStore::new(&settings_path);

    let mut registry = ActionRegistry::new();
    registry.bind(
        5,
        ActionDescriptor::Key {
            value: "m".to_string(),
        },
    );
    store.save(&registry).unwrap();

    // 不正なインポートファイルは全体が棄却され、既存バインディングは残る
    let import_path = dir.path().join("import.json");
    std::fs::write(
        &import_path,
        r#"{"1": {"type": "key", "value": "a"}, "2": null, "3": null, "4": null}"#,
    )
    .unwrap();
    assert!(JsonSettingsStore::import_from(&import_path).is_err());
    assert_eq!(store.load().unwrap(), registry);

    // エクスポートしたファイルはそのままインポートできる
    let export_path = dir.path().join("export.json");
    JsonSettingsStore::export_to(&export_path, &registry).unwrap();
    let imported = JsonSettingsStore::import_from(&export_path).unwrap();
    registry.replace(imported);
    assert_eq!(
        registry.resolve(5),
        Some(&ActionDescriptor::Key {
            value: "m".to_string()
        })
    );
}
