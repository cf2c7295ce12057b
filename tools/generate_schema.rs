//! JSON Schema + Markdown生成ツール
//!
//! src/domain/config.rsの設定構造から以下を自動生成します：
//! 1. JSON Schema (schema/config.json)
//! 2. Markdownドキュメント (CONFIGURATION.md)
//!
//! 実行方法:
//! ```
//! cargo run --bin generate_schema
//! ```

use schemars::schema_for;
use serde_json::{Map, Value};
use std::fs;

use gesturemote::domain::config::AppConfig;

fn main() {
    println!("JSON Schema + Markdown生成中...");

    let schema = schema_for!(AppConfig);
    let json = serde_json::to_string_pretty(&schema).expect("Failed to serialize schema to JSON");

    fs::create_dir_all("schema").expect("Failed to create schema/ directory");
    fs::write("schema/config.json", &json).expect("Failed to write schema/config.json");
    println!("  ✓ schema/config.json");

    let schema_value: Value =
        serde_json::from_str(&json).expect("Failed to parse generated schema");
    let markdown = generate_markdown(&schema_value);

    fs::write("CONFIGURATION.md", markdown).expect("Failed to write CONFIGURATION.md");
    println!("  ✓ CONFIGURATION.md");

    println!("✅ 生成完了: schema/config.json + CONFIGURATION.md");
}

/// JSON Schemaからマークダウンドキュメントを生成
fn generate_markdown(schema: &Value) -> String {
    let mut md = String::new();

    md.push_str("# 設定リファレンス (Configuration Reference)\n\n");
    md.push_str("`config.toml`は、gesturemoteの分類・安定化・実行の各パラメーターを制御します。\n\n");
    md.push_str("**設定ファイルの場所**: `config.toml` (プロジェクトルート)  \n");
    md.push_str("**スキーマファイル**: `schema/config.json` (自動生成)\n\n");
    md.push_str("⚠️ **注意**: このドキュメントは `cargo run --bin generate_schema` で自動生成されます。\n");
    md.push_str("説明を変更する場合は、`src/domain/config.rs`のdoc commentsを編集してください。\n\n");
    md.push_str("## 設定項目\n\n");

    let defs = schema
        .get("$defs")
        .and_then(|d| d.as_object())
        .cloned()
        .unwrap_or_default();

    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, prop) in props {
            md.push_str(&format!("### [{}] - {}\n\n", key, section_name(key)));

            let resolved = resolve_ref(prop, &defs).unwrap_or(prop);
            if let Some(desc) = resolved.get("description").and_then(|d| d.as_str()) {
                md.push_str(&format!("{}\n\n", desc));
            }
            push_properties_table(&mut md, resolved, &defs);
        }
    }

    md
}

/// `$ref`を`$defs`から解決する
fn resolve_ref<'a>(schema: &Value, defs: &'a Map<String, Value>) -> Option<&'a Value> {
    let ref_str = schema.get("$ref")?.as_str()?;
    defs.get(ref_str.strip_prefix("#/$defs/")?)
}

/// プロパティテーブルを出力
fn push_properties_table(md: &mut String, schema: &Value, defs: &Map<String, Value>) {
    let Some(props) = schema.get("properties").and_then(|p| p.as_object()) else {
        return;
    };
    if props.is_empty() {
        return;
    }

    md.push_str("| 設定項目 | 型 | 説明 |\n");
    md.push_str("|---------|-----|---------|\n");
    for (key, prop) in props {
        let resolved = resolve_ref(prop, defs).unwrap_or(prop);
        let type_str = resolved
            .get("format")
            .or_else(|| resolved.get("type"))
            .and_then(|t| t.as_str())
            .unwrap_or("object");
        let description = resolved
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("-")
            .replace('\n', " ")
            .replace('|', "\\|");
        md.push_str(&format!("| `{}` | {} | {} |\n", key, type_str, description));
    }
    md.push('\n');
}

/// セクション名をフォーマット
fn section_name(key: &str) -> String {
    match key {
        "classifier" => "分類器設定".to_string(),
        "stabilizer" => "時間安定化設定".to_string(),
        "executor" => "アクション実行設定".to_string(),
        "settings" => "バインディング永続化設定".to_string(),
        "session" => "セッション設定".to_string(),
        _ => key.to_string(),
    }
}
