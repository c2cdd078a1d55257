//! モデルメタデータの定義
//!
//! バンドル（tar.gz）内の `metadata.json` として保存されます。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ml::INPUT_SIZE;
use crate::types::CLASS_NAMES;

/// ネットワーク構造の識別子
pub const ARCHITECTURE: &str = "mite-cnn-v1";

/// 最初の畳み込み層のチャネル数の上限（最終ブロックは8倍）
pub const MAX_BASE_FILTERS: usize = 512;

/// 出力クラス数の上限
pub const MAX_CLASSES: usize = 1024;

/// 入力サイズの上限
pub const MAX_INPUT_SIZE: u32 = 4096;

/// モデルメタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// 構造の識別子（`ARCHITECTURE` と一致する必要がある）
    pub architecture: String,

    /// 出力クラスのラベル（インデックス順）
    /// 例: ["Healthy", "Plague"]
    pub class_labels: Vec<String>,

    /// モデル入力サイズ（正方形、通常224）
    pub input_size: u32,

    /// 最初の畳み込み層のチャネル数（以降2倍ずつ増加）
    pub base_filters: usize,

    /// 作成時刻（ISO8601形式）
    pub created_at: String,
}

impl ModelMetadata {
    /// 新しいメタデータを作成
    pub fn new(class_labels: Vec<String>, input_size: u32, base_filters: usize) -> Self {
        Self {
            architecture: ARCHITECTURE.to_string(),
            class_labels,
            input_size,
            base_filters,
            created_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// Healthy / Plague の2クラス・224x224入力
    pub fn two_class(base_filters: usize) -> Self {
        Self::new(
            CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            INPUT_SIZE as u32,
            base_filters,
        )
    }

    pub fn num_classes(&self) -> usize {
        self.class_labels.len()
    }

    /// ネットワークを構築できる内容か検証
    pub fn validate(&self) -> Result<()> {
        if self.architecture != ARCHITECTURE {
            anyhow::bail!(
                "Unsupported architecture: {} (expected {})",
                self.architecture,
                ARCHITECTURE
            );
        }
        if self.class_labels.is_empty() {
            anyhow::bail!("Model declares no output classes");
        }
        if self.num_classes() > MAX_CLASSES {
            anyhow::bail!(
                "Model declares {} classes (at most {})",
                self.num_classes(),
                MAX_CLASSES
            );
        }
        if self.base_filters == 0 || self.base_filters > MAX_BASE_FILTERS {
            anyhow::bail!(
                "base_filters must be in 1..={} (got {})",
                MAX_BASE_FILTERS,
                self.base_filters
            );
        }
        // 最終ブロックの幅
        if self.base_filters.checked_mul(8).is_none() {
            anyhow::bail!("base_filters {} overflows the last block width", self.base_filters);
        }
        if self.input_size == 0 || self.input_size > MAX_INPUT_SIZE {
            anyhow::bail!(
                "input_size must be in 1..={} (got {})",
                MAX_INPUT_SIZE,
                self.input_size
            );
        }
        Ok(())
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize metadata to JSON")
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize metadata from JSON")
    }

    /// 表示用の複数行テキスト
    pub fn describe(&self) -> String {
        format!(
            "=== モデルメタデータ ===\n\
             構造: {}\n\
             クラス: {}\n\
             入力サイズ: {}x{}\n\
             基本チャネル数: {}\n\
             作成日時: {}\n\
             ========================",
            self.architecture,
            self.class_labels.join(", "),
            self.input_size,
            self.input_size,
            self.base_filters,
            self.created_at,
        )
    }
}
