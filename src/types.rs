use serde::{Deserialize, Serialize};

/// 分類ラベル名（インデックス順）
pub const CLASS_NAMES: [&str; 2] = ["Healthy", "Plague"];

/// 分類結果のラベル
///
/// インデックス0が Healthy、それ以外はすべて Plague。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Healthy,
    Plague,
}

impl Label {
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            Label::Healthy
        } else {
            Label::Plague
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Healthy => CLASS_NAMES[0],
            Label::Plague => CLASS_NAMES[1],
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 最大値のインデックス（同値の場合は先に現れた方）
///
/// 空スライスのみ `None`。NaN は最大値として選ばれない。
pub fn argmax(scores: &[f32]) -> Option<usize> {
    if scores.is_empty() {
        return None;
    }
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] || (scores[best].is_nan() && !score.is_nan()) {
            best = i;
        }
    }
    Some(best)
}

/// モデル出力の2クラス確信度 [Healthy, Plague]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePair([f32; 2]);

impl ScorePair {
    pub fn new(healthy: f32, plague: f32) -> Self {
        Self([healthy, plague])
    }

    /// モデル出力から生成（要素数がちょうど2の場合のみ）
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        match values {
            [healthy, plague] => Some(Self::new(*healthy, *plague)),
            _ => None,
        }
    }

    pub fn healthy(&self) -> f32 {
        self.0[0]
    }

    pub fn plague(&self) -> f32 {
        self.0[1]
    }

    pub fn as_array(&self) -> [f32; 2] {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    pub fn argmax(&self) -> usize {
        argmax(&self.0).unwrap_or(0)
    }

    pub fn label(&self) -> Label {
        Label::from_index(self.argmax())
    }
}

/// ギャラリーで選択された画像のハンドル（URI形式などプラットフォーム依存）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle(pub String);

impl MediaHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 画像の取得元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Camera,
    Gallery,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Camera => write!(f, "camera"),
            ImageSource::Gallery => write!(f, "gallery"),
        }
    }
}
