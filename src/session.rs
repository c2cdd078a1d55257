//! 撮影・分類セッション
//!
//! 画面は「取得待ち」と「結果表示」の2状態のみ。
//! 分類に成功すると結果表示へ、Return で取得待ちへ戻ります。

use std::time::Instant;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageResult, RgbImage};
use serde::{Serialize, Serializer};

use crate::acquire::{encode_jpeg, Acquirer};
use crate::error::{ScanError, ScanResult};
use crate::ml::ModelSlot;
use crate::types::{ImageSource, Label, MediaHandle, ScorePair};

/// 結果表示用JPEGの品質
const PREVIEW_JPEG_QUALITY: u8 = 85;

/// 表示中の画面
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum View {
    /// 撮影・ギャラリー選択を待っている
    Acquiring {
        /// 一時的な通知（権限拒否など）
        #[serde(skip_serializing_if = "Option::is_none")]
        notice: Option<String>,
    },
    ShowingResult(ClassificationView),
}

impl View {
    pub fn acquiring() -> Self {
        View::Acquiring { notice: None }
    }

    pub fn notice(&self) -> Option<&str> {
        match self {
            View::Acquiring { notice } => notice.as_deref(),
            View::ShowingResult(_) => None,
        }
    }

    pub fn result(&self) -> Option<&ClassificationView> {
        match self {
            View::ShowingResult(result) => Some(result),
            View::Acquiring { .. } => None,
        }
    }
}

/// 分類結果の画面
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationView {
    pub label: Label,
    pub scores: ScorePair,
    pub source: ImageSource,
    #[serde(rename = "image", serialize_with = "serialize_data_url")]
    pub image: RgbImage,
}

impl ClassificationView {
    pub fn caption(&self) -> String {
        format!("Classified as: {}", self.label)
    }

    /// 画像を `data:image/jpeg;base64,...` 形式で返す
    pub fn image_data_url(&self) -> ImageResult<String> {
        jpeg_data_url(&self.image)
    }
}

fn jpeg_data_url(image: &RgbImage) -> ImageResult<String> {
    let jpeg = encode_jpeg(image, PREVIEW_JPEG_QUALITY)?;
    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg)))
}

fn serialize_data_url<S: Serializer>(image: &RgbImage, serializer: S) -> Result<S::Ok, S::Error> {
    let url = jpeg_data_url(image).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&url)
}

pub struct ScanSession {
    acquirer: Acquirer,
    model: ModelSlot,
    view: View,
}

impl ScanSession {
    pub fn new(acquirer: Acquirer, model: ModelSlot) -> Self {
        if let ModelSlot::Unavailable(reason) = &model {
            tracing::warn!("分類は利用できません: {}", reason);
        }
        Self {
            acquirer,
            model,
            view: View::acquiring(),
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn model(&self) -> &ModelSlot {
        &self.model
    }

    /// 撮影して分類する
    pub async fn take_picture(&mut self) -> &View {
        if !self.is_acquiring() {
            return &self.view;
        }

        match self.acquirer.acquire_from_camera().await {
            Ok(image) => self.show(image, ImageSource::Camera),
            Err(e) => self.report(e),
        }
        &self.view
    }

    /// ギャラリーで選択された画像を分類する
    pub fn pick_from_gallery(&mut self, selection: Option<&MediaHandle>) -> &View {
        if !self.is_acquiring() {
            return &self.view;
        }

        match self.acquirer.acquire_from_gallery(selection) {
            Ok(image) => self.show(image, ImageSource::Gallery),
            Err(e) => self.report(e),
        }
        &self.view
    }

    /// 結果画面から取得待ちに戻る
    pub fn return_to_menu(&mut self) -> &View {
        self.view = View::acquiring();
        &self.view
    }

    /// 1枚の画像を分類する
    pub fn classify(&self, image: &RgbImage) -> ScanResult<(Label, ScorePair)> {
        let classifier = self.model.classifier()?;

        let start = Instant::now();
        let scores = classifier.predict(image)?;
        let label = scores.label();
        tracing::info!(
            "分類結果: {} (Healthy={:.4}, Plague={:.4}, {:.2?})",
            label,
            scores.healthy(),
            scores.plague(),
            start.elapsed()
        );

        Ok((label, scores))
    }

    fn is_acquiring(&self) -> bool {
        if matches!(self.view, View::Acquiring { .. }) {
            true
        } else {
            tracing::debug!("結果表示中のため取得要求を無視しました");
            false
        }
    }

    fn show(&mut self, image: RgbImage, source: ImageSource) {
        match self.classify(&image) {
            Ok((label, scores)) => {
                self.view = View::ShowingResult(ClassificationView {
                    label,
                    scores,
                    source,
                    image,
                });
            }
            Err(e) => self.report(e),
        }
    }

    fn report(&mut self, error: ScanError) {
        let notice = match &error {
            ScanError::PermissionDenied => error.to_string(),
            ScanError::FileCreation(e) => {
                tracing::warn!("撮影ファイルを作成できません: {}", e);
                "Error creating file".to_string()
            }
            // 取得失敗は通知せずに取得待ちのまま
            ScanError::AcquisitionFailed(reason) => {
                tracing::info!("画像を取得できませんでした: {}", reason);
                return;
            }
            ScanError::ModelLoad(_) | ScanError::ModelUnavailable(_) | ScanError::Inference(_) => {
                tracing::warn!("{}", error);
                error.to_string()
            }
        };

        self.view = View::Acquiring {
            notice: Some(notice),
        };
    }
}
