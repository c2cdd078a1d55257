//! モデル推論機能

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use burn::{
    module::Module,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::{backend::Backend, Tensor, TensorData},
};
use image::RgbImage;

use crate::error::{ScanError, ScanResult};
use crate::ml::ml_model::{MiteClassifier, ModelConfig, INPUT_CHANNELS, INPUT_LEN, INPUT_SIZE};
use crate::ml::preprocess::{preprocess, InputTensor};
use crate::model::{bundle_to_bytes, read_bundle, write_bundle, ModelMetadata};
use crate::types::ScorePair;

/// 画像分類の共通インターフェース
pub trait ImageClassifier {
    /// 1枚の画像を分類し、[Healthy, Plague] の確信度を返す
    fn predict(&self, image: &RgbImage) -> ScanResult<ScorePair>;
}

/// 読み込み済みモデル
///
/// 起動時に一度だけ生成し、以降は読み取り専用で共有します。
pub struct Classifier<B: Backend> {
    model: MiteClassifier<B>,
    metadata: ModelMetadata,
    device: B::Device,
}

impl<B: Backend> Classifier<B> {
    /// モデルバンドル（tar.gzのバイト列）から推論エンジンを初期化
    pub fn load(model_bytes: &[u8], device: B::Device) -> ScanResult<Self> {
        let (metadata, model_binary) =
            read_bundle(model_bytes).map_err(|e| ScanError::ModelLoad(format!("{:#}", e)))?;
        metadata
            .validate()
            .map_err(|e| ScanError::ModelLoad(e.to_string()))?;

        let model = ModelConfig::new(metadata.num_classes())
            .with_base_filters(metadata.base_filters)
            .init::<B>(&device);

        // モデルの重みを復元
        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        let record = recorder
            .load(model_binary, &device)
            .map_err(|e| ScanError::ModelLoad(format!("invalid weights: {:?}", e)))?;
        let expected_params = model.num_params();
        let model = model.load_record(record);

        // 記録された重みの形状が宣言された構造と一致するか
        if model.num_params() != expected_params {
            return Err(ScanError::ModelLoad(format!(
                "weights do not match {} with base_filters={} ({} params, expected {})",
                metadata.architecture,
                metadata.base_filters,
                model.num_params(),
                expected_params
            )));
        }

        tracing::info!(
            "モデルを読み込みました: {} ({} classes, {} params)",
            metadata.architecture,
            metadata.num_classes(),
            model.num_params()
        );

        Ok(Self {
            model,
            metadata,
            device,
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// 前処理済みテンソルを推論
    pub fn predict_tensor(&self, tensor: &InputTensor) -> ScanResult<ScorePair> {
        let expected = self.metadata.input_size as usize;
        if expected != INPUT_SIZE {
            return Err(ScanError::Inference(format!(
                "model expects {}x{} input, got {}x{}",
                expected, expected, INPUT_SIZE, INPUT_SIZE
            )));
        }
        if tensor.len() != INPUT_LEN {
            return Err(ScanError::Inference(format!(
                "input tensor has {} values, expected {}",
                tensor.len(),
                INPUT_LEN
            )));
        }

        // [1, H, W, C] -> [1, C, H, W]
        let data = TensorData::new(
            tensor.as_slice().to_vec(),
            [1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS],
        );
        let input = Tensor::<B, 4>::from_data(data, &self.device).permute([0, 3, 1, 2]);

        let scores = self
            .model
            .forward_scores(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ScanError::Inference(format!("failed to read model output: {:?}", e)))?;

        ScorePair::from_slice(&scores).ok_or_else(|| {
            ScanError::Inference(format!("model produced {} outputs, expected 2", scores.len()))
        })
    }
}

impl<B: Backend> ImageClassifier for Classifier<B> {
    fn predict(&self, image: &RgbImage) -> ScanResult<ScorePair> {
        let started = Instant::now();
        let tensor = preprocess(image);
        let scores = self.predict_tensor(&tensor)?;
        tracing::debug!(
            "推論完了: healthy={:.4} plague={:.4} ({:.1} ms)",
            scores.healthy(),
            scores.plague(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(scores)
    }
}

fn record_weights<B: Backend>(model: MiteClassifier<B>) -> Result<Vec<u8>> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    recorder
        .record(model.into_record(), ())
        .map_err(|e| anyhow::anyhow!("Failed to record model weights: {:?}", e))
}

fn init_model<B: Backend>(metadata: &ModelMetadata, device: &B::Device) -> Result<MiteClassifier<B>> {
    metadata.validate()?;
    Ok(ModelConfig::new(metadata.num_classes())
        .with_base_filters(metadata.base_filters)
        .init::<B>(device))
}

/// モデルの重みをメタデータと共にバンドル化
pub fn export_bundle<B: Backend>(model: MiteClassifier<B>, metadata: &ModelMetadata) -> Result<Vec<u8>> {
    bundle_to_bytes(metadata, &record_weights(model)?)
}

/// ランダム初期化したモデルのバンドルを生成（動作確認用）
pub fn random_bundle<B: Backend>(metadata: &ModelMetadata, device: &B::Device) -> Result<Vec<u8>> {
    export_bundle(init_model::<B>(metadata, device)?, metadata)
}

/// ランダム初期化したモデルをバンドルファイルとして保存
pub fn save_random_bundle<B: Backend>(
    path: &Path,
    metadata: &ModelMetadata,
    device: &B::Device,
) -> Result<()> {
    let model = init_model::<B>(metadata, device)?;
    write_bundle(path, metadata, &record_weights(model)?)
}

/// モデル参照
///
/// 読み込みに失敗した場合も `Unavailable` として保持し、分類のたびに明示的に扱います。
pub enum ModelSlot {
    Ready(Box<dyn ImageClassifier>),
    Unavailable(String),
}

impl ModelSlot {
    pub fn from_load<C: ImageClassifier + 'static>(result: ScanResult<C>) -> Self {
        match result {
            Ok(classifier) => ModelSlot::Ready(Box::new(classifier)),
            Err(e) => {
                tracing::error!("{}", e);
                ModelSlot::Unavailable(e.to_string())
            }
        }
    }

    /// モデルファイルを丸ごと読み込んでから `load` に渡す
    pub fn load_file<C, F>(path: &Path, load: F) -> Self
    where
        C: ImageClassifier + 'static,
        F: FnOnce(&[u8]) -> ScanResult<C>,
    {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_load(load(&bytes)),
            Err(e) => Self::from_load::<C>(Err(ScanError::ModelLoad(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelSlot::Ready(_))
    }

    pub fn classifier(&self) -> ScanResult<&dyn ImageClassifier> {
        match self {
            ModelSlot::Ready(classifier) => Ok(classifier.as_ref()),
            ModelSlot::Unavailable(reason) => Err(ScanError::ModelUnavailable(reason.clone())),
        }
    }
}
