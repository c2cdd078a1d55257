//! 計算バックエンドの選択
//!
//! CPU (NdArray) は常に利用可能。WGPU は `gpu` feature 有効時のみ。

use image::RgbImage;

use crate::error::ScanResult;
use crate::ml::inference::{Classifier, ImageClassifier};
use crate::model::{DeviceType, ModelMetadata};
use crate::types::ScorePair;

pub type CpuBackend = burn::backend::NdArray;

#[cfg(feature = "gpu")]
pub type GpuBackend = burn::backend::Wgpu;

/// 設定されたデバイス上の推論エンジン
pub enum Engine {
    Cpu(Classifier<CpuBackend>),
    #[cfg(feature = "gpu")]
    Gpu(Classifier<GpuBackend>),
}

impl Engine {
    /// モデルバンドルを指定デバイスに読み込む
    pub fn load(model_bytes: &[u8], device_type: DeviceType) -> ScanResult<Self> {
        match device_type {
            DeviceType::Cpu => Self::load_cpu(model_bytes),
            DeviceType::Wgpu => Self::load_gpu(model_bytes),
        }
    }

    fn load_cpu(model_bytes: &[u8]) -> ScanResult<Self> {
        Ok(Engine::Cpu(Classifier::load(model_bytes, Default::default())?))
    }

    #[cfg(feature = "gpu")]
    fn load_gpu(model_bytes: &[u8]) -> ScanResult<Self> {
        Ok(Engine::Gpu(Classifier::load(model_bytes, Default::default())?))
    }

    #[cfg(not(feature = "gpu"))]
    fn load_gpu(model_bytes: &[u8]) -> ScanResult<Self> {
        tracing::warn!("gpu feature が無効のため CPU (NdArray) で推論します");
        Self::load_cpu(model_bytes)
    }

    pub fn metadata(&self) -> &ModelMetadata {
        match self {
            Engine::Cpu(classifier) => classifier.metadata(),
            #[cfg(feature = "gpu")]
            Engine::Gpu(classifier) => classifier.metadata(),
        }
    }

    pub fn device_type(&self) -> DeviceType {
        match self {
            Engine::Cpu(_) => DeviceType::Cpu,
            #[cfg(feature = "gpu")]
            Engine::Gpu(_) => DeviceType::Wgpu,
        }
    }
}

impl ImageClassifier for Engine {
    fn predict(&self, image: &RgbImage) -> ScanResult<ScorePair> {
        match self {
            Engine::Cpu(classifier) => classifier.predict(image),
            #[cfg(feature = "gpu")]
            Engine::Gpu(classifier) => classifier.predict(image),
        }
    }
}
