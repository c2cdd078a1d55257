use thiserror::Error;

/// 撮影・分類フローのエラー
#[derive(Debug, Error)]
pub enum ScanError {
    /// カメラ権限が拒否された
    #[error("Camera permission denied")]
    PermissionDenied,
    /// 撮影キャンセル、ハンドル不正、デコード失敗など
    #[error("Image acquisition failed: {0}")]
    AcquisitionFailed(String),
    #[error("Error creating file: {0}")]
    FileCreation(#[source] std::io::Error),
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    /// 起動時にモデルを読み込めなかった
    #[error("Classifier unavailable: {0}")]
    ModelUnavailable(String),
    /// 入出力形状の不一致など
    #[error("Inference failed: {0}")]
    Inference(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
