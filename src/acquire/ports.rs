//! プラットフォームサービスのインターフェース
//!
//! カメラ、権限ダイアログ、ギャラリー、メディアライブラリはすべて外部サービスとして扱います。
//! 完了通知が非同期なもの（撮影、権限要求）は一度だけ結果を送る oneshot チャネルを返します。
//! 送信側が結果を送らずに破棄された場合は「成功しなかった」とみなします。

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tokio::sync::oneshot;

use crate::types::MediaHandle;

/// 撮影の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// 指定ファイルに画像が書き込まれた
    Saved,
    /// ユーザーが撮影を中止した
    Cancelled,
}

pub trait CameraPort: Send + Sync {
    /// `output` に書き込む撮影を開始する
    fn launch(&self, output: &Path) -> oneshot::Receiver<CaptureOutcome>;
}

pub trait PermissionPort: Send + Sync {
    fn has_camera_permission(&self) -> bool;
    /// 権限ダイアログを表示し、許可されたかどうかを一度だけ通知する
    fn request_camera_permission(&self) -> oneshot::Receiver<bool>;
}

pub trait GalleryPort: Send + Sync {
    /// 選択された画像のバイトストリームを開く
    fn open(&self, handle: &MediaHandle) -> io::Result<Box<dyn Read + Send>>;
}

pub trait MediaLibraryPort: Send + Sync {
    /// 共有メディアライブラリにJPEGを追加し、保存先を返す
    fn insert_jpeg(&self, display_name: &str, jpeg: &[u8]) -> io::Result<PathBuf>;
}
