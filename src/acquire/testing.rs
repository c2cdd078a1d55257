//! テスト用のプラットフォームサービス

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use image::{Rgb, RgbImage};
use tempfile::TempDir;
use tokio::sync::oneshot;

use crate::acquire::ports::{CameraPort, CaptureOutcome, MediaLibraryPort, PermissionPort};
use crate::acquire::storage::{encode_jpeg, FsMediaLibrary, PictureStore, MEDIA_CATEGORY};
use crate::acquire::{Acquirer, FsGallery};
use crate::error::{ScanError, ScanResult};
use crate::ml::ImageClassifier;
use crate::types::{MediaHandle, ScorePair};

/// 40x30 の緑色JPEG
pub fn sample_jpeg() -> Vec<u8> {
    let image = RgbImage::from_pixel(40, 30, Rgb([30, 160, 40]));
    encode_jpeg(&image, 90).unwrap()
}

#[derive(Clone, Copy)]
enum CameraBehavior {
    Save,
    Cancel,
    Drop,
}

/// 撮影アプリの代わり
#[derive(Clone)]
pub struct FakeCamera {
    behavior: CameraBehavior,
    payload: Arc<Vec<u8>>,
    launches: Arc<AtomicUsize>,
}

impl FakeCamera {
    fn with(behavior: CameraBehavior, payload: Vec<u8>) -> Self {
        Self {
            behavior,
            payload: Arc::new(payload),
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// `payload` を書き込んで Saved を返す
    pub fn saving(payload: Vec<u8>) -> Self {
        Self::with(CameraBehavior::Save, payload)
    }

    pub fn cancelling() -> Self {
        Self::with(CameraBehavior::Cancel, Vec::new())
    }

    /// 結果を送らずに送信側を破棄する
    pub fn dropping() -> Self {
        Self::with(CameraBehavior::Drop, Vec::new())
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl CameraPort for FakeCamera {
    fn launch(&self, output: &Path) -> oneshot::Receiver<CaptureOutcome> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        match self.behavior {
            CameraBehavior::Save => {
                fs::write(output, self.payload.as_slice()).unwrap();
                tx.send(CaptureOutcome::Saved).unwrap();
            }
            CameraBehavior::Cancel => tx.send(CaptureOutcome::Cancelled).unwrap(),
            CameraBehavior::Drop => drop(tx),
        }
        rx
    }
}

/// 権限ダイアログの代わり
#[derive(Clone)]
pub struct FakePermission {
    has: Arc<AtomicBool>,
    answer: bool,
    requests: Arc<AtomicUsize>,
}

impl FakePermission {
    pub fn granted() -> Self {
        Self {
            has: Arc::new(AtomicBool::new(true)),
            answer: true,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 未許可の状態から始まり、要求されると `answer` を返す
    pub fn asking(answer: bool) -> Self {
        Self {
            has: Arc::new(AtomicBool::new(false)),
            answer,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PermissionPort for FakePermission {
    fn has_camera_permission(&self) -> bool {
        self.has.load(Ordering::SeqCst)
    }

    fn request_camera_permission(&self) -> oneshot::Receiver<bool> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.answer {
            self.has.store(true, Ordering::SeqCst);
        }
        let (tx, rx) = oneshot::channel();
        tx.send(self.answer).unwrap();
        rx
    }
}

pub struct FailingMediaLibrary;

impl MediaLibraryPort for FailingMediaLibrary {
    fn insert_jpeg(&self, _display_name: &str, _jpeg: &[u8]) -> io::Result<PathBuf> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "media library is read-only"))
    }
}

/// 固定の確信度を返す分類器
pub struct FakeClassifier {
    result: Result<ScorePair, String>,
}

impl FakeClassifier {
    pub fn returning(scores: ScorePair) -> Self {
        Self { result: Ok(scores) }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
        }
    }
}

impl ImageClassifier for FakeClassifier {
    fn predict(&self, _image: &RgbImage) -> ScanResult<ScorePair> {
        self.result.clone().map_err(ScanError::Inference)
    }
}

/// 一時ディレクトリ上のアプリ環境
///
/// - `<root>/private`: アプリ専用の撮影画像ディレクトリ
/// - `<root>/media`: 共有メディアライブラリ
/// - `<root>/gallery`: ギャラリーの画像
pub struct Fixture {
    dir: TempDir,
    camera: Arc<dyn CameraPort>,
    permission: Arc<dyn PermissionPort>,
    media: Arc<dyn MediaLibraryPort>,
}

impl Fixture {
    pub fn new<C, P>(camera: C, permission: P) -> Self
    where
        C: CameraPort + 'static,
        P: PermissionPort + 'static,
    {
        let dir = tempfile::tempdir().unwrap();
        let media = Arc::new(FsMediaLibrary::new(dir.path().join("media")));
        Self {
            dir,
            camera: Arc::new(camera),
            permission: Arc::new(permission),
            media,
        }
    }

    pub fn with_media(mut self, media: Arc<dyn MediaLibraryPort>) -> Self {
        self.media = media;
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn private_dir(&self) -> PathBuf {
        self.root().join("private")
    }

    pub fn acquirer(&self) -> Acquirer {
        Acquirer::new(
            PictureStore::new(self.private_dir()),
            self.camera.clone(),
            self.permission.clone(),
            Arc::new(FsGallery),
            self.media.clone(),
        )
    }

    /// ギャラリーに画像を置き、その選択ハンドルを返す
    pub fn gallery_image(&self, name: &str, bytes: &[u8]) -> MediaHandle {
        let dir = self.root().join("gallery");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        MediaHandle::new(path.to_string_lossy())
    }

    pub fn private_files(&self) -> Vec<PathBuf> {
        list_files(&self.private_dir())
    }

    pub fn media_files(&self) -> Vec<PathBuf> {
        list_files(&self.root().join("media").join(MEDIA_CATEGORY))
    }
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}
