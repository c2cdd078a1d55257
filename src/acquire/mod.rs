//! 画像取得（カメラ撮影・ギャラリー選択）

pub mod ports;
pub mod storage;
pub mod camera;
pub mod gallery;

#[cfg(test)]
pub(crate) mod testing;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use image::RgbImage;

use crate::error::{ScanError, ScanResult};
use crate::types::MediaHandle;

pub use camera::{CommandCamera, ConsolePermission, PresetPermission};
pub use gallery::FsGallery;
pub use ports::{CameraPort, CaptureOutcome, GalleryPort, MediaLibraryPort, PermissionPort};
pub use storage::{encode_jpeg, media_display_name, FsMediaLibrary, PictureStore, MEDIA_JPEG_QUALITY};

/// プラットフォームサービスをまとめて画像を取得する
pub struct Acquirer {
    pictures: PictureStore,
    camera: Arc<dyn CameraPort>,
    permission: Arc<dyn PermissionPort>,
    gallery: Arc<dyn GalleryPort>,
    media: Arc<dyn MediaLibraryPort>,
}

impl Acquirer {
    pub fn new(
        pictures: PictureStore,
        camera: Arc<dyn CameraPort>,
        permission: Arc<dyn PermissionPort>,
        gallery: Arc<dyn GalleryPort>,
        media: Arc<dyn MediaLibraryPort>,
    ) -> Self {
        Self {
            pictures,
            camera,
            permission,
            gallery,
            media,
        }
    }

    pub fn pictures(&self) -> &PictureStore {
        &self.pictures
    }

    /// カメラで撮影して画像を返す
    ///
    /// 1. 権限確認（未許可なら要求し、一度だけ回答を待つ）
    /// 2. 撮影先ファイルを作成
    /// 3. 撮影完了を待つ（キャンセル時はファイルを削除）
    /// 4. デコードし、共有メディアライブラリにコピーを保存
    pub async fn acquire_from_camera(&self) -> ScanResult<RgbImage> {
        self.ensure_camera_permission().await?;

        let target = self
            .pictures
            .create_image_file()
            .map_err(ScanError::FileCreation)?;

        // 送信側が破棄された場合もキャンセル扱い
        let outcome = self
            .camera
            .launch(&target)
            .await
            .unwrap_or(CaptureOutcome::Cancelled);

        if outcome == CaptureOutcome::Cancelled {
            self.pictures.discard(&target);
            return Err(ScanError::AcquisitionFailed("capture cancelled".to_string()));
        }

        let image = match image::open(&target) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                self.pictures.discard(&target);
                return Err(ScanError::AcquisitionFailed(format!(
                    "cannot decode {}: {}",
                    target.display(),
                    e
                )));
            }
        };

        tracing::info!(
            "撮影しました: {} ({}x{})",
            target.display(),
            image.width(),
            image.height()
        );
        self.save_to_media_library(&image);

        Ok(image)
    }

    /// ギャラリーで選択された画像を読み込む
    pub fn acquire_from_gallery(&self, selection: Option<&MediaHandle>) -> ScanResult<RgbImage> {
        let handle = selection
            .ok_or_else(|| ScanError::AcquisitionFailed("no image selected".to_string()))?;

        let mut reader = self
            .gallery
            .open(handle)
            .map_err(|e| ScanError::AcquisitionFailed(format!("cannot open {}: {}", handle, e)))?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| ScanError::AcquisitionFailed(format!("cannot read {}: {}", handle, e)))?;

        let image = image::load_from_memory(&bytes)
            .map_err(|e| ScanError::AcquisitionFailed(format!("cannot decode {}: {}", handle, e)))?
            .to_rgb8();

        tracing::info!(
            "ギャラリー画像を読み込みました: {} ({}x{})",
            handle,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    async fn ensure_camera_permission(&self) -> ScanResult<()> {
        if self.permission.has_camera_permission() {
            return Ok(());
        }

        let granted = self
            .permission
            .request_camera_permission()
            .await
            .unwrap_or(false);
        if granted {
            Ok(())
        } else {
            tracing::info!("カメラ権限が拒否されました");
            Err(ScanError::PermissionDenied)
        }
    }

    /// 共有メディアライブラリに保存（失敗しても取得は成功扱い）
    fn save_to_media_library(&self, image: &RgbImage) -> Option<PathBuf> {
        let jpeg = match encode_jpeg(image, MEDIA_JPEG_QUALITY) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                tracing::warn!("JPEGエンコードに失敗しました: {}", e);
                return None;
            }
        };

        match self.media.insert_jpeg(&media_display_name(), &jpeg) {
            Ok(path) => {
                tracing::info!("メディアライブラリに保存しました: {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("メディアライブラリへの保存に失敗しました: {}", e);
                None
            }
        }
    }
}
