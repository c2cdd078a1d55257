//! 撮影画像の保存先
//!
//! - アプリ専用ディレクトリ: `JPEG_<yyyyMMdd_HHmmss>_<random>.jpg`
//! - 共有メディアライブラリ: `<root>/Pictures/IMG_<epoch-millis>.jpg`

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, ImageResult, RgbImage};

use crate::acquire::ports::MediaLibraryPort;

/// メディアライブラリ内の保存カテゴリ
pub const MEDIA_CATEGORY: &str = "Pictures";

/// メディアライブラリへ書き込むJPEGの品質
pub const MEDIA_JPEG_QUALITY: u8 = 100;

const MAX_NAME_ATTEMPTS: usize = 16;

/// アプリ専用の撮影画像ディレクトリ
#[derive(Debug, Clone)]
pub struct PictureStore {
    dir: PathBuf,
}

impl PictureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 撮影先の空ファイルを一意な名前で作成
    pub fn create_image_file(&self) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let time_stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self
                .dir
                .join(format!("JPEG_{}_{}.jpg", time_stamp, rand::random::<u32>()));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not find a free image file name",
        ))
    }

    /// 撮影に失敗したファイルを削除
    pub fn discard(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!("削除しました: {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("ファイルを削除できません ({}): {}", path.display(), e),
        }
    }
}

/// メディアライブラリでの表示名
pub fn media_display_name() -> String {
    format!("IMG_{}.jpg", chrono::Utc::now().timestamp_millis())
}

/// RGB画像をJPEGにエンコード
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> ImageResult<Vec<u8>> {
    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder.encode(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)?;
    Ok(jpeg)
}

/// ディレクトリをメディアライブラリとして扱うアダプタ
#[derive(Debug, Clone)]
pub struct FsMediaLibrary {
    root: PathBuf,
}

impl FsMediaLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn category_dir(&self) -> PathBuf {
        self.root.join(MEDIA_CATEGORY)
    }
}

impl MediaLibraryPort for FsMediaLibrary {
    fn insert_jpeg(&self, display_name: &str, jpeg: &[u8]) -> io::Result<PathBuf> {
        let dir = self.category_dir();
        fs::create_dir_all(&dir)?;

        let path = Path::new(display_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty display name"))?;
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("jpg");

        // 同名がある場合は "(n)" を付ける
        for n in 0..MAX_NAME_ATTEMPTS {
            let name = if n == 0 {
                format!("{}.{}", stem, extension)
            } else {
                format!("{} ({}).{}", stem, n, extension)
            };
            let target = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&target) {
                Ok(file) => {
                    write_or_remove(&target, file, jpeg)?;
                    return Ok(target);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("too many files named {}", display_name),
        ))
    }
}

/// 書き込みに失敗した場合は途中までのファイルを残さない
fn write_or_remove<W: Write>(path: &Path, mut writer: W, bytes: &[u8]) -> io::Result<()> {
    let result = writer.write_all(bytes).and_then(|()| writer.flush());
    if let Err(e) = result {
        drop(writer);
        if let Err(remove_err) = fs::remove_file(path) {
            tracing::warn!("ファイルを削除できません ({}): {}", path.display(), remove_err);
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_create_image_file_naming() {
        let dir = tempfile::tempdir().unwrap();
        let store = PictureStore::new(dir.path().join("Pictures"));

        let path = store.create_image_file().unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();

        assert!(path.exists());
        assert!(name.starts_with("JPEG_"));
        assert!(name.ends_with(".jpg"));
        // JPEG_yyyyMMdd_HHmmss_<random>.jpg
        let parts: Vec<&str> = name.trim_end_matches(".jpg").split('_').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
        assert!(parts[3].parse::<u32>().is_ok());
    }

    #[test]
    fn test_create_image_file_is_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = PictureStore::new(dir.path());

        let a = store.create_image_file().unwrap();
        let b = store.create_image_file().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = PictureStore::new(dir.path());
        let path = store.create_image_file().unwrap();

        store.discard(&path);
        assert!(!path.exists());
        // 2回目は何もしない
        store.discard(&path);
    }

    #[test]
    fn test_media_display_name_format() {
        let name = media_display_name();
        assert!(name.starts_with("IMG_"));
        assert!(name.ends_with(".jpg"));
        assert!(name[4..name.len() - 4].parse::<i64>().is_ok());
    }

    #[test]
    fn test_encode_jpeg_decodes_back() {
        let image = RgbImage::from_pixel(16, 8, Rgb([20, 180, 60]));
        let jpeg = encode_jpeg(&image, MEDIA_JPEG_QUALITY).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_media_library_avoids_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let library = FsMediaLibrary::new(dir.path());

        let first = library.insert_jpeg("IMG_1.jpg", b"one").unwrap();
        let second = library.insert_jpeg("IMG_1.jpg", b"two").unwrap();

        assert_eq!(first, dir.path().join("Pictures").join("IMG_1.jpg"));
        assert_eq!(second, dir.path().join("Pictures").join("IMG_1 (1).jpg"));
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::WriteZero, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_1.jpg");
        fs::write(&path, b"partial").unwrap();

        let err = write_or_remove(&path, BrokenWriter, b"jpeg").unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        assert!(!path.exists());
    }

    #[test]
    fn test_successful_write_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_2.jpg");
        let file = fs::File::create(&path).unwrap();

        write_or_remove(&path, file, b"jpeg").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"jpeg");
    }
}
