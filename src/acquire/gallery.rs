//! ファイルシステム上のギャラリー
//!
//! 選択ハンドルは `file://` URI または通常のパスとして解決します。

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use url::Url;

use crate::acquire::ports::GalleryPort;
use crate::types::MediaHandle;

#[derive(Debug, Clone, Copy, Default)]
pub struct FsGallery;

impl FsGallery {
    /// ハンドルをローカルパスに変換
    pub fn resolve(handle: &MediaHandle) -> io::Result<PathBuf> {
        let raw = handle.as_str().trim();
        if raw.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty media handle"));
        }

        match Url::parse(raw) {
            // "C:\..." はドライブ文字がスキームとして解釈されるためパス扱い
            Ok(url) if url.scheme().len() > 1 => {
                if url.scheme() != "file" {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!("unsupported media scheme: {}", url.scheme()),
                    ));
                }
                url.to_file_path().map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, format!("invalid file URI: {}", raw))
                })
            }
            _ => Ok(PathBuf::from(raw)),
        }
    }
}

impl GalleryPort for FsGallery {
    fn open(&self, handle: &MediaHandle) -> io::Result<Box<dyn Read + Send>> {
        let path = Self::resolve(handle)?;
        Ok(Box::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plain_path() {
        let path = FsGallery::resolve(&MediaHandle::new("photos/leaf.jpg")).unwrap();
        assert_eq!(path, PathBuf::from("photos/leaf.jpg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_file_uri() {
        let path = FsGallery::resolve(&MediaHandle::new("file:///sdcard/DCIM/leaf%201.jpg")).unwrap();
        assert_eq!(path, PathBuf::from("/sdcard/DCIM/leaf 1.jpg"));
    }

    #[test]
    fn test_resolve_rejects_other_schemes() {
        let err = FsGallery::resolve(&MediaHandle::new("content://media/external/images/1")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(FsGallery::resolve(&MediaHandle::new("  ")).is_err());
    }

    #[test]
    fn test_open_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.bin");
        std::fs::write(&path, b"abc").unwrap();

        let mut reader = FsGallery.open(&MediaHandle::new(path.to_string_lossy())).unwrap();
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, b"abc");
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let handle = MediaHandle::new(dir.path().join("missing.jpg").to_string_lossy());
        assert!(FsGallery.open(&handle).is_err());
    }
}
