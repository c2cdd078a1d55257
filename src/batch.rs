//! ディレクトリ内の画像の一括分類

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::ml::ImageClassifier;
use crate::types::Label;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// 1画像の分類結果（CSVの1行）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    pub file: String,
    pub label: Label,
    pub healthy: f32,
    pub plague: f32,
}

/// 分類対象の画像ファイルをファイル名順で列挙
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut images: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    images.sort();
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// ディレクトリ内の画像をすべて分類
///
/// 読み込みや分類に失敗したファイルはログに出してスキップします。
pub fn classify_directory(classifier: &dyn ImageClassifier, dir: &Path) -> Result<Vec<BatchRow>> {
    let images = collect_images(dir)?;
    tracing::info!("{}枚の画像を分類します: {}", images.len(), dir.display());

    let mut rows = Vec::with_capacity(images.len());
    for path in &images {
        let image = match image::open(path) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                tracing::warn!("画像を読み込めません ({}): {}", path.display(), e);
                continue;
            }
        };

        let scores = match classifier.predict(&image) {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!("分類に失敗しました ({}): {}", path.display(), e);
                continue;
            }
        };

        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::debug!("{}: {}", file, scores.label());

        rows.push(BatchRow {
            file,
            label: scores.label(),
            healthy: scores.healthy(),
            plague: scores.plague(),
        });
    }

    tracing::info!("分類完了: {}/{}", rows.len(), images.len());
    Ok(rows)
}

/// `file,label,healthy,plague` 形式で書き出す
pub fn write_report<W: Write>(rows: &[BatchRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row).context("Failed to write CSV row")?;
    }
    csv_writer.flush().context("Failed to flush CSV")?;
    Ok(())
}

pub fn write_report_file(rows: &[BatchRow], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report: {}", path.display()))?;
    write_report(rows, file)
}
