//! モデルとメタデータの永続化
//!
//! Tar.gz形式でモデルとメタデータを1ファイルに統合して保存・読み込みします。
//!
//! ファイル構成（tar.gz内部）:
//! - metadata.json   - メタデータ（クラスラベル、入力サイズなど）
//! - model.bin       - モデルの重み（Burn BinBytesRecorder、f32精度）

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tar::{Archive, Builder};

use crate::model::model_metadata::ModelMetadata;

const METADATA_ENTRY: &str = "metadata.json";
const WEIGHTS_ENTRY: &str = "model.bin";

/// アプリに同梱されるモデルファイル名
pub const DEFAULT_MODEL_FILE: &str = "persea_mite_detector.tar.gz";

fn append_entry<W: Write>(builder: &mut Builder<W>, name: &str, bytes: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_path(name)?;
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append(&header, bytes)
        .with_context(|| format!("Failed to add {} to tar", name))
}

/// メタデータと重みをtar.gzに書き込む
fn write_archive<W: Write>(writer: W, metadata: &ModelMetadata, model_binary: &[u8]) -> Result<W> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut tar_builder = Builder::new(encoder);

    let json_str = metadata.to_json_string()?;
    append_entry(&mut tar_builder, METADATA_ENTRY, json_str.as_bytes())?;
    append_entry(&mut tar_builder, WEIGHTS_ENTRY, model_binary)?;

    let encoder = tar_builder
        .into_inner()
        .context("Failed to finalize tar archive")?;
    encoder.finish().context("Failed to finish gzip stream")
}

/// バンドルをメモリ上に生成
pub fn bundle_to_bytes(metadata: &ModelMetadata, model_binary: &[u8]) -> Result<Vec<u8>> {
    write_archive(Vec::new(), metadata, model_binary)
}

/// メタデータと共にモデルをTar.gz形式で保存
pub fn write_bundle(output_path: &Path, metadata: &ModelMetadata, model_binary: &[u8]) -> Result<()> {
    // 親ディレクトリが存在しない場合は作成
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory: {:?}", parent))?;
    }

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create bundle file: {:?}", output_path))?;
    let mut file = write_archive(file, metadata, model_binary)?;
    file.flush()?;
    Ok(())
}

/// バンドル（tar.gzのバイト列）からメタデータと重みを読み込む
pub fn read_bundle(bundle: &[u8]) -> Result<(ModelMetadata, Vec<u8>)> {
    let mut archive = Archive::new(GzDecoder::new(bundle));

    let mut metadata_opt: Option<ModelMetadata> = None;
    let mut model_binary_opt: Option<Vec<u8>> = None;

    for entry in archive.entries().context("Not a tar.gz model bundle")? {
        let mut entry = entry.context("Corrupted bundle entry")?;
        let path = entry.path()?.to_string_lossy().into_owned();

        match path.as_str() {
            METADATA_ENTRY => {
                let mut json_str = String::new();
                entry.read_to_string(&mut json_str)?;
                metadata_opt = Some(ModelMetadata::from_json_string(&json_str)?);
            }
            WEIGHTS_ENTRY => {
                let mut buffer = Vec::new();
                entry.read_to_end(&mut buffer)?;
                model_binary_opt = Some(buffer);
            }
            _ => {}
        }
    }

    match (metadata_opt, model_binary_opt) {
        (Some(metadata), Some(binary)) => Ok((metadata, binary)),
        (None, _) => Err(anyhow::anyhow!("metadata.json not found in model bundle")),
        (_, None) => Err(anyhow::anyhow!("model.bin not found in model bundle")),
    }
}

/// バンドルファイルからメタデータのみ読み込む
pub fn read_metadata(bundle_path: &Path) -> Result<ModelMetadata> {
    let file = File::open(bundle_path)
        .with_context(|| format!("Failed to open model bundle: {:?}", bundle_path))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path()?.to_str() == Some(METADATA_ENTRY) {
            let mut json_str = String::new();
            entry.read_to_string(&mut json_str)?;
            return ModelMetadata::from_json_string(&json_str);
        }
    }

    Err(anyhow::anyhow!("metadata.json not found in model bundle"))
}
