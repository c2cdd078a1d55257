//! モデルバンドルのメタデータを表示するバイナリ

use std::path::PathBuf;

use mite_detector_lib::model::{read_metadata, DEFAULT_MODEL_FILE};

fn main() {
    let model_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets").join(DEFAULT_MODEL_FILE));

    match read_metadata(&model_path) {
        Ok(metadata) => {
            println!("{}", model_path.display());
            println!("{}", metadata.describe());
            if let Err(e) = metadata.validate() {
                eprintln!("✗ 読み込めないモデルです: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("✗ エラー: {:#}", e);
            std::process::exit(1);
        }
    }
}
