//! CLI コマンドの実装
//!
//! 各コマンドは設定からセッションを組み立て、結果を標準出力に書き出します。

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::acquire::{
    Acquirer, CommandCamera, ConsolePermission, FsGallery, FsMediaLibrary, PermissionPort,
    PictureStore, PresetPermission,
};
use crate::batch::{classify_directory, write_report, write_report_file};
use crate::ml::{save_random_bundle, CpuBackend, Engine, ModelSlot};
use crate::model::{read_metadata, AppConfig, ModelMetadata};
use crate::session::{ScanSession, View};
use crate::types::MediaHandle;

/// 出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// 設定されたモデルを読み込む（失敗時は Unavailable）
pub fn load_model(config: &AppConfig) -> ModelSlot {
    let device_type = config.device_type;
    ModelSlot::load_file(Path::new(&config.model.model_path), |bytes| {
        Engine::load(bytes, device_type)
    })
}

fn permission_for(config: &AppConfig) -> Arc<dyn PermissionPort> {
    if config.camera.auto_grant {
        Arc::new(PresetPermission(true))
    } else {
        Arc::new(ConsolePermission::new())
    }
}

/// 設定からアダプタを組み立てる
pub fn build_acquirer(config: &AppConfig) -> Acquirer {
    Acquirer::new(
        PictureStore::new(&config.storage.pictures_dir),
        Arc::new(CommandCamera::new(config.camera.command.clone())),
        permission_for(config),
        Arc::new(FsGallery),
        Arc::new(FsMediaLibrary::new(&config.storage.media_library_dir)),
    )
}

pub fn build_session(config: &AppConfig) -> ScanSession {
    ScanSession::new(build_acquirer(config), load_model(config))
}

/// 画面を表示用テキストにする
pub fn render_view(view: &View, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(view).context("Failed to serialize view");
    }

    let text = match view {
        View::Acquiring { notice } => {
            let mut lines = Vec::new();
            if let Some(notice) = notice {
                lines.push(format!("! {}", notice));
            }
            lines.push("Take a picture or select one from the gallery.".to_string());
            lines.join("\n")
        }
        View::ShowingResult(result) => format!(
            "{}\n  source: {} ({}x{})\n  Healthy: {:.4}\n  Plague:  {:.4}",
            result.caption(),
            result.source,
            result.image.width(),
            result.image.height(),
            result.scores.healthy(),
            result.scores.plague(),
        ),
    };
    Ok(text)
}

/// `camera`: 撮影して分類
pub async fn run_camera(config: &AppConfig, format: OutputFormat) -> Result<String> {
    let mut session = build_session(config);
    let view = session.take_picture().await;
    render_view(view, format)
}

/// `gallery`: 選択画像を分類
pub fn run_gallery(config: &AppConfig, handle: &str, format: OutputFormat) -> Result<String> {
    let mut session = build_session(config);
    let handle = MediaHandle::new(handle);
    let view = session.pick_from_gallery(Some(&handle));
    render_view(view, format)
}

/// `batch`: ディレクトリ内の画像を一括分類
pub fn run_batch(
    config: &AppConfig,
    dir: &Path,
    report: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let model = load_model(config);
    let classifier = model.classifier()?;
    let rows = classify_directory(classifier, dir)?;

    if let Some(report) = report {
        write_report_file(&rows, report)?;
        tracing::info!("レポートを保存しました: {}", report.display());
    }

    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&rows).context("Failed to serialize rows"),
        OutputFormat::Text => {
            let mut out = Vec::new();
            write_report(&rows, &mut out)?;
            Ok(String::from_utf8_lossy(&out).trim_end().to_string())
        }
    }
}

/// `init-model`: ランダム初期化したモデルバンドルを作成
pub fn run_init_model(output: &Path, base_filters: usize) -> Result<String> {
    let metadata = ModelMetadata::two_class(base_filters);
    save_random_bundle::<CpuBackend>(output, &metadata, &Default::default())
        .with_context(|| format!("Failed to create model bundle: {}", output.display()))?;
    tracing::info!("モデルバンドルを作成しました: {}", output.display());

    Ok(format!("{}\n{}", output.display(), metadata.describe()))
}

/// `info`: 設定とモデルの情報
pub fn run_info(config: &AppConfig) -> Result<String> {
    let model_path = PathBuf::from(&config.model.model_path);
    let model = match read_metadata(&model_path) {
        Ok(metadata) => metadata.describe(),
        Err(e) => format!("Model unavailable: {:#}", e),
    };
    Ok(format!("{}\n{}", config.describe(), model))
}

/// 対話セッションのコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    TakePicture,
    Gallery(Option<String>),
    Return,
    Help,
    Quit,
    Unknown(String),
}

fn parse_action(line: &str) -> Action {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command.to_ascii_lowercase().as_str() {
        "take" | "camera" | "c" => Action::TakePicture,
        "gallery" | "g" => Action::Gallery((!rest.is_empty()).then(|| rest.to_string())),
        "return" | "r" => Action::Return,
        "help" | "h" | "?" => Action::Help,
        "quit" | "exit" | "q" => Action::Quit,
        _ => Action::Unknown(line.to_string()),
    }
}

const HELP: &str = "commands: take | gallery <path-or-uri> | return | help | quit";

async fn read_line() -> Result<Option<String>> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        Ok::<_, std::io::Error>((read > 0).then_some(line))
    })
    .await
    .context("stdin reader task failed")?
    .context("Failed to read stdin")
}

/// `interactive`: 端末上の2画面セッション
pub async fn run_interactive(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let mut session = build_session(config);
    let mut stdout = std::io::stdout();

    writeln!(stdout, "{}", render_view(session.view(), format)?)?;
    writeln!(stdout, "{}", HELP)?;

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let Some(line) = read_line().await? else {
            break;
        };

        let view = match parse_action(&line) {
            Action::TakePicture => session.take_picture().await,
            Action::Gallery(handle) => {
                let handle = handle.map(MediaHandle::new);
                session.pick_from_gallery(handle.as_ref())
            }
            Action::Return => session.return_to_menu(),
            Action::Help => {
                writeln!(stdout, "{}", HELP)?;
                continue;
            }
            Action::Quit => break,
            Action::Unknown(input) => {
                if !input.is_empty() {
                    writeln!(stdout, "unknown command: {}", input)?;
                }
                continue;
            }
        };

        writeln!(stdout, "{}", render_view(view, format)?)?;
    }

    Ok(())
}
