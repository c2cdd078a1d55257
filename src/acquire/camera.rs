//! 外部コマンドによる撮影と権限確認のアダプタ

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::acquire::ports::{CameraPort, CaptureOutcome, PermissionPort};

/// 撮影コマンド中の出力先プレースホルダ
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// 撮影コマンド（fswebcam, libcamera-still など）を実行するカメラ
///
/// `launch` は tokio ランタイム上から呼び出す必要があります。
#[derive(Debug, Clone)]
pub struct CommandCamera {
    command: Vec<String>,
}

impl CommandCamera {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// プレースホルダを出力先パスに置換したargv
    pub fn argv_for(&self, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        self.command
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output))
            .collect()
    }
}

impl CameraPort for CommandCamera {
    fn launch(&self, output: &Path) -> oneshot::Receiver<CaptureOutcome> {
        let (tx, rx) = oneshot::channel();
        let argv = self.argv_for(output);
        let output = output.to_path_buf();

        tokio::spawn(async move {
            let outcome = run_capture(argv, output).await;
            // 受信側が既に無い場合は結果を捨てる
            let _ = tx.send(outcome);
        });

        rx
    }
}

async fn run_capture(argv: Vec<String>, output: PathBuf) -> CaptureOutcome {
    let Some((program, args)) = argv.split_first() else {
        tracing::warn!("撮影コマンドが設定されていません");
        return CaptureOutcome::Cancelled;
    };

    tracing::debug!("撮影コマンド: {}", argv.join(" "));
    match tokio::process::Command::new(program).args(args).status().await {
        Ok(status) if status.success() => {
            let written = tokio::fs::metadata(&output)
                .await
                .map(|m| m.len() > 0)
                .unwrap_or(false);
            if written {
                CaptureOutcome::Saved
            } else {
                tracing::info!("撮影コマンドは画像を書き込みませんでした");
                CaptureOutcome::Cancelled
            }
        }
        Ok(status) => {
            tracing::info!("撮影が完了しませんでした ({})", status);
            CaptureOutcome::Cancelled
        }
        Err(e) => {
            tracing::warn!("撮影コマンドを起動できません ({}): {}", program, e);
            CaptureOutcome::Cancelled
        }
    }
}

/// 固定の回答を返す権限（設定の auto_grant 用）
#[derive(Debug, Clone, Copy)]
pub struct PresetPermission(pub bool);

impl PermissionPort for PresetPermission {
    fn has_camera_permission(&self) -> bool {
        self.0
    }

    fn request_camera_permission(&self) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(self.0);
        rx
    }
}

/// 端末で y/N を尋ねる権限ダイアログ
///
/// 一度許可されるとプロセス終了まで許可を保持します。
#[derive(Debug, Clone, Default)]
pub struct ConsolePermission {
    granted: Arc<AtomicBool>,
}

impl ConsolePermission {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PermissionPort for ConsolePermission {
    fn has_camera_permission(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request_camera_permission(&self) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        let granted = self.granted.clone();

        tokio::task::spawn_blocking(move || {
            let answer = prompt_yes_no("Allow camera access? [y/N] ");
            if answer {
                granted.store(true, Ordering::SeqCst);
            }
            let _ = tx.send(answer);
        });

        rx
    }
}

fn prompt_yes_no(question: &str) -> bool {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "{}", question);
    let _ = stderr.flush();

    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => parse_yes(&line),
        Err(_) => false,
    }
}

fn parse_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_replaces_placeholder() {
        let camera = CommandCamera::new(vec![
            "libcamera-still".to_string(),
            "-o".to_string(),
            "{output}".to_string(),
        ]);

        let argv = camera.argv_for(Path::new("/tmp/JPEG_1.jpg"));
        assert_eq!(argv, vec!["libcamera-still", "-o", "/tmp/JPEG_1.jpg"]);
    }

    #[test]
    fn test_parse_yes() {
        assert!(parse_yes("y\n"));
        assert!(parse_yes(" YES "));
        assert!(!parse_yes("\n"));
        assert!(!parse_yes("no"));
    }

    #[tokio::test]
    async fn test_preset_permission() {
        assert!(PresetPermission(true).request_camera_permission().await.unwrap());
        assert!(!PresetPermission(false).has_camera_permission());
    }

    #[tokio::test]
    async fn test_empty_command_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let camera = CommandCamera::new(Vec::new());

        let outcome = camera.launch(&dir.path().join("x.jpg")).await.unwrap();
        assert_eq!(outcome, CaptureOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_missing_program_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let camera = CommandCamera::new(vec!["definitely-not-a-camera-binary".to_string()]);

        let outcome = camera.launch(&dir.path().join("x.jpg")).await.unwrap();
        assert_eq!(outcome, CaptureOutcome::Cancelled);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_writing_file_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("shot.jpg");
        let camera = CommandCamera::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf data > \"$0\"".to_string(),
            "{output}".to_string(),
        ]);

        let outcome = camera.launch(&target).await.unwrap();
        assert_eq!(outcome, CaptureOutcome::Saved);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_without_output_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let camera = CommandCamera::new(vec!["true".to_string()]);

        let outcome = camera.launch(&dir.path().join("never.jpg")).await.unwrap();
        assert_eq!(outcome, CaptureOutcome::Cancelled);
    }
}
