//! ログ初期化
//!
//! `tracing` の fmt サブスクライバを設定します。バイナリ起動時に一度だけ呼び出してください。

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 表示する最小レベル
    pub level: Level,
    /// モジュールパスを表示するか
    pub include_target: bool,
    /// ANSIカラーを使うか
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            include_target: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// デバッグ用の詳細設定
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            include_target: true,
            ansi_colors: true,
        }
    }

    /// 対話モード・JSON出力用（警告以上のみ）
    pub fn quiet() -> Self {
        Self {
            level: Level::WARN,
            include_target: false,
            ansi_colors: true,
        }
    }
}

/// グローバルサブスクライバを設定
///
/// 既に設定済みの場合はエラーを返します。
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level)
        .with_target(config.include_target)
        .with_ansi(config.ansi_colors)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}
