//! Sweeper Module
//!
//! アップロード・出力ディレクトリから古いファイルを定期的に削除するモジュール。
//! 1ファイルの削除失敗はログに記録され、処理は継続されます。

use std::io::ErrorKind;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::XlsxDocError;

/// 削除処理の結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// 削除したファイル数
    pub removed: usize,
    /// 削除に失敗したファイル数
    pub failed: usize,
}

impl AddAssign for SweepReport {
    fn add_assign(&mut self, other: Self) {
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

/// ディレクトリ直下の古いファイルを削除する
///
/// 最終更新からの経過時間が`max_age`を超える通常ファイルが対象です。
/// ディレクトリが存在しない場合は空の結果を返します。
///
/// # 引数
///
/// * `dir` - 対象ディレクトリ
/// * `max_age` - 保持する最大経過時間
pub fn sweep_directory(dir: &Path, max_age: Duration) -> SweepReport {
    let mut report = SweepReport::default();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return report,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to read directory for cleanup");
            return report;
        }
    };

    let now = SystemTime::now();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                report.failed += 1;
                continue;
            }
        };

        let modified = match std::fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata.modified(),
            Ok(_) => continue,
            // 他の処理が先に削除した
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => Err(e),
        };
        let age = match modified {
            Ok(modified) => now.duration_since(modified).unwrap_or_default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read modification time");
                report.failed += 1;
                continue;
            }
        };
        if age <= max_age {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), age_secs = age.as_secs(), "removed expired file");
                report.removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove expired file");
                report.failed += 1;
            }
        }
    }
    report
}

/// 定期削除の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// 対象ディレクトリ
    pub directories: Vec<PathBuf>,
    /// 保持する最大経過時間
    /// デフォルト: 24時間
    pub max_age: Duration,
    /// 削除処理の実行間隔
    /// デフォルト: 1時間
    pub interval: Duration,
}

impl SweepConfig {
    /// デフォルトの保持時間と間隔で設定を生成
    pub fn new<I, P>(directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            directories: directories.into_iter().map(Into::into).collect(),
            max_age: Duration::from_secs(24 * 60 * 60),
            interval: Duration::from_secs(60 * 60),
        }
    }

    /// 保持する最大経過時間を指定する
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// 実行間隔を指定する
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// 設定のすべてのディレクトリを1回削除処理する
pub fn sweep_all(config: &SweepConfig) -> SweepReport {
    let mut total = SweepReport::default();
    for dir in &config.directories {
        total += sweep_directory(dir, config.max_age);
    }
    info!(
        directories = config.directories.len(),
        removed = total.removed,
        failed = total.failed,
        "cleanup sweep completed"
    );
    total
}

/// バックグラウンドで定期削除を行うスレッド
///
/// 開始直後に1回実行し、以降は`interval`ごとに実行します。
/// `stop()`またはドロップでスレッドを停止し、終了を待ちます。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::time::Duration;
/// use xlsxdoc::{CleanupSweeper, SweepConfig};
///
/// # fn main() -> Result<(), xlsxdoc::XlsxDocError> {
/// let config = SweepConfig::new(["uploads", "outputs"]).with_max_age(Duration::from_secs(3600));
/// let sweeper = CleanupSweeper::start(config)?;
/// // ...
/// sweeper.stop();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CleanupSweeper {
    stop_signal: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CleanupSweeper {
    /// 定期削除スレッドを開始する
    ///
    /// # 戻り値
    ///
    /// * `Ok(CleanupSweeper)` - スレッドを開始した場合
    /// * `Err(XlsxDocError::Config)` - 間隔が0、またはスレッドを生成できない場合
    pub fn start(config: SweepConfig) -> Result<Self, XlsxDocError> {
        if config.interval.is_zero() {
            return Err(XlsxDocError::Config(
                "sweep interval must be greater than 0".to_string(),
            ));
        }

        let (stop_signal, stop_receiver) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("xlsxdoc-cleanup".to_string())
            .spawn(move || loop {
                sweep_all(&config);
                match stop_receiver.recv_timeout(config.interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| XlsxDocError::Config(format!("Failed to start cleanup sweeper: {}", e)))?;

        Ok(Self {
            stop_signal: Some(stop_signal),
            handle: Some(handle),
        })
    }

    /// スレッドを停止し、終了を待つ
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(signal) = self.stop_signal.take() {
            // 受信側が終了済みの場合は送信に失敗するが、停止済みなので問題ない
            let _ = signal.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("cleanup sweeper thread panicked");
            }
        }
    }
}

impl Drop for CleanupSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
