use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// 关闭信号类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM
    Term,

    /// SIGINT - Ctrl+C
    Interrupt,

    /// 手动触发
    Manual,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Term => "SIGTERM",
            Self::Interrupt => "SIGINT",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// 信号处理器
///
/// 轮询循环与 HTTP 服务各自订阅同一个广播通道
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    triggered: Arc<AtomicBool>,
}

impl SignalHandler {
    pub fn new() -> (Self, broadcast::Receiver<ShutdownSignal>) {
        let (tx, rx) = broadcast::channel(16);
        let handler = Self {
            shutdown_tx: tx,
            triggered: Arc::new(AtomicBool::new(false)),
        };
        (handler, rx)
    }

    fn broadcast(&self, signal: ShutdownSignal) {
        self.triggered.store(true, Ordering::SeqCst);
        // 没有订阅者时发送失败，可以忽略
        let _ = self.shutdown_tx.send(signal);
    }

    /// 等待系统信号并广播
    #[cfg(unix)]
    pub async fn wait_for_system_signal(&self) -> io::Result<ShutdownSignal> {
        use signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let received = tokio::select! {
            _ = sigterm.recv() => ShutdownSignal::Term,
            _ = sigint.recv() => ShutdownSignal::Interrupt,
        };

        info!(signal = %received, "Received shutdown signal");
        self.broadcast(received);
        Ok(received)
    }

    /// 等待系统信号并广播（非 unix 平台只支持 Ctrl+C）
    #[cfg(not(unix))]
    pub async fn wait_for_system_signal(&self) -> io::Result<ShutdownSignal> {
        signal::ctrl_c().await?;
        info!(signal = %ShutdownSignal::Interrupt, "Received shutdown signal");
        self.broadcast(ShutdownSignal::Interrupt);
        Ok(ShutdownSignal::Interrupt)
    }

    /// 手动触发关闭
    pub fn trigger_shutdown(&self) {
        info!("Manual shutdown triggered");
        self.broadcast(ShutdownSignal::Manual);
    }

    /// 是否已经触发过关闭
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_tx.subscribe()
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new().0
    }
}

/// 等待关闭信号
///
/// 发送端全部释放也视为关闭
pub async fn wait_for_shutdown(rx: &mut broadcast::Receiver<ShutdownSignal>) -> ShutdownSignal {
    loop {
        match rx.recv().await {
            Ok(signal) => return signal,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Shutdown receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return ShutdownSignal::Manual,
        }
    }
}
