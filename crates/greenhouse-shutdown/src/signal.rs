use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

/// 关闭信号类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM - 优雅关闭
    Term,

    /// SIGINT - Ctrl+C
    Interrupt,

    /// 手动触发
    Manual,
}

/// 关闭信号控制器
///
/// 每个长循环持有一个监听器，收到信号后退出
#[derive(Clone)]
pub struct ShutdownController {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { shutdown_tx: tx }
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.shutdown_tx.subscribe(),
        }
    }

    /// 手动触发关闭
    pub fn trigger(&self) {
        info!("Manual shutdown triggered");
        let _ = self.shutdown_tx.send(ShutdownSignal::Manual);
    }

    /// 等待系统信号并广播给所有监听器
    #[cfg(unix)]
    pub async fn listen_for_system_signal(&self) -> ShutdownSignal {
        use signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");

        let received = tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
                ShutdownSignal::Term
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
                ShutdownSignal::Interrupt
            }
        };
        let _ = self.shutdown_tx.send(received);
        received
    }

    /// 等待系统信号（Windows 版本）
    #[cfg(not(unix))]
    pub async fn listen_for_system_signal(&self) -> ShutdownSignal {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C");
        let _ = self.shutdown_tx.send(ShutdownSignal::Interrupt);
        ShutdownSignal::Interrupt
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// 单个任务持有的关闭信号监听器
pub struct ShutdownListener {
    rx: broadcast::Receiver<ShutdownSignal>,
}

impl ShutdownListener {
    /// 等待关闭信号
    ///
    /// 控制器被丢弃时视为手动关闭
    pub async fn recv(&mut self) -> ShutdownSignal {
        self.rx.recv().await.unwrap_or(ShutdownSignal::Manual)
    }
}
