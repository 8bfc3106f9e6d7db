use crate::state::GatewayState;
use greenhouse_config::TelemetryConfig;
use greenhouse_shutdown::ShutdownListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// 失效监视器
///
/// 周期性检测每个类别的遥测静默，超时后整体清空缓冲区。
/// 过期的缓存读数比没有数据更糟：清空后查询方看到
/// "不可用"，而不是冻结的旧值。除 FIFO 淘汰外，只有
/// 这里允许清空缓冲区。
pub struct StalenessMonitor {
    state: Arc<GatewayState>,
    timeout: Duration,
    check_interval: Duration,
}

impl StalenessMonitor {
    pub fn new(state: Arc<GatewayState>, telemetry: &TelemetryConfig) -> Self {
        Self {
            state,
            timeout: telemetry.staleness_timeout(),
            check_interval: telemetry.check_interval(),
        }
    }

    /// 运行检测循环，收到关闭信号后退出
    pub async fn run(self, mut shutdown: ShutdownListener) {
        info!(
            timeout = ?self.timeout,
            check_interval = ?self.check_interval,
            "Staleness monitor started"
        );

        let mut ticker = interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // 第一个 tick 立即完成，跳过避免启动即检测
        ticker.tick().await;

        loop {
            tokio::select! {
                signal = shutdown.recv() => {
                    info!(?signal, "Staleness monitor stopping");
                    return;
                }
                _ = ticker.tick() => {
                    for class in self.state.clear_stale(self.timeout).await {
                        warn!(
                            class = class.device_name(),
                            timeout = ?self.timeout,
                            "No telemetry within timeout, buffer cleared"
                        );
                    }
                }
            }
        }
    }
}
