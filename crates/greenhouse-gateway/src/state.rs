use greenhouse_types::{SensorClass, SensorReading};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// 单个传感器类别的缓冲区与新鲜度时钟
///
/// 两者始终在同一把锁下更新：聚合器的追加和失效监视器的
/// 清空互斥，快照读只会看到完整的写入
struct ClassEntry {
    readings: VecDeque<SensorReading>,
    last_update: Instant,
}

/// 网关共享状态
///
/// 进程级状态，启动时创建，由聚合器（写）、失效监视器
/// （超时写，平时读）和查询接口（只读）并发访问
pub struct GatewayState {
    capacity: usize,
    temperature: RwLock<ClassEntry>,
    light: RwLock<ClassEntry>,
    humidity: RwLock<ClassEntry>,
}

impl GatewayState {
    /// 创建网关状态
    ///
    /// 新鲜度时钟初始化为当前时刻，避免启动后第一个检测
    /// 周期就误清空
    pub fn new(capacity: usize) -> Self {
        let entry = || {
            RwLock::new(ClassEntry {
                readings: VecDeque::with_capacity(capacity),
                last_update: Instant::now(),
            })
        };
        Self {
            capacity,
            temperature: entry(),
            light: entry(),
            humidity: entry(),
        }
    }

    fn entry(&self, class: SensorClass) -> &RwLock<ClassEntry> {
        match class {
            SensorClass::Temperature => &self.temperature,
            SensorClass::Light => &self.light,
            SensorClass::Humidity => &self.humidity,
        }
    }

    /// 追加一条读数并刷新该类别的新鲜度时钟
    ///
    /// 超过容量时按 FIFO 淘汰最旧的读数
    pub async fn ingest(&self, class: SensorClass, reading: SensorReading) {
        let mut entry = self.entry(class).write().await;
        entry.readings.push_back(reading);
        while entry.readings.len() > self.capacity {
            entry.readings.pop_front();
        }
        entry.last_update = Instant::now();
    }

    /// 返回所有缓冲区的一致性快照（按插入顺序，最旧在前）
    ///
    /// 写时复制：快照不受后续写入影响，除每类别短临界区外
    /// 不阻塞
    pub async fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            temperature_sensor: self.copy_class(SensorClass::Temperature).await,
            light_sensor: self.copy_class(SensorClass::Light).await,
            humidity_sensor: self.copy_class(SensorClass::Humidity).await,
        }
    }

    async fn copy_class(&self, class: SensorClass) -> Vec<SensorReading> {
        let entry = self.entry(class).read().await;
        entry.readings.iter().cloned().collect()
    }

    /// 清空超过失效超时仍无遥测的类别缓冲区
    ///
    /// 时钟被重置为当前时刻，持续静默时不会每个周期重复
    /// 清空。返回被清空的类别。
    pub async fn clear_stale(&self, timeout: Duration) -> Vec<SensorClass> {
        let mut cleared = Vec::new();
        for class in SensorClass::ALL {
            let mut entry = self.entry(class).write().await;
            if entry.last_update.elapsed() > timeout {
                if !entry.readings.is_empty() {
                    entry.readings.clear();
                    cleared.push(class);
                } else {
                    debug!(class = ?class, "Silent class already empty");
                }
                entry.last_update = Instant::now();
            }
        }
        cleared
    }

    /// 当前缓冲区长度（测试与监控用）
    pub async fn len(&self, class: SensorClass) -> usize {
        self.entry(class).read().await.readings.len()
    }
}

/// 查询接口返回的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub temperature_sensor: Vec<SensorReading>,
    pub light_sensor: Vec<SensorReading>,
    pub humidity_sensor: Vec<SensorReading>,
}
