use crate::state::GatewayState;
use greenhouse_config::{BrokerConfig, TelemetryConfig};
use greenhouse_shutdown::ShutdownListener;
use greenhouse_types::{wire, SensorClass, SensorReading};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 遥测聚合器（队列消费者）
///
/// 订阅每个传感器类别的队列，解码消息并写入共享状态。
/// 新读数的唯一写入方。摄取路径的任何失败都在这里消化，
/// 查询方最多看到陈旧或空的缓冲区。
pub struct Aggregator {
    state: Arc<GatewayState>,
    broker: BrokerConfig,
    reconnect_backoff: Duration,
}

impl Aggregator {
    pub fn new(
        state: Arc<GatewayState>,
        broker: BrokerConfig,
        telemetry: &TelemetryConfig,
    ) -> Self {
        Self {
            state,
            broker,
            reconnect_backoff: telemetry.reconnect_backoff(),
        }
    }

    /// 运行消费循环，收到关闭信号后退出
    ///
    /// 代理连接失败时退避后继续轮询，消费循环永不因
    /// 输入错误而终止
    pub async fn run(self, mut shutdown: ShutdownListener) {
        let mut options = MqttOptions::new(
            self.broker.client_id.clone(),
            self.broker.host.clone(),
            self.broker.port,
        );
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(options, 64);

        info!(
            broker = %format!("{}:{}", self.broker.host, self.broker.port),
            "Aggregator started, listening for sensor updates"
        );

        loop {
            tokio::select! {
                signal = shutdown.recv() => {
                    info!(?signal, "Aggregator stopping");
                    return;
                }
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connected to broker, subscribing to sensor queues");
                        for class in SensorClass::ALL {
                            if let Err(e) = client.subscribe(class.queue(), QoS::AtLeastOnce).await {
                                error!(queue = class.queue(), error = %e, "Failed to subscribe");
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        self.process_message(&publish.topic, &publish.payload).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "Broker connection error, backing off");
                        tokio::select! {
                            signal = shutdown.recv() => {
                                info!(?signal, "Aggregator stopping during backoff");
                                return;
                            }
                            _ = tokio::time::sleep(self.reconnect_backoff) => {}
                        }
                    }
                }
            }
        }
    }

    /// 处理一条队列消息
    ///
    /// 解码失败只丢弃该条消息；未知设备名不路由到任何
    /// 缓冲区
    pub async fn process_message(&self, queue: &str, payload: &[u8]) {
        let status = match wire::decode_device_status(payload) {
            Ok(status) => status,
            Err(e) => {
                warn!(queue, error = %e, "Dropping malformed telemetry message");
                return;
            }
        };

        debug!(
            queue,
            device_id = status.device_id,
            name = %status.name,
            value = status.value,
            unit = %status.unit,
            "Telemetry message received"
        );

        match SensorClass::from_device_name(&status.name) {
            Some(class) => {
                let reading = SensorReading::from_status(&status);
                self.state.ingest(class, reading).await;
            }
            None => {
                debug!(name = %status.name, "No buffer for device name, dropping reading");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenhouse_types::DeviceStatus;

    fn aggregator() -> (Arc<GatewayState>, Aggregator) {
        let state = Arc::new(GatewayState::new(20));
        let agg = Aggregator::new(
            state.clone(),
            BrokerConfig::default(),
            &TelemetryConfig::default(),
        );
        (state, agg)
    }

    fn status_payload(name: &str, value: f64) -> Vec<u8> {
        wire::encode_device_status(&DeviceStatus {
            device_id: 1,
            name: name.to_string(),
            value,
            unit: "C".to_string(),
        })
    }

    #[tokio::test]
    async fn test_valid_message_lands_in_matching_buffer() {
        let (state, agg) = aggregator();

        agg.process_message(
            "queue_sensor_temperature",
            &status_payload("sensor_temperature", 23.456),
        )
        .await;

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.temperature_sensor.len(), 1);
        let reading = &snapshot.temperature_sensor[0];
        assert_eq!(reading.id, 1);
        assert_eq!(reading.value, "23.46");
        assert_eq!(reading.unit, "C");
        assert_eq!(reading.name, "sensor_temperature");
    }

    #[tokio::test]
    async fn test_malformed_message_dropped() {
        let (state, agg) = aggregator();

        agg.process_message("queue_sensor_temperature", &[0xff, 0x02, 0x99]).await;

        let snapshot = state.snapshot().await;
        assert!(snapshot.temperature_sensor.is_empty());
        assert!(snapshot.light_sensor.is_empty());
        assert!(snapshot.humidity_sensor.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_device_name_is_noop() {
        let (state, agg) = aggregator();

        agg.process_message("queue_sensor_co2", &status_payload("sensor_co2", 400.0))
            .await;

        let snapshot = state.snapshot().await;
        assert!(snapshot.temperature_sensor.is_empty());
        assert!(snapshot.light_sensor.is_empty());
        assert!(snapshot.humidity_sensor.is_empty());
    }

    #[tokio::test]
    async fn test_routing_follows_device_name_not_queue() {
        // 传输层不保证路由键与负载一致，以负载中的名称为准
        let (state, agg) = aggregator();

        agg.process_message(
            "queue_sensor_temperature",
            &status_payload("sensor_light", 80.0),
        )
        .await;

        let snapshot = state.snapshot().await;
        assert!(snapshot.temperature_sensor.is_empty());
        assert_eq!(snapshot.light_sensor.len(), 1);
    }
}
