use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 网关全局配置
///
/// 进程启动时加载，运行期间不可变
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub broker: BrokerConfig,
    pub api: ApiConfig,
    pub telemetry: TelemetryConfig,
    pub control: ControlConfig,
    /// 执行器名称 -> 控制端点，启动后只读
    pub actuators: HashMap<String, ActuatorEndpoint>,
}

/// 消息代理配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
}

/// 查询接口配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// 遥测缓冲与失效检测配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// 每个类别缓冲区容量
    pub buffer_capacity: usize,
    /// 超过该时长未收到遥测即视为失效（秒）
    pub staleness_timeout_secs: u64,
    /// 失效检测周期（秒）
    pub check_interval_secs: u64,
    /// 代理连接失败后的重连退避（秒）
    pub reconnect_backoff_secs: u64,
}

/// 执行器控制调用配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// 单次控制调用超时（秒），必须有限
    pub request_timeout_secs: u64,
    /// 失败后的有界重试次数
    pub max_retries: u32,
    /// 重试间隔（毫秒）
    pub retry_backoff_ms: u64,
}

/// 执行器控制端点地址
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActuatorEndpoint {
    pub host: String,
    pub port: u16,
}

impl ActuatorEndpoint {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TelemetryConfig {
    pub fn staleness_timeout(&self) -> Duration {
        Duration::from_secs(self.staleness_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }
}

impl ControlConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut actuators = HashMap::new();
        for (name, port) in [
            ("actuator_temperature", 40011),
            ("actuator_light", 40012),
            ("actuator_humidity", 40013),
        ] {
            actuators.insert(
                name.to_string(),
                ActuatorEndpoint {
                    host: "localhost".to_string(),
                    port,
                },
            );
        }

        Self {
            broker: BrokerConfig::default(),
            api: ApiConfig::default(),
            telemetry: TelemetryConfig::default(),
            control: ControlConfig::default(),
            actuators,
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "greenhouse-gateway".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 20,
            staleness_timeout_secs: 10,
            check_interval_secs: 10,
            reconnect_backoff_secs: 5,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 5,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gateway_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.telemetry.buffer_capacity, 20);
        assert_eq!(config.telemetry.staleness_timeout_secs, 10);
        assert_eq!(config.control.request_timeout_secs, 5);
        assert_eq!(config.actuators.len(), 3);
        assert!(config.actuators.contains_key("actuator_light"));
    }

    #[test]
    fn test_endpoint_address() {
        let endpoint = ActuatorEndpoint {
            host: "localhost".to_string(),
            port: 40012,
        };
        assert_eq!(endpoint.address(), "localhost:40012");
    }
}
