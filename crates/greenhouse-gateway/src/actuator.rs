use crate::error::ControlError;
use anyhow::{bail, Context};
use greenhouse_config::{ActuatorEndpoint, ControlConfig};
use greenhouse_types::{wire, Ack, Command};
use std::collections::HashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

/// 执行器路由
///
/// 端点注册表启动后只读，无需同步。每次控制调用使用
/// 短连接：写入一条 Command，读取一条 Ack，连接随即关闭。
pub struct ActuatorRouter {
    endpoints: HashMap<String, ActuatorEndpoint>,
    control: ControlConfig,
}

impl ActuatorRouter {
    pub fn new(endpoints: HashMap<String, ActuatorEndpoint>, control: ControlConfig) -> Self {
        Self { endpoints, control }
    }

    /// 已注册的执行器名称（调试与日志用）
    pub fn actuator_names(&self) -> Vec<&str> {
        self.endpoints.keys().map(String::as_str).collect()
    }

    /// 查询接口的写入口
    ///
    /// 先校验名称与数值再路由：未知执行器不产生任何网络
    /// 调用，非有限数值不会转发给远端
    pub async fn set_actuator(&self, name: &str, value: f64) -> Result<String, ControlError> {
        let endpoint = self
            .endpoints
            .get(name)
            .ok_or_else(|| ControlError::UnknownActuator(name.to_string()))?;

        if !value.is_finite() {
            return Err(ControlError::InvalidValue(value));
        }

        self.send(name, endpoint, value).await
    }

    /// 发出控制调用，有界重试
    ///
    /// 每次尝试整体受单次调用超时约束，不会无限期占用
    /// 请求上下文
    async fn send(
        &self,
        name: &str,
        endpoint: &ActuatorEndpoint,
        value: f64,
    ) -> Result<String, ControlError> {
        let payload = wire::encode_command(&Command::set(name, value));

        let mut attempt = 0u32;
        loop {
            let reason = match timeout(
                self.control.request_timeout(),
                Self::call(endpoint, &payload),
            )
            .await
            {
                Ok(Ok(ack)) => {
                    info!(
                        actuator = name,
                        value,
                        status = %ack.status,
                        "Actuator command acknowledged"
                    );
                    return Ok(ack.status);
                }
                Ok(Err(e)) => format!("{e:#}"),
                Err(_) => format!(
                    "request timed out after {:?}",
                    self.control.request_timeout()
                ),
            };

            if attempt >= self.control.max_retries {
                return Err(ControlError::Route {
                    actuator: name.to_string(),
                    reason,
                });
            }

            attempt += 1;
            warn!(
                actuator = name,
                attempt,
                max_retries = self.control.max_retries,
                reason = %reason,
                "Actuator call failed, retrying"
            );
            tokio::time::sleep(self.control.retry_backoff()).await;
        }
    }

    /// 单次控制调用
    ///
    /// 写端半关闭标记请求结束，远端以 EOF 标记应答结束
    async fn call(endpoint: &ActuatorEndpoint, payload: &[u8]) -> anyhow::Result<Ack> {
        let mut stream = TcpStream::connect(endpoint.address())
            .await
            .with_context(|| format!("connect to {}", endpoint.address()))?;

        stream.write_all(payload).await.context("send command")?;
        stream.shutdown().await.context("close write half")?;

        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .await
            .context("read acknowledgement")?;
        if response.is_empty() {
            bail!("connection closed without acknowledgement");
        }

        Ok(wire::decode_ack(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn router_with(endpoints: HashMap<String, ActuatorEndpoint>, control: ControlConfig) -> ActuatorRouter {
        ActuatorRouter::new(endpoints, control)
    }

    fn no_retry() -> ControlConfig {
        ControlConfig {
            request_timeout_secs: 1,
            max_retries: 0,
            retry_backoff_ms: 10,
        }
    }

    fn endpoint(port: u16) -> ActuatorEndpoint {
        ActuatorEndpoint {
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    /// 接受一个连接，校验 Command，回 Ack
    async fn fake_actuator(listener: TcpListener, status: &str) {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        stream.read_to_end(&mut request).await.unwrap();

        let command = wire::decode_command(&request).unwrap();
        assert_eq!(command.command, "SET");

        let ack = wire::encode_ack(&Ack {
            status: status.to_string(),
        });
        stream.write_all(&ack).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_actuator_makes_no_network_call() {
        let router = router_with(HashMap::new(), no_retry());

        let err = router.set_actuator("unknown_actuator", 5.0).await.unwrap_err();
        assert!(matches!(err, ControlError::UnknownActuator(name) if name == "unknown_actuator"));
    }

    #[tokio::test]
    async fn test_non_finite_value_rejected_before_send() {
        // 端点指向未监听的地址：校验失败时不应触达网络
        let mut endpoints = HashMap::new();
        endpoints.insert("actuator_temperature".to_string(), endpoint(1));
        let router = router_with(endpoints, no_retry());

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = router.set_actuator("actuator_temperature", value).await.unwrap_err();
            assert!(matches!(err, ControlError::InvalidValue(_)));
        }
    }

    #[tokio::test]
    async fn test_successful_call_returns_ack_text() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(fake_actuator(listener, "Success"));

        let mut endpoints = HashMap::new();
        endpoints.insert("actuator_light".to_string(), endpoint(port));
        let router = router_with(endpoints, no_retry());

        let status = router.set_actuator("actuator_light", 75.0).await.unwrap();
        assert_eq!(status, "Success");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_connection_surfaces_route_error() {
        // 绑定后立即释放端口，连接必然被拒绝
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut endpoints = HashMap::new();
        endpoints.insert("actuator_humidity".to_string(), endpoint(port));
        let router = router_with(endpoints, no_retry());

        let err = router.set_actuator("actuator_humidity", 50.0).await.unwrap_err();
        assert!(matches!(err, ControlError::Route { actuator, .. } if actuator == "actuator_humidity"));
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // 第一个连接直接断开，第二次尝试成功
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
            fake_actuator(listener, "Success").await;
        });

        let mut endpoints = HashMap::new();
        endpoints.insert("actuator_light".to_string(), endpoint(port));
        let router = router_with(
            endpoints,
            ControlConfig {
                request_timeout_secs: 1,
                max_retries: 2,
                retry_backoff_ms: 10,
            },
        );

        let status = router.set_actuator("actuator_light", 60.0).await.unwrap();
        assert_eq!(status, "Success");
        server.await.unwrap();
    }
}
