use anyhow::Context;
use clap::{Parser, Subcommand};
use greenhouse_types::{wire, Ack, DeviceStatus};
use rand::Rng;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Greenhouse device simulator", long_about = None)]
struct Args {
    #[command(subcommand)]
    device: Device,
}

#[derive(Subcommand, Debug)]
enum Device {
    /// 周期性发布随机游走遥测的传感器
    Sensor {
        /// 设备名称，例如 sensor_temperature
        #[arg(long)]
        name: String,
        #[arg(long)]
        id: u32,
        #[arg(long)]
        unit: String,
        /// 初始值
        #[arg(long, default_value_t = 25.0)]
        value: f64,
        #[arg(long, default_value = "localhost")]
        broker_host: String,
        #[arg(long, default_value_t = 1883)]
        broker_port: u16,
        /// 上报间隔（秒）
        #[arg(long, default_value_t = 2)]
        interval_secs: u64,
    },
    /// 应答设定值的执行器控制端点
    Actuator {
        /// 执行器名称，例如 actuator_light
        #[arg(long)]
        name: String,
        #[arg(long)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Args::parse().device {
        Device::Sensor {
            name,
            id,
            unit,
            value,
            broker_host,
            broker_port,
            interval_secs,
        } => {
            run_sensor(
                name,
                id,
                unit,
                value,
                &broker_host,
                broker_port,
                Duration::from_secs(interval_secs),
            )
            .await
        }
        Device::Actuator { name, port } => run_actuator(name, port).await,
    }
}

/// 传感器模拟：简单定时循环
///
/// 值做随机游走，编码后发布到该设备名对应的队列
async fn run_sensor(
    name: String,
    id: u32,
    unit: String,
    initial: f64,
    broker_host: &str,
    broker_port: u16,
    interval: Duration,
) -> anyhow::Result<()> {
    let mut options = MqttOptions::new(format!("{name}-{id}"), broker_host, broker_port);
    options.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(options, 16);

    // 事件循环驱动发布，连接错误退避后重试
    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                error!(error = %e, "Broker connection error, backing off");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    });

    let queue = format!("queue_{name}");
    info!(sensor = %name, queue = %queue, "Sensor simulator started");

    let mut value = initial;
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        let step: f64 = rand::thread_rng().gen_range(-1.0..1.0);
        value = ((value + step) * 100.0).round() / 100.0;

        let status = DeviceStatus {
            device_id: id,
            name: name.clone(),
            value,
            unit: unit.clone(),
        };
        let payload = wire::encode_device_status(&status);

        match client
            .publish(queue.as_str(), QoS::AtLeastOnce, false, payload)
            .await
        {
            Ok(()) => info!(sensor = %name, value, unit = %unit, "Status published"),
            Err(e) => warn!(sensor = %name, error = %e, "Publish failed"),
        }
    }
}

/// 执行器模拟：每个连接一条 Command，应答 Success
async fn run_actuator(name: String, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("bind actuator endpoint on port {port}"))?;
    info!(actuator = %name, port, "Actuator simulator listening");

    loop {
        let (mut stream, peer) = listener.accept().await.context("accept control call")?;
        let actuator = name.clone();
        tokio::spawn(async move {
            let mut request = Vec::new();
            if let Err(e) = stream.read_to_end(&mut request).await {
                warn!(actuator = %actuator, peer = %peer, error = %e, "Failed to read command");
                return;
            }

            match wire::decode_command(&request) {
                Ok(command) => {
                    info!(
                        actuator = %actuator,
                        command = %command.command,
                        target = %command.name,
                        value = command.value,
                        "Setpoint received"
                    );
                    let ack = wire::encode_ack(&Ack {
                        status: "Success".to_string(),
                    });
                    if let Err(e) = stream.write_all(&ack).await {
                        warn!(actuator = %actuator, error = %e, "Failed to send acknowledgement");
                    }
                }
                Err(e) => {
                    warn!(actuator = %actuator, peer = %peer, error = %e, "Dropping malformed command");
                }
            }
        });
    }
}
