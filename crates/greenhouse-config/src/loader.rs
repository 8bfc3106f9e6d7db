use anyhow::{anyhow, Result};
use config::{Config, File, FileFormat};
use std::path::{Path, PathBuf};

use crate::GatewayConfig;

/// 配置加载器
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// 创建配置加载器
    pub fn new<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// 加载网关配置
    ///
    /// 配置文件不存在时返回默认配置
    pub fn load(&self) -> Result<GatewayConfig> {
        if !self.config_path.exists() {
            return Ok(GatewayConfig::default());
        }

        let config = Config::builder()
            .add_source(File::new(
                self.config_path
                    .to_str()
                    .ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let loader = ConfigLoader::new("/nonexistent/gateway.toml");
        let config = loader.load().unwrap();
        assert_eq!(config.telemetry.buffer_capacity, 20);
    }

    #[test]
    fn test_load_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[broker]
host = "broker.local"
port = 1884

[telemetry]
staleness_timeout_secs = 30

[actuators.actuator_curtains]
host = "curtains.local"
port = 40020
"#
        )
        .unwrap();

        let config = ConfigLoader::new(file.path()).load().unwrap();
        assert_eq!(config.broker.host, "broker.local");
        assert_eq!(config.broker.port, 1884);
        assert_eq!(config.telemetry.staleness_timeout_secs, 30);
        // 未覆盖的部分保持默认
        assert_eq!(config.telemetry.buffer_capacity, 20);
        assert_eq!(
            config.actuators["actuator_curtains"].address(),
            "curtains.local:40020"
        );
    }
}
