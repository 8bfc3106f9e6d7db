use serde::{Deserialize, Serialize};

/// 传感器类别
///
/// 每个类别对应一条遥测队列和一个环形缓冲区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorClass {
    Temperature,
    Light,
    Humidity,
}

impl SensorClass {
    pub const ALL: [SensorClass; 3] = [
        SensorClass::Temperature,
        SensorClass::Light,
        SensorClass::Humidity,
    ];

    /// 设备上报时使用的名称
    pub fn device_name(&self) -> &'static str {
        match self {
            SensorClass::Temperature => "sensor_temperature",
            SensorClass::Light => "sensor_light",
            SensorClass::Humidity => "sensor_humidity",
        }
    }

    /// 遥测队列（MQTT 主题）名称
    pub fn queue(&self) -> &'static str {
        match self {
            SensorClass::Temperature => "queue_sensor_temperature",
            SensorClass::Light => "queue_sensor_light",
            SensorClass::Humidity => "queue_sensor_humidity",
        }
    }

    /// 查询响应中的 JSON 键
    pub fn json_key(&self) -> &'static str {
        match self {
            SensorClass::Temperature => "temperature_sensor",
            SensorClass::Light => "light_sensor",
            SensorClass::Humidity => "humidity_sensor",
        }
    }

    /// 按设备名称解析类别，未知名称返回 None
    pub fn from_device_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.device_name() == name)
    }

    /// 按队列名称解析类别
    pub fn from_queue(queue: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.queue() == queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_name_roundtrip() {
        for class in SensorClass::ALL {
            assert_eq!(SensorClass::from_device_name(class.device_name()), Some(class));
            assert_eq!(SensorClass::from_queue(class.queue()), Some(class));
        }
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(SensorClass::from_device_name("sensor_co2"), None);
        assert_eq!(SensorClass::from_queue("queue_sensor_co2"), None);
    }
}
