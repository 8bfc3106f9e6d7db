use serde::{Deserialize, Serialize};

/// 设备状态（遥测线格式解码结果）
///
/// 解码后不可变，只被消费一次
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceStatus {
    pub device_id: u32,
    pub name: String,
    pub value: f64,
    pub unit: String,
}

/// 缓冲区中保存的传感器读数
///
/// value 在入库时格式化为两位小数，消费方是展示层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: u32,
    pub value: String,
    pub unit: String,
    pub name: String,
}

impl SensorReading {
    pub fn from_status(status: &DeviceStatus) -> Self {
        Self {
            id: status.device_id,
            value: format!("{:.2}", status.value),
            unit: status.unit.clone(),
            name: status.name.clone(),
        }
    }
}

/// 执行器控制指令（出站线格式）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Command {
    pub command: String,
    pub name: String,
    pub value: f64,
}

impl Command {
    pub fn set(name: impl Into<String>, value: f64) -> Self {
        Self {
            command: "SET".to_string(),
            name: name.into(),
            value,
        }
    }
}

/// 执行器应答
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ack {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_formats_two_decimals() {
        let status = DeviceStatus {
            device_id: 1,
            name: "sensor_temperature".to_string(),
            value: 23.456,
            unit: "C".to_string(),
        };

        let reading = SensorReading::from_status(&status);
        assert_eq!(reading.id, 1);
        assert_eq!(reading.value, "23.46");
        assert_eq!(reading.unit, "C");
        assert_eq!(reading.name, "sensor_temperature");
    }

    #[test]
    fn test_reading_pads_integral_values() {
        let status = DeviceStatus {
            device_id: 7,
            name: "sensor_light".to_string(),
            value: 80.0,
            unit: "lux".to_string(),
        };

        assert_eq!(SensorReading::from_status(&status).value, "80.00");
    }
}
