use thiserror::Error;

/// 控制路径错误
///
/// 同步返回给查询接口调用方，绝不作为未捕获异常抛出。
/// 摄取路径的错误（解码失败、代理断连）在聚合器内部消化，
/// 不会出现在这里。
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Unknown actuator: {0}")]
    UnknownActuator(String),

    #[error("Invalid control value: {0}")]
    InvalidValue(f64),

    #[error("Control call to {actuator} failed: {reason}")]
    Route { actuator: String, reason: String },
}
