use crate::error::ApiError;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use greenhouse_gateway::{ActuatorRouter, GatewayState, SensorSnapshot};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
    pub router: Arc<ActuatorRouter>,
}

/// 执行器控制响应
#[derive(Debug, Serialize)]
pub struct SetActuatorResponse {
    pub status: String,
}

/// 读取所有传感器缓冲区的快照
///
/// 失效或从未上报的类别返回空数组
pub async fn get_sensors(State(state): State<AppState>) -> Json<SensorSnapshot> {
    Json(state.gateway.snapshot().await)
}

/// 向执行器下发设定值
///
/// 自行解析 value 参数：缺失或无法解析的数值也要以
/// {"detail": ...} 返回，而不是提取器的纯文本拒绝
pub async fn set_actuator(
    State(state): State<AppState>,
    Path(actuator_name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<SetActuatorResponse>, ApiError> {
    let raw = query
        .get("value")
        .ok_or_else(|| ApiError::BadRequest("Missing query parameter: value".to_string()))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid control value: {raw}")))?;

    info!(actuator = %actuator_name, value, "Actuator command received");

    let status = state.router.set_actuator(&actuator_name, value).await?;

    Ok(Json(SetActuatorResponse { status }))
}
