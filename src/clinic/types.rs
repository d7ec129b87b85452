use crate::clinic::error::StoreError;
use crate::clinic::patient::models::RecordId;
use serde::Deserialize;
use tracing::{debug, error, info};

/// 后端业务错误码
pub mod err_code {
    pub const OK: i32 = 0;
    /// 字段校验失败
    pub const VALIDATION: i32 = 1001;
    /// 目标记录不存在
    pub const NOT_FOUND: i32 = 1004;
}

/// 统一的 API 响应包装结构体（包含 errCode、errMsg、data）
/// data 字段可能为 null 或缺失，因此使用 Option<T>
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "errCode")]
    pub err_code: i32,
    #[serde(rename = "errMsg", default)]
    pub err_msg: String,
    /// 校验失败时后端给出的字段名
    #[serde(rename = "errField", default)]
    pub err_field: Option<String>,
    pub data: Option<T>,
}

/// 将服务器返回的非零错误码映射为记录存储错误
///
/// `target` 为本次请求涉及的记录 ID（更新/删除时存在）
pub fn classify_err_code(
    err_code: i32,
    err_msg: &str,
    err_field: Option<String>,
    target: Option<&RecordId>,
) -> StoreError {
    match (err_code, target) {
        (err_code::VALIDATION, _) => StoreError::Validation {
            field: err_field,
            message: err_msg.to_string(),
        },
        (err_code::NOT_FOUND, Some(id)) => StoreError::NotFound(id.clone()),
        _ => StoreError::Transport(format!("服务器错误 {}: {}", err_code, err_msg)),
    }
}

/// 通用 HTTP 响应处理函数：检查 HTTP 状态、反序列化并检查错误码
///
/// 返回 data 字段（可能为 None），所有患者 API 共用此方法
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
    target: Option<&RecordId>,
) -> Result<Option<T>, StoreError> {
    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response
        .bytes()
        .await
        .map_err(|e| StoreError::transport(format!("读取响应 body 失败: {}", e)))?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    info!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(StoreError::transport(format!(
            "HTTP 错误 {}: {}",
            status, body_str
        )));
    }
    debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    parse_api_body(&body_bytes, operation_name, target)
}

/// 从原始 body 反序列化并检查错误码
pub fn parse_api_body<T: serde::de::DeserializeOwned>(
    body: &[u8],
    operation_name: &str,
    target: Option<&RecordId>,
) -> Result<Option<T>, StoreError> {
    let api_resp: ApiResponse<T> = serde_json::from_slice(body).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name,
            e,
            String::from_utf8_lossy(body)
        );
        StoreError::transport(format!("反序列化响应失败: {}", e))
    })?;

    if api_resp.err_code != err_code::OK {
        error!(
            "[HTTP] {}服务器错误，错误码: {}, 错误信息: {}",
            operation_name, api_resp.err_code, api_resp.err_msg
        );
        return Err(classify_err_code(
            api_resp.err_code,
            &api_resp.err_msg,
            api_resp.err_field,
            target,
        ));
    }

    Ok(api_resp.data)
}
