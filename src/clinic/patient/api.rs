//! 患者 HTTP API 客户端
//!
//! 负责所有患者相关的 HTTP 请求，实现 [`RecordStore`] 契约

use crate::clinic::error::StoreError;
use crate::clinic::patient::models::{PatientRecord, RecordId};
use crate::clinic::patient::store::RecordStore;
use crate::clinic::types::handle_http_response;
use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

/// 患者相关的 HTTP API 客户端
pub struct PatientApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl PatientApi {
    /// 创建新的患者 API 客户端
    ///
    /// `client` 应该已经在外部配置好认证拦截器
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/patient/{}", self.api_base_url, path)
    }

    /// 发送一次 POST 请求（单次尝试，不重试）
    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, StoreError> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.url(path);
        debug!("[PatientAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        self.client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("operationID", &operation_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::transport(format!("请求失败: {}", e)))
    }
}

#[async_trait]
impl RecordStore for PatientApi {
    async fn list(&self) -> Result<Vec<PatientRecord>, StoreError> {
        info!("[PatientAPI] 📡 请求患者列表");
        let response = self.post("get_patients", serde_json::json!({})).await?;
        let patients: Vec<PatientRecord> =
            handle_http_response::<Vec<PatientRecord>>(response, "患者列表", None)
                .await?
                .unwrap_or_default();
        info!("[PatientAPI] ✅ 患者列表响应，条目数: {}", patients.len());
        Ok(patients)
    }

    async fn create(&self, record: &PatientRecord) -> Result<PatientRecord, StoreError> {
        info!("[PatientAPI] 📡 请求新增患者: {}", record.name);
        let response = self
            .post("add_patient", serde_json::json!({ "patient": record }))
            .await?;
        let created = handle_http_response::<PatientRecord>(response, "新增患者", None)
            .await?
            .ok_or_else(|| StoreError::transport("响应中缺少 data 字段"))?;
        if created.id.is_none() {
            return Err(StoreError::transport("服务器未返回新患者 ID"));
        }
        info!("[PatientAPI] ✅ 新增患者成功，ID: {:?}", created.id);
        Ok(created)
    }

    async fn update(&self, record: &PatientRecord) -> Result<(), StoreError> {
        let id = record
            .id
            .as_ref()
            .ok_or_else(|| StoreError::validation("Id", "更新操作要求记录带有 ID"))?;
        info!("[PatientAPI] 📡 请求更新患者: {}", id);
        let response = self
            .post("update_patient", serde_json::json!({ "patient": record }))
            .await?;
        handle_http_response::<serde_json::Value>(response, "更新患者", Some(id)).await?;
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        info!("[PatientAPI] 📡 请求删除患者: {}", id);
        let response = self
            .post("delete_patient", serde_json::json!({ "patientId": id }))
            .await?;
        handle_http_response::<serde_json::Value>(response, "删除患者", Some(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoint_urls_without_double_slash() {
        let api = PatientApi::new(reqwest::Client::new(), "http://localhost:10002/".to_string());
        assert_eq!(
            api.url("get_patients"),
            "http://localhost:10002/patient/get_patients"
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        // 端口 9 (discard) 上通常没有 HTTP 服务
        let api = PatientApi::new(reqwest::Client::new(), "http://127.0.0.1:9".to_string());
        let err = api.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
