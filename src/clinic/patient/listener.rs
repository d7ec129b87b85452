//! 患者监听器回调接口

use crate::clinic::patient::store::StoreOperation;
use async_trait::async_trait;
use tracing::{error, info};

/// 患者同步监听器（所有存储调用的结果都会上报到这里）
#[async_trait]
pub trait PatientListener: Send + Sync {
    /// 患者列表刷新成功，参数为 JSON 数组字符串
    async fn on_patient_list_changed(&self, patients_json: String);

    /// 存储操作成功
    async fn on_operation_succeeded(&self, operation: StoreOperation);

    /// 存储操作失败（已被控制器捕获，不会重试）
    async fn on_operation_failed(&self, operation: StoreOperation, message: String);
}

/// 默认空实现（无操作）
pub struct EmptyPatientListener;

#[async_trait]
impl PatientListener for EmptyPatientListener {
    async fn on_patient_list_changed(&self, _patients_json: String) {}
    async fn on_operation_succeeded(&self, _operation: StoreOperation) {}
    async fn on_operation_failed(&self, _operation: StoreOperation, _message: String) {}
}

/// 将所有回调写入 tracing 日志
pub struct LoggingPatientListener;

#[async_trait]
impl PatientListener for LoggingPatientListener {
    async fn on_patient_list_changed(&self, patients_json: String) {
        info!("[PatientListener] 👥 患者列表变更: {}", patients_json);
    }

    async fn on_operation_succeeded(&self, operation: StoreOperation) {
        info!("[PatientListener] ✅ {}成功", operation);
    }

    async fn on_operation_failed(&self, operation: StoreOperation, message: String) {
        error!("[PatientListener] ❌ {}失败: {}", operation, message);
    }
}
