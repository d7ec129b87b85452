//! 记录存储接口
//!
//! 后端的抽象契约：列表、新增、更新、删除。每次调用都是单次尝试、
//! 可能失败且相互独立的。

use crate::clinic::error::StoreError;
use crate::clinic::patient::models::{PatientRecord, RecordId};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// 记录存储（HTTP 后端、本地 SQLite 等均实现此接口）
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 获取全部患者记录
    async fn list(&self) -> Result<Vec<PatientRecord>, StoreError>;

    /// 新增患者（记录不带 ID），返回带服务器分配 ID 的记录
    async fn create(&self, record: &PatientRecord) -> Result<PatientRecord, StoreError>;

    /// 更新患者（记录必须带 ID）
    async fn update(&self, record: &PatientRecord) -> Result<(), StoreError>;

    /// 删除患者
    async fn delete(&self, id: &RecordId) -> Result<(), StoreError>;
}

/// 记录存储操作类型，用于日志和监听器回调
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreOperation {
    List,
    Create,
    Update,
    Delete,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOperation::List => "获取患者列表",
            StoreOperation::Create => "新增患者",
            StoreOperation::Update => "更新患者",
            StoreOperation::Delete => "删除患者",
        };
        f.write_str(name)
    }
}
