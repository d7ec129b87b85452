//! 错误类型定义
//!
//! 记录存储（Record Store）的三类失败：传输失败、后端校验失败、记录不存在。
//! 所有失败都在同步控制器边界被捕获并上报，不会向上抛出。

use crate::clinic::patient::models::RecordId;
use thiserror::Error;

/// 记录存储调用失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 网络或服务器失败，不假定有任何部分副作用
    #[error("传输错误: {0}")]
    Transport(String),

    /// 后端拒绝了字段内容
    #[error("校验失败{}: {message}", .field.as_deref().map(|f| format!("（字段 {}）", f)).unwrap_or_default())]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// 目标记录已不存在
    #[error("记录不存在: {0}")]
    NotFound(RecordId),
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        StoreError::Transport(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Transport(format!("数据库错误: {}", e))
    }
}

/// 同步控制器本地契约被违反（不涉及网络调用）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("{0}操作要求记录带有 ID")]
    MissingRecordId(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_the_field() {
        let err = StoreError::validation("Email__c", "邮箱格式不正确");
        assert_eq!(err.to_string(), "校验失败（字段 Email__c）: 邮箱格式不正确");

        let err = StoreError::Validation {
            field: None,
            message: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "校验失败: bad");
    }
}
