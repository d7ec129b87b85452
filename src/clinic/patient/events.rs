//! 表单 / 表格界面产生的类型化事件
//!
//! 界面只负责产生事件，统一交给同步控制器的 `dispatch` 处理。

use crate::clinic::patient::models::PatientRecord;
use std::str::FromStr;

/// 表单字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Email,
    VisitType,
}

impl FromStr for FormField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" | "Name" => Ok(FormField::Name),
            "email" | "Email__c" => Ok(FormField::Email),
            "visit_type" | "visitType" | "Visit_Type__c" => Ok(FormField::VisitType),
            other => Err(format!("未知字段: {}", other)),
        }
    }
}

/// 表单事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    /// 打开新增弹窗
    AddNew,
    FieldChanged { field: FormField, value: String },
    Save,
    /// 关闭弹窗
    Cancel,
}

/// 表格行操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Edit,
    Delete,
}

impl FromStr for RowAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edit" => Ok(RowAction::Edit),
            "delete" => Ok(RowAction::Delete),
            other => Err(format!("未知行操作: {}", other)),
        }
    }
}

/// 表格事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    RowAction { action: RowAction, row: PatientRecord },
}

/// 控制器唯一的事件入口类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Form(FormEvent),
    Table(TableEvent),
    /// 重新获取患者列表
    Refresh,
    /// 用户关闭错误提示
    DismissError,
}

impl From<FormEvent> for UiEvent {
    fn from(event: FormEvent) -> Self {
        UiEvent::Form(event)
    }
}

impl From<TableEvent> for UiEvent {
    fn from(event: TableEvent) -> Self {
        UiEvent::Table(event)
    }
}

impl UiEvent {
    pub fn field_changed(field: FormField, value: impl Into<String>) -> Self {
        UiEvent::Form(FormEvent::FieldChanged {
            field,
            value: value.into(),
        })
    }

    pub fn row_action(action: RowAction, row: PatientRecord) -> Self {
        UiEvent::Table(TableEvent::RowAction { action, row })
    }
}
