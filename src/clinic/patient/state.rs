//! 视图状态
//!
//! 由同步控制器独占持有，不存在任何全局可变状态。

use crate::clinic::patient::events::FormField;
use crate::clinic::patient::models::{PatientRecord, RecordId};

/// 弹窗状态机：Closed / AddOpen / EditOpen(选中记录 ID)
///
/// 选中记录 ID 仅在编辑模式下存在，由类型保证
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModalState {
    #[default]
    Closed,
    AddOpen,
    EditOpen(RecordId),
}

/// 弹窗模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    Add,
    Edit,
}

/// 表单草稿字段（仅在弹窗打开时有意义）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub email: String,
    pub visit_type: String,
}

impl Draft {
    pub fn from_record(record: &PatientRecord) -> Self {
        Self {
            name: record.name.clone(),
            email: record.email.clone(),
            visit_type: record.visit_type.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty() && self.visit_type.is_empty()
    }

    pub fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::Name => self.name = value,
            FormField::Email => self.email = value,
            FormField::VisitType => self.visit_type = value,
        }
    }

    /// 由草稿构建待保存的记录
    pub fn to_record(&self, id: Option<RecordId>) -> PatientRecord {
        PatientRecord {
            id,
            name: self.name.clone(),
            email: self.email.clone(),
            visit_type: self.visit_type.clone(),
        }
    }
}

/// 错误所关联的操作，决定何时清除
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorScope {
    /// 列表刷新失败，下一次刷新成功时清除
    List,
    /// 保存失败，保存成功或重新打开弹窗时清除
    Save,
    /// 删除失败，同一记录删除成功时清除
    Delete(RecordId),
    /// 本地契约错误，重新打开弹窗时清除
    Local,
}

/// 视图状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// 当前患者列表（最近一次成功获取的结果）
    pub patients: Vec<PatientRecord>,
    pub modal: ModalState,
    pub draft: Draft,
    /// 最近一次失败的描述，只有同一范围的操作成功或用户关闭提示后才清空
    pub last_error: Option<String>,
    pub error_scope: Option<ErrorScope>,
}

impl ViewState {
    pub fn modal_open(&self) -> bool {
        self.modal != ModalState::Closed
    }

    pub fn mode(&self) -> Option<ModalMode> {
        match self.modal {
            ModalState::Closed => None,
            ModalState::AddOpen => Some(ModalMode::Add),
            ModalState::EditOpen(_) => Some(ModalMode::Edit),
        }
    }

    pub fn selected_record_id(&self) -> Option<&RecordId> {
        match &self.modal {
            ModalState::EditOpen(id) => Some(id),
            _ => None,
        }
    }

    /// 弹窗标题
    pub fn modal_header(&self) -> &'static str {
        match self.modal {
            ModalState::Closed => "",
            ModalState::AddOpen => "Add New Patient",
            ModalState::EditOpen(_) => "Edit Patient",
        }
    }

    pub fn find_patient(&self, id: &RecordId) -> Option<&PatientRecord> {
        self.patients.iter().find(|p| p.id.as_ref() == Some(id))
    }
}
