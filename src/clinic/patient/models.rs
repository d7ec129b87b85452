//! 患者本地模型定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 服务器分配的记录 ID（不透明字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 患者记录（字段名与后端对象保持一致）
///
/// 没有 ID 的记录是"新记录"，带 ID 的记录是"已存在记录"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Email__c", default)]
    pub email: String,
    /// 就诊类型标签，取值由后端校验
    #[serde(rename = "Visit_Type__c", default)]
    pub visit_type: String,
}

impl PatientRecord {
    /// 创建一条尚未保存的记录
    pub fn new_unsaved(
        name: impl Into<String>,
        email: impl Into<String>,
        visit_type: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            visit_type: visit_type.into(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

/// 就诊类型（固定标签集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitType {
    #[serde(rename = "Consultation")]
    Consultation,
    #[serde(rename = "Follow-up")]
    FollowUp,
    #[serde(rename = "Emergency")]
    Emergency,
    #[serde(rename = "Routine Check-Up")]
    RoutineCheckUp,
}

impl VisitType {
    pub const ALL: [VisitType; 4] = [
        VisitType::Consultation,
        VisitType::FollowUp,
        VisitType::Emergency,
        VisitType::RoutineCheckUp,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VisitType::Consultation => "Consultation",
            VisitType::FollowUp => "Follow-up",
            VisitType::Emergency => "Emergency",
            VisitType::RoutineCheckUp => "Routine Check-Up",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.label() == label)
    }

    /// 下拉框选项（label, value）
    pub fn options() -> Vec<(&'static str, &'static str)> {
        Self::ALL.iter().map(|v| (v.label(), v.label())).collect()
    }
}

/// 表格列类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    /// 普通文本列，对应记录上的字段名
    Text { field_name: &'static str },
    /// 行操作按钮
    Button {
        action: &'static str,
        variant: &'static str,
    },
}

/// 表格列声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub label: &'static str,
    pub kind: ColumnKind,
}

/// 患者表格的列声明：三个文本列 + 编辑/删除按钮
pub fn patient_table_columns() -> Vec<TableColumn> {
    vec![
        TableColumn {
            label: "Name",
            kind: ColumnKind::Text { field_name: "Name" },
        },
        TableColumn {
            label: "Email",
            kind: ColumnKind::Text {
                field_name: "Email__c",
            },
        },
        TableColumn {
            label: "Visit Type",
            kind: ColumnKind::Text {
                field_name: "Visit_Type__c",
            },
        },
        TableColumn {
            label: "Edit",
            kind: ColumnKind::Button {
                action: "edit",
                variant: "brand",
            },
        },
        TableColumn {
            label: "Delete",
            kind: ColumnKind::Button {
                action: "delete",
                variant: "destructive",
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsaved_record_omits_id_on_the_wire() {
        let record = PatientRecord::new_unsaved("Jane Doe", "jane@x.com", "Consultation");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Name": "Jane Doe",
                "Email__c": "jane@x.com",
                "Visit_Type__c": "Consultation"
            })
        );
        assert!(record.is_new());
    }

    #[test]
    fn visit_type_labels_round_trip() {
        for v in VisitType::ALL {
            assert_eq!(VisitType::from_label(v.label()), Some(v));
        }
        assert_eq!(VisitType::from_label("Surgery"), None);
        assert_eq!(VisitType::options()[1], ("Follow-up", "Follow-up"));
    }
}
