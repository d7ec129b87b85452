//! 患者模块
//!
//! 患者记录的列表、新增、编辑、删除，以及弹窗表单与后端之间的同步

pub mod api;
pub mod dao;
pub mod events;
pub mod listener;
pub mod models;
pub mod runtime;
pub mod service;
pub mod state;
pub mod store;

// 重新导出主要类型和函数
pub use api::PatientApi;
pub use dao::PatientDao;
pub use events::{FormEvent, FormField, RowAction, TableEvent, UiEvent};
pub use listener::{EmptyPatientListener, LoggingPatientListener, PatientListener};
pub use models::{patient_table_columns, ColumnKind, PatientRecord, RecordId, TableColumn, VisitType};
pub use runtime::{spawn_controller, ControllerHandle};
pub use service::{CallKind, CallOutput, Completion, PatientSyncController, PendingCall};
pub use state::{Draft, ErrorScope, ModalMode, ModalState, ViewState};
pub use store::{RecordStore, StoreOperation};
