pub mod clinic;

// 重新导出常用类型，方便外部使用
pub use clinic::{
    client::{ClientConfig, PatientManagerClient, StoreBackend},
    error::{ControllerError, StoreError},
    patient::{
        ControllerHandle, PatientListener, PatientRecord, PatientSyncController, RecordId,
        RecordStore, UiEvent, ViewState,
    },
};
