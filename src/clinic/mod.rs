pub mod client;
pub mod db;
pub mod error;
pub mod patient;
pub mod types;

// 重新导出常用类型
pub use client::{ClientConfig, PatientManagerClient, StoreBackend};
pub use error::{ControllerError, StoreError};
