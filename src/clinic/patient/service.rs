//! 患者同步控制器
//!
//! 负责"先在后端修改，再刷新本地视图"的同步流程，并管理弹窗状态机。
//! 每次存储调用被拆成两步：`begin_*` 产生 [`PendingCall`]，执行后得到
//! [`Completion`]，再由 `apply_completion` 应用成功/失败分支。
//!
//! 迟到的结果按以下规则处理：
//! - 每次打开弹窗都会递增表单代数，保存结果只会关闭同一代的弹窗；
//! - 列表刷新带有递增序号，比已应用结果更旧的列表直接丢弃。

use crate::clinic::error::{ControllerError, StoreError};
use crate::clinic::patient::events::{FormEvent, FormField, RowAction, TableEvent, UiEvent};
use crate::clinic::patient::listener::{EmptyPatientListener, PatientListener};
use crate::clinic::patient::models::{PatientRecord, RecordId};
use crate::clinic::patient::state::{Draft, ErrorScope, ModalState, ViewState};
use crate::clinic::patient::store::{RecordStore, StoreOperation};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 待执行的存储调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    /// 调用序号（仅用于日志追踪）
    pub ticket: u64,
    /// 发起调用时的表单代数
    pub form_generation: u64,
    pub kind: CallKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    List { seq: u64 },
    Create(PatientRecord),
    Update(PatientRecord),
    Delete(RecordId),
}

impl CallKind {
    /// 调用失败时错误所属的范围
    pub fn error_scope(&self) -> ErrorScope {
        match self {
            CallKind::List { .. } => ErrorScope::List,
            CallKind::Create(_) | CallKind::Update(_) => ErrorScope::Save,
            CallKind::Delete(id) => ErrorScope::Delete(id.clone()),
        }
    }

    pub fn operation(&self) -> StoreOperation {
        match self {
            CallKind::List { .. } => StoreOperation::List,
            CallKind::Create(_) => StoreOperation::Create,
            CallKind::Update(_) => StoreOperation::Update,
            CallKind::Delete(_) => StoreOperation::Delete,
        }
    }
}

/// 存储调用的成功结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    Patients(Vec<PatientRecord>),
    Created(PatientRecord),
    Done,
}

/// 已完成的存储调用
#[derive(Debug, Clone)]
pub struct Completion {
    pub call: PendingCall,
    pub result: Result<CallOutput, StoreError>,
}

/// 患者同步控制器
pub struct PatientSyncController {
    store: Arc<dyn RecordStore>,
    listener: Arc<dyn PatientListener>,
    state: ViewState,
    form_generation: u64,
    next_ticket: u64,
    next_refresh_seq: u64,
    applied_refresh_seq: u64,
}

impl PatientSyncController {
    /// 创建新的同步控制器（使用默认空监听器）
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_listener(store, Arc::new(EmptyPatientListener))
    }

    /// 创建新的同步控制器（自定义监听器）
    pub fn with_listener(store: Arc<dyn RecordStore>, listener: Arc<dyn PatientListener>) -> Self {
        Self {
            store,
            listener,
            state: ViewState::default(),
            form_generation: 0,
            next_ticket: 0,
            next_refresh_seq: 0,
            applied_refresh_seq: 0,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    pub fn form_generation(&self) -> u64 {
        self.form_generation
    }

    // ========== 弹窗状态机 ==========

    /// 打开新增弹窗：清空草稿，进入新增模式
    pub fn open_add_form(&mut self) {
        self.form_generation += 1;
        self.clear_error_if(|scope| matches!(scope, ErrorScope::Save | ErrorScope::Local));
        self.state.draft = Draft::default();
        self.state.modal = ModalState::AddOpen;
        debug!(
            "[PatientSync] 打开新增弹窗，表单代数: {}",
            self.form_generation
        );
    }

    /// 打开编辑弹窗：记录必须带有 ID
    pub fn open_edit_form(&mut self, record: &PatientRecord) -> Result<(), ControllerError> {
        let id = record
            .id
            .clone()
            .ok_or(ControllerError::MissingRecordId("编辑"))?;
        self.form_generation += 1;
        self.clear_error_if(|scope| matches!(scope, ErrorScope::Save | ErrorScope::Local));
        self.state.draft = Draft::from_record(record);
        debug!(
            "[PatientSync] 打开编辑弹窗，患者ID: {}, 表单代数: {}",
            id, self.form_generation
        );
        self.state.modal = ModalState::EditOpen(id);
        Ok(())
    }

    /// 关闭弹窗（草稿保留到下次打开）
    pub fn close_form(&mut self) {
        if self.state.modal_open() {
            debug!("[PatientSync] 关闭弹窗");
        }
        self.state.modal = ModalState::Closed;
    }

    /// 更新草稿字段（弹窗关闭时忽略）
    pub fn apply_field_change(&mut self, field: FormField, value: String) {
        if !self.state.modal_open() {
            debug!("[PatientSync] 弹窗未打开，忽略字段变更: {:?}", field);
            return;
        }
        self.state.draft.set(field, value);
    }

    // ========== 发起存储调用 ==========

    fn next_call(&mut self, kind: CallKind) -> PendingCall {
        self.next_ticket += 1;
        PendingCall {
            ticket: self.next_ticket,
            form_generation: self.form_generation,
            kind,
        }
    }

    /// 由草稿构建保存调用：有选中 ID 时更新，否则新增。弹窗未打开时不发起调用
    pub fn begin_save(&mut self) -> Option<PendingCall> {
        let selected = match &self.state.modal {
            ModalState::Closed => {
                warn!("[PatientSync] 弹窗未打开，忽略保存");
                return None;
            }
            ModalState::AddOpen => None,
            ModalState::EditOpen(id) => Some(id.clone()),
        };

        let record = self.state.draft.to_record(selected);
        if let Ok(json) = serde_json::to_string(&record) {
            info!("[PatientSync] 待保存的患者: {}", json);
        }
        let kind = if record.is_new() {
            CallKind::Create(record)
        } else {
            CallKind::Update(record)
        };
        Some(self.next_call(kind))
    }

    pub fn begin_delete(&mut self, id: RecordId) -> PendingCall {
        info!("[PatientSync] 请求删除患者: {}", id);
        self.next_call(CallKind::Delete(id))
    }

    pub fn begin_refresh(&mut self) -> PendingCall {
        self.next_refresh_seq += 1;
        let seq = self.next_refresh_seq;
        self.next_call(CallKind::List { seq })
    }

    fn record_error(&mut self, scope: ErrorScope, message: String) {
        self.state.last_error = Some(message);
        self.state.error_scope = Some(scope);
    }

    /// 仅当当前错误属于给定范围时清除
    fn clear_error_if(&mut self, resolves: impl Fn(&ErrorScope) -> bool) {
        if self.state.error_scope.as_ref().is_some_and(resolves) {
            self.state.last_error = None;
            self.state.error_scope = None;
        }
    }

    /// 记录本地契约错误（不涉及存储调用）
    fn report_local(&mut self, err: ControllerError) {
        warn!("[PatientSync] {}", err);
        self.record_error(ErrorScope::Local, err.to_string());
    }

    /// 统一事件入口：同步更新视图状态，返回需要发起的存储调用
    pub fn dispatch(&mut self, event: UiEvent) -> Vec<PendingCall> {
        match event {
            UiEvent::Form(FormEvent::AddNew) => {
                self.open_add_form();
                Vec::new()
            }
            UiEvent::Form(FormEvent::FieldChanged { field, value }) => {
                self.apply_field_change(field, value);
                Vec::new()
            }
            UiEvent::Form(FormEvent::Save) => self.begin_save().into_iter().collect(),
            UiEvent::Form(FormEvent::Cancel) => {
                self.close_form();
                Vec::new()
            }
            UiEvent::Table(TableEvent::RowAction { action, row }) => match action {
                RowAction::Edit => {
                    if let Err(e) = self.open_edit_form(&row) {
                        self.report_local(e);
                    }
                    Vec::new()
                }
                RowAction::Delete => match row.id {
                    Some(id) => vec![self.begin_delete(id)],
                    None => {
                        self.report_local(ControllerError::MissingRecordId("删除"));
                        Vec::new()
                    }
                },
            },
            UiEvent::Refresh => vec![self.begin_refresh()],
            UiEvent::DismissError => {
                self.clear_error_if(|_| true);
                Vec::new()
            }
        }
    }

    // ========== 执行与应用 ==========

    /// 执行一次存储调用（单次尝试，不重试）
    pub async fn execute(store: Arc<dyn RecordStore>, call: PendingCall) -> Completion {
        debug!(
            "[PatientSync] 执行调用 #{}: {}",
            call.ticket,
            call.kind.operation()
        );
        let result = match &call.kind {
            CallKind::List { .. } => store.list().await.map(CallOutput::Patients),
            CallKind::Create(record) => store.create(record).await.map(CallOutput::Created),
            CallKind::Update(record) => store.update(record).await.map(|_| CallOutput::Done),
            CallKind::Delete(id) => store.delete(id).await.map(|_| CallOutput::Done),
        };
        Completion { call, result }
    }

    /// 应用调用结果，返回后续需要发起的调用（修改成功后的列表刷新）
    pub async fn apply_completion(&mut self, completion: Completion) -> Vec<PendingCall> {
        let Completion { call, result } = completion;
        let operation = call.kind.operation();

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                // 失败只上报：不重试、不乐观修改列表、不关闭弹窗
                error!("[PatientSync] ❌ {}失败: {}", operation, e);
                self.record_error(call.kind.error_scope(), e.to_string());
                self.listener
                    .on_operation_failed(operation, e.to_string())
                    .await;
                return Vec::new();
            }
        };

        match (call.kind, output) {
            (CallKind::List { seq }, CallOutput::Patients(patients)) => {
                if seq <= self.applied_refresh_seq {
                    debug!(
                        "[PatientSync] 丢弃过期的列表结果，序号: {}, 已应用: {}",
                        seq, self.applied_refresh_seq
                    );
                    return Vec::new();
                }
                self.applied_refresh_seq = seq;
                info!("[PatientSync] 患者列表已刷新，共 {} 条", patients.len());
                self.state.patients = patients;
                self.clear_error_if(|scope| *scope == ErrorScope::List);
                if let Ok(json) = serde_json::to_string(&self.state.patients) {
                    self.listener.on_patient_list_changed(json).await;
                }
                Vec::new()
            }
            (CallKind::Create(_), _) | (CallKind::Update(_), _) => {
                info!("[PatientSync] ✅ {}成功", operation);
                self.clear_error_if(|scope| *scope == ErrorScope::Save);
                self.listener.on_operation_succeeded(operation).await;
                let refresh = self.begin_refresh();
                if call.form_generation == self.form_generation {
                    self.close_form();
                } else {
                    debug!(
                        "[PatientSync] 保存结果来自旧表单（代数 {} != {}），保持当前弹窗",
                        call.form_generation, self.form_generation
                    );
                }
                vec![refresh]
            }
            (CallKind::Delete(id), _) => {
                info!("[PatientSync] ✅ {}成功", operation);
                self.clear_error_if(|scope| *scope == ErrorScope::Delete(id.clone()));
                self.listener.on_operation_succeeded(operation).await;
                vec![self.begin_refresh()]
            }
            (CallKind::List { .. }, other) => {
                warn!("[PatientSync] 列表调用返回了意外结果: {:?}", other);
                Vec::new()
            }
        }
    }

    /// 就地执行一次调用及其后续刷新，返回首个调用的结果
    async fn run_inline(&mut self, call: PendingCall) -> Result<(), StoreError> {
        let completion = Self::execute(self.store.clone(), call).await;
        let outcome = completion.result.as_ref().map(|_| ()).map_err(Clone::clone);

        let mut queue: VecDeque<PendingCall> =
            self.apply_completion(completion).await.into_iter().collect();
        while let Some(next) = queue.pop_front() {
            let completion = Self::execute(self.store.clone(), next).await;
            queue.extend(self.apply_completion(completion).await);
        }
        outcome
    }

    /// 保存草稿（新增或更新）。失败已上报，返回值仅供调用方参考
    pub async fn save(&mut self) -> Result<(), StoreError> {
        match self.begin_save() {
            Some(call) => self.run_inline(call).await,
            None => Ok(()),
        }
    }

    /// 删除患者，成功后刷新列表
    pub async fn delete_record(&mut self, id: &RecordId) -> Result<(), StoreError> {
        let call = self.begin_delete(id.clone());
        self.run_inline(call).await
    }

    /// 重新获取患者列表，失败时保留旧列表
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let call = self.begin_refresh();
        self.run_inline(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;

    /// 记录所有调用的内存存储，可注入失败
    #[derive(Default)]
    struct RecordingStore {
        patients: Mutex<Vec<PatientRecord>>,
        calls: Mutex<Vec<CallKind>>,
        fail_next: Mutex<Option<StoreError>>,
    }

    impl RecordingStore {
        fn with_patients(patients: Vec<PatientRecord>) -> Arc<Self> {
            let store = Self::default();
            *store.patients.lock().unwrap() = patients;
            Arc::new(store)
        }

        fn fail_next(&self, err: StoreError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        fn calls(&self) -> Vec<CallKind> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, op: StoreOperation) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.operation() == op)
                .count()
        }

        fn take_failure(&self) -> Result<(), StoreError> {
            match self.fail_next.lock().unwrap().take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl RecordStore for RecordingStore {
        async fn list(&self) -> Result<Vec<PatientRecord>, StoreError> {
            self.calls.lock().unwrap().push(CallKind::List { seq: 0 });
            self.take_failure()?;
            Ok(self.patients.lock().unwrap().clone())
        }

        async fn create(&self, record: &PatientRecord) -> Result<PatientRecord, StoreError> {
            self.calls
                .lock()
                .unwrap()
                .push(CallKind::Create(record.clone()));
            self.take_failure()?;
            let mut patients = self.patients.lock().unwrap();
            let created = PatientRecord {
                id: Some(RecordId::new(format!("p{}", patients.len() + 1))),
                ..record.clone()
            };
            patients.push(created.clone());
            Ok(created)
        }

        async fn update(&self, record: &PatientRecord) -> Result<(), StoreError> {
            self.calls
                .lock()
                .unwrap()
                .push(CallKind::Update(record.clone()));
            self.take_failure()?;
            let mut patients = self.patients.lock().unwrap();
            match patients.iter_mut().find(|p| p.id == record.id) {
                Some(p) => {
                    *p = record.clone();
                    Ok(())
                }
                None => Err(StoreError::NotFound(record.id.clone().unwrap())),
            }
        }

        async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(CallKind::Delete(id.clone()));
            self.take_failure()?;
            let mut patients = self.patients.lock().unwrap();
            let before = patients.len();
            patients.retain(|p| p.id.as_ref() != Some(id));
            if patients.len() == before {
                return Err(StoreError::NotFound(id.clone()));
            }
            Ok(())
        }
    }

    fn record(id: &str, name: &str, email: &str, visit_type: &str) -> PatientRecord {
        PatientRecord {
            id: Some(RecordId::from(id)),
            name: name.to_string(),
            email: email.to_string(),
            visit_type: visit_type.to_string(),
        }
    }

    fn fill_draft(controller: &mut PatientSyncController, name: &str, email: &str, vt: &str) {
        controller.apply_field_change(FormField::Name, name.to_string());
        controller.apply_field_change(FormField::Email, email.to_string());
        controller.apply_field_change(FormField::VisitType, vt.to_string());
    }

    #[tokio::test]
    async fn save_new_patient_calls_create_with_exact_draft_then_refreshes_and_closes() {
        let store = RecordingStore::with_patients(Vec::new());
        let mut controller = PatientSyncController::new(store.clone());

        controller.open_add_form();
        fill_draft(&mut controller, "Jane Doe", "jane@x.com", "Consultation");
        controller.save().await.unwrap();

        assert_eq!(
            store.calls()[0],
            CallKind::Create(PatientRecord::new_unsaved(
                "Jane Doe",
                "jane@x.com",
                "Consultation"
            ))
        );
        assert_eq!(store.count(StoreOperation::Create), 1);
        assert_eq!(store.count(StoreOperation::Update), 0);
        assert_eq!(store.count(StoreOperation::List), 1);
        assert!(!controller.state().modal_open());
        assert_eq!(controller.state().patients.len(), 1);
        assert_eq!(controller.state().patients[0].name, "Jane Doe");
    }

    #[tokio::test]
    async fn open_edit_form_copies_record_into_draft() {
        let store = RecordingStore::with_patients(Vec::new());
        let mut controller = PatientSyncController::new(store);

        controller
            .open_edit_form(&record("42", "A", "a@x.com", "Emergency"))
            .unwrap();

        let state = controller.state();
        assert_eq!(
            state.draft,
            Draft {
                name: "A".to_string(),
                email: "a@x.com".to_string(),
                visit_type: "Emergency".to_string(),
            }
        );
        assert_eq!(state.selected_record_id(), Some(&RecordId::from("42")));
        assert_eq!(state.mode(), Some(crate::clinic::patient::state::ModalMode::Edit));
        assert_eq!(state.modal_header(), "Edit Patient");
    }

    #[test]
    fn open_edit_form_without_id_is_rejected() {
        let mut controller = PatientSyncController::new(RecordingStore::with_patients(vec![]));
        let err = controller
            .open_edit_form(&PatientRecord::new_unsaved("A", "a@x.com", "Emergency"))
            .unwrap_err();
        assert_eq!(err, ControllerError::MissingRecordId("编辑"));
        assert!(!controller.state().modal_open());
    }

    #[test]
    fn add_after_edit_does_not_leak_previous_draft() {
        let mut controller = PatientSyncController::new(RecordingStore::with_patients(vec![]));

        controller
            .open_edit_form(&record("42", "A", "a@x.com", "Emergency"))
            .unwrap();
        controller.close_form();
        controller.open_add_form();

        assert!(controller.state().draft.is_empty());
        assert_eq!(controller.state().selected_record_id(), None);
        assert_eq!(controller.state().modal_header(), "Add New Patient");
    }

    #[tokio::test]
    async fn save_existing_patient_calls_update_with_selected_id() {
        let store = RecordingStore::with_patients(vec![record("42", "A", "a@x.com", "Emergency")]);
        let mut controller = PatientSyncController::new(store.clone());

        controller
            .open_edit_form(&record("42", "A", "a@x.com", "Emergency"))
            .unwrap();
        controller.apply_field_change(FormField::VisitType, "Follow-up".to_string());
        controller.save().await.unwrap();

        assert_eq!(
            store.calls()[0],
            CallKind::Update(record("42", "A", "a@x.com", "Follow-up"))
        );
        assert_eq!(store.count(StoreOperation::Create), 0);
        assert!(!controller.state().modal_open());
        assert_eq!(controller.state().patients[0].visit_type, "Follow-up");
    }

    #[tokio::test]
    async fn failed_save_keeps_modal_open_and_skips_refresh() {
        let store = RecordingStore::with_patients(Vec::new());
        let mut controller = PatientSyncController::new(store.clone());

        controller.open_add_form();
        fill_draft(&mut controller, "Jane Doe", "bad-email", "Consultation");
        store.fail_next(StoreError::validation("Email__c", "邮箱格式不正确"));

        let err = controller.save().await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
        assert!(controller.state().modal_open());
        assert_eq!(controller.state().draft.email, "bad-email");
        assert_eq!(store.count(StoreOperation::List), 0);
        assert!(controller.state().last_error.is_some());

        // 用户修正后手动重试
        controller.apply_field_change(FormField::Email, "jane@x.com".to_string());
        controller.save().await.unwrap();
        assert!(!controller.state().modal_open());
        assert!(controller.state().last_error.is_none());
    }

    #[tokio::test]
    async fn failed_delete_leaves_record_listed_and_does_not_block_add() {
        let store = RecordingStore::with_patients(vec![record("42", "A", "a@x.com", "Emergency")]);
        let mut controller = PatientSyncController::new(store.clone());
        controller.refresh().await.unwrap();

        store.fail_next(StoreError::transport("connection reset"));
        let id = RecordId::from("42");
        assert!(controller.delete_record(&id).await.is_err());
        assert!(controller.state().find_patient(&id).is_some());
        assert_eq!(store.count(StoreOperation::List), 1);

        controller.open_add_form();
        fill_draft(&mut controller, "B", "b@x.com", "Consultation");
        controller.save().await.unwrap();
        assert_eq!(controller.state().patients.len(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_list() {
        let store = RecordingStore::with_patients(vec![record("42", "A", "a@x.com", "Emergency")]);
        let mut controller = PatientSyncController::new(store.clone());
        controller.refresh().await.unwrap();

        store.fail_next(StoreError::transport("timeout"));
        assert!(controller.refresh().await.is_err());
        assert_eq!(controller.state().patients.len(), 1);
    }

    #[tokio::test]
    async fn delete_error_survives_unrelated_refresh_until_dismissed() {
        let store = RecordingStore::with_patients(vec![record("42", "A", "a@x.com", "Emergency")]);
        let mut controller = PatientSyncController::new(store.clone());

        store.fail_next(StoreError::transport("connection reset"));
        let id = RecordId::from("42");
        assert!(controller.delete_record(&id).await.is_err());

        controller.refresh().await.unwrap();
        controller.open_add_form();
        controller.close_form();
        assert_eq!(
            controller.state().error_scope,
            Some(ErrorScope::Delete(id.clone()))
        );
        assert!(controller.state().last_error.is_some());

        controller.dispatch(UiEvent::DismissError);
        assert!(controller.state().last_error.is_none());
        assert!(controller.state().error_scope.is_none());
    }

    #[tokio::test]
    async fn delete_error_clears_when_same_record_is_deleted() {
        let store = RecordingStore::with_patients(vec![record("42", "A", "a@x.com", "Emergency")]);
        let mut controller = PatientSyncController::new(store.clone());
        let id = RecordId::from("42");

        store.fail_next(StoreError::transport("timeout"));
        assert!(controller.delete_record(&id).await.is_err());
        controller.delete_record(&id).await.unwrap();

        assert!(controller.state().last_error.is_none());
        assert!(controller.state().patients.is_empty());
    }

    #[tokio::test]
    async fn save_error_clears_when_form_is_reopened() {
        let store = RecordingStore::with_patients(Vec::new());
        let mut controller = PatientSyncController::new(store.clone());

        controller.open_add_form();
        store.fail_next(StoreError::validation("Name", "姓名不能为空"));
        assert!(controller.save().await.is_err());
        assert_eq!(controller.state().error_scope, Some(ErrorScope::Save));

        // 刷新成功不影响保存错误
        controller.refresh().await.unwrap();
        assert!(controller.state().last_error.is_some());

        controller.close_form();
        controller.open_add_form();
        assert!(controller.state().last_error.is_none());
    }

    #[tokio::test]
    async fn late_save_completion_does_not_close_newer_form() {
        let store = RecordingStore::with_patients(vec![record("1", "A", "a@x.com", "Emergency")]);
        let mut controller = PatientSyncController::new(store.clone());

        controller
            .open_edit_form(&record("1", "A", "a@x.com", "Emergency"))
            .unwrap();
        let pending = controller.begin_save().unwrap();

        // 保存尚未完成时，用户关闭并打开了另一条记录的编辑弹窗
        controller.close_form();
        controller
            .open_edit_form(&record("2", "B", "b@x.com", "Consultation"))
            .unwrap();

        let completion = PatientSyncController::execute(store.clone(), pending).await;
        let follow_ups = controller.apply_completion(completion).await;

        assert_eq!(follow_ups.len(), 1);
        assert!(matches!(follow_ups[0].kind, CallKind::List { .. }));
        assert_eq!(
            controller.state().selected_record_id(),
            Some(&RecordId::from("2"))
        );
        assert_eq!(controller.state().draft.name, "B");
    }

    #[tokio::test]
    async fn older_list_result_is_discarded() {
        let store = RecordingStore::with_patients(vec![record("1", "A", "a@x.com", "Emergency")]);
        let mut controller = PatientSyncController::new(store.clone());

        let first = controller.begin_refresh();
        let second = controller.begin_refresh();

        let newer = Completion {
            call: second,
            result: Ok(CallOutput::Patients(vec![
                record("1", "A", "a@x.com", "Emergency"),
                record("2", "B", "b@x.com", "Consultation"),
            ])),
        };
        let older = Completion {
            call: first,
            result: Ok(CallOutput::Patients(Vec::new())),
        };

        controller.apply_completion(newer).await;
        controller.apply_completion(older).await;
        assert_eq!(controller.state().patients.len(), 2);
    }

    #[test]
    fn dispatch_routes_row_actions() {
        let mut controller = PatientSyncController::new(RecordingStore::with_patients(vec![]));

        let calls = controller.dispatch(UiEvent::row_action(
            RowAction::Delete,
            record("7", "C", "c@x.com", "Emergency"),
        ));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, CallKind::Delete(RecordId::from("7")));

        let calls = controller.dispatch(UiEvent::row_action(
            RowAction::Edit,
            record("7", "C", "c@x.com", "Emergency"),
        ));
        assert!(calls.is_empty());
        assert!(controller.state().modal_open());

        let calls = controller.dispatch(UiEvent::row_action(
            RowAction::Delete,
            PatientRecord::new_unsaved("C", "c@x.com", "Emergency"),
        ));
        assert!(calls.is_empty());
        assert!(controller.state().last_error.is_some());
    }

    #[test]
    fn field_changes_and_save_are_ignored_while_closed() {
        let mut controller = PatientSyncController::new(RecordingStore::with_patients(vec![]));
        controller.dispatch(UiEvent::field_changed(FormField::Name, "ghost"));
        assert!(controller.state().draft.is_empty());
        assert!(controller.dispatch(FormEvent::Save.into()).is_empty());
    }

    fn draft_strategy() -> impl Strategy<Value = (String, String, String)> {
        (
            "[A-Za-z ]{1,20}",
            "[a-z]{1,8}@[a-z]{1,8}\\.com",
            prop::sample::select(vec![
                "Consultation",
                "Follow-up",
                "Emergency",
                "Routine Check-Up",
            ])
            .prop_map(str::to_string),
        )
    }

    proptest! {
        #[test]
        fn save_without_selection_only_creates((name, email, vt) in draft_strategy()) {
            let mut controller = PatientSyncController::new(RecordingStore::with_patients(vec![]));
            controller.open_add_form();
            fill_draft(&mut controller, &name, &email, &vt);

            let calls = controller.dispatch(FormEvent::Save.into());
            prop_assert_eq!(calls.len(), 1);
            prop_assert_eq!(
                &calls[0].kind,
                &CallKind::Create(PatientRecord::new_unsaved(name, email, vt))
            );
        }

        #[test]
        fn save_with_selection_only_updates_that_id(
            (name, email, vt) in draft_strategy(),
            id in "[a-z0-9]{1,12}",
        ) {
            let mut controller = PatientSyncController::new(RecordingStore::with_patients(vec![]));
            controller
                .open_edit_form(&record(&id, "old", "old@x.com", "Emergency"))
                .unwrap();
            fill_draft(&mut controller, &name, &email, &vt);

            let calls = controller.dispatch(FormEvent::Save.into());
            prop_assert_eq!(calls.len(), 1);
            match &calls[0].kind {
                CallKind::Update(r) => {
                    prop_assert_eq!(r.id.as_ref(), Some(&RecordId::new(id.clone())));
                    prop_assert_eq!(&r.name, &name);
                }
                other => prop_assert!(false, "unexpected call {:?}", other),
            }
        }
    }
}
