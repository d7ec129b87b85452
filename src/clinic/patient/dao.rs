//! 患者数据访问层（DAO）
//!
//! 基于 sqlx 的本地 SQLite 记录存储，可作为自托管后端使用。
//! 与远程后端一样负责分配记录 ID 和校验字段内容。

use crate::clinic::error::StoreError;
use crate::clinic::patient::models::{PatientRecord, RecordId, VisitType};
use crate::clinic::patient::store::RecordStore;
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 患者 DAO（基于 sqlx）
pub struct PatientDao {
    db: Pool<Sqlite>,
}

impl PatientDao {
    /// 创建新的患者 DAO（表结构由 sqlx::migrate! 管理）
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// 后端侧字段校验
    fn validate(record: &PatientRecord) -> Result<(), StoreError> {
        if record.name.trim().is_empty() {
            return Err(StoreError::validation("Name", "姓名不能为空"));
        }
        if !record.email.contains('@') {
            return Err(StoreError::validation("Email__c", "邮箱格式不正确"));
        }
        if VisitType::from_label(&record.visit_type).is_none() {
            return Err(StoreError::validation(
                "Visit_Type__c",
                format!("未知的就诊类型: {}", record.visit_type),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PatientDao {
    async fn list(&self) -> Result<Vec<PatientRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, visit_type
            FROM patients
            ORDER BY rowid ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let patients: Vec<PatientRecord> = rows
            .into_iter()
            .map(|m| PatientRecord {
                id: Some(RecordId::new(m.get::<String, _>("id"))),
                name: m.get("name"),
                email: m.get("email"),
                visit_type: m.get("visit_type"),
            })
            .collect();

        debug!("[PatientDAO] 获取患者列表，共 {} 条", patients.len());
        Ok(patients)
    }

    async fn create(&self, record: &PatientRecord) -> Result<PatientRecord, StoreError> {
        if record.id.is_some() {
            return Err(StoreError::validation("Id", "新增记录不能携带 ID"));
        }
        Self::validate(record)?;

        let id = RecordId::new(Uuid::new_v4().to_string());
        let now = chrono::Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO patients (id, name, email, visit_type, create_time, update_time)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.visit_type)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        info!("[PatientDAO] 新增患者: {} ({})", record.name, id);
        Ok(PatientRecord {
            id: Some(id),
            ..record.clone()
        })
    }

    async fn update(&self, record: &PatientRecord) -> Result<(), StoreError> {
        let id = record
            .id
            .as_ref()
            .ok_or_else(|| StoreError::validation("Id", "更新操作要求记录带有 ID"))?;
        Self::validate(record)?;

        let result = sqlx::query(
            r#"
            UPDATE patients SET
                name = ?,
                email = ?,
                visit_type = ?,
                update_time = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.visit_type)
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(id.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            warn!("[PatientDAO] 更新的患者不存在: {}", id);
            return Err(StoreError::NotFound(id.clone()));
        }
        info!("[PatientDAO] 更新患者: {}", id);
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM patients WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            warn!("[PatientDAO] 删除的患者不存在: {}", id);
            return Err(StoreError::NotFound(id.clone()));
        }
        info!("[PatientDAO] 删除患者: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinic::db::create_sqlite_pool_with_migration;

    async fn memory_dao() -> PatientDao {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:")
            .await
            .unwrap();
        PatientDao::new(pool)
    }

    #[tokio::test]
    async fn create_assigns_id_and_list_preserves_insert_order() {
        let dao = memory_dao().await;

        let jane = dao
            .create(&PatientRecord::new_unsaved("Jane Doe", "jane@x.com", "Consultation"))
            .await
            .unwrap();
        let bob = dao
            .create(&PatientRecord::new_unsaved("Bob", "bob@x.com", "Emergency"))
            .await
            .unwrap();
        assert!(jane.id.is_some());
        assert_ne!(jane.id, bob.id);

        let listed = dao.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed, vec![jane.clone(), bob.clone()]);

        // 更新不改变顺序
        let renamed = PatientRecord {
            name: "Jane Roe".to_string(),
            ..jane.clone()
        };
        dao.update(&renamed).await.unwrap();
        assert_eq!(dao.list().await.unwrap(), vec![renamed, bob]);
    }

    #[tokio::test]
    async fn rejects_invalid_fields() {
        let dao = memory_dao().await;

        let err = dao
            .create(&PatientRecord::new_unsaved("", "a@x.com", "Emergency"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::validation("Name", "姓名不能为空"));

        let err = dao
            .create(&PatientRecord::new_unsaved("A", "a@x.com", "Surgery"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation { field: Some(ref f), .. } if f == "Visit_Type__c"
        ));
        assert!(dao.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_missing_record_report_not_found() {
        let dao = memory_dao().await;
        let ghost = RecordId::from("ghost");

        let mut record = PatientRecord::new_unsaved("A", "a@x.com", "Emergency");
        record.id = Some(ghost.clone());
        assert_eq!(
            dao.update(&record).await.unwrap_err(),
            StoreError::NotFound(ghost.clone())
        );
        assert_eq!(
            dao.delete(&ghost).await.unwrap_err(),
            StoreError::NotFound(ghost)
        );
    }

    #[tokio::test]
    async fn update_overwrites_fields() {
        let dao = memory_dao().await;
        let mut created = dao
            .create(&PatientRecord::new_unsaved("A", "a@x.com", "Emergency"))
            .await
            .unwrap();

        created.visit_type = "Follow-up".to_string();
        dao.update(&created).await.unwrap();

        let listed = dao.list().await.unwrap();
        assert_eq!(listed, vec![created.clone()]);

        dao.delete(created.id.as_ref().unwrap()).await.unwrap();
        assert!(dao.list().await.unwrap().is_empty());
    }
}
