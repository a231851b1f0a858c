use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{authorize, Access, Principal};
use crate::database::{decode, decode_all, Fields, Query, RecordStore, SortDirection};

use super::audit::{AuditLogger, Audited};
use super::audited::AuditedTable;
use super::error::{ServiceError, ServiceResult};
use super::validation;

pub const CATEGORIES_TABLE: &str = "news_categories";
const TRACKED: &[&str] = &["slug", "name_pt", "name_en", "name_es", "color"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub slug: String,
    pub name_pt: String,
    pub name_en: Option<String>,
    pub name_es: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub slug: String,
    pub name_pt: String,
    pub name_en: Option<String>,
    pub name_es: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn RecordStore>,
    table: AuditedTable,
}

impl CategoryService {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditLogger) -> Self {
        let table = AuditedTable::new(store.clone(), audit, CATEGORIES_TABLE, "Category", TRACKED);
        Self { store, table }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Category>> {
        let rows = self
            .store
            .select(CATEGORIES_TABLE, &Query::new().order_by("name_pt", SortDirection::Asc))
            .await?;
        Ok(decode_all(rows)?)
    }

    pub async fn find_by_slug(&self, slug: &str) -> ServiceResult<Option<Category>> {
        let row = self
            .store
            .select_one(CATEGORIES_TABLE, &Query::new().eq("slug", slug))
            .await?;
        Ok(row.map(decode).transpose()?)
    }

    pub async fn exists(&self, id: Uuid) -> ServiceResult<bool> {
        Ok(self.table.find(id).await?.is_some())
    }

    pub async fn create(&self, principal: Option<&Principal>, input: CategoryInput) -> ServiceResult<Audited<Category>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let fields = Self::validate(&input)?;
        self.ensure_slug_free(&input.slug, None).await?;

        let fields = fields.set("id", Uuid::new_v4());
        let created = self.table.create(principal, fields).await?;
        Ok(Audited {
            value: decode(created.value)?,
            audit: created.audit,
        })
    }

    pub async fn update(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
        input: CategoryInput,
    ) -> ServiceResult<Audited<Category>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let fields = Self::validate(&input)?;
        self.table.get(id).await?;
        self.ensure_slug_free(&input.slug, Some(id)).await?;

        let updated = self.table.update(principal, id, fields).await?;
        Ok(Audited {
            value: decode(updated.value)?,
            audit: updated.audit,
        })
    }

    pub async fn delete(&self, principal: Option<&Principal>, id: Uuid) -> ServiceResult<Audited<Category>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let deleted = self.table.delete(principal, id).await?;
        Ok(Audited {
            value: decode(deleted.value)?,
            audit: deleted.audit,
        })
    }

    fn validate(input: &CategoryInput) -> ServiceResult<Fields> {
        validation::slug("slug", &input.slug)?;
        let name_pt = validation::required("name_pt", &input.name_pt)?;
        Ok(Fields::new()
            .set("slug", input.slug.as_str())
            .set("name_pt", name_pt)
            .set("name_en", non_blank(&input.name_en))
            .set("name_es", non_blank(&input.name_es))
            .set("color", non_blank(&input.color)))
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<Uuid>) -> ServiceResult<()> {
        match self.find_by_slug(slug).await? {
            Some(existing) if Some(existing.id) != except => Err(ServiceError::conflict(format!(
                "A category with slug '{}' already exists",
                slug
            ))),
            _ => Ok(()),
        }
    }
}

/// Optional text with surrounding whitespace removed; blank becomes `None`.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::MemoryRecordStore;
    use crate::services::audit::AUDIT_TABLE;

    fn service() -> (Arc<MemoryRecordStore>, CategoryService) {
        let store = Arc::new(MemoryRecordStore::new());
        let service = CategoryService::new(store.clone(), AuditLogger::new(store.clone()));
        (store, service)
    }

    fn editor() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Editor".into(),
            email: "editor@example.com".into(),
            role: Role::Editor,
        }
    }

    fn input(slug: &str) -> CategoryInput {
        CategoryInput {
            slug: slug.into(),
            name_pt: "Tecnologia".into(),
            name_en: Some("Technology".into()),
            name_es: None,
            color: Some("  ".into()),
        }
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let (store, service) = service();
        let created = service.create(Some(&editor()), input("tech")).await.unwrap();
        assert_eq!(created.value.color, None);

        let second = service.create(Some(&editor()), input("tech")).await;
        assert!(matches!(second, Err(ServiceError::Conflict(_))));
        assert_eq!(store.rows(CATEGORIES_TABLE).len(), 1);
        assert_eq!(store.rows(AUDIT_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn invalid_input_writes_nothing() {
        let (store, service) = service();
        let mut bad = input("Tech News");
        assert!(matches!(
            service.create(Some(&editor()), bad.clone()).await,
            Err(ServiceError::Validation(_))
        ));
        bad.slug = "tech".into();
        bad.name_pt = " ".into();
        assert!(matches!(
            service.create(Some(&editor()), bad).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.create(None, input("tech")).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(store.rows(CATEGORIES_TABLE).is_empty());
        assert!(store.rows(AUDIT_TABLE).is_empty());
    }

    #[tokio::test]
    async fn update_can_keep_own_slug() {
        let (_store, service) = service();
        let created = service.create(Some(&editor()), input("tech")).await.unwrap().into_inner();
        let mut change = input("tech");
        change.name_pt = "Tecnologia e Inovação".into();
        let updated = service.update(Some(&editor()), created.id, change).await.unwrap();
        assert_eq!(updated.value.name_pt, "Tecnologia e Inovação");
    }

    #[tokio::test]
    async fn missing_id_is_not_found() {
        let (_store, service) = service();
        assert!(matches!(
            service.delete(Some(&editor()), Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
