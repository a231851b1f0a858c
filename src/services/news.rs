use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::auth::{authorize, Access, Principal};
use crate::database::{decode, decode_all, Fields, Query, RecordStore, Row, SortDirection};
use crate::types::Locale;

use super::audit::{changed_fields, snapshot, AuditAction, AuditLogger, Audited, NewAuditEntry};
use super::categories::{non_blank, CategoryService};
use super::error::{ServiceError, ServiceResult};
use super::localized::{parse_id, pick, TranslationRows, TranslationTable};
use super::validation;

pub const NEWS_TABLE: &str = "news";
pub const NEWS_TRANSLATIONS: TranslationTable = TranslationTable {
    table: "news_translations",
    parent_column: "news_id",
    columns: &["title", "excerpt", "content"],
};

const TRACKED: &[&str] = &[
    "slug",
    "category_id",
    "status",
    "image_url",
    "image_banner",
    "published_at",
    "title",
    "excerpt",
    "content",
    "translations",
];
const STATUSES: &[&str] = &["draft", "published"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct News {
    pub id: Uuid,
    pub slug: String,
    pub category_id: Option<Uuid>,
    pub status: NewsStatus,
    pub image_url: Option<String>,
    pub image_banner: Option<String>,
    pub author_id: Option<Uuid>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsTranslation {
    pub locale: Locale,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
}

/// Admin view: the base row with every stored translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsArticle {
    #[serde(flatten)]
    pub news: News,
    pub translations: Vec<NewsTranslation>,
}

/// Public view in one locale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizedNews {
    pub id: Uuid,
    pub slug: String,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub image_banner: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Locale the text is actually in; the fallback when the requested one is missing
    pub locale: Locale,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsTranslationInput {
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsInput {
    pub slug: String,
    pub category_id: Option<Uuid>,
    #[serde(default = "default_status")]
    pub status: String,
    pub image_url: Option<String>,
    pub image_banner: Option<String>,
    #[serde(default)]
    pub translations: BTreeMap<Locale, NewsTranslationInput>,
}

fn default_status() -> String {
    "draft".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsFilter {
    pub status: Option<String>,
    pub category_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicNewsFilter {
    pub locale: Option<Locale>,
    /// Category slug
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Clone)]
pub struct NewsService {
    store: Arc<dyn RecordStore>,
    audit: AuditLogger,
    categories: CategoryService,
}

impl NewsService {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditLogger) -> Self {
        let categories = CategoryService::new(store.clone(), audit.clone());
        Self {
            store,
            audit,
            categories,
        }
    }

    /// Published articles, newest first, in the requested locale.
    pub async fn list_published(&self, filter: &PublicNewsFilter) -> ServiceResult<Vec<LocalizedNews>> {
        let locale = filter.locale.unwrap_or(Locale::FALLBACK);
        let category_id = match &filter.category {
            Some(slug) => match self.categories.find_by_slug(slug).await? {
                Some(category) => Some(category.id),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let query = Query::new()
            .eq("status", "published")
            .eq_opt("category_id", category_id)
            .order_by("published_at", SortDirection::Desc)
            .limit(filter.limit.unwrap_or(12).clamp(1, 100))
            .offset(filter.offset.unwrap_or(0).max(0));
        let rows = self.store.select(NEWS_TABLE, &query).await?;
        let news: Vec<News> = decode_all(rows)?;

        let ids: Vec<Uuid> = news.iter().map(|n| n.id).collect();
        let mut translations = NEWS_TRANSLATIONS.load(self.store.as_ref(), &ids).await?;
        news.into_iter()
            .filter_map(|n| {
                let rows = translations.remove(&n.id).unwrap_or_default();
                localize(n, &rows, locale).transpose()
            })
            .collect()
    }

    pub async fn get_published(&self, slug: &str, locale: Locale) -> ServiceResult<LocalizedNews> {
        let query = Query::new().eq("slug", slug).eq("status", "published");
        let row = self
            .store
            .select_one(NEWS_TABLE, &query)
            .await?
            .ok_or_else(|| ServiceError::not_found("News not found"))?;
        let news: News = decode(row)?;
        let translations = NEWS_TRANSLATIONS.load_one(self.store.as_ref(), news.id).await?;
        localize(news, &translations, locale)?.ok_or_else(|| ServiceError::not_found("News not found"))
    }

    /// Every article regardless of status, for the admin panel.
    pub async fn list(&self, principal: Option<&Principal>, filter: &NewsFilter) -> ServiceResult<Vec<NewsArticle>> {
        authorize(principal, Access::Authenticated)?;
        if let Some(status) = &filter.status {
            validation::one_of("status", status, STATUSES)?;
        }

        let query = Query::new()
            .eq_opt("status", filter.status.as_deref())
            .eq_opt("category_id", filter.category_id)
            .order_by("created_at", SortDirection::Desc)
            .limit(filter.limit.unwrap_or(50).clamp(1, 200))
            .offset(filter.offset.unwrap_or(0).max(0));
        let news: Vec<News> = decode_all(self.store.select(NEWS_TABLE, &query).await?)?;

        let ids: Vec<Uuid> = news.iter().map(|n| n.id).collect();
        let mut translations = NEWS_TRANSLATIONS.load(self.store.as_ref(), &ids).await?;
        news.into_iter()
            .map(|n| {
                let rows = translations.remove(&n.id).unwrap_or_default();
                article(n, &rows)
            })
            .collect()
    }

    pub async fn get(&self, principal: Option<&Principal>, id: Uuid) -> ServiceResult<NewsArticle> {
        authorize(principal, Access::Authenticated)?;
        let (base, translations) = self.load(id).await?;
        article(decode(base)?, &translations)
    }

    pub async fn create(&self, principal: Option<&Principal>, input: NewsInput) -> ServiceResult<Audited<NewsArticle>> {
        let principal = authorize(principal, Access::Authenticated)?;
        self.validate(&input).await?;
        self.ensure_slug_free(&input.slug, None).await?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let published_at = (input.status == "published").then_some(now);
        let fields = base_fields(&input)
            .set("id", id)
            .set("author_id", principal.id)
            .set("published_at", published_at)
            .set("created_at", now)
            .set("updated_at", now);
        let base = self.store.insert(NEWS_TABLE, fields).await?;
        let translations = self.write_translations(id, &input).await?;

        let entry = NewAuditEntry::new(Some(principal), AuditAction::Create, NEWS_TABLE)
            .entity_id(id)
            .new_value(snapshot(&audit_view(&base, &translations), TRACKED));
        let audit = self.audit.record(entry).await;

        info!("News '{}' created by {}", input.slug, principal.email);
        Ok(Audited {
            value: article(decode(base)?, &translations)?,
            audit,
        })
    }

    /// Replace the base fields and upsert the supplied translations. Locales
    /// not present in the input keep their stored rows.
    pub async fn update(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
        input: NewsInput,
    ) -> ServiceResult<Audited<NewsArticle>> {
        let principal = authorize(principal, Access::Authenticated)?;
        self.validate(&input).await?;
        let (old_base, old_translations) = self.load(id).await?;
        self.ensure_slug_free(&input.slug, Some(id)).await?;

        let now = Utc::now();
        let already_published = old_base.get("published_at").is_some_and(|v| !v.is_null());
        let mut fields = base_fields(&input).set("updated_at", now);
        if input.status == "published" && !already_published {
            fields = fields.set("published_at", now);
        }

        let new_base = self
            .store
            .update(NEWS_TABLE, &Query::by_id(id), fields)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("News not found"))?;
        self.write_translations(id, &input).await?;
        let new_translations = NEWS_TRANSLATIONS.load_one(self.store.as_ref(), id).await?;

        let (before, after) = changed_fields(
            &audit_view(&old_base, &old_translations),
            &audit_view(&new_base, &new_translations),
            TRACKED,
        );
        let entry = NewAuditEntry::new(Some(principal), AuditAction::Update, NEWS_TABLE)
            .entity_id(id)
            .old_value(before)
            .new_value(after);
        let audit = self.audit.record(entry).await;

        Ok(Audited {
            value: article(decode(new_base)?, &new_translations)?,
            audit,
        })
    }

    pub async fn delete(&self, principal: Option<&Principal>, id: Uuid) -> ServiceResult<Audited<NewsArticle>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let (old_base, old_translations) = self.load(id).await?;

        NEWS_TRANSLATIONS.remove_all(self.store.as_ref(), id).await?;
        self.store.remove(NEWS_TABLE, &Query::by_id(id)).await?;

        let entry = NewAuditEntry::new(Some(principal), AuditAction::Delete, NEWS_TABLE)
            .entity_id(id)
            .old_value(snapshot(&audit_view(&old_base, &old_translations), TRACKED));
        let audit = self.audit.record(entry).await;

        Ok(Audited {
            value: article(decode(old_base)?, &old_translations)?,
            audit,
        })
    }

    async fn load(&self, id: Uuid) -> ServiceResult<(Row, TranslationRows)> {
        let base = self
            .store
            .select_one(NEWS_TABLE, &Query::by_id(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("News not found"))?;
        let translations = NEWS_TRANSLATIONS.load_one(self.store.as_ref(), id).await?;
        Ok((base, translations))
    }

    async fn validate(&self, input: &NewsInput) -> ServiceResult<()> {
        validation::slug("slug", &input.slug)?;
        validation::one_of("status", &input.status, STATUSES)?;

        let fallback = input.translations.get(&Locale::FALLBACK).ok_or_else(|| {
            ServiceError::validation(format!("a '{}' translation is required", Locale::FALLBACK))
        })?;
        validation::required("translations.pt.title", &fallback.title)?;
        for (locale, translation) in &input.translations {
            validation::required(&format!("translations.{}.title", locale), &translation.title)?;
        }

        if let Some(category_id) = input.category_id {
            if !self.categories.exists(category_id).await? {
                return Err(ServiceError::validation("category_id does not reference a category"));
            }
        }
        Ok(())
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<Uuid>) -> ServiceResult<()> {
        let existing = self.store.select_one(NEWS_TABLE, &Query::new().eq("slug", slug)).await?;
        match existing.as_ref().and_then(parse_id) {
            Some(found) if Some(found) != except => Err(ServiceError::conflict(format!(
                "A news article with slug '{}' already exists",
                slug
            ))),
            _ => Ok(()),
        }
    }

    /// Upsert only the locales present in the input.
    async fn write_translations(&self, id: Uuid, input: &NewsInput) -> ServiceResult<TranslationRows> {
        let mut written = TranslationRows::new();
        for (locale, translation) in &input.translations {
            let fields = Fields::new()
                .set("title", translation.title.trim())
                .set("excerpt", non_blank(&translation.excerpt))
                .set("content", non_blank(&translation.content));
            let row = NEWS_TRANSLATIONS
                .upsert(self.store.as_ref(), id, *locale, fields)
                .await?;
            written.insert(*locale, row);
        }
        Ok(written)
    }
}

fn base_fields(input: &NewsInput) -> Fields {
    Fields::new()
        .set("slug", input.slug.as_str())
        .set("category_id", input.category_id)
        .set("status", input.status.as_str())
        .set("image_url", non_blank(&input.image_url))
        .set("image_banner", non_blank(&input.image_banner))
}

fn audit_view(base: &Row, translations: &TranslationRows) -> Row {
    let mut view = base.clone();
    NEWS_TRANSLATIONS.snapshot_into(&mut view, translations);
    view
}

fn article(news: News, translations: &TranslationRows) -> ServiceResult<NewsArticle> {
    let translations = translations
        .values()
        .map(|row| Ok(serde_json::from_value(Value::Object(row.clone()))?))
        .collect::<ServiceResult<Vec<NewsTranslation>>>()?;
    Ok(NewsArticle { news, translations })
}

/// `None` when the article has no usable translation at all.
fn localize(news: News, translations: &TranslationRows, locale: Locale) -> ServiceResult<Option<LocalizedNews>> {
    let Some((actual, row)) = pick(translations, locale) else {
        return Ok(None);
    };
    let translation: NewsTranslation = serde_json::from_value(Value::Object(row.clone()))?;
    Ok(Some(LocalizedNews {
        id: news.id,
        slug: news.slug,
        category_id: news.category_id,
        image_url: news.image_url,
        image_banner: news.image_banner,
        published_at: news.published_at,
        locale: actual,
        title: translation.title,
        excerpt: translation.excerpt,
        content: translation.content,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::MemoryRecordStore;
    use crate::services::audit::{AuditOutcome, AUDIT_TABLE};
    use serde_json::json;

    fn service() -> (Arc<MemoryRecordStore>, NewsService) {
        let store = Arc::new(MemoryRecordStore::new());
        let service = NewsService::new(store.clone(), AuditLogger::new(store.clone()));
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

    fn input(slug: &str, title: &str, status: &str) -> NewsInput {
        let mut translations = BTreeMap::new();
        translations.insert(
            Locale::Pt,
            NewsTranslationInput {
                title: title.into(),
                excerpt: Some("Resumo".into()),
                content: None,
            },
        );
        NewsInput {
            slug: slug.into(),
            category_id: None,
            status: status.into(),
            image_url: None,
            image_banner: None,
            translations,
        }
    }

    #[tokio::test]
    async fn pt_only_create_writes_one_translation() {
        let (store, service) = service();
        let created = service.create(Some(&editor()), input("irpf-2024", "A", "draft")).await.unwrap();

        let rows = store.rows("news_translations");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["locale"], "pt");
        assert_eq!(created.value.translations.len(), 1);
        assert_eq!(created.value.news.published_at, None);
    }

    #[tokio::test]
    async fn title_change_is_audited_as_single_update() {
        let (store, service) = service();
        let editor = editor();
        let id = service
            .create(Some(&editor), input("irpf-2024", "A", "draft"))
            .await
            .unwrap()
            .value
            .news
            .id;

        let updated = service.update(Some(&editor), id, input("irpf-2024", "B", "draft")).await.unwrap();
        assert_eq!(updated.audit, AuditOutcome::Recorded);

        let updates: Vec<Row> = store
            .rows(AUDIT_TABLE)
            .into_iter()
            .filter(|r| r["action"] == "update")
            .collect();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0]["entity"], "news");
        assert_eq!(updates[0]["old_value"]["title"], "A");
        assert_eq!(updates[0]["new_value"]["title"], "B");
        assert!(updates[0]["old_value"].get("slug").is_none());
    }

    #[tokio::test]
    async fn translation_upserts_do_not_duplicate() {
        let (store, service) = service();
        let editor = editor();
        let mut first = input("guia", "Guia", "draft");
        first.translations.insert(
            Locale::En,
            NewsTranslationInput {
                title: "Guide".into(),
                excerpt: None,
                content: None,
            },
        );
        let id = service.create(Some(&editor), first).await.unwrap().value.news.id;

        // en is absent from the second save and must be kept as stored
        service.update(Some(&editor), id, input("guia", "Guia 2", "draft")).await.unwrap();

        let rows = store.rows("news_translations");
        assert_eq!(rows.len(), 2);
        let en = rows.iter().find(|r| r["locale"] == "en").unwrap();
        assert_eq!(en["title"], "Guide");
    }

    #[tokio::test]
    async fn missing_pt_or_bad_slug_is_rejected_without_writes() {
        let (store, service) = service();
        let mut no_pt = input("guia", "Guia", "draft");
        no_pt.translations.clear();
        assert!(matches!(
            service.create(Some(&editor()), no_pt).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.create(Some(&editor()), input("Guia!", "Guia", "draft")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.create(Some(&editor()), input("guia", "Guia", "archived")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(store.rows(NEWS_TABLE).is_empty());
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let (store, service) = service();
        service.create(Some(&editor()), input("guia", "Guia", "draft")).await.unwrap();
        assert!(matches!(
            service.create(Some(&editor()), input("guia", "Outro", "draft")).await,
            Err(ServiceError::Conflict(_))
        ));
        assert_eq!(store.rows(NEWS_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn public_reads_only_see_published_with_pt_fallback() {
        let (_store, service) = service();
        let editor = editor();
        service.create(Some(&editor), input("rascunho", "Rascunho", "draft")).await.unwrap();
        let id = service
            .create(Some(&editor), input("publicada", "Publicada", "draft"))
            .await
            .unwrap()
            .value
            .news
            .id;
        let published = service
            .update(Some(&editor), id, input("publicada", "Publicada", "published"))
            .await
            .unwrap();
        assert!(published.value.news.published_at.is_some());

        let filter = PublicNewsFilter {
            locale: Some(Locale::Es),
            ..Default::default()
        };
        let list = service.list_published(&filter).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].locale, Locale::Pt);
        assert_eq!(list[0].title, "Publicada");

        assert!(matches!(
            service.get_published("rascunho", Locale::Pt).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_translations_and_audits_old_state() {
        let (store, service) = service();
        let editor = editor();
        let id = service
            .create(Some(&editor), input("guia", "Guia", "draft"))
            .await
            .unwrap()
            .value
            .news
            .id;
        service.delete(Some(&editor), id).await.unwrap();

        assert!(store.rows(NEWS_TABLE).is_empty());
        assert!(store.rows("news_translations").is_empty());
        let last = store.rows(AUDIT_TABLE).pop().unwrap();
        assert_eq!(last["action"], "delete");
        assert_eq!(last["old_value"]["title"], json!("Guia"));
        assert_eq!(last["new_value"], Value::Null);
    }
}
