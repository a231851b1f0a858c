use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::{authorize, Access, Principal};
use crate::database::{decode, decode_all, Fields, Query, RecordStore, Row, SortDirection};
use crate::types::Locale;

use super::audit::{changed_fields, snapshot, AuditAction, AuditLogger, Audited, NewAuditEntry};
use super::categories::non_blank;
use super::error::{ServiceError, ServiceResult};
use super::localized::{pick, TranslationRows, TranslationTable};
use super::validation;

pub const TESTIMONIALS_TABLE: &str = "testimonials";
pub const TESTIMONIAL_TRANSLATIONS: TranslationTable = TranslationTable {
    table: "testimonial_translations",
    parent_column: "testimonial_id",
    columns: &["role", "company", "content"],
};

const TRACKED: &[&str] = &[
    "name",
    "avatar_url",
    "is_active",
    "display_order",
    "role",
    "company",
    "content",
    "translations",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestimonialTranslation {
    pub locale: Locale,
    pub role: Option<String>,
    pub company: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestimonialWithTranslations {
    #[serde(flatten)]
    pub testimonial: Testimonial,
    pub translations: Vec<TestimonialTranslation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizedTestimonial {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub locale: Locale,
    pub role: Option<String>,
    pub company: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestimonialTranslationInput {
    pub role: Option<String>,
    pub company: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestimonialInput {
    pub name: String,
    pub avatar_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub translations: BTreeMap<Locale, TestimonialTranslationInput>,
}

fn default_active() -> bool {
    true
}

#[derive(Clone)]
pub struct TestimonialService {
    store: Arc<dyn RecordStore>,
    audit: AuditLogger,
}

impl TestimonialService {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditLogger) -> Self {
        Self { store, audit }
    }

    pub async fn list_public(&self, locale: Locale) -> ServiceResult<Vec<LocalizedTestimonial>> {
        let query = Query::new()
            .eq("is_active", true)
            .order_by("display_order", SortDirection::Asc);
        let testimonials: Vec<Testimonial> = decode_all(self.store.select(TESTIMONIALS_TABLE, &query).await?)?;

        let ids: Vec<Uuid> = testimonials.iter().map(|t| t.id).collect();
        let mut translations = TESTIMONIAL_TRANSLATIONS.load(self.store.as_ref(), &ids).await?;

        let mut localized = Vec::with_capacity(testimonials.len());
        for testimonial in testimonials {
            let rows = translations.remove(&testimonial.id).unwrap_or_default();
            let Some((actual, row)) = pick(&rows, locale) else {
                continue;
            };
            let translation: TestimonialTranslation = serde_json::from_value(Value::Object(row.clone()))?;
            localized.push(LocalizedTestimonial {
                id: testimonial.id,
                name: testimonial.name,
                avatar_url: testimonial.avatar_url,
                locale: actual,
                role: translation.role,
                company: translation.company,
                content: translation.content,
            });
        }
        Ok(localized)
    }

    pub async fn list(&self, principal: Option<&Principal>) -> ServiceResult<Vec<TestimonialWithTranslations>> {
        authorize(principal, Access::Authenticated)?;
        let query = Query::new().order_by("display_order", SortDirection::Asc);
        let testimonials: Vec<Testimonial> = decode_all(self.store.select(TESTIMONIALS_TABLE, &query).await?)?;

        let ids: Vec<Uuid> = testimonials.iter().map(|t| t.id).collect();
        let mut translations = TESTIMONIAL_TRANSLATIONS.load(self.store.as_ref(), &ids).await?;
        testimonials
            .into_iter()
            .map(|t| {
                let rows = translations.remove(&t.id).unwrap_or_default();
                with_translations(t, &rows)
            })
            .collect()
    }

    pub async fn create(
        &self,
        principal: Option<&Principal>,
        input: TestimonialInput,
    ) -> ServiceResult<Audited<TestimonialWithTranslations>> {
        let principal = authorize(principal, Access::Authenticated)?;
        validate(&input)?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let fields = base_fields(&input)
            .set("id", id)
            .set("created_at", now)
            .set("updated_at", now);
        let base = self.store.insert(TESTIMONIALS_TABLE, fields).await?;
        let translations = self.write_translations(id, &input).await?;

        let entry = NewAuditEntry::new(Some(principal), AuditAction::Create, TESTIMONIALS_TABLE)
            .entity_id(id)
            .new_value(snapshot(&audit_view(&base, &translations), TRACKED));
        let audit = self.audit.record(entry).await;

        Ok(Audited {
            value: with_translations(decode(base)?, &translations)?,
            audit,
        })
    }

    pub async fn update(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
        input: TestimonialInput,
    ) -> ServiceResult<Audited<TestimonialWithTranslations>> {
        let principal = authorize(principal, Access::Authenticated)?;
        validate(&input)?;
        let (old_base, old_translations) = self.load(id).await?;

        let fields = base_fields(&input).set("updated_at", Utc::now());
        let new_base = self
            .store
            .update(TESTIMONIALS_TABLE, &Query::by_id(id), fields)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("Testimonial not found"))?;
        self.write_translations(id, &input).await?;
        let new_translations = TESTIMONIAL_TRANSLATIONS.load_one(self.store.as_ref(), id).await?;

        let (before, after) = changed_fields(
            &audit_view(&old_base, &old_translations),
            &audit_view(&new_base, &new_translations),
            TRACKED,
        );
        let entry = NewAuditEntry::new(Some(principal), AuditAction::Update, TESTIMONIALS_TABLE)
            .entity_id(id)
            .old_value(before)
            .new_value(after);
        let audit = self.audit.record(entry).await;

        Ok(Audited {
            value: with_translations(decode(new_base)?, &new_translations)?,
            audit,
        })
    }

    pub async fn delete(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
    ) -> ServiceResult<Audited<TestimonialWithTranslations>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let (old_base, old_translations) = self.load(id).await?;

        TESTIMONIAL_TRANSLATIONS.remove_all(self.store.as_ref(), id).await?;
        self.store.remove(TESTIMONIALS_TABLE, &Query::by_id(id)).await?;

        let entry = NewAuditEntry::new(Some(principal), AuditAction::Delete, TESTIMONIALS_TABLE)
            .entity_id(id)
            .old_value(snapshot(&audit_view(&old_base, &old_translations), TRACKED));
        let audit = self.audit.record(entry).await;

        Ok(Audited {
            value: with_translations(decode(old_base)?, &old_translations)?,
            audit,
        })
    }

    async fn load(&self, id: Uuid) -> ServiceResult<(Row, TranslationRows)> {
        let base = self
            .store
            .select_one(TESTIMONIALS_TABLE, &Query::by_id(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("Testimonial not found"))?;
        let translations = TESTIMONIAL_TRANSLATIONS.load_one(self.store.as_ref(), id).await?;
        Ok((base, translations))
    }

    async fn write_translations(&self, id: Uuid, input: &TestimonialInput) -> ServiceResult<TranslationRows> {
        let mut written = TranslationRows::new();
        for (locale, translation) in &input.translations {
            let fields = Fields::new()
                .set("role", non_blank(&translation.role))
                .set("company", non_blank(&translation.company))
                .set("content", translation.content.trim());
            let row = TESTIMONIAL_TRANSLATIONS
                .upsert(self.store.as_ref(), id, *locale, fields)
                .await?;
            written.insert(*locale, row);
        }
        Ok(written)
    }
}

fn validate(input: &TestimonialInput) -> ServiceResult<()> {
    validation::required("name", &input.name)?;
    if !input.translations.contains_key(&Locale::FALLBACK) {
        return Err(ServiceError::validation(format!(
            "a '{}' translation is required",
            Locale::FALLBACK
        )));
    }
    for (locale, translation) in &input.translations {
        validation::required(&format!("translations.{}.content", locale), &translation.content)?;
    }
    Ok(())
}

fn base_fields(input: &TestimonialInput) -> Fields {
    Fields::new()
        .set("name", input.name.trim())
        .set("avatar_url", non_blank(&input.avatar_url))
        .set("is_active", input.is_active)
        .set("display_order", input.display_order)
}

fn audit_view(base: &Row, translations: &TranslationRows) -> Row {
    let mut view = base.clone();
    TESTIMONIAL_TRANSLATIONS.snapshot_into(&mut view, translations);
    view
}

fn with_translations(testimonial: Testimonial, rows: &TranslationRows) -> ServiceResult<TestimonialWithTranslations> {
    let translations = rows
        .values()
        .map(|row| Ok(serde_json::from_value(Value::Object(row.clone()))?))
        .collect::<ServiceResult<Vec<TestimonialTranslation>>>()?;
    Ok(TestimonialWithTranslations {
        testimonial,
        translations,
    })
}
