use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{authorize, Access, Principal};
use crate::database::{decode, decode_all, Fields, Query, RecordStore, SortDirection};

use super::audit::{AuditLogger, Audited};
use super::audited::AuditedTable;
use super::categories::non_blank;
use super::error::ServiceResult;
use super::validation;

pub const SEGMENTS_TABLE: &str = "segments";
const TRACKED: &[&str] = &["title", "lp_slug", "image_url", "video_url", "is_active", "display_order"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub title: String,
    /// Landing page this segment links to
    pub lp_slug: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentInput {
    pub title: String,
    pub lp_slug: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

fn default_active() -> bool {
    true
}

#[derive(Clone)]
pub struct SegmentService {
    store: Arc<dyn RecordStore>,
    table: AuditedTable,
}

impl SegmentService {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditLogger) -> Self {
        let table = AuditedTable::new(store.clone(), audit, SEGMENTS_TABLE, "Segment", TRACKED);
        Self { store, table }
    }

    pub async fn list_public(&self) -> ServiceResult<Vec<Segment>> {
        let query = Query::new()
            .eq("is_active", true)
            .order_by("display_order", SortDirection::Asc);
        Ok(decode_all(self.store.select(SEGMENTS_TABLE, &query).await?)?)
    }

    pub async fn list(&self, principal: Option<&Principal>) -> ServiceResult<Vec<Segment>> {
        authorize(principal, Access::Authenticated)?;
        let query = Query::new().order_by("display_order", SortDirection::Asc);
        Ok(decode_all(self.store.select(SEGMENTS_TABLE, &query).await?)?)
    }

    pub async fn create(&self, principal: Option<&Principal>, input: SegmentInput) -> ServiceResult<Audited<Segment>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let now = Utc::now();
        let fields = Self::validate(&input)?
            .set("id", Uuid::new_v4())
            .set("created_at", now)
            .set("updated_at", now);

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
        input: SegmentInput,
    ) -> ServiceResult<Audited<Segment>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let fields = Self::validate(&input)?.set("updated_at", Utc::now());

        let updated = self.table.update(principal, id, fields).await?;
        Ok(Audited {
            value: decode(updated.value)?,
            audit: updated.audit,
        })
    }

    pub async fn delete(&self, principal: Option<&Principal>, id: Uuid) -> ServiceResult<Audited<Segment>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let deleted = self.table.delete(principal, id).await?;
        Ok(Audited {
            value: decode(deleted.value)?,
            audit: deleted.audit,
        })
    }

    fn validate(input: &SegmentInput) -> ServiceResult<Fields> {
        let title = validation::required("title", &input.title)?;
        let lp_slug = non_blank(&input.lp_slug);
        if let Some(slug) = lp_slug {
            validation::slug("lp_slug", slug)?;
        }
        Ok(Fields::new()
            .set("title", title)
            .set("lp_slug", lp_slug)
            .set("image_url", non_blank(&input.image_url))
            .set("video_url", non_blank(&input.video_url))
            .set("is_active", input.is_active)
            .set("display_order", input.display_order))
    }
}
