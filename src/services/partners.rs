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

pub const PARTNERS_TABLE: &str = "partners";
const TRACKED: &[&str] = &["name", "type", "logo_url", "is_active", "display_order"];
const PARTNER_TYPES: &[&str] = &["partner", "client"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartnerInput {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub logo_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

fn default_active() -> bool {
    true
}

#[derive(Clone)]
pub struct PartnerService {
    store: Arc<dyn RecordStore>,
    table: AuditedTable,
}

impl PartnerService {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditLogger) -> Self {
        let table = AuditedTable::new(store.clone(), audit, PARTNERS_TABLE, "Partner", TRACKED);
        Self { store, table }
    }

    /// Active partners for the public site, optionally of one type.
    pub async fn list_public(&self, kind: Option<&str>) -> ServiceResult<Vec<Partner>> {
        if let Some(kind) = kind {
            validation::one_of("type", kind, PARTNER_TYPES)?;
        }
        let query = Query::new()
            .eq("is_active", true)
            .eq_opt("type", kind)
            .order_by("display_order", SortDirection::Asc)
            .order_by("name", SortDirection::Asc);
        Ok(decode_all(self.store.select(PARTNERS_TABLE, &query).await?)?)
    }

    pub async fn list(&self, principal: Option<&Principal>) -> ServiceResult<Vec<Partner>> {
        authorize(principal, Access::Authenticated)?;
        let query = Query::new()
            .order_by("display_order", SortDirection::Asc)
            .order_by("name", SortDirection::Asc);
        Ok(decode_all(self.store.select(PARTNERS_TABLE, &query).await?)?)
    }

    pub async fn create(&self, principal: Option<&Principal>, input: PartnerInput) -> ServiceResult<Audited<Partner>> {
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
        input: PartnerInput,
    ) -> ServiceResult<Audited<Partner>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let fields = Self::validate(&input)?.set("updated_at", Utc::now());

        let updated = self.table.update(principal, id, fields).await?;
        Ok(Audited {
            value: decode(updated.value)?,
            audit: updated.audit,
        })
    }

    pub async fn delete(&self, principal: Option<&Principal>, id: Uuid) -> ServiceResult<Audited<Partner>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let deleted = self.table.delete(principal, id).await?;
        Ok(Audited {
            value: decode(deleted.value)?,
            audit: deleted.audit,
        })
    }

    fn validate(input: &PartnerInput) -> ServiceResult<Fields> {
        let name = validation::required("name", &input.name)?;
        let kind = validation::one_of("type", &input.kind, PARTNER_TYPES)?;
        Ok(Fields::new()
            .set("name", name)
            .set("type", kind)
            .set("logo_url", non_blank(&input.logo_url))
            .set("is_active", input.is_active)
            .set("display_order", input.display_order))
    }
}
