use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::auth::{authorize, Access, Principal};
use crate::types::Locale;

use super::audit::{as_row, changed_keys, AuditAction, AuditLogger, Audited, NewAuditEntry};
use super::error::{ServiceError, ServiceResult};
use super::static_content::{read_json, StaticContentError};
use super::validation;

pub const LANDING_ENTITY: &str = "landing_pages";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LandingPageRef {
    pub locale: Locale,
    pub slug: String,
}

/// Landing pages stored as `<root>/<locale>/<slug>.json`.
///
/// The files are the system of record; there is no database copy.
#[derive(Clone)]
pub struct LandingPages {
    root: PathBuf,
    audit: AuditLogger,
}

impl LandingPages {
    pub fn new(root: impl Into<PathBuf>, audit: AuditLogger) -> Self {
        Self {
            root: root.into(),
            audit,
        }
    }

    pub async fn read(&self, locale: Locale, slug: &str) -> ServiceResult<Value> {
        let path = self.path(locale, slug)?;
        match read_json(&path).await {
            Ok(content) => Ok(content),
            Err(StaticContentError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(ServiceError::not_found(format!("Landing page {}/{} not found", locale, slug)))
            }
            Err(StaticContentError::Io { source, .. }) => Err(source.into()),
            Err(e @ StaticContentError::Parse { .. }) => Err(ServiceError::Internal(e.to_string())),
        }
    }

    pub async fn list(&self, principal: Option<&Principal>, locale: Option<Locale>) -> ServiceResult<Vec<LandingPageRef>> {
        authorize(principal, Access::Authenticated)?;
        let locales = match locale {
            Some(locale) => vec![locale],
            None => Locale::ALL.to_vec(),
        };

        let mut pages = Vec::new();
        for locale in locales {
            let dir = self.root.join(locale.as_str());
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if validation::slug("slug", slug).is_ok() {
                    pages.push(LandingPageRef {
                        locale,
                        slug: slug.to_string(),
                    });
                }
            }
        }
        pages.sort();
        Ok(pages)
    }

    /// Replace the whole document. Written to a temporary file in the same
    /// directory and renamed over the target, so readers never see a partial file.
    pub async fn save(
        &self,
        principal: Option<&Principal>,
        locale: Locale,
        slug: &str,
        content: Value,
    ) -> ServiceResult<Audited<Value>> {
        let principal = authorize(principal, Access::Authenticated)?;
        let path = self.path(locale, slug)?;
        if !content.is_object() {
            return Err(ServiceError::validation("landing page content must be a JSON object"));
        }

        let previous = match self.read(locale, slug).await {
            Ok(previous) => Some(previous),
            Err(ServiceError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        write_atomic(&path, &content).await?;

        let entry = NewAuditEntry::new(
            Some(principal),
            if previous.is_some() { AuditAction::Update } else { AuditAction::Create },
            LANDING_ENTITY,
        )
        .entity_id(format!("{}/{}", locale, slug));
        let entry = match &previous {
            Some(old) => {
                let (before, after) = changed_keys(&as_row(old), &as_row(&content));
                entry.old_value(before).new_value(after)
            }
            None => entry.new_value(content.clone()),
        };
        let audit = self.audit.record(entry).await;

        info!("Saved landing page {}/{} by {}", locale, slug, principal.email);
        Ok(Audited { value: content, audit })
    }

    fn path(&self, locale: Locale, slug: &str) -> ServiceResult<PathBuf> {
        // The slug pattern has no '/' or '.', which keeps paths inside the root
        validation::slug("slug", slug)?;
        Ok(self.root.join(locale.as_str()).join(format!("{}.json", slug)))
    }
}

async fn write_atomic(path: &Path, content: &Value) -> ServiceResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| ServiceError::Internal(format!("{} has no parent directory", path.display())))?;
    tokio::fs::create_dir_all(dir).await?;

    let bytes = serde_json::to_vec_pretty(content)?;
    let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));
    if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
