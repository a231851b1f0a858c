use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{authorize, Access, Principal};
use crate::database::{decode, Fields, Query, RecordStore};
use crate::types::{Locale, Namespace};

use super::audit::{as_row, changed_keys, AuditAction, AuditLogger, Audited, NewAuditEntry};
use super::error::{ServiceError, ServiceResult};
use super::static_content::StaticContent;

pub const TRANSLATIONS_TABLE: &str = "ui_translations";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub locale: Locale,
    pub namespace: Namespace,
    pub content: Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedStatus {
    Seeded,
    Skipped,
}

#[derive(Debug, Default)]
pub struct SeedReport {
    pub seeded: usize,
    pub skipped: usize,
}

/// UI copy lookup: edited database rows first, shipped static files second.
#[derive(Clone)]
pub struct TranslationResolver {
    store: Arc<dyn RecordStore>,
    statics: StaticContent,
    audit: AuditLogger,
}

impl TranslationResolver {
    pub fn new(store: Arc<dyn RecordStore>, statics: StaticContent, audit: AuditLogger) -> Self {
        Self { store, statics, audit }
    }

    /// Database content verbatim, else the static file, else NotFound.
    ///
    /// A storage failure counts as "no row"; it is logged and the static
    /// baseline is served.
    pub async fn resolve_namespace(&self, locale: Locale, namespace: Namespace) -> ServiceResult<Value> {
        let query = Query::new()
            .eq("locale", locale.as_str())
            .eq("namespace", namespace.as_str());

        match self.store.select_one(TRANSLATIONS_TABLE, &query).await {
            Ok(Some(mut row)) => match row.remove("content") {
                Some(content) if !content.is_null() => {
                    debug!("Resolved {}/{} from database", locale, namespace);
                    return Ok(content);
                }
                _ => {}
            },
            Ok(None) => {}
            Err(e) => warn!("Translation lookup for {}/{} failed, using static content: {}", locale, namespace, e),
        }

        match self.statics.read(locale, namespace).await {
            Ok(content) => {
                debug!("Resolved {}/{} from static content", locale, namespace);
                Ok(content)
            }
            Err(e) => {
                debug!("No static content for {}/{}: {}", locale, namespace, e);
                Err(ServiceError::not_found(format!(
                    "No content for {}/{}",
                    locale, namespace
                )))
            }
        }
    }

    /// Every namespace for a locale, from one query plus per-namespace static
    /// fallback. Never fails on storage errors; a namespace absent from both
    /// sources is left out of the mapping.
    pub async fn resolve_all_namespaces(&self, locale: Locale) -> BTreeMap<Namespace, Value> {
        let query = Query::new()
            .eq("locale", locale.as_str())
            .is_in("namespace", Namespace::ALL.iter().map(|ns| ns.as_str()));

        let mut resolved = BTreeMap::new();
        match self.store.select(TRANSLATIONS_TABLE, &query).await {
            Ok(rows) => {
                for mut row in rows {
                    let namespace = row
                        .get("namespace")
                        .and_then(Value::as_str)
                        .and_then(|s| s.parse::<Namespace>().ok());
                    match (namespace, row.remove("content")) {
                        (Some(ns), Some(content)) if !content.is_null() => {
                            resolved.insert(ns, content);
                        }
                        _ => {}
                    }
                }
            }
            Err(e) => warn!("Translation lookup for {} failed, using static content: {}", locale, e),
        }

        for namespace in Namespace::ALL {
            if resolved.contains_key(&namespace) {
                continue;
            }
            match self.statics.read(locale, namespace).await {
                Ok(content) => {
                    resolved.insert(namespace, content);
                }
                Err(e) => warn!("Namespace {}/{} missing from every source: {}", locale, namespace, e),
            }
        }

        resolved
    }

    /// Replace the whole document for (locale, namespace). Any authenticated role.
    pub async fn save_namespace(
        &self,
        principal: Option<&Principal>,
        locale: Locale,
        namespace: Namespace,
        content: Value,
    ) -> ServiceResult<Audited<TranslationRecord>> {
        let principal = authorize(principal, Access::Authenticated)?;
        if content.is_null() {
            return Err(ServiceError::validation("content is required"));
        }

        let query = Query::new()
            .eq("locale", locale.as_str())
            .eq("namespace", namespace.as_str());
        let previous = self
            .store
            .select_one(TRANSLATIONS_TABLE, &query)
            .await?
            .and_then(|mut row| row.remove("content"));

        let row = self
            .store
            .upsert(
                TRANSLATIONS_TABLE,
                &["locale", "namespace"],
                Fields::new()
                    .set("id", Uuid::new_v4())
                    .set("locale", locale.as_str())
                    .set("namespace", namespace.as_str())
                    .set("content", content.clone())
                    .set("updated_at", Utc::now()),
            )
            .await?;
        let record: TranslationRecord = decode(row)?;

        let entry = NewAuditEntry::new(
            Some(principal),
            if previous.is_some() { AuditAction::Update } else { AuditAction::Create },
            TRANSLATIONS_TABLE,
        )
        .entity_id(format!("{}/{}", locale, namespace));
        let entry = match &previous {
            Some(old) => {
                let (before, after) = changed_keys(&as_row(old), &as_row(&content));
                entry.old_value(before).new_value(after)
            }
            None => entry.new_value(content),
        };
        let audit = self.audit.record(entry).await;

        info!("Saved translations {}/{} by {}", locale, namespace, principal.email);
        Ok(Audited { value: record, audit })
    }

    /// Upsert one static file into the database unless a row already exists.
    /// System action: no audit entry.
    pub async fn seed_namespace(&self, locale: Locale, namespace: Namespace, overwrite: bool) -> ServiceResult<SeedStatus> {
        let content = self
            .statics
            .read(locale, namespace)
            .await
            .map_err(|e| ServiceError::not_found(e.to_string()))?;

        if !overwrite {
            let query = Query::new()
                .eq("locale", locale.as_str())
                .eq("namespace", namespace.as_str());
            if self.store.count(TRANSLATIONS_TABLE, &query).await? > 0 {
                return Ok(SeedStatus::Skipped);
            }
        }

        self.store
            .upsert(
                TRANSLATIONS_TABLE,
                &["locale", "namespace"],
                Fields::new()
                    .set("id", Uuid::new_v4())
                    .set("locale", locale.as_str())
                    .set("namespace", namespace.as_str())
                    .set("content", content)
                    .set("updated_at", Utc::now()),
            )
            .await?;
        Ok(SeedStatus::Seeded)
    }

    /// Seed every (locale, namespace) that has a static file.
    pub async fn seed_all(&self, overwrite: bool) -> ServiceResult<SeedReport> {
        let mut report = SeedReport::default();
        for locale in Locale::ALL {
            for namespace in Namespace::ALL {
                match self.seed_namespace(locale, namespace, overwrite).await {
                    Ok(SeedStatus::Seeded) => report.seeded += 1,
                    Ok(SeedStatus::Skipped) => report.skipped += 1,
                    Err(ServiceError::NotFound(msg)) => {
                        warn!("Skipping {}/{}: {}", locale, namespace, msg);
                        report.skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::MemoryRecordStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Arc<MemoryRecordStore>, TranslationResolver) {
        let dir = tempfile::tempdir().unwrap();
        for locale in Locale::ALL {
            std::fs::create_dir_all(dir.path().join(locale.as_str())).unwrap();
            for namespace in Namespace::ALL {
                std::fs::write(
                    dir.path().join(locale.as_str()).join(format!("{}.json", namespace)),
                    json!({"source": "static", "ns": namespace.as_str()}).to_string(),
                )
                .unwrap();
            }
        }
        let store = Arc::new(MemoryRecordStore::new());
        let resolver = TranslationResolver::new(
            store.clone(),
            StaticContent::new(dir.path()),
            AuditLogger::new(store.clone()),
        );
        (dir, store, resolver)
    }

    fn editor() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Editor".into(),
            email: "editor@example.com".into(),
            role: Role::Editor,
        }
    }

    #[tokio::test]
    async fn every_pair_resolves_from_some_source() {
        let (_dir, _store, resolver) = fixture();
        for locale in Locale::ALL {
            for namespace in Namespace::ALL {
                let content = resolver.resolve_namespace(locale, namespace).await.unwrap();
                assert!(!content.is_null());
            }
        }
    }

    #[tokio::test]
    async fn database_row_wins_over_static_file() {
        let (_dir, _store, resolver) = fixture();
        let saved = json!({"source": "database"});
        let _ = resolver
            .save_namespace(Some(&editor()), Locale::Pt, Namespace::Home, saved.clone())
            .await
            .unwrap();

        assert_eq!(resolver.resolve_namespace(Locale::Pt, Namespace::Home).await.unwrap(), saved);
        assert_eq!(
            resolver.resolve_namespace(Locale::En, Namespace::Home).await.unwrap()["source"],
            "static"
        );
    }

    #[tokio::test]
    async fn missing_everywhere_is_not_found() {
        let (dir, _store, resolver) = fixture();
        std::fs::remove_file(dir.path().join("es/faq.json")).unwrap();
        assert!(matches!(
            resolver.resolve_namespace(Locale::Es, Namespace::Faq).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn all_namespaces_survive_store_outage() {
        let (_dir, store, resolver) = fixture();
        store.set_unavailable(true);

        let all = resolver.resolve_all_namespaces(Locale::Es).await;
        assert_eq!(all.len(), Namespace::ALL.len());
        assert!(all.values().all(|v| v["source"] == "static"));
    }

    #[tokio::test]
    async fn all_namespaces_mix_sources_per_namespace() {
        let (_dir, _store, resolver) = fixture();
        let _ = resolver
            .save_namespace(Some(&editor()), Locale::En, Namespace::Faq, json!({"source": "database"}))
            .await
            .unwrap();

        let all = resolver.resolve_all_namespaces(Locale::En).await;
        assert_eq!(all[&Namespace::Faq]["source"], "database");
        assert_eq!(all[&Namespace::Home]["source"], "static");
    }

    #[tokio::test]
    async fn save_twice_keeps_one_row() {
        let (_dir, store, resolver) = fixture();
        let content = json!({"hero": {"title": "X"}});
        for _ in 0..2 {
            let _ = resolver
                .save_namespace(Some(&editor()), Locale::Pt, Namespace::Home, content.clone())
                .await
                .unwrap();
        }
        let rows = store.rows(TRANSLATIONS_TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["content"], content);
    }

    #[tokio::test]
    async fn save_requires_session_and_content() {
        let (_dir, store, resolver) = fixture();
        assert!(matches!(
            resolver.save_namespace(None, Locale::Pt, Namespace::Home, json!({})).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            resolver
                .save_namespace(Some(&editor()), Locale::Pt, Namespace::Home, Value::Null)
                .await,
            Err(ServiceError::Validation(_))
        ));
        assert!(store.rows(TRANSLATIONS_TABLE).is_empty());
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let (_dir, store, resolver) = fixture();
        let first = resolver.seed_all(false).await.unwrap();
        assert_eq!(first.seeded, 24);
        let second = resolver.seed_all(false).await.unwrap();
        assert_eq!(second.seeded, 0);
        assert_eq!(second.skipped, 24);
        assert_eq!(store.rows(TRANSLATIONS_TABLE).len(), 24);
    }
}
