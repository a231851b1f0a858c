use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::{Fields, Query, RecordStore, Row};
use crate::types::Locale;

use super::error::ServiceResult;

pub type TranslationRows = BTreeMap<Locale, Row>;

/// A child table holding one row per (parent, locale).
#[derive(Debug, Clone, Copy)]
pub struct TranslationTable {
    pub table: &'static str,
    pub parent_column: &'static str,
    /// Translated columns, in snapshot order
    pub columns: &'static [&'static str],
}

impl TranslationTable {
    /// Translation rows for the given parents, grouped by parent id.
    pub async fn load(
        &self,
        store: &dyn RecordStore,
        parent_ids: &[Uuid],
    ) -> ServiceResult<HashMap<Uuid, TranslationRows>> {
        let mut grouped: HashMap<Uuid, TranslationRows> = HashMap::new();
        if parent_ids.is_empty() {
            return Ok(grouped);
        }

        let rows = store
            .select(self.table, &Query::new().is_in(self.parent_column, parent_ids.iter().copied()))
            .await?;
        for row in rows {
            let parent = row
                .get(self.parent_column)
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<Uuid>().ok());
            let locale = row
                .get("locale")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<Locale>().ok());
            if let (Some(parent), Some(locale)) = (parent, locale) {
                grouped.entry(parent).or_default().insert(locale, row);
            }
        }
        Ok(grouped)
    }

    pub async fn load_one(&self, store: &dyn RecordStore, parent_id: Uuid) -> ServiceResult<TranslationRows> {
        Ok(self.load(store, &[parent_id]).await?.remove(&parent_id).unwrap_or_default())
    }

    /// Insert or overwrite the row for (parent, locale).
    pub async fn upsert(
        &self,
        store: &dyn RecordStore,
        parent_id: Uuid,
        locale: Locale,
        fields: Fields,
    ) -> ServiceResult<Row> {
        let fields = fields
            .set("id", Uuid::new_v4())
            .set(self.parent_column, parent_id)
            .set("locale", locale.as_str());
        Ok(store.upsert(self.table, &[self.parent_column, "locale"], fields).await?)
    }

    pub async fn remove_all(&self, store: &dyn RecordStore, parent_id: Uuid) -> ServiceResult<u64> {
        Ok(store
            .remove(self.table, &Query::new().eq(self.parent_column, parent_id))
            .await?)
    }

    /// Audit view of the translations: the fallback locale's columns at the
    /// top level, other locales nested under `translations`.
    pub fn snapshot_into(&self, target: &mut Row, translations: &TranslationRows) {
        let mut others = Map::new();
        for (locale, row) in translations {
            let columns: Map<String, Value> = self
                .columns
                .iter()
                .map(|c| (c.to_string(), row.get(*c).cloned().unwrap_or(Value::Null)))
                .collect();
            if *locale == Locale::FALLBACK {
                target.extend(columns);
            } else {
                others.insert(locale.as_str().to_string(), Value::Object(columns));
            }
        }
        target.insert("translations".to_string(), Value::Object(others));
    }
}

/// The translation for `locale`, or the fallback locale's when it has none.
pub fn pick(translations: &TranslationRows, locale: Locale) -> Option<(Locale, &Row)> {
    translations
        .get(&locale)
        .map(|row| (locale, row))
        .or_else(|| translations.get(&Locale::FALLBACK).map(|row| (Locale::FALLBACK, row)))
}

/// The id column of a stored row.
pub fn parse_id(row: &Row) -> Option<Uuid> {
    row.get("id").and_then(Value::as_str).and_then(|s| s.parse().ok())
}
