use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use gridform_spec::FieldMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::SyncError;

/// Address of one table inside the external record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub store_id: String,
    pub table_id: String,
}

impl TableRef {
    pub fn new(store_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            table_id: table_id.into(),
        }
    }
}

/// Record-level changes reported for one table in one payload. Field-level
/// deltas are keyed by external field id upstream and are deliberately not
/// carried here; a changed record id is a freshness signal only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChanges {
    #[serde(default)]
    pub changed_record_ids: Vec<String>,
    #[serde(default)]
    pub destroyed_record_ids: Vec<String>,
}

/// One change-feed payload: per-table record changes, in delivery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePayload {
    #[serde(default)]
    pub changed_tables: BTreeMap<String, TableChanges>,
}

impl ChangePayload {
    /// Changes affecting the given table, if any.
    pub fn table(&self, table_id: &str) -> Option<&TableChanges> {
        self.changed_tables.get(table_id)
    }
}

/// One page of the cursor-paginated change feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub payloads: Vec<ChangePayload>,
    pub cursor: Option<String>,
    pub might_have_more: bool,
}

/// Client boundary to the external record store.
///
/// Delivery is at-least-once and payloads may repeat across fetches after a
/// crash; callers must apply them idempotently.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Creates one record and returns its external id.
    async fn create_record(&self, table: &TableRef, fields: &FieldMap)
    -> Result<String, SyncError>;

    /// Fetches the next page of change payloads for a subscription,
    /// starting from `cursor` (None on first poll).
    async fn fetch_change_batch(
        &self,
        store_id: &str,
        subscription_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChangeBatch, SyncError>;
}

/// Supplies a valid access credential for the record store. Token refresh
/// is the auth collaborator's job; this core only asks for the current one.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, SyncError>;
}

/// Fixed token, for tests and personal-access-token deployments.
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, SyncError> {
        Ok(self.0.clone())
    }
}

/// HTTP implementation of [`RecordStore`] against an Airtable-style API.
pub struct HttpRecordStore {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl HttpRecordStore {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn create_record(
        &self,
        table: &TableRef,
        fields: &FieldMap,
    ) -> Result<String, SyncError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/{}/{}", self.base_url, table.store_id, table.table_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "fields": fields }))
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        record_id_from(&body)
            .ok_or_else(|| SyncError::Malformed("create response carried no record id".into()))
    }

    async fn fetch_change_batch(
        &self,
        store_id: &str,
        subscription_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChangeBatch, SyncError> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/bases/{}/webhooks/{}/payloads",
            self.base_url, store_id, subscription_id
        );
        let mut request = self.http.get(&url).bearer_auth(token);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let wire: BatchWire = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(wire.into())
    }
}

fn record_id_from(body: &Value) -> Option<String> {
    // Single-record creates respond with { id, ... }; batch-shaped APIs
    // respond with { records: [ { id, ... } ] }.
    body.get("id")
        .and_then(Value::as_str)
        .or_else(|| {
            body.get("records")
                .and_then(Value::as_array)
                .and_then(|records| records.first())
                .and_then(|record| record.get("id"))
                .and_then(Value::as_str)
        })
        .map(String::from)
}

/// Wire shape of the payloads endpoint.
#[derive(Debug, Deserialize)]
struct BatchWire {
    #[serde(default)]
    payloads: Vec<PayloadWire>,
    cursor: Option<Value>,
    #[serde(default, rename = "mightHaveMore")]
    might_have_more: bool,
}

#[derive(Debug, Deserialize)]
struct PayloadWire {
    #[serde(default, rename = "changedTablesById")]
    changed_tables_by_id: BTreeMap<String, TableWire>,
}

#[derive(Debug, Deserialize)]
struct TableWire {
    #[serde(default, rename = "changedRecordsById")]
    changed_records_by_id: BTreeMap<String, Value>,
    #[serde(default, rename = "destroyedRecordIds")]
    destroyed_record_ids: Vec<String>,
}

impl From<BatchWire> for ChangeBatch {
    fn from(wire: BatchWire) -> Self {
        let payloads = wire
            .payloads
            .into_iter()
            .map(|payload| ChangePayload {
                changed_tables: payload
                    .changed_tables_by_id
                    .into_iter()
                    .map(|(table_id, table)| {
                        (
                            table_id,
                            TableChanges {
                                changed_record_ids: table
                                    .changed_records_by_id
                                    .into_keys()
                                    .collect(),
                                destroyed_record_ids: table.destroyed_record_ids,
                            },
                        )
                    })
                    .collect(),
            })
            .collect();

        let cursor = wire.cursor.map(|value| match value {
            Value::String(token) => token,
            other => other.to_string(),
        });

        ChangeBatch {
            payloads,
            cursor,
            might_have_more: wire.might_have_more,
        }
    }
}
