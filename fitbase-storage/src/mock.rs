//! In-memory data service for tests and offline runs.

use crate::eval::{linked_ids, matches, sort_rows};
use crate::fold::aggregate;
use crate::service::DataService;
use ::async_trait::async_trait;
use chrono::{NaiveDate, SecondsFormat, Utc};
use fitbase_core::{
    ColumnKind, CompiledSchema, CompiledTable, FitResult, KindTag, Payload, QueryRequest,
    RecordId, Row, ServiceResponse, TransportError,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::trace;

/// Auto-date column refreshed on every update.
const UPDATED_AT: &str = "updatedAt";

#[derive(Debug, Default)]
struct MockState {
    tables: HashMap<String, BTreeMap<RecordId, Row>>,
    last_id: RecordId,
    requests: u64,
    fail_next: Option<TransportError>,
}

/// Evaluates requests against in-memory tables.
///
/// Clones share the same tables, so a test can keep a handle for inspection
/// while the facade owns another. Requests are re-validated against the
/// schema and refused with a 400 status, as the hosted service would.
#[derive(Debug, Clone)]
pub struct MockDataService {
    schema: Arc<CompiledSchema>,
    state: Arc<RwLock<MockState>>,
    today: Option<NaiveDate>,
}

impl MockDataService {
    pub fn new(schema: Arc<CompiledSchema>) -> Self {
        Self {
            schema,
            state: Arc::new(RwLock::new(MockState::default())),
            today: None,
        }
    }

    /// Pin the day relative date filters resolve against.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Make the next request fail with `error`.
    pub fn fail_next(&self, error: TransportError) {
        if let Ok(mut state) = self.state.write() {
            state.fail_next = Some(error);
        }
    }

    /// Number of requests received, including refused ones.
    pub fn request_count(&self) -> u64 {
        self.state.read().map(|s| s.requests).unwrap_or(0)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state
            .read()
            .map(|s| s.tables.get(table).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Snapshot of a table in id order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .read()
            .map(|s| {
                s.tables
                    .get(table)
                    .map(|rows| rows.values().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[async_trait]
impl DataService for MockDataService {
    async fn execute(&self, request: &QueryRequest) -> FitResult<ServiceResponse> {
        let mut state = self.state.write().map_err(|_| TransportError::Unreachable {
            reason: "mock state lock poisoned".to_string(),
        })?;
        state.requests += 1;
        trace!(table = %request.table, operation = %request.operation(), "Mock request");

        if let Some(error) = state.fail_next.take() {
            return Err(error.into());
        }

        request
            .validate(&self.schema)
            .map_err(|e| TransportError::Status {
                status: 400,
                message: e.to_string(),
            })?;
        let table = self
            .schema
            .queryable_table(&request.table)
            .map_err(|e| TransportError::Status {
                status: 400,
                message: e.to_string(),
            })?;

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let today = self.today();
        let MockState {
            tables, last_id, ..
        } = &mut *state;
        let stored = tables.entry(request.table.clone()).or_default();

        let matched: Vec<RecordId> = stored
            .iter()
            .filter(|(_, row)| {
                request.filters.iter().all(|clause| {
                    table
                        .column(&clause.column)
                        .is_some_and(|column| matches(row, clause, &column.kind, today))
                })
            })
            .map(|(id, _)| *id)
            .collect();

        let response = match &request.payload {
            Payload::Select { columns, limit } => {
                let mut rows: Vec<Row> = matched
                    .iter()
                    .filter_map(|id| stored.get(id).cloned())
                    .collect();
                sort_rows(&mut rows, &request.order_by);
                if let Some(limit) = limit {
                    rows.truncate(*limit);
                }
                if let Some(columns) = columns {
                    for row in &mut rows {
                        row.retain(|key, _| columns.contains(key));
                    }
                }
                ServiceResponse::Rows { rows }
            }
            Payload::Insert { rows } => {
                let mut created = Vec::with_capacity(rows.len());
                for input in rows {
                    let id = match input.get("id").and_then(Value::as_i64) {
                        Some(id) => id,
                        None => *last_id + 1,
                    };
                    *last_id = (*last_id).max(id);
                    let row = materialize(table, input, id, &now);
                    stored.insert(id, row.clone());
                    created.push(row);
                }
                ServiceResponse::Rows { rows: created }
            }
            Payload::Update { set } => {
                for id in &matched {
                    if let Some(row) = stored.get_mut(id) {
                        apply_update(table, row, set, &now);
                    }
                }
                ServiceResponse::Affected {
                    count: matched.len() as u64,
                }
            }
            Payload::Delete => {
                for id in &matched {
                    stored.remove(id);
                }
                ServiceResponse::Affected {
                    count: matched.len() as u64,
                }
            }
            Payload::Aggregate {
                column,
                aggregations,
            } => {
                let rows: Vec<Row> = matched
                    .iter()
                    .filter_map(|id| stored.get(id).cloned())
                    .collect();
                let kind = table
                    .column(column)
                    .map(|c| c.kind.clone())
                    .unwrap_or(ColumnKind::Text);
                ServiceResponse::Aggregates {
                    result: aggregate(&rows, column, &kind, aggregations),
                }
            }
        };
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Build the stored Raw row for an insert.
fn materialize(table: &CompiledTable, input: &Row, id: RecordId, now: &str) -> Row {
    let mut row = Row::new();
    for column in table.columns() {
        match column.kind {
            ColumnKind::AutoNumber => {
                row.insert(column.name.clone(), json!(id));
            }
            ColumnKind::AutoDate => {
                row.insert(column.name.clone(), json!(now));
            }
            _ => {
                if column.name == "id" {
                    row.insert(column.name.clone(), json!(id));
                    continue;
                }
                if let Some(value) = input.get(&column.name).filter(|v| !v.is_null()) {
                    row.insert(column.name.clone(), to_raw(&column.kind, value));
                }
            }
        }
    }
    row
}

/// Link and attachment ids become `{id}` record references.
fn to_raw(kind: &ColumnKind, value: &Value) -> Value {
    match (kind.tag(), value) {
        (KindTag::Link | KindTag::Attachment, Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| match item.as_i64() {
                    Some(id) => json!({ "id": id }),
                    None => item.clone(),
                })
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn apply_update(table: &CompiledTable, row: &mut Row, set: &Row, now: &str) {
    for (key, value) in set {
        let Some(column) = table.column(key) else {
            continue;
        };
        if value.is_null() {
            row.remove(key);
            continue;
        }
        let next = match (column.kind.tag(), value) {
            (KindTag::Link | KindTag::Attachment, Value::Object(delta)) => {
                apply_delta(row.get(key), delta)
            }
            _ => to_raw(&column.kind, value),
        };
        row.insert(key.clone(), next);
    }

    if table
        .column(UPDATED_AT)
        .is_some_and(|c| c.kind == ColumnKind::AutoDate)
    {
        row.insert(UPDATED_AT.to_string(), json!(now));
    }
}

/// Apply a `{newIds, deletedIds}` delta to a stored link cell.
fn apply_delta(current: Option<&Value>, delta: &Row) -> Value {
    let ids = |key: &str| -> Vec<i64> {
        delta
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default()
    };
    let deleted = ids("deletedIds");

    let mut items: Vec<Value> = current
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter(|item| {
            item.get("id")
                .and_then(Value::as_i64)
                .map_or(true, |id| !deleted.contains(&id))
        })
        .collect();

    let present = current.map(linked_ids).unwrap_or_default();
    for id in ids("newIds") {
        if !present.contains(&id) && !deleted.contains(&id) {
            items.push(json!({ "id": id }));
        }
    }
    Value::Array(items)
}
