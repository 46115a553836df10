//! Data-source boundary feeding the contract registry.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use agent_primitives::{ContractRecord, ContractStatus, fields};
use async_trait::async_trait;
use serde_json::Value;

use crate::registry::{RegistryError, RegistryResult};

/// Server-side filter passed with every page query.
///
/// Sources may ignore it; the registry re-applies every constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContractFilter {
    /// Only return records in this status.
    pub status: Option<ContractStatus>,
    /// Maximum number of records per page.
    pub page_size: Option<usize>,
}

impl ContractFilter {
    /// Filter matching active records.
    #[must_use]
    pub const fn active() -> Self {
        Self {
            status: Some(ContractStatus::Active),
            page_size: None,
        }
    }

    /// Sets the page size hint.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    fn matches(&self, record: &ContractRecord) -> bool {
        match self.status {
            None => true,
            Some(status) => record
                .get(fields::STATUS)
                .and_then(Value::as_str)
                .is_none_or(|raw| raw == status.as_str()),
        }
    }
}

/// One page of raw records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    /// Records on this page.
    pub records: Vec<ContractRecord>,
    /// Cursor of the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Paginated source of raw contract records.
#[async_trait]
pub trait ContractSource: Send + Sync {
    /// Returns the page starting at `cursor` (`None` for the first page).
    async fn query(&self, filter: &ContractFilter, cursor: Option<&str>) -> RegistryResult<RecordPage>;
}

const DEFAULT_PAGE_SIZE: usize = 100;

fn parse_offset(raw: &str) -> RegistryResult<usize> {
    raw.parse::<usize>()
        .map_err(|_| RegistryError::malformed_page(format!("unknown cursor `{raw}`")))
}

/// Returns the matching records of the page at `offset` and the offset of the
/// next page, if any.
fn page_at(
    records: &[ContractRecord],
    filter: &ContractFilter,
    offset: usize,
) -> RegistryResult<(Vec<ContractRecord>, Option<usize>)> {
    let page_size = filter.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let end = offset.saturating_add(page_size).min(records.len());

    let page = records
        .get(offset..end)
        .ok_or_else(|| RegistryError::malformed_page(format!("cursor {offset} is past the end")))?;
    let matching = page.iter().filter(|r| filter.matches(r)).cloned().collect();
    Ok((matching, (end < records.len()).then_some(end)))
}

fn paginate(records: &[ContractRecord], filter: &ContractFilter, cursor: Option<&str>) -> RegistryResult<RecordPage> {
    let offset = cursor.map_or(Ok(0), parse_offset)?;
    let (records, next) = page_at(records, filter, offset)?;
    Ok(RecordPage {
        records,
        next_cursor: next.map(|end| end.to_string()),
    })
}

/// Source backed by records held in memory.
///
/// Cursors are record offsets.
#[derive(Debug, Default)]
pub struct InMemorySource {
    records: Mutex<Vec<ContractRecord>>,
    fail_next: AtomicUsize,
}

impl InMemorySource {
    /// Creates a source over `records`.
    #[must_use]
    pub fn new(records: Vec<ContractRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            fail_next: AtomicUsize::new(0),
        }
    }

    /// Replaces the held records.
    pub fn replace(&self, records: Vec<ContractRecord>) {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records;
    }

    /// Makes the next `count` queries fail as unavailable.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContractSource for InMemorySource {
    async fn query(&self, filter: &ContractFilter, cursor: Option<&str>) -> RegistryResult<RecordPage> {
        let should_fail = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(RegistryError::unavailable("in-memory source marked unavailable"));
        }
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        paginate(&records, filter, cursor)
    }
}

/// Source backed by a JSON file of records.
///
/// The file is read once per fetch, on the first-page query; later pages are
/// served from that read, so a file rewritten mid-fetch never mixes versions.
/// Cursors are `<read>:<offset>`, and a cursor from an older read is rejected.
///
/// The file holds either an array of records or an object with a `records`
/// array.
#[derive(Debug)]
pub struct JsonFileSource {
    path: PathBuf,
    reads: AtomicU64,
    current: Mutex<Option<FileRead>>,
}

#[derive(Debug)]
struct FileRead {
    read: u64,
    records: Arc<Vec<ContractRecord>>,
}

impl JsonFileSource {
    /// Creates a source for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reads: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn load(&self) -> RegistryResult<Vec<ContractRecord>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            RegistryError::unavailable(format!("failed to read {}: {err}", self.path.display()))
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|err| {
            RegistryError::malformed_page(format!("{} is not valid JSON: {err}", self.path.display()))
        })?;
        records_from_value(value)
    }

    async fn read_fresh(&self) -> RegistryResult<(u64, Arc<Vec<ContractRecord>>)> {
        let records = Arc::new(self.load().await?);
        let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(FileRead {
            read,
            records: Arc::clone(&records),
        });
        Ok((read, records))
    }

    fn held(&self, read: u64) -> RegistryResult<Arc<Vec<ContractRecord>>> {
        match &*self.current.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(current) if current.read == read => Ok(Arc::clone(&current.records)),
            _ => Err(RegistryError::malformed_page(format!(
                "cursor refers to a superseded read of {}",
                self.path.display()
            ))),
        }
    }
}

/// Extracts records from an array, a `{"records": [...]}` object, or a single
/// record object.
///
/// # Errors
///
/// Returns [`RegistryError::MalformedPage`] when an entry is not an object.
pub fn records_from_value(value: Value) -> RegistryResult<Vec<ContractRecord>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("records") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(RegistryError::malformed_page("`records` must be an array")),
            None => vec![Value::Object(map)],
        },
        _ => return Err(RegistryError::malformed_page("expected an array of records")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            ContractRecord::from_value(item)
                .ok_or_else(|| RegistryError::malformed_page(format!("record {index} is not an object")))
        })
        .collect()
}

#[async_trait]
impl ContractSource for JsonFileSource {
    async fn query(&self, filter: &ContractFilter, cursor: Option<&str>) -> RegistryResult<RecordPage> {
        let (read, records, offset) = match cursor {
            None => {
                let (read, records) = self.read_fresh().await?;
                (read, records, 0)
            }
            Some(raw) => {
                let (read, offset) = raw
                    .split_once(':')
                    .and_then(|(read, offset)| Some((read.parse::<u64>().ok()?, offset)))
                    .ok_or_else(|| RegistryError::malformed_page(format!("unknown cursor `{raw}`")))?;
                (read, self.held(read)?, parse_offset(offset)?)
            }
        };

        let (records, next) = page_at(&records, filter, offset)?;
        Ok(RecordPage {
            records,
            next_cursor: next.map(|end| format!("{read}:{end}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, status: &str) -> ContractRecord {
        ContractRecord::new().with(fields::AGENT_ID, id).with(fields::STATUS, status)
    }

    #[tokio::test]
    async fn pages_with_offset_cursor() {
        let source = InMemorySource::new(vec![
            record("a", "Active"),
            record("b", "Inactive"),
            record("c", "Active"),
        ]);
        let filter = ContractFilter::active().with_page_size(2);

        let first = source.query(&filter, None).await.unwrap();
        assert_eq!(first.records.len(), 1);
        assert_eq!(first.next_cursor.as_deref(), Some("2"));

        let second = source.query(&filter, Some("2")).await.unwrap();
        assert_eq!(second.records[0].agent_id(), Some("c"));
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn bad_cursor_is_malformed() {
        let source = InMemorySource::new(vec![record("a", "Active")]);
        let err = source.query(&ContractFilter::default(), Some("zzz")).await.unwrap_err();
        assert!(matches!(err, RegistryError::MalformedPage { .. }));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let source = InMemorySource::new(vec![record("a", "Active")]);
        source.fail_next(1);
        assert!(source.query(&ContractFilter::default(), None).await.is_err());
        assert!(source.query(&ContractFilter::default(), None).await.is_ok());
    }

    #[tokio::test]
    async fn json_file_source_reads_records() {
        let path = std::env::temp_dir().join(format!("contracts-{}.json", uuid_like()));
        tokio::fs::write(&path, json!({"records": [{"AgentID": "x", "Status": "Active"}]}).to_string())
            .await
            .unwrap();

        let page = JsonFileSource::new(&path).query(&ContractFilter::default(), None).await.unwrap();
        assert_eq!(page.records[0].agent_id(), Some("x"));
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn json_file_pages_come_from_one_read() {
        let path = std::env::temp_dir().join(format!("contracts-{}.json", uuid_like()));
        let write = |ids: &[&str]| {
            let records: Vec<Value> = ids.iter().map(|id| json!({"AgentID": id, "Status": "Active"})).collect();
            Value::Array(records).to_string()
        };
        tokio::fs::write(&path, write(&["a", "b"])).await.unwrap();

        let source = JsonFileSource::new(&path);
        let filter = ContractFilter::active().with_page_size(1);
        let first = source.query(&filter, None).await.unwrap();
        assert_eq!(first.records[0].agent_id(), Some("a"));
        let cursor = first.next_cursor.unwrap();

        tokio::fs::write(&path, write(&["x", "y", "z"])).await.unwrap();
        let second = source.query(&filter, Some(cursor.as_str())).await.unwrap();
        assert_eq!(second.records[0].agent_id(), Some("b"));
        assert!(second.next_cursor.is_none());

        let fresh = source.query(&filter, None).await.unwrap();
        assert_eq!(fresh.records[0].agent_id(), Some("x"));
        let err = source.query(&filter, Some(cursor.as_str())).await.unwrap_err();
        assert!(matches!(err, RegistryError::MalformedPage { .. }));

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let err = JsonFileSource::new("/nonexistent/contracts.json")
            .query(&ContractFilter::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::SourceUnavailable { .. }));
    }

    #[test]
    fn non_object_entries_are_rejected() {
        assert!(records_from_value(json!([1, 2])).is_err());
        assert_eq!(records_from_value(json!({"AgentID": "solo"})).unwrap().len(), 1);
    }

    fn uuid_like() -> String {
        agent_primitives::TraceId::random().to_string()
    }
}
