//! Registry of eligible contracts, published as atomic snapshots.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, PoisonError, RwLock};

use agent_primitives::{AgentContract, ContractId, ContractRecord, ContractStatus, fields};
use agent_validator::ContractValidator;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::source::{ContractFilter, ContractSource};

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by a registry fetch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The source could not be reached.
    #[error("contract source unavailable: {reason}")]
    SourceUnavailable {
        /// Context reported by the source.
        reason: String,
    },
    /// The source returned a page that could not be interpreted.
    #[error("contract source returned a malformed page: {reason}")]
    MalformedPage {
        /// What was wrong with the page.
        reason: String,
    },
}

impl RegistryError {
    /// Convenience constructor for unreachable sources.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for malformed pages.
    #[must_use]
    pub fn malformed_page(reason: impl Into<String>) -> Self {
        Self::MalformedPage {
            reason: reason.into(),
        }
    }
}

/// One complete fetch result.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    contracts: Vec<Arc<AgentContract>>,
    index: HashMap<ContractId, usize>,
    skipped: usize,
    fetched_at: Option<DateTime<Utc>>,
}

impl RegistrySnapshot {
    fn empty() -> Self {
        Self {
            contracts: Vec::new(),
            index: HashMap::new(),
            skipped: 0,
            fetched_at: None,
        }
    }

    fn new(contracts: Vec<Arc<AgentContract>>, skipped: usize) -> Self {
        let index = contracts
            .iter()
            .enumerate()
            .map(|(position, contract)| (contract.id().clone(), position))
            .collect();
        Self {
            contracts,
            index,
            skipped,
            fetched_at: Some(Utc::now()),
        }
    }

    /// Returns the eligible contracts in source order.
    #[must_use]
    pub fn contracts(&self) -> &[Arc<AgentContract>] {
        &self.contracts
    }

    /// Looks a contract up by id.
    #[must_use]
    pub fn get(&self, id: &ContractId) -> Option<&Arc<AgentContract>> {
        self.index.get(id).map(|&position| &self.contracts[position])
    }

    /// Returns the number of eligible contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns `true` when the snapshot holds no contracts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Returns the number of records that failed validation.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Returns when the snapshot was fetched; `None` before the first fetch.
    #[must_use]
    pub const fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}

/// Owns the authoritative id → contract mapping.
pub struct ContractRegistry {
    source: Arc<dyn ContractSource>,
    validator: ContractValidator,
    page_size: NonZeroUsize,
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl fmt::Debug for ContractRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractRegistry")
            .field("page_size", &self.page_size)
            .field("contracts", &self.snapshot().len())
            .finish_non_exhaustive()
    }
}

impl ContractRegistry {
    /// Creates a registry over `source` with an empty snapshot.
    #[must_use]
    pub fn new(source: Arc<dyn ContractSource>, validator: ContractValidator, page_size: NonZeroUsize) -> Self {
        Self {
            source,
            validator,
            page_size,
            snapshot: RwLock::new(Arc::new(RegistrySnapshot::empty())),
        }
    }

    /// Fetches every page, validates the records, and publishes the active set.
    ///
    /// Records failing validation are skipped with a warning. The snapshot is
    /// replaced only once all pages were read; on failure the previous one
    /// stays authoritative.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when any page cannot be fetched or decoded.
    pub async fn fetch_eligible_contracts(&self) -> RegistryResult<Vec<Arc<AgentContract>>> {
        let records = self.fetch_all().await?;
        let total = records.len();
        // Duplicate detection only sees records that may still be active.
        let records: Vec<ContractRecord> = records.into_iter().filter(may_be_active).collect();

        let outcome = self.validator.validate_batch(records);
        for failure in &outcome.failed {
            let errors: Vec<String> = failure.error.errors().iter().map(ToString::to_string).collect();
            warn!(id = ?failure.item.agent_id(), ?errors, "skipping invalid contract record");
        }

        let skipped = outcome.failed.len();
        let contracts: Vec<Arc<AgentContract>> = outcome
            .succeeded
            .into_iter()
            .filter(|contract| contract.status() == ContractStatus::Active)
            .map(Arc::new)
            .collect();

        let next = Arc::new(RegistrySnapshot::new(contracts.clone(), skipped));
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = next;

        info!(records = total, eligible = contracts.len(), skipped, "contract snapshot published");
        Ok(contracts)
    }

    async fn fetch_all(&self) -> RegistryResult<Vec<ContractRecord>> {
        let filter = ContractFilter::active().with_page_size(self.page_size.get());
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let page = self.source.query(&filter, cursor.as_deref()).await.inspect_err(|err| {
                warn!(error = %err, "contract fetch failed; keeping previous snapshot");
            })?;
            debug!(records = page.records.len(), cursor = ?cursor, "fetched contract page");
            records.extend(page.records);

            match page.next_cursor {
                None => return Ok(records),
                Some(next) if !seen.insert(next.clone()) => {
                    return Err(RegistryError::malformed_page(format!("cursor `{next}` repeated")));
                }
                Some(next) => cursor = Some(next),
            }
        }
    }

    /// Returns the currently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Looks a contract up in the current snapshot.
    #[must_use]
    pub fn get(&self, id: &ContractId) -> Option<Arc<AgentContract>> {
        self.snapshot().get(id).cloned()
    }
}

/// Keeps records whose status is active, missing, or unreadable; the latter two
/// are left for the validator to report.
fn may_be_active(record: &ContractRecord) -> bool {
    match record.get(fields::STATUS).and_then(Value::as_str).map(str::parse::<ContractStatus>) {
        Some(Ok(status)) => status == ContractStatus::Active,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{InMemorySource, RecordPage};
    use agent_primitives::{AgentRole, ContractDraft, InvocationSchema};
    use async_trait::async_trait;
    use serde_json::json;

    fn record(id: &str, name: &str, status: &str) -> ContractRecord {
        ContractRecord::from_value(json!({
            "AgentID": id,
            "Name": name,
            "Role": "Worker",
            "Category": "Ops",
            "AutonomyLevel": "Level 1",
            "ExecutionPattern": "Parallel",
            "MCPEnabled": "__YES__",
            "ToolSchema": "{\"input\":{\"job\":{\"type\":\"string\"}},\"output\":{\"format\":\"json\"}}",
            "QualityScore": 0.7,
            "Status": status,
            "Architectures": "MCP-Swarm"
        }))
        .unwrap()
    }

    fn registry(source: Arc<InMemorySource>, page_size: usize) -> ContractRegistry {
        ContractRegistry::new(source, ContractValidator::default(), NonZeroUsize::new(page_size).unwrap())
    }

    #[tokio::test]
    async fn returns_only_active_contracts() {
        let source = Arc::new(InMemorySource::new(vec![
            record("a-1", "Alpha", "Active"),
            record("a-2", "Beta", "Inactive"),
        ]));
        let registry = registry(source, 10);

        let contracts = registry.fetch_eligible_contracts().await.unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].id().as_str(), "a-1");
        assert!(registry.get(&ContractId::new("a-2").unwrap()).is_none());
    }

    #[tokio::test]
    async fn consumes_every_page_and_skips_invalid_records() {
        let mut broken = record("a-3", "Gamma", "Active");
        broken.remove(fields::NAME);
        let source = Arc::new(InMemorySource::new(vec![
            record("a-1", "Alpha", "Active"),
            record("a-2", "Beta", "Active"),
            broken,
            record("a-4", "Delta", "Active"),
        ]));
        let registry = registry(source, 1);

        let contracts = registry.fetch_eligible_contracts().await.unwrap();
        let ids: Vec<_> = contracts.iter().map(|c| c.id().as_str()).collect();
        assert_eq!(ids, vec!["a-1", "a-2", "a-4"]);
        assert_eq!(registry.snapshot().skipped(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_snapshot() {
        let source = Arc::new(InMemorySource::new(vec![record("a-1", "Alpha", "Active")]));
        let registry = registry(Arc::clone(&source), 10);
        registry.fetch_eligible_contracts().await.unwrap();

        source.replace(vec![record("b-1", "Other", "Active")]);
        source.fail_next(1);
        let err = registry.fetch_eligible_contracts().await.unwrap_err();
        assert!(matches!(err, RegistryError::SourceUnavailable { .. }));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get(&ContractId::new("a-1").unwrap()).is_some());
    }

    /// Returns every record on one page, ignoring the filter.
    struct UnfilteredSource(Vec<ContractRecord>);

    #[async_trait]
    impl ContractSource for UnfilteredSource {
        async fn query(&self, _filter: &ContractFilter, _cursor: Option<&str>) -> RegistryResult<RecordPage> {
            Ok(RecordPage {
                records: self.0.clone(),
                next_cursor: None,
            })
        }
    }

    #[tokio::test]
    async fn inactive_duplicate_does_not_displace_active_record() {
        let registry = ContractRegistry::new(
            Arc::new(UnfilteredSource(vec![
                record("a-1", "Alpha Retired", "Inactive"),
                record("a-1", "Alpha", "Active"),
            ])),
            ContractValidator::default(),
            NonZeroUsize::new(10).unwrap(),
        );

        let contracts = registry.fetch_eligible_contracts().await.unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].name(), "Alpha");
        assert_eq!(registry.snapshot().skipped(), 0);
    }

    struct LoopingSource;

    #[async_trait]
    impl ContractSource for LoopingSource {
        async fn query(&self, _filter: &ContractFilter, _cursor: Option<&str>) -> RegistryResult<RecordPage> {
            Ok(RecordPage {
                records: Vec::new(),
                next_cursor: Some("again".into()),
            })
        }
    }

    #[tokio::test]
    async fn repeated_cursor_is_malformed() {
        let registry = ContractRegistry::new(
            Arc::new(LoopingSource),
            ContractValidator::default(),
            NonZeroUsize::new(5).unwrap(),
        );
        let err = registry.fetch_eligible_contracts().await.unwrap_err();
        assert!(matches!(err, RegistryError::MalformedPage { .. }));
        assert!(registry.snapshot().fetched_at().is_none());
    }

    #[tokio::test]
    async fn wire_round_trip_through_the_registry_mapper() {
        let contract = AgentContract::builder(ContractId::new("rt-1").unwrap(), "Round Trip", AgentRole::Monitor)
            .category("QA")
            .capability_enabled(true)
            .invocation_schema(InvocationSchema::parse(
                r#"{"input":{"x":{"type":"number"}},"output":{"format":"json"}}"#,
            ))
            .quality_score(0.5)
            .model_identifier("gemini-1.5-flash")
            .architecture("MCP-Swarm")
            .build()
            .unwrap();

        let source = Arc::new(InMemorySource::new(vec![contract.to_record()]));
        let fetched = registry(source, 10).fetch_eligible_contracts().await.unwrap();
        assert_eq!(*fetched[0], contract);

        let (draft, violations) = ContractDraft::from_record(&contract.to_record());
        assert!(violations.is_empty());
        assert_eq!(draft.into_contract().unwrap(), contract);
    }
}
