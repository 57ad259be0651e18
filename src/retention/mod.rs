//! Bounded history retention.
//!
//! A pruning pass finds every group through the owning store, then for each
//! group keeps the newest `keep` records older than a cutoff and deletes the
//! rest. Passes are best effort: nothing is locked, so a record written while
//! a group is being pruned is simply left for the next pass.

use crate::config::RetentionConfig;
use crate::core::{FieldType, Record, Result, StoreError, format_date, parse_date};
use crate::storage::{Filter, VersionedRecordStore};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{Instrument, Level, debug_span, event, info_span};

/// Which fields group records and which field orders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionTarget {
    /// Fields that identify a group. Owner and history records must both carry them.
    pub group_fields: Vec<String>,
    /// Ordering field; larger values are newer. It must be declared as
    /// `Date`, `Integer` or `String` in the latest version of the record kind.
    pub timestamp_field: String,
}

impl RetentionTarget {
    pub fn new<I, S>(group_fields: I, timestamp_field: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_fields: group_fields.into_iter().map(Into::into).collect(),
            timestamp_field: timestamp_field.into(),
        }
    }
}

/// Values of the group fields for one group, in `group_fields` order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupKey {
    pub values: Vec<Value>,
}

impl GroupKey {
    fn filter(&self, target: &RetentionTarget) -> Filter {
        target
            .group_fields
            .iter()
            .zip(&self.values)
            .fold(Filter::new(), |filter, (field, value)| {
                filter.eq(field.clone(), value.clone())
            })
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        write!(f, "{}", parts.join("/"))
    }
}

/// A group whose pass stopped early.
#[derive(Debug, Clone)]
pub struct GroupFailure {
    pub group: GroupKey,
    pub error: String,
}

/// Outcome of a pruning pass.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    /// Records deleted across all groups, including partial progress of failed groups.
    pub deleted: usize,
    /// Groups discovered in the owning store.
    pub groups: usize,
    pub failed_groups: Vec<GroupFailure>,
}

impl PruneReport {
    pub fn is_complete(&self) -> bool {
        self.failed_groups.is_empty()
    }
}

/// Total order over timestamp values.
///
/// Values that cannot be ordered rank oldest, then plain text, numbers and
/// dates, so mixed or malformed data sorts consistently instead of by pairwise
/// comparison.
#[derive(Debug, Clone)]
enum Recency {
    Unordered,
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
}

impl Recency {
    fn of(value: &Value) -> Self {
        match value {
            Value::String(s) => match parse_date(s) {
                Some(date) => Self::Date(date),
                None => Self::Text(s.clone()),
            },
            Value::Number(n) => n.as_f64().map_or(Self::Unordered, Self::Number),
            _ => Self::Unordered,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Unordered => 0,
            Self::Text(_) => 1,
            Self::Number(_) => 2,
            Self::Date(_) => 3,
        }
    }
}

impl Ord for Recency {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Recency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Recency {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Recency {}

/// Identity and ordering value of a deletion candidate.
#[derive(Debug, Clone)]
struct Candidate {
    partition_key: String,
    row_key: String,
    recency: Recency,
}

struct GroupOutcome {
    deleted: usize,
    error: Option<StoreError>,
}

#[derive(Debug, Clone, Default)]
pub struct RetentionPruner {
    config: RetentionConfig,
}

impl RetentionPruner {
    pub fn new(config: RetentionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Runs one pass over a `Date` timestamp field; see [`prune_below`](Self::prune_below).
    pub async fn prune(
        &self,
        owners: &VersionedRecordStore,
        records: &VersionedRecordStore,
        target: &RetentionTarget,
        cutoff: DateTime<Utc>,
    ) -> Result<PruneReport> {
        self.prune_below(owners, records, target, format_date(&cutoff))
            .await
    }

    /// Runs one pass: keep the newest `keep` records per group among those
    /// with `timestamp_field < cutoff`, delete the others.
    ///
    /// The cutoff must fit the declared type of `timestamp_field`, otherwise
    /// the pass fails with `Config` before anything is scanned. Failing to
    /// enumerate groups fails the pass. A failure inside a group stops that
    /// group only; deletes it already issued stay in effect and are counted,
    /// and the group is listed in `failed_groups`.
    pub async fn prune_below(
        &self,
        owners: &VersionedRecordStore,
        records: &VersionedRecordStore,
        target: &RetentionTarget,
        cutoff: impl Into<Value>,
    ) -> Result<PruneReport> {
        let cutoff = cutoff.into();
        check_timestamp_field(records, target, &cutoff)?;

        let span = info_span!(
            "retention.prune",
            owners = %owners.table(),
            records = %records.table(),
            keep = self.config.keep,
            cutoff = %cutoff
        );

        async {
            let groups = discover_groups(owners, target).await?;
            event!(Level::DEBUG, groups = groups.len(), "retention groups discovered");

            let mut report = PruneReport {
                groups: groups.len(),
                ..Default::default()
            };

            let outcomes: Vec<(GroupKey, GroupOutcome)> = stream::iter(groups)
                .map(|group| {
                    let span = debug_span!("retention.group", group = %group);
                    let cutoff = cutoff.clone();
                    async move {
                        let outcome = self.prune_group(records, target, &group, cutoff).await;
                        (group, outcome)
                    }
                    .instrument(span)
                })
                .buffer_unordered(self.config.max_concurrent_groups.max(1))
                .collect()
                .await;

            for (group, outcome) in outcomes {
                report.deleted += outcome.deleted;
                if let Some(err) = outcome.error {
                    event!(
                        Level::WARN,
                        group = %group,
                        deleted = outcome.deleted,
                        error = %err,
                        "retention group aborted"
                    );
                    report.failed_groups.push(GroupFailure {
                        group,
                        error: err.to_string(),
                    });
                }
            }

            event!(
                Level::INFO,
                deleted = report.deleted,
                failed = report.failed_groups.len(),
                "retention pass finished"
            );
            Ok::<_, StoreError>(report)
        }
        .instrument(span)
        .await
    }

    async fn prune_group(
        &self,
        records: &VersionedRecordStore,
        target: &RetentionTarget,
        group: &GroupKey,
        cutoff: Value,
    ) -> GroupOutcome {
        let filter = group
            .filter(target)
            .lt(target.timestamp_field.clone(), cutoff);

        let mut candidates = Vec::new();
        let scanned = records
            .scan_with_page_size(&filter, self.config.page_size, |record| {
                candidates.push(candidate(&record, &target.timestamp_field)?);
                Ok(())
            })
            .await;
        if let Err(err) = scanned {
            return GroupOutcome {
                deleted: 0,
                error: Some(err),
            };
        }

        let mut deleted = 0usize;
        for doomed in select_for_removal(candidates, self.config.keep) {
            if let Err(err) = records
                .remove(&doomed.partition_key, &doomed.row_key)
                .await
            {
                return GroupOutcome {
                    deleted,
                    error: Some(err),
                };
            }
            deleted += 1;
        }

        event!(Level::DEBUG, group = %group, deleted, "retention group pruned");
        GroupOutcome {
            deleted,
            error: None,
        }
    }
}

/// The timestamp field must be an ordered type declared by the latest version
/// of the record kind, and the cutoff a value of that type.
fn check_timestamp_field(
    records: &VersionedRecordStore,
    target: &RetentionTarget,
    cutoff: &Value,
) -> Result<()> {
    let latest = records.kind().chain().latest()?;
    let field = &target.timestamp_field;
    let Some(field_type) = latest.fields.get(field) else {
        return Err(StoreError::Config(format!(
            "Timestamp field '{}' is not declared by version {} of '{}'",
            field,
            latest.number,
            records.table()
        )));
    };
    if !matches!(
        field_type,
        FieldType::Date | FieldType::Integer | FieldType::String
    ) {
        return Err(StoreError::Config(format!(
            "Timestamp field '{}' of '{}' has unordered type {}",
            field,
            records.table(),
            field_type
        )));
    }
    if !field_type.is_compatible(cutoff) {
        return Err(StoreError::Config(format!(
            "Cutoff {} does not fit timestamp field '{}' of type {}",
            cutoff, field, field_type
        )));
    }
    Ok(())
}

/// One scan of the owning store, collecting distinct group keys in first-seen order.
async fn discover_groups(
    owners: &VersionedRecordStore,
    target: &RetentionTarget,
) -> Result<Vec<GroupKey>> {
    let mut seen = HashSet::new();
    let mut groups = Vec::new();

    owners
        .scan(&Filter::new(), |record| {
            let mut values = Vec::with_capacity(target.group_fields.len());
            for field in &target.group_fields {
                let value = record.field(field).cloned().ok_or_else(|| {
                    StoreError::FieldValidation(format!(
                        "Group field '{}' missing on '{}/{}'",
                        field, record.partition_key, record.row_key
                    ))
                })?;
                values.push(value);
            }
            if seen.insert(Value::Array(values.clone()).to_string()) {
                groups.push(GroupKey { values });
            }
            Ok(())
        })
        .await?;

    Ok(groups)
}

fn candidate(record: &Record, timestamp_field: &str) -> Result<Candidate> {
    let timestamp = record.field(timestamp_field).ok_or_else(|| {
        StoreError::FieldValidation(format!(
            "Timestamp field '{}' missing on '{}/{}'",
            timestamp_field, record.partition_key, record.row_key
        ))
    })?;
    Ok(Candidate {
        partition_key: record.partition_key.clone(),
        row_key: record.row_key.clone(),
        recency: Recency::of(timestamp),
    })
}

/// Orders candidates newest first and returns everything past the first `keep`.
///
/// The sort is stable, so equal timestamps keep their scan order.
fn select_for_removal(mut candidates: Vec<Candidate>, keep: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.recency.cmp(&a.recency));
    if candidates.len() <= keep {
        return Vec::new();
    }
    candidates.split_off(keep)
}
