//! Teardown report

use crate::outcome::{DestroyError, DestroyOutcome, SkipReason};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use sweep_common::ResourceDescriptor;

/// One attempted resource and what happened to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub descriptor: ResourceDescriptor,
    pub outcome: DestroyOutcome,
}

#[derive(Serialize)]
struct EntryRecord<'a> {
    #[serde(flatten)]
    resource: &'a ResourceDescriptor,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

impl Serialize for ReportEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (outcome, reason, error) = match &self.outcome {
            DestroyOutcome::Destroyed => ("destroyed", None, None),
            DestroyOutcome::Skipped(reason) => ("skipped", Some(*reason), None),
            DestroyOutcome::Failed(e) => ("failed", None, Some(e)),
        };

        EntryRecord {
            resource: &self.descriptor,
            outcome,
            reason,
            error: error.map(ToString::to_string),
            code: error.and_then(DestroyError::aws_error).and_then(|e| e.code()),
        }
        .serialize(serializer)
    }
}

/// Per-resource outcomes of a teardown, in attempt order
///
/// Nothing is ever dropped from a report: every descriptor handed to the
/// terminator gets exactly one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeReport {
    entries: Vec<ReportEntry>,
}

impl OutcomeReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: ResourceDescriptor, outcome: DestroyOutcome) {
        self.entries.push(ReportEntry {
            descriptor,
            outcome,
        });
    }

    /// Append another report, keeping its order
    pub fn extend(&mut self, other: OutcomeReport) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn destroyed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_destroyed())
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_skipped()).count()
    }

    /// Skips for one particular reason
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome == DestroyOutcome::Skipped(reason))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failed()).count()
    }

    /// Failed resources with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&ResourceDescriptor, &DestroyError)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            DestroyOutcome::Failed(err) => Some((&e.descriptor, err)),
            _ => None,
        })
    }

    /// Outcome recorded for one resource, if it was attempted
    pub fn outcome_of(&self, identifier: &str) -> Option<&DestroyOutcome> {
        self.entries
            .iter()
            .find(|e| e.descriptor.identifier == identifier)
            .map(|e| &e.outcome)
    }
}

impl Serialize for OutcomeReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("OutcomeReport", 4)?;
        state.serialize_field("destroyed", &self.destroyed())?;
        state.serialize_field("skipped", &self.skipped())?;
        state.serialize_field("failed", &self.failed())?;
        state.serialize_field("entries", &self.entries)?;
        state.end()
    }
}
