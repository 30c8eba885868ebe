use super::{keys::sort_columns, LOG_PREFIX};
use crate::{MergeError, Result};
use std::collections::{HashMap, HashSet};

/// Per-source reconciliation result; immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub source_id: String,
    pub raw_columns: Vec<String>,
    /// `presence[i]` is true iff unified column `i` is among `raw_columns`.
    pub presence: Vec<bool>,
    pub needs_realignment: bool,
    /// Raw positions ordered by where each column sits in the unified schema.
    /// Columns missing from the schema come last, so the presence count no
    /// longer matches and the record is rejected.
    pub(crate) realign_order: Vec<usize>,
}

impl SourceDescriptor {
    pub fn present_columns(&self) -> usize {
        self.presence.iter().filter(|present| **present).count()
    }
}

#[derive(Clone, Debug)]
pub struct SchemaPlan {
    pub schema: Vec<String>,
    pub descriptors: Vec<SourceDescriptor>,
}

impl SchemaPlan {
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.descriptors
            .iter()
            .map(|descriptor| descriptor.source_id.as_str())
    }
}

/// Union of every source's columns, sorted alphanumerically.
///
/// The first source seeds the set as-is; later sources only add names not seen
/// yet. Same source order in, same schema out.
pub fn unify_schema<S: AsRef<str>>(per_source_columns: &[Vec<S>]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut union: Vec<&str> = Vec::new();

    let mut sources = per_source_columns.iter();
    if let Some(first) = sources.next() {
        for column in first {
            if seen.insert(column.as_ref()) {
                union.push(column.as_ref());
            }
        }
    }
    for columns in sources {
        for column in columns {
            if !seen.contains(column.as_ref()) {
                seen.insert(column.as_ref());
                union.push(column.as_ref());
            }
        }
    }

    sort_columns(&union, false)
}

pub fn build_descriptor(
    schema: &[String],
    source_id: impl Into<String>,
    raw_columns: Vec<String>,
) -> SourceDescriptor {
    let raw_set: HashSet<&str> = raw_columns.iter().map(String::as_str).collect();
    let presence = schema
        .iter()
        .map(|column| raw_set.contains(column.as_str()))
        .collect();

    // Exact name lookup: names that share a sort key (`d1`/`D1`, `D7`/`D07`)
    // still land under their own header.
    let unified_index: HashMap<&str, usize> = schema
        .iter()
        .enumerate()
        .map(|(index, column)| (column.as_str(), index))
        .collect();
    let mut realign_order: Vec<usize> = (0..raw_columns.len()).collect();
    realign_order.sort_by_key(|raw| {
        unified_index
            .get(raw_columns[*raw].as_str())
            .copied()
            .unwrap_or(usize::MAX)
    });
    let needs_realignment = realign_order
        .iter()
        .enumerate()
        .any(|(position, raw)| position != *raw);

    SourceDescriptor {
        source_id: source_id.into(),
        raw_columns,
        presence,
        needs_realignment,
        realign_order,
    }
}

pub fn build_descriptors(
    schema: &[String],
    sources: Vec<(String, Vec<String>)>,
) -> Vec<SourceDescriptor> {
    sources
        .into_iter()
        .map(|(source_id, raw_columns)| build_descriptor(schema, source_id, raw_columns))
        .collect()
}

/// Collects per-source headers, then produces the unified schema and descriptors.
#[derive(Debug, Default)]
pub struct SchemaReconciler {
    sources: Vec<(String, Vec<String>)>,
}

impl SchemaReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source header. Rejected headers leave the reconciler untouched,
    /// so the caller can skip that source and carry on.
    pub fn add_source(
        &mut self,
        source_id: impl Into<String>,
        raw_columns: Vec<String>,
    ) -> Result<()> {
        let source_id = source_id.into();
        if raw_columns.is_empty() {
            return Err(MergeError::EmptyHeader { source_id });
        }
        let mut seen = HashSet::with_capacity(raw_columns.len());
        for column in &raw_columns {
            if !seen.insert(column.as_str()) {
                return Err(MergeError::DuplicateColumn {
                    source_id,
                    column: column.clone(),
                });
            }
        }

        merge_debug!(
            "{LOG_PREFIX}: registered source {} with {} columns",
            source_id,
            raw_columns.len()
        );
        self.sources.push((source_id, raw_columns));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn finish(self) -> Result<SchemaPlan> {
        if self.sources.is_empty() {
            return Err(MergeError::NoSources);
        }
        let per_source: Vec<Vec<&str>> = self
            .sources
            .iter()
            .map(|(_, columns)| columns.iter().map(String::as_str).collect())
            .collect();
        let schema = unify_schema(&per_source);
        let descriptors = build_descriptors(&schema, self.sources);

        merge_debug!(
            "{LOG_PREFIX}: unified schema has {} columns across {} sources ({} need realignment)",
            schema.len(),
            descriptors.len(),
            descriptors.iter().filter(|d| d.needs_realignment).count()
        );
        Ok(SchemaPlan {
            schema,
            descriptors,
        })
    }
}
