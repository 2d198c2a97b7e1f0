//! Schema clustering.
//!
//! Files are fed one at a time, in discovery order. Each file either:
//! 1. joins the group of its error message (unreadable files),
//! 2. joins the group with exactly its fingerprint,
//! 3. joins the most similar existing group as a new variation, when the
//!    similarity reaches the threshold, or
//! 4. starts a new group keyed by its own fingerprint.
//!
//! Similarity is `|common (name, type)| / max(|a|, |b|)`, measured against each
//! group's representative schema only. The representative is the schema a group was
//! created with and never changes, so later variations always diff against it.
//! Presenting the same files in another order can change which schema becomes
//! representative.

use crate::error::Error;
use crate::fingerprint::{Fingerprint, GroupKey};
use crate::schema::{ColumnInfo, FileSchemaInfo, ParsedSchema};
use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::mem;
use tracing::debug;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Reject thresholds outside `(0, 1]`, including NaN.
pub fn validate_threshold(threshold: f64) -> Result<f64, Error> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(threshold)
    } else {
        Err(Error::InvalidThreshold(threshold))
    }
}

/// Files attributed to one schema, with their row counts and combined size.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Members {
    pub files: Vec<String>,
    pub row_counts: Vec<u64>,
    pub total_size: u64,
}

impl Members {
    fn push(&mut self, path: String, schema: &ParsedSchema) {
        self.files.push(path);
        self.row_counts.push(schema.metadata.num_rows);
        self.total_size += schema.metadata.total_compressed_size;
    }

    fn single(path: String, schema: &ParsedSchema) -> Self {
        let mut members = Self::default();
        members.push(path, schema);
        members
    }
}

/// Columns gained and lost relative to a group's representative schema, compared
/// by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnDiff {
    pub added: Vec<ColumnInfo>,
    pub removed: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variation {
    #[serde(flatten)]
    pub members: Members,
    pub schema_info: ParsedSchema,
    /// `None` for the first variation, which holds the group's original members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differences: Option<ColumnDiff>,
}

/// A group starts out `Direct`. The first similar-but-not-identical file moves its
/// members into variation 0 and turns it `Branched` for good.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupState {
    Direct(Members),
    Branched(Vec<Variation>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaGroup {
    fingerprint: Fingerprint,
    representative: ParsedSchema,
    state: GroupState,
}

impl SchemaGroup {
    fn new(fingerprint: Fingerprint, path: String, schema: ParsedSchema) -> Self {
        Self {
            fingerprint,
            state: GroupState::Direct(Members::single(path, &schema)),
            representative: schema,
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn representative(&self) -> &ParsedSchema {
        &self.representative
    }

    pub fn state(&self) -> &GroupState {
        &self.state
    }

    /// Files attributed straight to the group. `None` once branched.
    pub fn direct_members(&self) -> Option<&Members> {
        match &self.state {
            GroupState::Direct(members) => Some(members),
            GroupState::Branched(_) => None,
        }
    }

    pub fn variations(&self) -> &[Variation] {
        match &self.state {
            GroupState::Direct(_) => &[],
            GroupState::Branched(variations) => variations,
        }
    }

    /// Every member set of the group: the direct members, or each variation's.
    pub fn member_sets(&self) -> Vec<&Members> {
        match &self.state {
            GroupState::Direct(members) => vec![members],
            GroupState::Branched(variations) => variations.iter().map(|v| &v.members).collect(),
        }
    }

    pub fn file_count(&self) -> usize {
        self.member_sets().iter().map(|m| m.files.len()).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.member_sets().iter().map(|m| m.total_size).sum()
    }

    pub fn row_counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.member_sets()
            .into_iter()
            .flat_map(|m| m.row_counts.iter().copied())
    }

    fn add_exact(&mut self, path: String, schema: &ParsedSchema) -> Option<usize> {
        match &mut self.state {
            GroupState::Direct(members) => {
                members.push(path, schema);
                None
            }
            // Variation 0 carries the representative schema.
            GroupState::Branched(variations) => {
                if let Some(original) = variations.first_mut() {
                    original.members.push(path, schema);
                }
                Some(0)
            }
        }
    }

    fn add_variation(&mut self, path: String, schema: ParsedSchema) -> usize {
        let differences = column_differences(&self.representative, &schema);

        let mut variations = match mem::replace(&mut self.state, GroupState::Branched(Vec::new())) {
            GroupState::Direct(members) => vec![Variation {
                members,
                schema_info: self.representative.clone(),
                differences: None,
            }],
            GroupState::Branched(variations) => variations,
        };
        variations.push(Variation {
            members: Members::single(path, &schema),
            schema_info: schema,
            differences: Some(differences),
        });

        let index = variations.len() - 1;
        self.state = GroupState::Branched(variations);
        index
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorGroup {
    pub error: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Group {
    Schema(SchemaGroup),
    Error(ErrorGroup),
}

impl Group {
    pub fn file_count(&self) -> usize {
        match self {
            Group::Schema(group) => group.file_count(),
            Group::Error(group) => group.files.len(),
        }
    }

    pub fn as_schema(&self) -> Option<&SchemaGroup> {
        match self {
            Group::Schema(group) => Some(group),
            Group::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorGroup> {
        match self {
            Group::Schema(_) => None,
            Group::Error(group) => Some(group),
        }
    }
}

/// Where `add_file` put a file. Group and variation values are indices into
/// [`SchemaGrouper::groups`] and [`SchemaGroup::variations`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Error { group: usize },
    Exact { group: usize, variation: Option<usize> },
    Variation { group: usize, variation: usize, similarity: f64 },
    NewGroup { group: usize },
}

impl Placement {
    pub fn group(&self) -> usize {
        match *self {
            Placement::Error { group }
            | Placement::Exact { group, .. }
            | Placement::Variation { group, .. }
            | Placement::NewGroup { group } => group,
        }
    }
}

/// Incrementally built group table. Groups keep their creation order.
#[derive(Debug, Clone)]
pub struct SchemaGrouper {
    similarity_threshold: f64,
    groups: Vec<Group>,
    index: AHashMap<GroupKey, usize>,
}

impl Default for SchemaGrouper {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            groups: Vec::new(),
            index: AHashMap::new(),
        }
    }
}

impl SchemaGrouper {
    pub fn new(similarity_threshold: f64) -> Result<Self, Error> {
        Ok(Self {
            similarity_threshold: validate_threshold(similarity_threshold)?,
            ..Self::default()
        })
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Group> {
        self.index.get(key).map(|&i| &self.groups[i])
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_files(&self) -> usize {
        self.groups.iter().map(Group::file_count).sum()
    }

    pub fn schema_groups(&self) -> impl Iterator<Item = &SchemaGroup> {
        self.groups.iter().filter_map(Group::as_schema)
    }

    pub fn error_groups(&self) -> impl Iterator<Item = &ErrorGroup> {
        self.groups.iter().filter_map(Group::as_error)
    }

    /// Attribute one file to a group.
    pub fn add_file(&mut self, path: impl Into<String>, schema_info: FileSchemaInfo) -> Placement {
        let path = path.into();
        let schema = match schema_info {
            FileSchemaInfo::Failed { error } => return self.add_error(path, error),
            FileSchemaInfo::Parsed(schema) => schema,
        };

        let fingerprint = Fingerprint::of(&schema);
        if let Some(&group) = self.index.get(&GroupKey::Schema(fingerprint.clone())) {
            if let Group::Schema(target) = &mut self.groups[group] {
                let variation = target.add_exact(path, &schema);
                debug!("Exact match for group {} ({})", group, fingerprint.digest());
                return Placement::Exact { group, variation };
            }
        }

        if let Some((group, similarity)) = self.most_similar(&schema) {
            if let Group::Schema(target) = &mut self.groups[group] {
                let variation = target.add_variation(path, schema);
                debug!(
                    "Variation {} of group {} (similarity {:.3})",
                    variation, group, similarity
                );
                return Placement::Variation {
                    group,
                    variation,
                    similarity,
                };
            }
        }

        let group = self.groups.len();
        self.index.insert(GroupKey::Schema(fingerprint.clone()), group);
        self.groups
            .push(Group::Schema(SchemaGroup::new(fingerprint, path, schema)));
        debug!("New schema group {}", group);
        Placement::NewGroup { group }
    }

    fn add_error(&mut self, path: String, error: String) -> Placement {
        let key = GroupKey::Error(error);
        if let Some(&group) = self.index.get(&key) {
            if let Group::Error(target) = &mut self.groups[group] {
                target.files.push(path);
            }
            return Placement::Error { group };
        }

        let group = self.groups.len();
        if let GroupKey::Error(error) = &key {
            self.groups.push(Group::Error(ErrorGroup {
                error: error.clone(),
                files: vec![path],
            }));
        }
        self.index.insert(key, group);
        Placement::Error { group }
    }

    /// Highest-scoring schema group at or above the threshold. Ties keep the
    /// earliest group.
    fn most_similar(&self, schema: &ParsedSchema) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, group) in self.groups.iter().enumerate() {
            let Group::Schema(group) = group else {
                continue;
            };
            let similarity = schema_similarity(&group.representative, schema);
            if similarity >= self.similarity_threshold
                && best.map_or(true, |(_, score)| similarity > score)
            {
                best = Some((i, similarity));
            }
        }
        best
    }
}

/// Share of `(name, type)` pairs two schemas have in common, relative to the
/// larger of the two. Column order is ignored.
pub fn schema_similarity(a: &ParsedSchema, b: &ParsedSchema) -> f64 {
    let cols_a = column_pairs(a);
    let cols_b = column_pairs(b);
    let total = cols_a.len().max(cols_b.len());
    if total == 0 {
        return 1.0;
    }
    let common = cols_a.intersection(&cols_b).count();
    common as f64 / total as f64
}

fn column_pairs(schema: &ParsedSchema) -> AHashSet<(&str, &str)> {
    schema
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.data_type.as_str()))
        .collect()
}

/// Columns of `other` missing from `base` (added) and of `base` missing from
/// `other` (removed), by name. Each list keeps its source schema's column order.
pub fn column_differences(base: &ParsedSchema, other: &ParsedSchema) -> ColumnDiff {
    let base_names: AHashSet<&str> = base.column_names().collect();
    let other_names: AHashSet<&str> = other.column_names().collect();

    ColumnDiff {
        added: other
            .columns
            .iter()
            .filter(|c| !base_names.contains(c.name.as_str()))
            .cloned()
            .collect(),
        removed: base
            .columns
            .iter()
            .filter(|c| !other_names.contains(c.name.as_str()))
            .cloned()
            .collect(),
    }
}
