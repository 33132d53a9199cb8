//! Group-by reductions that turn dataset rows into derived records.
//!
//! Every chart goes through [`Aggregation`]: filter rows, group them by a
//! key, reduce each measure over the group. A group only exists if at least
//! one row qualified, so empty groups never show up as zero or `NAN` records.

use crate::data::{Dataset, Field, Row};
use std::collections::HashMap;
use std::fmt;

/// Grouping key selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Entity,
    Year,
    EntityYear,
}

/// Identity of a derived record. Unique within one derived sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Entity(String),
    Year(i32),
    EntityYear(String, i32),
}

impl Key {
    pub fn entity(&self) -> Option<&str> {
        match self {
            Key::Entity(e) | Key::EntityYear(e, _) => Some(e),
            Key::Year(_) => None,
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            Key::Year(y) | Key::EntityYear(_, y) => Some(*y),
            Key::Entity(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Entity(e) => write!(f, "{}", e),
            Key::Year(y) => write!(f, "{}", y),
            Key::EntityYear(e, y) => write!(f, "{}:{}", e, y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Mean,
    /// Value of the earliest row by year
    First,
    /// Value of the latest row by year
    Last,
    Min,
    Max,
}

impl Reduction {
    fn needs_year_order(self) -> bool {
        matches!(self, Reduction::First | Reduction::Last)
    }

    /// Reduce a group's values. `values` are in group order (year-sorted when
    /// the reduction is order-dependent).
    fn reduce(self, mut values: impl Iterator<Item = f64>) -> f64 {
        match self {
            Reduction::Sum => values.filter(|v| v.is_finite()).sum(),
            Reduction::Mean => {
                let (sum, n) = values
                    .filter(|v| v.is_finite())
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 {
                    f64::NAN
                } else {
                    sum / n as f64
                }
            }
            Reduction::First => values.next().unwrap_or(f64::NAN),
            Reduction::Last => values.last().unwrap_or(f64::NAN),
            Reduction::Min => values
                .filter(|v| v.is_finite())
                .fold(f64::NAN, |acc, v| if acc.is_nan() || v < acc { v } else { acc }),
            Reduction::Max => values
                .filter(|v| v.is_finite())
                .fold(f64::NAN, |acc, v| if acc.is_nan() || v > acc { v } else { acc }),
        }
    }
}

/// A named reduction over one dataset field
#[derive(Debug, Clone, Copy)]
pub struct Measure {
    pub name: &'static str,
    pub field: Field,
    pub reduction: Reduction,
}

/// The summary of one group of rows
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub key: Key,
    fields: Vec<(&'static str, f64)>,
}

impl DerivedRecord {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            fields: Vec::new(),
        }
    }

    /// Value of a named field; `NAN` when absent
    pub fn get(&self, name: &str) -> f64 {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .unwrap_or(f64::NAN)
    }

    /// Insert or overwrite a field
    pub fn set(&mut self, name: &'static str, value: f64) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: &'static str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn fields(&self) -> &[(&'static str, f64)] {
        &self.fields
    }

    /// True when every named field holds a finite value
    pub fn is_finite_for(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.get(n).is_finite())
    }
}

/// Drop records that cannot be positioned because one of `names` is not finite
pub fn retain_finite(records: Vec<DerivedRecord>, names: &[&str]) -> Vec<DerivedRecord> {
    records
        .into_iter()
        .filter(|r| r.is_finite_for(names))
        .collect()
}

/// Inner join of two derived sequences on their keys, keeping `left` order.
/// Fields of `right` are merged into the matching `left` record.
pub fn join(left: Vec<DerivedRecord>, right: &[DerivedRecord]) -> Vec<DerivedRecord> {
    let index: HashMap<&Key, &DerivedRecord> = right.iter().map(|r| (&r.key, r)).collect();
    left.into_iter()
        .filter_map(|mut record| {
            let other = index.get(&record.key)?;
            for &(name, value) in other.fields() {
                record.set(name, value);
            }
            Some(record)
        })
        .collect()
}

/// Declarative group-by over a dataset
pub struct Aggregation<'a> {
    group_by: GroupBy,
    measures: Vec<Measure>,
    filter: Option<Box<dyn Fn(&Row) -> bool + 'a>>,
    insertion_order: bool,
}

impl<'a> Aggregation<'a> {
    pub fn by(group_by: GroupBy) -> Self {
        Self {
            group_by,
            measures: Vec::new(),
            filter: None,
            insertion_order: false,
        }
    }

    pub fn measure(mut self, name: &'static str, field: Field, reduction: Reduction) -> Self {
        self.measures.push(Measure {
            name,
            field,
            reduction,
        });
        self
    }

    /// Only rows satisfying the predicate qualify for a group
    pub fn filter(mut self, predicate: impl Fn(&Row) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Emit groups in order of first appearance instead of ascending key order
    pub fn insertion_order(mut self) -> Self {
        self.insertion_order = true;
        self
    }

    fn key_of(&self, row: &Row) -> Option<Key> {
        match self.group_by {
            GroupBy::Entity => Some(Key::Entity(row.entity.clone())),
            GroupBy::Year => row.year().map(Key::Year),
            GroupBy::EntityYear => row.year().map(|y| Key::EntityYear(row.entity.clone(), y)),
        }
    }

    pub fn run(&self, dataset: &Dataset) -> Vec<DerivedRecord> {
        let mut slots: HashMap<Key, usize> = HashMap::new();
        let mut groups: Vec<(Key, Vec<&Row>)> = Vec::new();

        for row in dataset.rows() {
            if let Some(pred) = &self.filter {
                if !pred(row) {
                    continue;
                }
            }
            let Some(key) = self.key_of(row) else {
                continue;
            };
            match slots.get(&key) {
                Some(&idx) => groups[idx].1.push(row),
                None => {
                    slots.insert(key.clone(), groups.len());
                    groups.push((key, vec![row]));
                }
            }
        }

        if !self.insertion_order {
            groups.sort_by(|a, b| a.0.cmp(&b.0));
        }

        let ordered = self.measures.iter().any(|m| m.reduction.needs_year_order());

        groups
            .into_iter()
            .map(|(key, mut rows)| {
                if ordered {
                    // stable: ties keep original row order
                    rows.sort_by(|a, b| a.get(Field::Year).total_cmp(&b.get(Field::Year)));
                }
                let mut record = DerivedRecord::new(key);
                for m in &self.measures {
                    let value = m.reduction.reduce(rows.iter().map(|r| r.get(m.field)));
                    record.set(m.name, value);
                }
                record
            })
            .collect()
    }
}
