//! Table ordering by inline reference dependencies.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use super::CompileOptions;
use crate::schema::{FieldKind, Table};

/// Tables whose rows `table` references through inline `REFERENCES` columns.
fn referenced_tables<'a>(table: &'a Table, opts: &'a CompileOptions) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for field in &table.fields {
        let target = match &field.kind {
            FieldKind::LinkedRecord { related_table }
            | FieldKind::Relationship { related_table, .. } => related_table.as_str(),
            FieldKind::CreatedBy | FieldKind::ModifiedBy | FieldKind::User => {
                opts.users_table.as_str()
            }
            _ => continue,
        };
        if target != table.name && !out.contains(&target) {
            out.push(target);
        }
    }
    out
}

/// Order tables so every referenced table is created before its referrers.
///
/// Kahn's algorithm; among tables that are ready at the same time the one
/// declared first wins. References to tables outside `tables` are ignored.
/// Tables caught in a reference cycle are appended in declaration order.
pub fn order_tables<'a>(tables: &'a [Table], opts: &CompileOptions) -> Vec<&'a Table> {
    let index: HashMap<&str, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; tables.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tables.len()];
    for (i, table) in tables.iter().enumerate() {
        for target in referenced_tables(table, opts) {
            if let Some(&j) = index.get(target) {
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..tables.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut placed = vec![false; tables.len()];
    let mut ordered = Vec::with_capacity(tables.len());

    while let Some(i) = ready.pop_first() {
        placed[i] = true;
        ordered.push(&tables[i]);
        for &d in &dependents[i] {
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                ready.insert(d);
            }
        }
    }

    if ordered.len() < tables.len() {
        let stuck: Vec<&str> = tables
            .iter()
            .enumerate()
            .filter(|(i, _)| !placed[*i])
            .map(|(_, t)| t.name.as_str())
            .collect();
        warn!(tables = ?stuck, "reference cycle between tables; keeping declaration order");
        ordered.extend(tables.iter().enumerate().filter(|(i, _)| !placed[*i]).map(|(_, t)| t));
    }
    ordered
}
