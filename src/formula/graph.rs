//! Formula dependency graph and cycle detection.

use std::collections::HashMap;

use super::extract_references;
use crate::schema::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Directed graph of formula fields; an edge `a -> b` means formula `a` reads formula `b`.
///
/// Node order is the table's field declaration order, which makes cycle
/// discovery deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build from `(field name, formula)` pairs.
    pub fn from_formulas<'a, I>(formulas: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let formulas: Vec<(&str, &str)> = formulas.into_iter().collect();
        let mut graph = Self::default();

        for (name, _) in &formulas {
            if !graph.index.contains_key(*name) {
                graph.index.insert(name.to_string(), graph.nodes.len());
                graph.nodes.push(name.to_string());
                graph.edges.push(Vec::new());
            }
        }

        for (name, formula) in &formulas {
            let from = graph.index[*name];
            for reference in extract_references(formula) {
                if let Some(&to) = graph.index.get(&reference) {
                    if !graph.edges[from].contains(&to) {
                        graph.edges[from].push(to);
                    }
                }
            }
        }

        graph
    }

    /// Build from the formula fields of `table`.
    pub fn from_table(table: &Table) -> Self {
        Self::from_formulas(table.formula_fields().map(|(f, formula)| (f.name.as_str(), formula)))
    }

    /// Formula fields `name` depends on directly.
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&i| self.edges[i].iter().map(|&j| self.nodes[j].as_str()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every cycle reachable by DFS, each as a closed path (`a -> b -> a`
    /// is `["a", "b", "a"]`). Empty iff the graph is acyclic.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut colors = vec![Color::White; self.nodes.len()];
        let mut stack = Vec::new();
        let mut cycles = Vec::new();

        for start in 0..self.nodes.len() {
            if colors[start] == Color::White {
                self.visit(start, &mut colors, &mut stack, &mut cycles);
            }
        }
        cycles
    }

    fn visit(
        &self,
        node: usize,
        colors: &mut [Color],
        stack: &mut Vec<usize>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        colors[node] = Color::Gray;
        stack.push(node);

        for &next in &self.edges[node] {
            match colors[next] {
                Color::White => self.visit(next, colors, stack, cycles),
                Color::Gray => {
                    if let Some(pos) = stack.iter().position(|&n| n == next) {
                        let mut cycle: Vec<String> =
                            stack[pos..].iter().map(|&n| self.nodes[n].clone()).collect();
                        cycle.push(self.nodes[next].clone());
                        cycles.push(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        stack.pop();
        colors[node] = Color::Black;
    }
}

/// Cycles among the formula fields of `table`.
pub fn find_cycles(table: &Table) -> Vec<Vec<String>> {
    DependencyGraph::from_table(table).find_cycles()
}
