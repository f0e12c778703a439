//! Dependency graph over table declarations
//!
//! Nodes are declared tables; there is an edge from a table to every table
//! its foreign keys reference, enforced or documented alike. The load order is
//! a depth-first topological sort that walks declarations in listed order, so
//! an already parent-first list comes back unchanged.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::declaration::TableDeclaration;
use crate::error::{IngestError, Result};

/// Foreign-key dependency graph of declared tables
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    nodes: Vec<&'a TableDeclaration>,
    /// For each node, the indices of the nodes it references
    parents: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph and verify it can be ordered
    ///
    /// # Errors
    /// - [`IngestError::UnknownTable`] when a foreign key names an undeclared table
    /// - [`IngestError::DependencyCycle`] when the references form a cycle
    pub fn build(declarations: &'a [TableDeclaration]) -> Result<Self> {
        let index: HashMap<&str, usize> = declarations
            .iter()
            .enumerate()
            .map(|(i, decl)| (decl.endpoint, i))
            .collect();

        let mut parents = Vec::with_capacity(declarations.len());
        for decl in declarations {
            let mut refs: Vec<usize> = Vec::new();
            for fk in decl.foreign_keys {
                let parent = *index.get(fk.references).ok_or_else(|| IngestError::UnknownTable {
                    table: fk.references.to_string(),
                    referenced_by: decl.endpoint.to_string(),
                })?;
                if !refs.contains(&parent) {
                    refs.push(parent);
                }
            }
            parents.push(refs);
        }

        let mut graph = Self {
            nodes: declarations.iter().collect(),
            parents,
            order: Vec::new(),
        };
        graph.order = graph.topological_order()?;

        debug!(tables = graph.nodes.len(), "Built table dependency graph");
        Ok(graph)
    }

    /// Declarations in an order where every table follows all tables it references
    pub fn load_order(&self) -> Vec<&'a TableDeclaration> {
        self.order.iter().map(|&i| self.nodes[i]).collect()
    }

    /// Endpoints referenced by `endpoint`'s foreign keys
    pub fn parents_of(&self, endpoint: &str) -> Vec<&'a str> {
        self.nodes
            .iter()
            .position(|decl| decl.endpoint == endpoint)
            .map(|i| self.parents[i].iter().map(|&p| self.nodes[p].endpoint).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn topological_order(&self) -> Result<Vec<usize>> {
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut visited = BTreeSet::new();
        let mut visiting = BTreeSet::new();

        for node in 0..self.nodes.len() {
            self.dfs_visit(node, &mut ordered, &mut visited, &mut visiting)?;
        }

        Ok(ordered)
    }

    fn dfs_visit(
        &self,
        node: usize,
        ordered: &mut Vec<usize>,
        visited: &mut BTreeSet<usize>,
        visiting: &mut BTreeSet<usize>,
    ) -> Result<()> {
        if visited.contains(&node) {
            return Ok(());
        }
        if !visiting.insert(node) {
            return Err(IngestError::DependencyCycle {
                table: self.nodes[node].endpoint.to_string(),
            });
        }

        for &parent in &self.parents[node] {
            self.dfs_visit(parent, ordered, visited, visiting)?;
        }

        visiting.remove(&node);
        visited.insert(node);
        ordered.push(node);
        Ok(())
    }
}
