use crate::error::ResolveError;
use crate::metadata::FolderNode;
use std::collections::{HashMap, HashSet};

/// Album folders keyed by id. Parent links form a forest.
#[derive(Debug, Clone, Default)]
pub struct FolderTree {
    nodes: HashMap<i64, FolderNode>,
}

impl FolderTree {
    pub fn new(nodes: impl IntoIterator<Item = FolderNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|node| (node.id, node)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks parent links from `leaf` upwards and returns the chain ordered
    /// root first. A parent id that is not in the tree ends the chain.
    /// Returns `Ok(None)` when `leaf` itself is unknown.
    pub fn chain(&self, leaf: i64) -> Result<Option<Vec<&FolderNode>>, ResolveError> {
        let Some(mut node) = self.nodes.get(&leaf) else {
            return Ok(None);
        };

        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        loop {
            if !seen.insert(node.id) {
                return Err(ResolveError::FolderCycle(node.id));
            }
            chain.push(node);

            match node.parent_id.and_then(|parent| self.nodes.get(&parent)) {
                Some(parent) => node = parent,
                None => break,
            }
        }

        chain.reverse();
        Ok(Some(chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, name: &str, parent: Option<i64>, owner: i64) -> FolderNode {
        FolderNode {
            id,
            name: name.to_string(),
            parent_id: parent,
            owner_id: owner,
        }
    }

    #[test]
    fn chain_is_root_first() {
        let tree = FolderTree::new([
            node(1, "Family", None, 5),
            node(2, "Trips", Some(1), 6),
            node(3, "2024", Some(2), 7),
        ]);

        let chain = tree.chain(3).expect("walk").expect("known leaf");
        let names: Vec<&str> = chain.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Family", "Trips", "2024"]);
        assert_eq!(chain[0].owner_id, 5);
    }

    #[test]
    fn missing_parent_ends_the_chain() {
        let tree = FolderTree::new([node(2, "Orphan", Some(99), 1)]);
        let chain = tree.chain(2).expect("walk").expect("known leaf");
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn unknown_leaf_is_none() {
        let tree = FolderTree::default();
        assert!(tree.chain(1).expect("walk").is_none());
    }

    #[test]
    fn cycles_are_reported() {
        let tree = FolderTree::new([node(1, "A", Some(2), 1), node(2, "B", Some(1), 1)]);
        let err = tree.chain(1).expect_err("cycle must fail");
        assert!(matches!(err, ResolveError::FolderCycle(_)));
    }
}
