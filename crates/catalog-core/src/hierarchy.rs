//! Hierarchy builder
//!
//! Builds a forest from a flat list of items with optional parent keys. The
//! forest is an arena: nodes refer to each other by index, and every
//! traversal uses an explicit stack, so arbitrarily deep chains are safe.
//!
//! Edges whose parent key does not resolve, or that would close a cycle, are
//! dropped and the child becomes a root. Building never fails.

use std::collections::{HashMap, HashSet};

use crate::model::Entity;

/// An item that can be placed in a hierarchy
pub trait Hierarchical {
    fn node_key(&self) -> &str;
    fn parent_node_key(&self) -> Option<&str>;
    fn sort_name(&self) -> &str;
}

impl<T: Hierarchical + ?Sized> Hierarchical for &T {
    fn node_key(&self) -> &str {
        (**self).node_key()
    }

    fn parent_node_key(&self) -> Option<&str> {
        (**self).parent_node_key()
    }

    fn sort_name(&self) -> &str {
        (**self).sort_name()
    }
}

impl Hierarchical for Entity {
    fn node_key(&self) -> &str {
        &self.identity_key
    }

    fn parent_node_key(&self) -> Option<&str> {
        self.parent_key.as_deref()
    }

    fn sort_name(&self) -> &str {
        &self.attributes.name
    }
}

/// Ordering applied after the forest is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Input order at every level
    #[default]
    Input,
    /// Roots by case-insensitive name; children keep input order
    RootsByName,
    /// Every level by case-insensitive name
    AllByName,
}

/// An edge that was not attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokenEdge {
    /// The parent key is not in the input
    Unresolved { key: String, parent_key: String },
    /// Attaching would make the node its own ancestor
    Cycle { key: String, parent_key: String },
}

/// Index of a node within its forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Slot<T> {
    item: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A forest of [`HierarchyNode`]s
#[derive(Debug)]
pub struct Forest<T> {
    slots: Vec<Slot<T>>,
    roots: Vec<NodeId>,
    index: HashMap<String, NodeId>,
    broken: Vec<BrokenEdge>,
}

/// Build a forest in input order.
pub fn build<T: Hierarchical>(items: Vec<T>) -> Forest<T> {
    build_sorted(items, SortOrder::Input)
}

/// Build a forest and apply `order`.
pub fn build_sorted<T: Hierarchical>(items: Vec<T>, order: SortOrder) -> Forest<T> {
    let mut index: HashMap<String, NodeId> = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        index.entry(item.node_key().to_string()).or_insert(NodeId(i));
    }

    // tree_of[i] leads to the root of the tree currently containing i
    let mut tree_of: Vec<usize> = (0..items.len()).collect();
    let mut parents: Vec<Option<NodeId>> = vec![None; items.len()];
    let mut children: Vec<Vec<NodeId>> = vec![Vec::new(); items.len()];
    let mut broken = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let Some(parent_key) = item.parent_node_key() else {
            continue;
        };
        let edge = || (item.node_key().to_string(), parent_key.to_string());

        let Some(&NodeId(p)) = index.get(parent_key) else {
            let (key, parent_key) = edge();
            broken.push(BrokenEdge::Unresolved { key, parent_key });
            continue;
        };

        // i is still the root of its own tree, so the edge closes a cycle
        // exactly when the candidate parent already sits in that tree
        if find_root(&mut tree_of, p) == i {
            let (key, parent_key) = edge();
            broken.push(BrokenEdge::Cycle { key, parent_key });
            continue;
        }

        parents[i] = Some(NodeId(p));
        children[p].push(NodeId(i));
        tree_of[i] = p;
    }

    let roots: Vec<NodeId> = (0..items.len())
        .filter(|&i| parents[i].is_none())
        .map(NodeId)
        .collect();

    let slots = items
        .into_iter()
        .zip(parents)
        .zip(children)
        .map(|((item, parent), children)| Slot {
            item,
            parent,
            children,
        })
        .collect();

    let mut forest = Forest {
        slots,
        roots,
        index,
        broken,
    };
    forest.apply_order(order);
    forest
}

fn find_root(tree_of: &mut [usize], start: usize) -> usize {
    let mut root = start;
    while tree_of[root] != root {
        root = tree_of[root];
    }
    let mut current = start;
    while tree_of[current] != root {
        let next = tree_of[current];
        tree_of[current] = root;
        current = next;
    }
    root
}

impl<T: Hierarchical> Forest<T> {
    fn apply_order(&mut self, order: SortOrder) {
        let slots = &self.slots;
        let by_name = |id: &NodeId| slots[id.0].item.sort_name().to_lowercase();
        match order {
            SortOrder::Input => {}
            SortOrder::RootsByName => self.roots.sort_by_cached_key(by_name),
            SortOrder::AllByName => {
                let mut roots = std::mem::take(&mut self.roots);
                roots.sort_by_cached_key(by_name);
                let mut sorted_children: Vec<Vec<NodeId>> = self
                    .slots
                    .iter()
                    .map(|slot| {
                        let mut c = slot.children.clone();
                        c.sort_by_cached_key(by_name);
                        c
                    })
                    .collect();
                for (slot, children) in self.slots.iter_mut().zip(sorted_children.drain(..)) {
                    slot.children = children;
                }
                self.roots = roots;
            }
        }
    }
}

impl<T> Forest<T> {
    /// Total number of nodes
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Edges dropped while building
    pub fn broken_edges(&self) -> &[BrokenEdge] {
        &self.broken
    }

    /// Root nodes in display order
    pub fn roots(&self) -> impl Iterator<Item = HierarchyNode<'_, T>> + '_ {
        self.roots.iter().map(move |&id| self.node(id))
    }

    /// Look up a node by key
    pub fn get(&self, key: &str) -> Option<HierarchyNode<'_, T>> {
        self.index.get(key).map(|&id| self.node(id))
    }

    pub fn node(&self, id: NodeId) -> HierarchyNode<'_, T> {
        HierarchyNode { forest: self, id }
    }

    /// Depth-first pre-order traversal of the whole forest
    pub fn walk(&self) -> Walk<'_, T> {
        Walk::new(self, self.roots.iter().rev().copied().map(|id| (0, id)).collect())
    }

    /// Pre-order traversal that only descends into nodes whose key is in
    /// `expanded`. Expansion state belongs to the caller.
    pub fn walk_expanded<'a>(
        &'a self,
        expanded: &HashSet<String>,
    ) -> Vec<(usize, HierarchyNode<'a, T>)>
    where
        T: Hierarchical,
    {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, NodeId)> =
            self.roots.iter().rev().copied().map(|id| (0, id)).collect();
        while let Some((depth, id)) = stack.pop() {
            let slot = &self.slots[id.0];
            out.push((depth, self.node(id)));
            if expanded.contains(slot.item.node_key()) {
                stack.extend(slot.children.iter().rev().map(|&c| (depth + 1, c)));
            }
        }
        out
    }

    /// Nodes from a root down to `key`, inclusive
    pub fn path_to(&self, key: &str) -> Vec<HierarchyNode<'_, T>> {
        let Some(&start) = self.index.get(key) else {
            return Vec::new();
        };
        let mut path = vec![self.node(start)];
        let mut current = start;
        while let Some(parent) = self.slots[current.0].parent {
            path.push(self.node(parent));
            current = parent;
        }
        path.reverse();
        path
    }

    /// The subtree under `key` in pre-order, including the node itself
    pub fn subtree(&self, key: &str) -> Vec<HierarchyNode<'_, T>> {
        match self.index.get(key) {
            Some(&id) => Walk::new(self, vec![(0, id)]).map(|(_, node)| node).collect(),
            None => Vec::new(),
        }
    }

    /// Consume the forest, returning items in pre-order with their depth
    pub fn into_flattened(self) -> Vec<(usize, T)> {
        let order: Vec<(usize, NodeId)> = self.walk().map(|(d, n)| (d, n.id)).collect();
        let mut items: Vec<Option<T>> = self.slots.into_iter().map(|s| Some(s.item)).collect();
        order
            .into_iter()
            .filter_map(|(depth, id)| items[id.0].take().map(|item| (depth, item)))
            .collect()
    }
}

/// A borrowed view of one node and its position in the forest
#[derive(Debug)]
pub struct HierarchyNode<'a, T> {
    forest: &'a Forest<T>,
    id: NodeId,
}

impl<T> Clone for HierarchyNode<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for HierarchyNode<'_, T> {}

impl<'a, T> HierarchyNode<'a, T> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn item(&self) -> &'a T {
        &self.forest.slots[self.id.0].item
    }

    pub fn parent(&self) -> Option<HierarchyNode<'a, T>> {
        self.forest.slots[self.id.0]
            .parent
            .map(|id| self.forest.node(id))
    }

    /// Children in display order
    pub fn children(&self) -> impl Iterator<Item = HierarchyNode<'a, T>> + 'a {
        let forest = self.forest;
        forest.slots[self.id.0]
            .children
            .iter()
            .map(move |&id| forest.node(id))
    }

    pub fn child_count(&self) -> usize {
        self.forest.slots[self.id.0].children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.child_count() == 0
    }

    /// Distance from the root; roots have depth 0
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.forest.slots[self.id.0].parent;
        while let Some(id) = current {
            depth += 1;
            current = self.forest.slots[id.0].parent;
        }
        depth
    }
}

/// Depth-first pre-order iterator yielding `(depth, node)`
pub struct Walk<'a, T> {
    forest: &'a Forest<T>,
    stack: Vec<(usize, NodeId)>,
}

impl<'a, T> Walk<'a, T> {
    fn new(forest: &'a Forest<T>, stack: Vec<(usize, NodeId)>) -> Self {
        Self { forest, stack }
    }
}

impl<'a, T> Iterator for Walk<'a, T> {
    type Item = (usize, HierarchyNode<'a, T>);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, id) = self.stack.pop()?;
        let children = &self.forest.slots[id.0].children;
        self.stack
            .extend(children.iter().rev().map(|&child| (depth + 1, child)));
        Some((depth, self.forest.node(id)))
    }
}
