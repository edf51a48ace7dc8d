//! Item hierarchy with resolved sync targets and hints.
//!
//! The device lists items flat, each pointing at its parent by id. The tree
//! stores them in an arena and links parents and children by index. After
//! [`ItemTree::compute`], every node knows where it would be synced to and
//! how it compares with the ledger and the local filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::{inherit_trash, Hint, RemoteItem};
use crate::storage::LedgerEntry;

/// One item plus its derived state.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub item: RemoteItem,
    #[serde(skip)]
    pub parent: Option<usize>,
    #[serde(skip)]
    pub children: Vec<usize>,
    /// Resolved sync target: the directory for a folder, the file for a
    /// document. `None` when neither a sync root nor an override applies.
    pub target: Option<PathBuf>,
    pub backup_hint: Hint,
    pub sync_hint: Hint,
    /// Own hints united with every descendant's.
    pub combined_hint: Hint,
}

/// Local locations hints are computed against.
#[derive(Debug, Clone, Default)]
pub struct HintContext {
    pub backup_root: Option<PathBuf>,
    pub sync_root: Option<PathBuf>,
}

/// Arena of remote items.
#[derive(Debug, Clone, Default)]
pub struct ItemTree {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    index: HashMap<String, usize>,
}

impl ItemTree {
    /// Link a flat listing into a forest.
    ///
    /// Roots are the live items whose parent is empty or not in the listing.
    /// Trashed items stay addressable by id but hang off no root.
    #[must_use]
    pub fn build(mut items: Vec<RemoteItem>) -> Self {
        inherit_trash(&mut items);

        let index: HashMap<String, usize> = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id.clone(), i))
            .collect();

        let mut nodes: Vec<Node> = items
            .into_iter()
            .map(|item| Node {
                item,
                parent: None,
                children: Vec::new(),
                target: None,
                backup_hint: Hint::NONE,
                sync_hint: Hint::NONE,
                combined_hint: Hint::NONE,
            })
            .collect();

        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            if nodes[i].item.trashed {
                continue;
            }
            match index.get(nodes[i].item.parent_id.as_str()) {
                Some(&parent) if parent != i && !nodes[parent].item.trashed => {
                    nodes[i].parent = Some(parent);
                    nodes[parent].children.push(i);
                }
                _ => roots.push(i),
            }
        }

        let mut tree = Self {
            nodes,
            roots,
            index,
        };
        tree.sort_children();
        tree
    }

    fn sort_children(&mut self) {
        let key = |nodes: &[Node], i: usize| {
            let item = &nodes[i].item;
            (!item.is_collection, item.name.to_lowercase())
        };
        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by_key(|&i| key(&self.nodes, i));
        self.roots = roots;
        for n in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[n].children);
            children.sort_by_key(|&i| key(&self.nodes, i));
            self.nodes[n].children = children;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    #[must_use]
    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    /// Every node, including trashed ones.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Pre-order walk of the live forest as `(depth, node)`.
    #[must_use]
    pub fn walk(&self) -> Vec<(usize, &Node)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&i| (0, i)).collect();
        while let Some((depth, i)) = stack.pop() {
            out.push((depth, &self.nodes[i]));
            stack.extend(self.nodes[i].children.iter().rev().map(|&c| (depth + 1, c)));
        }
        out
    }

    /// The node at `index` followed by all its descendants, pre-order.
    #[must_use]
    pub fn subtree(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.nodes[i].children.iter().rev());
        }
        out
    }

    /// Resolve targets and compute every hint.
    ///
    /// `exists` answers whether a local path exists; production passes
    /// [`Path::exists`].
    pub fn compute(
        &mut self,
        ledger: &HashMap<String, LedgerEntry>,
        ctx: &HintContext,
        exists: impl Fn(&Path) -> bool,
    ) {
        let empty = LedgerEntry::default();
        let backup_enabled = ctx.backup_root.as_deref().is_some_and(&exists);

        // parents before children, so a child can read its parent's target
        let order: Vec<usize> = self
            .roots
            .clone()
            .into_iter()
            .flat_map(|r| self.subtree(r))
            .collect();

        for &i in &order {
            let entry = ledger.get(&self.nodes[i].item.id).unwrap_or(&empty);
            let parent_dir = match self.nodes[i].parent {
                Some(p) => self.nodes[p].target.clone(),
                None => ctx.sync_root.clone(),
            };
            let node = &mut self.nodes[i];
            node.target = resolve_target(&node.item, entry.target.as_deref(), parent_dir);
            node.backup_hint = if backup_enabled {
                backup_hint(&node.item, entry)
            } else {
                Hint::NONE
            };
            node.sync_hint = sync_hint(&node.item, node.target.as_deref(), entry, &exists);
        }

        // trashed nodes are outside `order` and carry no hints
        for node in self.nodes.iter_mut().filter(|n| n.item.trashed) {
            node.target = None;
            node.backup_hint = Hint::NONE;
            node.sync_hint = Hint::NONE;
            node.combined_hint = Hint::NONE;
        }

        for &i in order.iter().rev() {
            let own = self.nodes[i].backup_hint | self.nodes[i].sync_hint;
            let combined = self.nodes[i]
                .children
                .iter()
                .fold(own, |acc, &c| acc | self.nodes[c].combined_hint);
            self.nodes[i].combined_hint = combined;
        }
    }
}

/// Where an item syncs to.
///
/// An override always wins for folders and supplies the base directory for
/// documents. Otherwise the parent's directory (or the sync root at top
/// level) is the base.
fn resolve_target(
    item: &RemoteItem,
    override_dir: Option<&Path>,
    parent_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if item.is_collection {
        override_dir
            .map(Path::to_path_buf)
            .or_else(|| parent_dir.map(|dir| dir.join(&item.name)))
    } else {
        override_dir
            .map(Path::to_path_buf)
            .or(parent_dir)
            .map(|base| base.join(&item.name))
    }
}

/// Backup state of one item, ignoring whether the backup root exists.
#[must_use]
pub fn backup_hint(item: &RemoteItem, entry: &LedgerEntry) -> Hint {
    match entry.live_backup() {
        None => Hint::NEW,
        Some(record) if record.modified < item.modified => Hint::MODIFIED,
        Some(_) => Hint::NONE,
    }
}

/// Sync state of a document, first match wins.
fn sync_hint(
    item: &RemoteItem,
    target: Option<&Path>,
    entry: &LedgerEntry,
    exists: impl Fn(&Path) -> bool,
) -> Hint {
    if item.is_collection {
        return Hint::NONE;
    }
    let Some(target) = target else {
        return Hint::NONE;
    };

    let present = exists(target);
    let Some(record) = &entry.sync else {
        return if present {
            Hint::EXISTS_IN_TARGET
        } else {
            Hint::NEW
        };
    };
    if record.path != target {
        Hint::SYNC_PATH_CHANGED
    } else if record.modified < item.modified {
        Hint::MODIFIED
    } else if !present {
        Hint::NOT_FOUND_IN_TARGET
    } else {
        Hint::NONE
    }
}
