//! Ordered, multi-tenant hook storage.
//!
//! Hooks are keyed by opcode (or the wildcard) and grouped by integer order.
//! Groups are kept sorted ascending; insertion splices a new group in via
//! binary search or appends to an existing group, preserving registration
//! order within it. Dispatch traverses a merge of the wildcard and
//! opcode-specific orderings; on an order tie the wildcard group runs first.

use crate::protocol::hook::{Hook, HookKey};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Hooks of one key sharing an order.
struct HookGroup {
    order: i32,
    hooks: Vec<Rc<Hook>>,
}

/// Per-key hook orderings.
pub(crate) struct HookRegistry {
    orderings: HashMap<HookKey, Vec<HookGroup>>,
    next_id: u64,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            orderings: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Insert a hook into its key's ordering.
    pub fn insert(&mut self, hook: Rc<Hook>) {
        let groups = self.orderings.entry(hook.key).or_default();
        match groups.binary_search_by(|group| group.order.cmp(&hook.order)) {
            Ok(pos) => groups[pos].hooks.push(hook),
            Err(pos) => groups.insert(
                pos,
                HookGroup {
                    order: hook.order,
                    hooks: vec![hook],
                },
            ),
        }
    }

    /// Remove a hook. Returns whether it was present; empty groups are
    /// pruned. Idempotent.
    pub fn remove(&mut self, hook: &Hook) -> bool {
        let Some(groups) = self.orderings.get_mut(&hook.key) else {
            return false;
        };
        let Ok(pos) = groups.binary_search_by(|group| group.order.cmp(&hook.order)) else {
            return false;
        };

        let group = &mut groups[pos];
        let before = group.hooks.len();
        group.hooks.retain(|candidate| candidate.id != hook.id);
        let removed = group.hooks.len() != before;

        if group.hooks.is_empty() {
            groups.remove(pos);
        }
        if groups.is_empty() {
            self.orderings.remove(&hook.key);
        }
        removed
    }

    /// Deactivate and remove every hook owned by `namespace`, returning the
    /// removed hooks so the caller can settle bookkeeping.
    pub fn remove_namespace(&mut self, namespace: &str) -> Vec<Rc<Hook>> {
        let mut removed = Vec::new();
        self.orderings.retain(|_, groups| {
            groups.retain_mut(|group| {
                group.hooks.retain(|hook| {
                    if hook.namespace == namespace {
                        hook.deactivate();
                        removed.push(Rc::clone(hook));
                        false
                    } else {
                        true
                    }
                });
                !group.hooks.is_empty()
            });
            !groups.is_empty()
        });

        if !removed.is_empty() {
            debug!(namespace, count = removed.len(), "removed namespaced hooks");
        }
        removed
    }

    /// Deactivate and drop every hook. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let mut count = 0;
        for groups in self.orderings.values() {
            for group in groups {
                for hook in &group.hooks {
                    hook.deactivate();
                    count += 1;
                }
            }
        }
        self.orderings.clear();
        count
    }

    /// Merged traversal for one opcode: ascending group order across the
    /// wildcard and opcode orderings, wildcard first on ties, registration
    /// order within a group. The result is a snapshot; hooks deactivated
    /// after it is taken are skipped at dispatch time.
    pub fn hooks_for_opcode(&self, opcode: u16) -> Vec<Rc<Hook>> {
        let empty: &[HookGroup] = &[];
        let wildcard = self
            .orderings
            .get(&HookKey::Wildcard)
            .map_or(empty, Vec::as_slice);
        let specific = self
            .orderings
            .get(&HookKey::Opcode(opcode))
            .map_or(empty, Vec::as_slice);

        let total = wildcard.iter().chain(specific).map(|g| g.hooks.len()).sum();
        let mut merged = Vec::with_capacity(total);

        let (mut w, mut s) = (0, 0);
        while w < wildcard.len() && s < specific.len() {
            if wildcard[w].order <= specific[s].order {
                merged.extend(wildcard[w].hooks.iter().cloned());
                w += 1;
            } else {
                merged.extend(specific[s].hooks.iter().cloned());
                s += 1;
            }
        }
        for group in &wildcard[w..] {
            merged.extend(group.hooks.iter().cloned());
        }
        for group in &specific[s..] {
            merged.extend(group.hooks.iter().cloned());
        }
        merged
    }
}
