//! Round-robin distribution of version groups across shards.
//!
//! Groups are consumed smallest-first so short version runs retire
//! early instead of fragmenting the tail of the distribution. Shards
//! pop one item per pass from their bound group queue, which keeps
//! shard sizes balanced while version runs stay contiguous within each
//! shard's output.

use crate::spec::ShardSpec;
use std::collections::VecDeque;
use tracing::debug;

struct Group<T> {
    items: VecDeque<T>,
}

/// Group items by version, preserving both the first-seen order of
/// versions and the item order within each version.
fn group_by_version<T, F>(items: &[T], version_of: &F) -> Vec<Group<T>>
where
    T: Clone,
    F: Fn(&T) -> String,
{
    let mut versions: Vec<String> = Vec::new();
    let mut groups: Vec<Group<T>> = Vec::new();
    for item in items {
        let version = version_of(item);
        match versions.iter().position(|v| *v == version) {
            Some(idx) => groups[idx].items.push_back(item.clone()),
            None => {
                versions.push(version);
                groups.push(Group {
                    items: VecDeque::from([item.clone()]),
                });
            }
        }
    }
    groups
}

/// Pick the next queue for a shard: prefer an entirely unbound
/// non-empty group, otherwise share an already-bound one with items
/// left.
fn next_queue<T>(queues: &[Group<T>], bound: &[Option<usize>]) -> Option<usize> {
    if let Some(idx) =
        (0..queues.len()).find(|idx| !queues[*idx].items.is_empty() && !bound.contains(&Some(*idx)))
    {
        return Some(idx);
    }
    bound
        .iter()
        .flatten()
        .copied()
        .find(|idx| !queues[*idx].items.is_empty())
}

fn distribute<T: Clone>(mut queues: Vec<Group<T>>, total: usize) -> Vec<Vec<T>> {
    // Smallest groups first.
    queues.sort_by_key(|group| group.items.len());

    let mut shards: Vec<Vec<T>> = vec![Vec::new(); total];
    let mut bound: Vec<Option<usize>> = vec![None; total];
    for shard_idx in 0..total {
        bound[shard_idx] = next_queue(&queues, &bound);
    }

    while queues.iter().any(|queue| !queue.items.is_empty()) {
        for shard_idx in 0..total {
            let needs_rebind = match bound[shard_idx] {
                Some(idx) => queues[idx].items.is_empty(),
                None => true,
            };
            if needs_rebind {
                if let Some(next) = next_queue(&queues, &bound) {
                    bound[shard_idx] = Some(next);
                }
            }
            if let Some(idx) = bound[shard_idx] {
                if let Some(item) = queues[idx].items.pop_front() {
                    shards[shard_idx].push(item);
                }
            }
        }
    }
    shards
}

/// Distribute `items` across `spec.total` shards and return the items
/// for shard `spec.current`.
pub fn shard<T, F>(items: &[T], version_of: F, spec: ShardSpec) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> String,
{
    let groups = group_by_version(items, &version_of);
    debug!(
        items = items.len(),
        groups = groups.len(),
        total = spec.total,
        "distributing work items"
    );
    let mut shards = distribute(groups, spec.total);
    std::mem::take(&mut shards[spec.index()])
}

/// Shard independent partitions separately and concatenate the results
/// for the requested shard. Used when one partition must stay ordered
/// ahead of another (e.g. shared-repo items before the rest).
pub fn shard_partitions<T, F>(partitions: &[Vec<T>], version_of: F, spec: ShardSpec) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> String,
{
    let mut out = Vec::new();
    for partition in partitions {
        out.extend(shard(partition, &version_of, spec));
    }
    out
}
