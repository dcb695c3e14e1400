//! Pure traversals over the pipeline graphs.
//!
//! Every poll tick fetches a fresh snapshot and calls these against it;
//! the walkers keep only their visited sets and cursors across ticks.
//! Nothing here does I/O or mutates the graph.

use std::collections::{HashMap, HashSet};

use skyline_api::{ExecutionGraph, ExecutionNode, LayoutNode};

/// Stage types internal to the orchestrator, never surfaced to the user.
pub const IGNORED_STAGE_TYPES: &[&str] = &["Integration", "PrepareExecution"];

/// Step types internal to the orchestrator, never surfaced to the user.
pub const IGNORED_STEP_TYPES: &[&str] = &["Initialize", "Cleanup"];

fn is_ignored_stage(node: &LayoutNode) -> bool {
    IGNORED_STAGE_TYPES.contains(&node.node_type.as_str())
}

fn is_ignored_step(node: &ExecutionNode) -> bool {
    IGNORED_STEP_TYPES.contains(&node.step_type.as_str())
}

/// Find the next active stage at or after `cursor`.
///
/// Returns the cursor node itself while it is still active and not an
/// internal type; otherwise follows the first next-edge and recurses.
/// `None` means no stage remains past the cursor. The traversal only
/// moves forward along next-edges, so it can never return a stage
/// behind the cursor.
pub fn next_active_stage<'a>(
    layout: &'a HashMap<String, LayoutNode>,
    cursor: &str,
) -> Option<&'a LayoutNode> {
    let node = layout.get(cursor)?;
    if node.status.is_active() && !is_ignored_stage(node) {
        return Some(node);
    }
    if node.next_ids.len() > 1 {
        tracing::debug!(
            stage = %node.node_id,
            candidates = node.next_ids.len(),
            "stage layout branches, following the first edge"
        );
    }
    let next = node.next_ids.first()?;
    next_active_stage(layout, next)
}

/// Find the first active step at or after `cursor`, descending through
/// children before next-siblings.
///
/// `None` means no step is active this tick; the caller keeps polling.
pub fn next_active_step<'a>(graph: &'a ExecutionGraph, cursor: &str) -> Option<&'a ExecutionNode> {
    let node = graph.node_map.get(cursor)?;
    if node.status.is_active() && !is_ignored_step(node) {
        return Some(node);
    }
    let adjacency = graph.adjacency(cursor)?;
    for child in &adjacency.children {
        if let Some(found) = next_active_step(graph, child) {
            return Some(found);
        }
    }
    for next in &adjacency.next_ids {
        if let Some(found) = next_active_step(graph, next) {
            return Some(found);
        }
    }
    None
}

/// Find the first unvisited step at or after `cursor`, regardless of
/// status, in the same children-then-next order.
///
/// Used once the stage is terminal to sweep up every remaining step.
/// `None` means the stage's steps are exhausted.
pub fn next_inactive_step<'a>(
    graph: &'a ExecutionGraph,
    cursor: &str,
    visited: &HashSet<String>,
) -> Option<&'a ExecutionNode> {
    let node = graph.node_map.get(cursor)?;
    if !visited.contains(&node.uuid) && !is_ignored_step(node) {
        return Some(node);
    }
    let adjacency = graph.adjacency(cursor)?;
    for child in &adjacency.children {
        if let Some(found) = next_inactive_step(graph, child, visited) {
            return Some(found);
        }
    }
    for next in &adjacency.next_ids {
        if let Some(found) = next_inactive_step(graph, next, visited) {
            return Some(found);
        }
    }
    None
}
