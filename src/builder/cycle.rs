//! Depth-first cycle detection.
//!
//! Nodes start white, turn gray while on the DFS stack and black once all
//! their successors are done. Reaching a gray node means a back-edge; the
//! gray path from that node to the top of the stack is the cycle.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Successors in insertion order, so the reported cycle is deterministic.
fn successors<N, E>(graph: &DiGraph<N, E>, node: NodeIndex) -> Vec<NodeIndex> {
    let mut next: Vec<_> = graph.neighbors_directed(node, Direction::Outgoing).collect();
    next.sort();
    next.dedup();
    next
}

/// Find a cycle, if any.
///
/// The result lists the nodes of one cycle in edge order, starting at the
/// node the back-edge returns to. Roots are visited in index order.
pub fn find_cycle<N, E>(graph: &DiGraph<N, E>) -> Option<Vec<NodeIndex>> {
    let mut color = vec![Color::White; graph.node_count()];
    let mut path: Vec<NodeIndex> = Vec::new();

    for root in graph.node_indices() {
        if color[root.index()] != Color::White {
            continue;
        }

        color[root.index()] = Color::Gray;
        path.push(root);
        let mut stack = vec![(root, successors(graph, root), 0usize)];

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if top.2 == top.1.len() {
                color[node.index()] = Color::Black;
                path.pop();
                stack.pop();
                continue;
            }

            let next = top.1[top.2];
            top.2 += 1;

            match color[next.index()] {
                Color::White => {
                    color[next.index()] = Color::Gray;
                    path.push(next);
                    stack.push((next, successors(graph, next), 0));
                }
                Color::Gray => {
                    return path
                        .iter()
                        .position(|&n| n == next)
                        .map(|start| path[start..].to_vec());
                }
                Color::Black => {}
            }
        }
    }

    None
}
