// tests/test_layout.rs

use approx::assert_relative_eq;
use edgeviz::graph::{GraphModel, NodeId};
use edgeviz::layout::{compute_layout, compute_layout_with_observer, Layout, LayoutConfig, LayoutError};

fn graph_from(rows: &[[&str; 4]]) -> GraphModel {
    let mut graph = GraphModel::new();
    graph.add_edges(rows).expect("valid rows");
    graph
}

fn star() -> GraphModel {
    graph_from(&[
        ["hub", "a", "1", "1"],
        ["hub", "b", "2", "1"],
        ["hub", "c", "3", "1"],
        ["hub", "d", "4", "1"],
    ])
}

fn pos(layout: &Layout, id: &str) -> (f64, f64) {
    let p = layout.get(&NodeId::from(id)).expect("node has a position");
    (p.x, p.y)
}

fn dist(layout: &Layout, a: &str, b: &str) -> f64 {
    let (ax, ay) = pos(layout, a);
    let (bx, by) = pos(layout, b);
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

/// Five-cycle with one chord: no symmetry makes two pair distances tie.
fn chorded_cycle() -> GraphModel {
    graph_from(&[
        ["A", "B", "1", "1"],
        ["B", "C", "2", "1"],
        ["C", "D", "3", "1"],
        ["D", "E", "4", "1"],
        ["E", "A", "5", "1"],
        ["A", "C", "6", "1"],
    ])
}

/// Distance of every unordered node pair, in a fixed pair order.
fn pair_distances(graph: &GraphModel, layout: &Layout) -> Vec<((String, String), f64)> {
    let nodes = graph.nodes();
    let mut pairs = Vec::new();
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let d = dist(layout, nodes[i].as_str(), nodes[j].as_str());
            pairs.push(((nodes[i].to_string(), nodes[j].to_string()), d));
        }
    }
    pairs
}

/// Largest distance gap, on a ±1 layout, between two pairs whose order is
/// allowed to flip when the run is extended.
const RANK_TOLERANCE: f64 = 0.35;

#[cfg(test)]
mod tests {
    use super::*;

    /// The same seed and parameters give identical layouts.
    #[test]
    fn test_layout_is_deterministic() {
        let graph = star();
        let config = LayoutConfig::default();
        let first = compute_layout(&graph, &config).unwrap();
        let second = compute_layout(&graph, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_give_different_layouts() {
        let graph = star();
        let a = compute_layout(&graph, &LayoutConfig { seed: 1, ..LayoutConfig::default() }).unwrap();
        let b = compute_layout(&graph, &LayoutConfig { seed: 2, ..LayoutConfig::default() }).unwrap();
        assert_ne!(a, b);
    }

    /// Exactly one position per node.
    #[test]
    fn test_layout_is_complete() {
        let graph = graph_from(&[
            ["A", "B", "e1", "1"],
            ["B", "C", "e2", "1"],
            ["C", "A", "e3", "1"],
            ["A", "B", "e4", "2"],
            ["D", "E", "e5", "1"],
        ]);
        let layout = compute_layout(&graph, &LayoutConfig::default()).unwrap();
        assert_eq!(layout.len(), graph.node_count());
        for node in graph.nodes() {
            assert!(layout.get(node).is_some(), "missing {}", node);
        }
        let listed: Vec<&NodeId> = layout.iter().map(|(n, _)| n).collect();
        assert_eq!(listed, graph.nodes().iter().collect::<Vec<_>>());
    }

    /// Seed 42 on the two-edge path yields three distinct points.
    #[test]
    fn test_scenario_positions_are_distinct() {
        let graph = graph_from(&[["A", "B", "e1", "10.0"], ["B", "C", "e2", "5.0"]]);
        let layout = compute_layout(&graph, &LayoutConfig { seed: 42, ..LayoutConfig::default() }).unwrap();
        assert_eq!(layout.len(), 3);
        assert!(dist(&layout, "A", "B") > 1e-6);
        assert!(dist(&layout, "B", "C") > 1e-6);
        assert!(dist(&layout, "A", "C") > 1e-6);
    }

    /// Results are centered and scaled so the largest coordinate is `scale`.
    #[test]
    fn test_layout_rescaled_to_scale() {
        let graph = star();
        for scale in [1.0, 2.5] {
            let layout = compute_layout(&graph, &LayoutConfig { scale, ..LayoutConfig::default() }).unwrap();
            let max_abs = layout
                .iter()
                .map(|(_, p)| p.x.abs().max(p.y.abs()))
                .fold(0.0, f64::max);
            assert_relative_eq!(max_abs, scale, epsilon = 1e-9);

            let n = layout.len() as f64;
            let cx: f64 = layout.iter().map(|(_, p)| p.x).sum::<f64>() / n;
            let cy: f64 = layout.iter().map(|(_, p)| p.y).sum::<f64>() / n;
            assert_relative_eq!(cx, 0.0, epsilon = 1e-9);
            assert_relative_eq!(cy, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_empty_graph_gives_empty_layout() {
        let layout = compute_layout(&GraphModel::new(), &LayoutConfig::default()).unwrap();
        assert!(layout.is_empty());
        assert!(layout.bounds().is_none());
    }

    /// A lone self-looped node sits at the origin, run after run.
    #[test]
    fn test_single_node_layout_is_stable_point() {
        let graph = graph_from(&[["X", "X", "loop", "1"]]);
        let first = compute_layout(&graph, &LayoutConfig::default()).unwrap();
        let second = compute_layout(&graph, &LayoutConfig { seed: 7, ..LayoutConfig::default() }).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(pos(&first, "X"), (0.0, 0.0));
        assert_eq!(first, second);
    }

    /// Connected nodes sit closer together than the two components do.
    #[test]
    fn test_disconnected_components_separate() {
        let graph = graph_from(&[["A", "B", "e1", "1"], ["C", "D", "e2", "1"]]);
        let layout = compute_layout(&graph, &LayoutConfig::default()).unwrap();
        for (_, p) in layout.iter() {
            assert!(p.x.is_finite() && p.y.is_finite());
        }
        let within = dist(&layout, "A", "B").max(dist(&layout, "C", "D"));
        let across = dist(&layout, "A", "C")
            .min(dist(&layout, "A", "D"))
            .min(dist(&layout, "B", "C"))
            .min(dist(&layout, "B", "D"));
        assert!(within > 0.0);
        assert!(across > 0.0);
    }

    /// Running ten times longer only swaps pairs whose distances were
    /// already close, both before and after.
    #[test]
    fn test_longer_runs_keep_distance_order() {
        let graph = chorded_cycle();
        let short = compute_layout(&graph, &LayoutConfig::default()).unwrap();
        let long = compute_layout(&graph, &LayoutConfig { iterations: 500, ..LayoutConfig::default() }).unwrap();
        let before = pair_distances(&graph, &short);
        let after = pair_distances(&graph, &long);
        assert_eq!(before.len(), 10);

        let mut swapped = Vec::new();
        for p in 0..before.len() {
            for q in (p + 1)..before.len() {
                let (d0p, d0q) = (before[p].1, before[q].1);
                let (d1p, d1q) = (after[p].1, after[q].1);
                if (d0p < d0q) != (d1p < d1q) {
                    assert!(
                        (d0p - d0q).abs() <= RANK_TOLERANCE && (d1p - d1q).abs() <= RANK_TOLERANCE,
                        "{:?} and {:?} swapped: {:.3}/{:.3} became {:.3}/{:.3}",
                        before[p].0,
                        before[q].0,
                        d0p,
                        d0q,
                        d1p,
                        d1q
                    );
                    swapped.push((before[p].0.clone(), before[q].0.clone()));
                }
            }
        }
        assert!(swapped.len() < before.len(), "too many swaps: {:?}", swapped);

    }

    /// Every step is capped by a falling temperature, so displacement
    /// shrinks over the run.
    #[test]
    fn test_displacement_diminishes() {
        let graph = star();
        let mut history = Vec::new();
        compute_layout_with_observer(&graph, &LayoutConfig::default(), |stats| history.push(*stats)).unwrap();

        assert!(!history.is_empty());
        assert!(history.len() <= 50);
        for pair in history.windows(2) {
            assert_eq!(pair[1].iteration, pair[0].iteration + 1);
            assert!(pair[1].temperature < pair[0].temperature);
        }
        let first = history.first().unwrap().mean_displacement;
        let last = history.last().unwrap().mean_displacement;
        assert!(last < first, "first {} last {}", first, last);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let graph = star();
        let bad = [
            LayoutConfig { spring_constant: 0.0, ..LayoutConfig::default() },
            LayoutConfig { spring_constant: -1.0, ..LayoutConfig::default() },
            LayoutConfig { spring_constant: f64::NAN, ..LayoutConfig::default() },
            LayoutConfig { iterations: 0, ..LayoutConfig::default() },
            LayoutConfig { scale: 0.0, ..LayoutConfig::default() },
        ];
        for config in bad {
            assert!(matches!(
                compute_layout(&graph, &config),
                Err(LayoutError::InvalidConfig(_))
            ));
        }
    }

    /// Explicit positions: later entries for the same node win.
    #[test]
    fn test_layout_from_explicit_positions() {
        let layout = Layout::from_positions([
            (NodeId::from("A"), edgeviz::Position::new(-1.0, 2.0)),
            (NodeId::from("B"), edgeviz::Position::new(3.0, -4.0)),
            (NodeId::from("A"), edgeviz::Position::new(0.0, 0.0)),
        ]);
        assert_eq!(layout.len(), 2);
        assert_eq!(pos(&layout, "A"), (0.0, 0.0));
        let (lo, hi) = layout.bounds().unwrap();
        assert_eq!((lo.x, lo.y, hi.x, hi.y), (0.0, -4.0, 3.0, 0.0));
    }
}
