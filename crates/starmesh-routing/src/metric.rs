//! Static tie-break by a physical link metric
//!
//! Evaluated only across the tied directions, against link state polled at
//! decision time. The first direction in slot order wins an exact tie.

use starmesh_core::{Direction, DirectionSet, LinkSnapshot};

use crate::decision::MetricKind;

/// Pick one direction out of `feasible` by `metric`
pub fn break_tie(
    metric: MetricKind,
    feasible: DirectionSet,
    links: &[LinkSnapshot; 4],
) -> Option<Direction> {
    let mut best: Option<(Direction, f64)> = None;
    for direction in feasible.iter() {
        let link = &links[direction.index()];
        let score = match metric {
            MetricKind::ShortestDistance => link.distance_km,
            MetricKind::ShortestQueue => link.queue_len as f64,
            MetricKind::MaximumBandwidth => -link.decay_factor,
        };
        match best {
            Some((_, current)) if score >= current => {}
            _ => best = Some((direction, score)),
        }
    }
    best.map(|(direction, _)| direction)
}
