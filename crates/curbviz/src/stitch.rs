//! Joining of curb fragments ("curbettes") into maximal chains.
//!
//! Zone geometries arrive as independent polylines that often describe consecutive pieces
//! of one physical curb. Two polylines are joined when the last point of one is exactly the
//! first point of the other, compared after projection to integer pixels.
//!
//! Endpoint lookup keeps one polyline per point, the last one inserted. Where several
//! polylines start (or end) at the same point the chain follows that single entry and never
//! explores the alternatives, so branching curb networks are not decomposed canonically.

use std::collections::{HashMap, VecDeque};

/// Integer pixel position relative to the canvas origin
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i64,
    pub y: i64,
}

impl PixelPoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn as_f32(&self) -> (f32, f32) {
        (self.x as f32, self.y as f32)
    }
}

impl From<(i64, i64)> for PixelPoint {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

/// Joins polylines that share endpoints into chains.
///
/// Chains are returned in the order their seed polyline appears in `lines`. Every
/// non-empty input polyline is consumed by exactly one chain, and the shared vertex of two
/// joined polylines appears once.
pub fn stitch_polylines(lines: &[Vec<PixelPoint>]) -> Vec<Vec<PixelPoint>> {
    let mut by_start: HashMap<PixelPoint, usize> = HashMap::new();
    let mut by_end: HashMap<PixelPoint, usize> = HashMap::new();
    for (idx, line) in lines.iter().enumerate() {
        if let (Some(&start), Some(&end)) = (line.first(), line.last()) {
            by_start.insert(start, idx);
            by_end.insert(end, idx);
        }
    }

    let mut visited = vec![false; lines.len()];
    let mut chains = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if visited[idx] || line.is_empty() {
            continue;
        }
        visited[idx] = true;

        let mut chain: VecDeque<PixelPoint> = line.iter().copied().collect();

        // Forward: append the polyline starting where the chain ends
        while let Some(&next_idx) = chain.back().and_then(|end| by_start.get(end)) {
            if visited[next_idx] {
                break;
            }
            visited[next_idx] = true;
            chain.extend(lines[next_idx].iter().skip(1).copied());
        }

        // Backward: prepend the polyline ending where the chain starts
        while let Some(&prev_idx) = chain.front().and_then(|start| by_end.get(start)) {
            if visited[prev_idx] {
                break;
            }
            visited[prev_idx] = true;
            let prev = &lines[prev_idx];
            for &point in prev[..prev.len() - 1].iter().rev() {
                chain.push_front(point);
            }
        }

        chains.push(chain.into_iter().collect());
    }

    chains
}
