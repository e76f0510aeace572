// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Sweep-and-prune broad phase
//!
//! Sphere bounds are projected on X, sorted, and swept with an active list.
//! Candidates must also overlap on Y and Z. The output is sorted, so it only
//! depends on the input order of the bodies.

use glam::Vec3;

use super::CollisionBody;

#[derive(Clone, Copy)]
struct Interval {
    min: f32,
    max: f32,
    idx: usize,
}

fn bounds(body: &CollisionBody) -> (Vec3, Vec3) {
    let extent = Vec3::splat(body.radius);
    (body.center - extent, body.center + extent)
}

fn overlaps(a: &CollisionBody, b: &CollisionBody) -> bool {
    let (a_min, a_max) = bounds(a);
    let (b_min, b_max) = bounds(b);
    a_min.cmple(b_max).all() && b_min.cmple(a_max).all()
}

/// Candidate pairs `(i, k)` with `i < k`, in ascending order
///
/// Bodies with a non-finite centre or radius are skipped.
pub fn sweep_and_prune(bodies: &[CollisionBody]) -> Vec<(usize, usize)> {
    let mut intervals: Vec<Interval> = bodies
        .iter()
        .enumerate()
        .filter(|(_, body)| body.center.is_finite() && body.radius.is_finite())
        .map(|(idx, body)| Interval {
            min: body.center.x - body.radius,
            max: body.center.x + body.radius,
            idx,
        })
        .collect();

    intervals.sort_by(|a, b| a.min.total_cmp(&b.min).then(a.idx.cmp(&b.idx)));

    let mut active: Vec<Interval> = Vec::new();
    let mut out = Vec::new();

    for current in intervals {
        active.retain(|open| open.max >= current.min);
        for open in &active {
            let (i, k) = if open.idx < current.idx {
                (open.idx, current.idx)
            } else {
                (current.idx, open.idx)
            };
            if overlaps(&bodies[i], &bodies[k]) {
                out.push((i, k));
            }
        }
        active.push(current);
    }

    out.sort_unstable();
    out
}
