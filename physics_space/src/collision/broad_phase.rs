//! Broad phase pairing using sweep and prune
//!
//! The broad phase keeps one proxy per collision shape and reports bounding
//! volume overlaps as [`PairEvent`]s. Events for a pair are always emitted
//! in created-then-removed order.

use super::AABB;
use crate::object::ObjectId;
use glam::Vec3;
use slab::Slab;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::trace;

/// Handle of a proxy inside a broad phase
pub type ProxyId = usize;

/// The shape a proxy stands for: an object and the index of one of its shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyOwner {
    pub object: ObjectId,
    pub subindex: usize,
}

impl ProxyOwner {
    pub fn new(object: ObjectId, subindex: usize) -> Self {
        Self { object, subindex }
    }
}

/// Change in the set of overlapping proxy pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairEvent {
    Created { a: ProxyOwner, b: ProxyOwner },
    Removed { a: ProxyOwner, b: ProxyOwner },
}

/// Spatial index that pairs overlapping proxies
pub trait BroadPhase: Send {
    /// Insert a proxy and return its handle
    fn create(&mut self, owner: ProxyOwner, aabb: AABB, is_static: bool) -> ProxyId;

    /// Update the bounds of a proxy; pairs change on the next [`BroadPhase::update`]
    fn move_proxy(&mut self, id: ProxyId, aabb: AABB);

    /// Static proxies never pair with each other
    fn set_static(&mut self, id: ProxyId, is_static: bool);

    /// Remove a proxy, emitting `Removed` for every pair it is part of
    fn remove(&mut self, id: ProxyId, events: &mut Vec<PairEvent>);

    /// Recompute overlaps and emit the pair changes since the last update
    fn update(&mut self, events: &mut Vec<PairEvent>);

    /// Owners of proxies whose bounds contain `point`
    fn cull_point(&self, point: Vec3, results: &mut Vec<ProxyOwner>, max_results: usize) -> usize;

    /// Owners of proxies whose bounds the segment `from..to` crosses
    fn cull_segment(
        &self,
        from: Vec3,
        to: Vec3,
        results: &mut Vec<ProxyOwner>,
        max_results: usize,
    ) -> usize;

    /// Owners of proxies whose bounds overlap `aabb`
    fn cull_aabb(&self, aabb: &AABB, results: &mut Vec<ProxyOwner>, max_results: usize) -> usize;

    fn proxy_count(&self) -> usize;
}

struct Proxy {
    owner: ProxyOwner,
    aabb: AABB,
    is_static: bool,
}

/// Axis for sweep and prune
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn of(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Endpoint for sweep and prune
struct Endpoint {
    value: f32,
    proxy: ProxyId,
    is_min: bool,
}

/// Sweep-and-prune broad phase that diffs the overlap set on every update.
///
/// Scratch buffers are kept between updates, so steady-state stepping does
/// not allocate.
#[derive(Default)]
pub struct SweepAndPruneBroadPhase {
    proxies: Slab<Proxy>,
    pairs: BTreeSet<(ProxyId, ProxyId)>,
    next_pairs: BTreeSet<(ProxyId, ProxyId)>,
    endpoints: Vec<Endpoint>,
    active: Vec<ProxyId>,
}

impl SweepAndPruneBroadPhase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of proxy pairs currently reported as overlapping
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    fn pairable(&self, a: ProxyId, b: ProxyId) -> bool {
        let (Some(pa), Some(pb)) = (self.proxies.get(a), self.proxies.get(b)) else {
            return false;
        };
        !(pa.is_static && pb.is_static)
            && pa.owner.object != pb.owner.object
            && pa.aabb.overlaps(&pb.aabb)
    }

    fn pair_event(&self, pair: (ProxyId, ProxyId), created: bool) -> Option<PairEvent> {
        let a = self.proxies.get(pair.0)?.owner;
        let b = self.proxies.get(pair.1)?.owner;
        Some(if created {
            PairEvent::Created { a, b }
        } else {
            PairEvent::Removed { a, b }
        })
    }

    /// Axis with the highest variance of proxy centers
    fn determine_best_axis(&self) -> Axis {
        let count = self.proxies.len() as f32;
        let mut sum = Vec3::ZERO;
        let mut sum_sq = Vec3::ZERO;

        for (_, proxy) in &self.proxies {
            let center = proxy.aabb.center();
            sum += center;
            sum_sq += center * center;
        }

        let mean = sum / count;
        let variance = sum_sq / count - mean * mean;

        if variance.x >= variance.y && variance.x >= variance.z {
            Axis::X
        } else if variance.y >= variance.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    fn sweep(&mut self) {
        self.next_pairs.clear();
        if self.proxies.len() < 2 {
            return;
        }

        let axis = self.determine_best_axis();

        self.endpoints.clear();
        for (id, proxy) in &self.proxies {
            self.endpoints.push(Endpoint {
                value: axis.of(proxy.aabb.min),
                proxy: id,
                is_min: true,
            });
            self.endpoints.push(Endpoint {
                value: axis.of(proxy.aabb.max),
                proxy: id,
                is_min: false,
            });
        }
        // Min endpoints sort before max endpoints at equal values so touching bounds pair
        self.endpoints.sort_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(Ordering::Equal)
                .then(b.is_min.cmp(&a.is_min))
        });

        self.active.clear();
        let mut found = std::mem::take(&mut self.next_pairs);
        for endpoint in &self.endpoints {
            if endpoint.is_min {
                for &other in &self.active {
                    if self.pairable(other, endpoint.proxy) {
                        found.insert((other.min(endpoint.proxy), other.max(endpoint.proxy)));
                    }
                }
                self.active.push(endpoint.proxy);
            } else {
                let proxy = endpoint.proxy;
                self.active.retain(|&idx| idx != proxy);
            }
        }
        self.next_pairs = found;
    }
}

impl BroadPhase for SweepAndPruneBroadPhase {
    fn create(&mut self, owner: ProxyOwner, aabb: AABB, is_static: bool) -> ProxyId {
        let id = self.proxies.insert(Proxy {
            owner,
            aabb,
            is_static,
        });
        trace!(proxy = id, object = ?owner.object, subindex = owner.subindex, "Broad phase proxy created");
        id
    }

    fn move_proxy(&mut self, id: ProxyId, aabb: AABB) {
        if let Some(proxy) = self.proxies.get_mut(id) {
            proxy.aabb = aabb;
        }
    }

    fn set_static(&mut self, id: ProxyId, is_static: bool) {
        if let Some(proxy) = self.proxies.get_mut(id) {
            proxy.is_static = is_static;
        }
    }

    fn remove(&mut self, id: ProxyId, events: &mut Vec<PairEvent>) {
        if !self.proxies.contains(id) {
            return;
        }

        let touching: Vec<(ProxyId, ProxyId)> = self
            .pairs
            .iter()
            .copied()
            .filter(|&(a, b)| a == id || b == id)
            .collect();
        for pair in touching {
            if let Some(event) = self.pair_event(pair, false) {
                events.push(event);
            }
            self.pairs.remove(&pair);
        }

        self.proxies.remove(id);
        trace!(proxy = id, "Broad phase proxy removed");
    }

    fn update(&mut self, events: &mut Vec<PairEvent>) {
        self.sweep();

        for pair in self.pairs.difference(&self.next_pairs) {
            if let Some(event) = self.pair_event(*pair, false) {
                events.push(event);
            }
        }
        for pair in self.next_pairs.difference(&self.pairs) {
            if let Some(event) = self.pair_event(*pair, true) {
                events.push(event);
            }
        }

        std::mem::swap(&mut self.pairs, &mut self.next_pairs);
    }

    fn cull_point(&self, point: Vec3, results: &mut Vec<ProxyOwner>, max_results: usize) -> usize {
        let start = results.len();
        for (_, proxy) in &self.proxies {
            if results.len() - start >= max_results {
                break;
            }
            if proxy.aabb.contains_point(point) {
                results.push(proxy.owner);
            }
        }
        results.len() - start
    }

    fn cull_segment(
        &self,
        from: Vec3,
        to: Vec3,
        results: &mut Vec<ProxyOwner>,
        max_results: usize,
    ) -> usize {
        let start = results.len();
        for (_, proxy) in &self.proxies {
            if results.len() - start >= max_results {
                break;
            }
            if proxy.aabb.intersects_segment(from, to) {
                results.push(proxy.owner);
            }
        }
        results.len() - start
    }

    fn cull_aabb(&self, aabb: &AABB, results: &mut Vec<ProxyOwner>, max_results: usize) -> usize {
        let start = results.len();
        for (_, proxy) in &self.proxies {
            if results.len() - start >= max_results {
                break;
            }
            if proxy.aabb.overlaps(aabb) {
                results.push(proxy.owner);
            }
        }
        results.len() - start
    }

    fn proxy_count(&self) -> usize {
        self.proxies.len()
    }
}

/// Brute force pair detection over a slice of bounds, for cross-checking
#[cfg(test)]
fn brute_force_pairs(aabbs: &[AABB]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..aabbs.len() {
        for j in (i + 1)..aabbs.len() {
            if aabbs[i].overlaps(&aabbs[j]) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(index: u32) -> ProxyOwner {
        ProxyOwner::new(ObjectId::from_raw_parts(index, 0), 0)
    }

    fn unit_box(center: Vec3) -> AABB {
        AABB::from_center_half_extents(center, Vec3::splat(0.5))
    }

    #[test]
    fn test_pairs_created_and_removed() {
        let mut broad = SweepAndPruneBroadPhase::new();
        let mut events = Vec::new();

        let a = broad.create(owner(0), unit_box(Vec3::ZERO), false);
        let _b = broad.create(owner(1), unit_box(Vec3::new(0.5, 0.0, 0.0)), false);
        broad.update(&mut events);
        assert_eq!(
            events,
            vec![PairEvent::Created {
                a: owner(0),
                b: owner(1)
            }]
        );

        events.clear();
        broad.update(&mut events);
        assert!(events.is_empty(), "unchanged overlaps emit nothing");

        broad.move_proxy(a, unit_box(Vec3::new(-5.0, 0.0, 0.0)));
        broad.update(&mut events);
        assert_eq!(
            events,
            vec![PairEvent::Removed {
                a: owner(0),
                b: owner(1)
            }]
        );
    }

    #[test]
    fn test_static_proxies_do_not_pair() {
        let mut broad = SweepAndPruneBroadPhase::new();
        let mut events = Vec::new();
        broad.create(owner(0), unit_box(Vec3::ZERO), true);
        let b = broad.create(owner(1), unit_box(Vec3::ZERO), true);
        broad.update(&mut events);
        assert!(events.is_empty());

        broad.set_static(b, false);
        broad.update(&mut events);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_remove_reports_current_pairs() {
        let mut broad = SweepAndPruneBroadPhase::new();
        let mut events = Vec::new();
        let a = broad.create(owner(0), unit_box(Vec3::ZERO), false);
        broad.create(owner(1), unit_box(Vec3::ZERO), false);
        broad.create(owner(2), unit_box(Vec3::new(0.0, 0.6, 0.0)), false);
        broad.update(&mut events);
        assert_eq!(events.len(), 3);

        events.clear();
        broad.remove(a, &mut events);
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, PairEvent::Removed { a, .. } if *a == owner(0))));

        events.clear();
        broad.update(&mut events);
        assert!(events.is_empty(), "removed pairs are not reported twice");
        assert_eq!(broad.pair_count(), 1);
    }

    #[test]
    fn test_sweep_matches_brute_force() {
        let mut broad = SweepAndPruneBroadPhase::new();
        let mut aabbs = Vec::new();
        for i in 0..40u32 {
            let f = i as f32;
            let center = Vec3::new((f * 1.7).sin() * 4.0, (f * 0.9).cos() * 4.0, (f * 0.3).sin());
            let aabb = unit_box(center);
            aabbs.push(aabb);
            broad.create(owner(i), aabb, false);
        }
        let mut events = Vec::new();
        broad.update(&mut events);
        assert_eq!(events.len(), brute_force_pairs(&aabbs).len());
    }

    #[test]
    fn test_culling_respects_max() {
        let mut broad = SweepAndPruneBroadPhase::new();
        for i in 0..10 {
            broad.create(owner(i), unit_box(Vec3::ZERO), false);
        }
        let mut results = Vec::new();
        assert_eq!(broad.cull_point(Vec3::ZERO, &mut results, 4), 4);
        results.clear();
        assert_eq!(
            broad.cull_segment(Vec3::new(-3.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), &mut results, 100),
            10
        );
        results.clear();
        assert_eq!(broad.cull_aabb(&unit_box(Vec3::new(5.0, 0.0, 0.0)), &mut results, 100), 0);
    }
}
