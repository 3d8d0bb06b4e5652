//! The fixed-step pipeline
//!
//! A step runs under the space lock: `setup`, then integrate forces,
//! generate islands, set up constraints, solve them, integrate velocities,
//! and finally `update`, which lets the broad phase report pair changes.

use super::activity::ListKind;
use super::pairs::{CachedContact, PairKey, PairState};
use super::solver::{ContactConstraint, IslandSolver, SolverContact};
use super::{ElapsedTime, Space};
use crate::collision::{narrow_phase, ContactManifold, MAX_MANIFOLD_POINTS};
use crate::error::SpaceError;
use crate::object::soft_body::SoftCollider;
use crate::object::{AreaSpaceOverride, BodyMode, Medium, ObjectArena, ObjectId};
use crate::{profile_zone, profiling};
use glam::Vec3;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{error, trace};

impl Space {
    /// Advance the simulation by `dt` seconds
    pub fn step(&mut self, objects: &mut ObjectArena, dt: f32) -> Result<(), SpaceError> {
        profile_zone!("Space::step");
        if !(dt.is_finite() && dt > 0.0) {
            error!(space = ?self.id(), dt, "Step duration must be positive");
            return Err(SpaceError::InvalidParameterValue {
                name: "step",
                value: dt,
            });
        }

        self.lock()?;
        self.last_step = dt;
        let result = self.run_phases(objects, dt);
        self.unlock()?;
        result?;

        profiling::mark_step();
        trace!(
            space = ?self.id(),
            step = self.step_count,
            active = self.active_objects,
            islands = self.island_count,
            pairs = self.collision_pairs,
            "Step finished"
        );
        Ok(())
    }

    fn run_phases(&mut self, objects: &mut ObjectArena, dt: f32) -> Result<(), SpaceError> {
        self.setup(objects)?;

        let started = Instant::now();
        self.integrate_forces(objects, dt);
        self.set_elapsed_time(ElapsedTime::IntegrateForces, started.elapsed());

        let started = Instant::now();
        self.generate_islands(objects);
        self.set_elapsed_time(ElapsedTime::GenerateIslands, started.elapsed());

        let started = Instant::now();
        self.setup_constraints(objects, dt);
        self.set_elapsed_time(ElapsedTime::SetupConstraints, started.elapsed());

        let started = Instant::now();
        self.solve_constraints(objects, dt);
        self.set_elapsed_time(ElapsedTime::SolveConstraints, started.elapsed());

        let started = Instant::now();
        self.integrate_velocities(objects, dt);
        self.set_elapsed_time(ElapsedTime::IntegrateVelocities, started.elapsed());

        self.update(objects)
    }

    /// Start a step: reset the debug contact buffer and recompute pending
    /// mass properties. The space must be locked.
    pub fn setup(&mut self, objects: &mut ObjectArena) -> Result<(), SpaceError> {
        if !self.is_locked() {
            error!(space = ?self.id(), "setup requires the space lock");
            return Err(SpaceError::NotLocked);
        }
        profile_zone!("Space::setup");
        self.step_count += 1;
        self.debug_contact_count = 0;

        let mut ids = std::mem::take(&mut self.scratch.ids);
        ids.clear();
        self.lists[ListKind::InertiaUpdate as usize].collect_into(&mut ids);
        for &id in &ids {
            if let Some(object) = objects.get_mut(id) {
                object.update_mass_properties();
            }
            self.list_remove(objects, ListKind::InertiaUpdate, id);
        }
        self.scratch.ids = ids;
        Ok(())
    }

    /// Finish a step: let the broad phase report new and broken pairs.
    /// The space must be locked.
    pub fn update(&mut self, objects: &mut ObjectArena) -> Result<(), SpaceError> {
        if !self.is_locked() {
            error!(space = ?self.id(), "update requires the space lock");
            return Err(SpaceError::NotLocked);
        }
        profile_zone!("Space::update");
        let mut events = std::mem::take(&mut self.scratch.pair_events);
        events.clear();
        self.broad_phase.update(&mut events);
        self.process_pair_events(objects, &events);
        events.clear();
        self.scratch.pair_events = events;
        Ok(())
    }

    /// Medium acting on a body, combining the areas it is in by priority and
    /// falling back to the default area
    pub fn body_medium(&self, objects: &ObjectArena, id: ObjectId) -> Option<Medium> {
        let object = objects.get(id)?;
        let body = object.body()?;
        let point = object.transform().position;

        let mut medium = Medium::default();
        let mut stopped = false;
        for link in body.areas.iter().rev() {
            let Some(area_object) = objects.get(link.area) else {
                continue;
            };
            let Some(area) = area_object.as_area() else {
                continue;
            };
            match area.space_override {
                AreaSpaceOverride::Disabled => continue,
                AreaSpaceOverride::Combine | AreaSpaceOverride::CombineReplace => {
                    area.accumulate_medium(area_object.transform(), point, &mut medium);
                    stopped = area.space_override == AreaSpaceOverride::CombineReplace;
                }
                AreaSpaceOverride::Replace | AreaSpaceOverride::ReplaceCombine => {
                    medium = Medium::default();
                    area.accumulate_medium(area_object.transform(), point, &mut medium);
                    stopped = area.space_override == AreaSpaceOverride::Replace;
                }
            }
            if stopped {
                break;
            }
        }

        if !stopped {
            self.accumulate_default_medium(objects, point, &mut medium);
        }
        Some(medium)
    }

    fn accumulate_default_medium(&self, objects: &ObjectArena, point: Vec3, medium: &mut Medium) {
        let default_area = self
            .default_area()
            .and_then(|id| objects.get(id))
            .and_then(|object| object.as_area().map(|area| (object, area)));
        if let Some((object, area)) = default_area {
            area.accumulate_medium(object.transform(), point, medium);
        }
    }

    fn integrate_forces(&mut self, objects: &mut ObjectArena, dt: f32) {
        profile_zone!("integrate_forces");
        let mut ids = std::mem::take(&mut self.scratch.ids);
        ids.clear();
        self.lists[ListKind::ActiveBody as usize].collect_into(&mut ids);
        self.active_objects = ids.len();

        for &id in &ids {
            let Some(medium) = self.body_medium(objects, id) else {
                continue;
            };
            if let Some(body) = objects.get_mut(id).and_then(|object| object.body_mut()) {
                body.integrate_forces(dt, &medium);
            }
        }

        ids.clear();
        self.lists[ListKind::ActiveSoftBody as usize].collect_into(&mut ids);
        for &id in &ids {
            let Some(center) = objects
                .get(id)
                .and_then(|object| object.as_soft_body())
                .map(|soft_body| soft_body.aabb().center())
            else {
                continue;
            };
            let mut medium = Medium::default();
            self.accumulate_default_medium(objects, center, &mut medium);
            if let Some(soft_body) = objects.get_mut(id).and_then(|object| object.as_soft_body_mut()) {
                soft_body.integrate_forces(dt, medium.gravity, medium.linear_damp);
            }
        }
        self.scratch.ids = ids;
    }

    fn setup_constraints(&mut self, objects: &mut ObjectArena, dt: f32) {
        profile_zone!("setup_constraints");
        let inv_dt = 1.0 / dt;
        let islands = std::mem::take(&mut self.scratch.islands);
        let mut solvers = std::mem::take(&mut self.scratch.solvers);
        if solvers.len() < islands.len() {
            solvers.resize_with(islands.len(), IslandSolver::default);
        }

        for (island, solver) in islands.as_slice().iter().zip(solvers.iter_mut()) {
            solver.clear();
            for &id in &island.bodies {
                if let Some(object) = objects.get(id) {
                    solver.body_index(id, object);
                }
            }
            for key in &island.pairs {
                self.setup_body_pair(objects, key, solver);
            }
            solver.prepare(inv_dt, &self.params);
        }
        self.scratch.islands = islands;
        self.scratch.solvers = solvers;

        let area_pairs = std::mem::take(&mut self.scratch.area_pairs);
        for key in &area_pairs {
            self.update_area_pair(objects, key);
        }
        self.scratch.area_pairs = area_pairs;

        self.collect_soft_colliders(objects);
    }

    /// Refresh a body pair's contacts and add the penetrating ones to the solver
    fn setup_body_pair(&mut self, objects: &ObjectArena, key: &PairKey, solver: &mut IslandSolver) {
        let (Some(object_a), Some(object_b)) = (objects.get(key.a.object), objects.get(key.b.object))
        else {
            return;
        };
        let (Some(body_a), Some(body_b)) = (object_a.body(), object_b.body()) else {
            return;
        };
        let excepted = !object_a.interacts_with(object_b)
            || body_a.has_exception(key.b.object)
            || body_b.has_exception(key.a.object);

        let mut manifold = ContactManifold::new();
        let touching = !excepted
            && match (
                object_a.placed_shape(key.a.subindex),
                object_b.placed_shape(key.b.subindex),
            ) {
                (Some(shape_a), Some(shape_b)) => narrow_phase::collide(
                    &shape_a,
                    &shape_b,
                    self.params.contact_max_separation,
                    &mut manifold,
                ),
                _ => false,
            };

        let recycle_radius_sq = self.params.contact_recycle_radius * self.params.contact_recycle_radius;
        let mut fresh = [CachedContact::default(); MAX_MANIFOLD_POINTS];
        {
            let Some(PairState::Body { contacts }) = self.pairs.get_mut(key).map(|pair| &mut pair.state)
            else {
                return;
            };
            if !touching {
                contacts.clear();
                return;
            }

            for (cached, point) in fresh.iter_mut().zip(manifold.as_slice()) {
                let local_a = object_a.transform().inverse_transform_point(point.point_a);
                let local_b = object_b.transform().inverse_transform_point(point.point_b);
                *cached = CachedContact {
                    local_a,
                    local_b,
                    ..Default::default()
                };
                let previous = contacts.iter().find(|previous| {
                    previous.local_a.distance_squared(local_a) < recycle_radius_sq
                        && previous.local_b.distance_squared(local_b) < recycle_radius_sq
                });
                if let Some(previous) = previous {
                    cached.normal_impulse = previous.normal_impulse;
                    cached.tangent_impulse = previous.tangent_impulse;
                }
            }
            contacts.clear();
            contacts.extend_from_slice(&fresh[..manifold.len()]);
        }

        let (Some(index_a), Some(index_b)) = (
            solver.body_index(key.a.object, object_a),
            solver.body_index(key.b.object, object_b),
        ) else {
            return;
        };
        let friction = body_a.friction.min(body_b.friction).abs();
        let bounce = (body_a.bounce + body_b.bounce).clamp(0.0, 1.0);
        let mut constraint = ContactConstraint::new(*key, index_a, index_b, friction, bounce);

        for (i, point) in manifold.as_slice().iter().enumerate() {
            if self.is_debugging_contacts() {
                self.add_debug_contact(point.point_a);
                self.add_debug_contact(point.point_b);
            }
            // Contacts inside the separation band stay cached but are not solved
            if point.depth <= 0.0 {
                continue;
            }
            constraint.push(SolverContact::new(
                point.point_a,
                point.point_b,
                &solver.bodies[index_a],
                &solver.bodies[index_b],
                point.normal,
                point.depth,
                &fresh[i],
                i,
            ));
        }
        if !constraint.is_empty() {
            solver.constraints.push(constraint);
        }
    }

    /// Give every active soft body the body shapes it currently overlaps
    fn collect_soft_colliders(&mut self, objects: &mut ObjectArena) {
        let mut ids = std::mem::take(&mut self.scratch.ids);
        ids.clear();
        self.lists[ListKind::ActiveSoftBody as usize].collect_into(&mut ids);

        for &id in &ids {
            let mut colliders = match objects.get_mut(id).and_then(|object| object.as_soft_body_mut()) {
                Some(soft_body) => std::mem::take(&mut soft_body.colliders),
                None => continue,
            };
            colliders.clear();

            if let Some(object) = objects.get(id) {
                for key in &object.constraints {
                    if !matches!(self.pairs.get(key).map(|pair| &pair.state), Some(PairState::BodySoft)) {
                        continue;
                    }
                    let body = key.a;
                    let Some(body_object) = objects.get(body.object) else {
                        continue;
                    };
                    let (Some(instance), Some(transform)) = (
                        body_object.shape(body.subindex).filter(|instance| !instance.disabled),
                        body_object.shape_world_transform(body.subindex),
                    ) else {
                        continue;
                    };
                    colliders.push(SoftCollider {
                        shape: instance.shape,
                        transform,
                    });
                }
            }

            if let Some(soft_body) = objects.get_mut(id).and_then(|object| object.as_soft_body_mut()) {
                soft_body.colliders = colliders;
            }
        }
        self.scratch.ids = ids;
    }

    fn solve_constraints(&mut self, objects: &mut ObjectArena, dt: f32) {
        profile_zone!("solve_constraints");
        let count = self.scratch.islands.len();
        let iterations = self.solver_iterations();
        self.scratch.solvers[..count]
            .par_iter_mut()
            .for_each(|solver| solver.solve(iterations));

        let mut ids = std::mem::take(&mut self.scratch.ids);
        ids.clear();
        self.lists[ListKind::ActiveSoftBody as usize].collect_into(&mut ids);
        for &id in &ids {
            if let Some(soft_body) = objects.get_mut(id).and_then(|object| object.as_soft_body_mut()) {
                soft_body.solve(dt);
            }
        }
        self.scratch.ids = ids;
    }

    fn integrate_velocities(&mut self, objects: &mut ObjectArena, dt: f32) {
        profile_zone!("integrate_velocities");
        let islands = std::mem::take(&mut self.scratch.islands);
        let solvers = std::mem::take(&mut self.scratch.solvers);
        let params = self.params;

        for (island, solver) in islands.as_slice().iter().zip(&solvers) {
            self.write_back(objects, solver);

            for &id in &island.bodies {
                let Some(object) = objects.get_mut(id) else {
                    continue;
                };
                let moved = object.integrate_body_velocities(dt);
                let report = object.body().is_some_and(|body| body.report_state);
                if moved {
                    self.update_proxies(objects, id);
                    if report {
                        self.list_add(objects, ListKind::StateQuery, id);
                    }
                }
            }

            // An island sleeps only when every dynamic body in it may sleep
            let mut can_sleep = true;
            for &id in &island.bodies {
                if let Some(body) = objects.get_mut(id).and_then(|object| object.body_mut()) {
                    if body.mode() == BodyMode::Rigid && !body.sleep_test(dt, &params) {
                        can_sleep = false;
                    }
                }
            }
            for &id in &island.bodies {
                let Some(body) = objects.get(id).and_then(|object| object.body()) else {
                    continue;
                };
                if body.mode() != BodyMode::Rigid {
                    continue;
                }
                if can_sleep && !body.is_sleeping() {
                    self.deactivate_body(objects, id);
                } else if !can_sleep && body.is_sleeping() {
                    self.activate_body(objects, id);
                }
            }
        }
        self.scratch.islands = islands;
        self.scratch.solvers = solvers;

        let mut ids = std::mem::take(&mut self.scratch.ids);
        ids.clear();
        self.lists[ListKind::ActiveSoftBody as usize].collect_into(&mut ids);
        for &id in &ids {
            if let Some(soft_body) = objects.get_mut(id).and_then(|object| object.as_soft_body_mut()) {
                soft_body.integrate_velocities(dt);
            }
            self.update_proxies(objects, id);
        }
        self.scratch.ids = ids;
    }

    /// Copy solved velocities back to the bodies and impulses into the contact caches
    fn write_back(&mut self, objects: &mut ObjectArena, solver: &IslandSolver) {
        for solved in solver.bodies.iter().filter(|solved| solved.dynamic) {
            if let Some(body) = objects.get_mut(solved.id).and_then(|object| object.body_mut()) {
                body.linear_velocity = solved.linear_velocity;
                body.angular_velocity = solved.angular_velocity;
                body.biased_linear_velocity = solved.biased_linear_velocity;
                body.biased_angular_velocity = solved.biased_angular_velocity;
            }
        }

        for constraint in &solver.constraints {
            let Some(PairState::Body { contacts }) =
                self.pairs.get_mut(&constraint.key).map(|pair| &mut pair.state)
            else {
                continue;
            };
            for solved in constraint.contacts() {
                if let Some(cached) = contacts.get_mut(solved.cache_index) {
                    cached.normal_impulse = solved.normal_impulse;
                    cached.tangent_impulse = solved.friction_impulse();
                }
            }
        }
    }
}
