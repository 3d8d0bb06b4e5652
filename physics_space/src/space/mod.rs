//! The physics space: object registry, activity lists and the step pipeline
//!
//! A [`Space`] does not own collision objects. They live in an
//! [`ObjectArena`] and every operation that touches them takes the arena
//! explicitly. Mutations are rejected while the space is locked, which it is
//! for the duration of a step.

pub mod activity;
pub mod callbacks;
mod island;
pub mod pairs;
mod solver;
mod step;

use crate::collision::{BroadPhase, PairEvent, ProxyOwner, SweepAndPruneBroadPhase};
use crate::error::SpaceError;
use crate::math::Transform;
use crate::object::{
    Area, AreaSpaceOverride, BodyMode, CollisionObject, ObjectArena, ObjectId, ObjectKind,
    RigidBody, SpaceObject,
};
use crate::params::{SpaceConfig, SpaceParameter, SpaceParams};
use activity::{ActivityList, ListKind};
use callbacks::SpaceEvent;
use glam::Vec3;
use island::IslandBuffer;
use pairs::{Pair, PairKey};
use solver::IslandSolver;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

pub use callbacks::{BodyStateUpdate, MonitorEvent, SpaceObserver};

static NEXT_SPACE_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a space, recorded on every object registered with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(u32);

impl SpaceId {
    fn next() -> Self {
        Self(NEXT_SPACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Phases of a step whose wall-clock duration is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElapsedTime {
    IntegrateForces,
    GenerateIslands,
    SetupConstraints,
    SolveConstraints,
    IntegrateVelocities,
}

impl ElapsedTime {
    pub const COUNT: usize = 5;

    pub const ALL: [ElapsedTime; ElapsedTime::COUNT] = [
        ElapsedTime::IntegrateForces,
        ElapsedTime::GenerateIslands,
        ElapsedTime::SetupConstraints,
        ElapsedTime::SolveConstraints,
        ElapsedTime::IntegrateVelocities,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ElapsedTime::IntegrateForces => "integrate_forces",
            ElapsedTime::GenerateIslands => "generate_islands",
            ElapsedTime::SetupConstraints => "setup_constraints",
            ElapsedTime::SolveConstraints => "solve_constraints",
            ElapsedTime::IntegrateVelocities => "integrate_velocities",
        }
    }
}

/// Buffers reused from step to step
#[derive(Debug, Default)]
pub(crate) struct StepScratch {
    pub ids: Vec<ObjectId>,
    pub stack: Vec<ObjectId>,
    pub pair_events: Vec<PairEvent>,
    pub islands: IslandBuffer,
    pub solvers: Vec<IslandSolver>,
    pub area_pairs: Vec<PairKey>,
    pub events: Vec<SpaceEvent>,
}

/// A simulation world
pub struct Space {
    id: SpaceId,
    registry: BTreeSet<ObjectId>,
    pub(crate) lists: [ActivityList; ListKind::COUNT],
    pub(crate) broad_phase: Box<dyn BroadPhase>,
    pub(crate) pairs: BTreeMap<PairKey, Pair>,
    pub(crate) params: SpaceParams,
    solver_iterations: u32,
    default_area: Option<ObjectId>,
    static_global_body: Option<ObjectId>,
    locked: bool,
    elapsed: [Duration; ElapsedTime::COUNT],
    debug_contacts: Vec<Vec3>,
    debug_contact_count: usize,
    pub(crate) island_count: usize,
    pub(crate) active_objects: usize,
    pub(crate) collision_pairs: usize,
    pub(crate) last_step: f32,
    pub(crate) step_count: u64,
    pub(crate) scratch: StepScratch,
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl Space {
    /// Empty space with default parameters and no default area (zero gravity)
    pub fn new() -> Self {
        Self::with_config(&SpaceConfig::default())
    }

    /// Empty space using the parameters and solver settings of `config`
    pub fn with_config(config: &SpaceConfig) -> Self {
        let space = Self {
            id: SpaceId::next(),
            registry: BTreeSet::new(),
            lists: ListKind::ALL.map(ActivityList::new),
            broad_phase: Box::new(SweepAndPruneBroadPhase::new()),
            pairs: BTreeMap::new(),
            params: config.params,
            solver_iterations: config.solver_iterations.max(1),
            default_area: None,
            static_global_body: None,
            locked: false,
            elapsed: [Duration::ZERO; ElapsedTime::COUNT],
            debug_contacts: Vec::new(),
            debug_contact_count: 0,
            island_count: 0,
            active_objects: 0,
            collision_pairs: 0,
            last_step: 0.001,
            step_count: 0,
            scratch: StepScratch::default(),
        };
        debug!(space = ?space.id, "Space created");
        space
    }

    /// Space with a default area carrying the configured gravity and damping,
    /// and a static global body for anchoring joints
    pub fn with_defaults(objects: &mut ObjectArena, config: &SpaceConfig) -> Result<Self, SpaceError> {
        let mut space = Self::with_config(config);

        let mut area = Area::with_medium(config.gravity, config.linear_damp, config.angular_damp);
        area.space_override = AreaSpaceOverride::Combine;
        area.monitorable = false;
        let default_area = objects.insert(CollisionObject::area(area));
        space.add_object(objects, default_area)?;
        space.default_area = Some(default_area);

        let static_body = objects.insert(CollisionObject::rigid_body(RigidBody::new_static()));
        space.add_object(objects, static_body)?;
        space.static_global_body = Some(static_body);

        info!(space = ?space.id, gravity = ?config.gravity, "Space created with defaults");
        Ok(space)
    }

    /// Replace the broad phase. Only allowed while the space is empty.
    pub fn with_broad_phase(mut self, broad_phase: Box<dyn BroadPhase>) -> Self {
        if self.registry.is_empty() {
            self.broad_phase = broad_phase;
        } else {
            error!(space = ?self.id, "Broad phase can only be replaced on an empty space");
        }
        self
    }

    pub fn id(&self) -> SpaceId {
        self.id
    }

    fn ensure_unlocked(&self, operation: &'static str) -> Result<(), SpaceError> {
        if self.locked {
            error!(space = ?self.id, operation, "Space is locked");
            return Err(SpaceError::Locked);
        }
        Ok(())
    }

    fn ensure_registered(&self, id: ObjectId) -> Result<(), SpaceError> {
        if !self.registry.contains(&id) {
            error!(space = ?self.id, object = ?id, "Object is not registered with this space");
            return Err(SpaceError::NotRegistered(id));
        }
        Ok(())
    }

    // Registry

    /// Register an object. Creates its broad phase proxies and puts it on the
    /// lists its kind starts in.
    pub fn add_object(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<(), SpaceError> {
        self.ensure_unlocked("add_object")?;
        let object = objects.get_mut(id).ok_or(SpaceError::UnknownObject(id))?;
        if self.registry.contains(&id) || object.space.is_some() {
            error!(space = ?self.id, object = ?id, "Object is already registered");
            return Err(SpaceError::AlreadyRegistered(id));
        }
        object.space = Some(self.id);
        let kind = object.kind().name();
        self.registry.insert(id);
        self.create_proxies(objects, id);

        let initial_lists: &[ListKind] = match objects.get(id).map(|object| object.kind()) {
            Some(ObjectKind::RigidBody(body)) if body.is_active() => {
                &[ListKind::InertiaUpdate, ListKind::ActiveBody]
            }
            Some(ObjectKind::RigidBody(_)) => &[ListKind::InertiaUpdate],
            Some(ObjectKind::Area(_)) => &[ListKind::AreaMoved],
            Some(ObjectKind::SoftBody(_)) => &[ListKind::ActiveSoftBody],
            None => &[],
        };
        for &list in initial_lists {
            self.list_add(objects, list, id);
        }

        debug!(space = ?self.id, object = ?id, kind, "Object added to space");
        Ok(())
    }

    /// Unregister an object, dropping its proxies, pairs and list memberships
    pub fn remove_object(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<(), SpaceError> {
        self.ensure_unlocked("remove_object")?;
        self.ensure_registered(id)?;
        if Some(id) == self.default_area || Some(id) == self.static_global_body {
            error!(space = ?self.id, object = ?id, "Cannot remove the default area or static global body");
            return Err(SpaceError::ProtectedObject(id));
        }
        self.detach(objects, id);
        debug!(space = ?self.id, object = ?id, "Object removed from space");
        Ok(())
    }

    fn detach(&mut self, objects: &mut ObjectArena, id: ObjectId) {
        self.remove_proxies(objects, id);
        for list in ListKind::ALL {
            self.list_remove(objects, list, id);
        }
        self.registry.remove(&id);
        if let Some(object) = objects.get_mut(id) {
            object.space = None;
            object.constraints.clear();
        }
    }

    /// Unregister every object, the default area and static global body included
    pub fn clear(&mut self, objects: &mut ObjectArena) -> Result<(), SpaceError> {
        self.ensure_unlocked("clear")?;
        let ids: Vec<ObjectId> = self.registry.iter().copied().collect();
        for id in ids {
            self.detach(objects, id);
        }
        self.default_area = None;
        self.static_global_body = None;
        debug!(space = ?self.id, "Space cleared");
        Ok(())
    }

    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.registry.contains(&id)
    }

    /// Registered objects in id order
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.registry.iter().copied()
    }

    pub fn object_count(&self) -> usize {
        self.registry.len()
    }

    pub fn default_area(&self) -> Option<ObjectId> {
        self.default_area
    }

    /// Use a registered area as the default medium
    pub fn set_default_area(&mut self, objects: &ObjectArena, area: Option<ObjectId>) -> Result<(), SpaceError> {
        self.ensure_unlocked("set_default_area")?;
        if let Some(id) = area {
            self.ensure_registered(id)?;
            if !objects.get(id).is_some_and(|object| object.is_area()) {
                return Err(SpaceError::WrongObjectKind { id, expected: "area" });
            }
        }
        self.default_area = area;
        Ok(())
    }

    pub fn static_global_body(&self) -> Option<ObjectId> {
        self.static_global_body
    }

    pub fn set_static_global_body(
        &mut self,
        objects: &ObjectArena,
        body: Option<ObjectId>,
    ) -> Result<(), SpaceError> {
        self.ensure_unlocked("set_static_global_body")?;
        if let Some(id) = body {
            self.ensure_registered(id)?;
            if objects.get(id).and_then(|object| object.body()).is_none() {
                return Err(SpaceError::WrongObjectKind { id, expected: "rigid body" });
            }
        }
        self.static_global_body = body;
        Ok(())
    }

    // Proxies

    fn create_proxies(&mut self, objects: &mut ObjectArena, id: ObjectId) {
        let Some(object) = objects.get(id) else {
            return;
        };
        let is_static = object.is_static();
        let proxies: Vec<(usize, usize)> = object
            .proxy_subindices()
            .into_iter()
            .map(|subindex| {
                let aabb = object.proxy_aabb(subindex);
                let proxy = self
                    .broad_phase
                    .create(ProxyOwner::new(id, subindex), aabb, is_static);
                (subindex, proxy)
            })
            .collect();
        if let Some(object) = objects.get_mut(id) {
            object.proxies = proxies;
        }
    }

    fn remove_proxies(&mut self, objects: &mut ObjectArena, id: ObjectId) {
        let Some(object) = objects.get_mut(id) else {
            return;
        };
        let proxies = std::mem::take(&mut object.proxies);
        let mut events = std::mem::take(&mut self.scratch.pair_events);
        events.clear();
        for (_, proxy) in proxies {
            self.broad_phase.remove(proxy, &mut events);
        }
        self.process_pair_events(objects, &events);
        events.clear();
        self.scratch.pair_events = events;
    }

    /// Push an object's current bounds to the broad phase
    pub(crate) fn update_proxies(&mut self, objects: &ObjectArena, id: ObjectId) {
        let Some(object) = objects.get(id) else {
            return;
        };
        for &(subindex, proxy) in &object.proxies {
            self.broad_phase.move_proxy(proxy, object.proxy_aabb(subindex));
        }
    }

    /// Move a registered object. Bodies wake up and areas re-test their overlaps.
    pub fn set_object_transform(
        &mut self,
        objects: &mut ObjectArena,
        id: ObjectId,
        transform: Transform,
    ) -> Result<(), SpaceError> {
        self.ensure_unlocked("set_object_transform")?;
        self.ensure_registered(id)?;
        let object = objects.get_mut(id).ok_or(SpaceError::UnknownObject(id))?;
        object.set_transform(transform);
        let is_area = object.is_area();
        let is_body = object.body().is_some();

        self.update_proxies(objects, id);
        if is_area {
            self.list_add(objects, ListKind::AreaMoved, id);
        } else if is_body {
            self.activate_body(objects, id);
        }
        Ok(())
    }

    /// Rebuild proxies after the object's shape list was edited
    pub fn update_object_shapes(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<(), SpaceError> {
        self.ensure_unlocked("update_object_shapes")?;
        self.ensure_registered(id)?;
        self.remove_proxies(objects, id);
        self.create_proxies(objects, id);

        let Some(object) = objects.get(id) else {
            return Err(SpaceError::UnknownObject(id));
        };
        if object.body().is_some() {
            self.list_add(objects, ListKind::InertiaUpdate, id);
            self.activate_body(objects, id);
        } else if object.is_area() {
            self.list_add(objects, ListKind::AreaMoved, id);
        }
        debug!(space = ?self.id, object = ?id, "Object shapes updated");
        Ok(())
    }

    /// Switch a registered body between static, kinematic and rigid
    pub fn body_set_mode(&mut self, objects: &mut ObjectArena, id: ObjectId, mode: BodyMode) -> Result<(), SpaceError> {
        self.ensure_unlocked("body_set_mode")?;
        self.ensure_registered(id)?;
        let body = objects
            .get_mut(id)
            .and_then(|object| object.body_mut())
            .ok_or(SpaceError::WrongObjectKind { id, expected: "rigid body" })?;
        body.set_mode(mode);

        if let Some(object) = objects.get(id) {
            let is_static = object.is_static();
            for &(_, proxy) in &object.proxies {
                self.broad_phase.set_static(proxy, is_static);
            }
        }
        self.list_add(objects, ListKind::InertiaUpdate, id);
        if mode == BodyMode::Static {
            self.list_remove(objects, ListKind::ActiveBody, id);
        } else {
            self.activate_body(objects, id);
        }
        Ok(())
    }

    // Activity lists

    pub fn list(&self, kind: ListKind) -> &ActivityList {
        &self.lists[kind as usize]
    }

    pub(crate) fn list_add(&mut self, objects: &mut ObjectArena, kind: ListKind, id: ObjectId) -> bool {
        match objects.get_mut(id) {
            Some(object) => self.lists[kind as usize].add(id, &mut object.lists),
            None => false,
        }
    }

    pub(crate) fn list_remove(&mut self, objects: &mut ObjectArena, kind: ListKind, id: ObjectId) -> bool {
        match objects.get_mut(id) {
            Some(object) => self.lists[kind as usize].remove(&mut object.lists),
            None => false,
        }
    }

    fn check_list_member(&self, objects: &ObjectArena, kind: ListKind, id: ObjectId) -> Result<(), SpaceError> {
        self.ensure_registered(id)?;
        let object = objects.get(id).ok_or(SpaceError::UnknownObject(id))?;
        let (matches, expected) = match kind {
            ListKind::ActiveBody | ListKind::InertiaUpdate | ListKind::StateQuery => {
                (object.body().is_some(), "rigid body")
            }
            ListKind::MonitorQuery | ListKind::AreaMoved => (object.is_area(), "area"),
            ListKind::ActiveSoftBody => (object.is_soft_body(), "soft body"),
        };
        if !matches {
            error!(space = ?self.id, object = ?id, list = ?kind, "Object kind does not belong on this list");
            return Err(SpaceError::WrongObjectKind { id, expected });
        }
        Ok(())
    }

    /// Add a registered object to a list. Returns false if it was already a member.
    pub fn add_to_list(&mut self, objects: &mut ObjectArena, kind: ListKind, id: ObjectId) -> Result<bool, SpaceError> {
        self.ensure_unlocked("add_to_list")?;
        self.check_list_member(objects, kind, id)?;
        Ok(self.list_add(objects, kind, id))
    }

    /// Remove a registered object from a list. Returns false if it was not a member.
    pub fn remove_from_list(
        &mut self,
        objects: &mut ObjectArena,
        kind: ListKind,
        id: ObjectId,
    ) -> Result<bool, SpaceError> {
        self.ensure_unlocked("remove_from_list")?;
        self.check_list_member(objects, kind, id)?;
        Ok(self.list_remove(objects, kind, id))
    }

    pub fn body_add_to_active_list(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<bool, SpaceError> {
        self.add_to_list(objects, ListKind::ActiveBody, id)
    }

    pub fn body_remove_from_active_list(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<bool, SpaceError> {
        self.remove_from_list(objects, ListKind::ActiveBody, id)
    }

    pub fn body_add_to_inertia_update_list(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<bool, SpaceError> {
        self.add_to_list(objects, ListKind::InertiaUpdate, id)
    }

    pub fn body_remove_from_inertia_update_list(
        &mut self,
        objects: &mut ObjectArena,
        id: ObjectId,
    ) -> Result<bool, SpaceError> {
        self.remove_from_list(objects, ListKind::InertiaUpdate, id)
    }

    pub fn body_add_to_state_query_list(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<bool, SpaceError> {
        self.add_to_list(objects, ListKind::StateQuery, id)
    }

    pub fn body_remove_from_state_query_list(
        &mut self,
        objects: &mut ObjectArena,
        id: ObjectId,
    ) -> Result<bool, SpaceError> {
        self.remove_from_list(objects, ListKind::StateQuery, id)
    }

    pub fn area_add_to_monitor_query_list(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<bool, SpaceError> {
        self.add_to_list(objects, ListKind::MonitorQuery, id)
    }

    pub fn area_remove_from_monitor_query_list(
        &mut self,
        objects: &mut ObjectArena,
        id: ObjectId,
    ) -> Result<bool, SpaceError> {
        self.remove_from_list(objects, ListKind::MonitorQuery, id)
    }

    pub fn area_add_to_moved_list(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<bool, SpaceError> {
        self.add_to_list(objects, ListKind::AreaMoved, id)
    }

    pub fn area_remove_from_moved_list(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<bool, SpaceError> {
        self.remove_from_list(objects, ListKind::AreaMoved, id)
    }

    pub fn soft_body_add_to_active_list(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<bool, SpaceError> {
        self.add_to_list(objects, ListKind::ActiveSoftBody, id)
    }

    pub fn soft_body_remove_from_active_list(
        &mut self,
        objects: &mut ObjectArena,
        id: ObjectId,
    ) -> Result<bool, SpaceError> {
        self.remove_from_list(objects, ListKind::ActiveSoftBody, id)
    }

    // Sleeping

    /// Wake a body and put it on the active list
    pub(crate) fn activate_body(&mut self, objects: &mut ObjectArena, id: ObjectId) {
        let Some(body) = objects.get_mut(id).and_then(|object| object.body_mut()) else {
            return;
        };
        if body.mode() == BodyMode::Static {
            return;
        }
        let was_sleeping = body.is_sleeping();
        if was_sleeping {
            body.set_sleeping(false);
        }
        let report = body.report_state;
        self.list_add(objects, ListKind::ActiveBody, id);
        if was_sleeping && report {
            self.list_add(objects, ListKind::StateQuery, id);
        }
    }

    /// Put a body to sleep and take it off the active list
    pub(crate) fn deactivate_body(&mut self, objects: &mut ObjectArena, id: ObjectId) {
        let Some(body) = objects.get_mut(id).and_then(|object| object.body_mut()) else {
            return;
        };
        body.set_sleeping(true);
        let report = body.report_state;
        self.list_remove(objects, ListKind::ActiveBody, id);
        if report {
            self.list_add(objects, ListKind::StateQuery, id);
        }
    }

    fn registered_body_mut<'a>(
        &self,
        objects: &'a mut ObjectArena,
        id: ObjectId,
    ) -> Result<&'a mut RigidBody, SpaceError> {
        self.ensure_registered(id)?;
        objects
            .get_mut(id)
            .and_then(|object| object.body_mut())
            .ok_or(SpaceError::WrongObjectKind { id, expected: "rigid body" })
    }

    pub fn wake_body(&mut self, objects: &mut ObjectArena, id: ObjectId) -> Result<(), SpaceError> {
        self.ensure_unlocked("wake_body")?;
        self.registered_body_mut(objects, id)?;
        self.activate_body(objects, id);
        Ok(())
    }

    /// Apply an impulse through the center of mass and wake the body
    pub fn body_apply_central_impulse(
        &mut self,
        objects: &mut ObjectArena,
        id: ObjectId,
        impulse: Vec3,
    ) -> Result<(), SpaceError> {
        self.ensure_unlocked("body_apply_central_impulse")?;
        self.registered_body_mut(objects, id)?;
        self.activate_body(objects, id);
        self.registered_body_mut(objects, id)?.apply_central_impulse(impulse);
        Ok(())
    }

    /// Apply an impulse at `offset` from the body origin and wake the body
    pub fn body_apply_impulse(
        &mut self,
        objects: &mut ObjectArena,
        id: ObjectId,
        impulse: Vec3,
        offset: Vec3,
    ) -> Result<(), SpaceError> {
        self.ensure_unlocked("body_apply_impulse")?;
        self.registered_body_mut(objects, id)?;
        self.activate_body(objects, id);
        self.registered_body_mut(objects, id)?.apply_impulse(impulse, offset);
        Ok(())
    }

    pub fn body_set_linear_velocity(
        &mut self,
        objects: &mut ObjectArena,
        id: ObjectId,
        velocity: Vec3,
    ) -> Result<(), SpaceError> {
        self.ensure_unlocked("body_set_linear_velocity")?;
        self.registered_body_mut(objects, id)?;
        self.activate_body(objects, id);
        self.registered_body_mut(objects, id)?.linear_velocity = velocity;
        Ok(())
    }

    // Locking

    pub fn lock(&mut self) -> Result<(), SpaceError> {
        if self.locked {
            error!(space = ?self.id, "Space is already locked");
            return Err(SpaceError::AlreadyLocked);
        }
        self.locked = true;
        Ok(())
    }

    pub fn unlock(&mut self) -> Result<(), SpaceError> {
        if !self.locked {
            error!(space = ?self.id, "Space is not locked");
            return Err(SpaceError::NotLocked);
        }
        self.locked = false;
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    // Parameters

    /// Change a space parameter. Not allowed while the space is locked.
    pub fn set_param(&mut self, param: SpaceParameter, value: f32) -> Result<(), SpaceError> {
        self.ensure_unlocked("set_param")?;
        self.params.set(param, value)
    }

    pub fn get_param(&self, param: SpaceParameter) -> f32 {
        self.params.get(param)
    }

    pub fn params(&self) -> &SpaceParams {
        &self.params
    }

    pub fn solver_iterations(&self) -> u32 {
        self.solver_iterations
    }

    pub fn set_solver_iterations(&mut self, iterations: u32) {
        self.solver_iterations = iterations.max(1);
    }

    // Debug contacts

    /// Capture up to `max_contacts` contact points per step
    pub fn set_debug_contacts(&mut self, max_contacts: usize) {
        self.debug_contacts.resize(max_contacts, Vec3::ZERO);
        self.debug_contact_count = self.debug_contact_count.min(max_contacts);
    }

    pub fn is_debugging_contacts(&self) -> bool {
        !self.debug_contacts.is_empty()
    }

    /// Record a contact point; ignored once the buffer is full
    pub fn add_debug_contact(&mut self, point: Vec3) {
        if self.debug_contact_count < self.debug_contacts.len() {
            self.debug_contacts[self.debug_contact_count] = point;
            self.debug_contact_count += 1;
        }
    }

    pub fn debug_contacts(&self) -> &[Vec3] {
        &self.debug_contacts[..self.debug_contact_count]
    }

    pub fn debug_contact_count(&self) -> usize {
        self.debug_contact_count
    }

    /// Captured points as packed `x, y, z` floats, ready for a vertex buffer
    pub fn debug_contacts_flat(&self) -> &[f32] {
        bytemuck::cast_slice(self.debug_contacts())
    }

    // Statistics

    pub fn elapsed_time(&self, phase: ElapsedTime) -> Duration {
        self.elapsed[phase as usize]
    }

    pub(crate) fn set_elapsed_time(&mut self, phase: ElapsedTime, elapsed: Duration) {
        self.elapsed[phase as usize] = elapsed;
    }

    pub fn island_count(&self) -> usize {
        self.island_count
    }

    /// Active bodies at the last step
    pub fn active_objects(&self) -> usize {
        self.active_objects
    }

    pub fn collision_pairs(&self) -> usize {
        self.collision_pairs
    }

    /// Duration of the last step in seconds
    pub fn last_step(&self) -> f32 {
        self.last_step
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Number of proxies held by the broad phase
    pub fn proxy_count(&self) -> usize {
        self.broad_phase.proxy_count()
    }
}

impl Drop for Space {
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            debug!(
                space = ?self.id,
                objects = self.registry.len(),
                "Space dropped with registered objects"
            );
        }
    }
}
