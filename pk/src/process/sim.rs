//! SimulatedProcess - in-memory stand-in for an attached game process
//!
//! Keeps an actor table keyed by address and mimics the churn a real process
//! produces: actors move to new addresses, get hidden, and are copied into (and
//! destroyed with) the photo context.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::error::MemoryError;
use super::traits::{ActorBinder, ActorProperty, ActorTable, ActorView, ContextMonitor};
use crate::domain::{ActorAddress, ActorKind, ActorSnapshot, GameContext, IdentityKey};

/// First address handed out by the simulated allocator
const BASE_ADDRESS: usize = 0x1_4000_0000;

/// Distance between consecutive simulated allocations
const ADDRESS_STRIDE: usize = 0x2A0;

/// Capacity of the context and property change channels
const CHANNEL_CAPACITY: usize = 64;

/// Description of an actor to spawn into the simulated table
#[derive(Debug, Clone)]
pub struct SimActorSpec {
    pub name: String,
    pub kind: ActorKind,
    pub model_type: i32,
    pub state: Value,
}

impl SimActorSpec {
    /// Create a spec with an empty appearance/equipment state document
    pub fn new(name: impl Into<String>, kind: ActorKind) -> Self {
        let name = name.into();
        debug!(%name, %kind, "SimActorSpec::new: called");
        Self {
            name,
            kind,
            model_type: 0,
            state: json!({ "appearance": {}, "equipment": {} }),
        }
    }

    pub fn with_model_type(mut self, model_type: i32) -> Self {
        self.model_type = model_type;
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SimActor {
    name: String,
    kind: ActorKind,
    model_type: i32,
    hidden: bool,
    photo: bool,
    refreshing: bool,
    /// Hidden by the process when its photo copy was staged
    hidden_for_photo: bool,
    state: Value,
}

impl SimActor {
    fn from_spec(spec: SimActorSpec) -> Self {
        Self {
            name: spec.name,
            kind: spec.kind,
            model_type: spec.model_type,
            hidden: false,
            photo: false,
            refreshing: false,
            hidden_for_photo: false,
            state: spec.state,
        }
    }

    fn identity(&self, address: ActorAddress) -> IdentityKey {
        IdentityKey::from_parts(&self.name, self.kind, self.model_type, address)
    }
}

/// Internal state protected by lock
struct SimState {
    attached: bool,
    context: GameContext,
    actors: BTreeMap<ActorAddress, SimActor>,
    next_address: usize,
}

impl SimState {
    fn allocate(&mut self) -> ActorAddress {
        let address = ActorAddress::new(self.next_address);
        self.next_address = self.next_address.saturating_add(ADDRESS_STRIDE);
        address
    }
}

/// In-memory target process implementing every collaborator trait
pub struct SimulatedProcess {
    state: RwLock<SimState>,
    context_tx: broadcast::Sender<GameContext>,
    views_bound: AtomicU64,
    self_ref: Weak<SimulatedProcess>,
}

impl SimulatedProcess {
    /// Create an attached process sitting in the overworld with an empty table
    pub fn new() -> Arc<Self> {
        debug!("SimulatedProcess::new: called");
        let (context_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Arc::new_cyclic(|self_ref| Self {
            state: RwLock::new(SimState {
                attached: true,
                context: GameContext::Overworld,
                actors: BTreeMap::new(),
                next_address: BASE_ADDRESS,
            }),
            context_tx,
            views_bound: AtomicU64::new(0),
            self_ref: self_ref.clone(),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, SimState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SimState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach or detach the simulated process
    pub fn set_attached(&self, attached: bool) {
        debug!(attached, "SimulatedProcess::set_attached: called");
        self.write().attached = attached;
    }

    /// Add an actor to the table and return its address
    pub fn spawn_actor(&self, spec: SimActorSpec) -> ActorAddress {
        debug!(name = %spec.name, "SimulatedProcess::spawn_actor: called");
        let mut state = self.write();
        let address = state.allocate();
        state.actors.insert(address, SimActor::from_spec(spec));
        info!(%address, "Spawned simulated actor");
        address
    }

    /// Remove an actor from the table (the object is freed)
    pub fn despawn(&self, address: ActorAddress) -> bool {
        debug!(%address, "SimulatedProcess::despawn: called");
        self.write().actors.remove(&address).is_some()
    }

    /// Free an actor and reallocate it at a new address
    pub fn relocate(&self, address: ActorAddress) -> Option<ActorAddress> {
        debug!(%address, "SimulatedProcess::relocate: called");
        let mut state = self.write();
        let actor = state.actors.remove(&address)?;
        let new_address = state.allocate();
        state.actors.insert(new_address, actor);
        debug!(%address, %new_address, "SimulatedProcess::relocate: moved");
        Some(new_address)
    }

    pub fn set_hidden(&self, address: ActorAddress, hidden: bool) -> bool {
        debug!(%address, hidden, "SimulatedProcess::set_hidden: called");
        self.update_actor(address, |actor| actor.hidden = hidden)
    }

    pub fn set_refreshing(&self, address: ActorAddress, refreshing: bool) -> bool {
        debug!(%address, refreshing, "SimulatedProcess::set_refreshing: called");
        self.update_actor(address, |actor| actor.refreshing = refreshing)
    }

    pub fn rename(&self, address: ActorAddress, name: impl Into<String>) -> bool {
        let name = name.into();
        debug!(%address, %name, "SimulatedProcess::rename: called");
        self.update_actor(address, |actor| actor.name = name)
    }

    pub fn set_state(&self, address: ActorAddress, value: Value) -> bool {
        debug!(%address, "SimulatedProcess::set_state: called");
        self.update_actor(address, |actor| actor.state = value)
    }

    /// Current state document of an actor
    pub fn state_of(&self, address: ActorAddress) -> Option<Value> {
        self.read().actors.get(&address).map(|actor| actor.state.clone())
    }

    /// Number of views constructed through [`ActorBinder::bind`]
    pub fn views_bound(&self) -> u64 {
        self.views_bound.load(Ordering::SeqCst)
    }

    /// Switch to the photo context and notify subscribers
    ///
    /// Photo copies are not created until [`stage_photo_copies`](Self::stage_photo_copies).
    pub fn enter_photo(&self) {
        debug!("SimulatedProcess::enter_photo: called");
        self.set_context(GameContext::Photo);
    }

    /// Copy every visible overworld actor into the photo context, hiding the original
    ///
    /// Returns (original, copy) address pairs.
    pub fn stage_photo_copies(&self) -> Vec<(ActorAddress, ActorAddress)> {
        debug!("SimulatedProcess::stage_photo_copies: called");
        let mut state = self.write();
        let originals: Vec<(ActorAddress, SimActor)> = state
            .actors
            .iter()
            .filter(|(_, actor)| !actor.photo && !actor.hidden)
            .map(|(address, actor)| (*address, actor.clone()))
            .collect();

        let mut pairs = Vec::with_capacity(originals.len());
        for (address, original) in originals {
            if let Some(actor) = state.actors.get_mut(&address) {
                actor.hidden = true;
                actor.hidden_for_photo = true;
            }
            let copy_address = state.allocate();
            let copy = SimActor {
                photo: true,
                hidden: false,
                hidden_for_photo: false,
                refreshing: false,
                ..original
            };
            state.actors.insert(copy_address, copy);
            pairs.push((address, copy_address));
        }
        info!(count = pairs.len(), "Staged photo copies");
        pairs
    }

    /// Destroy every photo actor, reveal the originals and return to the overworld
    pub fn leave_photo(&self) {
        debug!("SimulatedProcess::leave_photo: called");
        {
            let mut state = self.write();
            state.actors.retain(|_, actor| !actor.photo);
            for actor in state.actors.values_mut() {
                if actor.hidden_for_photo {
                    actor.hidden = false;
                    actor.hidden_for_photo = false;
                }
            }
        }
        self.set_context(GameContext::Overworld);
    }

    /// Switch context and notify subscribers without touching any actor
    pub fn set_context(&self, context: GameContext) {
        {
            let mut state = self.write();
            if state.context == context {
                debug!(%context, "SimulatedProcess::set_context: unchanged");
                return;
            }
            state.context = context;
        }
        info!(%context, "Simulated process context changed");
        // No subscribers is fine
        let _ = self.context_tx.send(context);
    }

    fn update_actor(&self, address: ActorAddress, f: impl FnOnce(&mut SimActor)) -> bool {
        match self.write().actors.get_mut(&address) {
            Some(actor) => {
                f(actor);
                true
            }
            None => {
                debug!(%address, "SimulatedProcess::update_actor: no such actor");
                false
            }
        }
    }

    fn live_actor(&self, address: ActorAddress) -> Result<SimActor, MemoryError> {
        let state = self.read();
        if !state.attached {
            return Err(MemoryError::Detached);
        }
        state
            .actors
            .get(&address)
            .cloned()
            .ok_or(MemoryError::Unreadable(address))
    }
}

impl ActorTable for SimulatedProcess {
    fn all_actors(&self) -> Vec<ActorSnapshot> {
        let state = self.read();
        if !state.attached {
            return Vec::new();
        }
        state
            .actors
            .iter()
            .map(|(address, actor)| ActorSnapshot {
                address: *address,
                identity: actor.identity(*address),
                is_hidden: actor.hidden,
                is_photo_actor: actor.photo,
            })
            .collect()
    }

    fn is_actor_in_table(&self, address: ActorAddress) -> bool {
        let state = self.read();
        state.attached && state.actors.contains_key(&address)
    }

    fn is_attached(&self) -> bool {
        self.read().attached
    }
}

impl ContextMonitor for SimulatedProcess {
    fn current(&self) -> GameContext {
        self.read().context
    }

    fn subscribe(&self) -> broadcast::Receiver<GameContext> {
        self.context_tx.subscribe()
    }
}

impl ActorBinder for SimulatedProcess {
    fn bind(&self, address: ActorAddress) -> Result<Arc<dyn ActorView>, MemoryError> {
        debug!(%address, "SimulatedProcess::bind: called");
        if address.is_null() {
            return Err(MemoryError::NullAddress);
        }
        let actor = self.live_actor(address)?;
        self.views_bound.fetch_add(1, Ordering::SeqCst);
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Ok(Arc::new(SimActorView {
            process: self.self_ref.clone(),
            address,
            cache: RwLock::new(actor),
            disposed: AtomicBool::new(false),
            changes,
        }))
    }
}

/// View of one simulated actor; caches fields between ticks
struct SimActorView {
    process: Weak<SimulatedProcess>,
    address: ActorAddress,
    cache: RwLock<SimActor>,
    disposed: AtomicBool,
    changes: broadcast::Sender<ActorProperty>,
}

impl SimActorView {
    fn cached(&self) -> RwLockReadGuard<'_, SimActor> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn process(&self) -> Result<Arc<SimulatedProcess>, MemoryError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(MemoryError::Disposed(self.address));
        }
        self.process.upgrade().ok_or(MemoryError::Detached)
    }

    fn notify(&self, property: ActorProperty) {
        let _ = self.changes.send(property);
    }
}

impl ActorView for SimActorView {
    fn address(&self) -> ActorAddress {
        self.address
    }

    fn identity(&self) -> IdentityKey {
        self.cached().identity(self.address)
    }

    fn name(&self) -> Option<String> {
        Some(self.cached().name.clone())
    }

    fn kind(&self) -> ActorKind {
        self.cached().kind
    }

    fn model_type(&self) -> i32 {
        self.cached().model_type
    }

    fn is_photo_actor(&self) -> bool {
        self.cached().photo
    }

    fn is_hidden(&self) -> bool {
        self.cached().hidden
    }

    fn is_refreshing(&self) -> bool {
        self.cached().refreshing
    }

    fn tick(&self) -> Result<(), MemoryError> {
        let live = self.process()?.live_actor(self.address)?;

        let mut changed = Vec::new();
        {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            if cache.name != live.name {
                changed.push(ActorProperty::Name);
                changed.push(ActorProperty::DisplayName);
            }
            if cache.kind != live.kind {
                changed.push(ActorProperty::Kind);
            }
            if cache.model_type != live.model_type {
                changed.push(ActorProperty::ModelType);
            }
            if cache.hidden != live.hidden {
                changed.push(ActorProperty::Hidden);
            }
            *cache = live;
        }

        for property in changed {
            self.notify(property);
        }
        Ok(())
    }

    fn read_state(&self) -> Result<Value, MemoryError> {
        Ok(self.process()?.live_actor(self.address)?.state)
    }

    fn write_state(&self, state: Value) -> Result<(), MemoryError> {
        let process = self.process()?;
        if !process.is_attached() {
            return Err(MemoryError::Detached);
        }
        if !process.set_state(self.address, state) {
            return Err(MemoryError::Unreadable(self.address));
        }
        self.notify(ActorProperty::State);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ActorProperty> {
        self.changes.subscribe()
    }

    fn dispose(&self) {
        debug!(address = %self.address, "SimActorView::dispose: called");
        self.disposed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(process: &SimulatedProcess, name: &str) -> ActorAddress {
        process.spawn_actor(SimActorSpec::new(name, ActorKind::Player))
    }

    #[test]
    fn test_spawn_and_enumerate() {
        let process = SimulatedProcess::new();
        let a = spawn(&process, "Jane Q. Public");
        let b = spawn(&process, "Al");

        assert_ne!(a, b);
        let actors = process.all_actors();
        assert_eq!(actors.len(), 2);
        assert!(process.is_actor_in_table(a));
        assert!(actors.iter().all(|actor| !actor.is_hidden && !actor.is_photo_actor));
    }

    #[test]
    fn test_detached_process_reports_nothing() {
        let process = SimulatedProcess::new();
        let a = spawn(&process, "Jane");
        process.set_attached(false);

        assert!(process.all_actors().is_empty());
        assert!(!process.is_actor_in_table(a));
        assert!(matches!(process.bind(a), Err(MemoryError::Detached)));
    }

    #[test]
    fn test_relocate_keeps_stable_key() {
        let process = SimulatedProcess::new();
        let a = spawn(&process, "Jane");
        let before = process.all_actors()[0].identity.clone();

        let b = process.relocate(a).unwrap();
        assert_ne!(a, b);
        assert!(!process.is_actor_in_table(a));

        let after = process.all_actors()[0].identity.clone();
        assert_eq!(before.stable_key, after.stable_key);
        assert_ne!(before.address_key, after.address_key);
    }

    #[test]
    fn test_bind_null_and_missing() {
        let process = SimulatedProcess::new();
        assert!(matches!(process.bind(ActorAddress::NULL), Err(MemoryError::NullAddress)));
        assert!(matches!(
            process.bind(ActorAddress::new(0x42)),
            Err(MemoryError::Unreadable(_))
        ));
        assert_eq!(process.views_bound(), 0);
    }

    #[test]
    fn test_view_tick_reports_changes() {
        let process = SimulatedProcess::new();
        let a = spawn(&process, "Jane");
        let view = process.bind(a).unwrap();
        let mut rx = view.subscribe();

        process.rename(a, "Janet");
        process.set_hidden(a, true);
        view.tick().unwrap();

        assert_eq!(view.name().as_deref(), Some("Janet"));
        assert!(view.is_hidden());
        let mut seen = Vec::new();
        while let Ok(property) = rx.try_recv() {
            seen.push(property);
        }
        assert!(seen.contains(&ActorProperty::DisplayName));
        assert!(seen.contains(&ActorProperty::Hidden));
    }

    #[test]
    fn test_view_tick_fails_after_despawn_and_dispose() {
        let process = SimulatedProcess::new();
        let a = spawn(&process, "Jane");
        let view = process.bind(a).unwrap();

        process.despawn(a);
        assert!(matches!(view.tick(), Err(MemoryError::Unreadable(_))));

        let b = spawn(&process, "Al");
        let view = process.bind(b).unwrap();
        view.dispose();
        assert!(matches!(view.tick(), Err(MemoryError::Disposed(_))));
        assert!(view.read_state().is_err());
    }

    #[test]
    fn test_state_round_trip_through_view() {
        let process = SimulatedProcess::new();
        let a = spawn(&process, "Jane");
        let view = process.bind(a).unwrap();

        view.write_state(json!({ "appearance": { "hair": 7 } })).unwrap();
        assert_eq!(process.state_of(a).unwrap()["appearance"]["hair"], 7);
        assert_eq!(view.read_state().unwrap()["appearance"]["hair"], 7);
    }

    #[tokio::test]
    async fn test_photo_lifecycle() {
        let process = SimulatedProcess::new();
        let a = spawn(&process, "Jane");
        let mut rx = process.subscribe();

        process.enter_photo();
        assert_eq!(rx.recv().await.unwrap(), GameContext::Photo);
        assert_eq!(process.current(), GameContext::Photo);

        let pairs = process.stage_photo_copies();
        assert_eq!(pairs.len(), 1);
        let (original, copy) = pairs[0];
        assert_eq!(original, a);

        let actors = process.all_actors();
        let original_snapshot = actors.iter().find(|s| s.address == a).unwrap();
        let copy_snapshot = actors.iter().find(|s| s.address == copy).unwrap();
        assert!(original_snapshot.is_hidden);
        assert!(copy_snapshot.is_photo_actor);
        assert_eq!(original_snapshot.identity.stable_key, copy_snapshot.identity.stable_key);

        process.leave_photo();
        assert_eq!(rx.recv().await.unwrap(), GameContext::Overworld);
        assert!(!process.is_actor_in_table(copy));
        let actors = process.all_actors();
        assert_eq!(actors.len(), 1);
        assert!(!actors[0].is_hidden);
    }

    #[test]
    fn test_entering_same_context_is_silent() {
        let process = SimulatedProcess::new();
        let mut rx = process.subscribe();
        process.leave_photo();
        assert!(rx.try_recv().is_err());
    }
}
