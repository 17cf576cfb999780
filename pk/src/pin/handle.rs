//! PinnedHandle - a stable reference to one logical actor across address churn

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::environment::PinEnvironment;
use super::state::{PinState, PinSummary, RetargetReason};
use crate::backup::{ActorBackup, ApplyMode, BackupCoordinator};
use crate::domain::{ActorAddress, ActorKind, GameContext, IdentityKey, PinId, derive_initials};
use crate::events::{PinEmitter, PinProperty};
use crate::process::{ActorProperty, ActorView};
use crate::target::PinError;

/// Internal state protected by lock
struct PinInner {
    state: PinState,

    /// Current binding; `None` while invalid
    memory: Option<Arc<dyn ActorView>>,

    /// Property-change subscription on `memory`
    changes: Option<broadcast::Receiver<ActorProperty>>,

    /// Identity of the last bound actor; the retarget target
    identity: IdentityKey,

    /// Bound address; cleared on invalidation
    pointer: Option<ActorAddress>,

    /// Most recent bound address, kept after the binding is lost
    last_address: Option<ActorAddress>,

    name: Option<String>,
    display_name: Option<String>,
    initials: Option<String>,
    kind: ActorKind,
    model_type: i32,
    is_photo_actor: bool,
    is_hidden: bool,

    /// Context as of the last look; an overworld to photo edge captures a backup
    last_context: GameContext,

    /// Listener capturing a backup on every photo-context entry
    context_task: Option<JoinHandle<()>>,
}

impl PinInner {
    fn unbound(identity: IdentityKey, context: GameContext) -> Self {
        Self {
            state: PinState::Invalid,
            memory: None,
            changes: None,
            identity,
            pointer: None,
            last_address: None,
            name: None,
            display_name: None,
            initials: None,
            kind: ActorKind::default(),
            model_type: 0,
            is_photo_actor: false,
            is_hidden: false,
            last_context: context,
            context_task: None,
        }
    }

    /// Human-readable description for log lines
    fn describe(&self) -> String {
        let name = self
            .display_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("<unnamed>");
        match self.pointer.or(self.last_address) {
            Some(address) => format!("{} ({})", name, address),
            None => name.to_string(),
        }
    }

    /// Re-read the display fields from `view`, returning what changed
    fn refresh_display(&mut self, view: &dyn ActorView) -> Vec<PinProperty> {
        let mut changed = Vec::new();

        let name = view.name();
        if name != self.name {
            self.name = name;
            changed.push(PinProperty::Name);
        }

        let display_name = view.display_name();
        if display_name != self.display_name {
            self.display_name = display_name;
            changed.push(PinProperty::DisplayName);
        }

        // Blank names keep the previous initials
        if let Some(initials) = self
            .display_name
            .as_deref()
            .or(self.name.as_deref())
            .and_then(derive_initials)
            && self.initials.as_ref() != Some(&initials)
        {
            self.initials = Some(initials);
            changed.push(PinProperty::Initials);
        }

        let kind = view.kind();
        if kind != self.kind {
            self.kind = kind;
            changed.push(PinProperty::Kind);
        }

        changed
    }

    /// Install `view` as the binding and copy every derived field from it
    fn apply_binding(&mut self, view: Arc<dyn ActorView>) -> Vec<PinProperty> {
        let mut changed = self.refresh_display(view.as_ref());

        let identity = view.identity();
        if identity != self.identity {
            self.identity = identity;
            changed.push(PinProperty::Identity);
        }

        let pointer = Some(view.address());
        if pointer != self.pointer {
            self.pointer = pointer;
            changed.push(PinProperty::Pointer);
        }
        self.last_address = pointer;

        let model_type = view.model_type();
        if model_type != self.model_type {
            self.model_type = model_type;
            changed.push(PinProperty::ModelType);
        }

        let is_photo_actor = view.is_photo_actor();
        if is_photo_actor != self.is_photo_actor {
            self.is_photo_actor = is_photo_actor;
            changed.push(PinProperty::PhotoActor);
        }

        let is_hidden = view.is_hidden();
        if is_hidden != self.is_hidden {
            self.is_hidden = is_hidden;
            changed.push(PinProperty::Hidden);
        }

        self.changes = Some(view.subscribe());
        self.memory = Some(view);
        self.state = PinState::Valid;
        changed
    }
}

/// Long-lived handle to one logical actor
///
/// Call [`tick`](Self::tick) periodically. Each tick either refreshes the
/// binding, or detects that it went stale and retargets through the resolver.
/// All mutation happens under one lock, so a handle never runs two ticks at
/// once and never holds two live bindings.
pub struct PinnedHandle {
    id: PinId,
    env: PinEnvironment,
    emitter: PinEmitter,
    backups: BackupCoordinator,
    inner: Mutex<PinInner>,
}

impl PinnedHandle {
    /// Pin the actor behind `memory`
    ///
    /// The handle starts valid, claims the actor's address, and begins
    /// capturing a backup on every photo-context entry. Fails without side
    /// effects if another pin already claims the address.
    pub async fn pin(env: PinEnvironment, memory: Arc<dyn ActorView>) -> Result<Arc<Self>, PinError> {
        let id = PinId::new();
        let address = memory.address();
        debug!(pin_id = %id, %address, "PinnedHandle::pin: called");

        if let Err(owner) = env.registry.claim(id, address).await {
            memory.dispose();
            return Err(PinError::AlreadyPinned { address, owner });
        }

        let emitter = env.events.emitter_for(id);
        let backups = BackupCoordinator::new(env.archive.clone(), emitter.clone());
        let mut seeded = PinInner::unbound(memory.identity(), env.context.current());
        // Seeding is not a change worth announcing
        seeded.apply_binding(memory);

        let handle = Arc::new(Self {
            id,
            env,
            emitter,
            backups,
            inner: Mutex::new(seeded),
        });

        {
            let mut inner = handle.inner.lock().await;
            inner.context_task = Some(handle.spawn_context_watch());
            info!(pin_id = %id, actor = %inner.describe(), "Pinned actor");
            handle.emitter.pinned(address, inner.name.clone());
        }

        Ok(handle)
    }

    /// Listen for context transitions and capture a backup on photo entry
    fn spawn_context_watch(self: &Arc<Self>) -> JoinHandle<()> {
        debug!(pin_id = %self.id, "PinnedHandle::spawn_context_watch: called");
        let mut rx = self.env.context.subscribe();
        let weak = Arc::downgrade(self);
        let pin_id = self.id;

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(context) => {
                        let Some(handle) = weak.upgrade() else {
                            break;
                        };
                        handle.on_context_changed(context).await;
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(%pin_id, skipped = n, "Context listener lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!(%pin_id, "PinnedHandle::spawn_context_watch: context channel closed");
                        break;
                    }
                }
            }
        })
    }

    async fn on_context_changed(&self, context: GameContext) {
        debug!(pin_id = %self.id, %context, "PinnedHandle::on_context_changed: called");
        let mut inner = self.inner.lock().await;
        self.observe_context(&mut inner).await;
    }

    /// Capture a backup if the process entered photo mode since the last look
    ///
    /// Runs under the handle lock from both the listener and `tick`, whichever
    /// sees the edge first, so the capture always reads the overworld binding.
    async fn observe_context(&self, inner: &mut PinInner) {
        let context = self.env.context.current();
        if context == inner.last_context {
            return;
        }
        let entered_photo = context.is_photo();
        inner.last_context = context;
        if !entered_photo {
            return;
        }

        debug!(pin_id = %self.id, actor = %inner.describe(), "PinnedHandle::observe_context: entered photo mode");
        let binding = match inner.state {
            PinState::Valid if !inner.is_photo_actor => inner.memory.clone(),
            _ => None,
        };
        self.backups.snapshot(binding).await;
    }

    pub fn id(&self) -> PinId {
        self.id
    }

    /// Run one validity check, retargeting if the binding went stale
    pub async fn tick(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        debug!(pin_id = %self.id, state = %inner.state, "PinnedHandle::tick: called");

        if inner.state == PinState::Retargeting {
            debug!(pin_id = %self.id, "PinnedHandle::tick: retarget in progress, skipping");
            return;
        }

        // Before the context rules below can move the binding to a photo copy
        self.observe_context(&mut inner).await;

        if inner.state == PinState::Invalid {
            self.retarget(&mut inner, RetargetReason::Invalid).await;
            return;
        }

        let Some(memory) = inner.memory.clone() else {
            debug!(pin_id = %self.id, "PinnedHandle::tick: no binding");
            return;
        };

        let address = memory.address();
        if address.is_null() {
            debug!(pin_id = %self.id, "PinnedHandle::tick: null address");
            return;
        }

        if !self.env.actors.is_actor_in_table(address) {
            info!(pin_id = %self.id, actor = %inner.describe(), "Actor was not in actor table");
            self.retarget(&mut inner, RetargetReason::MissingFromTable).await;
            return;
        }

        let context = self.env.context.current();

        if inner.is_photo_actor && context.is_overworld() {
            info!(pin_id = %self.id, actor = %inner.describe(), "Photo actor outside of photo mode");
            self.retarget(&mut inner, RetargetReason::LeftPhotoContext).await;
            return;
        }

        // The process hides an overworld actor when it stages its photo copy
        if memory.is_hidden()
            && !inner.is_hidden
            && !inner.is_photo_actor
            && !memory.is_refreshing()
            && context.is_photo()
        {
            info!(pin_id = %self.id, actor = %inner.describe(), "Overworld actor hidden on photo entry");
            self.retarget(&mut inner, RetargetReason::HiddenAtBoundary).await;
            return;
        }

        match memory.tick() {
            Ok(()) => self.apply_property_changes(&mut inner, memory.as_ref()),
            Err(e) => {
                warn!(pin_id = %self.id, actor = %inner.describe(), error = %e, "Failed to tick actor");
                self.set_invalid(&mut inner).await;
            }
        }
    }

    /// Forward property changes reported by the binding's last tick
    fn apply_property_changes(&self, inner: &mut PinInner, memory: &dyn ActorView) {
        let mut observed = Vec::new();
        let mut lagged = false;
        if let Some(changes) = inner.changes.as_mut() {
            loop {
                match changes.try_recv() {
                    Ok(property) => observed.push(property),
                    Err(TryRecvError::Lagged(_)) => lagged = true,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }

        let display_changed = lagged
            || observed.iter().any(|property| {
                matches!(
                    property,
                    ActorProperty::Name | ActorProperty::DisplayName | ActorProperty::Kind
                )
            });
        if !display_changed {
            return;
        }

        debug!(pin_id = %self.id, ?observed, lagged, "PinnedHandle::apply_property_changes: refreshing display fields");
        for property in inner.refresh_display(memory) {
            self.emitter.property_changed(property);
        }
    }

    /// Re-resolve the actor; on success the handle is valid with a fresh binding
    async fn retarget(self: &Arc<Self>, inner: &mut PinInner, reason: RetargetReason) {
        debug!(pin_id = %self.id, %reason, "PinnedHandle::retarget: called");

        if self.env.config.assume_valid_when_detached && !self.env.actors.is_attached() {
            debug!(pin_id = %self.id, "PinnedHandle::retarget: no process attached, assuming valid");
            inner.state = PinState::Valid;
            return;
        }

        let was_valid = inner.state == PinState::Valid;
        let had_binding = inner.memory.is_some();
        inner.state = PinState::Retargeting;
        inner.changes = None;

        // Claim before binding; a candidate taken by a concurrent retarget is skipped
        let mut actors = self.env.actors.all_actors();
        let resolution = loop {
            let claims = self.env.registry.claims().await;
            let Some(resolution) = self
                .env
                .resolver
                .resolve(self.id, &inner.identity, &actors, &claims)
            else {
                self.lose_binding(inner, reason, had_binding).await;
                return;
            };

            let address = resolution.snapshot.address;
            match self.env.registry.claim(self.id, address).await {
                Ok(()) => break resolution,
                Err(owner) => {
                    debug!(pin_id = %self.id, %address, %owner, "PinnedHandle::retarget: candidate already claimed");
                    actors.retain(|actor| actor.address != address);
                }
            }
        };

        let address = resolution.snapshot.address;
        if let Some(old) = inner.memory.take() {
            old.dispose();
        }

        let view = match self.env.binder.bind(address) {
            Ok(view) => view,
            Err(e) => {
                warn!(pin_id = %self.id, %address, error = %e, "Failed to bind resolved actor");
                self.env.registry.release(self.id).await;
                self.lose_binding(inner, reason, had_binding).await;
                return;
            }
        };

        let old_pointer = inner.pointer;
        let previous_address = inner.last_address;
        let was_photo_actor = inner.is_photo_actor;
        let mut changed = inner.apply_binding(view);
        if !was_valid {
            changed.push(PinProperty::Valid);
        }

        if let Some(old) = previous_address
            && old != address
        {
            info!(
                pin_id = %self.id,
                actor = %inner.describe(),
                from = %old,
                to = %address,
                match_kind = ?resolution.kind,
                "Retargeted actor"
            );
        }

        if self.env.registry.is_selected(self.id).await {
            self.env.registry.select(self.id).await;
        }

        for property in changed {
            self.emitter.property_changed(property);
        }
        self.emitter.retargeted(old_pointer, Some(address), reason);

        if reason.is_boundary() || was_photo_actor != inner.is_photo_actor {
            let handle = Arc::clone(self);
            let mode = self.env.config.restore_mode;
            debug!(pin_id = %self.id, ?mode, "PinnedHandle::retarget: crossed photo boundary, restoring backup");
            tokio::spawn(async move {
                handle.restore_backup(mode).await;
            });
        }
    }

    /// Resolver found nothing; drop the binding if there was one
    async fn lose_binding(&self, inner: &mut PinInner, reason: RetargetReason, had_binding: bool) {
        if had_binding {
            warn!(pin_id = %self.id, actor = %inner.describe(), %reason, "Lost actor");
            let old = inner.pointer;
            self.set_invalid(inner).await;
            self.emitter.retargeted(old, None, reason);
        } else {
            debug!(pin_id = %self.id, "PinnedHandle::lose_binding: still no candidate");
        }
        inner.state = PinState::Invalid;
    }

    /// Drop the binding, clear the address and release the claim
    async fn set_invalid(&self, inner: &mut PinInner) {
        debug!(pin_id = %self.id, "PinnedHandle::set_invalid: called");
        inner.changes = None;
        if let Some(memory) = inner.memory.take() {
            memory.dispose();
        }
        inner.state = PinState::Invalid;
        if inner.pointer.take().is_some() {
            self.emitter.property_changed(PinProperty::Pointer);
        }
        self.env.registry.release(self.id).await;

        if self.env.registry.is_selected(self.id).await {
            self.env.registry.select(self.id).await;
        }
        self.emitter.property_changed(PinProperty::Valid);
    }

    /// Tick, then return the binding (`None` if the actor is currently lost)
    pub async fn memory(self: &Arc<Self>) -> Option<Arc<dyn ActorView>> {
        debug!(pin_id = %self.id, "PinnedHandle::memory: called");
        self.tick().await;
        self.inner.lock().await.memory.clone()
    }

    /// Binding if the handle is valid
    async fn live_binding(&self) -> Option<Arc<dyn ActorView>> {
        let inner = self.inner.lock().await;
        match inner.state {
            PinState::Valid => inner.memory.clone(),
            _ => None,
        }
    }

    /// Capture the bound actor's full state, replacing any previous backup
    pub async fn create_backup(&self) -> bool {
        debug!(pin_id = %self.id, "PinnedHandle::create_backup: called");
        let binding = self.live_binding().await;
        self.backups.snapshot(binding).await
    }

    /// Write the stored backup onto the current binding
    pub async fn restore_backup(&self, mode: ApplyMode) -> bool {
        debug!(pin_id = %self.id, ?mode, "PinnedHandle::restore_backup: called");
        let binding = self.live_binding().await;
        self.backups.restore(binding, mode).await
    }

    /// Most recent backup
    pub async fn backup(&self) -> Option<ActorBackup> {
        self.backups.backup().await
    }

    pub fn backups(&self) -> &BackupCoordinator {
        &self.backups
    }

    pub async fn state(&self) -> PinState {
        self.inner.lock().await.state
    }

    pub async fn is_valid(&self) -> bool {
        self.inner.lock().await.state == PinState::Valid
    }

    pub async fn is_retargeting(&self) -> bool {
        self.inner.lock().await.state == PinState::Retargeting
    }

    /// Bound address; `None` while invalid
    pub async fn pointer(&self) -> Option<ActorAddress> {
        self.inner.lock().await.pointer
    }

    /// Most recent bound address, kept after the binding is lost
    pub async fn last_address(&self) -> Option<ActorAddress> {
        self.inner.lock().await.last_address
    }

    pub async fn identity(&self) -> IdentityKey {
        self.inner.lock().await.identity.clone()
    }

    pub async fn name(&self) -> Option<String> {
        self.inner.lock().await.name.clone()
    }

    /// Display name of the binding, falling back to the cached name when unbound
    pub async fn display_name(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        match &inner.memory {
            Some(memory) => memory.display_name(),
            None => inner.name.clone(),
        }
    }

    pub async fn initials(&self) -> Option<String> {
        self.inner.lock().await.initials.clone()
    }

    pub async fn kind(&self) -> ActorKind {
        self.inner.lock().await.kind
    }

    pub async fn model_type(&self) -> i32 {
        self.inner.lock().await.model_type
    }

    pub async fn is_photo_actor(&self) -> bool {
        self.inner.lock().await.is_photo_actor
    }

    pub async fn is_hidden(&self) -> bool {
        self.inner.lock().await.is_hidden
    }

    pub async fn is_selected(&self) -> bool {
        self.env.registry.is_selected(self.id).await
    }

    /// Make this the selected pin
    pub async fn select(&self) {
        self.env.registry.select(self.id).await;
    }

    pub async fn summary(&self) -> PinSummary {
        debug!(pin_id = %self.id, "PinnedHandle::summary: called");
        let is_selected = self.is_selected().await;
        let has_backup = self.backups.has_backup().await;
        let inner = self.inner.lock().await;
        PinSummary {
            pin_id: self.id,
            state: inner.state,
            address: inner.pointer,
            last_address: inner.last_address,
            bound: inner.memory.is_some(),
            name: inner.name.clone(),
            display_name: inner.display_name.clone(),
            initials: inner.initials.clone(),
            kind: inner.kind,
            model_type: inner.model_type,
            is_photo_actor: inner.is_photo_actor,
            is_hidden: inner.is_hidden,
            is_selected,
            has_backup,
        }
    }

    /// Release the binding, claim and context listener
    pub async fn dispose(&self) {
        debug!(pin_id = %self.id, "PinnedHandle::dispose: called");
        let mut inner = self.inner.lock().await;
        if let Some(task) = inner.context_task.take() {
            task.abort();
        }
        inner.changes = None;
        if let Some(memory) = inner.memory.take() {
            memory.dispose();
        }
        inner.state = PinState::Invalid;
        inner.pointer = None;
        self.env.registry.release(self.id).await;
    }
}

impl Drop for PinnedHandle {
    fn drop(&mut self) {
        if let Some(task) = self.inner.get_mut().context_task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for PinnedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedHandle").field("id", &self.id).finish_non_exhaustive()
    }
}
