//! Scene registry and its concurrency rules.
//!
//! A single non-reentrant mutex guards every shared collection. Producer
//! threads (stream sessions, input handling) mutate the scene through the
//! entry points here, each of which holds the lock for its whole duration,
//! including any synchronous auto-layout it triggers. The render thread
//! calls [`SceneRegistry::tick_frame`] once per frame: deferred tree and
//! resource work queued by producers is applied there and nowhere else,
//! because tree mutation and resource release are only valid on the thread
//! that owns the rendering context.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::{MosaicError, Result};
use crate::geometry::Bounds;
use crate::layout::{rearrange_group, LayoutData, LayoutEngine, LayoutRole, Strategy};
use crate::scene::{
    GroupStyle, ObjectId, ObjectStore, ResourceHandle, SceneObject, StreamInfo,
};

/// Frames between pushes of object names to the tree view, so renames from
/// late stream metadata eventually show up without per-frame chatter.
pub const NAME_REFRESH_FRAMES: u64 = 30;
/// Frames between automatic focus rotations under
/// [`LayoutPolicy::FocusRotate`].
pub const AUTO_ROTATE_FRAMES: u64 = 900;

/// Receiver for the queued UI-tree mutations. Applied only from the render
/// thread, during the frame tick.
pub trait TreeView: Send {
    fn add_object(&mut self, id: ObjectId, name: &str);
    fn remove_object(&mut self, id: ObjectId);
    fn update_object_name(&mut self, id: ObjectId, name: &str);
}

/// Releases opaque render resources. Called only from the render thread.
pub trait ResourceReleaser: Send {
    fn release(&mut self, resource: ResourceHandle);
}

/// Tree view that drops everything; for headless runs and tests.
#[derive(Debug, Default)]
pub struct NullTreeView;

impl TreeView for NullTreeView {
    fn add_object(&mut self, _id: ObjectId, _name: &str) {}
    fn remove_object(&mut self, _id: ObjectId) {}
    fn update_object_name(&mut self, _id: ObjectId, _name: &str) {}
}

/// Releaser that drops handles on the floor; for headless runs and tests.
#[derive(Debug, Default)]
pub struct NullReleaser;

impl ResourceReleaser for NullReleaser {
    fn release(&mut self, _resource: ResourceHandle) {}
}

/// FIFO of work that may be enqueued from any thread but applied only on
/// the owner (render) thread. One instance per kind of deferred work.
#[derive(Debug)]
pub struct OwnerThreadQueue<T> {
    pending: VecDeque<T>,
}

impl<T> OwnerThreadQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    pub fn push(&mut self, item: T) {
        self.pending.push_back(item);
    }

    /// Takes every queued item in FIFO order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<T> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for OwnerThreadQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a separate producer thread feeds the registry. The mutex is held
/// either way; the mode is recorded so the app can decide how to drive the
/// session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadMode {
    #[default]
    Single,
    Dual,
}

/// What the registry does with the scene when membership changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutPolicy {
    /// Never rearrange automatically; the caller drives `arrange`.
    Manual,
    /// Re-grid every movable top-level object on add and remove.
    #[default]
    Grid,
    /// Aspect-focus the newest arrival, and periodically rotate which
    /// object holds the focus hole.
    FocusRotate,
}

/// Registry configuration, loadable from the app config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistrySettings {
    pub thread_mode: ThreadMode,
    pub layout_policy: LayoutPolicy,
    /// Collect arrivals that share a site tag into an automatic group.
    pub site_grouping: bool,
    /// The world-space bound every automatic layout fills.
    pub world: Bounds,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            thread_mode: ThreadMode::Single,
            layout_policy: LayoutPolicy::Grid,
            site_grouping: true,
            world: Bounds::default(),
        }
    }
}

/// Per-frame counters returned by [`SceneRegistry::tick_frame`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub frame: u64,
    /// Objects handed to the draw callback (members included).
    pub drawn: usize,
    /// Deferred deletions applied this frame.
    pub released: usize,
    /// Tree insertions applied this frame.
    pub tree_inserts: usize,
    /// Tree removals applied this frame.
    pub tree_removes: usize,
    /// Objects still converging toward a destination after this tick.
    pub animating: usize,
}

/// Everything the registry mutex guards.
struct RegistryState {
    store: ObjectStore,
    /// Z-ordered top-level objects, back is topmost. Group members are not
    /// listed here; they draw through their group.
    drawn: Vec<ObjectId>,
    selected: Vec<ObjectId>,
    site_groups: HashMap<String, ObjectId>,
    tree_additions: OwnerThreadQueue<(ObjectId, String)>,
    tree_removals: OwnerThreadQueue<ObjectId>,
    releases: OwnerThreadQueue<SceneObject>,
    tree: Box<dyn TreeView>,
    releaser: Box<dyn ResourceReleaser>,
    frame: u64,
    clock: f32,
}

/// The concurrent scene registry.
pub struct SceneRegistry {
    settings: RegistrySettings,
    engine: LayoutEngine,
    state: Mutex<RegistryState>,
}

impl SceneRegistry {
    pub fn new(
        settings: RegistrySettings,
        engine: LayoutEngine,
        tree: Box<dyn TreeView>,
        releaser: Box<dyn ResourceReleaser>,
    ) -> Self {
        Self {
            settings,
            engine,
            state: Mutex::new(RegistryState {
                store: ObjectStore::new(),
                drawn: Vec::new(),
                selected: Vec::new(),
                site_groups: HashMap::new(),
                tree_additions: OwnerThreadQueue::new(),
                tree_removals: OwnerThreadQueue::new(),
                releases: OwnerThreadQueue::new(),
                tree,
                releaser,
                frame: 0,
                clock: 0.0,
            }),
        }
    }

    /// A registry with no external tree or resource collaborators.
    pub fn headless(settings: RegistrySettings) -> Self {
        Self::new(
            settings,
            LayoutEngine::new(),
            Box::new(NullTreeView),
            Box::new(NullReleaser),
        )
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, RegistryState>> {
        self.state.lock().map_err(|_| MosaicError::Poisoned)
    }

    /// Registers a new stream. The object joins the drawn order (or its
    /// site group, when site grouping applies), is queued for tree
    /// insertion, and the configured layout policy runs before the lock is
    /// released.
    pub fn add_source(&self, info: StreamInfo) -> Result<ObjectId> {
        let mut state = self.lock_state()?;
        let clock = state.clock;
        let object = SceneObject::video(&info);
        let id = state.store.insert(object);
        state.drawn.push(id);
        state.tree_additions.push((id, info.name.clone()));
        tracing::info!(%id, name = %info.name, "source registered");

        if self.settings.site_grouping {
            if let Some(site) = info.site_id.as_deref() {
                let group = ensure_site_group(&mut state, site)?;
                state.store.attach(group, id)?;
                state.drawn.retain(|&d| d != id);
                rearrange_group(&mut state.store, group, clock)?;
            }
        }

        self.auto_layout(&mut state, Some(id))?;
        Ok(id)
    }

    /// Removes an object from the scene. Collection removal is synchronous;
    /// destruction is deferred to the next frame tick. Removing an id that
    /// is already gone reports `NotFound` rather than iterating blindly.
    pub fn delete_source(&self, id: ObjectId) -> Result<()> {
        let mut state = self.lock_state()?;
        let clock = state.clock;
        if state.store.get(id)?.is_group() {
            delete_group_locked(&mut state, id, clock)?;
        } else {
            remove_from_scene(&mut state, id, clock)?;
        }
        self.auto_layout(&mut state, None)
    }

    /// Dissolves a group: members return to the top-level drawn order and
    /// the group shell itself is deleted.
    pub fn delete_group(&self, id: ObjectId) -> Result<()> {
        let mut state = self.lock_state()?;
        let clock = state.clock;
        delete_group_locked(&mut state, id, clock)?;
        self.auto_layout(&mut state, None)
    }

    /// Creates a user group over `members`, which must all be ungrouped
    /// top-level objects. The group takes their centroid as its position.
    pub fn create_group(
        &self,
        name: impl Into<String>,
        style: GroupStyle,
        members: &[ObjectId],
    ) -> Result<ObjectId> {
        let mut state = self.lock_state()?;
        let clock = state.clock;
        let group_id = insert_group(&mut state, SceneObject::group(name, style));

        let mut cx = 0.0;
        let mut cy = 0.0;
        for &member in members {
            let pos = state.store.get(member)?.dest_pos();
            cx += pos.x;
            cy += pos.y;
            state.store.attach(group_id, member)?;
            state.drawn.retain(|&d| d != member);
            state.selected.retain(|&s| s != member);
        }
        if !members.is_empty() {
            let n = members.len() as f32;
            state.store.get_mut(group_id)?.set_pos(cx / n, cy / n);
            rearrange_group(&mut state.store, group_id, clock)?;
        }
        self.auto_layout(&mut state, None)?;
        Ok(group_id)
    }

    /// Returns the automatic group for `site`, creating it if absent.
    pub fn create_site_group(&self, site: &str) -> Result<ObjectId> {
        let mut state = self.lock_state()?;
        ensure_site_group(&mut state, site)
    }

    /// The automatic group currently keyed by `site`, if any.
    pub fn site_group(&self, site: &str) -> Result<Option<ObjectId>> {
        Ok(self.lock_state()?.site_groups.get(site).copied())
    }

    /// Dissolves every group in the scene.
    pub fn ungroup_all(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        let clock = state.clock;
        let groups: Vec<ObjectId> = state
            .drawn
            .iter()
            .copied()
            .filter(|&id| state.store.get(id).map(|o| o.is_group()).unwrap_or(false))
            .collect();
        for group in groups {
            delete_group_locked(&mut state, group, clock)?;
        }
        self.auto_layout(&mut state, None)
    }

    /// Toggles selection; the selected list never affects the drawn order.
    pub fn set_select(&self, id: ObjectId, selected: bool) -> Result<()> {
        let mut state = self.lock_state()?;
        let clock = state.clock;
        let object = state.store.get_mut(id)?;
        if selected && !object.capabilities().selectable {
            return Ok(());
        }
        object.set_select(selected, clock);
        state.selected.retain(|&s| s != id);
        if selected {
            state.selected.push(id);
        }
        Ok(())
    }

    pub fn clear_selected(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        let clock = state.clock;
        let selected = std::mem::take(&mut state.selected);
        for id in selected {
            if let Ok(object) = state.store.get_mut(id) {
                object.set_select(false, clock);
            }
        }
        Ok(())
    }

    /// Promotes a top-level object to the top of the z-order.
    pub fn move_to_top(&self, id: ObjectId) -> Result<()> {
        let mut state = self.lock_state()?;
        if !state.drawn.contains(&id) {
            return Err(MosaicError::NotFound(id));
        }
        state.drawn.retain(|&d| d != id);
        state.drawn.push(id);
        Ok(())
    }

    /// Scales every selected object's destination by `factor`.
    pub fn scale_selected(&self, factor: f32) -> Result<()> {
        let mut state = self.lock_state()?;
        let clock = state.clock;
        let selected = state.selected.clone();
        for id in selected {
            let object = state.store.get_mut(id)?;
            let scale = object.dest_scale();
            object.set_scale(scale.x * factor, scale.y * factor, clock);
        }
        Ok(())
    }

    /// Runs a layout strategy over the movable top-level objects. Focus
    /// strategies take the current selection as the inner set.
    pub fn arrange(&self, strategy: &Strategy, inner: Option<Bounds>) -> Result<()> {
        let mut state = self.lock_state()?;
        let clock = state.clock;
        let movable = movable_top_level(&state);
        if movable.is_empty() {
            return Err(MosaicError::EmptyLayout);
        }
        let data = match strategy {
            Strategy::Focus(_) | Strategy::AspectFocus(_) => {
                let inners: Vec<ObjectId> = state
                    .selected
                    .iter()
                    .copied()
                    .filter(|id| movable.contains(id))
                    .collect();
                if inners.is_empty() {
                    return Err(MosaicError::EmptyLayout);
                }
                let outers = movable
                    .iter()
                    .copied()
                    .filter(|id| !inners.contains(id))
                    .collect();
                LayoutData::default()
                    .with_role(LayoutRole::Inners, inners)
                    .with_role(LayoutRole::Outers, outers)
            }
            _ => LayoutData::objects(movable.clone()),
        };
        self.engine
            .arrange(strategy, self.settings.world, inner, &data, &mut state.store, clock)?;
        rearrange_groups(&mut state, &movable, clock)
    }

    /// Aspect-focuses the given objects, ringing everything else around
    /// them. Entry point for an external attention source (active speaker,
    /// audio level) to drive the layout.
    pub fn focus_on(&self, ids: &[ObjectId]) -> Result<()> {
        let mut state = self.lock_state()?;
        let clock = state.clock;
        focus_locked(&self.engine, self.settings.world, &mut state, ids, clock)
    }

    /// One render-thread frame: applies deferred tree insertions, then tree
    /// removals, then resource releases, runs the periodic policies,
    /// advances animation, and walks the drawn order (groups draw their
    /// members) through `draw`.
    pub fn tick_frame(
        &self,
        now: f32,
        mut draw: impl FnMut(ObjectId, &SceneObject),
    ) -> Result<FrameStats> {
        let mut state = self.lock_state()?;
        state.clock = now;
        state.frame += 1;
        let mut stats = FrameStats {
            frame: state.frame,
            ..FrameStats::default()
        };

        // Deferred work applies in insert, remove, release order, so an
        // object added and removed in the same frame still reaches the tree
        // once before disappearing.
        for (id, name) in state.tree_additions.drain() {
            state.tree.add_object(id, &name);
            stats.tree_inserts += 1;
        }
        for id in state.tree_removals.drain() {
            state.tree.remove_object(id);
            stats.tree_removes += 1;
        }
        for object in state.releases.drain() {
            if let Some(resource) = object.resource() {
                state.releaser.release(resource);
            }
            stats.released += 1;
            drop(object);
        }

        if state.frame % NAME_REFRESH_FRAMES == 0 {
            refresh_names(&mut state);
        }
        if self.settings.layout_policy == LayoutPolicy::FocusRotate
            && state.frame % AUTO_ROTATE_FRAMES == 0
            && state.drawn.len() > 1
        {
            state.drawn.rotate_left(1);
            let target = state.drawn[0];
            focus_locked(&self.engine, self.settings.world, &mut state, &[target], now)?;
        }

        for (_, object) in state.store.iter_mut() {
            object.animate(now);
            if object.is_settling() {
                stats.animating += 1;
            }
        }

        let order = state.drawn.clone();
        for id in order {
            let object = state.store.get(id)?;
            let members = object.children().to_vec();
            draw(id, object);
            stats.drawn += 1;
            for member in members {
                draw(member, state.store.get(member)?);
                stats.drawn += 1;
            }
        }
        Ok(stats)
    }

    /// Top-level draw order, bottom to top.
    pub fn drawn_order(&self) -> Result<Vec<ObjectId>> {
        Ok(self.lock_state()?.drawn.clone())
    }

    pub fn selected(&self) -> Result<Vec<ObjectId>> {
        Ok(self.lock_state()?.selected.clone())
    }

    /// Count of live objects, group members and shells included.
    pub fn object_count(&self) -> Result<usize> {
        Ok(self.lock_state()?.store.len())
    }

    fn auto_layout(&self, state: &mut RegistryState, newest: Option<ObjectId>) -> Result<()> {
        let clock = state.clock;
        let movable = movable_top_level(state);
        if movable.is_empty() {
            return Ok(());
        }
        match self.settings.layout_policy {
            LayoutPolicy::Manual => Ok(()),
            LayoutPolicy::Grid => {
                self.engine.arrange(
                    &Strategy::default(),
                    self.settings.world,
                    None,
                    &LayoutData::objects(movable.clone()),
                    &mut state.store,
                    clock,
                )?;
                rearrange_groups(state, &movable, clock)
            }
            LayoutPolicy::FocusRotate => {
                let target = newest
                    .map(|id| top_level_of(state, id))
                    .unwrap_or(movable[0]);
                focus_locked(&self.engine, self.settings.world, state, &[target], clock)
            }
        }
    }
}

/// The drawn object that actually moves when `id` is arranged: the object
/// itself, or its group when it is a member.
fn top_level_of(state: &RegistryState, id: ObjectId) -> ObjectId {
    state
        .store
        .get(id)
        .ok()
        .and_then(|o| o.group_id())
        .unwrap_or(id)
}

fn movable_top_level(state: &RegistryState) -> Vec<ObjectId> {
    state
        .drawn
        .iter()
        .copied()
        .filter(|&id| {
            state
                .store
                .get(id)
                .map(|o| o.capabilities().movable)
                .unwrap_or(false)
        })
        .collect()
}

/// Re-grids the members of every group that an outer layout pass just
/// moved, since member positions are absolute world coordinates.
fn rearrange_groups(state: &mut RegistryState, ids: &[ObjectId], clock: f32) -> Result<()> {
    for &id in ids {
        if state.store.get(id)?.is_group() {
            rearrange_group(&mut state.store, id, clock)?;
        }
    }
    Ok(())
}

fn focus_locked(
    engine: &LayoutEngine,
    world: Bounds,
    state: &mut RegistryState,
    inners: &[ObjectId],
    clock: f32,
) -> Result<()> {
    let movable = movable_top_level(state);
    let inners: Vec<ObjectId> = movable
        .iter()
        .copied()
        .filter(|id| inners.contains(id))
        .collect();
    if inners.is_empty() {
        return Err(MosaicError::EmptyLayout);
    }
    let outers: Vec<ObjectId> = movable
        .iter()
        .copied()
        .filter(|id| !inners.contains(id))
        .collect();
    let data = LayoutData::default()
        .with_role(LayoutRole::Inners, inners)
        .with_role(LayoutRole::Outers, outers);
    engine.arrange(
        &Strategy::AspectFocus(Default::default()),
        world,
        None,
        &data,
        &mut state.store,
        clock,
    )?;
    rearrange_groups(state, &movable, clock)
}

fn insert_group(state: &mut RegistryState, group: SceneObject) -> ObjectId {
    let name = group.name().to_string();
    let id = state.store.insert(group);
    state.drawn.push(id);
    state.tree_additions.push((id, name));
    id
}

fn ensure_site_group(state: &mut RegistryState, site: &str) -> Result<ObjectId> {
    if let Some(&id) = state.site_groups.get(site) {
        return Ok(id);
    }
    let mut group = SceneObject::group(site, GroupStyle::Aspect);
    group.set_site_id(site);
    let id = insert_group(state, group);
    state.site_groups.insert(site.to_string(), id);
    tracing::debug!(%id, site, "site group created");
    Ok(id)
}

/// The removal pipeline: detach from the group, drop out of the drawn and
/// selected lists and the site map, queue the tree removal, and only then
/// move the owned object into the release queue. Once off these lists the
/// id can never be found again, so a second removal fails cleanly instead
/// of double-erasing.
fn remove_from_scene(state: &mut RegistryState, id: ObjectId, clock: f32) -> Result<()> {
    let former_group = state.store.detach(id)?;
    state.drawn.retain(|&d| d != id);
    state.selected.retain(|&s| s != id);
    if let Some(site) = state.store.get(id)?.site_id().map(str::to_string) {
        if state.site_groups.get(&site) == Some(&id) {
            state.site_groups.remove(&site);
        }
    }
    state.tree_removals.push(id);
    let object = state.store.remove(id)?;
    tracing::info!(%id, name = object.name(), "object leaving scene");
    state.releases.push(object);

    if let Some(group_id) = former_group {
        let group = state.store.get(group_id)?;
        let emptied = group.children().is_empty();
        let auto_created = group
            .site_id()
            .map(|s| state.site_groups.get(s) == Some(&group_id))
            .unwrap_or(false);
        if emptied && auto_created {
            // Site groups live only as long as their members.
            remove_from_scene(state, group_id, clock)?;
        } else if !emptied {
            rearrange_group(&mut state.store, group_id, clock)?;
        }
    }
    Ok(())
}

fn delete_group_locked(state: &mut RegistryState, id: ObjectId, clock: f32) -> Result<()> {
    if !state.store.get(id)?.is_group() {
        return Err(MosaicError::NotAGroup(id));
    }
    let members = state.store.get(id)?.children().to_vec();
    for member in members {
        state.store.detach(member)?;
        state.drawn.push(member);
    }
    remove_from_scene(state, id, clock)
}

fn refresh_names(state: &mut RegistryState) {
    let mut ids: Vec<ObjectId> = state.drawn.clone();
    let members: Vec<ObjectId> = ids
        .iter()
        .flat_map(|&id| {
            state
                .store
                .get(id)
                .map(|o| o.children().to_vec())
                .unwrap_or_default()
        })
        .collect();
    ids.extend(members);
    for id in ids {
        if let Ok(object) = state.store.get(id) {
            let name = object.name().to_string();
            state.tree.update_object_name(id, &name);
        }
    }
}
