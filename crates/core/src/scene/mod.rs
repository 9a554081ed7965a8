use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::animation::{Animated, ASPECT_DURATION, COLOR_DURATION, MOVE_DURATION};
use crate::error::{MosaicError, Result};
use crate::geometry::{Bounds, Color, Vec2, Vec3};

/// Default starting scale for a freshly registered object.
const DEFAULT_SCALE: f32 = 5.0;
/// Border thickness as a fraction of the object's width.
const DEFAULT_BORDER_SCALE: f32 = 0.04;
/// Caption height as a fraction of the object's width (captions render along
/// the top edge of the bordered footprint).
const DEFAULT_CAPTION_SCALE: f32 = 0.08;
/// Floor applied to destination scales so a layout bug can never collapse an
/// object to zero or negative size.
const MIN_SCALE: f32 = 1e-3;
/// Aspect ratio assumed for a stream that has not reported a frame size yet.
pub const DEFAULT_STREAM_ASPECT: f32 = 1.33;
/// Where new objects animate in from.
const ENTRY_POS: Vec3 = Vec3::new(-15.0, 15.0, 0.0);

/// Opaque identity for a live scene object. Ids are never reused within a
/// store's lifetime, so a stale id reliably fails lookup instead of aliasing
/// a newer object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to a render resource (texture or similar) owned by the
/// rendering context. The core never dereferences it; it only carries it to
/// the [`ResourceReleaser`](crate::registry::ResourceReleaser) on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle(pub u64);

/// Registration payload supplied by the media layer when a stream arrives.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub name: String,
    pub site_id: Option<String>,
    pub aspect: f32,
    pub resource: Option<ResourceHandle>,
}

impl StreamInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            site_id: None,
            aspect: DEFAULT_STREAM_ASPECT,
            resource: None,
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site_id = Some(site.into());
        self
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_resource(mut self, resource: ResourceHandle) -> Self {
        self.resource = Some(resource);
        self
    }
}

/// How a group re-grids its members after membership changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupStyle {
    /// Near-square grid; the group resizes itself toward the members'
    /// collective aspect.
    #[default]
    Aspect,
    OneRow,
    OneColumn,
}

/// What an object can do in response to user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub selectable: bool,
    pub movable: bool,
    pub deletable: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            selectable: true,
            movable: true,
            deletable: false,
        }
    }
}

/// Concrete kind of a scene object. An explicit tagged variant, so callers
/// ask `children()` instead of downcasting to discover group structure.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// A bare 1:1 rectangle (test objects, placeholders).
    Plain,
    /// A video-backed rectangle whose aspect tracks the source's reported
    /// frame shape, easing on its own timer when the source re-aspects.
    Video {
        aspect: Animated<f32>,
        resource: Option<ResourceHandle>,
    },
    /// A rectangle that owns an ordered set of member objects.
    Group {
        members: Vec<ObjectId>,
        style: GroupStyle,
    },
}

/// A movable, scalable, selectable rectangle in the collage.
///
/// Position, scale and the two colors each carry a current and a destination
/// value; mutators write destinations and the per-frame [`animate`] call
/// converges current values toward them. Total-footprint dimensions
/// (border + caption included) are always derived, never stored.
///
/// [`animate`]: SceneObject::animate
#[derive(Debug, Clone)]
pub struct SceneObject {
    name: String,
    site_id: Option<String>,
    pos: Animated<Vec3>,
    scale: Animated<Vec2>,
    border_color: Animated<Color>,
    secondary_color: Animated<Color>,
    base_border_color: Color,
    animated: bool,
    selected: bool,
    caps: Capabilities,
    group: Option<ObjectId>,
    border_scale: f32,
    caption_scale: f32,
    kind: ObjectKind,
}

impl SceneObject {
    fn base(name: String, kind: ObjectKind, base_color: Color) -> Self {
        let mut pos = Animated::new(Vec3::default(), MOVE_DURATION);
        // new objects ease in from the entry corner
        pos.snap(ENTRY_POS);
        Self {
            name,
            site_id: None,
            pos,
            scale: Animated::new(Vec2::new(DEFAULT_SCALE, DEFAULT_SCALE), MOVE_DURATION),
            border_color: Animated::new(base_color, COLOR_DURATION),
            secondary_color: Animated::new(Color::new(1.0, 1.0, 1.0, 1.0), COLOR_DURATION),
            base_border_color: base_color,
            animated: true,
            selected: false,
            caps: Capabilities::default(),
            group: None,
            border_scale: DEFAULT_BORDER_SCALE,
            caption_scale: DEFAULT_CAPTION_SCALE,
            kind,
        }
    }

    /// A plain 1:1 rectangle.
    pub fn plain(name: impl Into<String>) -> Self {
        Self::base(name.into(), ObjectKind::Plain, Color::BASE_BORDER)
    }

    /// A video-backed rectangle described by a stream registration.
    pub fn video(info: &StreamInfo) -> Self {
        let kind = ObjectKind::Video {
            aspect: Animated::new(info.aspect.max(MIN_SCALE), ASPECT_DURATION),
            resource: info.resource,
        };
        let mut obj = Self::base(info.name.clone(), kind, Color::BASE_BORDER);
        obj.site_id = info.site_id.clone();
        obj
    }

    /// An empty group rectangle.
    pub fn group(name: impl Into<String>, style: GroupStyle) -> Self {
        let kind = ObjectKind::Group {
            members: Vec::new(),
            style,
        };
        let mut obj = Self::base(name.into(), kind, Color::GROUP_BASE);
        obj.caps.deletable = false;
        obj
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn site_id(&self) -> Option<&str> {
        self.site_id.as_deref()
    }

    pub fn set_site_id(&mut self, site: impl Into<String>) {
        self.site_id = Some(site.into());
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut ObjectKind {
        &mut self.kind
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ObjectKind::Group { .. })
    }

    /// Member ids for groups; empty for everything else. This replaces any
    /// need to inspect the concrete kind when traversing.
    pub fn children(&self) -> &[ObjectId] {
        match &self.kind {
            ObjectKind::Group { members, .. } => members,
            _ => &[],
        }
    }

    pub fn group_style(&self) -> Option<GroupStyle> {
        match &self.kind {
            ObjectKind::Group { style, .. } => Some(*style),
            _ => None,
        }
    }

    /// The render resource attached to this object, if any.
    pub fn resource(&self) -> Option<ResourceHandle> {
        match &self.kind {
            ObjectKind::Video { resource, .. } => *resource,
            _ => None,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn set_capabilities(&mut self, caps: Capabilities) {
        self.caps = caps;
    }

    /// The group this object belongs to; a non-owning back-reference.
    pub fn group_id(&self) -> Option<ObjectId> {
        self.group
    }

    pub(crate) fn set_group(&mut self, group: Option<ObjectId>) {
        self.group = group;
    }

    pub fn is_grouped(&self) -> bool {
        self.group.is_some()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_animated(&self) -> bool {
        self.animated
    }

    /// Turns destination animation on or off; off makes every mutator snap.
    pub fn set_animated(&mut self, animated: bool) {
        self.animated = animated;
    }

    // --- current/destination geometry ------------------------------------

    pub fn pos(&self) -> Vec3 {
        self.pos.get()
    }

    pub fn dest_pos(&self) -> Vec3 {
        self.pos.destination()
    }

    pub fn scale(&self) -> Vec2 {
        self.scale.get()
    }

    pub fn dest_scale(&self) -> Vec2 {
        self.scale.destination()
    }

    pub fn border_color(&self) -> Color {
        self.border_color.get()
    }

    pub fn secondary_color(&self) -> Color {
        self.secondary_color.get()
    }

    /// Width over height of the rendered content. Plain rectangles are 1:1;
    /// videos track their source-reported aspect.
    pub fn aspect(&self) -> f32 {
        match &self.kind {
            ObjectKind::Video { aspect, .. } => aspect.get(),
            _ => 1.0,
        }
    }

    pub fn dest_aspect(&self) -> f32 {
        match &self.kind {
            ObjectKind::Video { aspect, .. } => aspect.destination(),
            _ => 1.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.scale.get().x * self.aspect()
    }

    pub fn height(&self) -> f32 {
        self.scale.get().y
    }

    pub fn dest_width(&self) -> f32 {
        self.scale.destination().x * self.dest_aspect()
    }

    pub fn dest_height(&self) -> f32 {
        self.scale.destination().y
    }

    fn caption_height_for(&self, width: f32) -> f32 {
        if self.name.is_empty() {
            0.0
        } else {
            width * self.caption_scale
        }
    }

    pub fn border_size(&self) -> f32 {
        self.width() * self.border_scale
    }

    pub fn dest_border_size(&self) -> f32 {
        self.dest_width() * self.border_scale
    }

    /// Width of the full footprint: content plus border on both sides.
    pub fn total_width(&self) -> f32 {
        self.width() + 2.0 * self.border_size()
    }

    /// Height of the full footprint: content, border, and caption strip.
    pub fn total_height(&self) -> f32 {
        self.height() + 2.0 * self.border_size() + self.caption_height_for(self.width())
    }

    pub fn dest_total_width(&self) -> f32 {
        self.dest_width() + 2.0 * self.dest_border_size()
    }

    pub fn dest_total_height(&self) -> f32 {
        self.dest_height()
            + 2.0 * self.dest_border_size()
            + self.caption_height_for(self.dest_width())
    }

    /// How far below the footprint's center the content center sits, due to
    /// the caption strip along the top.
    pub fn center_offset_y(&self) -> f32 {
        self.caption_height_for(self.width()) / 2.0
    }

    pub fn dest_center_offset_y(&self) -> f32 {
        self.caption_height_for(self.dest_width()) / 2.0
    }

    /// Bound of the rendered content at its current position and scale.
    pub fn bounds(&self) -> Bounds {
        let p = self.pos.get();
        Bounds::from_center(p.x, p.y, self.width(), self.height())
    }

    /// Bound of the rendered content once all animation settles.
    pub fn dest_bounds(&self) -> Bounds {
        let p = self.pos.destination();
        Bounds::from_center(p.x, p.y, self.dest_width(), self.dest_height())
    }

    /// Destination bound of the full footprint (border + caption).
    pub fn dest_total_bounds(&self) -> Bounds {
        let p = self.pos.destination();
        Bounds::from_center(
            p.x,
            p.y + self.dest_center_offset_y(),
            self.dest_total_width(),
            self.dest_total_height(),
        )
    }

    // --- mutators ---------------------------------------------------------

    /// Sets the destination position, easing toward it over time (or
    /// snapping when animation is disabled).
    pub fn move_to(&mut self, x: f32, y: f32, now: f32) {
        let z = self.pos.destination().z;
        let dest = Vec3::new(x, y, z);
        if self.animated {
            self.pos.retarget(now, dest);
        } else {
            self.pos.snap(dest);
        }
    }

    /// Sets position immediately, no animation.
    pub fn set_pos(&mut self, x: f32, y: f32) {
        let z = self.pos.destination().z;
        self.pos.snap(Vec3::new(x, y, z));
    }

    pub fn set_scale(&mut self, sx: f32, sy: f32, now: f32) {
        let dest = Vec2::new(sx.max(MIN_SCALE), sy.max(MIN_SCALE));
        if self.animated {
            self.scale.retarget(now, dest);
        } else {
            self.scale.snap(dest);
        }
    }

    /// Resizes so the content width becomes `w`, preserving aspect.
    pub fn set_width(&mut self, w: f32, now: f32) {
        let factor = w / self.dest_width();
        let dest = self.scale.destination();
        self.set_scale(dest.x * factor, dest.y * factor, now);
    }

    /// Resizes so the content height becomes `h`, preserving aspect.
    pub fn set_height(&mut self, h: f32, now: f32) {
        let factor = h / self.dest_height();
        let dest = self.scale.destination();
        self.set_scale(dest.x * factor, dest.y * factor, now);
    }

    /// Resizes so the full footprint width becomes `w`, preserving aspect.
    pub fn set_total_width(&mut self, w: f32, now: f32) {
        let inner = w * self.dest_width() / self.dest_total_width();
        self.set_width(inner, now);
    }

    /// Resizes so the full footprint height becomes `h`, preserving aspect.
    pub fn set_total_height(&mut self, h: f32, now: f32) {
        let inner = h * self.dest_height() / self.dest_total_height();
        self.set_height(inner, now);
    }

    /// Stretches the footprint to exactly `w` x `h`, ignoring aspect.
    pub fn set_total_size(&mut self, w: f32, h: f32, now: f32) {
        let width = w / (1.0 + 2.0 * self.border_scale);
        let border = width * self.border_scale;
        let height = h - 2.0 * border - self.caption_height_for(width);
        self.set_scale(width / self.dest_aspect(), height, now);
    }

    /// Sizes the footprint to fill `bounds` along the aspect-constrained
    /// axis and centers it there.
    pub fn fill_to_rect(&mut self, bounds: Bounds, now: f32) {
        let space_aspect = bounds.aspect();
        let object_aspect = self.dest_total_width() / self.dest_total_height();
        if space_aspect - object_aspect > 0.01 {
            self.set_total_height(bounds.height(), now);
        } else {
            self.set_total_width(bounds.width(), now);
        }
        self.move_to(
            bounds.center_x(),
            bounds.center_y() - self.dest_center_offset_y(),
            now,
        );
    }

    /// Marks the object (de)selected and eases the border to the matching
    /// highlight color.
    pub fn set_select(&mut self, selected: bool, now: f32) {
        self.selected = selected;
        let dest = if selected {
            Color::SELECTED
        } else {
            self.base_border_color
        };
        if self.animated {
            self.border_color.retarget(now, dest);
        } else {
            self.border_color.snap(dest);
        }
    }

    /// Changes the resting border color (also the deselected target).
    pub fn set_color(&mut self, color: Color, now: f32) {
        self.base_border_color = color;
        if !self.selected {
            if self.animated {
                self.border_color.retarget(now, color);
            } else {
                self.border_color.snap(color);
            }
        }
    }

    pub fn set_secondary_color(&mut self, color: Color, now: f32) {
        if self.animated {
            self.secondary_color.retarget(now, color);
        } else {
            self.secondary_color.snap(color);
        }
    }

    /// Updates a video's source-reported aspect. The aspect eases on its own
    /// timer, independent of any scale animation in flight. Ignored for
    /// non-video objects.
    pub fn set_source_aspect(&mut self, aspect: f32, now: f32) {
        let animated = self.animated;
        if let ObjectKind::Video { aspect: value, .. } = &mut self.kind {
            let dest = aspect.max(MIN_SCALE);
            if animated {
                value.retarget(now, dest);
            } else {
                value.snap(dest);
            }
        }
    }

    /// Advances every animated quantity to time `now`.
    pub fn animate(&mut self, now: f32) {
        self.pos.tick(now);
        self.scale.tick(now);
        self.border_color.tick(now);
        self.secondary_color.tick(now);
        if let ObjectKind::Video { aspect, .. } = &mut self.kind {
            aspect.tick(now);
        }
    }

    /// True while any quantity is still converging.
    pub fn is_settling(&self) -> bool {
        self.pos.is_animating()
            || self.scale.is_animating()
            || self.border_color.is_animating()
            || self.secondary_color.is_animating()
            || matches!(&self.kind, ObjectKind::Video { aspect, .. } if aspect.is_animating())
    }
}

/// Id-keyed owner of every live [`SceneObject`]. Lookups return explicit
/// not-found errors; nothing in the crate scans for raw pointers.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: HashMap<ObjectId, SceneObject>,
    next_id: u64,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: SceneObject) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        self.objects.insert(id, object);
        id
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Result<&SceneObject> {
        self.objects.get(&id).ok_or(MosaicError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject> {
        self.objects.get_mut(&id).ok_or(MosaicError::NotFound(id))
    }

    /// Takes the object out of the store, transferring ownership to the
    /// caller (the deferred-release queue, in practice).
    pub fn remove(&mut self, id: ObjectId) -> Result<SceneObject> {
        self.objects.remove(&id).ok_or(MosaicError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectId, &mut SceneObject)> {
        self.objects.iter_mut().map(|(id, obj)| (*id, obj))
    }

    /// Adds `member` to `group_id`'s member list and sets the back-reference,
    /// keeping both sides of the relation consistent. The member must not
    /// already belong to a group.
    pub fn attach(&mut self, group_id: ObjectId, member_id: ObjectId) -> Result<()> {
        if self.get(member_id)?.is_grouped() {
            return Err(MosaicError::InvalidOption(format!(
                "object {member_id} already belongs to a group"
            )));
        }
        match self.get_mut(group_id)?.kind_mut() {
            ObjectKind::Group { members, .. } => {
                if !members.contains(&member_id) {
                    members.push(member_id);
                }
            }
            _ => return Err(MosaicError::NotAGroup(group_id)),
        }
        self.get_mut(member_id)?.set_group(Some(group_id));
        Ok(())
    }

    /// Removes `member` from whatever group holds it, clearing both sides.
    /// Returns the group it left, or `None` if it was ungrouped.
    pub fn detach(&mut self, member_id: ObjectId) -> Result<Option<ObjectId>> {
        let group_id = match self.get(member_id)?.group_id() {
            Some(g) => g,
            None => return Ok(None),
        };
        if let ObjectKind::Group { members, .. } = self.get_mut(group_id)?.kind_mut() {
            members.retain(|&m| m != member_id);
        }
        self.get_mut(member_id)?.set_group(None);
        Ok(Some(group_id))
    }
}
