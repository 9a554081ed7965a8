//! Declarative layout strategies.
//!
//! Every strategy reads current/destination sizes and writes only position
//! and scale destinations; the render loop's animation pass does the rest.
//! Strategies validate what they can before mutating (grid checks its counts
//! up front), but composite strategies that fail in a later sub-call may
//! leave earlier objects already moved.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{MosaicError, Result};
use crate::geometry::{Bounds, Vec2};
use crate::scene::{GroupStyle, ObjectId, ObjectStore};

/// Fraction of a grid cell an object's footprint is sized to.
const CELL_FILL: f32 = 0.95;
/// World units pinned inside the bound edges in edge-aligned grid mode.
const EDGE_INSET: f32 = 0.2;
/// World units reserved above the horizontal perimeter bands so captions
/// never cross the outer bound.
const CAPTION_STRIP: f32 = 0.8;
/// Margin factor applied to the hole before grid-filling the focused set.
const HOLE_SHRINK: f32 = 0.95;
/// Per-round scale step of the tiling feasibility search.
const TILING_STEP: f32 = 0.05;
/// Rounds before the tiling search gives up.
const TILING_MAX_ROUNDS: usize = 50;

/// Grid placement options. Defaults give the automatic near-square grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridOptions {
    /// Explicit column count; derived as `ceil(sqrt(N))` when `None`.
    pub cols: Option<usize>,
    /// Explicit row count; derived from the column count when `None`.
    pub rows: Option<usize>,
    /// Fill row-by-row when true, column-by-column when false.
    pub horizontal: bool,
    /// Resize each object's footprint to fit its cell before placing.
    pub resize: bool,
    /// Pin the first and last slot of each line a fixed inset from the
    /// bound edges instead of centering slots in their cells.
    pub edge: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            cols: None,
            rows: None,
            horizontal: true,
            resize: true,
            edge: false,
        }
    }
}

/// Perimeter ring options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerimeterOptions {
    /// Vertical space reserved above the top and bottom bands for captions.
    pub caption_strip: f32,
}

impl Default for PerimeterOptions {
    fn default() -> Self {
        Self {
            caption_strip: CAPTION_STRIP,
        }
    }
}

/// Focus options: a grid-filled hole with a perimeter ring around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusOptions {
    /// Margin factor applied to the hole before the inner grid fill.
    pub hole_margin: f32,
    pub perimeter: PerimeterOptions,
}

impl Default for FocusOptions {
    fn default() -> Self {
        Self {
            hole_margin: HOLE_SHRINK,
            perimeter: PerimeterOptions::default(),
        }
    }
}

/// Aspect-focus options: the hole is derived from the outer bound instead
/// of supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectFocusOptions {
    /// Width over height of the derived hole.
    pub aspect: f32,
    /// Fraction of the outer bound the hole's driving axis occupies.
    pub scale: f32,
    pub focus: FocusOptions,
}

impl Default for AspectFocusOptions {
    fn default() -> Self {
        Self {
            aspect: 1.5555,
            scale: 0.65,
            focus: FocusOptions::default(),
        }
    }
}

/// Tiling (bin-pack) options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilingOptions {
    /// Per-round growth/shrink factor of the global scale search.
    pub step: f32,
    /// Search rounds before reporting failure.
    pub max_rounds: usize,
}

impl Default for TilingOptions {
    fn default() -> Self {
        Self {
            step: TILING_STEP,
            max_rounds: TILING_MAX_ROUNDS,
        }
    }
}

/// A layout strategy together with its typed options.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    Grid(GridOptions),
    Perimeter(PerimeterOptions),
    Focus(FocusOptions),
    AspectFocus(AspectFocusOptions),
    Tiling(TilingOptions),
}

impl Default for Strategy {
    /// The automatic near-square grid.
    fn default() -> Self {
        Self::Grid(GridOptions::default())
    }
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Grid(_) => "grid",
            Self::Perimeter(_) => "perimeter",
            Self::Focus(_) => "focus",
            Self::AspectFocus(_) => "aspectFocus",
            Self::Tiling(_) => "tiling",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = MosaicError;

    /// Parses a strategy name to its default-option form. Unknown names are
    /// a reported failure with nothing mutated.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grid" => Ok(Self::Grid(GridOptions::default())),
            "perimeter" => Ok(Self::Perimeter(PerimeterOptions::default())),
            "focus" => Ok(Self::Focus(FocusOptions::default())),
            "aspectFocus" => Ok(Self::AspectFocus(AspectFocusOptions::default())),
            "tiling" => Ok(Self::Tiling(TilingOptions::default())),
            other => Err(MosaicError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Object roles a strategy consumes. Simple strategies read `Objects`;
/// focus strategies read the `Inners`/`Outers` split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutRole {
    Objects,
    Inners,
    Outers,
}

impl LayoutRole {
    fn name(self) -> &'static str {
        match self {
            Self::Objects => "objects",
            Self::Inners => "inners",
            Self::Outers => "outers",
        }
    }
}

/// Role-keyed id lists handed to [`LayoutEngine::arrange`].
#[derive(Debug, Clone, Default)]
pub struct LayoutData {
    roles: HashMap<LayoutRole, Vec<ObjectId>>,
}

impl LayoutData {
    /// The common case: everything under the `Objects` role.
    pub fn objects(ids: Vec<ObjectId>) -> Self {
        Self::default().with_role(LayoutRole::Objects, ids)
    }

    pub fn with_role(mut self, role: LayoutRole, ids: Vec<ObjectId>) -> Self {
        self.roles.insert(role, ids);
        self
    }

    fn role(&self, role: LayoutRole) -> Result<&[ObjectId]> {
        self.roles
            .get(&role)
            .map(Vec::as_slice)
            .ok_or(MosaicError::MissingRole(role.name()))
    }
}

/// One object's settled placement, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct Placement {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Where a strategy left every object, serialisable for the CLI report.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementReport {
    pub strategy: String,
    pub bound: Bounds,
    pub placements: Vec<Placement>,
}

impl PlacementReport {
    /// Snapshots destination footprints after an arrange call.
    pub fn capture(
        strategy: &Strategy,
        bound: Bounds,
        ids: &[ObjectId],
        store: &ObjectStore,
    ) -> Result<Self> {
        let mut placements = Vec::with_capacity(ids.len());
        for &id in ids {
            let obj = store.get(id)?;
            let footprint = obj.dest_total_bounds();
            placements.push(Placement {
                name: obj.name().to_string(),
                x: footprint.center_x(),
                y: footprint.center_y(),
                width: footprint.width(),
                height: footprint.height(),
            });
        }
        Ok(Self {
            strategy: strategy.name().to_string(),
            bound,
            placements,
        })
    }
}

/// Stateless dispatcher over the layout strategies. Constructed once and
/// handed to whoever arranges the scene.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine;

impl LayoutEngine {
    pub fn new() -> Self {
        Self
    }

    /// Runs `strategy` over the ids in `data`, writing destination positions
    /// and scales into `store`. `inner` is the hole bound for perimeter and
    /// focus strategies; aspect-focus derives its own.
    pub fn arrange(
        &self,
        strategy: &Strategy,
        outer: Bounds,
        inner: Option<Bounds>,
        data: &LayoutData,
        store: &mut ObjectStore,
        now: f32,
    ) -> Result<()> {
        tracing::debug!(strategy = strategy.name(), "arranging scene");
        match strategy {
            Strategy::Grid(opts) => {
                grid(data.role(LayoutRole::Objects)?, outer, *opts, store, now)
            }
            Strategy::Perimeter(opts) => {
                let hole = inner.ok_or_else(|| {
                    MosaicError::InvalidOption("perimeter requires an inner hole bound".into())
                })?;
                perimeter(data.role(LayoutRole::Objects)?, outer, hole, *opts, store, now)
            }
            Strategy::Focus(opts) => {
                let hole = inner.ok_or_else(|| {
                    MosaicError::InvalidOption("focus requires an inner hole bound".into())
                })?;
                focus(
                    data.role(LayoutRole::Inners)?,
                    data.role(LayoutRole::Outers)?,
                    outer,
                    hole,
                    *opts,
                    store,
                    now,
                )
            }
            Strategy::AspectFocus(opts) => {
                let hole = derive_hole(outer, *opts);
                focus(
                    data.role(LayoutRole::Inners)?,
                    data.role(LayoutRole::Outers)?,
                    outer,
                    hole,
                    opts.focus,
                    store,
                    now,
                )
            }
            Strategy::Tiling(opts) => {
                tiling(data.role(LayoutRole::Objects)?, outer, *opts, store, now)
            }
        }
    }
}

/// Re-grids a group's members inside the group's destination footprint,
/// honoring the group's arrange style. `Aspect` style additionally resizes
/// the group itself toward the members' collective grid aspect.
pub fn rearrange_group(store: &mut ObjectStore, group_id: ObjectId, now: f32) -> Result<()> {
    let group = store.get(group_id)?;
    let style = group
        .group_style()
        .ok_or(MosaicError::NotAGroup(group_id))?;
    let members = group.children().to_vec();
    if members.is_empty() {
        return Ok(());
    }

    let n = members.len();
    let (cols, rows) = match style {
        GroupStyle::OneRow => (n, 1),
        GroupStyle::OneColumn => (1, n),
        GroupStyle::Aspect => {
            let cols = (n as f32).sqrt().ceil() as usize;
            (cols, n.div_ceil(cols))
        }
    };

    if style == GroupStyle::Aspect {
        // Resize the group toward the aspect its member grid wants,
        // assuming roughly 4:3 members, keeping height fixed.
        let aspect = cols as f32 * 1.33 / rows as f32;
        let group = store.get_mut(group_id)?;
        let height = group.dest_height();
        group.set_scale(height * aspect, height, now);
    }

    let bound = store.get(group_id)?.dest_bounds();
    let opts = GridOptions {
        cols: Some(cols),
        rows: Some(rows),
        ..GridOptions::default()
    };
    grid(&members, bound, opts, store, now)
}

/// Sizes one object's total footprint to fit a `w` x `h` cell along the
/// aspect-constrained axis (the same axis choice `fill_to_rect` makes).
fn size_to_cell(
    store: &mut ObjectStore,
    id: ObjectId,
    w: f32,
    h: f32,
    now: f32,
) -> Result<()> {
    let obj = store.get_mut(id)?;
    let cell_aspect = w / h;
    let object_aspect = obj.dest_total_width() / obj.dest_total_height();
    if cell_aspect - object_aspect > 0.01 {
        obj.set_total_height(h, now);
    } else {
        obj.set_total_width(w, now);
    }
    Ok(())
}

fn grid(
    ids: &[ObjectId],
    bound: Bounds,
    opts: GridOptions,
    store: &mut ObjectStore,
    now: f32,
) -> Result<()> {
    let n = ids.len();
    if n == 0 {
        return Err(MosaicError::EmptyLayout);
    }

    let cols = opts
        .cols
        .unwrap_or_else(|| (n as f32).sqrt().ceil() as usize)
        .max(1);
    let rows = opts.rows.unwrap_or_else(|| n.div_ceil(cols)).max(1);
    // Validate before touching any destination.
    if cols * rows < n {
        return Err(MosaicError::GridOverflow {
            objects: n,
            cols,
            rows,
        });
    }

    // A lone object fullscreens into the bound, explicit counts or not;
    // the stride math would only waste the space.
    if n == 1 {
        store.get_mut(ids[0])?.fill_to_rect(bound, now);
        return Ok(());
    }

    let cell_w = bound.width() / cols as f32;
    let cell_h = bound.height() / rows as f32;

    if opts.resize {
        for &id in ids {
            size_to_cell(store, id, cell_w * CELL_FILL, cell_h * CELL_FILL, now)?;
        }
    }

    let mut placed = 0usize;
    if opts.horizontal {
        for row in 0..rows {
            let remaining = n - placed;
            if remaining == 0 {
                break;
            }
            // The last partial row restrides so leftovers spread evenly.
            let in_row = remaining.min(cols);
            let stride = bound.width() / in_row as f32;
            let y = bound.top - cell_h * (row as f32 + 0.5);
            for slot in 0..in_row {
                let x = slot_coord(bound.left, bound.width(), stride, slot, in_row, opts.edge);
                place_at(store, ids[placed], x, y, now)?;
                placed += 1;
            }
        }
    } else {
        for col in 0..cols {
            let remaining = n - placed;
            if remaining == 0 {
                break;
            }
            let in_col = remaining.min(rows);
            let stride = bound.height() / in_col as f32;
            let x = bound.left + cell_w * (col as f32 + 0.5);
            for slot in 0..in_col {
                let y = bound.top
                    - slot_offset(bound.height(), stride, slot, in_col, opts.edge);
                place_at(store, ids[placed], x, y, now)?;
                placed += 1;
            }
        }
    }
    Ok(())
}

fn slot_coord(origin: f32, span: f32, stride: f32, slot: usize, count: usize, edge: bool) -> f32 {
    origin + slot_offset(span, stride, slot, count, edge)
}

fn slot_offset(span: f32, stride: f32, slot: usize, count: usize, edge: bool) -> f32 {
    if edge && count > 1 {
        EDGE_INSET + (span - 2.0 * EDGE_INSET) * slot as f32 / (count - 1) as f32
    } else {
        stride * (slot as f32 + 0.5)
    }
}

/// Moves an object's footprint center to (`x`, `y`); the content center
/// sits below by the caption offset.
fn place_at(store: &mut ObjectStore, id: ObjectId, x: f32, y: f32, now: f32) -> Result<()> {
    let obj = store.get_mut(id)?;
    let offset = obj.dest_center_offset_y();
    obj.move_to(x, y - offset, now);
    Ok(())
}

/// Splits `n` objects into (top, right, bottom, left) band counts. Wider
/// holes get proportionally more top/bottom slots; rounding remainder lands
/// in the left band so the counts always sum to `n`.
fn band_counts(n: usize, inner: Bounds, outer: Bounds) -> (usize, usize, usize, usize) {
    if n == 1 {
        return (1, 0, 0, 0);
    }
    let horiz = inner.width();
    let vert = outer.height();
    let top_ratio = horiz / (horiz + vert);
    let side_ratio = vert / (horiz + vert);
    let half = n as f32 / 2.0;
    let top = (top_ratio * half).floor() as usize;
    let side = (side_ratio * half).ceil() as usize;
    let bottom = n.saturating_sub(top + 2 * side);
    let left = n - top - side - bottom;
    (top, side, bottom, left)
}

fn perimeter(
    ids: &[ObjectId],
    outer: Bounds,
    inner: Bounds,
    opts: PerimeterOptions,
    store: &mut ObjectStore,
    now: f32,
) -> Result<()> {
    let n = ids.len();
    if n == 0 {
        return Err(MosaicError::EmptyLayout);
    }
    let (top, right, bottom, left) = band_counts(n, inner, outer);
    debug_assert_eq!(top + right + bottom + left, n);

    // Horizontal bands sit over the hole's width; the side columns run the
    // full outer height, ends pinned to the bound edges.
    let top_band = Bounds::new(
        inner.left,
        inner.right,
        outer.top - opts.caption_strip,
        inner.top,
    );
    let right_band = Bounds::new(inner.right, outer.right, outer.top, outer.bottom);
    let bottom_band = Bounds::new(
        inner.left,
        inner.right,
        inner.bottom - opts.caption_strip,
        outer.bottom,
    );
    let left_band = Bounds::new(outer.left, inner.left, outer.top, outer.bottom);

    let mut cursor = 0usize;
    let mut take = |count: usize| {
        let slice = &ids[cursor..cursor + count];
        cursor += count;
        slice.to_vec()
    };

    let top_ids = take(top);
    let right_ids = take(right);
    // Bottom and left run reversed so the ring reads clockwise.
    let mut bottom_ids = take(bottom);
    bottom_ids.reverse();
    let mut left_ids = take(left);
    left_ids.reverse();

    band(&top_ids, top_band, true, false, store, now)?;
    band(&right_ids, right_band, false, true, store, now)?;
    band(&bottom_ids, bottom_band, true, false, store, now)?;
    band(&left_ids, left_band, false, true, store, now)?;
    Ok(())
}

/// Grid-arranges one band as a single row or column; empty bands are a
/// no-op rather than an error.
fn band(
    ids: &[ObjectId],
    bound: Bounds,
    horizontal: bool,
    edge: bool,
    store: &mut ObjectStore,
    now: f32,
) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let opts = if horizontal {
        GridOptions {
            cols: Some(ids.len()),
            rows: Some(1),
            edge,
            ..GridOptions::default()
        }
    } else {
        GridOptions {
            cols: Some(1),
            rows: Some(ids.len()),
            horizontal: false,
            edge,
            ..GridOptions::default()
        }
    };
    grid(ids, bound, opts, store, now)
}

fn focus(
    inners: &[ObjectId],
    outers: &[ObjectId],
    outer: Bounds,
    hole: Bounds,
    opts: FocusOptions,
    store: &mut ObjectStore,
    now: f32,
) -> Result<()> {
    if inners.is_empty() {
        return Err(MosaicError::EmptyLayout);
    }
    // With nothing to ring, the whole area is a plain grid.
    if outers.is_empty() {
        return grid(inners, outer, GridOptions::default(), store, now);
    }
    grid(
        inners,
        hole.shrunk(opts.hole_margin),
        GridOptions::default(),
        store,
        now,
    )?;
    perimeter(outers, outer, hole, opts.perimeter, store, now)
}

/// Derives the centered hole for aspect-focus, picking the axis that keeps
/// the hole inside the outer bound.
fn derive_hole(outer: Bounds, opts: AspectFocusOptions) -> Bounds {
    let mut width = outer.width() * opts.scale;
    let mut height = width / opts.aspect;
    if height > outer.height() {
        height = outer.height() * opts.scale;
        width = height * opts.aspect;
    }
    Bounds::from_center(outer.center_x(), outer.center_y(), width, height)
}

fn tiling(
    ids: &[ObjectId],
    bound: Bounds,
    opts: TilingOptions,
    store: &mut ObjectStore,
    now: f32,
) -> Result<()> {
    let n = ids.len();
    if n == 0 {
        return Err(MosaicError::EmptyLayout);
    }
    if n == 1 {
        store.get_mut(ids[0])?.fill_to_rect(bound, now);
        return Ok(());
    }

    // Snapshot footprints, tallest first; everything below works on the
    // snapshot and only touches the store once a feasible pack exists.
    let mut order: Vec<usize> = (0..n).collect();
    let sizes: Vec<Vec2> = ids
        .iter()
        .map(|&id| {
            let obj = store.get(id)?;
            Ok(Vec2::new(obj.dest_total_width(), obj.dest_total_height()))
        })
        .collect::<Result<_>>()?;
    order.sort_by(|&a, &b| {
        sizes[b]
            .y
            .partial_cmp(&sizes[a].y)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut scale = 1.0_f32;
    let mut best: Option<(f32, Vec<(usize, Vec2)>)> = None;
    for _ in 0..opts.max_rounds {
        let scaled: Vec<(usize, Vec2)> = order
            .iter()
            .map(|&i| (i, Vec2::new(sizes[i].x * scale, sizes[i].y * scale)))
            .collect();
        let mut packed = Vec::with_capacity(n);
        if pack(&scaled, bound, &mut packed) == n {
            best = Some((scale, packed));
            scale *= 1.0 + opts.step;
        } else {
            // Shrinking past an already-feasible scale cannot improve.
            if best.is_some() {
                break;
            }
            scale *= 1.0 - opts.step;
        }
    }
    let (scale, packed) = best.ok_or(MosaicError::PackFailed(n))?;

    for (index, center) in packed {
        let id = ids[index];
        let width = sizes[index].x * scale;
        let obj = store.get_mut(id)?;
        obj.set_total_width(width, now);
        obj.move_to(center.x, center.y - obj.dest_center_offset_y(), now);
    }
    Ok(())
}

/// Places sizes from the front of `pending` into `free` lower-left-first,
/// splitting the remaining space into a right strip then a top strip.
/// Returns how many of `pending` were placed; centers land in `out`.
fn pack(pending: &[(usize, Vec2)], free: Bounds, out: &mut Vec<(usize, Vec2)>) -> usize {
    let Some(&(index, size)) = pending.first() else {
        return 0;
    };
    if size.x > free.width() || size.y > free.height() {
        return 0;
    }
    out.push((
        index,
        Vec2::new(free.left + size.x / 2.0, free.bottom + size.y / 2.0),
    ));
    let right = Bounds::new(free.left + size.x, free.right, free.bottom + size.y, free.bottom);
    let top = Bounds::new(free.left, free.right, free.top, free.bottom + size.y);
    let mut placed = 1;
    placed += pack(&pending[placed..], right, out);
    placed += pack(&pending[placed..], top, out);
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneObject, StreamInfo};

    fn store_with(n: usize, aspect: f32) -> (ObjectStore, Vec<ObjectId>) {
        let mut store = ObjectStore::new();
        let ids = (0..n)
            .map(|i| {
                let info = StreamInfo::new(format!("src{i}")).with_aspect(aspect);
                let mut obj = SceneObject::video(&info);
                obj.set_animated(false);
                store.insert(obj)
            })
            .collect();
        (store, ids)
    }

    fn arrange(
        strategy: Strategy,
        outer: Bounds,
        inner: Option<Bounds>,
        store: &mut ObjectStore,
        ids: &[ObjectId],
    ) -> Result<()> {
        LayoutEngine::new().arrange(
            &strategy,
            outer,
            inner,
            &LayoutData::objects(ids.to_vec()),
            store,
            0.0,
        )
    }

    #[test]
    fn strategy_names_parse_and_round_trip() {
        for name in ["grid", "perimeter", "focus", "aspectFocus", "tiling"] {
            let strategy: Strategy = name.parse().unwrap();
            assert_eq!(strategy.name(), name);
        }
        assert!(matches!(
            "spiral".parse::<Strategy>(),
            Err(MosaicError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn ten_objects_form_a_four_by_three_grid_with_restrided_last_row() {
        let (mut store, ids) = store_with(10, 1.33);
        let bound = Bounds::from_center(0.0, 0.0, 16.0, 9.0);
        arrange(Strategy::default(), bound, None, &mut store, &ids).unwrap();

        // ceil(sqrt(10)) = 4 columns, 3 rows; rows 1-2 use a stride of 4.
        let first = store.get(ids[0]).unwrap().dest_total_bounds();
        assert!((first.center_x() - -6.0).abs() < 1e-3);
        let fourth = store.get(ids[3]).unwrap().dest_total_bounds();
        assert!((fourth.center_x() - 6.0).abs() < 1e-3);

        // Row 3 holds objects 9 and 10 with the stride recomputed for two
        // slots, so the 10th lands at x = +4 rather than x = -2.
        let ninth = store.get(ids[8]).unwrap().dest_total_bounds();
        let tenth = store.get(ids[9]).unwrap().dest_total_bounds();
        assert!((ninth.center_x() - -4.0).abs() < 1e-3);
        assert!((tenth.center_x() - 4.0).abs() < 1e-3);
        assert!((ninth.center_y() - tenth.center_y()).abs() < 1e-3);
    }

    #[test]
    fn grid_destinations_stay_inside_the_bound_with_distinct_centers() {
        for n in [1usize, 2, 3, 5, 7, 10, 13] {
            let (mut store, ids) = store_with(n, 1.33);
            let bound = Bounds::from_center(1.0, -2.0, 20.0, 12.0);
            arrange(Strategy::default(), bound, None, &mut store, &ids).unwrap();
            let mut centers: Vec<(f32, f32)> = Vec::new();
            for &id in &ids {
                let footprint = store.get(id).unwrap().dest_total_bounds();
                assert!(
                    bound.contains_rect(&footprint.shrunk(0.999)),
                    "object escaped bound for n={n}"
                );
                let center = (footprint.center_x(), footprint.center_y());
                assert!(
                    !centers
                        .iter()
                        .any(|&(x, y)| (x - center.0).abs() < 1e-4 && (y - center.1).abs() < 1e-4),
                    "coincident centers for n={n}"
                );
                centers.push(center);
            }
        }
    }

    #[test]
    fn explicit_grid_counts_too_small_fail_without_moving_anything() {
        let (mut store, ids) = store_with(6, 1.33);
        let before: Vec<_> = ids
            .iter()
            .map(|&id| store.get(id).unwrap().dest_pos())
            .collect();
        let strategy = Strategy::Grid(GridOptions {
            cols: Some(2),
            rows: Some(2),
            ..GridOptions::default()
        });
        let bound = Bounds::default();
        let err = arrange(strategy, bound, None, &mut store, &ids).unwrap_err();
        assert!(matches!(err, MosaicError::GridOverflow { objects: 6, .. }));
        for (&id, &pos) in ids.iter().zip(&before) {
            assert_eq!(store.get(id).unwrap().dest_pos(), pos);
        }
    }

    #[test]
    fn single_object_fills_the_constrained_dimension() {
        let bound = Bounds::from_center(0.0, 0.0, 16.0, 9.0);
        for strategy in [
            Strategy::Grid(GridOptions::default()),
            Strategy::Tiling(TilingOptions::default()),
        ] {
            let (mut store, ids) = store_with(1, 1.33);
            arrange(strategy, bound, None, &mut store, &ids).unwrap();
            let obj = store.get(ids[0]).unwrap();
            // 1.33 content is squarer than the 16:9 bound, so height binds.
            assert!((obj.dest_total_height() - 9.0).abs() < 1e-3);
            assert!(obj.dest_total_width() < 16.0);
        }
    }

    #[test]
    fn band_counts_always_sum_to_n() {
        let outer = Bounds::from_center(0.0, 0.0, 32.0, 18.0);
        for n in 1..=40 {
            for (w, h) in [(16.0, 14.4), (8.0, 4.0), (28.0, 6.0)] {
                let inner = Bounds::from_center(0.0, 0.0, w, h);
                let (top, right, bottom, left) = band_counts(n, inner, outer);
                assert_eq!(top + right + bottom + left, n, "n={n} hole={w}x{h}");
            }
        }
    }

    #[test]
    fn one_object_perimeter_goes_entirely_to_the_top_band() {
        let outer = Bounds::from_center(0.0, 0.0, 32.0, 18.0);
        // Hole covering 50% of width and 80% of height.
        let inner = Bounds::from_center(0.0, 0.0, 16.0, 14.4);
        assert_eq!(band_counts(1, inner, outer), (1, 0, 0, 0));

        let (mut store, ids) = store_with(1, 1.33);
        arrange(
            Strategy::Perimeter(PerimeterOptions::default()),
            outer,
            Some(inner),
            &mut store,
            &ids,
        )
        .unwrap();
        let footprint = store.get(ids[0]).unwrap().dest_total_bounds();
        assert!(footprint.center_y() > inner.top);
        // The lone object fully fills the band's constrained dimension
        // (band height is outer.top - caption strip down to inner.top).
        let band_height = (outer.top - CAPTION_STRIP) - inner.top;
        assert!((footprint.height() - band_height).abs() < 1e-4);
        assert!((footprint.center_x() - 0.0).abs() < 1e-4);
    }

    #[test]
    fn single_object_fullscreens_even_with_explicit_counts() {
        let (mut store, ids) = store_with(1, 1.33);
        let bound = Bounds::from_center(0.0, 0.0, 16.0, 9.0);
        let strategy = Strategy::Grid(GridOptions {
            cols: Some(1),
            rows: Some(1),
            ..GridOptions::default()
        });
        arrange(strategy, bound, None, &mut store, &ids).unwrap();
        let obj = store.get(ids[0]).unwrap();
        assert!((obj.dest_total_height() - 9.0).abs() < 1e-3);
    }

    #[test]
    fn perimeter_bands_hug_the_hole_width_and_outer_height() {
        let outer = Bounds::from_center(0.0, 0.0, 32.0, 18.0);
        let inner = Bounds::from_center(0.0, 0.0, 18.0, 10.0);
        let (mut store, ids) = store_with(8, 1.33);
        assert_eq!(band_counts(8, inner, outer), (2, 2, 2, 2));
        arrange(
            Strategy::Perimeter(PerimeterOptions::default()),
            outer,
            Some(inner),
            &mut store,
            &ids,
        )
        .unwrap();

        // Top and bottom bands stay over the hole, never the corners.
        for &id in &[ids[0], ids[1], ids[4], ids[5]] {
            let footprint = store.get(id).unwrap().dest_total_bounds();
            assert!(footprint.center_x() > inner.left);
            assert!(footprint.center_x() < inner.right);
        }
        // Side columns run the whole outer height with edge-pinned ends.
        for &id in &[ids[2], ids[3], ids[6], ids[7]] {
            let footprint = store.get(id).unwrap().dest_total_bounds();
            assert!(
                footprint.center_y().abs() > inner.top,
                "side object should reach past the hole toward the bound edge"
            );
        }
        let first_right = store.get(ids[2]).unwrap().dest_total_bounds();
        assert!((first_right.center_y() - (outer.top - 0.2)).abs() < 1e-3);
    }

    #[test]
    fn perimeter_places_every_band_outside_the_hole() {
        let outer = Bounds::from_center(0.0, 0.0, 32.0, 18.0);
        let inner = Bounds::from_center(0.0, 0.0, 18.0, 10.0);
        let (mut store, ids) = store_with(8, 1.33);
        arrange(
            Strategy::Perimeter(PerimeterOptions::default()),
            outer,
            Some(inner),
            &mut store,
            &ids,
        )
        .unwrap();
        for &id in &ids {
            let footprint = store.get(id).unwrap().dest_total_bounds();
            assert!(
                !inner.contains(footprint.center_x(), footprint.center_y()),
                "ring object centered inside the hole"
            );
            assert!(outer.contains(footprint.center_x(), footprint.center_y()));
        }
    }

    #[test]
    fn focus_splits_inners_into_the_hole_and_outers_around_it() {
        let outer = Bounds::from_center(0.0, 0.0, 32.0, 18.0);
        let hole = Bounds::from_center(0.0, 0.0, 18.0, 10.0);
        let (mut store, ids) = store_with(7, 1.33);
        let data = LayoutData::default()
            .with_role(LayoutRole::Inners, ids[..2].to_vec())
            .with_role(LayoutRole::Outers, ids[2..].to_vec());
        LayoutEngine::new()
            .arrange(
                &Strategy::Focus(FocusOptions::default()),
                outer,
                Some(hole),
                &data,
                &mut store,
                0.0,
            )
            .unwrap();
        for &id in &ids[..2] {
            let footprint = store.get(id).unwrap().dest_total_bounds();
            assert!(hole.contains(footprint.center_x(), footprint.center_y()));
        }
        for &id in &ids[2..] {
            let footprint = store.get(id).unwrap().dest_total_bounds();
            assert!(!hole.contains(footprint.center_x(), footprint.center_y()));
        }
    }

    #[test]
    fn focus_without_outers_degenerates_to_a_plain_grid() {
        let outer = Bounds::from_center(0.0, 0.0, 32.0, 18.0);
        let hole = Bounds::from_center(10.0, 5.0, 4.0, 3.0);
        let (mut store, ids) = store_with(4, 1.33);
        let data = LayoutData::default()
            .with_role(LayoutRole::Inners, ids.clone())
            .with_role(LayoutRole::Outers, Vec::new());
        LayoutEngine::new()
            .arrange(
                &Strategy::Focus(FocusOptions::default()),
                outer,
                Some(hole),
                &data,
                &mut store,
                0.0,
            )
            .unwrap();
        // Ignores the hole entirely: objects spread over the whole bound.
        let spread = ids
            .iter()
            .map(|&id| store.get(id).unwrap().dest_pos().x)
            .fold((f32::MAX, f32::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
        assert!(spread.1 - spread.0 > outer.width() / 4.0);
    }

    #[test]
    fn focus_missing_a_role_is_reported() {
        let (mut store, ids) = store_with(3, 1.33);
        let data = LayoutData::default().with_role(LayoutRole::Inners, ids.clone());
        let err = LayoutEngine::new()
            .arrange(
                &Strategy::Focus(FocusOptions::default()),
                Bounds::default(),
                Some(Bounds::default().shrunk(0.5)),
                &data,
                &mut store,
                0.0,
            )
            .unwrap_err();
        assert!(matches!(err, MosaicError::MissingRole("outers")));
    }

    #[test]
    fn aspect_focus_hole_never_crosses_the_outer_bound() {
        // A tall bound forces the height-driven sizing branch.
        for bound in [
            Bounds::from_center(0.0, 0.0, 32.0, 18.0),
            Bounds::from_center(0.0, 0.0, 10.0, 30.0),
        ] {
            let hole = derive_hole(bound, AspectFocusOptions::default());
            assert!(bound.contains_rect(&hole), "hole escaped {bound:?}");
            assert!((hole.aspect() - 1.5555).abs() < 1e-3);
        }
    }

    #[test]
    fn tiling_keeps_mixed_aspects_inside_the_bound_and_disjoint() {
        let mut store = ObjectStore::new();
        let mut ids = Vec::new();
        for (i, aspect) in [1.33, 1.78, 1.0, 1.78, 1.33, 0.75].iter().enumerate() {
            let mut obj =
                SceneObject::video(&StreamInfo::new(format!("s{i}")).with_aspect(*aspect));
            obj.set_animated(false);
            obj.set_scale(3.0 + i as f32, 3.0 + i as f32, 0.0);
            ids.push(store.insert(obj));
        }
        let bound = Bounds::from_center(0.0, 0.0, 40.0, 24.0);
        arrange(
            Strategy::Tiling(TilingOptions::default()),
            bound,
            None,
            &mut store,
            &ids,
        )
        .unwrap();

        let footprints: Vec<Bounds> = ids
            .iter()
            .map(|&id| store.get(id).unwrap().dest_total_bounds())
            .collect();
        for (i, a) in footprints.iter().enumerate() {
            assert!(
                bound.contains_rect(&a.shrunk(0.999)),
                "object {i} escaped the bound"
            );
            assert!(store.get(ids[i]).unwrap().dest_scale().x > 0.0);
            for (j, b) in footprints.iter().enumerate().skip(i + 1) {
                assert!(
                    !a.shrunk(0.99).intersects(&b.shrunk(0.99)),
                    "objects {i} and {j} overlap"
                );
            }
        }
    }

    #[test]
    fn tiling_shrinks_oversized_objects_until_they_fit() {
        let (mut store, ids) = store_with(4, 1.33);
        for &id in &ids {
            store.get_mut(id).unwrap().set_scale(30.0, 30.0, 0.0);
        }
        let bound = Bounds::from_center(0.0, 0.0, 20.0, 12.0);
        arrange(
            Strategy::Tiling(TilingOptions::default()),
            bound,
            None,
            &mut store,
            &ids,
        )
        .unwrap();
        for &id in &ids {
            let footprint = store.get(id).unwrap().dest_total_bounds();
            assert!(bound.contains_rect(&footprint.shrunk(0.999)));
        }
    }

    #[test]
    fn empty_object_set_is_rejected() {
        let mut store = ObjectStore::new();
        let err = arrange(Strategy::default(), Bounds::default(), None, &mut store, &[])
            .unwrap_err();
        assert!(matches!(err, MosaicError::EmptyLayout));
    }

    #[test]
    fn group_rearrange_tiles_members_inside_the_group() {
        let mut store = ObjectStore::new();
        let group = store.insert(SceneObject::group("room", GroupStyle::Aspect));
        store.get_mut(group).unwrap().set_animated(false);
        store.get_mut(group).unwrap().set_scale(12.0, 9.0, 0.0);
        store.get_mut(group).unwrap().set_pos(0.0, 0.0);
        let members: Vec<ObjectId> = (0..4)
            .map(|i| {
                let mut obj =
                    SceneObject::video(&StreamInfo::new(format!("m{i}")).with_aspect(1.33));
                obj.set_animated(false);
                let id = store.insert(obj);
                store.attach(group, id).unwrap();
                id
            })
            .collect();
        rearrange_group(&mut store, group, 0.0).unwrap();

        let group_bound = store.get(group).unwrap().dest_bounds();
        // 4 members: 2x2 grid, group re-aspected to 1.33.
        assert!((group_bound.aspect() - 1.33).abs() < 1e-2);
        for &id in &members {
            let footprint = store.get(id).unwrap().dest_total_bounds();
            assert!(group_bound.contains_rect(&footprint.shrunk(0.999)));
        }
    }

    #[test]
    fn group_rearrange_rejects_non_groups() {
        let mut store = ObjectStore::new();
        let id = store.insert(SceneObject::plain("solo"));
        assert!(matches!(
            rearrange_group(&mut store, id, 0.0),
            Err(MosaicError::NotAGroup(_))
        ));
    }
}
