//! Core library for the Mosaic live video collage.
//!
//! The crate is organised around three subsystems: a geometry/animation
//! model (objects ease toward destination positions, scales and colors), a
//! declarative layout engine (grid, perimeter ring, focus, aspect-focus and
//! tiling strategies over a bounded region), and a scene registry that owns
//! every live object and enforces the threading rules — producer threads
//! mutate under a single lock, and all tree-view and resource teardown work
//! is deferred to the render thread's frame tick.

pub mod animation;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod registry;
pub mod scene;

pub use animation::{Animated, EasingProfile, Lerp};
pub use config::AppConfig;
pub use error::{MosaicError, Result};
pub use geometry::{Bounds, Color, Vec2, Vec3};
pub use layout::{
    AspectFocusOptions, FocusOptions, GridOptions, LayoutData, LayoutEngine, LayoutRole,
    PerimeterOptions, Placement, PlacementReport, Strategy, TilingOptions,
};
pub use registry::{
    FrameStats, LayoutPolicy, NullReleaser, NullTreeView, OwnerThreadQueue, RegistrySettings,
    ResourceReleaser, SceneRegistry, ThreadMode, TreeView,
};
pub use scene::{
    Capabilities, GroupStyle, ObjectId, ObjectKind, ObjectStore, ResourceHandle, SceneObject,
    StreamInfo,
};
