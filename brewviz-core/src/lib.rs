//! Brewviz Core Library - Drink catalog, cup scene model and menu state
//!
//! This library holds everything the terminal and web hosts share: the menu
//! catalog, cup and starfield geometry, the frame driver, the selection state
//! machine and order submission. It never draws or touches the network itself.

pub mod catalog;
pub mod color;
pub mod config;
pub mod controls;
pub mod cup;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod material;
pub mod projection;
pub mod resources;
pub mod rng;
pub mod scene;
pub mod selection;
pub mod starfield;
pub mod submit;
pub mod texture;
pub mod transform;

// Re-export commonly used types
pub use catalog::{Catalog, Category, DrinkRecord, IngredientLayer, MenuFilter};
pub use color::{Rgb, Rgba};
pub use config::{ControlsMode, DeviceProfile, LeavePolicy, ViewerConfig};
pub use controls::OrbitControls;
pub use cup::{CupBuilder, CupConfig, CupGroup, Primitive, PrimitiveKind, Shape};
pub use error::{BuildError, CatalogError, RemoteError, SubmitError, ValidationError};
pub use frame::{FrameDriver, FrameReport, SceneRenderer};
pub use geometry::{Mesh, PointCloud, Triangle, Vertex};
pub use material::{Blending, Material, MaterialKind};
pub use projection::Camera;
pub use scene::{Light, Scene, SurfaceSize, ViewerSession};
pub use selection::{Effect, SelectionMachine, StatusIndicator, StatusTone, UiEvent, ViewState};
pub use starfield::StarField;
pub use submit::{submit_feedback, submit_order, OrderRequest, RemoteStore, Table};
pub use transform::{RotationState, Transform};
