pub mod align;
pub mod builder;
pub mod config;
pub mod constants;
pub mod direction;
pub mod door;
pub mod error;
pub mod generator;
pub mod graph;
pub mod layout;
pub mod location;
pub mod oracle;
pub mod pipeline;
pub mod policy;
pub mod retry;
pub mod room;
pub mod selector;
pub mod session;
pub mod template;

pub mod visual;
pub use visual::*;

pub use builder::{GrowthOutcome, GrowthReport, RoomGraphBuilder};
pub use config::{DoorSelectionPolicy, GenerationConfig};
pub use error::{GenerationError, GenerationResult};
pub use generator::*;
pub use layout::Layout;
pub use location::{Pose, WorldPos};
pub use oracle::{AlwaysBlocked, FootprintOracle, GeometryOracle, OpenPlane};
pub use pipeline::{StepBudget, StepResult};
pub use session::GenerationSession;
pub use template::{RoomTemplate, RoomType, TemplateCatalog, WeightedVariant};
