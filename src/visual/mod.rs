pub mod layout;
pub mod summary;

pub use layout::{layout, Color, Scene, SceneEdge, SceneNode};
pub use summary::SummaryCache;
