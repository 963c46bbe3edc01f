pub mod layer_view;
pub mod map_view;
pub mod risk_view;
pub mod runs_view;
pub mod submit_view;

pub use layer_view::LayerView;
pub use map_view::MapView;
pub use risk_view::{RiskAction, RiskView};
pub use runs_view::{RunsAction, RunsView};
pub use submit_view::{SubmitAction, SubmitView};
