pub mod icons;
pub mod progress;
pub mod table;

pub use progress::{BatchUI, UiMode};
pub use table::render_jobs;
