pub mod config;
pub mod dates;
pub mod error;
pub mod model;
pub mod normalize;
pub mod query;
pub mod stats;
pub mod storage;
pub mod store;

pub use error::AppError;
pub use model::{Priority, Status, Task};
pub use query::{Query, Row, SortMode};
pub use stats::Stats;
pub use store::{NewTask, TaskPatch, TaskStore};
