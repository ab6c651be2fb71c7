pub mod fill;
pub mod history;
pub mod search;
pub mod status;
pub mod test_llm;

pub use fill::{cmd_fill, FillArgs};
pub use history::{cmd_history, HistoryArgs};
pub use search::{cmd_search, SearchArgs};
pub use status::cmd_status;
pub use test_llm::cmd_test_llm;
