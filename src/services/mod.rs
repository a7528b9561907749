pub mod batch_runner;
pub mod openai_client;
pub mod orchestrator;
pub mod rate_limiter;
pub mod search_client;

pub use batch_runner::*;
pub use openai_client::*;
pub use orchestrator::*;
pub use rate_limiter::*;
pub use search_client::*;
