pub mod compose;
pub mod extract;
pub mod fetch;
pub mod pipeline;
