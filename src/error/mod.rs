mod types;

pub use types::{GridError, Result};
