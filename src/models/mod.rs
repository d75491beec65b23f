pub mod decision;
pub mod extraction;
pub mod history;

// Re-exports for convenience
pub use decision::*;
pub use extraction::*;
pub use history::*;
