// In-memory registries: tracked alerts and the asset/contact directory
pub mod alerts;
pub mod assets;

// Re-export key types for easier access
pub use alerts::{AlertKey, AlertRecord, AlertRegistry, AlertState, AlertUpdate, Severity, UpsertOutcome};
pub use assets::{AssetDirectory, AssetRecord};
