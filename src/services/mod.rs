pub mod database;
pub mod executor;
pub mod introspection;
pub mod scripts;
pub mod semantic;

pub use executor::QueryExecutor;
pub use introspection::MetadataIntrospector;
pub use semantic::SemanticOverlay;
