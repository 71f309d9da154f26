pub mod connection;
pub mod metadata;
pub mod query;
pub mod semantic;

pub use connection::{ConnectionDescriptor, EngineKind};
pub use metadata::{
    ColumnMetadata, DatabaseMetadata, ForeignKeyColumnPair, ForeignKeyMetadata, FunctionMetadata,
    IndexMetadata, StoredProcedureMetadata, TableMetadata, ViewMetadata,
};
pub use query::{QueryRequest, QueryResult, SampleParams};
pub use semantic::{
    BusinessMetric, GlossaryTerm, SemanticColumn, SemanticModel, SemanticTable,
};
