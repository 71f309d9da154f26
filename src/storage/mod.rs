pub mod registry;

pub use registry::ConnectionRegistry;
