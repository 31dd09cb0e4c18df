//! Name and type resolution strategies plugged into the graph model builder.

pub mod name;
pub mod types;

pub use name::{JavaConventionNameResolver, NameResolver, NameResolverKind, OriginalNameResolver};
pub use types::{DriverTypeMap, TargetType, TypeResolver};
