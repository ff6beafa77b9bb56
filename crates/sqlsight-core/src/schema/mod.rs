//! Schema description model and loaders

mod builder;
mod catalog;

pub use builder::SchemaBuilder;
pub use catalog::{Catalog, Column, QualifiedName, Schema, Table};
