//! Schema model for boxql.
//!
//! This crate provides:
//! - `schema`: The schema model and [`SchemaBuilder`]
//! - `sdl`: Building a schema from SDL source
//! - `printer`: Printing a schema back to SDL
//! - `error`: Schema construction errors

pub mod error;
pub mod printer;
pub mod schema;
pub mod sdl;

pub use error::SchemaError;
pub use printer::print_schema;
pub use schema::{
    DirectiveDefinition, EnumDef, EnumValueDef, FieldDef, InputFieldDef, InputObjectDef,
    InterfaceDef, ObjectDef, ScalarDef, Schema, SchemaBuilder, TypeDef, TypeRef, UnionDef,
};
pub use boxql_syntax::{DirectiveLocation, OperationType};
