//! Host object model for the Lua scripting engine.
//!
//! The analysis host (disassembly, IL lifting, symbol tables) is a black box.
//! This crate describes the slice of it the scripting engine talks to:
//!
//! - [`host`] traits for binary views, functions and basic blocks
//! - [`model`] plain value records returned by host queries
//! - [`HostRef`] non-owning, identity-comparable handles
//! - [`Metadata`] the tagged union used for structured metadata values
//! - [`memory`] an in-memory analysis database loaded from TOML, used by the
//!   CLI host shell and by tests
//!
//! Every query is infallible: "nothing here" is an empty `Option`/`Vec`,
//! never an error.

pub mod address;
pub mod error;
pub mod handle;
pub mod host;
pub mod memory;
pub mod metadata;
pub mod model;

pub use address::{parse_address, Address};
pub use error::DatabaseError;
pub use handle::HostRef;
pub use host::{BasicBlock, BinaryView, Function};
pub use metadata::Metadata;
pub use model::{
    BlockEdge, BranchKind, IlFunction, IlLevel, ResolvedVariable, Section, SectionSemantics,
    Symbol, SymbolKind, Tag, TagType, VariableKind, VariableRef,
};
