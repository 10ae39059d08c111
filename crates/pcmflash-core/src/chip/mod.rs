//! Flash chip types and lookup tables
//!
//! This module translates the identifier reported by the kernel into a
//! flash memory type, and a flash memory type into the list of address
//! ranges whose CRCs are verified.

mod database;
mod types;

pub use database::*;
pub use types::*;
