//! Shared types for describing a gadget's desired volume layout, the
//! physical volume observed on disk, and the bookkeeping produced while
//! reconciling the two.

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate serde_derive;

mod disk;
mod encryption;
mod error;
mod fs;
mod role;
mod structure;
mod table;

pub use self::disk::*;
pub use self::encryption::*;
pub use self::error::*;
pub use self::fs::*;
pub use self::role::*;
pub use self::structure::*;
pub use self::table::*;
