//! Compares a gadget volume's desired layout against an observed on-disk
//! volume and decides which partitions to create, keep, or delete (§4.1).

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;

mod build;
mod checker;
mod error;
mod options;
mod remove;

pub use self::build::{build_partition_list, PlannedStructure};
pub use self::checker::{NullCompatibilityChecker, VolumeCompatibilityChecker};
pub use self::error::ReconcileError;
pub use self::options::{DeletedOffsetSize, ReconcileOptions};
pub use self::remove::remove_created_partitions;
