//! Global (inter-node) sharing strategies (C8, §4.8): ring, all-gather, and
//! tree-aggregated topologies over the transport of `transport`, plus the
//! shared termination sub-protocol of §4.8.1.

pub mod all_gather;
pub mod database;
pub mod ring;
pub mod termination_protocol;
pub mod tree;
pub mod transport;
pub mod wire;

/// One round of a global strategy (§4.8): exchange whatever is pending in
/// the gateway database with peers, and report whether the Sharer loop
/// should stop. An alias of `sharer::SharingStrategy`, the same trait the
/// local strategies implement, so both kinds are driven by the same outer
/// Sharer loop (§4.4) through one trait-object type.
pub use crate::sharer::SharingStrategy as GlobalSharingStrategy;
