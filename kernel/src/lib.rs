//! Work-group kernel bodies.
//!
//! Each function here is the body of one work-group of a kernel launch: it
//! sees the slice of global memory its work-group owns plus, where the kernel
//! needs one, a scratch slice standing in for work-group local memory. The
//! host backend decides how work-groups are scheduled; nothing in this crate
//! assumes a particular backend or allocates.

#![cfg_attr(not(test), no_std)]

pub mod bitonic;
pub mod radix;
pub mod reduce;
pub mod scan;
pub mod transpose;
