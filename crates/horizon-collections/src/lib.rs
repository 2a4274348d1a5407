//! Horizon Collections - live filtered, sorted and grouped views over
//! observable collections.
//!
//! This crate provides the collection view engine behind Horizon Lattice list
//! controls. See the [`view`] module for the view types and
//! [`horizon_collections_core`] for the signal system they are built on.
//!
//! # Example
//!
//! ```
//! use horizon_collections::view::{FlatView, ObservableVec, ViewShaping};
//!
//! let numbers = ObservableVec::shared(vec![1, 2, 3, 4]);
//! let evens = FlatView::new(numbers.clone(), ViewShaping::new().filter(|n: &i32| n % 2 == 0))?;
//!
//! numbers.push(6);
//! assert_eq!(evens.items(), vec![2, 4, 6]);
//! # Ok::<(), horizon_collections::ViewError>(())
//! ```

pub mod error;
pub mod view;

pub use error::{Result, ViewError};
pub use horizon_collections_core::{ConnectionGuard, ConnectionId, Signal};
