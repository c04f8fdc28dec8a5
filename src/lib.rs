//! Channel-backed streams with per-operator parallelism.
//!
//! This crate offers a lazily-evaluated stream abstraction in the style of
//! collection pipelines: a chain of intermediate operators (`map`, `filter`,
//! `flat_map`, `sort`, `distinct`, `skip`, `limit`, `take_while`,
//! `drop_while`, `peek`, `concat`) closed by a terminal operator
//! (`for_each`, `reduce`, `collect`, `count`, the match family,
//! `find_first`).
//!
//! Main features:
//!
//! - Explicit, per-operator parallelism control via [`with_parallelism`] and
//!   [`with_sync`]
//! - Eager execution on spawned tasks connected by bounded channels
//! - Short-circuiting terminal operators that cancel the producer instead of
//!   draining it
//! - A composable [`Collector`](collector::Collector) protocol for mutable
//!   reductions
//! - Built on the Tokio async runtime
//!
//! Example:
//!
//! ```rust
//! use sluice::{collector, with_parallelism, Opts, Stream};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let by_remainder = Stream::range(0, 1000)
//!     .map(|x| async move { x * x }, with_parallelism(8))
//!     .filter(|x| x % 2 == 0, Opts::default())
//!     .collect(collector::group_by(|x| x % 10))
//!     .await;
//!
//! assert_eq!(by_remainder.keys().len(), 3); // even squares end in 0, 4 or 6
//! # });
//! ```
//!
//! ## Stages and channels
//!
//! A [`Stream`] wraps the receiving end of a bounded channel. Every operator
//! spawns worker tasks that read that channel, do their work, and write to a
//! fresh output channel owned by the stage they return:
//!
//! ```rust, ignore
//! source task ──channel──> map workers ──channel──> filter worker ──channel──> terminal
//! ```
//!
//! With parallelism 1 a stage is a single worker and preserves order. With
//! parallelism `n` the stage is `n` workers competing over the shared input
//! channel; outputs arrive in completion order. The parallelism set on one
//! operator is inherited by the stages built after it until overridden.
//!
//! ## Cancellation
//!
//! Early-terminating operators (`limit`, `take_while`, `any_match`,
//! `find_first`, `close`) drop their input channel. Upstream workers observe
//! the failed send and stop, and the cancellation cascades to the source.
//! Short-circuiting over an unbounded stream therefore returns promptly:
//!
//! ```rust
//! use sluice::{Opts, Stream};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let found = Stream::range(0, 1_000_000_000)
//!     .any_match(|x| *x == 99, Opts::default())
//!     .await;
//! assert!(found);
//! # });
//! ```
//!
//! ## Panic handling
//!
//! Operator callbacks run inside spawned tasks. The stream retains every
//! join handle; terminal operators await them once the data is consumed and
//! re-raise the first captured panic at the terminal call site, so a
//! panicking callback cannot vanish into a detached task.
//!
//! ```rust
//! use sluice::{Opts, Stream};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let result = tokio::spawn(async {
//!     Stream::just(vec![1, 2, 3])
//!         .map(|x| async move { assert!(x != 2, "oh no"); x }, Opts::default())
//!         .to_vec()
//!         .await
//! })
//! .await;
//!
//! assert!(result.is_err());
//! # });
//! ```

pub mod collector;
mod options;
mod stage;
mod stream;

#[cfg(test)]
mod test_utils;

pub use collector::Collector;
pub use options::{with_parallelism, with_sync, Opts};
pub use stream::Stream;
