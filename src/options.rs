use std::num::NonZeroUsize;

/// Per-call execution options for a stream operator.
///
/// An `Opts` value is applied right before the operator spawns its workers.
/// If it carries a parallelism override, it replaces the stage's parallelism
/// for that call, and the stage the operator returns inherits the new value.
/// `Opts::default()` keeps whatever the stream is already configured with.
///
/// Example:
///
/// ```rust
/// use sluice::{with_parallelism, Opts, Stream};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let doubled = Stream::range(0, 100)
///     .map(|x| async move { x * 2 }, with_parallelism(4))
///     // inherited: this stage also runs with 4 workers
///     .filter(|x| x % 3 == 0, Opts::default())
///     .to_vec()
///     .await;
///
/// assert_eq!(doubled.len(), 34);
/// # });
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Opts {
    parallelism: Option<NonZeroUsize>,
}

/// Forces the operator to run with a single worker, preserving input order.
///
/// Equivalent to [`with_parallelism(1)`](with_parallelism).
pub fn with_sync() -> Opts {
    with_parallelism(1)
}

/// Sets the number of workers the operator runs with.
///
/// A value above 1 trades the stream's ordering guarantee for concurrent
/// execution: outputs arrive in completion order, not input order.
///
/// # Panics
///
/// Panics if `parallelism` is 0. A parallelism of zero is a configuration
/// error, never silently clamped.
pub fn with_parallelism(parallelism: usize) -> Opts {
    let parallelism = NonZeroUsize::new(parallelism).expect("parallelism must be greater than 0");

    Opts {
        parallelism: Some(parallelism),
    }
}

impl Opts {
    /// Combines two option values; settings on `other` win.
    pub fn and(self, other: Opts) -> Opts {
        Opts {
            parallelism: other.parallelism.or(self.parallelism),
        }
    }

    pub(crate) fn apply(self, current: usize) -> usize {
        self.parallelism.map(NonZeroUsize::get).unwrap_or(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keeps_current_parallelism() {
        assert_eq!(Opts::default().apply(1), 1);
        assert_eq!(Opts::default().apply(7), 7);
    }

    #[test]
    fn overrides_current_parallelism() {
        assert_eq!(with_parallelism(4).apply(1), 4);
        assert_eq!(with_sync().apply(8), 1);
    }

    #[test]
    fn and_last_setting_wins() {
        let opts = with_parallelism(4).and(with_sync());
        assert_eq!(opts.apply(2), 1);

        let opts = with_sync().and(Opts::default());
        assert_eq!(opts.apply(2), 1);
    }

    #[test]
    #[should_panic(expected = "parallelism must be greater than 0")]
    fn zero_parallelism_panics() {
        with_parallelism(0);
    }
}
