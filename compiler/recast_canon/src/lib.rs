//! Recast Canonicalizer
//!
//! Rewrites a boolean condition over member accesses, type tests and
//! constant comparisons into an equivalent structural pattern:
//!
//! ```text
//! x.P == 1 && x.Q == 2 && x is T t    →    x is T { P: 1, Q: 2 } t
//! ```
//!
//! # Pipeline
//!
//! 1. **Factory** ([`factory`]): host expression → node tree, in which every
//!    test carries its full access chain.
//! 2. **Expander** ([`expand`]): pattern subtrees flattened into the same
//!    chain-carrying form.
//! 3. **Reducer** ([`reduce`]): tests sharing an access prefix are grouped
//!    under one `Pair`, negations pushed to the leaves.
//! 4. **Normalizer** ([`normalize`]): identity steps (`Type`, `NotNull`,
//!    `Variable`) lifted out of chains. Reduce and normalize alternate until
//!    a fixed point ([`canonicalize`]).
//! 5. **Synthesizer** ([`synth`]): canonical tree → patterns and `is`
//!    expressions, with a residual for what has no pattern form.
//! 6. **Legality** ([`legality`]): rejects outputs that declare variables
//!    where they would not be definitely assigned.
//!
//! [`refactor`] runs all of it and returns a [`Refactoring`] or a
//! [`Rejection`].
//!
//! # Tracing
//!
//! Every pass logs its result at `debug` under its module target. Set
//! `RUST_LOG=recast_canon=debug` and call [`init_tracing`] to see a run.

mod config;
mod errors;
pub mod expand;
pub mod factory;
pub mod legality;
pub mod normalize;
pub mod reduce;
mod refactor;
pub mod synth;

#[cfg(test)]
mod test_helpers;

use std::sync::Once;

pub use config::{
    BindingPolicy, BindingScope, RecastConfig, MAX_POSITIONAL_ARITY, MAX_ROUNDS, MIN_RANGE_RUN,
};
pub use errors::{Rejection, SynthError};
pub use expand::expand;
pub use factory::analyze;
pub use legality::check_bindings;
pub use normalize::{canonicalize, normalize};
pub use reduce::reduce;
pub use refactor::{refactor, Refactoring};
pub use synth::{synthesize, synthesize_pattern, Synthesis};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debugging.
///
/// Call this at the start of a host or test run to enable debug output.
/// Uses the `RUST_LOG` environment variable for filtering.
///
/// Example:
/// ```bash
/// RUST_LOG=recast_canon=debug cargo test -p recast_canon
/// RUST_LOG=recast_canon::synth=trace cargo test -p recast_canon
/// ```
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
