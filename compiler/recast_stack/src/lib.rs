//! Stack growth guard for the recursive Recast passes.
//!
//! Every pass in `recast_canon` (factory, expander, reducer, normalizer,
//! synthesizer) is a structural recursion over a node tree whose depth
//! follows the source expression: a long `a && b && c && ...` chain parsed
//! left-associatively, or a deep member chain `a.b.c.d...`, recurses once
//! per level. Hosts hand us whatever the user selected, so depth is not
//! bounded by anything we control.
//!
//! # Platform Support
//!
//! - **Native targets**: grows the stack on demand with `stacker`.
//! - **WASM targets**: plain call (the runtime owns the stack).
//!
//! # Usage
//!
//! ```text
//! fn reduce(&self, node: &Node, sense: bool) -> Node {
//!     ensure_sufficient_stack(|| match node {
//!         // ... recursive cases ...
//!     })
//! }
//! ```

/// Grow when less than this much stack remains (64KB).
///
/// Pass frames are small (a few `Arc`s and a `Vec`), so a smaller red zone
/// than a parser would need is enough.
const RED_ZONE: usize = 64 * 1024;

/// Size of each newly allocated stack segment (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM version: call directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
