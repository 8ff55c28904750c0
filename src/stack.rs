//! Stack safety for the recursive stages.
//!
//! The parser, resolver and interpreter all recurse once per nesting level of
//! the program.  Their recursive entry points run through
//! [`ensure_sufficient_stack`], which moves onto a fresh heap-allocated stack
//! segment when the current one runs low, so deep programs are bounded by the
//! interpreter's call-depth limit instead of the thread's native stack.

/// Run `f`, growing the stack first if less than the red zone is left.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (128KB red zone).
    const RED_ZONE: usize = 128 * 1024;

    /// Stack space to allocate when growing (2MB).
    const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
