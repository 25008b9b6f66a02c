// Every recursive walk in the interpreter goes through `with_stack`, so the
// depth it can reach is bounded by memory instead of the host thread's stack

// Grow once less than this much stack remains
const RED_ZONE: usize = 128 * 1024;

// Size of each newly allocated stack segment
const SEGMENT_SIZE: usize = 4 * 1024 * 1024;

pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}
