/// Per-instance tuning knobs (§1 "a small `Config` struct"), in the same
/// shape as `anathema_runtime::Builder`'s constructor arguments: a handful
/// of plain fields with sensible defaults, not a builder of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// How often the per-coroutine event timer rescans expression
    /// variables (§4.H "10 ms by default").
    pub event_timer_interval_ms: u64,
    /// Default timeout handed to a `SYNC` fetch when the caller doesn't
    /// supply one of its own (§4.I).
    pub sync_fetch_timeout_ms: u64,
    /// A caller-supplied hint for roughly how many coroutines an instance
    /// will carry at once; `0` means "no hint" and leaves the heap's
    /// backing slab to grow on demand.
    pub heap_capacity_hint: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_timer_interval_ms: hvml_timer::DEFAULT_INTERVAL_MS,
            sync_fetch_timeout_ms: hvml_dom::DEFAULT_TIMEOUT.as_millis() as u64,
            heap_capacity_hint: 0,
        }
    }
}
