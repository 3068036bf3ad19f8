/// Policy governing whether the dictionary is allowed to grow its bucket
/// arrays automatically.
///
/// Injected into the [`Dict`](crate::dict::Dict) at construction (or
/// changed later via [`DictConfig::set_resize_mode`]) rather than kept as
/// process-global state, per the design note in the specification this
/// crate implements: a process-wide `dict_can_resize` static makes two
/// dictionaries in the same process unable to run different policies,
/// and makes testing harder than it needs to be.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResizeMode {
    /// Grow as soon as the load factor reaches 1:1.
    Enable,
    /// Only grow once the load factor exceeds `force_resize_ratio`; used
    /// while a fork is believed to be in flight and copy-on-write pages
    /// should be disturbed as little as possible.
    Avoid,
    /// Never grow or shrink automatically.
    Forbid,
}

impl Default for ResizeMode {
    fn default() -> Self {
        ResizeMode::Enable
    }
}

/// The initial size exponent of a freshly allocated table (`1 << 2 == 4`
/// buckets), matching `DICT_HT_INITIAL_EXP` in the original.
pub const INITIAL_SIZE_EXP: u8 = 2;

/// The load factor, expressed as `used / bucket_count`, past which growth
/// is forced even under [`ResizeMode::Avoid`].
pub const DEFAULT_FORCE_RESIZE_RATIO: usize = 5;

/// Configuration injected into a [`Dict`](crate::dict::Dict) at
/// construction time.
#[derive(Clone, Debug)]
pub struct DictConfig {
    resize_mode: ResizeMode,
    force_resize_ratio: usize,
}

impl Default for DictConfig {
    fn default() -> Self {
        Self {
            resize_mode: ResizeMode::default(),
            force_resize_ratio: DEFAULT_FORCE_RESIZE_RATIO,
        }
    }
}

impl DictConfig {
    pub fn new(resize_mode: ResizeMode, force_resize_ratio: usize) -> Self {
        Self {
            resize_mode,
            force_resize_ratio,
        }
    }

    #[inline(always)]
    pub fn resize_mode(&self) -> ResizeMode {
        self.resize_mode
    }

    #[inline(always)]
    pub fn set_resize_mode(&mut self, mode: ResizeMode) {
        self.resize_mode = mode;
    }

    #[inline(always)]
    pub fn force_resize_ratio(&self) -> usize {
        self.force_resize_ratio
    }
}
