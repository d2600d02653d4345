use miette::SourceSpan;

/// Owns leaked source contents so that diagnostics can borrow them for
/// `'static`. Call [`StaticSource::reclaim`] when re-reading the same file in
/// a loop (eg. watch mode) to avoid accumulating leaked buffers.
pub struct StaticSource {
    src: &'static str,
}

impl StaticSource {
    pub fn new(src: String) -> Self {
        StaticSource {
            src: Box::leak(src.into_boxed_str()),
        }
    }

    pub fn src(&self) -> &'static str {
        self.src
    }

    /// Drop the leaked buffer. Any report still borrowing it must be gone.
    pub fn reclaim(self) {
        // SAFETY: `src` was created by `Box::leak` in `new` and is dropped
        // exactly once as `self` is consumed.
        unsafe {
            drop(Box::from_raw(self.src as *const str as *mut str));
        }
    }
}

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct SrcOffset(pub usize);

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}
