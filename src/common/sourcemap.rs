use codespan::Span;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use std::collections::HashMap;
use std::fmt::Display;
use std::num::NonZeroU32;
use std::fmt;

/// A handle that points to a source location in a source map.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Smid(Option<NonZeroU32>);

impl Default for Smid {
    /// The default SMID is invalid.
    fn default() -> Self {
        Smid(None)
    }
}

impl Display for Smid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.0 {
            Some(n) => write!(f, "[{}]", n),
            None => write!(f, "[?]"),
        }
    }
}

impl Smid {
    fn new(index: usize) -> Smid {
        Smid(NonZeroU32::new(index as u32 + 1))
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    fn index(self) -> Option<usize> {
        self.0.map(|n| (n.get() - 1) as usize)
    }
}

/// Anything that has a SMID identifying a source location.
pub trait HasSmid {
    fn smid(&self) -> Smid;
}

impl HasSmid for Smid {
    fn smid(&self) -> Smid {
        *self
    }
}

/// Source information to associate with a syntax element
#[derive(Clone, Debug, Default)]
pub struct SourceInfo {
    /// usize
    pub file: Option<usize>,
    /// Byte span
    pub span: Option<Span>,
    /// Synthesized by the compiler, not literally present in the
    /// source. Diagnostics should blame the statement the location
    /// was derived from.
    pub internal: bool,
}

/// Store all source info...
#[derive(Default)]
pub struct SourceMap {
    source: Vec<SourceInfo>,
    /// Internal variants already minted, keyed by their real origin
    internals: HashMap<Smid, Smid>,
}

impl SourceMap {
    /// Create a new, empty database of files.
    pub fn new() -> Self {
        SourceMap::default()
    }

    fn push(&mut self, info: SourceInfo) -> Smid {
        let smid = Smid::new(self.source.len());
        self.source.push(info);
        smid
    }

    /// Add a new source info and get a SMID referencing it
    pub fn add(&mut self, file: usize, span: Span) -> Smid {
        self.push(SourceInfo {
            file: Some(file),
            span: Some(span),
            ..Default::default()
        })
    }

    /// Return the internal counterpart of a location: same file and
    /// span, but flagged as compiler-generated.
    ///
    /// Internal locations are minted once per origin so repeated
    /// requests return the same SMID. An internal location is its own
    /// internal counterpart.
    pub fn internal(&mut self, smid: Smid) -> Smid {
        if self.is_internal(smid) {
            return smid;
        }

        if let Some(existing) = self.internals.get(&smid) {
            return *existing;
        }

        let info = match self.get(smid) {
            Some(info) => SourceInfo {
                internal: true,
                ..info.clone()
            },
            None => SourceInfo {
                internal: true,
                ..Default::default()
            },
        };
        let internal = self.push(info);
        self.internals.insert(smid, internal);
        internal
    }

    /// True iff the location was synthesized by the compiler
    pub fn is_internal(&self, smid: Smid) -> bool {
        self.get(smid).map(|info| info.internal).unwrap_or(false)
    }

    /// Retrieve source info by SMID
    pub fn get(&self, smid: Smid) -> Option<&SourceInfo> {
        smid.index().and_then(|i| self.source.get(i))
    }

    /// Retrieve the SourceInfo for something that has a SMID
    pub fn source_info(&self, item: &dyn HasSmid) -> Option<&SourceInfo> {
        self.get(item.smid())
    }

    /// Create a default diagnostic for an error with a SMID
    pub fn diagnostic<E>(&self, error: &E) -> Diagnostic<usize>
    where
        E: HasSmid + Display,
    {
        let diag = Diagnostic::error().with_message(format!("{}", error));

        match self.source_info(error) {
            Some(SourceInfo {
                file: Some(file),
                span: Some(span),
                internal,
                ..
            }) => {
                let diag = diag.with_labels(vec![Label::primary(*file, *span)]);
                if *internal {
                    diag.with_notes(vec![
                        "raised in compiler-generated code for this statement".to_string(),
                    ])
                } else {
                    diag
                }
            }
            _ => diag,
        }
    }
}
