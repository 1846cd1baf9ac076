//! Open-scope discipline for the output tree
//!
//! The walker nests output scopes (chord, grace, cue, text, tuplet, ...)
//! and must close them in strict last-opened-first-closed order. Each
//! open scope is tagged with its kind so that only the logic owning a
//! kind can pop it; a mismatched pop is recovered by force-closing down
//! to the nearest scope of the right kind, with a warning.
//!
//! When a measure-range restricts conversion, pushes outside the range
//! are tracked without touching the sink, so the balance bookkeeping
//! stays correct across the skipped region.

use crate::errors::EngineError;
use crate::tree::{Param, ScopeHandle, Sink};

/// What a nested output scope represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The per-voice root sequence
    Voice,
    Chord,
    Grace,
    Cue,
    /// Direction-triggered text, closed at the next note or measure end
    Text,
    Tuplet,
    /// Forced (cautionary/editorial) accidental around one note
    Accidental,
    /// Short-lived articulation/ornament/fermata scope around one note
    Ornament,
}

impl ScopeKind {
    fn name(self) -> &'static str {
        match self {
            ScopeKind::Voice => "voice",
            ScopeKind::Chord => "chord",
            ScopeKind::Grace => "grace",
            ScopeKind::Cue => "cue",
            ScopeKind::Text => "text",
            ScopeKind::Tuplet => "tuplet",
            ScopeKind::Accidental => "accidental",
            ScopeKind::Ornament => "ornament",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenScope {
    kind: ScopeKind,
    /// `None` when the push was suppressed by the measure-range gate
    handle: Option<ScopeHandle>,
}

/// Stack of open output scopes, kind-tagged
#[derive(Debug, Default)]
pub struct ScopeStack {
    open: Vec<OpenScope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn is_open(&self, kind: ScopeKind) -> bool {
        self.open.iter().any(|s| s.kind == kind)
    }

    /// Open a scope. When `emit` is false (outside the measure range)
    /// the scope is tracked but nothing reaches the sink.
    pub fn push<S: Sink>(
        &mut self,
        sink: &mut S,
        kind: ScopeKind,
        tag: &str,
        params: Vec<Param>,
        emit: bool,
    ) {
        let handle = emit.then(|| sink.open_scope_with(tag, params));
        self.open.push(OpenScope { kind, handle });
    }

    /// Close the innermost scope, which the caller asserts has `kind`.
    /// A kind mismatch is a structural anomaly: everything down to and
    /// including the nearest scope of the right kind is force-closed.
    /// An empty stack is an engine invariant violation.
    pub fn pop<S: Sink>(&mut self, sink: &mut S, kind: ScopeKind) -> Result<(), EngineError> {
        let top = self
            .open
            .last()
            .ok_or(EngineError::EmptyScopeStack(kind.name()))?;

        if top.kind == kind {
            let scope = self.open.pop().unwrap();
            if let Some(handle) = scope.handle {
                sink.close_scope(handle)?;
            }
            return Ok(());
        }

        match self.open.iter().rposition(|s| s.kind == kind) {
            Some(index) => {
                log::warn!(
                    "closing {} scope while {} is innermost; force-closing {} scope(s)",
                    kind.name(),
                    top.kind.name(),
                    self.open.len() - index
                );
                while self.open.len() > index {
                    let scope = self.open.pop().unwrap();
                    if let Some(handle) = scope.handle {
                        sink.close_scope(handle)?;
                    }
                }
                Ok(())
            }
            None => {
                log::warn!("no open {} scope to close; ignored", kind.name());
                Ok(())
            }
        }
    }

    /// Close the scope only if one of this kind is open
    pub fn pop_if_open<S: Sink>(&mut self, sink: &mut S, kind: ScopeKind) -> Result<(), EngineError> {
        if self.is_open(kind) {
            self.pop(sink, kind)?;
        }
        Ok(())
    }

    /// Measure-boundary / note-arrival checkpoint: unwind any open
    /// direction-triggered text scopes
    pub fn close_text_scopes<S: Sink>(&mut self, sink: &mut S) -> Result<(), EngineError> {
        while self.is_open(ScopeKind::Text) {
            self.pop(sink, ScopeKind::Text)?;
        }
        Ok(())
    }

    /// New-note checkpoint: a cue or grace passage ends when a plain
    /// note arrives
    pub fn close_cue_and_grace<S: Sink>(&mut self, sink: &mut S) -> Result<(), EngineError> {
        self.pop_if_open(sink, ScopeKind::Grace)?;
        self.pop_if_open(sink, ScopeKind::Cue)?;
        Ok(())
    }

    /// Part-end unwind: forcibly close everything still open so no
    /// dangling scope crosses a part boundary
    pub fn unwind_all<S: Sink>(&mut self, sink: &mut S) -> Result<(), EngineError> {
        while let Some(scope) = self.open.pop() {
            if scope.kind != ScopeKind::Voice {
                log::warn!("part ended with {} scope still open", scope.kind.name());
            }
            if let Some(handle) = scope.handle {
                sink.close_scope(handle)?;
            }
        }
        Ok(())
    }
}
