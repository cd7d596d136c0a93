use crate::error::ArchiveError;
use crate::version::Version;

use super::Hint;

/// Direction of an open archive session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Reading,
    Writing,
}

/// Session state shared by all archive bindings.
///
/// Validity is tracked per object: entering a nested object starts with a
/// clean flag and leaving it restores the parent's flag, so one bad object
/// does not invalidate its siblings. Every error is also kept in a sticky
/// list, and stream-level corruption sets a fatal flag that no object can
/// recover from.
#[derive(Debug)]
pub struct ArchiveState {
    mode: Option<Mode>,
    version: Version,
    hint: Hint,
    strict: bool,
    valid_object: bool,
    fatal: bool,
    errors: Vec<ArchiveError>,
}

impl ArchiveState {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode: Some(mode),
            version: Version::ZERO,
            hint: Hint::empty(),
            strict: false,
            valid_object: true,
            fatal: false,
            errors: Vec::new(),
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.mode.is_some()
    }

    pub fn is_reading(&self) -> bool {
        self.mode == Some(Mode::Reading)
    }

    pub fn close(&mut self) {
        self.mode = None;
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn hint(&self) -> Hint {
        self.hint
    }

    pub fn set_hint(&mut self, hint: Hint) {
        self.hint = hint;
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Whether the object currently being processed is still valid.
    pub fn is_valid(&self) -> bool {
        self.valid_object && !self.fatal
    }

    pub fn set_validity(&mut self, valid: bool) {
        self.valid_object = valid;
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// Start a nested object. Returns the enclosing object's flag, to be
    /// passed to [`leave_object`](Self::leave_object).
    pub fn enter_object(&mut self) -> bool {
        std::mem::replace(&mut self.valid_object, true)
    }

    /// Finish a nested object, returning whether it decoded cleanly.
    pub fn leave_object(&mut self, outer: bool) -> bool {
        let valid = self.is_valid();
        self.valid_object = outer;
        valid
    }

    pub fn report(&mut self, error: ArchiveError) {
        self.errors.push(error);
    }

    /// Record `error` and invalidate the current object.
    pub fn fail(&mut self, error: ArchiveError) {
        self.report(error);
        self.valid_object = false;
    }

    /// Record `error` and stop the whole session.
    pub fn fail_fatal(&mut self, error: ArchiveError) {
        self.fail(error);
        self.fatal = true;
    }

    /// Every error seen since the session was opened.
    pub fn errors(&self) -> &[ArchiveError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<ArchiveError> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_failure_does_not_leak_to_parent() {
        let mut state = ArchiveState::new(Mode::Reading);
        let outer = state.enter_object();
        state.fail(ArchiveError::Missing("value".into()));
        assert!(!state.leave_object(outer));
        assert!(state.is_valid());
        assert_eq!(state.errors().len(), 1);
    }

    #[test]
    fn fatal_is_sticky() {
        let mut state = ArchiveState::new(Mode::Reading);
        state.fail_fatal(ArchiveError::StreamCorrupt("bad".into()));
        let outer = state.enter_object();
        assert!(!state.leave_object(outer));
        state.set_validity(true);
        assert!(!state.is_valid());
        assert!(state.is_fatal());
    }

    #[test]
    fn close_ends_session() {
        let mut state = ArchiveState::new(Mode::Writing);
        assert!(state.is_open());
        assert!(!state.is_reading());
        state.close();
        assert!(!state.is_open());
        assert_eq!(state.mode(), None);
    }
}
