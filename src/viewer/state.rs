//! Load-attempt lifecycle.
//!
//! ```text
//! Unauthenticated -> Authenticating
//! Authenticating  -> AccessGranted | AccessDenied | AuthError | ViewingSample
//! AccessGranted   -> Rendering | LoadFailed
//! AccessDenied    -> Requesting | ViewingSample
//! Requesting      -> ViewingSample
//! AuthError       -> ViewingSample
//! ViewingSample   -> Rendering | LoadFailed
//! Rendering       -> Rendered | LoadFailed
//! Rendered, LoadFailed -> Unauthenticated (next attempt)
//! ```

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerState {
    Unauthenticated,
    Authenticating,
    AccessGranted,
    AccessDenied,
    AuthError,
    Requesting,
    ViewingSample,
    Rendering,
    Rendered,
    LoadFailed,
}

impl fmt::Display for ViewerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewerState::Unauthenticated => "unauthenticated",
            ViewerState::Authenticating => "authenticating",
            ViewerState::AccessGranted => "access_granted",
            ViewerState::AccessDenied => "access_denied",
            ViewerState::AuthError => "auth_error",
            ViewerState::Requesting => "requesting",
            ViewerState::ViewingSample => "viewing_sample",
            ViewerState::Rendering => "rendering",
            ViewerState::Rendered => "rendered",
            ViewerState::LoadFailed => "load_failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Invalid viewer transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: ViewerState,
    pub to: ViewerState,
}

impl ViewerState {
    pub fn can_transition_to(self, next: ViewerState) -> bool {
        use ViewerState::*;
        matches!(
            (self, next),
            (Unauthenticated, Authenticating)
                | (Authenticating, AccessGranted)
                | (Authenticating, AccessDenied)
                | (Authenticating, AuthError)
                | (Authenticating, ViewingSample)
                | (AccessGranted, Rendering)
                | (AccessGranted, LoadFailed)
                | (AccessDenied, Requesting)
                | (AccessDenied, ViewingSample)
                | (Requesting, ViewingSample)
                | (AuthError, ViewingSample)
                | (ViewingSample, Rendering)
                | (ViewingSample, LoadFailed)
                | (Rendering, Rendered)
                | (Rendering, LoadFailed)
                | (Rendered, Unauthenticated)
                | (LoadFailed, Unauthenticated)
        )
    }

    pub fn transition(self, next: ViewerState) -> Result<ViewerState, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }

    /// Whether the load attempt has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, ViewerState::Rendered | ViewerState::LoadFailed)
    }
}
