//! Redirect decision step of the browser core (SPEC_FULL §4.C, "Redirect algorithm").
//!
//! Grounded on the `penumbra-x-rquest` redirect middleware's status-code match
//! (`StatusCode::MOVED_PERMANENTLY | FOUND | SEE_OTHER` vs
//! `TEMPORARY_REDIRECT | PERMANENT_REDIRECT`) and on the teacher's own inline `should_redirect`
//! branch in `client/client.rs`.

use http::{Method, StatusCode};

/// What to do with the in-flight request once a response has been inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectAction {
    /// Not a redirect (wrong status, or no `Location`); stop the loop here.
    Stop,
    /// Follow, demoting the method and dropping the body if `drop_body` is set.
    Follow { method: RedirectMethod, drop_body: bool },
}

/// The method the next hop should use. `Same` covers 307/308; `Get` covers the 301/302/303
/// demotion case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMethod {
    Same,
    Get,
}

/// Does `status` carry HTTP-level redirect semantics at all?
pub fn is_redirect_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Decides the redirect action for a response with `status`, given the method of the request that
/// produced it. Per SPEC_FULL §4.C step 4: 301/302/303 demote non-idempotent methods to GET and
/// drop the body; 307/308 always preserve method and body verbatim.
pub fn decide(status: StatusCode, previous_method: &Method) -> RedirectAction {
    match status {
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER => {
            let drop_body = !matches!(*previous_method, Method::GET | Method::HEAD);
            RedirectAction::Follow {
                method: if drop_body { RedirectMethod::Get } else { RedirectMethod::Same },
                drop_body,
            }
        }
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => {
            RedirectAction::Follow { method: RedirectMethod::Same, drop_body: false }
        }
        _ => RedirectAction::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_302_demotes_to_get() {
        let action = decide(StatusCode::FOUND, &Method::POST);
        assert_eq!(
            action,
            RedirectAction::Follow { method: RedirectMethod::Get, drop_body: true }
        );
    }

    #[test]
    fn get_302_keeps_method() {
        let action = decide(StatusCode::FOUND, &Method::GET);
        assert_eq!(
            action,
            RedirectAction::Follow { method: RedirectMethod::Same, drop_body: false }
        );
    }

    #[test]
    fn post_307_preserves_method_and_body() {
        let action = decide(StatusCode::TEMPORARY_REDIRECT, &Method::POST);
        assert_eq!(
            action,
            RedirectAction::Follow { method: RedirectMethod::Same, drop_body: false }
        );
    }

    #[test]
    fn non_redirect_status_stops() {
        assert_eq!(decide(StatusCode::OK, &Method::GET), RedirectAction::Stop);
        assert_eq!(decide(StatusCode::CREATED, &Method::POST), RedirectAction::Stop);
    }
}
