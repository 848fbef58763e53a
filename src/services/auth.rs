//! Authentication capability and the pre-request token guard.

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::error::HttpError;

/// Session/token manager provided by the host.
pub trait AuthSession {
    /// The access token currently held, if any.
    fn current_access_token(&self) -> Option<String>;

    /// Whether `token` can still be used (not expired).
    fn is_valid(&self, token: &str) -> bool;

    /// Obtain a fresh access token.
    fn refresh(&self) -> LocalBoxFuture<'_, Result<String, HttpError>>;
}

/// Runs before every authenticated request.
pub trait RequestGuard {
    /// Resolve the token to attach, refreshing if needed. `None` means the
    /// request goes out without an `Authorization` header.
    fn pre_request_guard(&self) -> LocalBoxFuture<'_, Result<Option<String>, HttpError>>;
}

/// Guard for anonymous endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl RequestGuard for NoAuth {
    fn pre_request_guard(&self) -> LocalBoxFuture<'_, Result<Option<String>, HttpError>> {
        futures::future::ready(Ok(None)).boxed_local()
    }
}

/// Guard that keeps an [`AuthSession`]'s access token fresh.
#[derive(Debug, Clone)]
pub struct TokenGuard<A> {
    session: A,
}

impl<A: AuthSession> TokenGuard<A> {
    pub fn new(session: A) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &A {
        &self.session
    }
}

impl<A: AuthSession> RequestGuard for TokenGuard<A> {
    fn pre_request_guard(&self) -> LocalBoxFuture<'_, Result<Option<String>, HttpError>> {
        async move {
            if let Some(token) = self.session.current_access_token() {
                if self.session.is_valid(&token) {
                    return Ok(Some(token));
                }
                log::debug!("Access token expired, refreshing");
            }

            match self.session.refresh().await {
                Ok(token) => Ok(Some(token)),
                Err(e) => {
                    log::warn!("Token refresh failed: {}", e);
                    Err(HttpError::Unauthorized(e.to_string()))
                }
            }
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::{Cell, RefCell};

    struct FakeSession {
        token: RefCell<Option<String>>,
        valid: Cell<bool>,
        refresh_ok: bool,
        refreshes: Cell<u32>,
    }

    impl FakeSession {
        fn new(token: Option<&str>, valid: bool, refresh_ok: bool) -> Self {
            Self {
                token: RefCell::new(token.map(str::to_string)),
                valid: Cell::new(valid),
                refresh_ok,
                refreshes: Cell::new(0),
            }
        }
    }

    impl AuthSession for FakeSession {
        fn current_access_token(&self) -> Option<String> {
            self.token.borrow().clone()
        }

        fn is_valid(&self, _token: &str) -> bool {
            self.valid.get()
        }

        fn refresh(&self) -> LocalBoxFuture<'_, Result<String, HttpError>> {
            self.refreshes.set(self.refreshes.get() + 1);
            let result = if self.refresh_ok {
                *self.token.borrow_mut() = Some("fresh".to_string());
                self.valid.set(true);
                Ok("fresh".to_string())
            } else {
                Err(HttpError::Status {
                    status: 401,
                    body: "refresh token revoked".to_string(),
                })
            };
            futures::future::ready(result).boxed_local()
        }
    }

    #[test]
    fn test_valid_token_is_reused() {
        let guard = TokenGuard::new(FakeSession::new(Some("abc"), true, true));
        let token = block_on(guard.pre_request_guard()).unwrap();
        assert_eq!(token.as_deref(), Some("abc"));
        assert_eq!(guard.session().refreshes.get(), 0);
    }

    #[test]
    fn test_expired_token_is_refreshed() {
        let guard = TokenGuard::new(FakeSession::new(Some("old"), false, true));
        let token = block_on(guard.pre_request_guard()).unwrap();
        assert_eq!(token.as_deref(), Some("fresh"));
        assert_eq!(guard.session().refreshes.get(), 1);
    }

    #[test]
    fn test_failed_refresh_is_unauthorized() {
        let guard = TokenGuard::new(FakeSession::new(None, false, false));
        let err = block_on(guard.pre_request_guard()).unwrap_err();
        assert!(matches!(err, HttpError::Unauthorized(_)));
    }

    #[test]
    fn test_no_auth_sends_anonymous() {
        assert_eq!(block_on(NoAuth.pre_request_guard()).unwrap(), None);
    }
}
