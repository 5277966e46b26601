//! [`ClientSession`] definitions.

use std::{
    cell::Cell,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use common::{
    auth::{AuthResponse, LoginRequest, MeResponse, RegisterRequest},
    DateTime,
};
use derive_more::{Debug, Display, Error, From};
use parking_lot::{Mutex, ReentrantMutex};

use crate::{
    api::{ApiError, AuthApi, Http},
    observer::{Observers, Subscription},
    state::{AuthState, Authenticated},
    storage::{Degrading, FileStorage, Storage},
    token, Config,
};

/// Client-side authentication session.
///
/// The only writer of its [`AuthState`]: every operation takes a sequence
/// number when it starts, and its outcome is applied only if no operation
/// started later has been applied already. So, a slow response can never
/// overwrite the outcome of a newer operation.
///
/// Revoking a token the server no longer accepts is the exception: it signs
/// out only while that very token is still the current one, leaving the
/// sequence untouched.
#[derive(Debug)]
pub struct ClientSession<A> {
    /// [`AuthApi`] of the server.
    api: A,

    /// [`Storage`] of the last issued token.
    storage: Degrading,

    /// Route to navigate to once signed out.
    default_route: String,

    /// Callback performing navigation to a route.
    #[debug(skip)]
    navigator: Option<Arc<dyn Fn(&str) + Send + Sync>>,

    /// Current [`AuthState`].
    state: Mutex<Current>,

    /// Last sequence number handed out to an operation.
    last_seq: AtomicU64,

    /// [`Observers`] of [`AuthState`] changes.
    observers: Observers<AuthState>,

    /// Progress of notifying the [`Observers`].
    #[debug(skip)]
    notifier: ReentrantMutex<Notifier>,
}

/// [`AuthState`] along with the sequence number of the operation it was
/// written by.
#[derive(Debug, Default)]
struct Current {
    /// Sequence number of the operation the [`AuthState`] was written by.
    seq: u64,

    /// Number of writes of the [`AuthState`] so far.
    version: u64,

    /// Current [`AuthState`].
    state: AuthState,
}

/// Progress of notifying the [`Observers`] of a [`ClientSession`].
#[derive(Debug, Default)]
struct Notifier {
    /// [`Current::version`] the [`Observers`] have been notified about.
    notified: Cell<u64>,

    /// Indicator whether the [`Observers`] are being notified right now.
    busy: Cell<bool>,
}

/// Change of the persisted token accompanying an [`AuthState`] write.
#[derive(Clone, Copy, Debug)]
enum Persist<'t> {
    /// Store the token.
    Store(&'t str),

    /// Remove the token.
    Remove,
}

impl ClientSession<Http> {
    /// Creates a new [`ClientSession`] talking to the server over HTTP and
    /// persisting the token in a file, as the provided [`Config`] says.
    ///
    /// # Errors
    ///
    /// If the HTTP client fails to be initialized.
    pub fn connect(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            config,
            Http::new(config)?,
            FileStorage::new(&config.storage_path),
        ))
    }
}

impl<A> ClientSession<A> {
    /// Creates a new signed out [`ClientSession`].
    #[must_use]
    pub fn new(
        config: &Config,
        api: A,
        storage: impl Storage + 'static,
    ) -> Self {
        Self {
            api,
            storage: Degrading::new(Box::new(storage)),
            default_route: config.default_route.clone(),
            navigator: None,
            state: Mutex::new(Current::default()),
            last_seq: AtomicU64::new(0),
            observers: Observers::default(),
            notifier: ReentrantMutex::new(Notifier::default()),
        }
    }

    /// Sets the callback navigating to the provided route once signed out.
    #[must_use]
    pub fn with_navigator(
        mut self,
        navigator: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.navigator = Some(Arc::new(navigator));
        self
    }

    /// Returns the current [`AuthState`].
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.lock().state.clone()
    }

    /// Indicates whether the token is kept in memory only, as the [`Storage`]
    /// has failed.
    #[must_use]
    pub fn is_storage_degraded(&self) -> bool {
        self.storage.is_degraded()
    }

    /// Subscribes the provided callback to [`AuthState`] changes.
    ///
    /// Callbacks are invoked in the order the [`AuthState`] is written in, so
    /// the last one received is always the current [`AuthState`]. Writes
    /// happening while a notification is in progress may be coalesced.
    pub fn subscribe(
        &self,
        callback: impl Fn(&AuthState) + Send + Sync + 'static,
    ) -> Subscription {
        self.observers.subscribe(callback)
    }

    /// Unsubscribes the callback of the provided [`Subscription`].
    ///
    /// Returns `false` if it has been unsubscribed already.
    pub fn unsubscribe(&self, sub: Subscription) -> bool {
        self.observers.unsubscribe(sub)
    }

    /// Restores the [`AuthState`] out of the persisted token, if it's still
    /// valid.
    ///
    /// Invalid or expired tokens are discarded silently, leaving the
    /// [`ClientSession`] signed out without any notification.
    pub fn restore(&self) {
        let seq = self.begin();
        let Some(token) = self.storage.load() else {
            return;
        };

        match token::parse(&token, DateTime::now()) {
            Ok(parsed) => {
                let state =
                    AuthState::Authenticated(Authenticated::new(token, parsed));
                _ = self.apply(seq, state, None);
            }
            Err(e) => {
                tracing::debug!("discarding persisted token: {e}");
                self.storage.remove();
            }
        }
    }

    /// Signs in with the token of the provided [`AuthResponse`].
    ///
    /// Returns `false` if an operation started later has been applied
    /// already, so this one is discarded.
    ///
    /// # Errors
    ///
    /// If the token is malformed or expired, leaving the [`AuthState`]
    /// untouched.
    pub fn sign_in(
        &self,
        resp: &AuthResponse,
    ) -> Result<bool, token::ParseError> {
        let seq = self.begin();
        self.sign_in_as(seq, resp)
    }

    /// Signs out, navigating to the default route.
    ///
    /// The server is notified on a best-effort basis: the [`ClientSession`]
    /// is signed out even if the server is unreachable. Neither signing out
    /// nor navigation happens if an operation started later has been applied
    /// meanwhile.
    pub async fn sign_out(&self)
    where
        A: AuthApi,
    {
        let seq = self.begin();
        let token = self.state().token().map(ToOwned::to_owned);

        if let Err(e) = self.api.logout(token.as_deref()).await {
            tracing::warn!("failed to sign out on server: {e}");
        }

        if !self.apply(seq, AuthState::SignedOut, Some(Persist::Remove)) {
            return;
        }
        if let Some(navigate) = &self.navigator {
            navigate(&self.default_route);
        }
    }

    /// Signs in by the provided credentials.
    ///
    /// Returns `false` if an operation started later has been applied
    /// already, so this one is discarded.
    ///
    /// # Errors
    ///
    /// If the server rejects the credentials, or responds with an invalid
    /// token.
    #[tracing::instrument(skip_all)]
    pub async fn login(
        &self,
        username_or_email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<bool, SessionError>
    where
        A: AuthApi,
    {
        let seq = self.begin();
        let resp = self
            .api
            .login(LoginRequest {
                username_or_email: username_or_email.into(),
                password: password.into(),
            })
            .await?;
        Ok(self.sign_in_as(seq, &resp)?)
    }

    /// Registers a new user and signs it in.
    ///
    /// Returns `false` if an operation started later has been applied
    /// already, so this one is discarded.
    ///
    /// # Errors
    ///
    /// If the server refuses the registration, or responds with an invalid
    /// token.
    #[tracing::instrument(skip_all)]
    pub async fn register(
        &self,
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<bool, SessionError>
    where
        A: AuthApi,
    {
        let seq = self.begin();
        let resp = self
            .api
            .register(RegisterRequest {
                username: username.into(),
                email: email.into(),
                password: password.into(),
            })
            .await?;
        Ok(self.sign_in_as(seq, &resp)?)
    }

    /// Fetches the server's view of the signed in principal.
    ///
    /// Signs out locally if the server doesn't accept the token anymore,
    /// unless another token has been signed in with meanwhile.
    ///
    /// # Errors
    ///
    /// If not signed in, or the server call fails.
    pub async fn me(&self) -> Result<MeResponse, ApiError>
    where
        A: AuthApi,
    {
        let token = self
            .state()
            .token()
            .map(ToOwned::to_owned)
            .ok_or(ApiError::Unauthorized)?;

        let res = self.api.me(&token).await;
        if matches!(res, Err(ApiError::Unauthorized)) {
            _ = self.revoke(&token);
        }
        res
    }

    /// Signs out if the token of the signed in principal has expired at the
    /// `now` moment.
    ///
    /// Returns `true` if the token has expired.
    pub fn check_expiry(&self, now: DateTime) -> bool {
        let state = self.state();
        let (Some(token), Some(exp)) = (state.token(), state.expires_at())
        else {
            return false;
        };
        if now < exp {
            return false;
        }

        tracing::debug!("token has expired");
        _ = self.revoke(token);
        true
    }

    /// Hands out the sequence number of a starting operation.
    fn begin(&self) -> u64 {
        self.last_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Signs in with the token of the provided [`AuthResponse`], as the
    /// operation with the provided sequence number.
    fn sign_in_as(
        &self,
        seq: u64,
        resp: &AuthResponse,
    ) -> Result<bool, token::ParseError> {
        let parsed = token::parse(&resp.token, DateTime::now())?;
        let state = AuthState::Authenticated(Authenticated::new(
            resp.token.clone(),
            parsed,
        ));
        Ok(self.apply(seq, state, Some(Persist::Store(&resp.token))))
    }

    /// Replaces the [`AuthState`] with the provided one, as the operation
    /// with the provided sequence number, and notifies the subscribers.
    ///
    /// Does nothing if an operation started later has been applied already.
    fn apply(
        &self,
        seq: u64,
        state: AuthState,
        persist: Option<Persist<'_>>,
    ) -> bool {
        {
            let mut current = self.state.lock();
            if seq <= current.seq {
                tracing::debug!(
                    seq,
                    applied = current.seq,
                    "discarding stale `AuthState`",
                );
                return false;
            }

            // Persisted under the lock, so the storage never lags behind.
            match persist {
                Some(Persist::Store(token)) => self.storage.store(token),
                Some(Persist::Remove) => self.storage.remove(),
                None => {}
            }
            current.seq = seq;
            current.version += 1;
            current.state = state;
        }

        self.publish();
        true
    }

    /// Signs out if the provided `token` is still the current one, and
    /// notifies the subscribers.
    ///
    /// Keeps the sequence number, so operations started earlier but not yet
    /// applied still win over this sign out.
    fn revoke(&self, token: &str) -> bool {
        {
            let mut current = self.state.lock();
            if current.state.token() != Some(token) {
                tracing::debug!("token has been replaced, not revoking");
                return false;
            }

            self.storage.remove();
            current.version += 1;
            current.state = AuthState::SignedOut;
        }

        self.publish();
        true
    }

    /// Notifies the subscribers about the current [`AuthState`], if they
    /// haven't been notified about it yet.
    ///
    /// Notifications never interleave: writes landing meanwhile, including
    /// ones made by the subscribers themselves, are picked up by the ongoing
    /// notification before it finishes.
    fn publish(&self) {
        let notifier = self.notifier.lock();
        if notifier.busy.replace(true) {
            return;
        }
        loop {
            let (version, state) = {
                let current = self.state.lock();
                (current.version, current.state.clone())
            };
            if version <= notifier.notified.get() {
                break;
            }
            notifier.notified.set(version);
            self.observers.notify(&state);
        }
        notifier.busy.set(false);
    }
}

/// Error of a [`ClientSession`] operation.
#[derive(Debug, Display, Error, From)]
pub enum SessionError {
    /// Server call failed.
    #[display("server call failed: {_0}")]
    Api(ApiError),

    /// Server responded with an unusable token.
    #[display("server issued unusable token: {_0}")]
    Token(token::ParseError),
}
