//! Client repository.
//!
//! The authorization server only ever reads clients. Persistence lives behind
//! [`ClientRepository`]; [`InMemoryClientRepository`] is a reference
//! implementation for tests and small deployments.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::OAuthResult;
use crate::error::{BoxError, ErrorReason, OAuthError, into_oauth_error};
use crate::types::Client;

// =============================================================================
// Client Repository Trait
// =============================================================================

/// Read access to registered OAuth 2.0 clients.
///
/// # Example
///
/// ```ignore
/// use oauth2_server::storage::{ClientRepository, get_client};
///
/// async fn example(repository: &dyn ClientRepository) -> OAuthResult<()> {
///     let client = get_client(repository, "my-app").await?;
///     println!("redirect URIs: {:?}", client.redirect_uris());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Find a client by its identifier.
    ///
    /// Returns `Ok(None)` if no such client is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    async fn get(&self, client_id: &str) -> Result<Option<Arc<dyn Client>>, BoxError>;
}

#[async_trait]
impl<R: ClientRepository + ?Sized> ClientRepository for Arc<R> {
    async fn get(&self, client_id: &str) -> Result<Option<Arc<dyn Client>>, BoxError> {
        (**self).get(client_id).await
    }
}

/// Looks up a client, translating repository outcomes into OAuth errors.
///
/// A storage failure becomes `server_error` (unless it already is an
/// [`OAuthError`]) with the original kept as cause. An unknown client becomes
/// `invalid_client` caused by [`ErrorReason::ClientNotFound`].
///
/// # Errors
///
/// Returns `invalid_client` or `server_error` as described above.
pub async fn get_client(
    repository: &dyn ClientRepository,
    client_id: &str,
) -> OAuthResult<Arc<dyn Client>> {
    match repository.get(client_id).await {
        Ok(Some(client)) => Ok(client),
        Ok(None) => Err(
            OAuthError::invalid_client(format!("client {client_id} not found"))
                .caused_by(ErrorReason::ClientNotFound),
        ),
        Err(err) => {
            let err = into_oauth_error(err);
            if err.is_server_error() {
                tracing::error!(client_id, error = %err, "Client repository lookup failed");
            }
            Err(err)
        }
    }
}

// =============================================================================
// In-Memory Repository
// =============================================================================

type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

#[derive(Default)]
struct Inner {
    clients: HashMap<String, Arc<dyn Client>>,
    errors: HashMap<String, SharedError>,
}

/// [`ClientRepository`] backed by a map behind a single reader/writer lock.
///
/// Lookups may run concurrently; `add`, `remove` and the error injection
/// methods take the write lock. A client id can be primed with an error,
/// which `get` returns instead of the client until it is cleared.
#[derive(Default)]
pub struct InMemoryClientRepository {
    inner: RwLock<Inner>,
}

impl InMemoryClientRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client, replacing any client with the same id.
    pub fn add(&self, client: impl Client + 'static) {
        self.add_shared(Arc::new(client));
    }

    /// Registers an already shared client.
    pub fn add_shared(&self, client: Arc<dyn Client>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.clients.insert(client.id().to_string(), client);
    }

    /// Removes a client. Returns `true` if it was registered.
    pub fn remove(&self, client_id: &str) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.clients.remove(client_id).is_some()
    }

    /// Makes every lookup of `client_id` fail with `err`.
    pub fn set_error<E>(&self, client_id: impl Into<String>, err: E)
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.errors.insert(client_id.into(), Arc::new(err));
    }

    /// Clears an injected error.
    pub fn clear_error(&self, client_id: &str) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.errors.remove(client_id);
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clients
            .len()
    }

    /// Returns `true` if no clients are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for InMemoryClientRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("InMemoryClientRepository")
            .field("clients", &inner.clients.keys().collect::<Vec<_>>())
            .field("errors", &inner.errors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn get(&self, client_id: &str) -> Result<Option<Arc<dyn Client>>, BoxError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match inner.errors.get(client_id) {
            Some(err) => Err(Box::new(InjectedError(Arc::clone(err)))),
            None => Ok(inner.clients.get(client_id).cloned()),
        }
    }
}

/// Hands out a shared injected error while keeping it reachable by downcast.
#[derive(Debug)]
struct InjectedError(SharedError);

impl fmt::Display for InjectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for InjectedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.0.as_ref())
    }
}
