//! Durable session storage
//!
//! Two fixed keys hold everything that survives a restart: `user` (the session object,
//! principal plus credential) and `permissions` (the principal's flattened permission
//! list). Writes only happen on login, logout and permission refresh.

use gatekeeper_core::{storage_error, GatekeeperResult, PrincipalPermission, Session};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

pub const SESSION_KEY: &str = "user";
pub const PERMISSIONS_KEY: &str = "permissions";

/// Injected source of the persisted session, shared by the transport and the auth store
pub trait SessionProvider: Send + Sync {
    fn load_session(&self) -> GatekeeperResult<Option<Session>>;

    fn store_session(&self, session: &Session) -> GatekeeperResult<()>;

    fn clear_session(&self) -> GatekeeperResult<()>;

    /// Cached principal permissions; empty when nothing is cached
    fn load_permissions(&self) -> GatekeeperResult<Vec<PrincipalPermission>>;

    fn store_permissions(&self, permissions: &[PrincipalPermission]) -> GatekeeperResult<()>;

    fn clear_permissions(&self) -> GatekeeperResult<()>;

    fn clear_all(&self) -> GatekeeperResult<()> {
        self.clear_session()?;
        self.clear_permissions()
    }

    /// Bearer credential of the stored session, if any
    fn bearer_token(&self) -> GatekeeperResult<Option<String>> {
        Ok(self
            .load_session()?
            .and_then(|session| session.bearer_token().map(str::to_string)))
    }
}

/// One JSON file per key inside a private directory
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> GatekeeperResult<Self> {
        let dir = dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&dir).map_err(|e| {
            storage_error!(
                format!("Failed to create session directory {}: {}", dir.display(), e),
                "file_session_store",
                e
            )
        })?;

        info!("Session storage initialized at: {}", dir.display());

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read_key<T: DeserializeOwned>(&self, key: &str) -> GatekeeperResult<Option<T>> {
        let path = self.key_path(key);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(storage_error!(
                    format!("Failed to read {}: {}", path.display(), e),
                    "file_session_store",
                    e
                ))
            }
        };

        let value = serde_json::from_str(&data).map_err(|e| {
            storage_error!(
                format!("Corrupt session entry '{}': {}", key, e),
                "file_session_store",
                e
            )
        })?;

        Ok(Some(value))
    }

    fn write_key<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> GatekeeperResult<()> {
        let path = self.key_path(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        let data = serde_json::to_string_pretty(value)?;

        std::fs::write(&tmp, data).map_err(|e| {
            storage_error!(
                format!("Failed to write {}: {}", tmp.display(), e),
                "file_session_store",
                e
            )
        })?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            storage_error!(
                format!("Failed to replace {}: {}", path.display(), e),
                "file_session_store",
                e
            )
        })?;

        debug!("Stored session entry '{}' at {}", key, path.display());
        Ok(())
    }

    fn remove_key(&self, key: &str) -> GatekeeperResult<()> {
        let path = self.key_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed session entry '{}'", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error!(
                format!("Failed to remove {}: {}", path.display(), e),
                "file_session_store",
                e
            )),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> GatekeeperResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> GatekeeperResult<()> {
    Ok(())
}

impl SessionProvider for FileSessionStore {
    fn load_session(&self) -> GatekeeperResult<Option<Session>> {
        self.read_key(SESSION_KEY)
    }

    fn store_session(&self, session: &Session) -> GatekeeperResult<()> {
        self.write_key(SESSION_KEY, session)
    }

    fn clear_session(&self) -> GatekeeperResult<()> {
        self.remove_key(SESSION_KEY)
    }

    fn load_permissions(&self) -> GatekeeperResult<Vec<PrincipalPermission>> {
        Ok(self.read_key(PERMISSIONS_KEY)?.unwrap_or_default())
    }

    fn store_permissions(&self, permissions: &[PrincipalPermission]) -> GatekeeperResult<()> {
        self.write_key(PERMISSIONS_KEY, permissions)
    }

    fn clear_permissions(&self) -> GatekeeperResult<()> {
        self.remove_key(PERMISSIONS_KEY)
    }
}

/// Process-local storage for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
    permissions: RwLock<Vec<PrincipalPermission>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
            permissions: RwLock::new(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
            && self
                .permissions
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
    }
}

impl SessionProvider for MemorySessionStore {
    fn load_session(&self) -> GatekeeperResult<Option<Session>> {
        Ok(self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn store_session(&self, session: &Session) -> GatekeeperResult<()> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> GatekeeperResult<()> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn load_permissions(&self) -> GatekeeperResult<Vec<PrincipalPermission>> {
        Ok(self
            .permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn store_permissions(&self, permissions: &[PrincipalPermission]) -> GatekeeperResult<()> {
        *self.permissions.write().unwrap_or_else(PoisonError::into_inner) = permissions.to_vec();
        Ok(())
    }

    fn clear_permissions(&self) -> GatekeeperResult<()> {
        self.permissions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_core::User;

    fn session(token: &str) -> Session {
        let mut user = User::reference(1);
        user.username = "admin".to_string();
        Session {
            user,
            token: Some(token.to_string()),
        }
    }

    #[test]
    fn file_store_round_trips_both_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::new(dir.path().join("session")).expect("store");

        assert_eq!(store.load_session().expect("load"), None);
        assert!(store.load_permissions().expect("load").is_empty());

        store.store_session(&session("abc")).expect("store session");
        store
            .store_permissions(&[PrincipalPermission::new("Users", "read")])
            .expect("store permissions");

        assert_eq!(store.bearer_token().expect("token").as_deref(), Some("abc"));
        assert!(store.key_path(SESSION_KEY).exists());
        assert!(store.key_path(PERMISSIONS_KEY).exists());

        // A second handle on the same directory sees the same state
        let reopened = FileSessionStore::new(store.dir()).expect("reopen");
        assert_eq!(
            reopened.load_permissions().expect("load"),
            vec![PrincipalPermission::new("Users", "read")]
        );

        store.clear_all().expect("clear");
        assert_eq!(reopened.load_session().expect("load"), None);
        assert!(reopened.load_permissions().expect("load").is_empty());

        // Clearing twice is fine
        store.clear_all().expect("clear again");
    }

    #[test]
    fn corrupt_entry_is_a_storage_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::new(dir.path()).expect("store");
        std::fs::write(store.key_path(SESSION_KEY), "{not json").expect("write");

        let err = store.load_session().unwrap_err();
        assert!(matches!(err, gatekeeper_core::GatekeeperError::Storage { .. }));
    }

    #[test]
    fn memory_store_clears_everything() {
        let store = MemorySessionStore::with_session(session("xyz"));
        store
            .store_permissions(&[PrincipalPermission::new("Roles", "update")])
            .expect("store");
        assert!(!store.is_empty());

        store.clear_all().expect("clear");
        assert!(store.is_empty());
        assert_eq!(store.bearer_token().expect("token"), None);
    }
}
