//! Session and identity handling.
//!
//! Identity is owned by an external provider; this crate only needs the
//! current session, change notifications, and sign-out. The local provider
//! keeps the signed-in session in a JSON file with file locking, the same
//! way user state is persisted elsewhere in the crate.

use crate::{Error, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Fixed identifier used for guest sessions
pub const GUEST_USER_ID: &str = "guest-id";

/// The signed-in user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub training_start_date: NaiveDate,
    #[serde(default)]
    pub is_guest: bool,
}

impl UserSession {
    /// Fabricate a guest session; guests never persist anything
    pub fn guest(today: NaiveDate) -> Self {
        Self {
            user_id: GUEST_USER_ID.into(),
            email: "guest@example.com".into(),
            display_name: "Guest User".into(),
            training_start_date: today,
            is_guest: true,
        }
    }
}

/// Handle returned by [`SessionProvider::on_session_change`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback invoked with the new session (or `None` after sign-out)
pub type SessionCallback = Box<dyn FnMut(Option<&UserSession>)>;

/// Identity provider operations the application consumes
pub trait SessionProvider {
    fn current_session(&self) -> Result<Option<UserSession>>;

    fn on_session_change(&mut self, callback: SessionCallback) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    fn sign_out(&mut self) -> Result<()>;
}

/// Subscriber bookkeeping shared by providers
#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, SessionCallback)>,
}

impl Subscribers {
    fn add(&mut self, callback: SessionCallback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.callbacks.push((id, callback));
        id
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(sub, _)| *sub != id);
        self.callbacks.len() != before
    }

    fn notify(&mut self, session: Option<&UserSession>) {
        for (_, callback) in &mut self.callbacks {
            callback(session);
        }
    }
}

/// Provider that stores the session in a local file
pub struct LocalSessionProvider {
    path: PathBuf,
    subscribers: Subscribers,
}

impl LocalSessionProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            subscribers: Subscribers::default(),
        }
    }

    /// Persist `session` as the signed-in user and notify subscribers
    pub fn sign_in(&mut self, session: UserSession) -> Result<()> {
        if session.is_guest {
            return Err(Error::Session(
                "guest sessions are never persisted".into(),
            ));
        }
        if session.user_id.trim().is_empty() {
            return Err(Error::Session("user id must not be empty".into()));
        }

        write_session(&self.path, &session)?;
        tracing::info!("Signed in as {}", session.email);
        self.subscribers.notify(Some(&session));
        Ok(())
    }
}

impl SessionProvider for LocalSessionProvider {
    fn current_session(&self) -> Result<Option<UserSession>> {
        read_session(&self.path)
    }

    fn on_session_change(&mut self, callback: SessionCallback) -> SubscriptionId {
        self.subscribers.add(callback)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    fn sign_out(&mut self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            tracing::info!("Signed out, removed {:?}", self.path);
        }
        self.subscribers.notify(None);
        Ok(())
    }
}

/// Provider for a guest that lives only as long as the process
pub struct GuestSessionProvider {
    session: Option<UserSession>,
    subscribers: Subscribers,
}

impl GuestSessionProvider {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            session: Some(UserSession::guest(today)),
            subscribers: Subscribers::default(),
        }
    }
}

impl SessionProvider for GuestSessionProvider {
    fn current_session(&self) -> Result<Option<UserSession>> {
        Ok(self.session.clone())
    }

    fn on_session_change(&mut self, callback: SessionCallback) -> SubscriptionId {
        self.subscribers.add(callback)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    fn sign_out(&mut self) -> Result<()> {
        self.session = None;
        self.subscribers.notify(None);
        Ok(())
    }
}

fn read_session(path: &Path) -> Result<Option<UserSession>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    file.lock_shared()?;
    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    match serde_json::from_str::<UserSession>(&contents) {
        Ok(session) => Ok(Some(session)),
        Err(e) => {
            tracing::warn!(
                "Failed to parse session file {:?}: {}. Treating as signed out.",
                path,
                e
            );
            Ok(None)
        }
    }
}

fn write_session(path: &Path, session: &UserSession) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "session path missing parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        writer.write_all(serde_json::to_string_pretty(session)?.as_bytes())?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session() -> UserSession {
        UserSession {
            user_id: "user-42".into(),
            email: "ada@example.com".into(),
            display_name: "Ada".into(),
            training_start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            is_guest: false,
        }
    }

    #[test]
    fn test_sign_in_persists_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("session.json");

        let mut provider = LocalSessionProvider::new(&path);
        assert_eq!(provider.current_session().unwrap(), None);

        provider.sign_in(session()).unwrap();

        let reopened = LocalSessionProvider::new(&path);
        assert_eq!(reopened.current_session().unwrap(), Some(session()));
    }

    #[test]
    fn test_sign_out_clears_and_notifies() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();

        let mut provider = LocalSessionProvider::new(&path);
        let sink = Rc::clone(&seen);
        provider.on_session_change(Box::new(move |s: Option<&UserSession>| {
            sink.borrow_mut().push(s.map(|s| s.user_id.clone()));
        }));

        provider.sign_in(session()).unwrap();
        provider.sign_out().unwrap();

        assert_eq!(provider.current_session().unwrap(), None);
        assert_eq!(
            *seen.borrow(),
            vec![Some("user-42".to_string()), None]
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let temp_dir = tempfile::tempdir().unwrap();
        let count = Rc::new(RefCell::new(0));

        let mut provider = LocalSessionProvider::new(temp_dir.path().join("session.json"));
        let sink = Rc::clone(&count);
        let id = provider.on_session_change(Box::new(move |_| *sink.borrow_mut() += 1));

        assert!(provider.unsubscribe(id));
        assert!(!provider.unsubscribe(id));
        provider.sign_in(session()).unwrap();
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_guest_cannot_be_persisted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();

        let mut provider = LocalSessionProvider::new(temp_dir.path().join("session.json"));
        let err = provider.sign_in(UserSession::guest(today)).unwrap_err();
        assert!(matches!(err, Error::Session(_)));
    }

    #[test]
    fn test_guest_provider() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        let mut provider = GuestSessionProvider::new(today);

        let guest = provider.current_session().unwrap().unwrap();
        assert_eq!(guest.user_id, GUEST_USER_ID);
        assert!(guest.is_guest);
        assert_eq!(guest.training_start_date, today);

        provider.sign_out().unwrap();
        assert_eq!(provider.current_session().unwrap(), None);
    }

    #[test]
    fn test_corrupt_session_is_signed_out() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let provider = LocalSessionProvider::new(&path);
        assert_eq!(provider.current_session().unwrap(), None);
    }
}
