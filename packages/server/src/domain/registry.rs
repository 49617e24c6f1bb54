//! Session Registry
//!
//! Owns the process-local mapping from document id to [`DocumentSession`].
//! Every mutation of presence state goes through the methods here; the lock
//! is global to the registry, so `register`, `deregister`, `update_cursor`
//! and roster iteration never interleave.
//!
//! A `DocumentSession` is created lazily by the first `register` and evicted
//! as soon as its last collaborator leaves.

use std::{collections::HashMap, convert::Infallible};

use tokio::sync::{Mutex, mpsc};

use super::{
    entity::{Collaborator, Identity},
    error::MessagePushError,
    value_object::{Color, ConnectionId, Cursor, DocumentId, UserId},
};

/// Outbound channel of one connection; the connection's writer task drains it.
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// Handle to one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: PusherChannel,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: PusherChannel) -> Self {
        Self { id, sender }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// A handle stops being writable once its writer has gone away.
    pub fn is_writable(&self) -> bool {
        !self.sender.is_closed()
    }

    pub fn send(&self, user_id: &UserId, content: String) -> Result<(), MessagePushError> {
        self.sender
            .send(content)
            .map_err(|_| MessagePushError::ConnectionClosed(user_id.as_str().to_string()))
    }
}

/// Live roster and connections for one document on this instance.
///
/// `collaborators` and `connections` always hold the same key set.
#[derive(Debug)]
pub struct DocumentSession {
    document_id: DocumentId,
    collaborators: HashMap<UserId, Collaborator>,
    connections: HashMap<UserId, ConnectionHandle>,
}

impl DocumentSession {
    fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            collaborators: HashMap::new(),
            connections: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.collaborators.len()
    }

    fn is_empty(&self) -> bool {
        self.collaborators.is_empty()
    }

    fn insert(&mut self, collaborator: Collaborator, connection: ConnectionHandle) {
        let user_id = collaborator.user_id.clone();
        self.collaborators.insert(user_id.clone(), collaborator);
        self.connections.insert(user_id, connection);
        self.assert_paired();
    }

    fn remove(&mut self, user_id: &UserId) -> Option<(Collaborator, ConnectionHandle)> {
        let collaborator = self.collaborators.remove(user_id);
        let connection = self.connections.remove(user_id);
        self.assert_paired();
        match (collaborator, connection) {
            (Some(collaborator), Some(connection)) => Some((collaborator, connection)),
            (None, None) => None,
            _ => panic!(
                "document session '{}' lost pairing for user '{}'",
                self.document_id, user_id
            ),
        }
    }

    fn roster(&self) -> Vec<Collaborator> {
        let mut roster: Vec<Collaborator> = self.collaborators.values().cloned().collect();
        // Sort by user id for consistent ordering
        roster.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        roster
    }

    fn assert_paired(&self) {
        debug_assert_eq!(self.collaborators.len(), self.connections.len());
        debug_assert!(
            self.collaborators
                .keys()
                .all(|user_id| self.connections.contains_key(user_id))
        );
    }
}

/// Result of [`SessionRegistry::register`].
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub collaborator: Collaborator,
    /// Roster right after the join, sorted by user id.
    pub roster: Vec<Collaborator>,
    /// Connection displaced by this registration, if the user was already present.
    pub replaced: Option<ConnectionId>,
}

/// Process-local registry of document sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<DocumentId, DocumentSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `identity` to the session of `document_id`, creating the session if needed.
    ///
    /// The color is derived from the number of collaborators already present.
    /// A user that is already registered is replaced under the same key and
    /// keeps the color it had.
    pub async fn register(
        &self,
        document_id: &DocumentId,
        identity: Identity,
        connection: ConnectionHandle,
    ) -> Registration {
        let greeted = self
            .register_with_greeting(document_id, identity, connection, |_, _| {
                Ok::<_, Infallible>(None)
            })
            .await;
        match greeted {
            Ok(registration) => registration,
            Err(never) => match never {},
        }
    }

    /// [`register`](Self::register), queueing a first frame on the new connection.
    ///
    /// `greeting` receives the new collaborator and the roster as it will be
    /// after the join. Its frame is queued before the connection becomes
    /// visible to any broadcast, so it is always the first frame the
    /// connection receives. If `greeting` fails nothing is registered.
    pub async fn register_with_greeting<E>(
        &self,
        document_id: &DocumentId,
        identity: Identity,
        connection: ConnectionHandle,
        greeting: impl FnOnce(&Collaborator, &[Collaborator]) -> Result<Option<String>, E>,
    ) -> Result<Registration, E> {
        let mut sessions = self.sessions.lock().await;

        let existing = sessions.get(document_id);
        let color = existing
            .and_then(|session| session.collaborators.get(&identity.user_id))
            .map(|previous| previous.color)
            .unwrap_or_else(|| Color::of(existing.map_or(0, DocumentSession::len)));
        let collaborator = Collaborator::new(identity, color);

        let mut roster: Vec<Collaborator> = existing
            .map(DocumentSession::roster)
            .unwrap_or_default()
            .into_iter()
            .filter(|other| other.user_id != collaborator.user_id)
            .collect();
        roster.push(collaborator.clone());
        roster.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        if let Some(frame) = greeting(&collaborator, &roster)? {
            if let Err(e) = connection.send(&collaborator.user_id, frame) {
                tracing::warn!("Failed to queue greeting: {}", e);
            }
        }

        let session = sessions
            .entry(document_id.clone())
            .or_insert_with(|| DocumentSession::new(document_id.clone()));
        let replaced = session
            .remove(&collaborator.user_id)
            .map(|(_, previous)| previous.id());
        session.insert(collaborator.clone(), connection);

        Ok(Registration {
            collaborator,
            roster,
            replaced,
        })
    }

    /// Remove `user_id` from the session of `document_id`.
    ///
    /// Evicts the session when it becomes empty. Removing an absent user is a no-op.
    pub async fn deregister(
        &self,
        document_id: &DocumentId,
        user_id: &UserId,
    ) -> Option<Collaborator> {
        let mut sessions = self.sessions.lock().await;
        Self::remove_locked(&mut sessions, document_id, user_id, None)
    }

    /// Like [`deregister`](Self::deregister), but only if the registered
    /// connection is still `connection_id`.
    ///
    /// A connection displaced by a newer one from the same user must not tear
    /// down the newer registration.
    pub async fn deregister_connection(
        &self,
        document_id: &DocumentId,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> Option<Collaborator> {
        let mut sessions = self.sessions.lock().await;
        Self::remove_locked(&mut sessions, document_id, user_id, Some(connection_id))
    }

    fn remove_locked(
        sessions: &mut HashMap<DocumentId, DocumentSession>,
        document_id: &DocumentId,
        user_id: &UserId,
        connection_id: Option<ConnectionId>,
    ) -> Option<Collaborator> {
        let session = sessions.get_mut(document_id)?;
        if let Some(expected) = connection_id {
            let current = session.connections.get(user_id)?;
            if current.id() != expected {
                return None;
            }
        }

        let removed = session.remove(user_id).map(|(collaborator, _)| collaborator);
        if session.is_empty() {
            sessions.remove(document_id);
            tracing::debug!("Document session '{}' evicted", document_id);
        }
        removed
    }

    /// Current roster of `document_id`, sorted by user id. Empty if no session exists.
    pub async fn snapshot(&self, document_id: &DocumentId) -> Vec<Collaborator> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(document_id)
            .map(DocumentSession::roster)
            .unwrap_or_default()
    }

    /// Presence record of one user, if registered.
    pub async fn collaborator(
        &self,
        document_id: &DocumentId,
        user_id: &UserId,
    ) -> Option<Collaborator> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(document_id)
            .and_then(|session| session.collaborators.get(user_id))
            .cloned()
    }

    /// Store the last known cursor of a user.
    ///
    /// Returns `false` (and changes nothing) if the user is not registered,
    /// which happens when a cursor message races the sender's own disconnect.
    pub async fn update_cursor(
        &self,
        document_id: &DocumentId,
        user_id: &UserId,
        cursor: Cursor,
    ) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions
            .get_mut(document_id)
            .and_then(|session| session.collaborators.get_mut(user_id))
        {
            Some(collaborator) => {
                collaborator.cursor = Some(cursor);
                true
            }
            None => false,
        }
    }

    /// Connection registered for one user.
    pub async fn connection(
        &self,
        document_id: &DocumentId,
        user_id: &UserId,
    ) -> Option<ConnectionHandle> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(document_id)
            .and_then(|session| session.connections.get(user_id))
            .cloned()
    }

    /// Connections of `document_id`, leaving out `exclude` when given.
    ///
    /// `None` means the document has no session on this instance.
    pub async fn connections_except(
        &self,
        document_id: &DocumentId,
        exclude: Option<&UserId>,
    ) -> Option<Vec<(UserId, ConnectionHandle)>> {
        let sessions = self.sessions.lock().await;
        let session = sessions.get(document_id)?;
        Some(
            session
                .connections
                .iter()
                .filter(|(user_id, _)| Some(*user_id) != exclude)
                .map(|(user_id, connection)| (user_id.clone(), connection.clone()))
                .collect(),
        )
    }

    /// Number of live document sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn contains_document(&self, document_id: &DocumentId) -> bool {
        self.sessions.lock().await.contains_key(document_id)
    }

    /// Checks that every session pairs collaborators with connections and none is empty.
    #[cfg(test)]
    pub(crate) async fn is_consistent(&self) -> bool {
        let sessions = self.sessions.lock().await;
        sessions.values().all(|session| {
            !session.is_empty()
                && session.collaborators.len() == session.connections.len()
                && session
                    .collaborators
                    .keys()
                    .all(|user_id| session.connections.contains_key(user_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> DocumentId {
        DocumentId::new(id.to_string()).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn identity(id: &str) -> Identity {
        Identity::new(user(id), format!("User {id}"))
    }

    fn handle() -> (ConnectionHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(ConnectionId::generate(), tx), rx)
    }

    #[tokio::test]
    async fn test_register_creates_session_lazily() {
        // given:
        let registry = SessionRegistry::new();
        let (connection, _rx) = handle();
        assert_eq!(registry.session_count().await, 0);

        // when:
        let registration = registry
            .register(&doc("d1"), identity("alice"), connection)
            .await;

        // then:
        assert_eq!(registration.collaborator.user_id, user("alice"));
        assert_eq!(registration.collaborator.color, Color::of(0));
        assert_eq!(registration.replaced, None);
        assert!(registry.contains_document(&doc("d1")).await);
        assert_eq!(registry.snapshot(&doc("d1")).await.len(), 1);
    }

    #[tokio::test]
    async fn test_pairing_holds_after_every_step() {
        // given: a mixed sequence of joins and leaves on one document
        let registry = SessionRegistry::new();
        let d = doc("d1");
        let steps: [(&str, bool); 9] = [
            ("alice", true),
            ("bob", true),
            ("carol", true),
            ("bob", false),
            ("dave", true),
            ("alice", false),
            ("alice", false),
            ("carol", false),
            ("dave", false),
        ];
        let mut receivers = Vec::new();

        for (name, join) in steps {
            // when:
            if join {
                let (connection, rx) = handle();
                receivers.push(rx);
                registry.register(&d, identity(name), connection).await;
            } else {
                registry.deregister(&d, &user(name)).await;
            }

            // then:
            assert!(registry.is_consistent().await, "broken after {name}");
            let roster = registry.snapshot(&d).await;
            for collaborator in &roster {
                assert!(registry.connection(&d, &collaborator.user_id).await.is_some());
            }
        }
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_last_leave_evicts_document_session() {
        // given:
        let registry = SessionRegistry::new();
        let d = doc("d1");
        let before = registry.session_count().await;
        let (c1, _rx1) = handle();
        let (c2, _rx2) = handle();
        registry.register(&d, identity("alice"), c1).await;
        registry.register(&d, identity("bob"), c2).await;

        // when:
        registry.deregister(&d, &user("alice")).await;
        assert!(registry.contains_document(&d).await);
        registry.deregister(&d, &user("bob")).await;

        // then:
        assert!(!registry.contains_document(&d).await);
        assert_eq!(registry.session_count().await, before);
    }

    #[tokio::test]
    async fn test_deregister_absent_user_is_noop() {
        // given:
        let registry = SessionRegistry::new();
        let d = doc("d1");
        let (connection, _rx) = handle();
        registry.register(&d, identity("alice"), connection).await;

        // when:
        let missing_user = registry.deregister(&d, &user("bob")).await;
        let missing_doc = registry.deregister(&doc("other"), &user("alice")).await;

        // then:
        assert!(missing_user.is_none());
        assert!(missing_doc.is_none());
        assert_eq!(registry.snapshot(&d).await.len(), 1);
        assert!(!registry.contains_document(&doc("other")).await);
    }

    #[tokio::test]
    async fn test_colors_depend_only_on_join_order() {
        // given:
        let names = ["u1", "u2", "u3", "u4", "u5", "u6", "u7", "u8", "u9", "u10"];

        async fn join_all(names: &[&str]) -> Vec<Color> {
            let registry = SessionRegistry::new();
            let d = DocumentId::new("d1".to_string()).unwrap();
            let mut colors = Vec::new();
            for name in names {
                let (tx, _rx) = mpsc::unbounded_channel();
                let connection = ConnectionHandle::new(ConnectionId::generate(), tx);
                let identity = Identity::new(UserId::new(name.to_string()).unwrap(), name.to_string());
                colors.push(registry.register(&d, identity, connection).await.collaborator.color);
            }
            colors
        }

        // when:
        let first_run = join_all(&names).await;
        let second_run = join_all(&names).await;

        // then:
        assert_eq!(first_run, second_run);
        for (index, color) in first_run.iter().enumerate() {
            assert_eq!(*color, Color::of(index));
        }
    }

    #[tokio::test]
    async fn test_same_user_replaces_instead_of_duplicating() {
        // given:
        let registry = SessionRegistry::new();
        let d = doc("d1");
        let (old, mut old_rx) = handle();
        let old_id = old.id();
        let (other, _other_rx) = handle();
        registry.register(&d, identity("alice"), old).await;
        registry.register(&d, identity("bob"), other).await;

        // when:
        let (new, _new_rx) = handle();
        let new_id = new.id();
        let registration = registry.register(&d, identity("alice"), new).await;

        // then:
        assert_eq!(registration.replaced, Some(old_id));
        assert_eq!(registration.collaborator.color, Color::of(0));
        assert_eq!(registry.snapshot(&d).await.len(), 2);
        let current = registry.connection(&d, &user("alice")).await.unwrap();
        assert_eq!(current.id(), new_id);
        // the displaced writer sees its channel end
        assert_eq!(old_rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_stale_connection_cannot_deregister_replacement() {
        // given:
        let registry = SessionRegistry::new();
        let d = doc("d1");
        let (old, _old_rx) = handle();
        let old_id = old.id();
        registry.register(&d, identity("alice"), old).await;
        let (new, _new_rx) = handle();
        let new_id = new.id();
        registry.register(&d, identity("alice"), new).await;

        // when:
        let stale = registry
            .deregister_connection(&d, &user("alice"), old_id)
            .await;

        // then:
        assert!(stale.is_none());
        assert_eq!(registry.snapshot(&d).await.len(), 1);

        let current = registry
            .deregister_connection(&d, &user("alice"), new_id)
            .await;
        assert!(current.is_some());
        assert!(!registry.contains_document(&d).await);
    }

    #[tokio::test]
    async fn test_update_cursor_mutates_in_place() {
        // given:
        let registry = SessionRegistry::new();
        let d = doc("d1");
        let (connection, _rx) = handle();
        registry.register(&d, identity("alice"), connection).await;
        let cursor = Cursor {
            x: 10.0,
            y: 20.0,
            page: 2,
        };

        // when:
        let updated = registry.update_cursor(&d, &user("alice"), cursor).await;

        // then:
        assert!(updated);
        let alice = registry.collaborator(&d, &user("alice")).await.unwrap();
        assert_eq!(alice.cursor, Some(cursor));
    }

    #[tokio::test]
    async fn test_update_cursor_for_unknown_user_is_ignored() {
        // given:
        let registry = SessionRegistry::new();
        let cursor = Cursor {
            x: 1.0,
            y: 1.0,
            page: 1,
        };

        // when:
        let updated = registry.update_cursor(&doc("d1"), &user("ghost"), cursor).await;

        // then:
        assert!(!updated);
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_is_sorted_by_user_id() {
        // given:
        let registry = SessionRegistry::new();
        let d = doc("d1");
        let mut receivers = Vec::new();
        for name in ["carol", "alice", "bob"] {
            let (connection, rx) = handle();
            receivers.push(rx);
            registry.register(&d, identity(name), connection).await;
        }

        // when:
        let roster = registry.snapshot(&d).await;

        // then:
        let ids: Vec<&str> = roster.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn test_connections_except_filters_excluded_user() {
        // given:
        let registry = SessionRegistry::new();
        let d = doc("d1");
        let (c1, _rx1) = handle();
        let (c2, _rx2) = handle();
        registry.register(&d, identity("alice"), c1).await;
        registry.register(&d, identity("bob"), c2).await;

        // when:
        let all = registry.connections_except(&d, None).await.unwrap();
        let others = registry
            .connections_except(&d, Some(&user("alice")))
            .await
            .unwrap();
        let absent = registry.connections_except(&doc("nope"), None).await;

        // then:
        assert_eq!(all.len(), 2);
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].0, user("bob"));
        assert!(absent.is_none());
    }

    #[tokio::test]
    async fn test_greeting_sees_post_join_roster_and_is_queued_first() {
        // given:
        let registry = SessionRegistry::new();
        let d = doc("d1");
        let (c1, _rx1) = handle();
        registry.register(&d, identity("bob"), c1).await;
        let (c2, mut rx2) = handle();

        // when:
        let registration = registry
            .register_with_greeting(&d, identity("alice"), c2, |joined, roster| {
                let ids: Vec<&str> = roster.iter().map(|c| c.user_id.as_str()).collect();
                Ok::<_, Infallible>(Some(format!("{}:{}", joined.user_id, ids.join(","))))
            })
            .await
            .unwrap();

        // then:
        assert_eq!(rx2.try_recv().unwrap(), "alice:alice,bob");
        let ids: Vec<&str> = registration
            .roster
            .iter()
            .map(|c| c.user_id.as_str())
            .collect();
        assert_eq!(ids, vec!["alice", "bob"]);
        assert_eq!(registry.snapshot(&d).await, registration.roster);
    }

    #[tokio::test]
    async fn test_failed_greeting_registers_nothing() {
        // given:
        let registry = SessionRegistry::new();
        let d = doc("d1");
        let (c1, mut rx1) = handle();

        // when:
        let result = registry
            .register_with_greeting(&d, identity("alice"), c1, |_, _| Err("encode failed"))
            .await;

        // then:
        assert_eq!(result.unwrap_err(), "encode failed");
        assert!(rx1.try_recv().is_err());
        assert_eq!(registry.session_count().await, 0);
    }
}
