//! End-to-end tests: a gateway served in-process on an ephemeral port,
//! driven by real WebSocket and HTTP clients.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use collab_gateway::{
    domain::{DocumentId, SessionRegistry},
    infrastructure::{
        auth::JwtTokenVerifier, bus::InMemoryPresenceBus,
        message_pusher::WebSocketMessagePusher, repository::InMemoryChatHistoryStore,
    },
    ui::{AUTH_FAILED_CLOSE_CODE, Server},
    usecase::{
        ConnectCollaboratorUseCase, DisconnectCollaboratorUseCase, GetChatHistoryUseCase,
        GetCollaboratorsUseCase, PresenceMirror, RelayMessageUseCase,
    },
};
use collab_shared::time::SystemClock;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const SECRET: &str = "an-end-to-end-test-secret-of-32-chars!";
const WAIT: Duration = Duration::from_secs(5);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestGateway {
    addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    issuer: JwtTokenVerifier,
}

impl TestGateway {
    async fn start() -> Self {
        Self::start_with_idle_timeout(Duration::from_secs(30)).await
    }

    async fn start_with_idle_timeout(idle_timeout: Duration) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let message_pusher = Arc::new(WebSocketMessagePusher::new(registry.clone()));
        let history_store = Arc::new(InMemoryChatHistoryStore::new());
        let (presence_mirror, _worker) =
            PresenceMirror::spawn(Arc::new(InMemoryPresenceBus::new()), 3);
        let presence_mirror = Arc::new(presence_mirror);

        let server = Server::new(
            Arc::new(ConnectCollaboratorUseCase::new(
                Arc::new(JwtTokenVerifier::new(SECRET, Arc::new(SystemClock)).unwrap()),
                registry.clone(),
                message_pusher.clone(),
                presence_mirror.clone(),
            )),
            Arc::new(RelayMessageUseCase::new(
                registry.clone(),
                message_pusher.clone(),
                history_store.clone(),
                Arc::new(SystemClock),
                100,
            )),
            Arc::new(DisconnectCollaboratorUseCase::new(
                registry.clone(),
                message_pusher,
                presence_mirror,
            )),
            Arc::new(GetChatHistoryUseCase::new(history_store, 100)),
            Arc::new(GetCollaboratorsUseCase::new(registry.clone())),
            idle_timeout,
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = server.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            registry,
            issuer: JwtTokenVerifier::new(SECRET, Arc::new(SystemClock)).unwrap(),
        }
    }

    fn ws_url(&self, document_id: &str, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/ws/document/{}?token={}", self.addr, document_id, token),
            None => format!("ws://{}/ws/document/{}", self.addr, document_id),
        }
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn join(&self, document_id: &str, user_id: &str, name: &str) -> Client {
        let token = self.issuer.issue(user_id, name, 600).unwrap();
        let (client, _) = connect_async(self.ws_url(document_id, Some(&token)))
            .await
            .unwrap();
        client
    }

    /// Polls until the registry no longer holds `document_id`.
    async fn wait_until_evicted(&self, document_id: &str) {
        let doc = DocumentId::new(document_id.to_string()).unwrap();
        tokio::time::timeout(WAIT, async {
            while self.registry.contains_document(&doc).await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("session was not evicted");
    }
}

/// Reads frames until one with the given `tipo` arrives.
async fn next_of(client: &mut Client, tipo: &str) -> Value {
    next_matching(client, tipo, |_| true).await
}

/// Reads frames until one with the given `tipo` satisfies `accept`.
async fn next_matching(client: &mut Client, tipo: &str, accept: impl Fn(&Value) -> bool) -> Value {
    tokio::time::timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => {
                    let value: Value = serde_json::from_str(text.as_str()).unwrap();
                    if value["tipo"] == tipo && accept(&value) {
                        return value;
                    }
                }
                Some(Ok(_)) => continue,
                other => panic!("connection ended while waiting for '{}': {:?}", tipo, other),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for '{}'", tipo))
}

async fn entry_of(client: &mut Client, user_id: &str) -> Value {
    next_matching(client, "usuario_entrou", |v| v["usuario"]["user_id"] == user_id).await
}

async fn send(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

fn roster_ids(value: &Value) -> Vec<String> {
    value["colaboradores"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["user_id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_join_and_leave_notify_the_other_collaborator() {
    // given: A is alone in the document
    let gateway = TestGateway::start().await;
    let mut alice = gateway.join("doc-1", "alice", "Alice").await;
    let initial = next_of(&mut alice, "estado_inicial").await;
    assert_eq!(initial["seu_id"], "alice");
    assert_eq!(roster_ids(&initial), vec!["alice"]);

    // when: B joins
    let mut bob = gateway.join("doc-1", "bob", "Bob").await;

    // then: B sees both, A is told about B
    let initial = next_of(&mut bob, "estado_inicial").await;
    assert_eq!(initial["seu_id"], "bob");
    assert_eq!(roster_ids(&initial), vec!["alice", "bob"]);
    let entered = entry_of(&mut alice, "bob").await;
    assert_eq!(entered["usuario"]["nome"], "Bob");
    assert_ne!(entered["usuario"]["cor"], initial["colaboradores"][0]["cor"]);

    // when: B leaves
    bob.close(None).await.unwrap();

    // then: A is told B left and the roster shrinks
    let left = next_of(&mut alice, "usuario_saiu").await;
    assert_eq!(left["user_id"], "bob");
    assert_eq!(roster_ids(&left), vec!["alice"]);

    // when: A leaves too
    alice.close(None).await.unwrap();

    // then: the document session is gone
    gateway.wait_until_evicted("doc-1").await;
    assert_eq!(gateway.registry.session_count().await, 0);
}

#[tokio::test]
async fn test_invalid_token_is_closed_with_4001() {
    // given
    let gateway = TestGateway::start().await;

    for url in [
        gateway.ws_url("doc-1", Some("not-a-jwt")),
        gateway.ws_url("doc-1", None),
    ] {
        // when
        let (mut client, _) = connect_async(url).await.unwrap();
        let frame = tokio::time::timeout(WAIT, client.next()).await.unwrap();

        // then
        match frame {
            Some(Ok(Message::Close(Some(frame)))) => {
                assert_eq!(u16::from(frame.code), AUTH_FAILED_CLOSE_CODE);
                assert_eq!(frame.reason.as_str(), "Token inválido");
            }
            other => panic!("expected close frame, got {:?}", other),
        }
    }

    assert_eq!(gateway.registry.session_count().await, 0);
}

#[tokio::test]
async fn test_cursor_and_edit_reach_only_the_others() {
    // given
    let gateway = TestGateway::start().await;
    let mut alice = gateway.join("doc-2", "alice", "Alice").await;
    next_of(&mut alice, "estado_inicial").await;
    let mut bob = gateway.join("doc-2", "bob", "Bob").await;
    next_of(&mut bob, "estado_inicial").await;
    entry_of(&mut alice, "bob").await;

    // when
    send(
        &mut alice,
        json!({"tipo": "cursor_move", "cursor": {"x": 1.5, "y": 2.0, "pagina": 3}}),
    )
    .await;
    send(
        &mut alice,
        json!({"tipo": "edicao", "operacao": {"insert": "hello", "at": 4}}),
    )
    .await;

    // then
    let cursor = next_of(&mut bob, "cursor_atualizado").await;
    assert_eq!(cursor["user_id"], "alice");
    assert_eq!(cursor["cursor"]["pagina"], 3);
    let edit = next_of(&mut bob, "edicao").await;
    assert_eq!(edit["operacao"], json!({"insert": "hello", "at": 4}));

    // and: the sender hears nothing back before its own pong
    send(&mut alice, json!({"tipo": "ping"})).await;
    tokio::time::timeout(WAIT, async {
        loop {
            let Some(Ok(Message::Text(text))) = alice.next().await else {
                continue;
            };
            let value: Value = serde_json::from_str(text.as_str()).unwrap();
            assert_ne!(value["tipo"], "cursor_atualizado");
            assert_ne!(value["tipo"], "edicao");
            if value["tipo"] == "pong" {
                return;
            }
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_chat_is_echoed_and_kept_in_history() {
    // given
    let gateway = TestGateway::start().await;
    let mut alice = gateway.join("doc-3", "alice", "Alice").await;
    next_of(&mut alice, "estado_inicial").await;

    // when
    for text in ["a", "b", "c"] {
        send(&mut alice, json!({"tipo": "chat", "texto": text})).await;
        let echo = next_of(&mut alice, "chat").await;
        assert_eq!(echo["texto"], text);
        assert_eq!(echo["nome"], "Alice");
    }
    // frames are handled in order, so the pong follows the last append
    send(&mut alice, json!({"tipo": "ping"})).await;
    next_of(&mut alice, "pong").await;

    // then
    let history: Value = reqwest::get(gateway.http_url("/api/documents/doc-3/chat"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["document_id"], "doc-3");
    let texts: Vec<&str> = history["mensagens"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["texto"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["a", "b", "c"]);

    let limited: Value = reqwest::get(gateway.http_url("/api/documents/doc-3/chat?limit=2"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(limited["mensagens"].as_array().unwrap().len(), 2);
    assert_eq!(limited["mensagens"][1]["texto"], "c");
}

#[tokio::test]
async fn test_http_endpoints() {
    // given
    let gateway = TestGateway::start().await;
    let mut alice = gateway.join("doc-4", "alice", "Alice").await;
    next_of(&mut alice, "estado_inicial").await;

    // when
    let health: Value = reqwest::get(gateway.http_url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let roster: Value = reqwest::get(gateway.http_url("/api/documents/doc-4/collaborators"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let too_long = "x".repeat(129);
    let rejected = reqwest::get(gateway.http_url(&format!("/api/documents/{}/chat", too_long)))
        .await
        .unwrap();

    // then
    assert_eq!(health["status"], "ok");
    assert_eq!(health["active_sessions"], 1);
    assert_eq!(roster_ids(&roster), vec!["alice"]);
    assert_eq!(rejected.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reconnect_replaces_previous_connection() {
    // given
    let gateway = TestGateway::start().await;
    let mut observer = gateway.join("doc-5", "obs", "Observer").await;
    next_of(&mut observer, "estado_inicial").await;
    let mut first = gateway.join("doc-5", "alice", "Alice").await;
    let initial = next_of(&mut first, "estado_inicial").await;
    let color = initial["colaboradores"][0]["cor"].clone();
    entry_of(&mut observer, "alice").await;

    // when: the same user connects again
    let mut second = gateway.join("doc-5", "alice", "Alice").await;
    let initial = next_of(&mut second, "estado_inicial").await;

    // then: one record, same color, and the old socket is closed
    assert_eq!(roster_ids(&initial), vec!["alice", "obs"]);
    assert_eq!(initial["colaboradores"][0]["cor"], color);
    let closed = tokio::time::timeout(WAIT, async {
        loop {
            match first.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());

    // and: the stale connection's cleanup does not remove the new one
    tokio::time::sleep(Duration::from_millis(100)).await;
    let doc = DocumentId::new("doc-5".to_string()).unwrap();
    assert_eq!(gateway.registry.snapshot(&doc).await.len(), 2);
}

#[tokio::test]
async fn test_idle_connection_is_closed_and_announced() {
    // given: A keeps its connection alive, B stays silent
    let gateway = TestGateway::start_with_idle_timeout(Duration::from_millis(300)).await;
    let mut alice = gateway.join("doc-6", "alice", "Alice").await;
    next_of(&mut alice, "estado_inicial").await;
    let mut bob = gateway.join("doc-6", "bob", "Bob").await;
    next_of(&mut bob, "estado_inicial").await;

    // when: the idle timeout passes for B only
    let (mut alice_tx, mut alice_rx) = alice.split();
    let left = tokio::time::timeout(WAIT, async {
        let mut keep_alive = tokio::time::interval(Duration::from_millis(50));
        loop {
            tokio::select! {
                _ = keep_alive.tick() => {
                    let ping = json!({"tipo": "ping"}).to_string();
                    alice_tx.send(Message::Text(ping.into())).await.unwrap();
                }
                frame = alice_rx.next() => {
                    let Some(Ok(Message::Text(text))) = frame else {
                        panic!("connection of alice ended: {:?}", frame);
                    };
                    let value: Value = serde_json::from_str(text.as_str()).unwrap();
                    if value["tipo"] == "usuario_saiu" {
                        return value;
                    }
                }
            }
        }
    })
    .await
    .expect("no usuario_saiu for the idle connection");

    // then: A is told B left, and B's socket is closed
    assert_eq!(left["user_id"], "bob");
    assert_eq!(roster_ids(&left), vec!["alice"]);
    let closed = tokio::time::timeout(WAIT, async {
        loop {
            match bob.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn test_malformed_frames_keep_the_connection_open() {
    // given
    let gateway = TestGateway::start().await;
    let mut alice = gateway.join("doc-7", "alice", "Alice").await;
    next_of(&mut alice, "estado_inicial").await;

    // when
    alice
        .send(Message::Text("{not json".to_string().into()))
        .await
        .unwrap();
    send(&mut alice, json!({"tipo": "desconhecido"})).await;
    send(&mut alice, json!({"tipo": "chat", "texto": "   "})).await;
    send(&mut alice, json!({"tipo": "ping"})).await;

    // then
    next_of(&mut alice, "pong").await;
    let doc = DocumentId::new("doc-7".to_string()).unwrap();
    assert_eq!(gateway.registry.snapshot(&doc).await.len(), 1);
}
