//! Shared fakes for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use voice_control::catalog::{Category, FeatureCatalog};
use voice_control::config::HttpConfig;
use voice_control::http::{AppState, HttpServer};
use voice_control::query::{
    ChannelEntry, ClientEntry, ClientId, ClientInfo, ClientKind, ClientMatch, GroupEntry,
    QueryError, QueryResult, ServerQuery, TextTarget, WhoAmI,
};
use voice_control::reconcile::ConfigReconciler;
use voice_control::reload::Reloader;
use voice_control::store::ConfigStore;

/// Scriptable in-process stand-in for the voice server query session.
#[derive(Default)]
pub struct FakeQuery {
    pub query_clients: Mutex<Vec<ClientId>>,
    pub self_id: Mutex<ClientId>,
    pub broken: Mutex<bool>,
    pub failing_sends: Mutex<bool>,
    pub channels: Mutex<Vec<ChannelEntry>>,
    pub server_groups: Mutex<Vec<GroupEntry>>,
    pub channel_groups: Mutex<Vec<GroupEntry>>,
    pub clients: Mutex<Vec<(ClientMatch, Option<ClientInfo>)>>,
    pub sent: Mutex<Vec<(ClientId, String)>>,
}

impl FakeQuery {
    /// Controller connected as `self_id`, alongside the given query clients.
    pub fn with_clients(query_clients: Vec<ClientId>, self_id: ClientId) -> Arc<Self> {
        let fake = Self::default();
        *fake.query_clients.lock().unwrap() = query_clients;
        *fake.self_id.lock().unwrap() = self_id;
        Arc::new(fake)
    }

    pub fn set_broken(&self, broken: bool) {
        *self.broken.lock().unwrap() = broken;
    }

    pub fn set_failing_sends(&self, failing: bool) {
        *self.failing_sends.lock().unwrap() = failing;
    }

    pub fn sent(&self) -> Vec<(ClientId, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn check(&self) -> QueryResult<()> {
        if *self.broken.lock().unwrap() {
            Err(QueryError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ServerQuery for FakeQuery {
    async fn client_list(&self, kind: ClientKind) -> QueryResult<Vec<ClientEntry>> {
        self.check()?;
        if kind != ClientKind::Query {
            return Ok(Vec::new());
        }
        Ok(self
            .query_clients
            .lock()
            .unwrap()
            .iter()
            .map(|&clid| ClientEntry {
                clid,
                cid: 1,
                database_id: 1,
                nickname: format!("query-{}", clid),
                kind,
            })
            .collect())
    }

    async fn whoami(&self) -> QueryResult<WhoAmI> {
        self.check()?;
        Ok(WhoAmI {
            client_id: *self.self_id.lock().unwrap(),
            channel_id: 1,
            nickname: "ControlBot".to_string(),
        })
    }

    async fn send_text_message(&self, _mode: TextTarget, target: u32, message: &str) -> QueryResult<()> {
        self.check()?;
        if *self.failing_sends.lock().unwrap() {
            return Err(QueryError::Server {
                id: 512,
                message: "invalid clientID".to_string(),
            });
        }
        self.sent.lock().unwrap().push((target, message.to_string()));
        Ok(())
    }

    async fn channel_list(&self) -> QueryResult<Vec<ChannelEntry>> {
        self.check()?;
        Ok(self.channels.lock().unwrap().clone())
    }

    async fn server_group_list(&self) -> QueryResult<Vec<GroupEntry>> {
        self.check()?;
        Ok(self.server_groups.lock().unwrap().clone())
    }

    async fn channel_group_list(&self) -> QueryResult<Vec<GroupEntry>> {
        self.check()?;
        Ok(self.channel_groups.lock().unwrap().clone())
    }

    async fn client_find(&self, pattern: &str) -> QueryResult<Vec<ClientMatch>> {
        self.check()?;
        Ok(self
            .clients
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m.nickname.contains(pattern))
            .map(|(m, _)| m.clone())
            .collect())
    }

    async fn client_info(&self, clid: ClientId) -> QueryResult<Option<ClientInfo>> {
        self.check()?;
        Ok(self
            .clients
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m.clid == clid)
            .and_then(|(_, info)| info.clone()))
    }
}

pub fn test_catalog() -> Arc<FeatureCatalog> {
    Arc::new(
        FeatureCatalog::new(vec![
            Category {
                name: "commands".to_string(),
                features: vec!["commandHelp".to_string(), "commandMove".to_string()],
            },
            Category {
                name: "intervals".to_string(),
                features: vec!["doAfkCheck".to_string()],
            },
            Category {
                name: "events".to_string(),
                features: vec!["getClientJoin".to_string()],
            },
        ])
        .unwrap(),
    )
}

/// Router mounted at the root, wired to the given store and query fake.
pub fn test_router(store: Arc<dyn ConfigStore>, query: Arc<FakeQuery>) -> axum::Router {
    let config = HttpConfig {
        base_path: String::new(),
        ..HttpConfig::default()
    };
    HttpServer::new(&config, test_state(store, query)).router()
}

pub fn test_state(store: Arc<dyn ConfigStore>, query: Arc<FakeQuery>) -> AppState {
    let query: Arc<dyn ServerQuery> = query;
    let reloader = Reloader::new(query.clone(), "!", Duration::from_millis(500));
    let reconciler = Arc::new(ConfigReconciler::new(test_catalog(), store, reloader));
    AppState { reconciler, query }
}

/// Reply that makes the mock server drop the connection instead of answering.
pub const HANG_UP: &str = "<hang up>";

/// Minimal raw ServerQuery server. `respond` maps each received command line
/// to the reply lines (without terminators), or to [`HANG_UP`]. Returns the
/// bound address and the log of received commands.
pub async fn start_mock_query_server<F>(respond: F) -> (SocketAddr, Arc<Mutex<Vec<String>>>)
where
    F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let log = received.clone();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let respond = respond.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let (read, mut write) = socket.into_split();
                let greeting = "TS3\n\rWelcome to the TeamSpeak 3 ServerQuery interface.\n\r";
                if write.write_all(greeting.as_bytes()).await.is_err() {
                    return;
                }
                let mut lines = BufReader::new(read).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let line = line.trim().to_string();
                    log.lock().unwrap().push(line.clone());
                    if line == "quit" {
                        break;
                    }
                    let lines = respond(&line);
                    if lines.iter().any(|l| l == HANG_UP) {
                        break;
                    }
                    let mut reply = String::new();
                    for out in lines {
                        reply.push_str(&out);
                        reply.push_str("\n\r");
                    }
                    if write.write_all(reply.as_bytes()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (addr, received)
}

/// Replies of a well-behaved server hosting the controller (clid 1) and a
/// worker bot (clid 5).
pub fn standard_replies(line: &str) -> Vec<String> {
    let ok = "error id=0 msg=ok".to_string();
    let command = line.split(' ').next().unwrap_or_default();
    let replies: HashMap<&str, &str> = HashMap::from([
        ("whoami", "virtualserver_status=online virtualserver_id=1 client_id=1 client_channel_id=1 client_nickname=ControlBot"),
        ("clientlist", "clid=1 cid=1 client_database_id=1 client_nickname=ControlBot client_type=1|clid=5 cid=1 client_database_id=2 client_nickname=Worker client_type=1|clid=9 cid=2 client_database_id=3 client_nickname=Alice client_type=0"),
        ("channellist", "cid=1 pid=0 channel_order=0 channel_name=Lobby total_clients=2|cid=2 pid=1 channel_order=0 channel_name=AFK\\sRoom total_clients=1"),
        ("version", "version=3.13.7 build=1655727713 platform=Linux"),
    ]);
    match replies.get(command) {
        Some(data) => vec![data.to_string(), ok],
        None if command == "clientinfo" => vec!["error id=512 msg=invalid\\sclientID".to_string()],
        None => vec![ok],
    }
}
