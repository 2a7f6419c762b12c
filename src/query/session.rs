//! Long-lived ServerQuery session.
//!
//! # Responsibilities
//! - Connect, log in, select the virtual server and set the bot nickname
//! - Serialize commands from many callers onto one TCP connection
//! - Keep the connection alive and reconnect with backoff when it drops
//!
//! # Design Decisions
//! - One actor task owns the socket; callers talk to it over mpsc + oneshot
//! - Initial connect failures are fatal, later ones trigger reconnects
//! - Every command has a deadline, both on the socket and for the caller
//! - While reconnecting, queued commands fail immediately with `Closed`

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, timeout, Instant};

use crate::config::QueryConfig;
use crate::query::codec::{self, Command, Record, Status};
use crate::query::{
    decode_all, decode_groups, ChannelEntry, ClientEntry, ClientId, ClientInfo, ClientKind,
    ClientMatch, GroupEntry, QueryError, QueryResult, ServerQuery, TextTarget, WhoAmI,
};
use crate::resilience::backoff::calculate_backoff;

const COMMAND_QUEUE_DEPTH: usize = 64;

struct Pending {
    command: String,
    reply: oneshot::Sender<QueryResult<Vec<Record>>>,
}

/// Handle to the running query session. Cheap to clone.
#[derive(Clone)]
pub struct QuerySession {
    tx: mpsc::Sender<Pending>,
    deadline: Duration,
}

impl QuerySession {
    /// Open the connection and spawn the session actor.
    pub async fn connect(
        config: QueryConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> QueryResult<Self> {
        let connection = Connection::establish(&config).await?;
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let deadline = Duration::from_secs(config.command_timeout_secs);

        let worker = SessionWorker {
            config,
            connection,
            commands,
            shutdown,
        };
        tokio::spawn(worker.run());

        Ok(Self { tx, deadline })
    }

    /// Queue a command and wait for its reply, bounded by the command timeout.
    async fn execute(&self, command: Command) -> QueryResult<Vec<Record>> {
        let (reply, response) = oneshot::channel();
        let pending = Pending {
            command: command.to_string(),
            reply,
        };
        let roundtrip = async {
            self.tx.send(pending).await.map_err(|_| QueryError::Closed)?;
            response.await.map_err(|_| QueryError::Closed)?
        };
        match timeout(self.deadline, roundtrip).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.deadline)),
        }
    }
}

impl std::fmt::Debug for QuerySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySession")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

#[async_trait]
impl ServerQuery for QuerySession {
    async fn client_list(&self, kind: ClientKind) -> QueryResult<Vec<ClientEntry>> {
        let records = self.execute(Command::new("clientlist")).await?;
        let clients: Vec<ClientEntry> = decode_all(&records)?;
        Ok(clients.into_iter().filter(|c| c.kind == kind).collect())
    }

    async fn whoami(&self) -> QueryResult<WhoAmI> {
        let records = self.execute(Command::new("whoami")).await?;
        let record = records
            .first()
            .ok_or_else(|| QueryError::Malformed("empty whoami reply".to_string()))?;
        WhoAmI::try_from(record)
    }

    async fn send_text_message(&self, mode: TextTarget, target: u32, message: &str) -> QueryResult<()> {
        let command = Command::new("sendtextmessage")
            .arg("targetmode", mode as u8)
            .arg("target", target)
            .arg("msg", message);
        self.execute(command).await.map(|_| ())
    }

    async fn channel_list(&self) -> QueryResult<Vec<ChannelEntry>> {
        let records = self.execute(Command::new("channellist")).await?;
        decode_all(&records)
    }

    async fn server_group_list(&self) -> QueryResult<Vec<GroupEntry>> {
        let records = self.execute(Command::new("servergrouplist")).await?;
        decode_groups(&records, "sgid")
    }

    async fn channel_group_list(&self) -> QueryResult<Vec<GroupEntry>> {
        let records = self.execute(Command::new("channelgrouplist")).await?;
        decode_groups(&records, "cgid")
    }

    async fn client_find(&self, pattern: &str) -> QueryResult<Vec<ClientMatch>> {
        let records = self.execute(Command::new("clientfind").arg("pattern", pattern)).await?;
        decode_all(&records)
    }

    async fn client_info(&self, clid: ClientId) -> QueryResult<Option<ClientInfo>> {
        match self.execute(Command::new("clientinfo").arg("clid", clid)).await {
            Ok(records) => records.first().map(ClientInfo::try_from).transpose(),
            Err(QueryError::Server { id: codec::INVALID_CLIENT_ID, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// An authenticated connection bound to one virtual server.
struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    command_timeout: Duration,
}

impl Connection {
    async fn establish(config: &QueryConfig) -> QueryResult<Self> {
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let stream = timeout(
            connect_timeout,
            TcpStream::connect((config.host.as_str(), config.query_port)),
        )
        .await
        .map_err(|_| QueryError::Timeout(connect_timeout))??;
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        let mut connection = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            command_timeout: Duration::from_secs(config.command_timeout_secs),
        };

        timeout(connect_timeout, connection.read_greeting())
            .await
            .map_err(|_| QueryError::Timeout(connect_timeout))??;

        let login = Command::new("login")
            .arg("client_login_name", &config.username)
            .arg("client_login_password", &config.password);
        connection.execute(&login.to_string()).await?;

        let select = Command::new("use").arg("port", config.server_port);
        connection.execute(&select.to_string()).await?;

        if !config.nickname.is_empty() {
            let rename = Command::new("clientupdate").arg("client_nickname", &config.nickname);
            if let Err(e) = connection.execute(&rename.to_string()).await {
                tracing::warn!(nickname = %config.nickname, error = %e, "Could not set query nickname");
            }
        }

        tracing::info!(
            host = %config.host,
            query_port = config.query_port,
            server_port = config.server_port,
            "Connected to voice server query interface"
        );
        Ok(connection)
    }

    async fn read_line(&mut self) -> QueryResult<String> {
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf).await? == 0 {
                return Err(QueryError::Closed);
            }
            let line = buf.trim_matches(|c| c == '\r' || c == '\n');
            if !line.is_empty() {
                return Ok(line.to_string());
            }
        }
    }

    async fn read_greeting(&mut self) -> QueryResult<()> {
        let banner = self.read_line().await?;
        if banner != "TS3" {
            return Err(QueryError::Malformed(format!("unexpected greeting '{}'", banner)));
        }
        // Welcome text, informational only.
        self.read_line().await?;
        Ok(())
    }

    async fn execute(&mut self, command: &str) -> QueryResult<Vec<Record>> {
        match timeout(self.command_timeout, self.roundtrip(command)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.command_timeout)),
        }
    }

    async fn roundtrip(&mut self, command: &str) -> QueryResult<Vec<Record>> {
        self.writer.write_all(command.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;

        let mut records = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.starts_with("notify") {
                continue;
            }
            if let Some(status) = Status::parse(&line)? {
                return match status.id {
                    0 => Ok(records),
                    codec::EMPTY_RESULT_SET => Ok(Vec::new()),
                    id => Err(QueryError::Server {
                        id,
                        message: status.message,
                    }),
                };
            }
            records.extend(codec::parse_records(&line));
        }
    }
}

struct SessionWorker {
    config: QueryConfig,
    connection: Connection,
    commands: mpsc::Receiver<Pending>,
    shutdown: broadcast::Receiver<()>,
}

impl SessionWorker {
    async fn run(mut self) {
        let period = Duration::from_secs(self.config.keepalive_secs.max(1));
        let mut keepalive = time::interval_at(Instant::now() + period, period);

        loop {
            let healthy = tokio::select! {
                _ = self.shutdown.recv() => {
                    let _ = self.connection.execute("quit").await;
                    tracing::info!("Query session closed");
                    return;
                }
                _ = keepalive.tick() => match self.connection.execute("version").await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, "Query keepalive failed");
                        !e.is_connection_error()
                    }
                },
                pending = self.commands.recv() => {
                    let Some(Pending { command, reply }) = pending else {
                        tracing::debug!("All query session handles dropped");
                        return;
                    };
                    let result = self.connection.execute(&command).await;
                    let healthy = !matches!(&result, Err(e) if e.is_connection_error());
                    let _ = reply.send(result);
                    healthy
                }
            };

            if !healthy {
                match self.reconnect().await {
                    Some(connection) => self.connection = connection,
                    None => return,
                }
            }
        }
    }

    /// Retry until connected or shut down.
    async fn reconnect(&mut self) -> Option<Connection> {
        let config = self.config.clone();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let delay = calculate_backoff(
                attempt,
                config.reconnect_base_delay_ms,
                config.reconnect_max_delay_ms,
            );
            tracing::warn!(attempt, delay = ?delay, "Query connection lost, reconnecting");

            while_disconnected(&mut self.commands, &mut self.shutdown, time::sleep(delay)).await?;

            let established = while_disconnected(
                &mut self.commands,
                &mut self.shutdown,
                Connection::establish(&config),
            )
            .await?;
            match established {
                Ok(connection) => {
                    tracing::info!(attempt, "Query connection re-established");
                    return Some(connection);
                }
                Err(e) => tracing::warn!(attempt, error = %e, "Reconnect attempt failed"),
            }
        }
    }
}

/// Drive `work` to completion while rejecting every command that arrives in
/// the meantime. `None` means shutdown, or that every handle was dropped.
async fn while_disconnected<F: Future>(
    commands: &mut mpsc::Receiver<Pending>,
    shutdown: &mut broadcast::Receiver<()>,
    work: F,
) -> Option<F::Output> {
    tokio::pin!(work);
    loop {
        tokio::select! {
            _ = shutdown.recv() => return None,
            output = &mut work => return Some(output),
            pending = commands.recv() => {
                let Pending { command, reply } = pending?;
                tracing::debug!(command = %command, "Rejecting query command while disconnected");
                let _ = reply.send(Err(QueryError::Closed));
            }
        }
    }
}
