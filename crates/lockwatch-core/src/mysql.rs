//! MySQL/InnoDB snapshot source backed by `mysql_async`.
//!
//! Reads transaction state from `information_schema.INNODB_TRX`, running
//! statements from `information_schema.PROCESSLIST` and the engine report
//! from `SHOW ENGINE INNODB STATUS`. Each statement carries the
//! [`PROBE_MARKER`](crate::snapshot::PROBE_MARKER) comment.

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder};
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{Result, SourceError};
use crate::snapshot::{
    ActiveTransaction, RunningQuery, SnapshotSource, TrxState, filter_running_queries,
};

const TRANSACTIONS_QUERY: &str = "SELECT /* lockwatch */ trx_id, trx_state, \
     trx_mysql_thread_id, trx_query FROM information_schema.INNODB_TRX";

const PROCESSLIST_QUERY: &str = "SELECT /* lockwatch */ ID, \
     CONCAT(COALESCE(USER, ''), '@', COALESCE(HOST, '')), INFO \
     FROM information_schema.PROCESSLIST \
     WHERE INFO IS NOT NULL AND COMMAND <> 'Sleep' ORDER BY ID";

const ENGINE_STATUS_QUERY: &str = "SHOW /* lockwatch */ ENGINE INNODB STATUS";

// Text columns are read as bytes: statement text arrives in the client's
// charset and is not guaranteed to be UTF-8.
type TransactionRow = (Vec<u8>, Vec<u8>, u64, Option<Vec<u8>>);
type ProcessRow = (u64, Vec<u8>, Vec<u8>);
type StatusRow = (Vec<u8>, Vec<u8>, Vec<u8>);

fn text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|invalid| String::from_utf8_lossy(invalid.as_bytes()).into_owned())
}

fn transaction_from_row((id, state, thread_id, query): TransactionRow) -> ActiveTransaction {
    ActiveTransaction {
        id: text(id),
        state: TrxState::from_token(&text(state)),
        thread_id,
        query: query.map(text),
    }
}

fn running_from_row((thread_id, component, statement): ProcessRow) -> RunningQuery {
    RunningQuery {
        thread_id,
        component: text(component),
        statement: text(statement),
    }
}

fn query_error(query: &'static str) -> impl FnOnce(mysql_async::Error) -> SourceError {
    move |e| SourceError::Query {
        query,
        reason: e.to_string(),
    }
}

/// Single-connection snapshot source for one MySQL server.
pub struct MysqlSource {
    config: ConnectionConfig,
    conn: Option<Conn>,
}

impl std::fmt::Debug for MysqlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlSource")
            .field("config", &self.config)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl MysqlSource {
    /// Connect to the server described by `config`.
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        let conn = open(&config).await.map_err(|e| SourceError::Connect {
            host: config.address(),
            reason: e.to_string(),
        })?;
        info!(
            host = %config.address(),
            connection_id = conn.id(),
            "Connected to MySQL"
        );
        Ok(Self {
            config,
            conn: Some(conn),
        })
    }

    fn conn(&mut self) -> Result<&mut Conn> {
        self.conn.as_mut().ok_or_else(|| {
            SourceError::Ping {
                reason: "no open connection".to_string(),
            }
            .into()
        })
    }

    /// Server-side id of the monitor's own session.
    #[must_use]
    pub fn connection_id(&self) -> Option<u64> {
        self.conn.as_ref().map(|conn| u64::from(conn.id()))
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.conn = None;
        let conn = open(&self.config).await.map_err(|e| SourceError::Ping {
            reason: e.to_string(),
        })?;
        info!(
            host = %self.config.address(),
            connection_id = conn.id(),
            "Reconnected to MySQL"
        );
        self.conn = Some(conn);
        Ok(())
    }
}

async fn open(config: &ConnectionConfig) -> std::result::Result<Conn, mysql_async::Error> {
    let opts = OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(config.port)
        .user(Some(config.user.clone()))
        .pass(Some(config.password.clone()));
    Conn::new(opts).await
}

impl SnapshotSource for MysqlSource {
    async fn ensure_live(&mut self) -> Result<()> {
        let ping = match self.conn.as_mut() {
            Some(conn) => conn.ping().await,
            None => return self.reconnect().await,
        };
        if let Err(e) = ping {
            warn!(error = %e, "MySQL ping failed; reconnecting");
            return self.reconnect().await;
        }
        Ok(())
    }

    async fn active_transactions(&mut self) -> Result<Vec<ActiveTransaction>> {
        let rows = self
            .conn()?
            .query_map(TRANSACTIONS_QUERY, transaction_from_row)
            .await
            .map_err(query_error("INNODB_TRX"))?;
        debug!(active = rows.len(), "Fetched transaction snapshot");
        Ok(rows)
    }

    async fn running_queries(&mut self) -> Result<Vec<RunningQuery>> {
        let own_id = self.connection_id();
        let rows = self
            .conn()?
            .query_map(PROCESSLIST_QUERY, running_from_row)
            .await
            .map_err(query_error("PROCESSLIST"))?;
        Ok(filter_running_queries(rows, own_id))
    }

    async fn engine_status(&mut self) -> Result<String> {
        let row: Option<StatusRow> = self
            .conn()?
            .query_first(ENGINE_STATUS_QUERY)
            .await
            .map_err(query_error("SHOW ENGINE INNODB STATUS"))?;
        let (_engine, _name, status) = row.ok_or(SourceError::MissingStatus)?;
        Ok(text(status))
    }
}
