// SPDX-License-Identifier: Apache-2.0

//! Scripted catalog doubles shared by unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::{CatalogConnection, ConnectionProvider};
use crate::engine::types::{CatalogRow, DataSource, Value};

type Responder = dyn FnMut(&str, &[&str]) -> EngineResult<Vec<CatalogRow>> + Send;

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub fn row(values: &[(&str, Value)]) -> CatalogRow {
    values
        .iter()
        .fold(CatalogRow::new(), |row, (label, value)| row.with(label, value.clone()))
}

/// Log of what a scripted connection was asked to do
#[derive(Default)]
pub struct CallLog {
    pub queries: Mutex<Vec<(String, Vec<String>)>>,
    pub closes: AtomicUsize,
}

impl CallLog {
    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Answers catalog queries from a closure and records every call.
pub struct ScriptedConnection {
    responder: Box<Responder>,
    log: Arc<CallLog>,
}

impl ScriptedConnection {
    pub fn new(
        responder: impl FnMut(&str, &[&str]) -> EngineResult<Vec<CatalogRow>> + Send + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            log: Arc::new(CallLog::default()),
        }
    }

    pub fn with_log(mut self, log: Arc<CallLog>) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> Arc<CallLog> {
        self.log.clone()
    }
}

#[async_trait]
impl CatalogConnection for ScriptedConnection {
    async fn fetch_all(&mut self, query: &str, params: &[&str]) -> EngineResult<Vec<CatalogRow>> {
        self.log.queries.lock().push((
            query.to_string(),
            params.iter().map(|p| p.to_string()).collect(),
        ));
        (self.responder)(query, params)
    }

    async fn close(self: Box<Self>) -> EngineResult<()> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

type Factory = dyn Fn() -> ScriptedConnection + Send + Sync;

/// Hands out scripted connections that all report into one shared log.
pub struct ScriptedProvider {
    factory: Box<Factory>,
    log: Arc<CallLog>,
    fail_connect: bool,
}

impl ScriptedProvider {
    pub fn new(factory: impl Fn() -> ScriptedConnection + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            log: Arc::new(CallLog::default()),
            fail_connect: false,
        }
    }

    pub fn unreachable() -> Self {
        let mut provider = Self::new(|| ScriptedConnection::new(|_, _| Ok(Vec::new())));
        provider.fail_connect = true;
        provider
    }

    pub fn log(&self) -> Arc<CallLog> {
        self.log.clone()
    }
}

#[async_trait]
impl ConnectionProvider for ScriptedProvider {
    async fn get_connection(&self, source: &DataSource) -> EngineResult<Box<dyn CatalogConnection>> {
        if self.fail_connect {
            return Err(EngineError::connection_failed(format!(
                "{}:{} refused the connection",
                source.host, source.port
            )));
        }
        Ok(Box::new((self.factory)().with_log(self.log.clone())))
    }
}
