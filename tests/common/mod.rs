#![allow(dead_code)] // Not every test binary exercises every mock helper.

//! Shared mock collaborators for integration tests.
//!
//! Call-recording mocks for the statement service, the sub-computation, and
//! the object store, with configurable per-statement and per-entity
//! behavior so tests can script failures, stalls, and malformed payloads.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use recompute_core::error::{BatchError, Result};
use recompute_core::remote::{
    Invocation, ObjectStore, Row, StatementHandle, StatementId, StatementProbe, StatementService,
    SubComputation,
};

/// How a mock statement behaves once submitted.
#[derive(Debug, Clone)]
enum StatementBehavior {
    /// Running for the configured number of describes, then Finished.
    Finish,
    /// Running once, then Failed with this service error text.
    Fail(String),
    /// Never leaves Running.
    Stall,
}

#[derive(Debug, Clone)]
struct StatementRule {
    sql_substring: String,
    behavior: StatementBehavior,
    rows: Vec<Row>,
}

#[derive(Debug)]
struct StatementRecord {
    sql: String,
    describes: usize,
}

#[derive(Debug, Default)]
struct StatementState {
    rules: Vec<StatementRule>,
    statements: HashMap<String, StatementRecord>,
    submitted_sql: Vec<String>,
}

/// Mock statement service replaying scripted behavior per SQL pattern.
///
/// By default every statement runs for two describes and then finishes with
/// no rows.
#[derive(Debug, Default)]
pub struct MockStatementService {
    state: Mutex<StatementState>,
    polls_before_finish: usize,
}

impl MockStatementService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(StatementState::default()),
            polls_before_finish: 2,
        })
    }

    fn push_rule(&self, sql_substring: &str, behavior: StatementBehavior, rows: Vec<Row>) {
        self.state.lock().rules.push(StatementRule {
            sql_substring: sql_substring.to_string(),
            behavior,
            rows,
        });
    }

    /// Statements whose SQL contains `sql_substring` finish and yield `rows`.
    pub fn with_rows(self: Arc<Self>, sql_substring: &str, rows: Vec<Row>) -> Arc<Self> {
        self.push_rule(sql_substring, StatementBehavior::Finish, rows);
        self
    }

    /// Statements whose SQL contains `sql_substring` fail with `error`.
    pub fn with_failure(self: Arc<Self>, sql_substring: &str, error: &str) -> Arc<Self> {
        self.push_rule(
            sql_substring,
            StatementBehavior::Fail(error.to_string()),
            Vec::new(),
        );
        self
    }

    /// Statements whose SQL contains `sql_substring` never terminate.
    pub fn with_stall(self: Arc<Self>, sql_substring: &str) -> Arc<Self> {
        self.push_rule(sql_substring, StatementBehavior::Stall, Vec::new());
        self
    }

    /// Every SQL text submitted so far, in submission order.
    pub fn submitted_sql(&self) -> Vec<String> {
        self.state.lock().submitted_sql.clone()
    }

    /// Count of submitted statements whose SQL contains `sql_substring`.
    pub fn submitted_matching(&self, sql_substring: &str) -> usize {
        self.state
            .lock()
            .submitted_sql
            .iter()
            .filter(|sql| sql.contains(sql_substring))
            .count()
    }

    fn behavior_for(&self, sql: &str) -> (StatementBehavior, Vec<Row>) {
        let state = self.state.lock();
        for rule in &state.rules {
            if sql.contains(&rule.sql_substring) {
                return (rule.behavior.clone(), rule.rows.clone());
            }
        }
        (StatementBehavior::Finish, Vec::new())
    }
}

#[async_trait]
impl StatementService for MockStatementService {
    async fn submit(&self, sql: &str) -> Result<StatementHandle> {
        let handle = StatementHandle::submitted(StatementId::new());
        let mut state = self.state.lock();
        state.submitted_sql.push(sql.to_string());
        state.statements.insert(
            handle.id().to_string(),
            StatementRecord {
                sql: sql.to_string(),
                describes: 0,
            },
        );
        Ok(handle)
    }

    async fn describe(&self, id: &StatementId) -> Result<StatementProbe> {
        let (sql, describes) = {
            let mut state = self.state.lock();
            let record = state
                .statements
                .get_mut(id.as_str())
                .expect("describe of unknown statement");
            record.describes += 1;
            (record.sql.clone(), record.describes)
        };
        let (behavior, _) = self.behavior_for(&sql);
        let probe = match behavior {
            StatementBehavior::Stall => StatementProbe::running(),
            StatementBehavior::Fail(error) => {
                if describes > 1 {
                    StatementProbe::failed(error)
                } else {
                    StatementProbe::running()
                }
            }
            StatementBehavior::Finish => {
                if describes > self.polls_before_finish {
                    StatementProbe::finished()
                } else {
                    StatementProbe::running()
                }
            }
        };
        Ok(probe)
    }

    async fn fetch(&self, id: &StatementId) -> Result<Vec<Row>> {
        let sql = self.state.lock().statements[id.as_str()].sql.clone();
        let (_, rows) = self.behavior_for(&sql);
        Ok(rows)
    }
}

/// Per-entity scripted sub-computation behavior.
#[derive(Debug, Clone)]
pub enum SubBehavior {
    /// 200 with this body.
    Body(String),
    /// Non-200 status with this body.
    Status(u16, String),
    /// The call itself errors, e.g. a timeout.
    CallError(String),
}

#[derive(Debug, Default)]
struct SubState {
    behaviors: HashMap<String, SubBehavior>,
    invocations: Vec<String>,
}

/// Mock sub-computation. Entities without scripted behavior get a valid
/// all-fields payload.
#[derive(Debug, Default)]
pub struct MockSubComputation {
    state: Mutex<SubState>,
}

impl MockSubComputation {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_behavior(self: Arc<Self>, entity: &str, behavior: SubBehavior) -> Arc<Self> {
        self.state
            .lock()
            .behaviors
            .insert(entity.to_string(), behavior);
        self
    }

    pub fn invocation_count(&self) -> usize {
        self.state.lock().invocations.len()
    }

    pub fn valid_body() -> String {
        r#"{
            "TotalMentions": 120,
            "TotalSources": 34,
            "TotalArticles": 56,
            "MedianAvgTone": -2.4,
            "MedianGoldsteinScale": 1.5
        }"#
        .to_string()
    }
}

#[async_trait]
impl SubComputation for MockSubComputation {
    async fn invoke(&self, entity: &str, _payload: &serde_json::Value) -> Result<Invocation> {
        let behavior = {
            let mut state = self.state.lock();
            state.invocations.push(entity.to_string());
            state.behaviors.get(entity).cloned()
        };
        match behavior {
            None => Ok(Invocation {
                status_code: 200,
                body: Self::valid_body(),
            }),
            Some(SubBehavior::Body(body)) => Ok(Invocation {
                status_code: 200,
                body,
            }),
            Some(SubBehavior::Status(status_code, body)) => Ok(Invocation { status_code, body }),
            Some(SubBehavior::CallError(message)) => Err(BatchError::Invocation {
                entity: entity.to_string(),
                message,
            }),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<String, Vec<u8>>,
    puts: Vec<String>,
    failing_gets: Vec<String>,
}

/// In-memory object store recording puts.
#[derive(Debug, Default)]
pub struct MockObjectStore {
    state: Mutex<StoreState>,
}

impl MockObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_object(self: Arc<Self>, key: &str, bytes: &[u8]) -> Arc<Self> {
        self.state
            .lock()
            .objects
            .insert(key.to_string(), bytes.to_vec());
        self
    }

    pub fn with_failing_get(self: Arc<Self>, key: &str) -> Arc<Self> {
        self.state.lock().failing_gets.push(key.to_string());
        self
    }

    pub fn put_keys(&self) -> Vec<String> {
        self.state.lock().puts.clone()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let state = self.state.lock();
        if state.failing_gets.iter().any(|k| k == key) {
            return Err(BatchError::ObjectStore {
                operation: "get".to_string(),
                key: key.to_string(),
                message: "simulated download failure".to_string(),
            });
        }
        state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| BatchError::ObjectStore {
                operation: "get".to_string(),
                key: key.to_string(),
                message: "no such key".to_string(),
            })
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let mut state = self.state.lock();
        state.objects.insert(key.to_string(), bytes);
        state.puts.push(key.to_string());
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.state.lock().objects.contains_key(key))
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .state
            .lock()
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Build the country-code rows the forecast source fetch returns.
pub fn country_rows(codes: &[&str]) -> Vec<Row> {
    codes
        .iter()
        .map(|code| vec![recompute_core::remote::CellValue::Text((*code).to_string())])
        .collect()
}
