//! Scripted sessions for unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::{SessionError, SessionFactory, TargetSession};
use crate::config::FieldSelector;
use crate::domain::Credentials;

/// What a scripted session does.
#[derive(Debug, Clone)]
pub struct Script {
    pub initial_text: String,
    pub login_error: Option<SessionError>,
    /// Consumed front to back by successive reads.
    pub read_errors: Vec<SessionError>,
    /// Served instead of the field once a write has been acknowledged.
    pub verify_read_errors: Vec<SessionError>,
    pub write_errors: Vec<SessionError>,
    /// When false, writes are acknowledged but the field keeps its text.
    pub persist_writes: bool,
    pub close_error: bool,
}

impl Script {
    pub fn new(initial_text: &str) -> Self {
        Self {
            initial_text: initial_text.to_string(),
            login_error: None,
            read_errors: Vec::new(),
            verify_read_errors: Vec::new(),
            write_errors: Vec::new(),
            persist_writes: true,
            close_error: false,
        }
    }

    pub fn login_error(mut self, error: SessionError) -> Self {
        self.login_error = Some(error);
        self
    }

    pub fn read_errors(mut self, errors: Vec<SessionError>) -> Self {
        self.read_errors = errors;
        self
    }

    pub fn verify_read_errors(mut self, errors: Vec<SessionError>) -> Self {
        self.verify_read_errors = errors;
        self
    }

    pub fn write_errors(mut self, errors: Vec<SessionError>) -> Self {
        self.write_errors = errors;
        self
    }

    pub fn dropping_writes(mut self) -> Self {
        self.persist_writes = false;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.close_error = true;
        self
    }
}

/// Call counters and field contents shared with the test.
#[derive(Debug, Default)]
pub struct Probe {
    pub logins: AtomicU32,
    pub reads: AtomicU32,
    pub writes: AtomicU32,
    pub closes: AtomicU32,
    pub field: Mutex<String>,
}

impl Probe {
    pub fn calls(&self) -> u32 {
        self.logins.load(Ordering::SeqCst) + self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }

    pub fn field(&self) -> String {
        self.field.lock().unwrap().clone()
    }
}

pub struct ScriptedSession {
    probe: Arc<Probe>,
    login_error: Option<SessionError>,
    read_errors: VecDeque<SessionError>,
    verify_read_errors: VecDeque<SessionError>,
    write_errors: VecDeque<SessionError>,
    written: bool,
    persist_writes: bool,
    close_error: bool,
}

impl ScriptedSession {
    pub fn new(script: Script) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        *probe.field.lock().unwrap() = script.initial_text.clone();
        (Self::with_probe(script, probe.clone()), probe)
    }

    fn with_probe(script: Script, probe: Arc<Probe>) -> Self {
        Self {
            probe,
            login_error: script.login_error,
            read_errors: script.read_errors.into(),
            verify_read_errors: script.verify_read_errors.into(),
            write_errors: script.write_errors.into(),
            written: false,
            persist_writes: script.persist_writes,
            close_error: script.close_error,
        }
    }
}

#[async_trait]
impl TargetSession for ScriptedSession {
    async fn login(&mut self, _credentials: &Credentials) -> Result<(), SessionError> {
        self.probe.logins.fetch_add(1, Ordering::SeqCst);
        match &self.login_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn read_field(&mut self, _selector: &FieldSelector) -> Result<String, SessionError> {
        self.probe.reads.fetch_add(1, Ordering::SeqCst);
        let queue = if self.written {
            &mut self.verify_read_errors
        } else {
            &mut self.read_errors
        };
        match queue.pop_front() {
            Some(e) => Err(e),
            None => Ok(self.probe.field()),
        }
    }

    async fn write_field(&mut self, _selector: &FieldSelector, text: &str) -> Result<(), SessionError> {
        self.probe.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.write_errors.pop_front() {
            return Err(e);
        }
        self.written = true;
        if self.persist_writes {
            *self.probe.field.lock().unwrap() = text.to_string();
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        if self.close_error {
            Err(SessionError::Browser("already gone".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Hands out scripted sessions by target id.
#[derive(Default)]
pub struct ScriptedFactory {
    scripts: HashMap<String, Script>,
    probes: Mutex<HashMap<String, Arc<Probe>>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target_id: &str, script: Script) -> Self {
        self.scripts.insert(target_id.to_string(), script);
        self
    }

    /// Probe of the last session created for `target_id`.
    pub fn probe(&self, target_id: &str) -> Option<Arc<Probe>> {
        self.probes.lock().unwrap().get(target_id).cloned()
    }

    pub fn created(&self) -> usize {
        self.probes.lock().unwrap().len()
    }
}

impl SessionFactory for ScriptedFactory {
    fn create(&self, target_id: &str) -> Box<dyn TargetSession> {
        let script = self
            .scripts
            .get(target_id)
            .cloned()
            .unwrap_or_else(|| Script::new("Experienced engineer building reliable systems."));
        let (session, probe) = ScriptedSession::new(script);
        self.probes.lock().unwrap().insert(target_id.to_string(), probe);
        Box::new(session)
    }
}
