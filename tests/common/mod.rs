use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use wireflow::{
    Component, ComponentRegistry, ComponentSpec, EventSource, InboundEvent, IntegrationError,
    InvocationKind, ParamKind, ParamSpec,
};

/// Trigger stand-in for one-shot runs: emits a fixed message payload.
pub struct StubTrigger;

#[async_trait]
impl Component for StubTrigger {
    async fn invoke(
        &self,
        _config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError> {
        Ok(HashMap::from([
            ("message_text".to_string(), "deploy now".to_string()),
            ("user_id".to_string(), "U1".to_string()),
        ]))
    }
}

/// Pure formatter stand-in: returns its resolved `input` unchanged.
pub struct EchoFormat;

#[async_trait]
impl Component for EchoFormat {
    async fn invoke(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError> {
        Ok(HashMap::from([(
            "formatted_text".to_string(),
            config.get("input").cloned().unwrap_or_default(),
        )]))
    }
}

/// Integration stand-in that always fails.
pub struct FailingCall;

#[async_trait]
impl Component for FailingCall {
    async fn invoke(
        &self,
        _config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError> {
        Err(IntegrationError::Api("upstream rejected the call".to_string()))
    }
}

/// Records every resolved `input` it is invoked with.
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Component for RecordingSink {
    async fn invoke(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError> {
        let input = config.get("input").cloned().unwrap_or_default();
        self.calls.lock().unwrap().push(input.clone());
        Ok(HashMap::from([("receipt".to_string(), input)]))
    }
}

/// Registry of the stand-in component types used across integration tests.
///
/// `calls` collects every input delivered to a `test.record` instance.
pub fn test_registry(calls: Arc<Mutex<Vec<String>>>) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();

    registry.register(
        ComponentSpec::new(
            "test.trigger",
            vec![
                ParamSpec::optional("channel", ParamKind::String),
                ParamSpec::optional("keyword", ParamKind::String),
                ParamSpec::optional("timeout", ParamKind::Number),
            ],
            vec!["message_text", "user_id", "channel", "timestamp"],
            InvocationKind::Subscribe,
        ),
        || Box::new(StubTrigger),
    );
    registry.register(
        ComponentSpec::new(
            "test.format",
            vec![ParamSpec::required("input", ParamKind::String)],
            vec!["formatted_text"],
            InvocationKind::Pure,
        ),
        || Box::new(EchoFormat),
    );
    registry.register(
        ComponentSpec::new(
            "test.fail",
            vec![ParamSpec::optional("input", ParamKind::String)],
            vec!["receipt"],
            InvocationKind::Network,
        ),
        || Box::new(FailingCall),
    );
    registry.register(
        ComponentSpec::new(
            "test.record",
            vec![ParamSpec::required("input", ParamKind::String)],
            vec!["receipt"],
            InvocationKind::Pure,
        ),
        move || {
            Box::new(RecordingSink {
                calls: Arc::clone(&calls),
            })
        },
    );

    registry
}

/// In-process event source fed by an mpsc channel.
pub struct ChannelEventSource {
    rx: mpsc::Receiver<InboundEvent>,
    fail_connect: bool,
    disconnected: Arc<AtomicBool>,
}

impl ChannelEventSource {
    pub fn new(rx: mpsc::Receiver<InboundEvent>) -> (Self, Arc<AtomicBool>) {
        let disconnected = Arc::new(AtomicBool::new(false));
        (
            Self {
                rx,
                fail_connect: false,
                disconnected: Arc::clone(&disconnected),
            },
            disconnected,
        )
    }

    pub fn failing_connect(rx: mpsc::Receiver<InboundEvent>) -> (Self, Arc<AtomicBool>) {
        let (mut source, disconnected) = Self::new(rx);
        source.fail_connect = true;
        (source, disconnected)
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn connect(&mut self) -> Result<(), IntegrationError> {
        if self.fail_connect {
            return Err(IntegrationError::Connection("refused".to_string()));
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Result<InboundEvent, IntegrationError> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| IntegrationError::Connection("event channel closed".to_string()))
    }

    async fn disconnect(&mut self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

pub fn event(channel: &str, text: &str) -> InboundEvent {
    InboundEvent {
        channel: channel.to_string(),
        user_id: "U1".to_string(),
        text: text.to_string(),
        timestamp: "1700000000.000100".to_string(),
    }
}
