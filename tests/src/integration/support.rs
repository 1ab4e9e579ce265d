//! Shared fixtures for the integration flows.

use std::sync::Arc;

use rt_signaling::{
    CallLogStore, ClientSignal, ConnectionId, ConnectionMailbox, InMemoryCallLog,
    InMemoryMessageStore, MockTimeSource, ServerEvent, SignalingApi, SignalingConfig,
    SignalingError, SignalingService, TimeSource, TransitionOutcome,
};

/// Epoch used by the mock clock, in milliseconds.
pub const T0: u64 = 1_700_000_000_000;

/// A signaling core wired to inspectable in-memory collaborators.
pub struct Harness {
    pub service: Arc<SignalingService>,
    pub call_log: Arc<InMemoryCallLog>,
    pub store: Arc<InMemoryMessageStore>,
    pub clock: Arc<MockTimeSource>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SignalingConfig::default())
    }

    pub fn with_config(config: SignalingConfig) -> Self {
        let clock = Arc::new(MockTimeSource::new(T0));
        let dyn_clock: Arc<dyn TimeSource> = clock.clone();
        let call_log = Arc::new(InMemoryCallLog::with_clock(Arc::clone(&dyn_clock)));
        let store = Arc::new(InMemoryMessageStore::with_clock(Arc::clone(&dyn_clock)));

        let service = Arc::new(SignalingService::new(
            config,
            call_log.clone(),
            store.clone(),
            dyn_clock,
        ));

        Self {
            service,
            call_log,
            store,
            clock,
        }
    }

    /// Core backed by a custom call log (e.g. a failing one).
    pub fn with_call_log(call_log: Arc<dyn CallLogStore>) -> Arc<SignalingService> {
        let clock: Arc<dyn TimeSource> = Arc::new(MockTimeSource::new(T0));
        Arc::new(SignalingService::new(
            SignalingConfig::default(),
            call_log,
            Arc::new(InMemoryMessageStore::with_clock(Arc::clone(&clock))),
            clock,
        ))
    }

    pub fn connect(&self, user_id: &str) -> Client {
        Client::connect(&self.service, Some(user_id))
    }

    pub fn connect_anonymous(&self) -> Client {
        Client::connect(&self.service, None)
    }

    pub async fn signal(
        &self,
        client: &Client,
        signal: ClientSignal,
    ) -> Result<TransitionOutcome, SignalingError> {
        self.service.handle_signal(client.connection_id, signal).await
    }

    pub fn disconnect(&self, client: &Client) {
        self.service.disconnect(client.connection_id);
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// One client connection and its outbound mailbox.
pub struct Client {
    pub connection_id: ConnectionId,
    pub mailbox: ConnectionMailbox,
}

impl Client {
    pub fn connect(service: &SignalingService, identity: Option<&str>) -> Self {
        let (connection_id, mailbox) = service.connect(identity);
        Self {
            connection_id,
            mailbox,
        }
    }

    /// Everything queued so far.
    pub fn events(&mut self) -> Vec<ServerEvent> {
        self.mailbox.drain()
    }

    /// Queued events without presence snapshots.
    pub fn signals(&mut self) -> Vec<ServerEvent> {
        self.events()
            .into_iter()
            .filter(|event| !matches!(event, ServerEvent::OnlineUsers(_)))
            .collect()
    }

    pub fn signal_names(&mut self) -> Vec<&'static str> {
        self.signals().iter().map(ServerEvent::name).collect()
    }

    /// Most recent presence snapshot, if any was queued.
    pub fn last_presence(&mut self) -> Option<Vec<String>> {
        self.events().into_iter().rev().find_map(|event| match event {
            ServerEvent::OnlineUsers(users) => Some(users),
            _ => None,
        })
    }
}

pub fn call_request(receiver: &str, channel: &str) -> ClientSignal {
    ClientSignal::CallRequest {
        receiver_id: receiver.into(),
        channel_id: channel.into(),
        call_kind: rt_signaling::CallKind::Video,
        caller_name: String::new(),
        caller_avatar: None,
    }
}
