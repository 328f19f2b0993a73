//! Native live loop: one websocket to the puzzle page plus answer posts,
//! feeding a single [`PuzzleSession`].

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, Sleep};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{InvalidHeaderValue, COOKIE, ORIGIN};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use hunter2_live_core::{
    live_socket_url_with_base, AnswerResponse, EndpointError, NetDelayConfig, PuzzleSession,
    SessionUpdate, SubmitError, SubmitRejected,
};

use crate::answer::{AnswerClient, PageAuth};
use crate::now_ms;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("invalid header value: {0}")]
    Header(#[from] InvalidHeaderValue),
    #[error("websocket: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct LiveOptions {
    pub page_url: Url,
    /// Overrides the `/ws` socket prefix.
    pub ws_base: Option<String>,
    pub auth: PageAuth,
    pub net: NetDelayConfig,
}

impl LiveOptions {
    pub fn new(page_url: Url) -> Self {
        Self {
            page_url,
            ws_base: None,
            auth: PageAuth::default(),
            net: NetDelayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveCommand {
    Submit(String),
    Shutdown,
}

/// What the loop reports to its observer after touching the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    Connected { opened: u64 },
    Disconnected { retry_in_ms: u32 },
    Submitting(String),
    Rejected(SubmitRejected),
    Update(SessionUpdate),
    CooldownOver,
}

enum Flow {
    Continue,
    Stop,
}

/// Runs until [`LiveCommand::Shutdown`] arrives or every command sender is
/// dropped, reconnecting with backoff in between. Returns the session so the
/// caller can persist it.
pub async fn run<F>(
    session: PuzzleSession,
    options: LiveOptions,
    commands: mpsc::UnboundedReceiver<LiveCommand>,
    observer: F,
) -> Result<PuzzleSession, LiveError>
where
    F: FnMut(&PuzzleSession, &LiveEvent),
{
    let socket_url = live_socket_url_with_base(&options.page_url, options.ws_base.as_deref())?;
    let answers = AnswerClient::new(&options.page_url, options.auth.clone())?;
    let (results_tx, results) = mpsc::unbounded_channel();
    let mut driver = Driver {
        session,
        options,
        socket_url,
        answers,
        observer,
        commands,
        results_tx,
        results,
        cooldown: None,
    };
    driver.run().await?;
    Ok(driver.session)
}

struct Driver<F> {
    session: PuzzleSession,
    options: LiveOptions,
    socket_url: Url,
    answers: AnswerClient,
    observer: F,
    commands: mpsc::UnboundedReceiver<LiveCommand>,
    results_tx: mpsc::UnboundedSender<Result<AnswerResponse, SubmitError>>,
    results: mpsc::UnboundedReceiver<Result<AnswerResponse, SubmitError>>,
    cooldown: Option<Pin<Box<Sleep>>>,
}

impl<F> Driver<F>
where
    F: FnMut(&PuzzleSession, &LiveEvent),
{
    async fn run(&mut self) -> Result<(), LiveError> {
        loop {
            self.session.begin_connect();
            match self.connect().await {
                Ok(ws) => {
                    if let Flow::Stop = self.serve(ws).await? {
                        return Ok(());
                    }
                }
                Err(err) => warn!(error = %err, url = %self.socket_url, "live socket connect failed"),
            }

            let retry_in_ms = self.session.on_close(rand::random::<f64>());
            info!(retry_in_ms, "live socket closed");
            self.emit(LiveEvent::Disconnected { retry_in_ms });
            if let Flow::Stop = self.idle(Duration::from_millis(u64::from(retry_in_ms))).await {
                return Ok(());
            }
        }
    }

    async fn connect(&self) -> Result<WsStream, LiveError> {
        let mut request = self.socket_url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        let origin = self.options.page_url.origin().ascii_serialization();
        headers.insert(ORIGIN, HeaderValue::from_str(&origin)?);
        if let Some(cookie) = self.options.auth.cookie_header() {
            headers.insert(COOKIE, HeaderValue::from_str(&cookie)?);
        }
        let (ws, _response) = connect_async(request).await?;
        Ok(ws)
    }

    async fn serve(&mut self, ws: WsStream) -> Result<Flow, LiveError> {
        let (mut write, mut read) = ws.split();

        for request in self.session.on_open() {
            let text = request.to_json()?;
            if let Err(err) = self.send(&mut write, text).await {
                warn!(error = %err, "handshake send failed");
                return Ok(Flow::Continue);
            }
        }
        let opened = self.session.connection().opened();
        self.emit(LiveEvent::Connected { opened });

        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.delay(self.options.net.inbound_delay_ms(rand::random::<f64>())).await;
                        let update = self.session.on_message(text.as_str(), now_ms());
                        if !update.is_empty() {
                            self.emit(LiveEvent::Update(update));
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "server closed live socket");
                        return Ok(Flow::Continue);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        let notice = self.session.on_transport_error(&err.to_string());
                        self.emit(LiveEvent::Update(SessionUpdate {
                            notices: vec![notice],
                            ..SessionUpdate::default()
                        }));
                        return Ok(Flow::Continue);
                    }
                    None => return Ok(Flow::Continue),
                },
                command = self.commands.recv() => {
                    if let Flow::Stop = self.command(command) {
                        if let Err(err) = write.send(Message::Close(None)).await {
                            debug!(error = %err, "close frame not delivered");
                        }
                        self.session.on_disconnect();
                        return Ok(Flow::Stop);
                    }
                }
                Some(result) = self.results.recv() => self.submitted(result),
                _ = wait_for(&mut self.cooldown) => self.cooldown_over(),
            }
        }
    }

    /// Waits out a reconnect delay while still serving answers and timers.
    async fn idle(&mut self, delay: Duration) -> Flow {
        let retry = sleep(delay);
        tokio::pin!(retry);
        loop {
            tokio::select! {
                _ = &mut retry => return Flow::Continue,
                command = self.commands.recv() => {
                    if let Flow::Stop = self.command(command) {
                        self.session.on_disconnect();
                        return Flow::Stop;
                    }
                }
                Some(result) = self.results.recv() => self.submitted(result),
                _ = wait_for(&mut self.cooldown) => self.cooldown_over(),
            }
        }
    }

    async fn send(
        &self,
        write: &mut WsWrite,
        text: String,
    ) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        self.delay(self.options.net.outbound_delay_ms(rand::random::<f64>()))
            .await;
        debug!(%text, "send");
        write.send(Message::text(text)).await
    }

    async fn delay(&self, ms: u32) {
        if ms > 0 {
            sleep(Duration::from_millis(u64::from(ms))).await;
        }
    }

    fn command(&mut self, command: Option<LiveCommand>) -> Flow {
        match command {
            None | Some(LiveCommand::Shutdown) => Flow::Stop,
            Some(LiveCommand::Submit(answer)) => {
                self.start_submit(&answer);
                Flow::Continue
            }
        }
    }

    fn start_submit(&mut self, answer: &str) {
        match self.session.submit(answer) {
            Ok(request) => {
                self.emit(LiveEvent::Submitting(request.answer.clone()));
                let answers = self.answers.clone();
                let results = self.results_tx.clone();
                tokio::spawn(async move {
                    let result = answers.submit(&request).await;
                    // The loop may already be gone; nothing left to report to.
                    let _ = results.send(result);
                });
            }
            Err(rejected) => {
                info!(%rejected, "answer not sent");
                self.emit(LiveEvent::Rejected(rejected));
            }
        }
    }

    fn submitted(&mut self, result: Result<AnswerResponse, SubmitError>) {
        let update = self.session.on_submit_result(result, now_ms());
        if let Some(wait_ms) = update.cooldown_ms {
            self.cooldown = Some(Box::pin(sleep(Duration::from_millis(wait_ms))));
        }
        if !update.is_empty() {
            self.emit(LiveEvent::Update(update));
        }
    }

    fn cooldown_over(&mut self) {
        self.cooldown = None;
        if self.session.on_cooldown_elapsed() {
            self.emit(LiveEvent::CooldownOver);
        }
    }

    fn emit(&mut self, event: LiveEvent) {
        (self.observer)(&self.session, &event);
    }
}

async fn wait_for(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending::<()>().await,
    }
}
