use std::collections::VecDeque;

use bytes::BytesMut;
use evstream_frame::{decode_message, encode_message, FrameError, Headers, MIN_MESSAGE_SIZE};
use evstream_transport::{Transport, TransportEvent};
use tracing::{debug, trace, warn};

use crate::classify::{classify, Classification};
use crate::error::{Result, SessionError};
use crate::event::SessionEvent;
use crate::protocol::audio_event_headers;

/// Default upper bound on one audio chunk.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 32 * 1024;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the transport to open.
    Connecting,
    /// Audio may be sent.
    Open,
    /// `close` was requested; waiting for the transport to confirm.
    Closing,
    /// Terminal.
    Closed,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Largest payload accepted by [`StreamingSession::send`].
    pub max_chunk_size: usize,
    /// Send the empty end-of-stream `AudioEvent` when closing an open session.
    pub end_stream_on_close: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            end_stream_on_close: false,
        }
    }
}

/// Frame counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_sent: u64,
    /// Encoded bytes handed to the transport.
    pub bytes_sent: u64,
    pub frames_received: u64,
    /// Inbound units that failed validation or carried an unreadable payload.
    pub frames_rejected: u64,
}

/// One streaming exchange over a [`Transport`].
///
/// The session is driven by its owner: [`next_event`](Self::next_event) pulls
/// from the transport and returns the next observable [`SessionEvent`].
/// Inbound messages are handled one at a time in arrival order, so the partial
/// results of an utterance are always observed before its final result.
///
/// Frame and payload errors are reported as [`SessionEvent::Error`] and mark
/// the session as errored without closing it. Only the transport closes it.
pub struct StreamingSession<T> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
    errored: bool,
    closed_emitted: bool,
    pending: VecDeque<SessionEvent>,
    audio_headers: Headers,
    stats: SessionStats,
}

impl<T: Transport> StreamingSession<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: SessionState::Connecting,
            errored: false,
            closed_emitted: false,
            pending: VecDeque::new(),
            audio_headers: audio_event_headers(),
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether `send` is currently allowed.
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Whether any error event has been emitted.
    pub fn is_errored(&self) -> bool {
        self.errored
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Block until the transport opens.
    ///
    /// Events that arrive first are kept and returned by later calls to
    /// [`next_event`](Self::next_event). Fails with [`SessionError::Closed`]
    /// if the transport closes before opening.
    pub fn wait_ready(&mut self) -> Result<()> {
        while self.state == SessionState::Connecting {
            let event = self.transport.next_event()?;
            if let Some(event) = self.handle_transport_event(event) {
                self.pending.push_back(event);
            }
        }

        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Closed => Err(SessionError::Closed),
            state => Err(SessionError::SessionNotOpen { state }),
        }
    }

    /// Send one audio chunk as an `AudioEvent` message.
    pub fn send(&mut self, chunk: &[u8]) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(SessionError::SessionNotOpen { state: self.state });
        }
        if chunk.len() > self.config.max_chunk_size {
            return Err(FrameError::MessageTooLarge {
                size: chunk.len(),
                max: self.config.max_chunk_size,
            }
            .into());
        }

        let mut buf =
            BytesMut::with_capacity(MIN_MESSAGE_SIZE + self.audio_headers.encoded_len() + chunk.len());
        encode_message(&self.audio_headers, chunk, &mut buf)?;
        let len = buf.len();
        self.transport.send_unit(buf.freeze())?;

        self.stats.frames_sent += 1;
        self.stats.bytes_sent += len as u64;
        trace!(payload = chunk.len(), wire = len, "sent audio event");
        Ok(())
    }

    /// Send a buffer of any size as consecutive chunks of at most
    /// `max_chunk_size` bytes. Returns the number of messages sent.
    ///
    /// An empty buffer sends nothing; use [`finish`](Self::finish) to end the
    /// audio stream.
    pub fn send_audio(&mut self, audio: &[u8]) -> Result<usize> {
        let chunk_size = self.config.max_chunk_size.max(1);
        let mut sent = 0;
        for chunk in audio.chunks(chunk_size) {
            self.send(chunk)?;
            sent += 1;
        }
        Ok(sent)
    }

    /// Signal the end of the audio stream with an empty `AudioEvent`.
    ///
    /// The session stays open so remaining results can still be read.
    pub fn finish(&mut self) -> Result<()> {
        self.send(&[])?;
        debug!("audio stream finished");
        Ok(())
    }

    /// Next observable event, pulling from the transport as needed.
    ///
    /// Returns `Ok(None)` once [`SessionEvent::Closed`] has been delivered.
    pub fn next_event(&mut self) -> Result<Option<SessionEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.closed_emitted {
                return Ok(None);
            }

            let event = self.transport.next_event()?;
            if let Some(event) = self.handle_transport_event(event) {
                return Ok(Some(event));
            }
        }
    }

    /// Iterate over events until the session closes.
    pub fn events(&mut self) -> Events<'_, T> {
        Events { session: self }
    }

    /// Request shutdown.
    ///
    /// The session becomes `Closed`, and emits [`SessionEvent::Closed`], once
    /// the transport confirms. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            SessionState::Closing | SessionState::Closed => return Ok(()),
            SessionState::Open if self.config.end_stream_on_close => self.finish()?,
            SessionState::Open | SessionState::Connecting => {}
        }

        debug!(from = ?self.state, "session closing");
        self.state = SessionState::Closing;
        self.transport.close()?;
        Ok(())
    }

    /// Apply one transport notification to the state machine.
    ///
    /// Returns the event it produces for the owner, if any. Does not touch
    /// the transport.
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> Option<SessionEvent> {
        if self.state == SessionState::Closed {
            return None;
        }

        match event {
            TransportEvent::Open => {
                if self.state == SessionState::Connecting {
                    debug!("session open");
                    self.state = SessionState::Open;
                }
                None
            }
            TransportEvent::Unit(unit) => self.handle_unit(&unit),
            TransportEvent::Error(message) => {
                warn!(error = %message, "transport reported an error");
                Some(self.error_event(SessionError::TransportFailed(message)))
            }
            TransportEvent::Closed => {
                debug!(from = ?self.state, "session closed");
                self.state = SessionState::Closed;
                if self.closed_emitted {
                    None
                } else {
                    self.closed_emitted = true;
                    Some(SessionEvent::Closed)
                }
            }
        }
    }

    fn handle_unit(&mut self, unit: &[u8]) -> Option<SessionEvent> {
        self.stats.frames_received += 1;

        let classification = match decode_message(unit).map_err(SessionError::from) {
            Ok(message) => classify(&message),
            Err(err) => Err(err),
        };

        match classification {
            Ok(Classification::Partial(transcript)) => {
                trace!(results = transcript.results.len(), "partial result");
                Some(SessionEvent::PartialResult(transcript))
            }
            Ok(Classification::Final(transcript)) => {
                trace!(results = transcript.results.len(), "final result");
                Some(SessionEvent::FinalResult(transcript))
            }
            Ok(Classification::Error { kind, message }) => {
                warn!(%kind, %message, "remote exception");
                Some(self.error_event(SessionError::Application { kind, message }))
            }
            Ok(Classification::None) => {
                trace!("message with no observable result");
                None
            }
            Err(err) => {
                self.stats.frames_rejected += 1;
                warn!(kind = err.kind(), error = %err, "rejected inbound message");
                Some(self.error_event(err))
            }
        }
    }

    fn error_event(&mut self, err: SessionError) -> SessionEvent {
        self.errored = true;
        SessionEvent::Error(err)
    }
}

/// Iterator returned by [`StreamingSession::events`].
pub struct Events<'a, T> {
    session: &'a mut StreamingSession<T>,
}

impl<T: Transport> Iterator for Events<'_, T> {
    type Item = Result<SessionEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.session.next_event().transpose()
    }
}
