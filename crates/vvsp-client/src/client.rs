use std::convert::Infallible;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, error, info, trace, warn};
use vvsp_chunk::{
    write_fully, ChunkError, ChunkReader, FrameHeader, StreamHeader, FRAME_AUDIO, FRAME_HEADER,
    FRAME_VIDEO, MAGIC, SUPPORTED_VERSION,
};
use vvsp_transport::{CancelToken, Connect};

use crate::config::ClientConfig;
use crate::error::{ClientError, Disposition, Result};
use crate::event::{AudioFrame, StreamEvent, VideoFrame};
use crate::handle::ClientHandle;
use crate::state::{ConnectionState, Shared};

/// How a client loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Cancelled through a handle.
    Stopped,
    /// A fatal error was reported as [`StreamEvent::Error`].
    Faulted,
}

/// One reconnecting connection to a host output.
///
/// `run` drives the whole lifecycle on the calling thread: connect, read the
/// stream header, then alternate between writing queued commands and reading
/// one frame, until cancelled or faulted.
pub struct StreamClient<C> {
    connector: C,
    config: ClientConfig,
    shared: Arc<Shared>,
    cancel: CancelToken,
    events: Sender<StreamEvent>,
}

/// Per-connection bookkeeping.
struct Session<S> {
    reader: ChunkReader<S>,
    streaming: bool,
    frames: u64,
    next_index: Option<u32>,
}

impl<S> Session<S> {
    fn observe(&mut self, frame_index: u32, skipped: usize) {
        if let Some(expected) = self.next_index {
            if frame_index != expected {
                warn!(expected, received = frame_index, "frame index gap");
            }
        }
        if skipped > 0 {
            trace!(skipped, frame_index, "skipped chunks before frame header");
        }
        self.next_index = Some(frame_index.wrapping_add(1));
        self.frames += 1;
    }
}

#[cfg(unix)]
impl StreamClient<vvsp_transport::EndpointConnector> {
    /// Client for the endpoint of a host output index.
    pub fn for_output(
        endpoint: &vvsp_transport::EndpointConfig,
        index: u32,
        config: ClientConfig,
    ) -> Result<(Self, Receiver<StreamEvent>)> {
        let connector = vvsp_transport::EndpointConnector::for_output(endpoint, index)?
            .with_retry_interval(config.retry_interval)
            .with_io_timeout(Some(config.io_timeout));
        Ok(Self::new(connector, config))
    }
}

impl<C: Connect> StreamClient<C> {
    /// Create a client and the receiving end of its event channel.
    pub fn new(connector: C, config: ClientConfig) -> (Self, Receiver<StreamEvent>) {
        let (events, receiver) = mpsc::channel();
        let client = Self {
            connector,
            config,
            shared: Arc::new(Shared::new()),
            cancel: CancelToken::new(),
            events,
        };
        (client, receiver)
    }

    pub fn handle(&self) -> ClientHandle {
        ClientHandle::new(Arc::clone(&self.shared), self.cancel.clone())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run the client loop on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<RunOutcome>>
    where
        C: Send + 'static,
    {
        std::thread::Builder::new()
            .name("vvsp-client".to_string())
            .spawn(move || self.run())
    }

    /// Run the client loop until cancelled or faulted.
    pub fn run(mut self) -> RunOutcome {
        debug!("client loop started");
        loop {
            if self.cancel.is_cancelled() {
                return self.stop();
            }

            let stream = match self
                .connector
                .connect(self.config.connect_timeout, &self.cancel)
            {
                Ok(Some(stream)) => stream,
                Ok(None) => continue,
                Err(err) => return self.fault(err.into(), false),
            };
            self.shared.set_state(ConnectionState::Connecting);

            let reader = ChunkReader::new(stream)
                .with_cancel(self.cancel.clone())
                .with_max_chunk_size(self.config.max_chunk_size);
            let mut session = Session {
                reader,
                streaming: false,
                frames: 0,
                next_index: None,
            };

            let err = match self.run_session(&mut session) {
                Ok(never) => match never {},
                Err(err) => err,
            };
            let (streaming, frames) = (session.streaming, session.frames);
            drop(session);
            self.shared.end_session(ConnectionState::Disconnected);

            match err.disposition() {
                Disposition::Retry if streaming => {
                    info!(frames, "host closed the stream; reconnecting");
                    self.emit(StreamEvent::Disconnected);
                }
                Disposition::Retry => {
                    debug!("host closed the stream before the handshake; reconnecting");
                }
                Disposition::Stop => {
                    if streaming {
                        self.emit(StreamEvent::Disconnected);
                    }
                    return self.stop();
                }
                Disposition::Fault => return self.fault(err, streaming),
            }
        }
    }

    fn run_session(&self, session: &mut Session<C::Stream>) -> Result<Infallible> {
        let header = handshake(&mut session.reader)?;
        let dropped = self.shared.begin_session(header);
        session.streaming = true;
        info!(
            video_codec = %header.video_codec,
            width = header.video_width,
            height = header.video_height,
            audio_codec = %header.audio_codec,
            dropped_commands = dropped,
            "stream established"
        );
        self.emit(StreamEvent::Connected(header));

        loop {
            if self.cancel.is_cancelled() {
                return Err(ChunkError::Cancelled.into());
            }
            self.flush_commands(session)?;
            self.read_frame(session)?;
        }
    }

    fn flush_commands(&self, session: &mut Session<C::Stream>) -> Result<()> {
        let pending = self.shared.queue.drain_all();
        if pending.is_empty() {
            return Ok(());
        }
        let stream = session.reader.get_mut();
        for command in &pending {
            write_fully(stream, &self.cancel, command)?;
        }
        trace!(count = pending.len(), "commands written");
        Ok(())
    }

    /// Read `fhdr`, `fvid`, `faud` and only then publish the pair, so a frame
    /// cut short by an error produces no events at all.
    fn read_frame(&self, session: &mut Session<C::Stream>) -> Result<()> {
        let (raw, skipped) = session.reader.read_until(FRAME_HEADER)?;
        let frame = FrameHeader::decode(&raw)?;
        let video = session.reader.read_expected(FRAME_VIDEO)?;
        let audio = session.reader.read_expected(FRAME_AUDIO)?;
        session.observe(frame.frame_index, skipped);

        self.emit(StreamEvent::VideoFrame(VideoFrame {
            index: frame.frame_index,
            idr: frame.is_idr(),
            payload: video,
        }));
        self.emit(StreamEvent::AudioFrame(AudioFrame {
            index: frame.frame_index,
            payload: audio,
        }));
        Ok(())
    }

    fn emit(&self, event: StreamEvent) {
        if self.events.send(event).is_err() {
            trace!("event receiver dropped");
        }
    }

    fn stop(&self) -> RunOutcome {
        self.shared.end_session(ConnectionState::Stopped);
        info!("client stopped");
        RunOutcome::Stopped
    }

    fn fault(&self, err: ClientError, streaming: bool) -> RunOutcome {
        error!(error = %err, "connection faulted");
        self.shared.end_session(ConnectionState::Faulted);
        if streaming {
            self.emit(StreamEvent::Disconnected);
        }
        self.emit(StreamEvent::Error(err));
        RunOutcome::Faulted
    }
}

/// Read and validate the stream header chunk.
fn handshake<S: Read>(reader: &mut ChunkReader<S>) -> Result<StreamHeader> {
    let chunk = reader.read_chunk_header()?;
    if chunk.fourcc != MAGIC {
        return Err(ClientError::BadMagic(chunk.fourcc));
    }
    let payload = reader.read_chunk_payload(&chunk)?;
    let header = StreamHeader::decode(&payload)?;
    if !header.is_supported_version() {
        return Err(ClientError::UnsupportedVersion {
            found: header.version,
            supported: SUPPORTED_VERSION,
        });
    }
    Ok(header)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{Cursor, ErrorKind, Write};
    use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use vvsp_chunk::{
        ChunkWriter, Command, FourCc, MouseButtons, RateControl, CODEC_H264, CODEC_PCM16LE,
    };
    use vvsp_transport::TransportError;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    struct MockStream {
        feed: Receiver<Vec<u8>>,
        pending: Cursor<Vec<u8>>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                let n = self.pending.read(buf)?;
                if n > 0 || buf.is_empty() {
                    return Ok(n);
                }
                match self.feed.recv_timeout(Duration::from_millis(5)) {
                    Ok(bytes) => self.pending = Cursor::new(bytes),
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(std::io::Error::from(ErrorKind::WouldBlock))
                    }
                    Err(RecvTimeoutError::Disconnected) => return Ok(0),
                }
            }
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Host end of a [`MockStream`]. Closing it is a clean end of stream.
    struct MockHost {
        feed: Option<Sender<Vec<u8>>>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl MockHost {
        fn send(&self, bytes: Vec<u8>) {
            self.feed.as_ref().unwrap().send(bytes).unwrap();
        }

        fn close(&mut self) {
            self.feed.take();
        }

        fn written(&self) -> Vec<u8> {
            self.written.lock().unwrap().clone()
        }
    }

    fn mock_session() -> (MockStream, MockHost) {
        let (tx, rx) = mpsc::channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        let stream = MockStream {
            feed: rx,
            pending: Cursor::new(Vec::new()),
            written: Arc::clone(&written),
        };
        let host = MockHost {
            feed: Some(tx),
            written,
        };
        (stream, host)
    }

    struct ScriptedConnector {
        sessions: VecDeque<MockStream>,
        /// Commands pushed straight into the queue whenever a session is handed out.
        stale: Option<(Arc<Shared>, Vec<Command>)>,
    }

    impl Connect for ScriptedConnector {
        type Stream = MockStream;

        fn connect(
            &mut self,
            _timeout: Duration,
            _cancel: &CancelToken,
        ) -> vvsp_transport::Result<Option<MockStream>> {
            match self.sessions.pop_front() {
                Some(stream) => {
                    if let Some((shared, commands)) = &self.stale {
                        for command in commands {
                            shared.queue.push(command.encode());
                        }
                    }
                    Ok(Some(stream))
                }
                None => {
                    std::thread::sleep(Duration::from_millis(2));
                    Ok(None)
                }
            }
        }
    }

    struct FailingConnector;

    impl Connect for FailingConnector {
        type Stream = MockStream;

        fn connect(
            &mut self,
            _timeout: Duration,
            _cancel: &CancelToken,
        ) -> vvsp_transport::Result<Option<MockStream>> {
            Err(TransportError::Connect {
                path: "/nonexistent/vvsp-output-A.sock".into(),
                source: std::io::Error::from(ErrorKind::PermissionDenied),
            })
        }
    }

    fn start(
        sessions: Vec<MockStream>,
        stale: Vec<Command>,
    ) -> (ClientHandle, Receiver<StreamEvent>, JoinHandle<RunOutcome>) {
        let connector = ScriptedConnector {
            sessions: sessions.into(),
            stale: None,
        };
        let (mut client, events) = StreamClient::new(connector, ClientConfig::default());
        if !stale.is_empty() {
            client.connector.stale = Some((Arc::clone(&client.shared), stale));
        }
        let handle = client.handle();
        let join = client.spawn().unwrap();
        (handle, events, join)
    }

    fn stream_header(version: u32, width: u32, height: u32) -> StreamHeader {
        StreamHeader {
            version,
            video_codec: CODEC_H264,
            video_width: width,
            video_height: height,
            frame_rate_num: 60,
            frame_rate_den: 1,
            audio_codec: CODEC_PCM16LE,
            audio_rate: 48_000,
            audio_channels: 2,
        }
    }

    fn header_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut writer = ChunkWriter::new(Vec::new());
        writer
            .write_stream_header(&stream_header(SUPPORTED_VERSION, width, height))
            .unwrap();
        writer.into_inner()
    }

    fn frame_bytes(index: u32, idr: bool, video: &[u8], audio: &[u8]) -> Vec<u8> {
        let mut writer = ChunkWriter::new(Vec::new());
        writer
            .write_frame(&FrameHeader::new(index, idr), video, audio)
            .unwrap();
        writer.into_inner()
    }

    fn chunk_bytes(fourcc: FourCc, payload: &[u8]) -> Vec<u8> {
        let mut writer = ChunkWriter::new(Vec::new());
        writer.write_chunk(fourcc, payload).unwrap();
        writer.into_inner()
    }

    fn next(events: &Receiver<StreamEvent>) -> StreamEvent {
        events.recv_timeout(WAIT).expect("expected an event")
    }

    fn expect_connected(events: &Receiver<StreamEvent>) -> StreamHeader {
        match next(events) {
            StreamEvent::Connected(header) => header,
            other => panic!("expected connected, got {other:?}"),
        }
    }

    fn expect_frame(events: &Receiver<StreamEvent>) -> (VideoFrame, AudioFrame) {
        let video = match next(events) {
            StreamEvent::VideoFrame(video) => video,
            other => panic!("expected video, got {other:?}"),
        };
        let audio = match next(events) {
            StreamEvent::AudioFrame(audio) => audio,
            other => panic!("expected audio, got {other:?}"),
        };
        assert_eq!(video.index, audio.index);
        (video, audio)
    }

    fn expect_disconnected(events: &Receiver<StreamEvent>) {
        match next(events) {
            StreamEvent::Disconnected => {}
            other => panic!("expected disconnected, got {other:?}"),
        }
    }

    fn expect_closed(events: &Receiver<StreamEvent>) {
        assert!(matches!(events.try_recv(), Err(TryRecvError::Disconnected)));
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + WAIT;
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met in time");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn header_and_one_frame() {
        let (stream, mut host) = mock_session();
        host.send(header_bytes(1920, 1080));
        host.send(frame_bytes(0, true, &[0xDE, 0xAD, 0xBE, 0xEF], &[0x01, 0x02]));

        let (handle, events, join) = start(vec![stream], Vec::new());

        let header = expect_connected(&events);
        assert_eq!((header.video_width, header.video_height), (1920, 1080));
        assert_eq!(header.video_codec, CODEC_H264);
        assert_eq!(header.audio_rate, 48_000);

        let (video, audio) = expect_frame(&events);
        assert_eq!(video.payload.as_ref(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(video.idr);
        assert_eq!(video.index, 0);
        assert_eq!(audio.payload.as_ref(), &[0x01, 0x02]);

        host.close();
        expect_disconnected(&events);

        handle.cancel();
        assert_eq!(join.join().unwrap(), RunOutcome::Stopped);
        expect_closed(&events);
    }

    #[test]
    fn bad_magic_faults_without_connecting() {
        let (stream, host) = mock_session();
        host.send(chunk_bytes(FourCc::new(*b"RIFF"), &[0u8; 36]));

        let (handle, events, join) = start(vec![stream], Vec::new());

        match next(&events) {
            StreamEvent::Error(ClientError::BadMagic(found)) => {
                assert_eq!(found, FourCc::new(*b"RIFF"))
            }
            other => panic!("expected bad magic error, got {other:?}"),
        }
        assert_eq!(join.join().unwrap(), RunOutcome::Faulted);
        assert_eq!(handle.state(), ConnectionState::Faulted);
        expect_closed(&events);
    }

    #[test]
    fn unsupported_version_faults() {
        let (stream, host) = mock_session();
        let mut writer = ChunkWriter::new(Vec::new());
        writer
            .write_stream_header(&stream_header(3, 640, 480))
            .unwrap();
        host.send(writer.into_inner());

        let (handle, events, join) = start(vec![stream], Vec::new());

        assert!(matches!(
            next(&events),
            StreamEvent::Error(ClientError::UnsupportedVersion {
                found: 3,
                supported: 2
            })
        ));
        assert_eq!(join.join().unwrap(), RunOutcome::Faulted);
        assert!(handle.header().is_none());
        expect_closed(&events);
    }

    #[test]
    fn frames_alternate_video_then_audio() {
        const FRAMES: u32 = 6;
        let (stream, mut host) = mock_session();
        host.send(header_bytes(640, 480));
        for i in 0..FRAMES {
            let video = vec![i as u8; 10 + i as usize];
            let audio = vec![0xA0 | i as u8; 4];
            host.send(frame_bytes(i, i % 3 == 0, &video, &audio));
        }
        host.close();

        let (handle, events, join) = start(vec![stream], Vec::new());

        expect_connected(&events);
        for i in 0..FRAMES {
            let (video, audio) = expect_frame(&events);
            assert_eq!(video.index, i);
            assert_eq!(video.idr, i % 3 == 0);
            assert_eq!(video.payload.len(), 10 + i as usize);
            assert_eq!(audio.payload.as_ref(), &[0xA0 | i as u8; 4]);
        }
        expect_disconnected(&events);

        handle.cancel();
        assert_eq!(join.join().unwrap(), RunOutcome::Stopped);
        expect_closed(&events);
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let (stream, mut host) = mock_session();
        host.send(header_bytes(640, 480));
        host.send(chunk_bytes(FourCc::new(*b"meta"), &[0x55; 100]));
        host.send(frame_bytes(0, true, b"v0", b"a0"));
        host.send(chunk_bytes(FourCc::new(*b"tick"), &[]));
        host.send(chunk_bytes(FourCc::new(*b"meta"), b"hello"));
        // Index gap: frames 1..4 dropped upstream.
        host.send(frame_bytes(5, false, b"v5", b"a5"));
        host.close();

        let (handle, events, join) = start(vec![stream], Vec::new());

        expect_connected(&events);
        let (video, audio) = expect_frame(&events);
        assert_eq!((video.payload.as_ref(), audio.payload.as_ref()), (&b"v0"[..], &b"a0"[..]));
        let (video, audio) = expect_frame(&events);
        assert_eq!(video.index, 5);
        assert_eq!((video.payload.as_ref(), audio.payload.as_ref()), (&b"v5"[..], &b"a5"[..]));
        expect_disconnected(&events);

        handle.cancel();
        assert_eq!(join.join().unwrap(), RunOutcome::Stopped);
        expect_closed(&events);
    }

    #[test]
    fn missing_video_chunk_is_fatal() {
        let (stream, host) = mock_session();
        host.send(header_bytes(640, 480));
        let mut fhdr = Vec::new();
        FrameHeader::new(0, true).encode(&mut fhdr);
        host.send(chunk_bytes(FRAME_HEADER, &fhdr));
        host.send(chunk_bytes(FRAME_AUDIO, b"pcm"));

        let (handle, events, join) = start(vec![stream], Vec::new());

        expect_connected(&events);
        expect_disconnected(&events);
        match next(&events) {
            StreamEvent::Error(ClientError::Chunk(ChunkError::UnexpectedChunk {
                expected,
                found,
            })) => {
                assert_eq!(expected, FRAME_VIDEO);
                assert_eq!(found, FRAME_AUDIO);
            }
            other => panic!("expected unexpected-chunk error, got {other:?}"),
        }
        assert_eq!(join.join().unwrap(), RunOutcome::Faulted);
        assert_eq!(handle.state(), ConnectionState::Faulted);
        expect_closed(&events);
    }

    #[test]
    fn incomplete_frame_emits_nothing() {
        let (stream, host) = mock_session();
        host.send(header_bytes(640, 480));
        host.send(frame_bytes(0, true, b"v0", b"a0"));
        let mut fhdr = Vec::new();
        FrameHeader::new(1, false).encode(&mut fhdr);
        host.send(chunk_bytes(FRAME_HEADER, &fhdr));
        host.send(chunk_bytes(FRAME_VIDEO, b"v1"));
        host.send(chunk_bytes(FRAME_VIDEO, b"v2"));

        let (_handle, events, join) = start(vec![stream], Vec::new());

        expect_connected(&events);
        let (video, _) = expect_frame(&events);
        assert_eq!(video.index, 0);
        expect_disconnected(&events);
        assert!(matches!(
            next(&events),
            StreamEvent::Error(ClientError::Chunk(ChunkError::UnexpectedChunk { .. }))
        ));
        assert_eq!(join.join().unwrap(), RunOutcome::Faulted);
        expect_closed(&events);
    }

    #[test]
    fn commands_queued_before_handshake_are_never_sent() {
        let (stream, host) = mock_session();
        host.send(header_bytes(640, 480));

        let stale = vec![Command::KeyDown { vk: 0x41 }, Command::Nop];
        let (handle, events, join) = start(vec![stream], stale);

        expect_connected(&events);
        assert_eq!(handle.pending_commands(), 0);

        handle.send(&Command::RequestIdr);
        host.send(frame_bytes(0, false, b"v", b"a"));
        expect_frame(&events);
        wait_until(|| !host.written().is_empty());
        assert_eq!(host.written(), vec![0x01]);

        handle.cancel();
        expect_disconnected(&events);
        assert_eq!(join.join().unwrap(), RunOutcome::Stopped);
    }

    #[test]
    fn commands_written_in_fifo_order() {
        let (stream, host) = mock_session();
        host.send(header_bytes(640, 480));

        let (handle, events, join) = start(vec![stream], Vec::new());
        expect_connected(&events);

        let commands = [
            Command::KeyDown { vk: 0x10 },
            Command::KeyUp { vk: 0x10 },
            Command::MouseButtons(MouseButtons::LEFT.with(MouseButtons::RIGHT)),
            Command::TouchBegin { id: 1, x: 5, y: 6 },
            Command::SetEncodeParams {
                mode: RateControl::ConstantRate,
                value: 12_000,
            },
        ];
        for command in &commands {
            handle.send(command);
        }
        let expected: Vec<u8> = commands
            .iter()
            .flat_map(|c| c.encode().to_vec())
            .collect();

        host.send(frame_bytes(0, true, b"v", b"a"));
        expect_frame(&events);
        host.send(frame_bytes(1, false, b"v", b"a"));
        expect_frame(&events);
        wait_until(|| host.written().len() >= expected.len());
        assert_eq!(host.written(), expected);

        handle.cancel();
        expect_disconnected(&events);
        assert_eq!(join.join().unwrap(), RunOutcome::Stopped);
    }

    #[test]
    fn reconnects_after_end_of_stream_with_fresh_queue() {
        let (first, mut host1) = mock_session();
        let (second, host2) = mock_session();
        host1.send(header_bytes(1280, 720));
        host1.send(frame_bytes(0, true, b"first", b"a"));
        host2.send(header_bytes(1920, 1080));

        let stale = vec![Command::KeyChar { code: 'x' as u32 }];
        let (handle, events, join) = start(vec![first, second], stale);

        assert_eq!(expect_connected(&events).video_width, 1280);
        let (video, _) = expect_frame(&events);
        assert_eq!(video.payload.as_ref(), b"first");

        // Host goes away mid-stream.
        host1.close();
        expect_disconnected(&events);

        assert_eq!(expect_connected(&events).video_width, 1920);
        assert_eq!(handle.header().map(|h| h.video_width), Some(1920));
        assert!(handle.is_connected());

        let command = Command::MouseMove { x: 1, y: 2 };
        handle.send(&command);
        host2.send(frame_bytes(0, true, b"second", b"a"));
        let (video, _) = expect_frame(&events);
        assert_eq!(video.payload.as_ref(), b"second");

        wait_until(|| !host2.written().is_empty());
        assert_eq!(host2.written(), command.encode().to_vec());
        assert!(host1.written().is_empty());

        handle.cancel();
        expect_disconnected(&events);
        assert_eq!(join.join().unwrap(), RunOutcome::Stopped);
        expect_closed(&events);
    }

    #[test]
    fn end_of_stream_mid_frame_drops_partial_frame_and_reconnects() {
        let (first, mut host1) = mock_session();
        let (second, host2) = mock_session();
        host1.send(header_bytes(1280, 720));
        let mut fhdr = Vec::new();
        FrameHeader::new(7, true).encode(&mut fhdr);
        host1.send(chunk_bytes(FRAME_HEADER, &fhdr));
        // `fvid` announces 16 bytes but only 4 arrive before the host hangs up.
        let mut truncated = chunk_bytes(FRAME_VIDEO, &[0xAB; 16]);
        truncated.truncate(8 + 4);
        host1.send(truncated);
        host1.close();
        host2.send(header_bytes(1920, 1080));

        let stale = vec![Command::KeyDown { vk: 0x41 }, Command::RequestIdr];
        let (handle, events, join) = start(vec![first, second], stale);

        assert_eq!(expect_connected(&events).video_width, 1280);
        // No video or audio for index 7 before the disconnect.
        expect_disconnected(&events);

        assert_eq!(expect_connected(&events).video_width, 1920);
        let command = Command::MouseMove { x: 3, y: 4 };
        handle.send(&command);
        host2.send(frame_bytes(0, true, b"fresh", b"a"));
        let (video, audio) = expect_frame(&events);
        assert_eq!((video.index, audio.index), (0, 0));
        assert_eq!(video.payload.as_ref(), b"fresh");

        wait_until(|| !host2.written().is_empty());
        assert_eq!(host2.written(), command.encode().to_vec());
        assert!(host1.written().is_empty());

        handle.cancel();
        expect_disconnected(&events);
        assert_eq!(join.join().unwrap(), RunOutcome::Stopped);
        expect_closed(&events);
    }

    #[test]
    fn end_of_stream_before_handshake_retries_silently() {
        let (first, mut host1) = mock_session();
        let (second, host2) = mock_session();
        host1.close();
        host2.send(header_bytes(800, 600));

        let (handle, events, join) = start(vec![first, second], Vec::new());

        assert_eq!(expect_connected(&events).video_width, 800);

        handle.cancel();
        expect_disconnected(&events);
        assert_eq!(join.join().unwrap(), RunOutcome::Stopped);
        expect_closed(&events);
    }

    #[test]
    fn stalled_host_blocks_until_cancelled() {
        let (stream, host) = mock_session();
        host.send(header_bytes(640, 480));

        let (handle, events, join) = start(vec![stream], Vec::new());
        expect_connected(&events);

        // No data deadline: a silent host produces no events and no state change.
        assert!(matches!(
            events.recv_timeout(Duration::from_millis(100)),
            Err(RecvTimeoutError::Timeout)
        ));
        assert_eq!(handle.state(), ConnectionState::Streaming);

        handle.cancel();
        expect_disconnected(&events);
        assert_eq!(join.join().unwrap(), RunOutcome::Stopped);
        assert_eq!(handle.state(), ConnectionState::Stopped);
        assert!(handle.header().is_none());
        expect_closed(&events);
        drop(host);
    }

    #[test]
    fn cancel_before_any_host_stops_quietly() {
        let (handle, events, join) = start(Vec::new(), Vec::new());
        handle.cancel();
        assert_eq!(join.join().unwrap(), RunOutcome::Stopped);
        expect_closed(&events);
    }

    #[test]
    fn connect_failure_is_fatal() {
        let (client, events) = StreamClient::new(FailingConnector, ClientConfig::default());
        let handle = client.handle();

        assert_eq!(client.run(), RunOutcome::Faulted);
        assert!(matches!(
            events.try_recv(),
            Ok(StreamEvent::Error(ClientError::Transport(_)))
        ));
        expect_closed(&events);
        assert_eq!(handle.state(), ConnectionState::Faulted);
    }
}
