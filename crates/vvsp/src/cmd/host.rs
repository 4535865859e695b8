use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use vvsp_chunk::{
    ChunkError, ChunkWriter, Command, FrameHeader, StreamHeader, CODEC_H264, CODEC_PCM16LE,
    SUPPORTED_VERSION,
};
use vvsp_transport::{CancelToken, EndpointConfig, EndpointListener, IpcStream};

use crate::cmd::HostArgs;
use crate::exit::{io_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};

const AUDIO_RATE: u32 = 48_000;
const AUDIO_CHANNELS: u32 = 2;
const ACCEPT_POLL: Duration = Duration::from_millis(50);

pub fn run(args: HostArgs, endpoint: &EndpointConfig) -> CliResult<i32> {
    if args.fps == 0 {
        return Err(CliError::new(USAGE, "fps must be greater than zero"));
    }
    if args.idr_interval == 0 {
        return Err(CliError::new(USAGE, "idr interval must be greater than zero"));
    }

    // Installed before binding so an interrupt never finds the endpoint up
    // without a handler.
    let shutdown = CancelToken::new();
    install_ctrlc_handler(shutdown.clone())?;

    let listener = EndpointListener::bind_output(endpoint, args.output)
        .map_err(|err| transport_error("bind failed", err))?;

    let header = stream_header(&args);

    while !shutdown.is_cancelled() {
        let Some(stream) = listener
            .accept_until(&shutdown, ACCEPT_POLL)
            .map_err(|err| transport_error("accept failed", err))?
        else {
            info!("shutdown while waiting for a client");
            break;
        };
        info!("client connected");

        let commands = stream
            .try_clone()
            .map_err(|err| transport_error("stream clone failed", err))?;
        let reader = thread::Builder::new()
            .name("vvsp-host-commands".to_string())
            .spawn(move || log_commands(commands))
            .map_err(|err| io_error("command reader failed to start", err))?;

        let mut writer = ChunkWriter::new(stream);
        match serve(&mut writer, &header, &args, &shutdown) {
            Ok(frames) => info!(frames, "session closed"),
            Err(ChunkError::EndOfStream) => info!("client disconnected"),
            Err(err) => warn!(error = %err, "session failed"),
        }
        writer.into_inner().close();
        let _ = reader.join();

        if args.once {
            break;
        }
    }

    Ok(SUCCESS)
}

fn stream_header(args: &HostArgs) -> StreamHeader {
    StreamHeader {
        version: SUPPORTED_VERSION,
        video_codec: CODEC_H264,
        video_width: args.width,
        video_height: args.height,
        frame_rate_num: args.fps,
        frame_rate_den: 1,
        audio_codec: CODEC_PCM16LE,
        audio_rate: AUDIO_RATE,
        audio_channels: AUDIO_CHANNELS,
    }
}

/// Stream frames until the frame limit, shutdown, or the client leaving.
fn serve(
    writer: &mut ChunkWriter<IpcStream>,
    header: &StreamHeader,
    args: &HostArgs,
    shutdown: &CancelToken,
) -> vvsp_chunk::Result<u64> {
    writer.write_stream_header(header)?;

    let interval = Duration::from_secs(1) / args.fps;
    let audio = silence(header);
    let started = Instant::now();
    let mut sent = 0u64;

    while !shutdown.is_cancelled() && args.frames.map_or(true, |max| sent < max) {
        let index = sent as u32;
        let idr = index % args.idr_interval == 0;
        let video = synthetic_video(index, idr, args.video_bytes);
        writer.write_frame(&FrameHeader::new(index, idr), &video, &audio)?;
        sent += 1;

        let due = interval * sent as u32;
        if let Some(wait) = due.checked_sub(started.elapsed()) {
            thread::sleep(wait);
        }
    }

    Ok(sent)
}

fn log_commands(mut stream: IpcStream) {
    loop {
        match Command::read_from(&mut stream) {
            Ok(command) => info!(?command, "command received"),
            Err(ChunkError::EndOfStream) => break,
            Err(err) => {
                debug!(error = %err, "command stream closed");
                break;
            }
        }
    }
}

/// An Annex-B start code and NAL header followed by filler.
fn synthetic_video(index: u32, idr: bool, len: usize) -> Vec<u8> {
    let nal_type = if idr { 0x65 } else { 0x41 };
    let mut payload = vec![0, 0, 0, 1, nal_type];
    payload.extend_from_slice(&index.to_le_bytes());
    payload.resize(len.max(payload.len()), (index & 0xff) as u8);
    payload
}

/// One frame's worth of PCM16 silence.
fn silence(header: &StreamHeader) -> Vec<u8> {
    let samples = header.audio_rate / header.frame_rate_num.max(1);
    vec![0u8; samples as usize * header.audio_channels as usize * 2]
}

fn install_ctrlc_handler(shutdown: CancelToken) -> CliResult<()> {
    ctrlc::set_handler(move || shutdown.cancel())
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
