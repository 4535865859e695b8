use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use vvsp_chunk::StreamHeader;
use vvsp_client::StreamEvent;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HeaderOutput {
    pub version: u32,
    pub video_codec: String,
    pub video_width: u32,
    pub video_height: u32,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    pub frame_rate: Option<f64>,
    pub audio_codec: String,
    pub audio_rate: u32,
    pub audio_channels: u32,
}

impl From<&StreamHeader> for HeaderOutput {
    fn from(header: &StreamHeader) -> Self {
        Self {
            version: header.version,
            video_codec: header.video_codec.to_string(),
            video_width: header.video_width,
            video_height: header.video_height,
            frame_rate_num: header.frame_rate_num,
            frame_rate_den: header.frame_rate_den,
            frame_rate: header.frame_rate(),
            audio_codec: header.audio_codec.to_string(),
            audio_rate: header.audio_rate,
            audio_channels: header.audio_channels,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum EventOutput {
    Connected { header: HeaderOutput },
    Disconnected,
    VideoFrame { index: u32, idr: bool, size: usize },
    AudioFrame { index: u32, size: usize },
    Error { message: String },
}

impl From<&StreamEvent> for EventOutput {
    fn from(event: &StreamEvent) -> Self {
        match event {
            StreamEvent::Connected(header) => Self::Connected {
                header: header.into(),
            },
            StreamEvent::Disconnected => Self::Disconnected,
            StreamEvent::VideoFrame(frame) => Self::VideoFrame {
                index: frame.index,
                idr: frame.idr,
                size: frame.payload.len(),
            },
            StreamEvent::AudioFrame(frame) => Self::AudioFrame {
                index: frame.index,
                size: frame.payload.len(),
            },
            StreamEvent::Error(err) => Self::Error {
                message: err.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
struct EventRecord {
    #[serde(flatten)]
    event: EventOutput,
    timestamp: String,
}

pub fn print_event(event: &StreamEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let record = EventRecord {
                event: event.into(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => match event {
            StreamEvent::Connected(header) => print_header(header, format),
            _ => {
                let (index, idr, size) = event_columns(event);
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec!["EVENT", "INDEX", "IDR", "SIZE"])
                    .add_row(vec![event_label(event), index, idr, size]);
                println!("{table}");
            }
        },
        OutputFormat::Pretty => match event {
            StreamEvent::Connected(header) => {
                println!("connected {}", header_summary(header));
            }
            StreamEvent::Disconnected => println!("disconnected"),
            StreamEvent::VideoFrame(frame) => println!(
                "video index={} idr={} size={}",
                frame.index,
                frame.idr,
                frame.payload.len()
            ),
            StreamEvent::AudioFrame(frame) => {
                println!("audio index={} size={}", frame.index, frame.payload.len())
            }
            StreamEvent::Error(err) => println!("error {err}"),
        },
        // Raw output is the bare video elementary stream.
        OutputFormat::Raw => {
            if let StreamEvent::VideoFrame(frame) = event {
                print_raw(frame.payload.as_ref());
            }
        }
    }
}

pub fn print_header(header: &StreamHeader, format: OutputFormat) {
    let out = HeaderOutput::from(header);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let frame_rate = out
                .frame_rate
                .map(|fps| format!("{fps:.2}"))
                .unwrap_or_else(|| "unknown".to_string());
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["version".to_string(), out.version.to_string()])
                .add_row(vec!["video codec".to_string(), out.video_codec.clone()])
                .add_row(vec![
                    "resolution".to_string(),
                    format!("{}x{}", out.video_width, out.video_height),
                ])
                .add_row(vec!["frame rate".to_string(), frame_rate])
                .add_row(vec!["audio codec".to_string(), out.audio_codec.clone()])
                .add_row(vec!["audio rate".to_string(), out.audio_rate.to_string()])
                .add_row(vec![
                    "audio channels".to_string(),
                    out.audio_channels.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Stream Info:");
            println!("  Version:     {}", out.version);
            println!(
                "  Video:       {} {}x{}",
                out.video_codec, out.video_width, out.video_height
            );
            match out.frame_rate {
                Some(fps) => println!("  Frame rate:  {fps:.2} fps"),
                None => println!("  Frame rate:  unknown"),
            }
            println!(
                "  Audio:       {} {} Hz x{}",
                out.audio_codec, out.audio_rate, out.audio_channels
            );
        }
        OutputFormat::Raw => {
            println!("{}", header_summary(header));
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn header_summary(header: &StreamHeader) -> String {
    format!(
        "{} {}x{} {} {}Hz",
        header.video_codec,
        header.video_width,
        header.video_height,
        header.audio_codec,
        header.audio_rate
    )
}

fn event_label(event: &StreamEvent) -> String {
    event.name().to_string()
}

fn event_columns(event: &StreamEvent) -> (String, String, String) {
    match event {
        StreamEvent::VideoFrame(frame) => (
            frame.index.to_string(),
            frame.idr.to_string(),
            frame.payload.len().to_string(),
        ),
        StreamEvent::AudioFrame(frame) => (
            frame.index.to_string(),
            "-".to_string(),
            frame.payload.len().to_string(),
        ),
        StreamEvent::Error(err) => ("-".to_string(), "-".to_string(), err.to_string()),
        _ => ("-".to_string(), "-".to_string(), "-".to_string()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use vvsp_chunk::{CODEC_H264, CODEC_PCM16LE};
    use vvsp_client::VideoFrame;

    use super::*;

    fn header() -> StreamHeader {
        StreamHeader {
            version: 2,
            video_codec: CODEC_H264,
            video_width: 1920,
            video_height: 1080,
            frame_rate_num: 60,
            frame_rate_den: 1,
            audio_codec: CODEC_PCM16LE,
            audio_rate: 48_000,
            audio_channels: 2,
        }
    }

    #[test]
    fn header_output_uses_fourcc_text() {
        let out = HeaderOutput::from(&header());
        assert_eq!(out.video_codec, "h264");
        assert_eq!(out.audio_codec, "pc16");
        assert_eq!(out.frame_rate, Some(60.0));
    }

    #[test]
    fn event_json_is_tagged() {
        let event = StreamEvent::VideoFrame(VideoFrame {
            index: 7,
            idr: true,
            payload: Bytes::from_static(&[0, 0, 0, 1, 0x65]),
        });
        let record = EventRecord {
            event: (&event).into(),
            timestamp: "0".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"event":"video_frame","index":7,"idr":true,"size":5,"timestamp":"0"}"#
        );
    }

    #[test]
    fn connected_event_nests_header() {
        let value = serde_json::to_value(EventOutput::from(&StreamEvent::Connected(header())))
            .unwrap();
        assert_eq!(value["event"], "connected");
        assert_eq!(value["header"]["video_width"], 1920);
    }
}
