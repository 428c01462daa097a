//! Symphonia-backed engine: demuxes and decodes wav/mp3/ogg/flac, windows
//! the decoded frames to the requested range, and re-encodes the excerpt as
//! 16-bit PCM WAV with hound. Everything stays in memory; no temp files.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;
use tracing::debug;

use super::AudioEngine;

pub struct SymphoniaEngine;

impl SymphoniaEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SymphoniaEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioEngine for SymphoniaEngine {
    async fn probe(&self, path: &Path) -> anyhow::Result<f64> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || probe_duration(&path)).await?
    }

    async fn extract(&self, path: &Path, start_ms: u64, end_ms: u64) -> anyhow::Result<Vec<u8>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_excerpt(&path, start_ms, end_ms)).await?
    }
}

fn open_format(path: &Path) -> anyhow::Result<(Box<dyn FormatReader>, u32)> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let source = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("unrecognized audio format in {}", path.display()))?;

    let format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("no decodable audio track in {}", path.display()))?;
    let track_id = track.id;

    Ok((format, track_id))
}

fn probe_duration(path: &Path) -> anyhow::Result<f64> {
    let (format, track_id) = open_format(path)?;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.id == track_id)
        .ok_or_else(|| anyhow!("probed track missing from {}", path.display()))?;

    let params = &track.codec_params;
    let time_base = params
        .time_base
        .ok_or_else(|| anyhow!("no time base reported for {}", path.display()))?;
    let n_frames = params
        .n_frames
        .ok_or_else(|| anyhow!("unknown duration for {}", path.display()))?;

    let time = time_base.calc_time(n_frames);
    Ok(time.seconds as f64 + time.frac)
}

fn ms_to_time(ms: u64) -> Time {
    Time::new(ms / 1000, (ms % 1000) as f64 / 1000.0)
}

fn extract_excerpt(path: &Path, start_ms: u64, end_ms: u64) -> anyhow::Result<Vec<u8>> {
    let (mut format, track_id) = open_format(path)?;

    let (params, time_base) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.id == track_id)
            .ok_or_else(|| anyhow!("probed track missing from {}", path.display()))?;
        let time_base = track
            .codec_params
            .time_base
            .ok_or_else(|| anyhow!("no time base reported for {}", path.display()))?;
        (track.codec_params.clone(), time_base)
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .with_context(|| format!("no decoder for {}", path.display()))?;

    let start_ts = time_base.calc_timestamp(ms_to_time(start_ms));
    let end_ts = time_base.calc_timestamp(ms_to_time(end_ms));

    // An accurate seek lands at or before the window start; the per-packet
    // windowing below trims whatever the seek undershoots.
    if start_ts > 0 {
        match format.seek(
            SeekMode::Accurate,
            SeekTo::Time {
                time: ms_to_time(start_ms),
                track_id: Some(track_id),
            },
        ) {
            Ok(_) => decoder.reset(),
            Err(err) => debug!("seek failed, decoding from the start: {}", err),
        }
    }

    let mut sample_buf: Option<SampleBuffer<i16>> = None;
    let mut window: Vec<i16> = Vec::new();
    let mut out_spec: Option<(u32, u16)> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(err.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let packet_ts = packet.ts();
        if packet_ts >= end_ts {
            break;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(err)) => {
                debug!("skipping undecodable packet: {}", err);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }

        let packet_end = packet_ts + frames as u64;
        let lo = start_ts.max(packet_ts);
        let hi = end_ts.min(packet_end);
        if lo >= hi {
            continue;
        }

        let needed = frames * channels;
        if sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
            sample_buf = Some(SampleBuffer::<i16>::new(frames as u64, spec));
        }
        if let Some(b) = sample_buf.as_mut() {
            b.copy_interleaved_ref(decoded);
            let samples = b.samples();

            let skip = (lo - packet_ts) as usize * channels;
            let take = (hi - lo) as usize * channels;
            window.extend_from_slice(&samples[skip..skip + take]);
            out_spec.get_or_insert((spec.rate, channels as u16));
        }
    }

    let Some((sample_rate, channels)) = out_spec else {
        return Err(anyhow!(
            "no audio frames in range {}ms..{}ms of {}",
            start_ms,
            end_ms,
            path.display()
        ));
    };

    let wav_spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buf = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buf), wav_spec)?;
        for &sample in &window {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(buf)
}
