use std::path::Path;
use std::sync::LazyLock;

use anyhow::{anyhow, bail};
use ffmpeg_next::format::Pixel::YUV420P;
use ffmpeg_next::format::Sample;
use ffmpeg_next::format::context::Output as OutputContext;
use ffmpeg_next::frame;
use ffmpeg_next::software::resampling::Context as SamplerContext;
use ffmpeg_next::software::scaling::context::Context as Scaler;
use ffmpeg_next::software::scaling::flag::Flags;
use ffmpeg_next::threading;
use ffmpeg_next::{ChannelLayout, Rational};
use ffmpeg_next::{Dictionary, Packet, codec, format, media};
use tracing::{debug, error, info, warn};

// Fixed output codec pair: H.264 + AAC in an MP4 container. Compatibility
// over speed; stream copy is deliberately not offered.
const H264_CRF: &str = "23";
const H264_PRESET: &str = "veryfast";

const AAC_FRAME_FORMAT: Sample = Sample::F32(format::sample::Type::Planar);
const STAGING_FORMAT: Sample = Sample::F32(format::sample::Type::Packed);
const AAC_TARGET_RATE: i32 = 48000;
const AAC_TARGET_LAYOUT: ChannelLayout = ChannelLayout::STEREO;
const AAC_TARGET_BITRATE: usize = 128_000;

const TIME_BASE_US: i64 = 1_000_000;
const PROGRESS_INTERVAL_S: f64 = 10.0;

static NUM_CPUS: LazyLock<usize> = LazyLock::new(|| {
    let n = num_cpus::get();
    let num = if n > 16 { 16 } else { n };
    info!(num, "Detecting CPU cores");
    num
});

fn is_rational_valid(r: Rational) -> bool {
    r.numerator() > 0 && r.denominator() > 0
}

fn q2d(r: Rational) -> f64 {
    r.numerator() as f64 / r.denominator() as f64
}

/// The requested end never runs past the source; the start is deliberately
/// left alone, an out-of-range start surfaces as an empty-window error.
pub fn clamp_end(end: f64, duration: Option<f64>) -> f64 {
    match duration {
        Some(duration) => end.min(duration),
        None => end,
    }
}

/// Frame rate for the encoder, from the input stream's average rate with the
/// raw rate as fallback.
fn valid_frame_rate(in_video_stream: &ffmpeg_next::Stream) -> anyhow::Result<Rational> {
    let avg_fps = in_video_stream.avg_frame_rate();
    if is_rational_valid(avg_fps) {
        return Ok(avg_fps);
    }

    let r_fps = in_video_stream.rate();
    if is_rational_valid(r_fps) {
        return Ok(r_fps);
    }

    Err(anyhow!(
        "Unable to determine a valid frame rate: avg_frame_rate={}/{}, r_frame_rate={}/{}",
        avg_fps.numerator(),
        avg_fps.denominator(),
        r_fps.numerator(),
        r_fps.denominator()
    ))
}

/// Encoder timebase, preferring the input stream's own timebase, then the
/// reciprocal of either frame rate, then the decoder's timebase.
fn valid_encoder_time_base(
    in_video_stream: &ffmpeg_next::Stream,
    decoder: &codec::decoder::Video,
) -> anyhow::Result<Rational> {
    let stream_tb = in_video_stream.time_base();
    if is_rational_valid(stream_tb) {
        return Ok(stream_tb);
    }

    for rate in [in_video_stream.rate(), in_video_stream.avg_frame_rate()] {
        if is_rational_valid(rate) {
            let derived = Rational::new(rate.denominator(), rate.numerator());
            if is_rational_valid(derived) {
                return Ok(derived);
            }
        }
    }

    let decoder_tb = decoder.time_base();
    if is_rational_valid(decoder_tb) {
        return Ok(decoder_tb);
    }

    Err(anyhow!(
        "Unable to determine a valid encoder timebase, all sources invalid"
    ))
}

#[allow(clippy::field_reassign_with_default)]
fn setup_h264_encoder(
    job_id: &str,
    dec_video: &codec::decoder::Video,
    octx: &mut OutputContext,
    in_video_stream: &ffmpeg_next::Stream,
) -> anyhow::Result<(usize, codec::encoder::video::Encoder)> {
    debug!(%job_id, "Setting up H.264 video encoder");

    let h264 = codec::encoder::find(codec::Id::H264)
        .ok_or_else(|| anyhow!("H.264 encoder: codec not found"))?;

    let mut enc_config = codec::Context::new_with_codec(h264)
        .encoder()
        .video()
        .map_err(|e| anyhow!("H.264 encoder: failed to create config: {e}"))?;

    // MP4 wants extradata out-of-band.
    enc_config.set_flags(codec::Flags::GLOBAL_HEADER);

    let mut threading_config = threading::Config::default();
    threading_config.count = *NUM_CPUS;
    threading_config.kind = threading::Type::Slice;
    enc_config.set_threading(threading_config);

    enc_config.set_format(YUV420P);
    enc_config.set_width(dec_video.width());
    enc_config.set_height(dec_video.height());

    let time_base = valid_encoder_time_base(in_video_stream, dec_video)?;
    enc_config.set_time_base(time_base);

    let frame_rate = valid_frame_rate(in_video_stream)?;
    enc_config.set_frame_rate(Some(frame_rate));

    debug!(%job_id, "H.264 encoder: timebase {}/{}, frame rate {}/{}",
        time_base.numerator(), time_base.denominator(),
        frame_rate.numerator(), frame_rate.denominator());

    let mut opts = Dictionary::new();
    opts.set("crf", H264_CRF);
    opts.set("preset", H264_PRESET);

    let opened_encoder = enc_config
        .open_with(opts)
        .map_err(|e| anyhow!("H.264 encoder: failed to open: {e}"))?;

    let mut ost_video = octx.add_stream(h264.id())?;
    ost_video.set_parameters(&opened_encoder);
    ost_video.set_time_base(time_base);
    debug!(%job_id, index = ost_video.index(), "H.264 video stream added to output");

    Ok((ost_video.index(), opened_encoder))
}

fn setup_aac_encoder_and_resampler(
    job_id: &str,
    dec_audio: &codec::decoder::Audio,
    octx: &mut OutputContext,
) -> anyhow::Result<(usize, codec::encoder::audio::Encoder, SamplerContext, usize, usize)> {
    debug!(%job_id, "Setting up AAC audio encoder and resampler");

    let aac = codec::encoder::find(codec::Id::AAC)
        .ok_or_else(|| anyhow!("AAC encoder: codec not found"))?;

    let mut enc_config = codec::Context::new_with_codec(aac)
        .encoder()
        .audio()
        .map_err(|e| anyhow!("AAC encoder: failed to create config: {e}"))?;

    enc_config.set_flags(codec::Flags::GLOBAL_HEADER);
    enc_config.set_format(AAC_FRAME_FORMAT);
    enc_config.set_rate(AAC_TARGET_RATE);
    enc_config.set_channel_layout(AAC_TARGET_LAYOUT);
    enc_config.set_bit_rate(AAC_TARGET_BITRATE);
    enc_config.set_time_base(Rational::new(1, AAC_TARGET_RATE));

    let opened_encoder = enc_config
        .open_with(Dictionary::new())
        .map_err(|e| anyhow!("AAC encoder: failed to open: {e}"))?;

    let frame_size = opened_encoder.frame_size();
    let frame_size = if frame_size == 0 {
        warn!(%job_id, "AAC encoder reported frame_size 0, defaulting to 1024");
        1024
    } else {
        frame_size as usize
    };
    let channels = opened_encoder.channels() as usize;
    if channels == 0 {
        bail!("AAC encoder: reported 0 channels after opening");
    }
    debug!(%job_id, frame_size, channels, "AAC encoder opened");

    let mut ost_audio = octx.add_stream(aac.id())?;
    ost_audio.set_parameters(&opened_encoder);
    ost_audio.set_time_base(Rational::new(1, AAC_TARGET_RATE));
    debug!(%job_id, index = ost_audio.index(), "AAC audio stream added to output");

    let in_ch_layout = dec_audio.channel_layout();
    let in_ch_layout = if in_ch_layout.is_empty() || in_ch_layout.channels() == 0 {
        debug!(%job_id, channels = dec_audio.channels(), "Input channel layout empty, using default");
        ChannelLayout::default(dec_audio.channels().into())
    } else {
        in_ch_layout
    };

    // Resample to packed f32; the staging buffer stays interleaved and is
    // de-interleaved into the encoder's planar frames.
    let resampler = SamplerContext::get(
        dec_audio.format(),
        in_ch_layout,
        dec_audio.rate(),
        STAGING_FORMAT,
        AAC_TARGET_LAYOUT,
        AAC_TARGET_RATE as u32,
    )
    .map_err(|e| anyhow!("Audio resampler: failed to create: {e}"))?;

    Ok((ost_audio.index(), opened_encoder, resampler, frame_size, channels))
}

/// Rescale an encoded video packet into the output stream's timebase and
/// write it interleaved.
fn write_video_packet(
    packet: &mut Packet,
    ost_index: usize,
    source_tb: Rational,
    octx: &mut OutputContext,
) -> anyhow::Result<()> {
    packet.set_stream(ost_index);

    let target_tb = octx
        .stream(ost_index)
        .ok_or_else(|| anyhow!("Missing output stream for index {ost_index}"))?
        .time_base();
    if source_tb.denominator() == 0 || target_tb.denominator() == 0 {
        bail!("Cannot rescale video packet between {source_tb:?} and {target_tb:?}");
    }

    packet.rescale_ts(source_tb, target_tb);
    packet
        .write_interleaved(octx)
        .map_err(|e| anyhow!("Output: error writing interleaved video packet: {e}"))
}

/// Everything the audio side of the pipeline carries between packets.
struct AudioPath {
    stream_index: usize,
    ost_index: usize,
    decoder: codec::decoder::Audio,
    encoder: codec::encoder::Audio,
    resampler: SamplerContext,
    frame_size: usize,
    channels: usize,
    staging: Vec<f32>,
    input_frame: frame::Audio,
    time_base: Rational,
    next_pts: i64,
    done: bool,
}

impl AudioPath {
    fn new(
        job_id: &str,
        stream: &ffmpeg_next::Stream,
        octx: &mut OutputContext,
    ) -> anyhow::Result<Self> {
        let params = stream.parameters();
        let decoder = codec::context::Context::from_parameters(params)?
            .decoder()
            .audio()?;

        let (ost_index, encoder, resampler, frame_size, channels) =
            setup_aac_encoder_and_resampler(job_id, &decoder, octx)?;

        let input_frame = frame::Audio::new(AAC_FRAME_FORMAT, frame_size, AAC_TARGET_LAYOUT);

        Ok(Self {
            stream_index: stream.index(),
            ost_index,
            decoder,
            encoder,
            resampler,
            frame_size,
            channels,
            staging: Vec::new(),
            input_frame,
            time_base: stream.time_base(),
            next_pts: 0,
            done: false,
        })
    }

    /// Decode one demuxed packet and stage every resampled sample that falls
    /// inside the trim window.
    fn ingest_packet(
        &mut self,
        job_id: &str,
        packet: &Packet,
        window: (f64, f64),
        octx: &mut OutputContext,
    ) -> anyhow::Result<()> {
        if self.decoder.send_packet(packet).is_err() {
            warn!(%job_id, "Audio decoder: error sending packet, skipping");
            return Ok(());
        }

        let mut decoded = frame::Audio::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            self.stage_frame(job_id, &decoded, window);
            self.encode_staged(octx)?;
        }
        Ok(())
    }

    fn stage_frame(&mut self, job_id: &str, decoded: &frame::Audio, (start, end): (f64, f64)) {
        if let Some(pts) = decoded.pts() {
            let sec = pts as f64 * q2d(self.time_base);
            if sec < start {
                return;
            }
            if sec >= end {
                self.done = true;
                return;
            }
        }

        let mut resampled = frame::Audio::empty();
        match self.resampler.run(decoded, &mut resampled) {
            Ok(_) if resampled.samples() > 0 => self.push_samples(&resampled),
            Ok(_) => {}
            Err(e) => warn!(%job_id, "Audio resampler: error during run: {e}, dropping frame"),
        }
    }

    fn push_samples(&mut self, resampled: &frame::Audio) {
        let count = resampled.samples() * self.channels;
        let samples = unsafe {
            std::slice::from_raw_parts(resampled.data(0).as_ptr() as *const f32, count)
        };
        self.staging.extend_from_slice(samples);
    }

    /// Drain full encoder frames out of the interleaved staging buffer.
    fn encode_staged(&mut self, octx: &mut OutputContext) -> anyhow::Result<()> {
        while self.staging.len() >= self.frame_size * self.channels {
            self.fill_input_frame(self.frame_size);
            self.staging.drain(0..self.frame_size * self.channels);
            self.send_and_drain(octx)?;
        }
        Ok(())
    }

    /// De-interleave `frames` samples per channel from the head of the
    /// staging buffer into the encoder frame's planes, zero-padding the rest.
    fn fill_input_frame(&mut self, frames: usize) {
        for ch in 0..self.channels {
            let plane = self.input_frame.data_mut(ch);
            let dst = plane.as_mut_ptr() as *mut f32;
            for i in 0..self.frame_size {
                let sample = if i < frames {
                    self.staging[i * self.channels + ch]
                } else {
                    0.0
                };
                unsafe {
                    *dst.add(i) = sample;
                }
            }
        }
        self.input_frame.set_pts(None);
    }

    fn send_and_drain(&mut self, octx: &mut OutputContext) -> anyhow::Result<()> {
        self.encoder
            .send_frame(&self.input_frame)
            .map_err(|e| anyhow!("AAC encoder: failed to send frame: {e}"))?;

        let mut packet = Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(_) => {
                    let duration = if packet.duration() > 0 {
                        packet.duration()
                    } else {
                        self.frame_size as i64
                    };
                    self.emit(&mut packet, duration, octx)?;
                }
                Err(ffmpeg_next::Error::Other { errno })
                    if errno == ffmpeg_next::util::error::EAGAIN =>
                {
                    break;
                }
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => {
                    return Err(anyhow!("AAC encoder: error receiving packet: {e}"));
                }
            }
        }
        Ok(())
    }

    /// Stamp the running PTS onto an encoded packet and write it. The
    /// counter starts at zero, so output timestamps are window-relative no
    /// matter where the trim started.
    fn emit(
        &mut self,
        packet: &mut Packet,
        duration: i64,
        octx: &mut OutputContext,
    ) -> anyhow::Result<()> {
        packet.set_stream(self.ost_index);
        packet.set_pts(Some(self.next_pts));
        packet.set_dts(Some(self.next_pts));
        packet.set_duration(duration);

        let source_tb = Rational::new(1, AAC_TARGET_RATE);
        let target_tb = octx
            .stream(self.ost_index)
            .ok_or_else(|| anyhow!("Missing output stream for index {}", self.ost_index))?
            .time_base();
        packet.rescale_ts(source_tb, target_tb);

        packet
            .write_interleaved(octx)
            .map_err(|e| anyhow!("Output: error writing interleaved audio packet: {e}"))?;
        self.next_pts += duration;
        Ok(())
    }

    /// Drain decoder, resampler and encoder. Frames inside the window are
    /// still encoded; the final partial frame is zero-padded.
    fn flush(
        &mut self,
        job_id: &str,
        window: (f64, f64),
        octx: &mut OutputContext,
    ) -> anyhow::Result<()> {
        debug!(%job_id, "Flushing audio path");

        self.decoder.send_eof()?;
        let mut decoded = frame::Audio::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(_) => self.stage_frame(job_id, &decoded, window),
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => return Err(anyhow!("Audio decoder: error receiving flushed frame: {e}")),
            }
        }

        // Resampler delay: keep running it on an empty frame until dry.
        let empty = frame::Audio::new(self.decoder.format(), 0, self.decoder.channel_layout());
        loop {
            let mut resampled = frame::Audio::empty();
            match self.resampler.run(&empty, &mut resampled) {
                Ok(_) if resampled.samples() > 0 => self.push_samples(&resampled),
                _ => break,
            }
        }

        self.encode_staged(octx)?;

        let leftover = self.staging.len() / self.channels;
        if leftover > 0 {
            debug!(%job_id, leftover, "Padding final partial audio frame");
            self.fill_input_frame(leftover);
            self.staging.clear();
            self.send_and_drain(octx)?;
        }

        self.encoder.send_eof()?;
        let mut packet = Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(_) => {
                    let duration = if packet.duration() > 0 {
                        packet.duration()
                    } else {
                        self.frame_size as i64
                    };
                    self.emit(&mut packet, duration, octx)?;
                }
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => return Err(anyhow!("AAC encoder: error receiving final packet: {e}")),
            }
        }

        debug!(%job_id, "Audio path flushed");
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn flush_video(
    job_id: &str,
    dec_video: &mut codec::decoder::Video,
    scaler: &mut Scaler,
    enc_video: &mut codec::encoder::Video,
    octx: &mut OutputContext,
    in_video_tb: Rational,
    ost_index: usize,
    (start, end): (f64, f64),
    pts_offset: i64,
) -> anyhow::Result<()> {
    debug!(%job_id, "Flushing video path");

    dec_video.send_eof()?;
    let mut decoded = frame::Video::empty();
    let mut scaled = frame::Video::empty();
    loop {
        match dec_video.receive_frame(&mut decoded) {
            Ok(_) => {
                let Some(pts) = decoded.pts() else { continue };
                let sec = pts as f64 * q2d(in_video_tb);
                if sec < start || sec >= end {
                    continue;
                }

                if let Err(e) = scaler.run(&decoded, &mut scaled) {
                    warn!(%job_id, "Video scaler: error during flush: {e}, skipping frame");
                    continue;
                }
                scaled.set_pts(Some(pts - pts_offset));
                if let Err(e) = enc_video.send_frame(&scaled) {
                    warn!(%job_id, "H.264 encoder: error sending flushed frame: {e}, skipping");
                    continue;
                }

                let mut packet = Packet::empty();
                while enc_video.receive_packet(&mut packet).is_ok() {
                    write_video_packet(&mut packet, ost_index, in_video_tb, octx)?;
                }
            }
            Err(ffmpeg_next::Error::Eof) => break,
            Err(e) => {
                return Err(anyhow!("Video decoder: error receiving flushed frame: {e}"));
            }
        }
    }

    enc_video.send_eof()?;
    let mut packet = Packet::empty();
    loop {
        match enc_video.receive_packet(&mut packet) {
            Ok(_) => write_video_packet(&mut packet, ost_index, in_video_tb, octx)?,
            Err(ffmpeg_next::Error::Eof) => break,
            Err(e) => {
                return Err(anyhow!("H.264 encoder: error receiving final packet: {e}"));
            }
        }
    }

    debug!(%job_id, "Video path flushed");
    Ok(())
}

/// Re-encode the `[start, end)` second window of `input` into `output`
/// (H.264/AAC in MP4). The end is clamped to the source duration; the source
/// file is never modified. Blocking, call from a blocking-capable context.
pub fn trim_clip(
    job_id: &str,
    input: &Path,
    output: &Path,
    start: f64,
    end: f64,
) -> anyhow::Result<()> {
    let input_path = input
        .to_str()
        .ok_or_else(|| anyhow!("Input path is not valid UTF-8"))?;
    let output_path = output
        .to_str()
        .ok_or_else(|| anyhow!("Output path is not valid UTF-8"))?;

    let mut ictx =
        format::input(input_path).map_err(|e| anyhow!("Failed to open input video: {e}"))?;

    let duration = (ictx.duration() > 0).then(|| ictx.duration() as f64 / TIME_BASE_US as f64);
    let end = clamp_end(end, duration);
    if end <= start {
        bail!("Trim window is empty: start {start:.3}s is at or past the effective end {end:.3}s");
    }
    debug!(%job_id, ?input, ?output, start, end, ?duration, "Trimming clip");

    let mut octx = format::output_as(output_path, "mp4")
        .map_err(|e| anyhow!("Failed to create output context: {e}"))?;

    let in_video = ictx
        .streams()
        .best(media::Type::Video)
        .ok_or_else(|| anyhow!("Cannot find input video stream"))?;
    let in_video_idx = in_video.index();
    let in_video_tb = in_video.time_base();

    let mut dec_video = codec::context::Context::from_parameters(in_video.parameters())?
        .decoder()
        .video()?;

    let mut scaler = Scaler::get(
        dec_video.format(),
        dec_video.width(),
        dec_video.height(),
        YUV420P,
        dec_video.width(),
        dec_video.height(),
        Flags::BILINEAR,
    )?;

    let (ost_video_idx, mut enc_video) =
        setup_h264_encoder(job_id, &dec_video, &mut octx, &in_video)?;

    // A source without audio yields a video-only clip.
    let mut audio = match ictx.streams().best(media::Type::Audio) {
        Some(stream) => Some(AudioPath::new(job_id, &stream, &mut octx)?),
        None => {
            info!(%job_id, "No audio stream, producing a video-only clip");
            None
        }
    };

    octx.write_header()
        .map_err(|e| anyhow!("Output: failed to write container header: {e}"))?;

    // Land on the keyframe at or before the start; frames before the window
    // are decoded and dropped below.
    if start > 0.0 {
        let seek_ts = (start * TIME_BASE_US as f64) as i64;
        if let Err(error) = ictx.seek(seek_ts, ..seek_ts) {
            warn!(%job_id, %error, "Seek failed, decoding from the top");
        }
    }

    let pts_offset = if q2d(in_video_tb) > 0.0 {
        (start / q2d(in_video_tb)) as i64
    } else {
        0
    };

    let window = (start, end);
    let mut decoded = frame::Video::empty();
    let mut scaled = frame::Video::empty();
    let mut video_done = false;
    let mut last_progress_s = start;

    'demux: for (stream, packet) in ictx.packets() {
        if stream.index() == in_video_idx && !video_done {
            if dec_video.send_packet(&packet).is_err() {
                warn!(%job_id, "Video decoder: error sending packet, skipping");
                continue;
            }
            while dec_video.receive_frame(&mut decoded).is_ok() {
                let Some(pts) = decoded.pts() else { continue };
                let sec = pts as f64 * q2d(in_video_tb);
                if sec < start {
                    continue;
                }
                if sec >= end {
                    video_done = true;
                    break;
                }

                if sec >= last_progress_s + PROGRESS_INTERVAL_S {
                    let percent = ((sec - start) / (end - start) * 100.0).min(100.0);
                    info!(%job_id, "Trim progress: {:.1}% ({:.1}s / {:.1}s)",
                        percent, sec - start, end - start);
                    last_progress_s = sec;
                }

                if scaler.run(&decoded, &mut scaled).is_err() {
                    warn!(%job_id, "Video scaler: error, skipping frame");
                    continue;
                }
                scaled.set_pts(Some(pts - pts_offset));
                if enc_video.send_frame(&scaled).is_err() {
                    warn!(%job_id, "H.264 encoder: error sending frame, skipping");
                    continue;
                }

                let mut encoded = Packet::empty();
                while enc_video.receive_packet(&mut encoded).is_ok() {
                    if let Err(error) =
                        write_video_packet(&mut encoded, ost_video_idx, in_video_tb, &mut octx)
                    {
                        error!(%job_id, ?error, "Failed to write video packet, stopping");
                        break 'demux;
                    }
                }
            }
        } else if let Some(path) = audio.as_mut()
            && stream.index() == path.stream_index
            && !path.done
        {
            path.ingest_packet(job_id, &packet, window, &mut octx)?;
        }

        let audio_done = audio.as_ref().map(|path| path.done).unwrap_or(true);
        if video_done && audio_done {
            debug!(%job_id, "Trim window fully covered, stopping demux");
            break;
        }
    }

    flush_video(
        job_id,
        &mut dec_video,
        &mut scaler,
        &mut enc_video,
        &mut octx,
        in_video_tb,
        ost_video_idx,
        window,
        pts_offset,
    )?;
    if let Some(path) = audio.as_mut() {
        path.flush(job_id, window, &mut octx)?;
    }

    octx.write_trailer()
        .map_err(|e| anyhow!("Output: failed to write trailer: {e}"))?;
    info!(%job_id, ?output, "Trim completed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_is_clamped_to_known_durations() {
        assert_eq!(clamp_end(30.0, Some(20.0)), 20.0);
        assert_eq!(clamp_end(5.0, Some(20.0)), 5.0);
        assert_eq!(clamp_end(30.0, None), 30.0);
    }

    #[test]
    fn clamp_can_empty_the_window() {
        // A start past the duration leaves nothing once the end is clamped;
        // trim_clip reports that as an error rather than guarding up front.
        let start = 12.0;
        let end = clamp_end(30.0, Some(10.0));
        assert!(end <= start);
    }
}
