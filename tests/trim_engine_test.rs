//! Engine round-trip tests against a synthesized source clip.

use ffmpeg_next::format::Pixel::YUV420P;
use ffmpeg_next::{Dictionary, Packet, Rational, codec, format, frame};
use std::path::{Path, PathBuf};
use video_trimmer::trim::trim_clip;

const FPS: i32 = 25;

/// Encode `seconds` of black 320x240 H.264 video into an MP4 at `path`.
fn make_black_mp4(path: &Path, seconds: i64) -> anyhow::Result<()> {
    ffmpeg_next::init()?;

    let mut octx = format::output(path.to_str().unwrap())?;

    let h264 = codec::encoder::find(codec::Id::H264)
        .ok_or_else(|| anyhow::anyhow!("H.264 encoder not available"))?;
    let mut enc_config = codec::Context::new_with_codec(h264).encoder().video()?;
    enc_config.set_flags(codec::Flags::GLOBAL_HEADER);
    enc_config.set_format(YUV420P);
    enc_config.set_width(320);
    enc_config.set_height(240);
    enc_config.set_time_base(Rational::new(1, FPS));
    enc_config.set_frame_rate(Some(Rational::new(FPS, 1)));

    let mut opts = Dictionary::new();
    opts.set("preset", "ultrafast");
    opts.set("crf", "30");
    let mut encoder = enc_config.open_with(opts)?;

    let mut ost = octx.add_stream(h264.id())?;
    ost.set_parameters(&encoder);
    ost.set_time_base(Rational::new(1, FPS));
    let ost_index = ost.index();

    octx.write_header()?;

    let mut black = frame::Video::new(YUV420P, 320, 240);
    black.data_mut(0).fill(16);
    black.data_mut(1).fill(128);
    black.data_mut(2).fill(128);

    let mut packet = Packet::empty();
    let write_pending = |encoder: &mut codec::encoder::Video,
                             octx: &mut format::context::Output,
                             packet: &mut Packet|
     -> anyhow::Result<()> {
        while encoder.receive_packet(packet).is_ok() {
            packet.set_stream(ost_index);
            let target_tb = octx.stream(ost_index).unwrap().time_base();
            packet.rescale_ts(Rational::new(1, FPS), target_tb);
            packet.write_interleaved(octx)?;
        }
        Ok(())
    };

    for i in 0..(seconds * FPS as i64) {
        black.set_pts(Some(i));
        encoder.send_frame(&black)?;
        write_pending(&mut encoder, &mut octx, &mut packet)?;
    }

    encoder.send_eof()?;
    loop {
        match encoder.receive_packet(&mut packet) {
            Ok(_) => {
                packet.set_stream(ost_index);
                let target_tb = octx.stream(ost_index).unwrap().time_base();
                packet.rescale_ts(Rational::new(1, FPS), target_tb);
                packet.write_interleaved(&mut octx)?;
            }
            Err(ffmpeg_next::Error::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    octx.write_trailer()?;
    Ok(())
}

fn probe_duration_secs(path: &Path) -> f64 {
    let ictx = format::input(path.to_str().unwrap()).expect("output should open");
    ictx.duration() as f64 / 1_000_000.0
}

fn scratch_dir() -> PathBuf {
    let dir = PathBuf::from(format!("/tmp/trimmer-engine-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn trimming_the_first_five_seconds_yields_a_five_second_clip() {
    let dir = scratch_dir();
    let source = dir.join("source.mp4");
    let output = dir.join("clip_CUT_1.mp4");
    make_black_mp4(&source, 10).expect("source synthesis failed");

    trim_clip("roundtrip", &source, &output, 0.0, 5.0).expect("trim failed");

    let duration = probe_duration_secs(&output);
    assert!(
        (duration - 5.0).abs() <= 1.0,
        "expected ~5s clip, got {duration:.2}s"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn an_end_past_the_source_is_clamped_to_its_duration() {
    let dir = scratch_dir();
    let source = dir.join("source.mp4");
    let output = dir.join("clip_CUT_2.mp4");
    make_black_mp4(&source, 10).expect("source synthesis failed");

    // [2, 30) on a 10s source trims [2, 10).
    trim_clip("clamped", &source, &output, 2.0, 30.0).expect("trim failed");

    let duration = probe_duration_secs(&output);
    assert!(
        (duration - 8.0).abs() <= 1.0,
        "expected ~8s clip, got {duration:.2}s"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn a_start_past_the_source_is_an_engine_error() {
    let dir = scratch_dir();
    let source = dir.join("source.mp4");
    let output = dir.join("clip_CUT_3.mp4");
    make_black_mp4(&source, 10).expect("source synthesis failed");

    let result = trim_clip("empty-window", &source, &output, 15.0, 30.0);
    assert!(result.is_err());
    assert!(!output.exists());

    let _ = std::fs::remove_dir_all(&dir);
}
