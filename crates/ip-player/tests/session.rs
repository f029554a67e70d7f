use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, ImageFormat, Rgba, RgbaImage};
use ip_core::config::PlayerConfig;
use ip_core::{LayerFormat, ResultCode};
use ip_player::{ImagePlayer, Session};
use ip_render::{MemorySink, MemoryZoom, SinkLog, ZoomLog};
use ip_transform::ScaleDirection;

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(w, h, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn gif(w: u32, h: u32, frames: u8) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut enc = GifEncoder::new(&mut out);
        enc.set_repeat(Repeat::Infinite).unwrap();
        for i in 0..frames {
            let buf = RgbaImage::from_pixel(w, h, Rgba([i * 60, 0, 0, 255]));
            enc.encode_frame(Frame::from_parts(buf, 0, 0, Delay::from_numer_denom_ms(10, 1)))
                .unwrap();
        }
    }
    out
}

struct Fixture {
    session: Session,
    sink: Arc<Mutex<SinkLog>>,
    zoom: Arc<Mutex<ZoomLog>>,
}

fn fixture(config: PlayerConfig) -> Fixture {
    let sink = MemorySink::new();
    let zoom = MemoryZoom::new(100);
    let (sink_log, zoom_log) = (sink.log(), zoom.log());
    let mut session = Session::from_config(config, Box::new(sink), Box::new(zoom));
    assert_eq!(session.init(), ResultCode::Ok);
    Fixture {
        session,
        sink: sink_log,
        zoom: zoom_log,
    }
}

fn hd() -> PlayerConfig {
    PlayerConfig {
        surface_width: 1920,
        surface_height: 1080,
        ..PlayerConfig::default()
    }
}

/// 1000×600 source on a 1920×1080 surface, started.
fn started_hd() -> Fixture {
    let mut f = fixture(hd());
    assert_eq!(
        f.session.set_data_source_memory(Some("photo.png".into()), png(1000, 600)),
        ResultCode::Ok
    );
    assert_eq!(f.session.start(), ResultCode::Ok);
    f
}

#[test]
fn start_shows_the_image_unchanged_when_it_fits() {
    let f = started_hd();
    assert_eq!(f.session.image().unwrap().dimensions(), (1000, 600));
    let log = f.sink.lock().unwrap();
    let last = log.last().unwrap();
    assert_eq!((last.format, last.width, last.height), (LayerFormat::Rgba, 1000, 600));
    assert_eq!(log.posts, 2);
}

#[test]
fn scale_by_two_is_cropped_to_the_surface() {
    let mut f = started_hd();
    assert_eq!(f.session.set_scale(2.0, 2.0, false), ResultCode::Ok);
    let state = f.session.state();
    assert_eq!(state.extent(), Some((2000, 1200)));
    assert_eq!(state.displayed().unwrap().dimensions(), (1920, 1080));
    assert_eq!(state.direction(), ScaleDirection::Up);
    let last = f.sink.lock().unwrap().last().cloned().unwrap();
    assert_eq!((last.width, last.height), (1920, 1080));
    // Ligne 0 du rendu = ligne 60 de l'image ×2, colonne 0 = colonne 40
    let src = f.session.state().scaled().unwrap().pixel_rgba(0, 0);
    assert_eq!(&last.data[..4], &src);
}

#[test]
fn rotate_by_ninety_swaps_the_sides() {
    let mut f = started_hd();
    assert_eq!(f.session.set_rotate(90.0, false), ResultCode::Ok);
    assert_eq!(f.session.state().displayed().unwrap().dimensions(), (600, 1000));
}

#[test]
fn rotation_resets_scale_and_pan() {
    let mut f = started_hd();
    f.session.set_scale(2.0, 2.0, false);
    f.session.set_translate(25.0, 0.0);
    f.session.set_rotate(0.0, false);
    let state = f.session.state();
    assert_eq!(state.step(), 1.0);
    assert_eq!(state.direction(), ScaleDirection::Normal);
    assert_eq!(state.pan().offset, (0, 0));
    assert!(state.scaled().is_none());
    // A fresh scale behaves as from NORMAL
    assert_eq!(f.session.set_scale(2.0, 2.0, false), ResultCode::Ok);
    assert_eq!(f.session.state().extent(), Some((2000, 1200)));
}

#[test]
fn pan_clamps_at_the_margin() {
    let mut f = started_hd();
    f.session.set_scale(2.0, 2.0, false);
    // Marge horizontale : (2000 - 1920) / 2 = 40
    assert_eq!(f.session.set_translate(30.0, 0.0), ResultCode::Ok);
    assert_eq!(f.session.state().pan().offset, (30, 0));
    assert!(!f.session.state().pan().edges.right);

    assert_eq!(f.session.set_translate(30.0, 0.0), ResultCode::Ok);
    assert_eq!(f.session.state().pan().offset, (40, 0));
    assert!(f.session.state().pan().edges.right);

    let posts = f.sink.lock().unwrap().posts;
    assert_eq!(f.session.set_translate(30.0, 0.0), ResultCode::Ok);
    assert_eq!(f.session.state().pan().offset, (40, 0));
    assert_eq!(f.sink.lock().unwrap().posts, posts);

    // L'autre sens libère le bord
    assert_eq!(f.session.set_translate(-10.0, 0.0), ResultCode::Ok);
    assert_eq!(f.session.state().pan().offset, (30, 0));
    assert!(!f.session.state().pan().edges.right);
}

#[test]
fn rejected_scale_keeps_the_pan() {
    let mut f = started_hd();
    f.session.set_scale(2.0, 2.0, false);
    assert_eq!(f.session.set_translate(30.0, 0.0), ResultCode::Ok);
    let pan = f.session.state().pan();
    let posts = f.sink.lock().unwrap().posts;

    // 2 × 16 dépasse la limite
    assert_eq!(f.session.set_scale(16.0, 16.0, false), ResultCode::ErrInvalidOperation);
    assert_eq!(f.session.state().pan(), pan);
    assert_eq!(f.session.state().step(), 2.0);
    assert_eq!(f.sink.lock().unwrap().posts, posts);

    // Le pan reprend là où il était
    assert_eq!(f.session.set_translate(5.0, 0.0), ResultCode::Ok);
    assert_eq!(f.session.state().pan().offset, (35, 0));
}

#[test]
fn translate_without_scale_is_invalid() {
    let mut f = started_hd();
    assert_eq!(f.session.set_translate(10.0, 0.0), ResultCode::ErrInvalidOperation);
}

#[test]
fn scale_limits() {
    let mut f = started_hd();
    assert_eq!(f.session.set_scale(17.0, 17.0, false), ResultCode::ErrInvalidOperation);
    assert_eq!(f.session.set_scale(0.0, 0.0, false), ResultCode::ErrParameter);
    assert_eq!(f.session.set_scale(8.0, 8.0, false), ResultCode::Ok);
    assert_eq!(f.session.set_scale(4.0, 4.0, false), ResultCode::ErrInvalidOperation);
    assert_eq!(f.session.state().step(), 8.0);
}

#[test]
fn non_uniform_scale_is_one_shot() {
    let mut f = started_hd();
    assert_eq!(f.session.set_scale(1.5, 0.5, false), ResultCode::Ok);
    assert!(f.session.state().scaled().is_none());
    let last = f.sink.lock().unwrap().last().cloned().unwrap();
    assert_eq!((last.width, last.height), (1500, 300));
}

#[test]
fn rotate_scale_from_identity() {
    let mut f = started_hd();
    assert_eq!(f.session.set_rotate_scale(90.0, 0.5, 0.5, false), ResultCode::Ok);
    let state = f.session.state();
    assert_eq!(state.displayed().unwrap().dimensions(), (300, 500));
    assert_eq!(state.step(), 0.5);
    assert_eq!(state.direction(), ScaleDirection::Down);
}

#[test]
fn hw_scale_codes() {
    let mut f = started_hd();
    assert_eq!(f.session.set_hw_scale(2.0), ResultCode::Ok);
    assert_eq!(f.zoom.lock().unwrap().value, 200);
    assert_eq!(f.session.set_hw_scale(2.0), ResultCode::OkScaleMax);
    assert_eq!(f.zoom.lock().unwrap().value, 300);
    assert_eq!(f.session.set_hw_scale(0.01), ResultCode::OkScaleMin);
    assert_eq!(f.zoom.lock().unwrap().value, 26);
    f.zoom.lock().unwrap().offline = true;
    assert_eq!(f.session.set_hw_scale(1.0), ResultCode::ErrInvalidOperation);
}

#[test]
fn post_resets_the_hardware_zoom() {
    let mut f = started_hd();
    f.session.set_hw_scale(2.0);
    f.session.set_scale(2.0, 2.0, false);
    assert_eq!(f.zoom.lock().unwrap().value, 100);
}

#[test]
fn crop_rect_renders_rgb() {
    let mut f = started_hd();
    assert_eq!(f.session.set_crop_rect(10, 20, 30, 40), ResultCode::Ok);
    let last = f.sink.lock().unwrap().last().cloned().unwrap();
    assert_eq!((last.format, last.width, last.height), (LayerFormat::Rgb, 30, 40));
    assert_eq!(&last.data[..3], &[10, 20, 40]);
    assert_eq!(f.session.set_crop_rect(990, 0, 20, 20), ResultCode::ErrParameter);
}

#[test]
fn unsupported_sources_are_rejected() {
    let mut f = fixture(hd());
    assert_eq!(f.session.set_data_source("ftp://host/a.png"), ResultCode::ErrInvalidOperation);
    assert_eq!(
        f.session.set_data_source_memory(Some("notes.txt".into()), png(4, 4)),
        ResultCode::ErrInvalidOperation
    );
    assert_eq!(
        f.session.set_data_source_memory(Some("a.jpg".into()), b"garbage".to_vec()),
        ResultCode::ErrInvalidOperation
    );
    assert!(f.session.source().is_none());
    assert_eq!(f.session.prepare(), ResultCode::ErrBadValue);
}

#[test]
fn oversized_image_is_no_memory() {
    let mut f = fixture(PlayerConfig {
        max_picture_size: 500,
        ..hd()
    });
    f.session.set_data_source_memory(Some("big.png".into()), png(600, 10));
    assert_eq!(f.session.prepare(), ResultCode::ErrNoMemory);
    assert!(f.session.image().is_none());
}

#[test]
fn corrupt_stream_after_probe_is_a_decoder_error() {
    let mut f = fixture(hd());
    let mut bytes = png(64, 64);
    bytes.truncate(bytes.len() / 2);
    assert_eq!(f.session.set_data_source_memory(Some("cut.png".into()), bytes), ResultCode::Ok);
    assert_eq!(f.session.prepare(), ResultCode::ErrDecoder);
}

#[test]
fn file_source_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pic.png");
    std::fs::write(&path, png(32, 16)).unwrap();
    let mut f = fixture(hd());
    let uri = format!("file://{}", path.display());
    assert_eq!(f.session.set_data_source(&uri), ResultCode::Ok);
    assert_eq!(f.session.probe().map(|p| (p.width, p.height)), Some((32, 16)));
    assert_eq!(f.session.start(), ResultCode::Ok);
}

#[test]
fn large_image_is_fit_to_the_surface() {
    let mut f = fixture(PlayerConfig {
        surface_width: 320,
        surface_height: 240,
        ..PlayerConfig::default()
    });
    f.session.set_data_source_memory(Some("wide.png".into()), png(1280, 480));
    assert_eq!(f.session.start(), ResultCode::Ok);
    assert_eq!(f.session.image().unwrap().dimensions(), (320, 120));
}

#[test]
fn double_buffering() {
    let mut f = started_hd();
    assert_eq!(f.session.show_buf(), ResultCode::ErrBadValue);
    let dir = tempfile::tempdir().unwrap();
    let next = dir.path().join("next.png");
    std::fs::write(&next, png(3000, 300)).unwrap();
    assert_eq!(f.session.prepare_buf(next.to_str().unwrap()), ResultCode::Ok);
    // Le buffer ne remplace pas l'image courante avant show_buf
    assert_eq!(f.session.image().unwrap().dimensions(), (1000, 600));
    assert_eq!(f.session.show_buf(), ResultCode::Ok);
    assert_eq!(f.session.image().unwrap().dimensions(), (1920, 192));
    let last = f.sink.lock().unwrap().last().cloned().unwrap();
    assert_eq!((last.width, last.height), (1920, 192));
}

#[test]
fn animated_gif_plays_frame_by_frame() {
    let mut f = fixture(hd());
    f.session.set_data_source_memory(Some("anim.gif".into()), gif(8, 6, 3));
    assert_eq!(f.session.prepare(), ResultCode::Ok);
    assert!(f.session.is_movie());
    assert!(f.session.image().is_none());
    let before = f.sink.lock().unwrap().posts;
    for _ in 0..4 {
        assert_eq!(f.session.movie_tick(), ResultCode::Ok);
    }
    assert_eq!(f.sink.lock().unwrap().posts, before + 4);
    // 4 frames sur 3 : retour au début puis frame 1
    assert_eq!(f.session.movie().unwrap().index(), 1);
}

#[test]
fn movie_transforms_apply_per_frame() {
    let mut f = fixture(hd());
    f.session.set_data_source_memory(Some("anim.gif".into()), gif(8, 6, 2));
    f.session.prepare();
    assert_eq!(f.session.set_scale(2.0, 2.0, false), ResultCode::Ok);
    assert_eq!(f.session.set_translate(5.0, 5.0), ResultCode::Ok);
    f.session.movie_tick();
    let last = f.sink.lock().unwrap().last().cloned().unwrap();
    assert_eq!((last.width, last.height), (16, 12));

    assert_eq!(f.session.set_rotate(90.0, false), ResultCode::Ok);
    assert_eq!(f.session.movie().unwrap().scale(), 1.0);
    f.session.movie_tick();
    let last = f.sink.lock().unwrap().last().cloned().unwrap();
    assert_eq!((last.width, last.height), (6, 8));
    assert_eq!(f.session.movie().unwrap().last_frame().unwrap().dimensions(), (6, 8));
}

#[test]
fn dump_writes_report_and_bitmaps() {
    let mut f = started_hd();
    f.session.set_scale(2.0, 2.0, false);
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("state");
    let report = f.session.dump(&prefix).unwrap();
    assert_eq!((report.width, report.height), (1000, 600));
    assert_eq!(report.image, Some((1000, 600)));
    assert!(prefix.exists());
    assert!(dir.path().join("state_scale.bmp").exists());
    assert!(!dir.path().join("state_buf.bmp").exists());
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["step"], 2.0);
    assert_eq!(json["sink"], "memory");
    assert!(report.to_string().contains("1000×600"));
}

fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn player_runs_and_stops_the_movie_worker() {
    let sink = MemorySink::new();
    let log = sink.log();
    let config = PlayerConfig {
        frame_interval_ms: 10,
        ..hd()
    };
    let session = Session::from_config(config, Box::new(sink), Box::new(MemoryZoom::default()));
    let mut player = ImagePlayer::new(session);
    assert_eq!(player.init(), ResultCode::Ok);
    player.set_data_source_memory(Some("anim.gif".into()), gif(4, 4, 2));
    assert_eq!(player.start(), ResultCode::Ok);
    assert!(player.is_playing());
    assert!(wait_for(Duration::from_secs(5), || log.lock().unwrap().posts >= 4));

    // Rotation pendant la lecture : le worker continue
    assert_eq!(player.set_rotate(90.0, false), ResultCode::Ok);
    assert!(player.is_playing());

    assert_eq!(player.release(), ResultCode::Ok);
    assert!(!player.is_playing());
    let posts = log.lock().unwrap().posts;
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(log.lock().unwrap().posts, posts);
    assert!(player.with_session(|s| s.movie().is_none()));
}

#[test]
fn player_still_image_has_no_worker() {
    let sink = MemorySink::new();
    let session = Session::from_config(hd(), Box::new(sink), Box::new(MemoryZoom::default()));
    let mut player = ImagePlayer::new(session);
    player.init();
    player.set_data_source_memory(Some("a.png".into()), png(10, 10));
    assert_eq!(player.start(), ResultCode::Ok);
    assert!(!player.is_playing());
    assert_eq!(player.set_scale(2.0, 2.0, false), ResultCode::Ok);
    assert_eq!(
        player.with_session(|s| s.state().displayed().map(ip_core::Bitmap::dimensions)),
        Some((20, 20))
    );
}
