use anyhow::Result;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, Rgb, RgbImage};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use cube_vision::{
    CaptureConfig, CaptureLoop, ColorClass, DetectionStore, FrameSource, StreamSource,
};

fn scene_jpeg() -> Vec<u8> {
    let mut image = RgbImage::from_pixel(320, 240, Rgb([128, 128, 128]));
    for y in 60..140 {
        for x in 80..180 {
            image.put_pixel(x, y, Rgb([0, 0, 255]));
        }
    }
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 95)
        .encode(image.as_raw(), 320, 240, ExtendedColorType::Rgb8)
        .expect("encode jpeg");
    bytes
}

/// Serve one connection with `content_type` and the given body parts, then close.
fn serve_once(content_type: &'static str, parts: Vec<Vec<u8>>) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind camera stub");
    let addr = listener.local_addr().expect("camera stub addr");
    let join = std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let header = format!("HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nConnection: close\r\n\r\n");
        let _ = stream.write_all(header.as_bytes());
        for part in parts {
            let _ = stream.write_all(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
            let _ = stream.write_all(&part);
            let _ = stream.write_all(b"\r\n");
        }
    });
    (addr, join)
}

#[test]
fn reads_frames_from_mjpeg_stream_until_it_ends() -> Result<()> {
    let jpeg = scene_jpeg();
    let (addr, server) = serve_once(
        "multipart/x-mixed-replace; boundary=frame",
        vec![jpeg.clone(), jpeg],
    );

    let mut source = StreamSource::new(format!("http://{addr}/video"));
    source.open()?;
    let first = source.read_frame()?;
    assert_eq!((first.width(), first.height()), (320, 240));
    source.read_frame()?;
    assert!(source.read_frame().is_err());

    server.join().expect("camera stub thread");
    Ok(())
}

#[test]
fn open_fails_when_camera_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("reserve port");
    let addr = listener.local_addr().expect("reserved addr");
    drop(listener);

    let mut source = StreamSource::new(format!("http://{addr}/video"));
    assert!(source.open().is_err());
}

#[test]
fn capture_loop_detects_colors_from_live_stream() -> Result<()> {
    let (addr, server) = serve_once(
        "multipart/x-mixed-replace; boundary=frame",
        vec![scene_jpeg()],
    );

    let store = Arc::new(DetectionStore::new());
    let cfg = CaptureConfig {
        throttle: Duration::from_millis(2),
        retry_delay: Duration::from_millis(2),
        ..CaptureConfig::default()
    };
    let source = StreamSource::new(format!("http://{addr}/video"));
    let handle = CaptureLoop::new(cfg, Box::new(source), store.clone()).spawn()?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.stats().frames_processed == 0 {
        assert!(Instant::now() < deadline, "no frame processed within 5s");
        std::thread::sleep(Duration::from_millis(2));
    }

    // The stream has ended after one frame; reads now fail and keep the set empty.
    while handle.stats().read_failures == 0 {
        assert!(Instant::now() < deadline, "stream end not observed within 5s");
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(store.snapshot().is_empty());
    assert_eq!(handle.stats().frames_processed, 1);

    assert!(handle.stop(Duration::from_secs(5))?);
    server.join().expect("camera stub thread");
    Ok(())
}

#[test]
fn upscaled_stream_frame_reports_blue_region() -> Result<()> {
    let (addr, server) = serve_once(
        "multipart/x-mixed-replace; boundary=frame",
        vec![scene_jpeg()],
    );

    let mut source = StreamSource::new(format!("http://{addr}/video"));
    source.open()?;
    let frame = source.read_frame()?.into_resized(640, 480);
    let detections = cube_vision::detect_colors(&frame);
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].color, ColorClass::Blue);
    // 100x80 block doubled to about 200x160, plus the dilation margin.
    assert!((detections[0].width as i64 - 204).abs() <= 6);
    assert!((detections[0].height as i64 - 164).abs() <= 6);

    server.join().expect("camera stub thread");
    Ok(())
}
