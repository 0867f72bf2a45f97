// SPDX-License-Identifier: MPL-2.0

//! Unit tests for animation decoding and playback.

#[cfg(test)]
mod tests {
    use std::{
        borrow::Cow,
        io::Cursor,
        path::Path,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
            mpsc,
        },
        thread,
        time::Duration,
    };

    use super::super::{
        AnimatedImage, DecodeError, DecodedFrame, FramePlayer, decode,
        detection::{has_gif_signature, is_gif_file},
    };
    use crate::{
        dispatch::manual::ManualQueue,
        error::Error,
        geometry::{Point, Size},
        gpu::{DrawContext, GraphicsDevice, software::SoftwareDevice},
    };

    const RED: [u8; 4] = [0, 0, 255, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];
    const BLUE: [u8; 4] = [255, 0, 0, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    /// A frame of a generated GIF: rectangle, RGB color, delay in 1/100 s.
    struct FrameDef {
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        rgb: [u8; 3],
        delay: u16,
        transparent: bool,
    }

    fn frame_def(left: u16, top: u16, width: u16, height: u16, rgb: [u8; 3], delay: u16) -> FrameDef {
        FrameDef {
            left,
            top,
            width,
            height,
            rgb,
            delay,
            transparent: false,
        }
    }

    fn gif_bytes(width: u16, height: u16, frames: &[FrameDef]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut out, width, height, &[]).unwrap();
            for frame in frames {
                let mut palette = frame.rgb.to_vec();
                palette.extend_from_slice(&[0, 0, 0]);
                let index = u8::from(frame.transparent);
                let pixels = vec![index; usize::from(frame.width) * usize::from(frame.height)];
                let frame = gif::Frame {
                    left: frame.left,
                    top: frame.top,
                    width: frame.width,
                    height: frame.height,
                    delay: frame.delay,
                    palette: Some(palette),
                    transparent: Some(1),
                    buffer: Cow::Owned(pixels),
                    ..gif::Frame::default()
                };
                encoder.write_frame(&frame).unwrap();
            }
        }
        out
    }

    fn solid_frame(size: Size, color: [u8; 4], delay_ms: u64) -> DecodedFrame {
        DecodedFrame {
            pixels: color.repeat((size.width * size.height) as usize),
            origin: Point::default(),
            size,
            delay: Duration::from_millis(delay_ms),
        }
    }

    fn pixels_of(device: &SoftwareDevice, player: &FramePlayer<SoftwareDevice>) -> Vec<[u8; 4]> {
        let surface = player.surface().unwrap();
        device
            .context()
            .with(|ctx| ctx.read_pixels(&surface))
            .unwrap()
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]])
            .collect()
    }

    fn player_with(
        image: AnimatedImage,
    ) -> (Arc<SoftwareDevice>, Arc<ManualQueue>, FramePlayer<SoftwareDevice>) {
        let device = Arc::new(SoftwareDevice::new());
        let queue = ManualQueue::new();
        let player = FramePlayer::new(Arc::clone(&device), queue.clone());
        player.load(image).unwrap();
        (device, queue, player)
    }

    #[test]
    fn test_is_gif_file() {
        assert!(is_gif_file(Path::new("test.gif")));
        assert!(is_gif_file(Path::new("test.GIF")));
        assert!(is_gif_file(Path::new("/path/to/animation.gif")));
        assert!(!is_gif_file(Path::new("test.mp4")));
        assert!(!is_gif_file(Path::new("test.png")));
        assert!(!is_gif_file(Path::new("gif")));
    }

    #[test]
    fn test_gif_signature() {
        assert!(has_gif_signature(b"GIF89a\x01\x00"));
        assert!(has_gif_signature(b"GIF87a"));
        assert!(!has_gif_signature(b"GIF8"));
        assert!(!has_gif_signature(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn decode_keeps_rects_and_delays() {
        let bytes = gif_bytes(
            4,
            3,
            &[
                frame_def(0, 0, 4, 3, [255, 0, 0], 10),
                frame_def(1, 2, 2, 1, [0, 255, 0], 0),
            ],
        );
        let image = decode(Cursor::new(bytes)).unwrap();

        assert_eq!(image.size(), Size::new(4, 3));
        assert_eq!(image.frame_count(), 2);

        let first = &image.frames()[0];
        assert_eq!(first.delay, Duration::from_millis(100));
        assert_eq!(first.size, Size::new(4, 3));
        assert_eq!(&first.pixels[..4], &RED);

        let second = &image.frames()[1];
        assert_eq!(second.origin, Point::new(1, 2));
        assert_eq!(second.size, Size::new(2, 1));
        assert_eq!(second.delay, Duration::ZERO);
        assert_eq!(second.interval(), Duration::from_millis(100));
        assert_eq!(second.pixels, [GREEN, GREEN].concat());
    }

    #[test]
    fn decode_premultiplies_transparency() {
        let mut frame = frame_def(0, 0, 2, 2, [200, 100, 50], 5);
        frame.transparent = true;
        let image = decode(Cursor::new(gif_bytes(2, 2, &[frame]))).unwrap();
        assert!(image.frames()[0].pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn decode_rejects_empty_animation() {
        let bytes = gif_bytes(4, 4, &[]);
        // Depending on where the trailer is noticed the stream is either
        // reported as frameless or as lacking image data.
        assert!(matches!(
            decode(Cursor::new(bytes)),
            Err(DecodeError::NoFrames | DecodeError::Gif(_))
        ));
    }

    #[test]
    fn decode_rejects_other_formats() {
        assert!(matches!(
            decode(Cursor::new(b"\x89PNG\r\n\x1a\n....".to_vec())),
            Err(DecodeError::NotGif)
        ));
        assert!(matches!(
            decode(Cursor::new(b"GIF".to_vec())),
            Err(DecodeError::NotGif)
        ));
    }

    #[test]
    fn decode_rejects_truncated_stream() {
        let mut bytes = gif_bytes(8, 8, &[frame_def(0, 0, 8, 8, [1, 2, 3], 1)]);
        bytes.truncate(20);
        assert!(decode(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn image_requires_frames() {
        assert!(matches!(
            AnimatedImage::new(Size::new(1, 1), Vec::new()),
            Err(DecodeError::NoFrames)
        ));
        let mut frame = solid_frame(Size::new(2, 2), RED, 0);
        frame.pixels.pop();
        assert!(matches!(
            AnimatedImage::new(Size::new(2, 2), vec![frame]),
            Err(DecodeError::FrameLength { index: 0, .. })
        ));
    }

    #[test]
    fn intervals_follow_frame_delays() {
        let size = Size::new(2, 2);
        let image = AnimatedImage::new(
            size,
            vec![
                solid_frame(size, RED, 0),
                solid_frame(size, GREEN, 200),
                solid_frame(size, BLUE, 0),
            ],
        )
        .unwrap();
        let (_device, queue, player) = player_with(image);

        let timer = queue.latest_timer().unwrap();
        assert!(!timer.is_running(), "load must not start playback");
        // A zero delay on the first frame is floored before playback starts.
        assert_eq!(timer.interval(), Duration::from_millis(100));

        player.play().unwrap();
        let mut seen = vec![player.cursor().unwrap().index];
        for _ in 0..3 {
            assert!(queue.fire());
            seen.push(player.cursor().unwrap().index);
        }

        assert_eq!(seen, [0, 1, 2, 0]);
        assert_eq!(
            timer.starts(),
            [100, 200, 100, 100].map(Duration::from_millis)
        );
        assert!(timer.is_running());
    }

    #[test]
    fn render_target_is_cleared_only_on_wrap() {
        let bytes = gif_bytes(
            3,
            1,
            &[
                frame_def(0, 0, 1, 1, [255, 0, 0], 1),
                frame_def(1, 0, 1, 1, [0, 255, 0], 1),
                frame_def(2, 0, 1, 1, [0, 0, 255], 1),
            ],
        );
        let (device, _queue, player) = player_with(decode(Cursor::new(bytes)).unwrap());

        assert_eq!(pixels_of(&device, &player), [RED, BLACK, BLACK]);
        player.tick().unwrap();
        assert_eq!(pixels_of(&device, &player), [RED, GREEN, BLACK]);
        player.tick().unwrap();
        assert_eq!(pixels_of(&device, &player), [RED, GREEN, BLUE]);
        player.tick().unwrap();
        assert_eq!(pixels_of(&device, &player), [RED, BLACK, BLACK]);
    }

    #[test]
    fn frames_outside_canvas_are_clipped() {
        let size = Size::new(2, 2);
        let mut frame = solid_frame(Size::new(2, 2), GREEN, 10);
        frame.origin = Point::new(1, 1);
        let image = AnimatedImage::new(size, vec![frame]).unwrap();
        let (device, _queue, player) = player_with(image);
        assert_eq!(pixels_of(&device, &player), [BLACK, BLACK, BLACK, GREEN]);
    }

    #[test]
    fn single_frame_animation_keeps_ticking() {
        let size = Size::new(1, 1);
        let image = AnimatedImage::new(size, vec![solid_frame(size, BLUE, 0)]).unwrap();
        let (_device, queue, player) = player_with(image);
        player.play().unwrap();
        for _ in 0..3 {
            assert!(queue.fire());
            assert_eq!(player.cursor().unwrap().index, 0);
        }
        assert!(player.is_playing());
    }

    #[test]
    fn stop_and_resume() {
        let size = Size::new(1, 1);
        let image = AnimatedImage::new(
            size,
            vec![solid_frame(size, RED, 30), solid_frame(size, GREEN, 40)],
        )
        .unwrap();
        let (_device, queue, player) = player_with(image);

        player.play().unwrap();
        player.stop();
        assert!(!player.is_playing());
        assert!(!queue.fire());

        player.play().unwrap();
        assert!(queue.fire());
        assert_eq!(player.cursor().unwrap().index, 1);
    }

    #[test]
    fn play_requires_animation() {
        let player = FramePlayer::new(Arc::new(SoftwareDevice::new()), ManualQueue::new());
        assert!(matches!(player.play(), Err(Error::NotLoaded)));
        assert!(player.size().is_none());
        assert!(player.tick().unwrap().is_none());
    }

    #[test]
    fn load_off_ui_thread_is_rejected() {
        let size = Size::new(1, 1);
        let image = AnimatedImage::new(size, vec![solid_frame(size, RED, 0)]).unwrap();
        let player = FramePlayer::new(Arc::new(SoftwareDevice::new()), ManualQueue::new());

        let remote = player.clone();
        let result = thread::spawn(move || {
            let load = remote.load(image);
            let load_async = remote.load_async(Cursor::new(Vec::new()), |_| {});
            (load, load_async)
        })
        .join()
        .unwrap();

        assert!(matches!(result.0, Err(Error::WrongThread(_))));
        assert!(matches!(result.1, Err(Error::WrongThread(_))));
        assert!(player.size().is_none());
    }

    #[test]
    fn load_async_delivers_on_ui_thread() {
        let bytes = gif_bytes(5, 4, &[frame_def(0, 0, 5, 4, [9, 9, 9], 3)]);
        let queue = ManualQueue::new();
        let player_on_queue = FramePlayer::new(Arc::new(SoftwareDevice::new()), queue.clone());

        let (tx, rx) = mpsc::channel();
        let ui_thread = thread::current().id();
        player_on_queue
            .load_async(Cursor::new(bytes), move |result| {
                tx.send((result.is_ok(), thread::current().id())).unwrap();
            })
            .unwrap();

        assert!(queue.wait_for_task(Duration::from_secs(10)));
        let (ok, thread_id) = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(ok);
        assert_eq!(thread_id, ui_thread);
        assert_eq!(player_on_queue.size(), Some(Size::new(5, 4)));
    }

    #[test]
    fn load_async_reports_decode_failure() {
        let queue = ManualQueue::new();
        let player = FramePlayer::new(Arc::new(SoftwareDevice::new()), queue.clone());
        let (tx, rx) = mpsc::channel();
        player
            .load_async(Cursor::new(b"not a gif".to_vec()), move |result| {
                tx.send(result).unwrap();
            })
            .unwrap();

        assert!(queue.wait_for_task(Duration::from_secs(10)));
        let result = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(result, Err(Error::Decode(DecodeError::NotGif))));
        assert!(player.size().is_none());
    }

    #[test]
    fn stale_timer_ticks_are_ignored() {
        let size = Size::new(1, 1);
        let first = AnimatedImage::new(
            size,
            vec![solid_frame(size, RED, 10), solid_frame(size, GREEN, 10)],
        )
        .unwrap();
        let second = AnimatedImage::new(
            size,
            vec![solid_frame(size, BLUE, 10), solid_frame(size, BLACK, 10)],
        )
        .unwrap();
        let (device, queue, player) = player_with(first);
        player.play().unwrap();
        player.load(second).unwrap();

        assert!(!queue.timers()[0].is_running());
        queue.force_fire(0);
        assert_eq!(player.cursor().unwrap().index, 0);
        assert_eq!(pixels_of(&device, &player), [BLUE]);
        assert!(!queue.latest_timer().unwrap().is_running());
    }

    #[test]
    fn reload_swaps_state_atomically() {
        let size = Size::new(4, 4);
        let palette_a = [[10, 0, 0, 255], [20, 0, 0, 255], [30, 0, 0, 255]];
        let palette_b = [
            [0, 10, 0, 255],
            [0, 20, 0, 255],
            [0, 30, 0, 255],
            [0, 40, 0, 255],
            [0, 50, 0, 255],
        ];
        let build = |palette: &[[u8; 4]]| {
            AnimatedImage::new(
                size,
                palette.iter().map(|c| solid_frame(size, *c, 10)).collect(),
            )
            .unwrap()
        };
        let a = build(&palette_a);
        let b = build(&palette_b);

        let device = Arc::new(SoftwareDevice::new().with_upload_delay(Duration::from_millis(2)));
        let queue = ManualQueue::new();
        let player = FramePlayer::new(device, queue);
        player.load(a.clone()).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let ticker = {
            let player = player.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0;
                while !done.load(Ordering::SeqCst) || observed == 0 {
                    player.tick().unwrap();
                    let (frames, pixels) = player.snapshot().unwrap();
                    let color = [pixels[0], pixels[1], pixels[2], pixels[3]];
                    assert!(pixels.chunks_exact(4).all(|px| px == color));
                    match frames {
                        3 => assert!(palette_a.contains(&color), "{color:?} not from A"),
                        5 => assert!(palette_b.contains(&color), "{color:?} not from B"),
                        other => panic!("unexpected frame count {other}"),
                    }
                    observed += 1;
                }
                observed
            })
        };

        for round in 0..8 {
            let image = if round % 2 == 0 { b.clone() } else { a.clone() };
            player.load(image).unwrap();
        }
        done.store(true, Ordering::SeqCst);

        assert!(ticker.join().unwrap() > 0);
        assert_eq!(player.cursor().unwrap().frame_count, 3);
    }
}
