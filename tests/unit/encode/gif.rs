use super::*;

fn gradient_frames(n: usize) -> Vec<RgbaImage> {
    (0..n)
        .map(|i| {
            RgbaImage::from_fn(64, 48, |x, y| {
                Rgba([(x * 4) as u8, (y * 5) as u8, (i * 40) as u8, 255])
            })
        })
        .collect()
}

fn encode(frames: &[RgbaImage], options: &EncodeOptions) -> (Vec<u8>, Vec<f64>) {
    let job = EncodeJob {
        frames,
        frame_delay_ms: 42,
        options,
    };
    let mut progress = Vec::new();
    let bytes = GifEncoder::new()
        .encode(&job, &mut |p| progress.push(p), &CancelToken::new())
        .unwrap();
    (bytes, progress)
}

fn decode(bytes: &[u8]) -> Vec<::gif::Frame<'static>> {
    let mut opts = ::gif::DecodeOptions::new();
    opts.set_color_output(::gif::ColorOutput::Indexed);
    let mut decoder = opts.read_info(bytes).unwrap();
    let mut out = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        out.push(frame.clone());
    }
    out
}

#[test]
fn delay_rounds_to_centiseconds() {
    assert_eq!(delay_centis(42), 4);
    assert_eq!(delay_centis(45), 5);
    assert_eq!(delay_centis(100), 10);
    assert_eq!(delay_centis(0), 1);
    assert_eq!(delay_centis(u32::MAX), u16::MAX);
}

#[test]
fn shared_palette_frames_carry_no_local_table() {
    let frames = gradient_frames(5);
    let (bytes, progress) = encode(&frames, &EncodeOptions::default());

    let decoded = decode(&bytes);
    assert_eq!(decoded.len(), 5);
    assert!(decoded.iter().all(|f| f.palette.is_none()));
    assert!(decoded.iter().all(|f| f.delay == 4));
    assert!(decoded.iter().all(|f| (f.width, f.height) == (64, 48)));

    assert_eq!(progress.last().copied(), Some(1.0));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn per_frame_palettes_when_not_shared() {
    let opts = EncodeOptions {
        global_palette: false,
        workers: 3,
        ..EncodeOptions::default()
    };
    let (bytes, progress) = encode(&gradient_frames(4), &opts);
    let decoded = decode(&bytes);
    assert_eq!(decoded.len(), 4);
    assert!(decoded.iter().all(|f| f.palette.is_some()));
    // chunks of 3 then 1
    assert_eq!(progress, vec![0.75, 1.0]);
}

#[test]
fn transparency_key_tracks_the_background() {
    let frames = vec![RgbaImage::from_pixel(32, 32, Rgba([255, 255, 255, 255])); 2];
    let opts = EncodeOptions {
        transparent: true,
        ..EncodeOptions::default()
    };
    let (bytes, _) = encode(&frames, &opts);
    let decoded = decode(&bytes);
    let key = decoded[0].transparent.unwrap();
    assert!(decoded[0].buffer.iter().all(|&i| i == key));
}

#[test]
fn dithering_still_produces_every_frame() {
    let opts = EncodeOptions {
        dither: true,
        quality: 30,
        ..EncodeOptions::default()
    };
    let (bytes, _) = encode(&gradient_frames(3), &opts);
    assert_eq!(decode(&bytes).len(), 3);
}

#[test]
fn dithering_single_column_frames_maps_directly() {
    let frames: Vec<RgbaImage> = (0..3)
        .map(|i| {
            RgbaImage::from_fn(1, 5, |_, y| Rgba([(y * 50) as u8, 20, (i * 60) as u8, 255]))
        })
        .collect();
    for global_palette in [true, false] {
        let opts = EncodeOptions {
            dither: true,
            global_palette,
            ..EncodeOptions::default()
        };
        let (bytes, _) = encode(&frames, &opts);
        let decoded = decode(&bytes);
        assert_eq!(decoded.len(), 3);
        assert!(decoded.iter().all(|f| (f.width, f.height) == (1, 5)));
    }

    let single = vec![RgbaImage::from_pixel(1, 1, Rgba([9, 9, 9, 255])); 3];
    let opts = EncodeOptions {
        dither: true,
        ..EncodeOptions::default()
    };
    assert_eq!(decode(&encode(&single, &opts).0).len(), 3);
}

#[test]
fn cancellation_aborts() {
    let frames = gradient_frames(3);
    let options = EncodeOptions::default();
    let job = EncodeJob {
        frames: &frames,
        frame_delay_ms: 42,
        options: &options,
    };
    let cancel = CancelToken::new();
    cancel.cancel();
    let out = GifEncoder::new().encode(&job, &mut |_| {}, &cancel);
    assert!(matches!(out, Err(EncodeFailure::Aborted)));
}

#[test]
fn oversized_frames_fail() {
    let frames = vec![RgbaImage::new(70_000, 1)];
    let options = EncodeOptions::default();
    let job = EncodeJob {
        frames: &frames,
        frame_delay_ms: 42,
        options: &options,
    };
    let out = GifEncoder::new().encode(&job, &mut |_| {}, &CancelToken::new());
    assert!(matches!(out, Err(EncodeFailure::Failed(_))));
}
