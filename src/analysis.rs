use crate::render::PixelView;

/// Average color of the image's one-pixel border ring, used for the "auto" background.
/// Interior pixels are ignored; each channel is averaged independently (truncating)
/// and clamped to [0, 255].
pub fn border_average_color(view: PixelView<'_>) -> [u8; 3] {
    profiling::scope!("border_average_color");
    let (w, h) = (view.width, view.height);
    if w == 0 || h == 0 {
        return [0, 0, 0];
    }

    let mut sum = [0u64; 3];
    let mut count = 0u64;
    let mut add = |x: u32, y: u32| {
        let i = view.index(x, y);
        sum[0] += view.data[i] as u64;
        sum[1] += view.data[i + 1] as u64;
        sum[2] += view.data[i + 2] as u64;
        count += 1;
    };

    // top and bottom rows, then the left/right columns between them
    for x in 0..w {
        add(x, 0);
        if h > 1 {
            add(x, h - 1);
        }
    }
    for y in 1..h.saturating_sub(1) {
        add(0, y);
        if w > 1 {
            add(w - 1, y);
        }
    }

    sum.map(|s| (s / count).min(255) as u8)
}
