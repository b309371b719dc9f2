//! Whole-buffer squared difference over RGB (alpha skipped).
//! This is the full O(P) recomputation; the optimizer only needs it once per run
//! and relies on the incremental bbox-scoped change afterwards.

use rayon::prelude::*;

use crate::render::PixelView;

#[inline(always)]
fn squared_rgb(t: &[u8], c: &[u8]) -> u64 {
    let dr = t[0] as i64 - c[0] as i64;
    let dg = t[1] as i64 - c[1] as i64;
    let db = t[2] as i64 - c[2] as i64;
    (dr * dr + dg * dg + db * db) as u64
}

/// parallel sum of squared RGB differences. both buffers must be RGBA8 of equal length
pub fn squared_difference(target_rgba: &[u8], current_rgba: &[u8]) -> f64 {
    profiling::scope!("squared_difference");
    debug_assert_eq!(target_rgba.len(), current_rgba.len());
    debug_assert_eq!(target_rgba.len() % 4, 0);

    // minimum chunk: 64K pixels per rayon task, so small images stay effectively sequential
    const MIN_CHUNK_BYTES: usize = 256 * 1024;
    let total: u64 = target_rgba
        .par_chunks(MIN_CHUNK_BYTES)
        .zip(current_rgba.par_chunks(MIN_CHUNK_BYTES))
        .map(|(t_chunk, c_chunk)| {
            t_chunk
                .chunks_exact(4)
                .zip(c_chunk.chunks_exact(4))
                .map(|(t, c)| squared_rgb(t, c))
                .sum::<u64>()
        })
        .sum();

    total as f64
}

/// squared difference between two surfaces' readbacks
#[inline]
pub fn pixel_difference(target: PixelView<'_>, current: PixelView<'_>) -> f64 {
    debug_assert_eq!((target.width, target.height), (current.width, current.height));
    squared_difference(target.data, current.data)
}

/// squared difference over the half-open rect [x0, x1) x [y0, y1) of two same-sized buffers
pub fn squared_difference_rect(
    target: PixelView<'_>,
    current: PixelView<'_>,
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
) -> f64 {
    profiling::scope!("squared_difference_rect");
    let mut sum = 0u64;
    for y in y0..y1 {
        let start = target.index(x0, y);
        let end = target.index(x1, y);
        sum += target.data[start..end]
            .chunks_exact(4)
            .zip(current.data[start..end].chunks_exact(4))
            .map(|(t, c)| squared_rgb(t, c))
            .sum::<u64>();
    }
    sum as f64
}
