//! Synthetic 8-bit frames for the demo camera.

/// Simple pseudo-random number generator (LCG) for reproducible noise.
#[inline]
fn prng(seed: u64) -> u64 {
    seed.wrapping_mul(1103515245).wrapping_add(12345) & 0x7fffffff
}

/// Generate one frame of `width` x `height` pixels.
///
/// The frame is a diagonal gradient over the full sensor, so a region of
/// interest starting at `origin` shows the matching part of the full-frame
/// pattern. A bright vertical bar moves one eighth of the width per frame and a
/// little noise varies with `frame_num`.
pub fn generate_test_pattern(width: u32, height: u32, origin: (u32, u32), frame_num: u64) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut buffer = vec![0u8; w * h];
    if w == 0 || h == 0 {
        return buffer;
    }

    let bar_width = (width / 16).max(1);
    let bar_x = ((frame_num * u64::from(width / 8).max(1)) % u64::from(width)) as u32;
    let mut seed = frame_num.wrapping_add(1);

    for y in 0..height {
        for x in 0..width {
            let gx = origin.0 + x;
            let gy = origin.1 + y;
            let mut value = ((gx + gy) / 4 % 200) as u8;
            if x >= bar_x && x < bar_x + bar_width {
                value = value.saturating_add(50);
            }
            seed = prng(seed);
            value = value.saturating_add((seed % 6) as u8);
            buffer[y as usize * w + x as usize] = value;
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_has_requested_size() {
        let frame = generate_test_pattern(64, 32, (0, 0), 1);
        assert_eq!(frame.len(), 64 * 32);
    }

    #[test]
    fn empty_frame_for_zero_size() {
        assert!(generate_test_pattern(0, 16, (0, 0), 0).is_empty());
    }
}
