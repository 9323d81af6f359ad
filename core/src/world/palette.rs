//! Fixed 10-color headset palette, reused as a pop/push pool (§3, §5).
//! Guarded by `mapMutex` alongside the rest of the connection table —
//! see `session::table::ConnectionTable`.

/// 10 visually distinct colors (Okabe-Ito-adjacent categorical
/// palette), `0xRRGGBB`.
const PALETTE: [u32; 10] = [
    0xe6194b, 0x3cb44b, 0xffe119, 0x4363d8, 0xf58231, 0x911eb4, 0x46f0f0, 0xf032e6, 0xbcf60c,
    0xfabebe,
];

#[derive(Debug)]
pub struct ColorPalette {
    available: Vec<u32>,
}

impl ColorPalette {
    pub fn new() -> Self {
        let mut available: Vec<u32> = PALETTE.to_vec();
        available.reverse(); // pop() hands out PALETTE[0] first
        ColorPalette { available }
    }

    pub fn capacity(&self) -> usize {
        PALETTE.len()
    }

    /// `None` once all 10 colors are in use.
    pub fn acquire(&mut self) -> Option<u32> {
        self.available.pop()
    }

    pub fn release(&mut self, color: u32) {
        debug_assert!(PALETTE.contains(&color), "releasing a color outside the palette");
        self.available.push(color);
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        ColorPalette::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_bounded_and_disjoint() {
        let mut pool = ColorPalette::new();
        let mut taken = Vec::new();
        while let Some(c) = pool.acquire() {
            assert!(!taken.contains(&c));
            taken.push(c);
        }
        assert_eq!(taken.len(), 10);
        assert!(pool.acquire().is_none());

        pool.release(taken.pop().unwrap());
        assert_eq!(pool.available_count(), 1);
        assert!(pool.acquire().is_some());
    }
}
