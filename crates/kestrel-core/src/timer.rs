//! Explicit elapsed-time accumulators, advanced by `Editor::tick`.

/// Seconds since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Timer {
    elapsed: f32,
}

impl Timer {
    #[must_use]
    pub const fn new() -> Self {
        Self { elapsed: 0.0 }
    }

    /// Advance by `dt` seconds. Negative steps are ignored.
    pub fn tick(&mut self, dt: f32) {
        if dt > 0.0 {
            self.elapsed += dt;
        }
    }

    pub const fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    #[inline]
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_resets() {
        let mut t = Timer::new();
        t.tick(0.25);
        t.tick(0.5);
        assert!((t.elapsed() - 0.75).abs() < f32::EPSILON);
        t.tick(-1.0);
        assert!((t.elapsed() - 0.75).abs() < f32::EPSILON);
        t.reset();
        assert!(t.elapsed().abs() < f32::EPSILON);
    }
}
