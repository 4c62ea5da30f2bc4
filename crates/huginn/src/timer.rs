/// A stopwatch driven by the elapsed time of each cycle instead of the wall clock, so replaying a
/// recording reproduces the same transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleTimer {
    elapsed_seconds: f32,
}

impl CycleTimer {
    pub fn restart(&mut self) {
        self.elapsed_seconds = 0.0;
    }

    pub fn advance(&mut self, dt_in_seconds: f32) {
        self.elapsed_seconds += dt_in_seconds.max(0.0);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed_seconds * 1000.0
    }
}
