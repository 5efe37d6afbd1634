use std::time::Instant;

/// Guard that logs the elapsed time of a generation stage when dropped.
///
/// ```ignore
/// let _t = Timed::debug("relax points");
/// // ... work ...
/// // logs "relax points: 1.234ms"
/// ```
pub struct Timed {
    name: &'static str,
    start: Instant,
    level: log::Level,
}

impl Timed {
    pub fn info(name: &'static str) -> Self {
        Self::new(name, log::Level::Info)
    }

    pub fn debug(name: &'static str) -> Self {
        Self::new(name, log::Level::Debug)
    }

    fn new(name: &'static str, level: log::Level) -> Self {
        log::trace!("{}...", name);
        Self {
            name,
            start: Instant::now(),
            level,
        }
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        log::log!(self.level, "{}: {:.3?}", self.name, self.start.elapsed());
    }
}
