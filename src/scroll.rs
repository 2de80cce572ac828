use crate::feed::SessionToken;

pub const DEFAULT_THRESHOLD: f64 = 800.0;

/// Viewport geometry reported on each scroll notification, in display units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_offset: f64,
    pub viewport_height: f64,
    pub content_height: f64,
}

impl Viewport {
    pub fn distance_from_bottom(&self) -> f64 {
        (self.content_height - (self.scroll_offset + self.viewport_height)).max(0.0)
    }
}

/// Near-bottom listener. Armed for at most one session at a time.
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    threshold: f64,
    registration: Option<SessionToken>,
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ScrollTrigger {
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_finite() && threshold >= 0.0 {
            threshold
        } else {
            DEFAULT_THRESHOLD
        };
        Self {
            threshold,
            registration: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn register(&mut self, token: SessionToken) {
        self.registration = Some(token);
    }

    pub fn unregister(&mut self) {
        self.registration = None;
    }

    pub fn registrations(&self) -> usize {
        usize::from(self.registration.is_some())
    }

    pub fn registered_for(&self) -> Option<SessionToken> {
        self.registration
    }

    /// True when a registered listener should request the next page.
    pub fn fires(&self, viewport: Viewport) -> bool {
        self.registration.is_some() && viewport.distance_from_bottom() < self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(offset: f64, content: f64) -> Viewport {
        Viewport {
            scroll_offset: offset,
            viewport_height: 600.0,
            content_height: content,
        }
    }

    #[test]
    fn unregistered_never_fires() {
        let trigger = ScrollTrigger::default();
        assert!(!trigger.fires(viewport(0.0, 0.0)));
    }

    #[test]
    fn fires_within_threshold() {
        let mut trigger = ScrollTrigger::default();
        trigger.register(1);
        assert!(!trigger.fires(viewport(0.0, 3000.0)));
        assert!(trigger.fires(viewport(1700.0, 3000.0)));
        assert!(trigger.fires(viewport(0.0, 500.0)));
    }

    #[test]
    fn register_replaces_previous() {
        let mut trigger = ScrollTrigger::new(100.0);
        trigger.register(1);
        trigger.register(2);
        assert_eq!(trigger.registrations(), 1);
        assert_eq!(trigger.registered_for(), Some(2));
        trigger.unregister();
        trigger.unregister();
        assert_eq!(trigger.registrations(), 0);
    }

    #[test]
    fn bad_threshold_falls_back() {
        assert_eq!(ScrollTrigger::new(f64::NAN).threshold(), DEFAULT_THRESHOLD);
        assert_eq!(ScrollTrigger::new(-1.0).threshold(), DEFAULT_THRESHOLD);
    }
}
