//! Mock pair indicator that records every color it is set to.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::traits::Indicator;
use crate::types::LedColor;

/// Mock LED for testing pair indication.
#[derive(Debug)]
pub struct MockIndicator {
    history: Arc<Mutex<Vec<LedColor>>>,
}

impl MockIndicator {
    /// Create an indicator and the handle that observes it.
    pub fn new() -> (Self, MockIndicatorHandle) {
        let history = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                history: Arc::clone(&history),
            },
            MockIndicatorHandle { history },
        )
    }
}

impl Indicator for MockIndicator {
    async fn set_color(&mut self, color: LedColor) -> Result<()> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(color);
        Ok(())
    }
}

/// Read side of a [`MockIndicator`].
#[derive(Debug, Clone)]
pub struct MockIndicatorHandle {
    history: Arc<Mutex<Vec<LedColor>>>,
}

impl MockIndicatorHandle {
    /// Last color set, `Off` if never set.
    pub fn current(&self) -> LedColor {
        self.history()
            .last()
            .copied()
            .unwrap_or(LedColor::Off)
    }

    /// Every color set, oldest first.
    pub fn history(&self) -> Vec<LedColor> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
