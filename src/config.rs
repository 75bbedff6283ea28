use log::Level;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_SCRIPT_ID: &str = "interactivity-config";

pub const MOBILE_MENU_BUTTON_ID: &str = "mobile-menu-btn";
pub const MOBILE_MENU_CLOSE_ID: &str = "mobile-menu-close";
pub const MOBILE_MENU_ID: &str = "mobile-menu";
pub const MENU_ICON_ID: &str = "menu-icon";
pub const CLOSE_ICON_ID: &str = "close-icon";

pub const COUNTDOWN_HOST_ID: &str = "countdown-timer";
pub const COUNTDOWN_DATE_ATTRIBUTE: &str = "data-target-date";
/// Server-rendered display fields; they may sit anywhere in the page.
pub const COUNTDOWN_FIELD_IDS: [&str; 4] = ["days", "hours", "minutes", "seconds"];

pub const STICKY_CTA_ID: &str = "sticky-cta";

#[cfg(debug_assertions)]
pub fn log_level() -> Level {
    Level::Debug // Verbose console output while developing locally
}

#[cfg(not(debug_assertions))]
pub fn log_level() -> Level {
    Level::Info
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed interactivity config: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid interactivity config: {0}")]
    Invalid(String),
}

/// Tunables for the page enhancements. Every field may be overridden by the
/// optional `<script type="application/json" id="interactivity-config">` block.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Attribute marking links that must pass through the disclaimer dialog.
    pub redirect_attribute: String,
    /// Seconds the confirm button stays locked after the dialog opens.
    pub confirm_seconds: u32,
    pub countdown_tick_ms: u32,
    /// Delay after the frame's load event before probing its document.
    pub frame_grace_ms: u32,
    /// Delay after opening the viewer before a frame that never loaded is
    /// considered blocked.
    pub frame_timeout_ms: u32,
    pub sticky_cta_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redirect_attribute: "data-cta-redirect".to_string(),
            confirm_seconds: 3,
            countdown_tick_ms: 1_000,
            frame_grace_ms: 1_000,
            frame_timeout_ms: 5_000,
            sticky_cta_threshold: 300.0,
        }
    }
}

impl Settings {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.redirect_attribute.trim().is_empty() {
            return Err(ConfigError::Invalid("redirectAttribute must not be empty".to_string()));
        }
        if self.countdown_tick_ms == 0 {
            return Err(ConfigError::Invalid("countdownTickMs must be positive".to_string()));
        }
        if self.frame_timeout_ms < self.frame_grace_ms {
            return Err(ConfigError::Invalid(
                "frameTimeoutMs must not be shorter than frameGraceMs".to_string(),
            ));
        }
        if !self.sticky_cta_threshold.is_finite() || self.sticky_cta_threshold < 0.0 {
            return Err(ConfigError::Invalid("stickyCtaThreshold must be a non-negative number".to_string()));
        }
        Ok(())
    }

    /// CSS selector matching every link gated by the disclaimer dialog.
    pub fn redirect_selector(&self) -> String {
        format!("a[{}]", self.redirect_attribute)
    }

    /// Reads the page-provided config block, falling back to defaults when it is
    /// absent or unusable.
    pub fn load(document: &web_sys::Document) -> Self {
        let Some(raw) = document
            .get_element_by_id(CONFIG_SCRIPT_ID)
            .and_then(|element| element.text_content())
        else {
            return Self::default();
        };

        match Self::from_json(&raw) {
            Ok(settings) => {
                log::debug!("Loaded interactivity config: {:?}", settings);
                settings
            }
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }
}
