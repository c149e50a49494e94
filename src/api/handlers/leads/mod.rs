//! Lead capture: meeting requests and data-room access requests.
//!
//! Both are stateless creates against their own tables, validated before any
//! database work. Sign-in is optional; when a session is present the created
//! row is attributed to the user. A data-room request without the NDA
//! acknowledgement is rejected before anything is persisted.

pub mod data_room;
pub mod meeting;
pub(crate) mod storage;
pub(crate) mod types;

/// Configuration shared by the lead endpoints.
#[derive(Clone, Debug)]
pub struct LeadsConfig {
    scheduling_url: Option<String>,
}

impl LeadsConfig {
    #[must_use]
    pub fn new(scheduling_url: Option<String>) -> Self {
        Self { scheduling_url }
    }

    /// External scheduling page opened alongside a saved meeting request.
    pub(super) fn scheduling_url(&self) -> Option<&str> {
        self.scheduling_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::LeadsConfig;

    #[test]
    fn scheduling_url_is_optional() {
        assert_eq!(LeadsConfig::new(None).scheduling_url(), None);
        assert_eq!(
            LeadsConfig::new(Some("https://cal.example/vitrino".to_string())).scheduling_url(),
            Some("https://cal.example/vitrino")
        );
    }
}
