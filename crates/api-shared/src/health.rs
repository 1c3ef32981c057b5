use crate::dto::HealthRes;

/// Health check shared by the server binary and its tests.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Reports that the service is up. No storage round trip is made.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "BannerShare is alive".into(),
        }
    }
}
