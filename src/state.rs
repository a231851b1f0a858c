use std::sync::Arc;

use chrono::Duration;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::database::RecordStore;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::services::{
    AuditLogger, CategoryService, LandingPages, NewsService, PartnerService, SegmentService, SessionService,
    StaticContent, TestimonialService, TranslationResolver, UserService,
};

/// Shared handles for every request. Built once at startup; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RecordStore>,
    pub tokens: Arc<TokenIssuer>,
    pub rate_limiter: Arc<RateLimiter>,
    pub audit: AuditLogger,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn RecordStore>, rate_limiter: Arc<RateLimiter>) -> Self {
        let tokens = Arc::new(TokenIssuer::new(
            &config.security.jwt_secret,
            config.security.jwt_expiry_hours,
        ));
        let audit = AuditLogger::new(store.clone());
        Self {
            config: Arc::new(config),
            store,
            tokens,
            rate_limiter,
            audit,
        }
    }

    pub fn login_limit(&self) -> RateLimitConfig {
        RateLimitConfig::new(
            self.config.rate_limit.login_requests,
            Duration::seconds(self.config.rate_limit.login_window_secs as i64),
        )
    }

    pub fn translations(&self) -> TranslationResolver {
        TranslationResolver::new(
            self.store.clone(),
            StaticContent::new(&self.config.content.static_dir),
            self.audit.clone(),
        )
    }

    pub fn categories(&self) -> CategoryService {
        CategoryService::new(self.store.clone(), self.audit.clone())
    }

    pub fn news(&self) -> NewsService {
        NewsService::new(self.store.clone(), self.audit.clone())
    }

    pub fn partners(&self) -> PartnerService {
        PartnerService::new(self.store.clone(), self.audit.clone())
    }

    pub fn testimonials(&self) -> TestimonialService {
        TestimonialService::new(self.store.clone(), self.audit.clone())
    }

    pub fn segments(&self) -> SegmentService {
        SegmentService::new(self.store.clone(), self.audit.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.store.clone(), self.audit.clone(), self.config.security.password_cost)
    }

    pub fn sessions(&self) -> SessionService {
        SessionService::new(self.users(), self.audit.clone(), self.tokens.clone())
    }

    pub fn landing_pages(&self) -> LandingPages {
        LandingPages::new(&self.config.content.landing_dir, self.audit.clone())
    }
}
