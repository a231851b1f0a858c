pub mod audit;
pub mod audited;
pub mod categories;
pub mod error;
pub mod landing_pages;
pub mod localized;
pub mod news;
pub mod partners;
pub mod segments;
pub mod sessions;
pub mod static_content;
pub mod testimonials;
pub mod translations;
pub mod users;
pub mod validation;

pub use audit::{AuditAction, AuditEntry, AuditFilter, AuditLogger, AuditOutcome, Audited};
pub use categories::CategoryService;
pub use error::{ServiceError, ServiceResult};
pub use landing_pages::LandingPages;
pub use news::NewsService;
pub use partners::PartnerService;
pub use segments::SegmentService;
pub use sessions::SessionService;
pub use static_content::StaticContent;
pub use testimonials::TestimonialService;
pub use translations::TranslationResolver;
pub use users::UserService;
