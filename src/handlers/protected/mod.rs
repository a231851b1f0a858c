// handlers/protected/mod.rs - Admin panel endpoints (any authenticated role)
//
// Route Prefix: /api/admin/* plus /api/auth/{logout,me}
// Writes go through the audited services; a dropped audit entry never fails the request.

pub mod catalog;
pub mod landing;
pub mod news;
pub mod session;
pub mod testimonials;
pub mod translations;
