pub mod extract;
pub mod response;
pub mod session;

pub use extract::{JsonBody, PathParam, QueryParams};
pub use response::{ApiResponse, ApiResult};
pub use session::{forwarded_for, Authenticated, Session};
