pub mod clock;
pub mod cloud_storage;
pub mod http;
pub mod oauth;
pub mod session;
pub mod token;

pub use cloud_storage::WorkDriveService;
pub use oauth::OAuthService;
pub use session::FileSessionStore;
pub use token::{TokenProvider, ZohoTokenCache};
