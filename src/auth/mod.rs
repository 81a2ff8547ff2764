mod credential;
pub mod der;
mod jwt;

pub use credential::ServiceAccountCredential;
pub use jwt::{JwtSigner, TOKEN_URL};
