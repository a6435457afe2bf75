// Identity: who is on the other end of a chat request.
// Resolution is request-scoped; nothing here keeps state between requests.

pub mod resolver;
pub mod session_token;

pub use resolver::{resolve, StructuredUser, UserIdentity};
pub use session_token::{decode as decode_session_token, PageContext};
