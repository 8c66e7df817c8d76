mod handlers;
mod server;
#[cfg(test)]
mod tests;

pub use handlers::{StubDetectRequest, NO_HAND_MESSAGE, NO_IMAGE_MESSAGE};
pub use server::{router, serve, StubServer, StubState};
