mod client_id;

pub use client_id::ClientId;
pub use client_id::ClientIdPolicy;
pub use client_id::FALLBACK_CLIENT_ID;
pub use client_id::extract_client_id;
