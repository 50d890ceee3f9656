mod error;
mod http;
mod remote;

pub use error::RemoteError;
pub use http::HttpRemote;
pub use remote::Remote;
