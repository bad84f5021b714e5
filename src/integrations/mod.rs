pub mod storage;

pub use storage::{ContentFetcher, FetchOptions, FetchResponse, GatewayFetcher};
