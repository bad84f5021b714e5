/// Application constants

pub const API_VERSION: &str = "v1";

// Storage gateway
pub const DEFAULT_IPFS_GATEWAY_URL: &str = "https://ipfs.io/ipfs";
pub const IPFS_SCHEME_PREFIX: &str = "ipfs://";
pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 4;

// Unpinned metadata CIDs can hang forever on the gateway.
pub const DEFAULT_METADATA_TIMEOUT_MS: u64 = 2_000;
