pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Prefix byte of every canonical encoding; bump when the layout changes.
pub const ENCODING_VERSION: u8 = 1;
/// Leading zero hex digits required of a mined block hash.
pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const DEFAULT_MINING_REWARD: u64 = 100;
/// 2017-01-01T00:00:00Z in milliseconds.
pub const GENESIS_TIMESTAMP: u64 = 1_483_228_800_000;
pub const GENESIS_DATA: &str = "Genesis Block";
