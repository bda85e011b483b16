// marker
pub const MARK_SENTINEL_TEXT: &str = "*/                            %%% // gitdiff marker";
pub const ALPHABET_SIZE: usize = 1 + i8::MAX as usize;

// git
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
pub const PAST_COMMIT_LIMIT: usize = 30;
pub const UNKNOWN_BRANCH: &str = "<UNKNOWN>";
