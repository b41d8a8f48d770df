/// Input lines longer than this many bytes, newline included, are rejected.
pub const DEFAULT_MAX_LINE_LEN: usize = 2048;

/// Lines must hold fewer items than this. Words and `&` count once each; a
/// redirection operator and its file name count once together.
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// Runtime knobs for one interpreter instance. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Written before every read, without a trailing newline.
    pub prompt: String,
    pub max_line_len: usize,
    pub max_tokens: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: ":".to_string(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}
