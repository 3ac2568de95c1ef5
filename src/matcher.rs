use heapless::Vec;

/// Max. length of a response token in bytes
pub const MAX_TOKEN_LEN: usize = 32;

/// Incremental substring matcher for response tokens
///
/// Bytes get fed one by one as they arrive from the modem. The matcher only tracks how many leading
/// token bytes are currently matched, so tokens split across several reads are detected without
/// rescanning the accumulated response.
#[derive(Clone, Debug, Default)]
pub struct TokenMatcher {
    /// Token to look for. An empty token never matches.
    token: Vec<u8, MAX_TOKEN_LEN>,

    /// Count of leading token bytes matched by the most recent input
    progress: usize,

    /// True once the full token was seen
    matched: bool,
}

impl TokenMatcher {
    /// Creates a new matcher. Returns None if the token exceeds [MAX_TOKEN_LEN].
    pub fn new(token: &[u8]) -> Option<Self> {
        Some(Self {
            token: Vec::from_slice(token).ok()?,
            progress: 0,
            matched: false,
        })
    }

    /// Feeds the next received byte. Returns true if the token has been seen so far.
    pub fn feed(&mut self, byte: u8) -> bool {
        if self.matched || self.token.is_empty() {
            return self.matched;
        }

        self.progress = self.next_progress(byte);
        if self.progress == self.token.len() {
            self.matched = true;
        }

        self.matched
    }

    /// True if the token was found in the input fed so far
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    /// Forgets all input, the token is kept
    pub fn reset(&mut self) {
        self.progress = 0;
        self.matched = false;
    }

    /// Length of the longest token prefix which is a suffix of the input including the given byte
    fn next_progress(&self, byte: u8) -> usize {
        if self.token[self.progress] == byte {
            return self.progress + 1;
        }

        // Fall back to shorter candidates, e.g. "OOK" still matches "OK"
        let seen = &self.token[..self.progress];
        for length in (1..=self.progress).rev() {
            let prefix = &self.token[..length];
            if prefix[length - 1] == byte && prefix[..length - 1] == seen[seen.len() - (length - 1)..] {
                return length;
            }
        }

        0
    }
}

/// Returns the position of the first occurrence of the token in the given bytes
pub fn find(haystack: &[u8], token: &[u8]) -> Option<usize> {
    let mut matcher = TokenMatcher::new(token)?;

    haystack
        .iter()
        .position(|byte| matcher.feed(*byte))
        .map(|end| end + 1 - token.len())
}
