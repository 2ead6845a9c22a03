//! Incremental link extraction from HTML
//!
//! This module turns a listing page, fed as raw body chunks, into candidate
//! link strings:
//! - `<a href="...">` start tags are the only source of links
//! - Chunks may split tags and UTF-8 sequences anywhere
//! - Nothing beyond the tokenizer's own buffer is kept in memory
//!
//! [`LinkFilter`] then decides which candidates are archive links.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
    TokenizerResult,
};

/// Token sink collecting the `href` of every anchor start tag
#[derive(Debug, Default)]
struct AnchorSink {
    hrefs: Vec<String>,
}

impl TokenSink for AnchorSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if let Token::TagToken(Tag {
            kind: TagKind::StartTag,
            name,
            attrs,
            ..
        }) = token
        {
            if &*name == "a" {
                if let Some(href) = attrs.iter().find(|attr| &*attr.name.local == "href") {
                    self.hrefs.push(href.value.to_string());
                }
            }
        }
        TokenSinkResult::Continue
    }
}

/// Streaming extractor of anchor `href` values
///
/// The extractor is not `Send`; it is meant to live on one thread for the
/// whole page.
pub struct LinkExtractor {
    tokenizer: Tokenizer<AnchorSink>,
    input: BufferQueue,
    /// Trailing bytes of an incomplete UTF-8 sequence from the last chunk
    pending: Vec<u8>,
    finished: bool,
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor {
    /// Creates an extractor for one page
    pub fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(AnchorSink::default(), TokenizerOpts::default()),
            input: BufferQueue::new(),
            pending: Vec::new(),
            finished: false,
        }
    }

    /// Feeds the next body chunk and returns the hrefs completed by it, in
    /// document order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.finished {
            return Vec::new();
        }

        self.pending.extend_from_slice(chunk);
        let text = decode_prefix(&mut self.pending);
        if !text.is_empty() {
            self.input.push_back(StrTendril::from(text));
            self.pump();
        }

        std::mem::take(&mut self.tokenizer.sink.hrefs)
    }

    /// Signals end of input and returns any hrefs still held by the tokenizer
    ///
    /// Further calls to [`feed`](Self::feed) or `finish` return nothing.
    pub fn finish(&mut self) -> Vec<String> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;

        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            self.input.push_back(StrTendril::from(rest));
            self.pump();
        }
        self.tokenizer.end();

        std::mem::take(&mut self.tokenizer.sink.hrefs)
    }
}

impl LinkExtractor {
    /// Runs the tokenizer over everything queued
    fn pump(&mut self) {
        loop {
            match self.tokenizer.feed(&mut self.input) {
                TokenizerResult::Done => break,
                // Only a sink returning `TokenSinkResult::Script` pauses the
                // tokenizer; resume in case the input is not drained
                TokenizerResult::Script(()) => {
                    if self.input.is_empty() {
                        break;
                    }
                }
            }
        }
    }
}

/// Decodes as much of `buf` as forms complete UTF-8, leaving an incomplete
/// trailing sequence in place. Invalid bytes become U+FFFD.
fn decode_prefix(buf: &mut Vec<u8>) -> String {
    let mut out = String::new();
    let mut start = 0;

    loop {
        match std::str::from_utf8(&buf[start..]) {
            Ok(valid) => {
                out.push_str(valid);
                start = buf.len();
                break;
            }
            Err(e) => {
                let valid_end = start + e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&buf[start..valid_end]));
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        start = valid_end + len;
                    }
                    None => {
                        start = valid_end;
                        break;
                    }
                }
            }
        }
    }

    buf.drain(..start);
    out
}

/// Decides which extracted links name archives
///
/// A link is accepted iff it is at least `min_len` bytes long and ends with
/// `suffix`. The length check is a cheap guard against empty and obviously
/// relative hrefs, not a scheme check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFilter {
    min_len: usize,
    suffix: String,
}

impl LinkFilter {
    /// Creates a filter
    pub fn new(min_len: usize, suffix: impl Into<String>) -> Self {
        Self {
            min_len,
            suffix: suffix.into(),
        }
    }

    /// Returns true if `link` should be forwarded to the workers
    pub fn accepts(&self, link: &str) -> bool {
        link.len() >= self.min_len && link.ends_with(&self.suffix)
    }
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::new("http://".len(), ".zip")
    }
}
