//! Title normalization for `save`.

use crate::{Call, CallContext, Interceptor, RepositoryResult};
use async_trait::async_trait;
use tracing::info;

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || c == '-' || c == '_'
}

fn is_word_break(c: char) -> bool {
    c == ' ' || c == '-' || c == '_'
}

/// Normalizes a banner title.
///
/// Characters other than ASCII letters, digits, whitespace, `-` and `_` are
/// dropped, whitespace runs collapse to a single space, the ends are
/// trimmed, and every word is title-cased. A word starts after a space, a
/// `-` or a `_`. Applying it twice gives the same result as applying it once.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title.chars().filter(|c| is_allowed(*c)).collect();
    let collapsed = kept.split_ascii_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = String::with_capacity(collapsed.len());
    let mut word_start = true;
    for c in collapsed.chars() {
        if word_start {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        word_start = is_word_break(c);
    }
    out
}

/// Before `save`: rewrites the title with [`sanitize_title`].
#[derive(Debug, Default)]
pub struct TitleSanitizer;

impl TitleSanitizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Interceptor for TitleSanitizer {
    fn name(&self) -> &str {
        "title_sanitizer"
    }

    async fn before(&self, _ctx: &CallContext, call: Call) -> RepositoryResult<Call> {
        let mut banner = match call {
            Call::Save(banner) => banner,
            other => return Ok(other),
        };
        let sanitized = sanitize_title(&banner.title);
        if sanitized != banner.title {
            info!(
                original = %banner.title,
                sanitized = %sanitized,
                "[SANITIZATION] Banner title sanitized"
            );
            banner.title = sanitized;
        }
        Ok(Call::Save(banner))
    }
}
