//! Replays an already complete text as a timed stream of small chunks.

use futures::stream::Stream;
use std::time::Duration;

/// Split `text` into chunks of `chars_per_chunk` chars, sleeping `delay`
/// between consecutive chunks.
pub fn replay_chunks(
    text: String,
    chars_per_chunk: usize,
    delay: Duration,
) -> impl Stream<Item = String> + Send + 'static {
    let chars_per_chunk = chars_per_chunk.max(1);

    async_stream::stream! {
        let mut buf = String::new();
        let mut count = 0usize;
        let mut emitted = false;

        for ch in text.chars() {
            buf.push(ch);
            count += 1;

            if count == chars_per_chunk {
                if emitted && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield std::mem::take(&mut buf);
                emitted = true;
                count = 0;
            }
        }

        if !buf.is_empty() {
            if emitted && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            yield buf;
        }
    }
}

/// One chunk per character.
pub fn replay_chars(text: String, delay: Duration) -> impl Stream<Item = String> + Send + 'static {
    replay_chunks(text, 1, delay)
}

/// SSE data lines cannot carry carriage returns.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
