/// Splitting a requested time range into bounded API windows
use time::{Duration, OffsetDateTime};

use crate::models::{Chunk, TimeRange};

/// Iterator over contiguous, non-overlapping windows of at most
/// `max_chunk` covering `[start, end)`. The last window is clamped to `end`.
///
/// An inverted range or a zero-length window yields nothing.
#[derive(Debug, Clone)]
pub struct Chunks {
    cursor: OffsetDateTime,
    end: OffsetDateTime,
    max_chunk: Duration,
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.cursor >= self.end || self.max_chunk <= Duration::ZERO {
            return None;
        }

        // Past the representable range means past `end`
        let chunk_end = self
            .cursor
            .checked_add(self.max_chunk)
            .map_or(self.end, |e| e.min(self.end));
        let chunk = Chunk {
            start: self.cursor,
            end: chunk_end,
        };
        self.cursor = chunk_end;
        Some(chunk)
    }
}

impl std::iter::FusedIterator for Chunks {}

/// Chunk `[start, end)` into windows of `max_chunk_days` days.
pub fn chunk_range(start: OffsetDateTime, end: OffsetDateTime, max_chunk_days: u32) -> Chunks {
    Chunks {
        cursor: start,
        end,
        max_chunk: Duration::days(i64::from(max_chunk_days)),
    }
}

impl TimeRange {
    /// Fresh chunk sequence over this range; call again to restart.
    pub fn chunks(&self, max_chunk_days: u32) -> Chunks {
        chunk_range(self.start, self.end, max_chunk_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn assert_covers(start: OffsetDateTime, end: OffsetDateTime, days: u32) {
        let chunks: Vec<Chunk> = chunk_range(start, end, days).collect();
        assert!(!chunks.is_empty());
        assert_eq!(chunks.first().unwrap().start, start);
        assert_eq!(chunks.last().unwrap().end, end);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for chunk in &chunks {
            assert!(chunk.start < chunk.end);
            assert!(chunk.end - chunk.start <= Duration::days(days as i64));
            assert!(chunk.end <= end);
        }
    }

    #[test]
    fn test_exact_multiple() {
        let start = datetime!(2024-11-24 00:00 UTC);
        let end = datetime!(2024-12-04 00:00 UTC);
        let chunks: Vec<Chunk> = chunk_range(start, end, 5).collect();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].end, datetime!(2024-11-29 00:00 UTC));
        assert_covers(start, end, 5);
    }

    #[test]
    fn test_last_chunk_is_clamped() {
        let start = datetime!(2025-01-28 00:00 UTC);
        let end = datetime!(2025-02-08 06:30 UTC);
        let chunks: Vec<Chunk> = chunk_range(start, end, 5).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].start, datetime!(2025-02-07 00:00 UTC));
        assert_eq!(chunks[2].end, end);
        assert_covers(start, end, 5);
    }

    #[test]
    fn test_range_shorter_than_chunk() {
        let start = datetime!(2024-11-24 00:00 UTC);
        let end = datetime!(2024-11-24 12:00 UTC);
        let chunks: Vec<Chunk> = chunk_range(start, end, 5).collect();
        assert_eq!(chunks, vec![Chunk { start, end }]);
    }

    #[test]
    fn test_inverted_or_empty_range_yields_nothing() {
        let t = datetime!(2024-11-24 00:00 UTC);
        assert_eq!(chunk_range(t, t, 5).count(), 0);
        assert_eq!(chunk_range(t + Duration::days(1), t, 5).count(), 0);
        assert_eq!(chunk_range(t, t + Duration::days(1), 0).count(), 0);
    }

    #[test]
    fn test_oversized_chunk_is_one_window() {
        let start = datetime!(2024-11-24 00:00 UTC);
        let end = datetime!(2024-12-24 00:00 UTC);
        let chunks: Vec<Chunk> = chunk_range(start, end, 4_000_000).collect();
        assert_eq!(chunks, vec![Chunk { start, end }]);
        assert_eq!(chunk_range(start, end, u32::MAX).count(), 1);
    }

    #[test]
    fn test_chunks_are_restartable() {
        let range = TimeRange::new(
            datetime!(2024-11-24 00:00 UTC),
            datetime!(2024-12-10 00:00 UTC),
        )
        .unwrap();

        let first: Vec<Chunk> = range.chunks(3).collect();
        let second: Vec<Chunk> = range.chunks(3).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
        for days in 1..=7 {
            assert_covers(range.start, range.end, days);
        }
    }
}
