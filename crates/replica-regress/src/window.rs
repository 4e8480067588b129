//! Rolling window layout.
//!
//! Window `i` covers rows `i * frequency ..= i * frequency + sample_length`, so
//! each window holds `sample_length + 1` observations and consecutive windows
//! overlap unless `frequency > sample_length`.

/// Row range of one rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Position of the window in the rolling sequence
    pub index: usize,
    /// First row (inclusive)
    pub start: usize,
    /// Last row (inclusive)
    pub end: usize,
}

impl Window {
    /// Number of rows in the window.
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: a window holds at least one row.
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Number of windows for `n` rows: `floor((n - sample_length) / frequency)`,
/// zero when `n <= sample_length` or `frequency == 0`.
pub const fn window_count(n: usize, sample_length: usize, frequency: usize) -> usize {
    if frequency == 0 {
        0
    } else {
        n.saturating_sub(sample_length) / frequency
    }
}

/// Iterator over the windows of a series.
#[derive(Debug, Clone)]
pub struct RollingWindows {
    sample_length: usize,
    frequency: usize,
    next: usize,
    count: usize,
}

impl RollingWindows {
    /// Windows over `n` rows.
    pub const fn new(n: usize, sample_length: usize, frequency: usize) -> Self {
        Self {
            sample_length,
            frequency,
            next: 0,
            count: window_count(n, sample_length, frequency),
        }
    }
}

impl Iterator for RollingWindows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let start = index * self.frequency;
        Some(Window {
            index,
            start,
            end: start + self.sample_length,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RollingWindows {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_count() {
        assert_eq!(window_count(100, 52, 13), 3);
        assert_eq!(window_count(10, 4, 2), 3);
        assert_eq!(window_count(5, 5, 1), 0);
        assert_eq!(window_count(3, 5, 1), 0);
        assert_eq!(window_count(10, 4, 0), 0);
    }

    #[test]
    fn test_windows_are_inclusive() {
        let windows: Vec<_> = RollingWindows::new(10, 4, 2).collect();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], Window { index: 0, start: 0, end: 4 });
        assert_eq!(windows[2], Window { index: 2, start: 4, end: 8 });
        assert_eq!(windows[0].len(), 5);
    }

    #[test]
    fn test_last_window_stays_in_range() {
        for n in 1..40 {
            for length in 0..8 {
                for frequency in 1..6 {
                    if let Some(last) = RollingWindows::new(n, length, frequency).last() {
                        assert!(last.end < n);
                    }
                }
            }
        }
    }

    #[test]
    fn test_exact_size() {
        let windows = RollingWindows::new(100, 52, 13);
        assert_eq!(windows.len(), 3);
    }
}
