use smallvec::SmallVec;
use std::fmt::{self, Write as _};

/// A set of characters, stored as sorted, non-overlapping inclusive ranges.
///
/// Ranges are normalized on construction, so two sets containing the same
/// characters always render (and therefore intern) identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharSet {
    ranges: SmallVec<[(char, char); 4]>,
    invert: bool,
}

impl CharSet {
    /// Create a character set from inclusive ranges
    #[must_use]
    pub fn new(ranges: impl IntoIterator<Item = (char, char)>) -> Self {
        let mut ranges: SmallVec<[(char, char); 4]> = ranges
            .into_iter()
            .map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
            .collect();
        ranges.sort_unstable();

        let mut merged: SmallVec<[(char, char); 4]> = SmallVec::with_capacity(ranges.len());
        for (start, end) in ranges {
            if let Some(last) = merged.last_mut()
                && (start <= last.1 || next_char(last.1) == Some(start))
            {
                last.1 = last.1.max(end);
                continue;
            }
            merged.push((start, end));
        }

        Self {
            ranges: merged,
            invert: false,
        }
    }

    /// A set holding exactly the given characters
    #[must_use]
    pub fn of(chars: &str) -> Self {
        Self::new(chars.chars().map(|c| (c, c)))
    }

    /// A set holding one character
    #[must_use]
    pub fn single(c: char) -> Self {
        Self::new([(c, c)])
    }

    /// A set holding one inclusive range
    #[must_use]
    pub fn range(start: char, end: char) -> Self {
        Self::new([(start, end)])
    }

    /// `[0-9]`
    #[must_use]
    pub fn digits() -> Self {
        Self::range('0', '9')
    }

    /// Space, tab, carriage return and newline
    #[must_use]
    pub fn whitespace() -> Self {
        Self::of(" \t\r\n")
    }

    /// Matches any character
    #[must_use]
    pub fn any() -> Self {
        Self::new([]).inverted()
    }

    /// Union of two sets. Inversion is taken from `self`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut set = Self::new(self.ranges.iter().chain(other.ranges.iter()).copied());
        set.invert = self.invert;
        set
    }

    /// The complement of this set
    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }

    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        self.invert
    }

    /// Check if a character is matched by this set
    #[must_use]
    pub fn matches(&self, c: char) -> bool {
        let found = self
            .ranges
            .binary_search_by(|&(start, end)| {
                if end < c {
                    std::cmp::Ordering::Less
                } else if start > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok();
        found != self.invert
    }

    /// Pick a member of the set, `n` selecting which one.
    ///
    /// Inverted sets are sampled from printable ASCII.
    pub(crate) fn sample(&self, n: u64) -> Option<char> {
        if self.invert {
            const PRINTABLE: u64 = 95;
            return (0..PRINTABLE)
                .filter_map(|k| char::from_u32(u32::from(' ') + ((n + k) % PRINTABLE) as u32))
                .find(|&c| self.matches(c));
        }

        let (start, end) = *self.ranges.get((n % self.ranges.len().max(1) as u64) as usize)?;
        let width = u64::from(end) - u64::from(start) + 1;
        char::from_u32(u32::from(start) + ((n / 7) % width) as u32).or(Some(start))
    }

    /// The single character this set matches, if it is a non-inverted singleton
    #[must_use]
    pub fn as_single(&self) -> Option<char> {
        match self.ranges.as_slice() {
            [(a, b)] if a == b && !self.invert => Some(*a),
            _ => None,
        }
    }
}

fn next_char(c: char) -> Option<char> {
    match c {
        '\u{D7FF}' => Some('\u{E000}'),
        _ => char::from_u32(u32::from(c) + 1),
    }
}

fn write_set_char(f: &mut impl fmt::Write, c: char) -> fmt::Result {
    match c {
        '\\' | ']' | '[' | '^' | '-' => {
            f.write_char('\\')?;
            f.write_char(c)
        }
        _ => write!(f, "{}", c.escape_debug()),
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(c) = self.as_single() {
            return write!(f, "'{}'", c.escape_debug());
        }
        f.write_char('[')?;
        if self.invert {
            f.write_char('^')?;
        }
        for &(start, end) in &self.ranges {
            write_set_char(f, start)?;
            if end != start {
                if next_char(start) != Some(end) {
                    f.write_char('-')?;
                }
                write_set_char(f, end)?;
            }
        }
        f.write_char(']')
    }
}
