/// A utility type to generate properly pluralized count expressions in log messages,
/// e.g., "1 repository" or "7 repositories", without copying data.
pub enum Counted<'a> {
    Regular {
        singular: &'a str,
        count: u64,
    },
    Explicit {
        singular: &'a str,
        count: u64,
        plural: &'a str,
    },
}

impl<'a> Counted<'a> {
    /// Create a new `Counted` value with the given count, singular, and plural values.
    pub fn new(count: u64, singular: &'a str, plural: &'a str) -> Self {
        Counted::Explicit {
            singular,
            plural,
            count,
        }
    }

    /// Create a new `Counted` value with the given count and singular form, which is pluralized by
    /// adding an `s`.
    pub fn regular(count: u64, singular: &'a str) -> Self {
        Counted::Regular { singular, count }
    }
}

impl<'a> std::fmt::Display for Counted<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Counted::Explicit {
                singular,
                plural,
                count,
            } => {
                if count == 1 {
                    write!(f, "1 {}", singular)
                } else {
                    write!(f, "{} {}", count, plural)
                }
            }

            Counted::Regular { singular, count } => {
                if count == 1 {
                    write!(f, "1 {}", singular)
                } else {
                    write!(f, "{} {}s", count, singular)
                }
            }
        }
    }
}
