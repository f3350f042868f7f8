//! Sequential XML identifiers.

/// Generator of `g` + 8 hex digit identifiers.
///
/// Every [`Package`](crate::Package) owns one, so identifiers are unique
/// within a package and independent across packages.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next identifier. The first is `g00000001`.
    pub fn next_id(&mut self) -> String {
        self.last += 1;
        format!("g{:08x}", self.last)
    }
}
