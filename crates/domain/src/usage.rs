//! Token usage accounting.

use serde::{Deserialize, Serialize};

/// Token usage for a single LLM call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: u32,
    pub output: u32,
    pub total: u32,
}

impl Usage {
    pub const ZERO: Usage = Usage {
        input: 0,
        output: 0,
        total: 0,
    };

    pub fn new(input: u32, output: u32) -> Self {
        Self {
            input,
            output,
            total: input + output,
        }
    }

    pub fn add(&mut self, other: Usage) {
        self.input += other.input;
        self.output += other.output;
        self.total += other.total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_computes_total() {
        let u = Usage::new(100, 50);
        assert_eq!(u.total, 150);
    }

    #[test]
    fn add_accumulates() {
        let mut u = Usage::ZERO;
        u.add(Usage::new(10, 5));
        u.add(Usage::new(3, 2));
        assert_eq!(u.input, 13);
        assert_eq!(u.output, 7);
        assert_eq!(u.total, 20);
    }
}
