//! Running totals per operation kind

use crate::OpKind;

#[derive(Debug, Default)]
pub struct OpCounter {
    counts: [u64; OpKind::ALL.len()],
}

impl OpCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: OpKind, count: u64) {
        self.counts[kind.slot()] += count;
    }

    pub fn get(&self, kind: OpKind) -> u64 {
        self.counts[kind.slot()]
    }

    pub fn reset(&mut self) {
        self.counts = [0; OpKind::ALL.len()];
    }

    pub fn iter(&self) -> impl Iterator<Item = (OpKind, u64)> + '_ {
        OpKind::ALL.iter().map(move |&kind| (kind, self.get(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates_per_kind() {
        let mut counter = OpCounter::new();
        counter.record(OpKind::Add, 16);
        counter.record(OpKind::Add, 4);
        counter.record(OpKind::Clear, 1);

        assert_eq!(counter.get(OpKind::Add), 20);
        assert_eq!(counter.get(OpKind::Clear), 1);
        assert_eq!(counter.get(OpKind::Remove), 0);

        counter.reset();
        assert!(counter.iter().all(|(_, n)| n == 0));
    }
}
