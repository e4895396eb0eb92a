// Keeps embedding requests under the provider's batch limit.

pub struct Batcher {
    batch_size: usize,
}

impl Batcher {
    /// A zero batch size is clamped to 1 so `split` always makes progress.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn split<'a>(&self, items: &'a [String]) -> impl Iterator<Item = &'a [String]> {
        items.chunks(self.batch_size)
    }
}
