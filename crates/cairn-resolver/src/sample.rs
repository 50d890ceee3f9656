use rand::Rng;

/// Draw up to `limit` distinct items uniformly at random.
///
/// Partial Fisher-Yates shuffle: every subset of size `min(limit, len)` is
/// equally likely.
pub fn sample<T, R: Rng + ?Sized>(mut items: Vec<T>, limit: usize, rng: &mut R) -> Vec<T> {
  let len = items.len();
  let count = limit.min(len);
  for i in 0..count {
    let j = rng.random_range(i..len);
    items.swap(i, j);
  }
  items.truncate(count);
  items
}
