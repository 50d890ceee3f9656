use cairn_config::Backend;

/// Identity key of a backend: its identifier followed by each fallback's
/// identifier, in chain order.
///
/// Identifiers are fixed-length digests of the entry configuration, so two
/// backends share a key exactly when they share a primary configuration and
/// an identical fallback chain. Transient `id` fields never contribute.
pub fn identity_key(backend: &Backend) -> String {
  let mut key = backend.config.identifier();
  for fallback in backend.fallbacks() {
    key.push_str(&fallback.config.identifier());
  }
  key
}
