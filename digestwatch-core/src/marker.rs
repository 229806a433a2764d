//! Marker comparison
//!
//! A marker is an opaque string: a manifest digest or a hash published at a
//! URL. Only byte-for-byte equality matters; no internal structure is ever
//! interpreted.

/// Decides whether a freshly fetched marker constitutes a change.
///
/// - An absent fetched marker (the registry found no entry for the target
///   platform) is never a change, regardless of stored state. Callers must
///   not persist it.
/// - An empty fetched marker is treated the same as absent.
/// - Otherwise the signal changed iff the fetched marker differs from the
///   stored one; a missing stored marker counts as changed (first-run
///   bootstrap).
pub fn changed(stored: Option<&str>, fetched: Option<&str>) -> bool {
    match fetched {
        Some(fetched) if !fetched.is_empty() => stored != Some(fetched),
        _ => false,
    }
}
