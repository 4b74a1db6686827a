use radix_trie::Trie;

/// Whether a static set's entries are matched against the field as given
/// (e.g. literal client-address prefixes) or reversed label-by-label so
/// that shared domain *suffixes* become shared trie *prefixes* (spec
/// §4.9: "hostnames are matched in reverse orientation so domain
/// suffixes share prefixes in the trie").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Prefix,
    Suffix,
}

/// Full-string equality vs longest-prefix-in-the-trie (spec §4.9: "A set
/// can be declared with prefix or suffix orientation and as full-match
/// or prefix-match").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchMode {
    Full,
    Prefix,
}

/// Builds the trie key for `value`, with a trailing separator that makes
/// label boundaries explicit. Without it, `get_ancestor_value`'s raw
/// byte-prefix compare lets a stored `com.example` match a query
/// `com.exampleanything` (a different, longer last label) since
/// `"com.example"` is a byte-prefix of `"com.exampleanything"`. Appending
/// `.` to every stored and queried key closes that: `"com.example."` is
/// not a prefix of `"com.exampleanything."`.
fn canonical_key(value: &str, orientation: Orientation) -> String {
    let joined = match orientation {
        Orientation::Prefix => value.to_string(),
        Orientation::Suffix => {
            let mut labels: Vec<&str> = value.split('.').collect();
            labels.reverse();
            labels.join(".")
        }
    };
    format!("{}.", joined)
}

/// A compiled static set (spec §4.9): a compressed ordered trie built
/// once at config-load time from a resource file, with an optional
/// `mlock` of the hot leaf data so a page-in stall never lands inside a
/// single filter invocation.
pub struct StaticSet {
    trie: Trie<String, ()>,
    orientation: Orientation,
    mode: MatchMode,
    // The concatenated leaf text, kept alive (and optionally mlock'd)
    // separately from the trie's own owned `String` keys: the trie needs
    // owned, individually-freeable keys to mutate during construction,
    // while `resident` is the single contiguous allocation whose pages
    // `lock_resident` can pin.
    resident: Vec<u8>,
    locked: bool,
}

impl StaticSet {
    pub fn build<I: IntoIterator<Item = String>>(lines: I, orientation: Orientation, mode: MatchMode) -> StaticSet {
        let mut trie = Trie::new();
        let mut resident = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            resident.extend_from_slice(line.as_bytes());
            resident.push(b'\n');
            trie.insert(canonical_key(line, orientation), ());
        }
        StaticSet {
            trie,
            orientation,
            mode,
            resident,
            locked: false,
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        let key = canonical_key(value, self.orientation);
        match self.mode {
            MatchMode::Full => self.trie.get(&key).is_some(),
            MatchMode::Prefix => self.trie.get_ancestor_value(&key).is_some(),
        }
    }

    /// `mlock`s the set's backing leaf data (spec §4.9). Best-effort:
    /// failure (e.g. hitting `RLIMIT_MEMLOCK`) is logged, not fatal, since
    /// a strlist set that cannot be pinned is still perfectly usable.
    pub fn lock_resident(&mut self) {
        if self.resident.is_empty() || self.locked {
            return;
        }
        let ret = unsafe { libc::mlock(self.resident.as_ptr() as *const libc::c_void, self.resident.len()) };
        if ret == 0 {
            self.locked = true;
        } else {
            tracing::warn!(
                error = %std::io::Error::last_os_error(),
                "failed to mlock strlist static set, continuing without residency pinning"
            );
        }
    }
}

impl Drop for StaticSet {
    fn drop(&mut self) {
        if self.locked {
            unsafe {
                libc::munlock(self.resident.as_ptr() as *const libc::c_void, self.resident.len());
            }
        }
    }
}
