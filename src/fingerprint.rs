//! Content fingerprints for recognising the same change across a rebase.
//!
//! A rebase changes every sha and usually shifts hunk offsets, but leaves the
//! diff body alone. The fingerprint hashes the diff after removing exactly the
//! parts that move: `index <blob>..<blob>` lines and the text trailing the
//! closing `@@` of each hunk header (line numbers live inside the markers, the
//! function context after them).

use std::fmt;

use sha2::{Digest, Sha224};

/// SHA-224 of a refined patch text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 28]);

impl Fingerprint {
    /// Fingerprint the output of `git show --format= <sha>`.
    ///
    /// Two patches that differ only in hunk line numbers, hunk function
    /// context, or blob hashes fingerprint identically. Empty input yields
    /// the hash of the empty string, shared by every empty commit.
    #[must_use]
    pub fn of_patch(patch: &str) -> Self {
        let refined = refine(patch);
        let digest = Sha224::digest(refined.as_bytes());
        let mut bytes = [0u8; 28];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// Strip rebase noise from patch text. Every kept line is newline-terminated.
fn refine(patch: &str) -> String {
    let mut refined = String::with_capacity(patch.len());
    for line in patch.lines() {
        if line.starts_with("index ") {
            continue;
        }
        refined.push_str(truncate_after_second_marker(line));
        refined.push('\n');
    }
    refined
}

/// Cut a line right after the first `@@` found past its first character.
/// For a hunk header that is the closing marker.
fn truncate_after_second_marker(line: &str) -> &str {
    let Some((skip, _)) = line.char_indices().nth(1) else {
        return line;
    };
    match line[skip..].find("@@") {
        Some(pos) => &line[..skip + pos + 2],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH_A: &str = "\
diff --git a/drivers/foo.c b/drivers/foo.c
index 1111111..2222222 100644
--- a/drivers/foo.c
+++ b/drivers/foo.c
@@ -10,6 +10,7 @@ static int foo_probe(struct device *dev)
 	int ret;
+	int extra;

 	ret = foo_init(dev);
";

    const PATCH_A_SHIFTED: &str = "\
diff --git a/drivers/foo.c b/drivers/foo.c
index 3333333..4444444 100644
--- a/drivers/foo.c
+++ b/drivers/foo.c
@@ -42,6 +42,7 @@ static int foo_probe_renamed_context(struct device *dev)
 	int ret;
+	int extra;

 	ret = foo_init(dev);
";

    #[test]
    fn offsets_and_blob_hashes_are_ignored() {
        assert_eq!(
            Fingerprint::of_patch(PATCH_A),
            Fingerprint::of_patch(PATCH_A_SHIFTED)
        );
    }

    #[test]
    fn content_changes_are_detected() {
        let changed = PATCH_A.replace("int extra;", "long extra;");
        assert_ne!(Fingerprint::of_patch(PATCH_A), Fingerprint::of_patch(&changed));
    }

    #[test]
    fn empty_patches_share_a_fingerprint() {
        let empty = Fingerprint::of_patch("");
        assert_eq!(empty, Fingerprint::of_patch(""));
        // SHA-224 of the empty string.
        assert_eq!(
            empty.to_string(),
            "d14a028c2a3a2bc9476102bb288234c415a2b01f828ea62ac5b3e42f"
        );
    }

    #[test]
    fn multiple_hunks_each_truncated() {
        let two = format!("{PATCH_A}@@ -100,3 +101,3 @@ other\n-a\n+b\n");
        let two_shifted = format!("{PATCH_A_SHIFTED}@@ -7,3 +9,3 @@ moved\n-a\n+b\n");
        assert_eq!(Fingerprint::of_patch(&two), Fingerprint::of_patch(&two_shifted));
    }

    #[test]
    fn refine_keeps_short_and_multibyte_lines() {
        assert_eq!(truncate_after_second_marker(""), "");
        assert_eq!(truncate_after_second_marker("@"), "@");
        assert_eq!(truncate_after_second_marker("@@ -1 +1 @@ ctx"), "@@ -1 +1 @@");
        assert_eq!(truncate_after_second_marker("é@@x"), "é@@");
        assert_eq!(refine("index abc..def\n+x\n"), "+x\n");
    }

    #[test]
    fn display_is_56_hex_chars() {
        let s = Fingerprint::of_patch(PATCH_A).to_string();
        assert_eq!(s.len(), 56);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
