use crate::error::Result;
use crate::rules::{RuleSet, PATH_RULES};

/// Replaces concrete paths, addresses and identifiers with fixed placeholders.
///
/// Substitutions run in a fixed order (URL-encoded paths, UNC shares, URIs, drive paths,
/// IPs, long numeric ids, hex hashes). Quoted paths are replaced first and up to their
/// closing quote, so `'D:\My Media\a.mov'` collapses as a whole; bare paths end at
/// whitespace. Each pass sees the text left by the previous one, so an IP inside an
/// already-replaced URI is never matched on its own.
#[derive(Debug, Clone)]
pub struct PathGeneralizer {
    rules: RuleSet,
}

impl PathGeneralizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            rules: RuleSet::compile(PATH_RULES)?,
        })
    }

    #[must_use]
    pub fn generalize(&self, text: &str) -> String {
        self.rules.apply(text)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn generalizer() -> PathGeneralizer {
        PathGeneralizer::new().expect("builtin path rules compile")
    }

    #[test]
    fn unc_path_is_never_a_drive_path() {
        let g = generalizer();
        let out = g.generalize(r"\\192.168.1.5\share\f.mov");
        assert_eq!(out, "<UNC_PATH>");

        let out = g.generalize(r"copy \\nas\c$\D:\media\a.mov failed");
        assert_eq!(out, "copy <UNC_PATH> failed");
        assert!(!out.contains("<DRIVE_PATH>"));
    }

    #[test]
    fn ip_inside_uri_is_absorbed_by_uri() {
        let g = generalizer();
        assert_eq!(
            g.generalize("reloading 'srv://192.168.210.2/SHM/warp_22811_40.pfm'"),
            "reloading '<SRV_PATH>'"
        );
    }

    #[test]
    fn drive_paths_with_different_roots_collapse() {
        let g = generalizer();
        assert_eq!(
            g.generalize(r"loading 'D:\a\b.mp4' failed"),
            g.generalize(r"loading 'C:\x\y.mp4' failed"),
        );
    }

    #[test]
    fn quoted_paths_may_contain_spaces() {
        let g = generalizer();
        assert_eq!(
            g.generalize(r"loading 'E:\Renders Final\b.mov' failed"),
            "loading '<DRIVE_PATH>' failed"
        );
        assert_eq!(
            g.generalize(r"open '\\nas\Shared Media\clip.mov' failed"),
            "open '<UNC_PATH>' failed"
        );
        assert_eq!(
            g.generalize(r#"fetch "srv://10.0.0.2/Shared Media/a b.pfm" from 10.0.0.3"#),
            r#"fetch "<SRV_PATH>" from <IP>"#
        );
        assert_eq!(
            g.generalize("decoding 'Data/My Clips%3A/a b.jpg' failed"),
            "decoding '<URL_PATH>' failed"
        );
    }

    #[test]
    fn short_numbers_are_left_alone() {
        let g = generalizer();
        assert_eq!(
            g.generalize("error 1326 after 53 retries"),
            "error 1326 after 53 retries"
        );
    }

    #[test]
    fn mixed_message() {
        let g = generalizer();
        assert_eq!(
            g.generalize(
                "peer 10.0.0.7:9000 sent 0123456789abcdef0123 for job 20251002151012345"
            ),
            "peer <IP> sent <HASH> for job <FILE_ID>"
        );
    }

    proptest! {
        #[test]
        fn proptest_generalize_is_idempotent(
            text in r#"[a-zA-Z0-9:\\/.%' <>?_\-]{0,48}"#
        ) {
            let g = generalizer();
            let once = g.generalize(&text);
            prop_assert_eq!(g.generalize(&once), once);
        }

        #[test]
        fn proptest_drive_paths_generalize(
            letter in "[A-Z]",
            dir in "[a-z]{1,8}",
            file in "[a-z]{1,8}",
        ) {
            let g = generalizer();
            let text = format!(r"open '{letter}:\{dir}\{file}.mov' failed");
            prop_assert_eq!(g.generalize(&text), "open '<DRIVE_PATH>' failed");
        }
    }
}
