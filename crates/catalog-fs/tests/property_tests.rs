use catalog_fs::NormalizedPath;
use catalog_fs::checksum::compute_content_checksum;
use catalog_fs::path::validate_relative;
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalized_paths_never_contain_backslashes(s in "\\PC*") {
        let path = NormalizedPath::new(&s);
        prop_assert!(!path.as_str().contains('\\'));
    }

    #[test]
    fn accepted_relative_paths_never_escape(s in "[a-z./]{0,24}") {
        if validate_relative(&s).is_ok() {
            prop_assert!(!s.starts_with('/'));
            prop_assert!(!s.split('/').any(|seg| seg == ".."));
        }
    }

    #[test]
    fn checksums_are_prefixed_and_fixed_length(s in "\\PC*") {
        let checksum = compute_content_checksum(&s);
        prop_assert!(checksum.starts_with("sha256:"));
        prop_assert_eq!(checksum.len(), "sha256:".len() + 64);
    }
}
