use std::path::Path;

use gpt_compiler::{extension_for, parse_document, resolve_output};
use proptest::prelude::*;

proptest! {
    #[test]
    fn text_without_leading_metadata_is_all_instructions(text in "[^@\\s][^\\n]{0,40}(\\n[^\\n]{0,40}){0,5}") {
        let doc = parse_document(&text);
        prop_assert!(doc.metadata.is_empty());
        prop_assert_eq!(doc.instructions, text);
    }

    #[test]
    fn metadata_block_then_blank_line(
        pairs in prop::collection::vec(("[a-z_]{1,4}", "[a-zA-Z0-9 ./]{0,12}"), 1..6),
        body in "[^\\n]{0,30}(\\n[^\\n]{0,30}){0,3}",
    ) {
        let mut text = String::new();
        for (key, value) in &pairs {
            text.push_str(&format!("@{}: {}\n", key, value));
        }
        text.push('\n');
        text.push_str(&body);

        let doc = parse_document(&text);

        let mut expected = std::collections::HashMap::new();
        for (key, value) in &pairs {
            expected.insert(key.clone(), value.trim().to_string());
        }
        prop_assert_eq!(doc.metadata, expected);
        prop_assert_eq!(doc.instructions, body);
    }

    #[test]
    fn extension_lookup_is_total_and_case_insensitive(language in "\\PC{0,12}") {
        let lower = extension_for(&language.to_lowercase());
        let upper = extension_for(&language.to_uppercase());
        prop_assert!(!extension_for(&language).is_empty());
        if language.is_ascii() {
            prop_assert_eq!(lower, upper);
        }
    }

    #[test]
    fn resolved_language_is_lowercase(language in "[A-Za-z+#]{1,10}") {
        let doc = parse_document(&format!("@language: {}\n\nbody", language));
        let resolved = resolve_output(&doc, Path::new("/w/doc.gpt"), "javascript");
        prop_assert_eq!(&resolved.language, &language.to_lowercase());
        prop_assert_eq!(
            resolved.output_path.extension().unwrap().to_string_lossy().to_string(),
            extension_for(&language).to_string()
        );
    }
}

#[test]
fn test_known_table_entries() {
    let table = [
        ("javascript", "js"), ("typescript", "ts"), ("python", "py"), ("java", "java"),
        ("c#", "cs"), ("csharp", "cs"), ("c++", "cpp"), ("cpp", "cpp"), ("c", "c"),
        ("go", "go"), ("rust", "rs"), ("ruby", "rb"), ("php", "php"), ("swift", "swift"),
        ("kotlin", "kt"), ("html", "html"), ("css", "css"),
    ];
    for (language, ext) in table {
        assert_eq!(extension_for(language), ext, "{}", language);
        assert_eq!(extension_for(&language.to_uppercase()), ext, "{}", language);
    }
    assert_eq!(extension_for("haskell"), "txt");
}
