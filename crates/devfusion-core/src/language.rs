//! File extension to execution runtime mapping.
//!
//! Runtime ids follow the Judge0 CE language table.

use devfusion_proto::LanguageId;

/// A runtime the execution service can run, plus editor metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub id: LanguageId,
    pub name: &'static str,
    /// Line comment prefix used when seeding new files.
    pub comment: &'static str,
}

const fn lang(id: u32, name: &'static str, comment: &'static str) -> Language {
    Language {
        id: LanguageId(id),
        name,
        comment,
    }
}

const LANGUAGES: &[(&str, Language)] = &[
    ("js", lang(63, "JavaScript (Node.js 12.14.0)", "//")),
    ("mjs", lang(63, "JavaScript (Node.js 12.14.0)", "//")),
    ("ts", lang(74, "TypeScript (3.7.4)", "//")),
    ("py", lang(71, "Python (3.8.1)", "#")),
    ("java", lang(62, "Java (OpenJDK 13.0.1)", "//")),
    ("c", lang(50, "C (GCC 9.2.0)", "//")),
    ("cpp", lang(54, "C++ (GCC 9.2.0)", "//")),
    ("cc", lang(54, "C++ (GCC 9.2.0)", "//")),
    ("cxx", lang(54, "C++ (GCC 9.2.0)", "//")),
    ("cs", lang(51, "C# (Mono 6.6.0.161)", "//")),
    ("go", lang(60, "Go (1.13.5)", "//")),
    ("rb", lang(72, "Ruby (2.7.0)", "#")),
    ("rs", lang(73, "Rust (1.40.0)", "//")),
    ("php", lang(68, "PHP (7.4.1)", "//")),
    ("kt", lang(78, "Kotlin (1.3.70)", "//")),
    ("swift", lang(83, "Swift (5.2.3)", "//")),
    ("scala", lang(81, "Scala (2.13.2)", "//")),
    ("dart", lang(90, "Dart (2.19.2)", "//")),
    ("sh", lang(46, "Bash (5.0.0)", "#")),
    ("r", lang(80, "R (4.0.0)", "#")),
    ("pl", lang(85, "Perl (5.28.1)", "#")),
    ("lua", lang(64, "Lua (5.3.5)", "--")),
    ("hs", lang(61, "Haskell (GHC 8.8.1)", "--")),
    ("sql", lang(82, "SQL (SQLite 3.27.2)", "--")),
];

/// The text after the last `.` of a file name (the whole name if it has no dot).
pub fn extension(file_name: &str) -> &str {
    file_name.rsplit('.').next().unwrap_or(file_name)
}

/// Looks up the runtime for a file name. Matching is case-insensitive.
pub fn language_for(file_name: &str) -> Option<Language> {
    if !file_name.contains('.') {
        return None;
    }
    let ext = extension(file_name).to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, language)| *language)
}

/// Comment prefix for seeding a new file; C-style when the language is unknown.
pub fn comment_prefix(file_name: &str) -> &'static str {
    language_for(file_name).map_or("//", |language| language.comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_extensions() {
        assert_eq!(language_for("main.js").unwrap().id, LanguageId(63));
        assert_eq!(language_for("app.py").unwrap().id, LanguageId(71));
        assert_eq!(language_for("Main.java").unwrap().id, LanguageId(62));
        assert_eq!(language_for("lib.rs").unwrap().id, LanguageId(73));
    }

    #[test]
    fn extension_match_is_case_insensitive_and_uses_last_segment() {
        assert_eq!(language_for("SCRIPT.PY").unwrap().id, LanguageId(71));
        assert_eq!(language_for("archive.tar.cpp").unwrap().id, LanguageId(54));
    }

    #[test]
    fn unsupported_or_dotless_names_have_no_language() {
        assert!(language_for("notes.md").is_none());
        assert!(language_for("Makefile").is_none());
        assert_eq!(extension("Makefile"), "Makefile");
        assert_eq!(extension("notes.md"), "md");
    }

    #[test]
    fn comment_prefix_follows_language() {
        assert_eq!(comment_prefix("a.py"), "#");
        assert_eq!(comment_prefix("q.sql"), "--");
        assert_eq!(comment_prefix("x.ts"), "//");
        assert_eq!(comment_prefix("README"), "//");
    }
}
