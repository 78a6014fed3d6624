use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Supported execution languages.
///
/// Changing a room's language resets its shared buffer to the
/// language's starter template. Unknown tags fail deserialization and
/// are reported to the sender as malformed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Javascript,
    Typescript,
    Python,
    C,
    Cpp,
    Java,
}

impl Language {
    /// Canonical starter template for a freshly created or reset buffer
    pub fn template(&self) -> &'static str {
        match self {
            Language::Javascript => {
                "// Start typing, everyone in the room sees your edits live.\nconsole.log(\"Hello, world!\");\n"
            }
            Language::Typescript => {
                "// Start typing, everyone in the room sees your edits live.\nconst greeting: string = \"Hello, world!\";\nconsole.log(greeting);\n"
            }
            Language::Python => {
                "# Start typing, everyone in the room sees your edits live.\nprint(\"Hello, world!\")\n"
            }
            Language::C => {
                "#include <stdio.h>\n\nint main(void) {\n    printf(\"Hello, world!\\n\");\n    return 0;\n}\n"
            }
            Language::Cpp => {
                "#include <iostream>\n\nint main() {\n    std::cout << \"Hello, world!\" << std::endl;\n    return 0;\n}\n"
            }
            Language::Java => {
                "public class Main {\n    public static void main(String[] args) {\n        System.out.println(\"Hello, world!\");\n    }\n}\n"
            }
        }
    }

    /// File name the execution service writes the buffer to.
    /// Java requires the public class name to match the file name.
    pub fn source_file_name(&self) -> &'static str {
        match self {
            Language::Javascript => "main.js",
            Language::Typescript => "main.ts",
            Language::Python => "main.py",
            Language::C => "main.c",
            Language::Cpp => "main.cpp",
            Language::Java => "Main.java",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Python => "python",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_language_is_javascript() {
        assert_eq!(Language::default(), Language::Javascript);
    }

    #[test]
    fn language_tags_parse_lowercase() {
        let lang: Language = serde_json::from_str("\"python\"").unwrap();
        assert_eq!(lang, Language::Python);
        let lang: Language = serde_json::from_str("\"typescript\"").unwrap();
        assert_eq!(lang, Language::Typescript);
        let lang: Language = serde_json::from_str("\"cpp\"").unwrap();
        assert_eq!(lang, Language::Cpp);
    }

    #[test]
    fn unknown_language_tag_is_rejected() {
        let result: Result<Language, _> = serde_json::from_str("\"brainfuck\"");
        assert!(result.is_err());
    }

    #[test]
    fn templates_match_their_language() {
        assert!(Language::Javascript.template().contains("console.log"));
        assert!(Language::Typescript.template().contains(": string"));
        assert!(Language::Python.template().contains("print("));
        assert!(Language::C.template().contains("#include <stdio.h>"));
        assert!(Language::Cpp.template().contains("#include <iostream>"));
        assert!(Language::Java.template().contains("public class Main"));
    }
}
