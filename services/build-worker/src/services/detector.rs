use std::fmt;
use std::path::Path;

/// Closed set of build targets the platform knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    NextJs,
    NuxtJs,
    Go,
    Php,
    Bun,
    NodeJs,
    Static,
}

impl Framework {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NextJs => "nextjs",
            Self::NuxtJs => "nuxtjs",
            Self::Go => "go",
            Self::Php => "php",
            Self::Bun => "bun",
            Self::NodeJs => "nodejs",
            Self::Static => "static",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a checked-out workspace by its characteristic files.
///
/// The order is fixed and first match wins, so a Next.js repository that also
/// carries a `package.json` classifies as Next.js rather than generic Node.
pub fn detect(project_path: &Path) -> Framework {
    const SIGNATURES: &[(Framework, &[&str])] = &[
        (Framework::NextJs, &["next.config.js", "next.config.mjs"]),
        (Framework::NuxtJs, &["nuxt.config.js", "nuxt.config.ts"]),
        (Framework::Go, &["go.mod"]),
        (Framework::Php, &["composer.json"]),
        (Framework::Bun, &["bun.lockb"]),
        (Framework::NodeJs, &["package.json"]),
        (Framework::Static, &["index.html"]),
    ];

    for (framework, files) in SIGNATURES {
        if files.iter().any(|file| project_path.join(file).exists()) {
            return *framework;
        }
    }

    Framework::Static
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            fs::write(dir.path().join(file), b"").unwrap();
        }
        dir
    }

    #[test]
    fn nextjs_wins_over_plain_node() {
        let dir = fixture(&["next.config.js", "package.json"]);
        assert_eq!(detect(dir.path()), Framework::NextJs);
    }

    #[test]
    fn bun_lockfile_wins_over_package_json() {
        let dir = fixture(&["bun.lockb", "package.json"]);
        assert_eq!(detect(dir.path()), Framework::Bun);
    }

    #[test]
    fn each_signature_file_classifies_alone() {
        for (file, expected) in [
            ("next.config.mjs", Framework::NextJs),
            ("nuxt.config.ts", Framework::NuxtJs),
            ("go.mod", Framework::Go),
            ("composer.json", Framework::Php),
            ("package.json", Framework::NodeJs),
            ("index.html", Framework::Static),
        ] {
            let dir = fixture(&[file]);
            assert_eq!(detect(dir.path()), expected, "{file}");
        }
    }

    #[test]
    fn empty_workspace_falls_back_to_static() {
        let dir = fixture(&[]);
        assert_eq!(detect(dir.path()), Framework::Static);
    }
}
