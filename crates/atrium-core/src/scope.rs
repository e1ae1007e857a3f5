use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// File store scopes
///
/// Each scope is a top-level namespace partition mapped to its own root
/// directory under the public static root (`{public_root}/{scope}/files`).
/// It's defined in core because it's used in configuration, models and URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileScope {
    Articles,
    Pages,
}

impl FileScope {
    pub const ALL: [FileScope; 2] = [FileScope::Articles, FileScope::Pages];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileScope::Articles => "articles",
            FileScope::Pages => "pages",
        }
    }
}

impl FromStr for FileScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "articles" => Ok(FileScope::Articles),
            "pages" => Ok(FileScope::Pages),
            _ => Err(anyhow::anyhow!("Invalid file scope: {}", s)),
        }
    }
}

impl Display for FileScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
