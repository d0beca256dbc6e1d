/// What happened to one file during a reconcile.
///
/// Every outcome is also logged as it happens; collecting them lets callers
/// report on a run without scraping log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Already present locally under its own or its derived name.
    Cached { name: String },
    /// Fetched from the drive after `attempts` tries.
    Downloaded { name: String, attempts: u32 },
    /// Every download attempt failed; the item was skipped.
    DownloadFailed { name: String, reason: String },
    /// A local source was converted into `derived`.
    Converted { source: String, derived: String },
    /// Conversion failed; the source was left untouched and not served.
    ConversionFailed { source: String, reason: String },
}

impl Outcome {
    /// Returns true for the two failure variants.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::DownloadFailed { .. } | Self::ConversionFailed { .. }
        )
    }

    /// The file the outcome is about.
    pub fn name(&self) -> &str {
        match self {
            Self::Cached { name }
            | Self::Downloaded { name, .. }
            | Self::DownloadFailed { name, .. } => name,
            Self::Converted { source, .. } | Self::ConversionFailed { source, .. } => source,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cached { name } => write!(f, "cached {name}"),
            Self::Downloaded { name, attempts } => {
                write!(f, "downloaded {name} (attempt {attempts})")
            }
            Self::DownloadFailed { name, reason } => {
                write!(f, "error: could not download {name}: {reason}")
            }
            Self::Converted { source, derived } => write!(f, "converted {source} to {derived}"),
            Self::ConversionFailed { source, reason } => {
                write!(f, "error: could not convert {source}: {reason}")
            }
        }
    }
}
