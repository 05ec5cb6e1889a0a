//! CPU architecture identifiers.

/// Target CPU architecture of an artifact.
///
/// The architecture is part of the artifact's download key
/// (`{package}-{arch}`), so its string form is stable and lowercase.
///
/// # Example
///
/// ```
/// use asb_schema::Arch;
///
/// let arch: Arch = "x86_64".parse().unwrap();
/// assert_eq!(arch.to_string(), "x64");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit x86 (`x86_64` / `amd64`)
    #[default]
    X64,
    /// 32-bit x86 (`i386` / `i686`)
    X86,
    /// 64-bit ARM (`aarch64`)
    Arm64,
    /// 32-bit ARM (`armv7`)
    Arm,
    /// Architecture independent payload (scripts, data archives)
    Noarch,
}

impl Arch {
    /// Architecture of the running process.
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "aarch64" => Self::Arm64,
            "arm" => Self::Arm,
            "x86" => Self::X86,
            _ => Self::X64,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::X86 => "x86",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
            Self::Noarch => "noarch",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Ok(Self::X64),
            "x86" | "i386" | "i686" | "ia32" => Ok(Self::X86),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "arm" | "armv7" | "armhf" => Ok(Self::Arm),
            "noarch" | "any" | "all" => Ok(Self::Noarch),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}
