use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};

/// CPU architecture component of a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    Arm64,
}

/// Operating system component of a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Darwin,
}

/// Acceleration backend component of a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Cpu,
    Cuda,
    Metal,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
        }
    }

    /// Map a `std::env::consts::ARCH` value.
    pub fn from_host(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" | "x64" => Some(Arch::X64),
            "aarch64" | "arm64" => Some(Arch::Arm64),
            _ => None,
        }
    }
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
        }
    }

    /// Map a `std::env::consts::OS` value.
    pub fn from_host(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Os::Linux),
            "macos" | "darwin" => Some(Os::Darwin),
            _ => None,
        }
    }
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cpu => "cpu",
            Backend::Cuda => "cuda",
            Backend::Metal => "metal",
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Backend::Cpu),
            "cuda" => Ok(Backend::Cuda),
            "metal" => Ok(Backend::Metal),
            other => bail!("Unknown backend: {}", other),
        }
    }
}

/// Triples that have a prebuilt platform package.
const KNOWN: &[TargetTriple] = &[
    TargetTriple {
        arch: Arch::X64,
        os: Os::Linux,
        backend: Backend::Cpu,
    },
    TargetTriple {
        arch: Arch::X64,
        os: Os::Linux,
        backend: Backend::Cuda,
    },
    TargetTriple {
        arch: Arch::Arm64,
        os: Os::Darwin,
        backend: Backend::Metal,
    },
];

/// Canonical `{arch}-{os}-{backend}[-{abi}]` identifier.
///
/// The same [`fmt::Display`] output names the platform package at runtime and
/// suffixes the platform artifact at release time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetTriple {
    arch: Arch,
    os: Os,
    backend: Backend,
}

impl TargetTriple {
    /// Build a triple, returning `None` when no prebuilt package exists for it.
    pub fn known(arch: Arch, os: Os, backend: Backend) -> Option<Self> {
        let triple = TargetTriple { arch, os, backend };
        KNOWN.contains(&triple).then_some(triple)
    }

    pub fn all() -> &'static [TargetTriple] {
        KNOWN
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    fn abi(&self) -> Option<&'static str> {
        match self.os {
            Os::Linux => Some("gnu"),
            Os::Darwin => None,
        }
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.arch.as_str(),
            self.os.as_str(),
            self.backend.as_str()
        )?;
        if let Some(abi) = self.abi() {
            write!(f, "-{}", abi)?;
        }
        Ok(())
    }
}

impl FromStr for TargetTriple {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        KNOWN
            .iter()
            .find(|t| t.to_string() == s)
            .copied()
            .ok_or_else(|| {
                let known: Vec<String> = KNOWN.iter().map(|t| t.to_string()).collect();
                anyhow::anyhow!(
                    "Unknown target triple '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_triples_format() {
        let names: Vec<String> = TargetTriple::all().iter().map(|t| t.to_string()).collect();
        assert_eq!(
            names,
            vec!["x64-linux-cpu-gnu", "x64-linux-cuda-gnu", "arm64-darwin-metal"]
        );
    }

    #[test]
    fn test_parse_matches_display() {
        for triple in TargetTriple::all() {
            let parsed: TargetTriple = triple.to_string().parse().unwrap();
            assert_eq!(&parsed, triple);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "arm64-linux-cpu-gnu".parse::<TargetTriple>().unwrap_err();
        assert!(err.to_string().contains("x64-linux-cpu-gnu"));
        assert!("x64-linux-cpu".parse::<TargetTriple>().is_err());
    }

    #[test]
    fn test_known_rejects_unbuilt_combinations() {
        assert!(TargetTriple::known(Arch::X64, Os::Linux, Backend::Cpu).is_some());
        assert!(TargetTriple::known(Arch::Arm64, Os::Linux, Backend::Cpu).is_none());
        assert!(TargetTriple::known(Arch::X64, Os::Darwin, Backend::Metal).is_none());
        assert!(TargetTriple::known(Arch::Arm64, Os::Darwin, Backend::Cuda).is_none());
    }

    #[test]
    fn test_host_mappings() {
        assert_eq!(Arch::from_host("x86_64"), Some(Arch::X64));
        assert_eq!(Arch::from_host("aarch64"), Some(Arch::Arm64));
        assert_eq!(Arch::from_host("riscv64"), None);
        assert_eq!(Os::from_host("macos"), Some(Os::Darwin));
        assert_eq!(Os::from_host("windows"), None);
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(" CUDA ".parse::<Backend>().unwrap(), Backend::Cuda);
        assert!("vulkan".parse::<Backend>().is_err());
    }
}
