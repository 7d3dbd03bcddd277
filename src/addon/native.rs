//! Dynamic loading of the addon binary with `libloading`.
//!
//! The header is inspected with `goblin` before the load so that a binary
//! built for another OS or architecture is reported as such instead of as an
//! opaque loader message.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use goblin::Object;
use log::debug;

use super::loader::NativeLoader;
use crate::platform::{Arch, Os, TargetTriple};

/// Object file format of a native binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFormat {
    Elf,
    MachO,
    MachOFat,
}

impl BinaryFormat {
    fn os(&self) -> Os {
        match self {
            BinaryFormat::Elf => Os::Linux,
            BinaryFormat::MachO | BinaryFormat::MachOFat => Os::Darwin,
        }
    }
}

/// What the header says about a native binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryInfo {
    pub format: BinaryFormat,
    /// Architectures present; more than one only for fat Mach-O binaries.
    pub arches: Vec<Arch>,
}

/// Parse the object header of `bytes`.
pub fn inspect_binary(bytes: &[u8]) -> Result<BinaryInfo> {
    use goblin::elf::header::{EM_AARCH64, EM_X86_64};
    use goblin::mach::Mach;
    use goblin::mach::cputype::{CPU_TYPE_ARM64, CPU_TYPE_X86_64};

    let mach_arch = |cputype: u32| match cputype {
        CPU_TYPE_X86_64 => Some(Arch::X64),
        CPU_TYPE_ARM64 => Some(Arch::Arm64),
        _ => None,
    };

    match Object::parse(bytes).context("Failed to parse native binary header")? {
        Object::Elf(elf) => {
            let arch = match elf.header.e_machine {
                EM_X86_64 => Some(Arch::X64),
                EM_AARCH64 => Some(Arch::Arm64),
                _ => None,
            };
            Ok(BinaryInfo {
                format: BinaryFormat::Elf,
                arches: arch.into_iter().collect(),
            })
        }
        Object::Mach(Mach::Binary(macho)) => Ok(BinaryInfo {
            format: BinaryFormat::MachO,
            arches: mach_arch(macho.header.cputype).into_iter().collect(),
        }),
        Object::Mach(Mach::Fat(multi)) => {
            let mut arches = Vec::new();
            for fat_arch in multi.iter_arches() {
                if let Some(arch) = mach_arch(fat_arch?.cputype) {
                    arches.push(arch);
                }
            }
            Ok(BinaryInfo {
                format: BinaryFormat::MachOFat,
                arches,
            })
        }
        _ => bail!("Not an ELF or Mach-O shared library"),
    }
}

/// Check that a binary header matches the triple it is being loaded for.
pub fn check_compatible(info: &BinaryInfo, triple: TargetTriple) -> Result<()> {
    if info.format.os() != triple.os() {
        bail!(
            "{:?} binary cannot be loaded on {}",
            info.format,
            triple.os().as_str()
        );
    }
    if !info.arches.contains(&triple.arch()) {
        let found: Vec<&str> = info.arches.iter().map(Arch::as_str).collect();
        bail!(
            "architecture mismatch: binary is built for [{}], process is {}",
            found.join(", "),
            triple.arch().as_str()
        );
    }
    Ok(())
}

/// A loaded addon library. Dropping it unloads the library.
pub struct NativeAddon {
    path: PathBuf,
    library: libloading::Library,
}

impl std::fmt::Debug for NativeAddon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeAddon")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl NativeAddon {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up an exported symbol.
    ///
    /// # Safety
    ///
    /// `T` must match the actual type of the exported symbol.
    pub unsafe fn symbol<T>(&self, name: &[u8]) -> Result<libloading::Symbol<'_, T>> {
        unsafe { self.library.get(name) }.with_context(|| {
            format!(
                "Symbol {} not found in {}",
                String::from_utf8_lossy(name),
                self.path.display()
            )
        })
    }
}

/// [`NativeLoader`] backed by the platform dynamic loader.
pub struct DylibLoader;

impl NativeLoader for DylibLoader {
    type Handle = NativeAddon;

    #[tracing::instrument(skip(self))]
    fn load(&self, triple: TargetTriple, path: &Path) -> Result<NativeAddon> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Native binary missing or unreadable: {}", path.display()))?;
        let info = inspect_binary(&bytes)?;
        debug!("Binary header {:?}", info);
        check_compatible(&info, triple)?;

        // Loading runs the library's initialisers.
        let library = unsafe { libloading::Library::new(path) }
            .with_context(|| format!("Dynamic loader rejected {}", path.display()))?;

        Ok(NativeAddon {
            path: path.to_path_buf(),
            library,
        })
    }
}
