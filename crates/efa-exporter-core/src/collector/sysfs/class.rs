//! Device and port enumeration for `/sys/class/infiniband`.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::trace;

use super::counters::{Counter, CounterSet, parse_counters};
use super::parser::{ParseError, parse_rate, parse_state};
use super::reader::read_sysfs_value;
use crate::collector::traits::FileSystem;

/// Location of the EFA class directory relative to the sysfs mount.
pub const EFA_CLASS_PATH: &str = "class/infiniband";

/// Error type for enumeration failures.
#[derive(Debug)]
pub enum ClassError {
    /// The class directory could not be listed: no EFA support on this host.
    Absent { path: PathBuf, source: io::Error },
    /// A `ports` or `hw_counters` directory could not be listed.
    ListDir { path: PathBuf, source: io::Error },
    /// A port directory name is not an unsigned integer.
    InvalidPort { path: PathBuf, name: String },
    /// A port attribute or counter file could not be read.
    ReadFile { path: PathBuf, source: io::Error },
    /// `state`, `phys_state` or `rate` holds an unparseable value.
    ParseFile {
        path: PathBuf,
        value: String,
        source: ParseError,
    },
    /// A known counter holds an unparseable value.
    ParseCounter {
        counter: Counter,
        path: PathBuf,
        value: String,
        source: ParseError,
    },
}

impl ClassError {
    /// Returns `true` when the error only means the subsystem does not exist.
    pub fn is_absent(&self) -> bool {
        matches!(self, ClassError::Absent { .. })
    }
}

impl std::fmt::Display for ClassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassError::Absent { path, source } => {
                write!(f, "EFA class not found at {}: {}", path.display(), source)
            }
            ClassError::ListDir { path, source } => {
                write!(f, "failed to list {}: {}", path.display(), source)
            }
            ClassError::InvalidPort { path, name } => write!(
                f,
                "failed to convert port {:?} at {} into an unsigned integer",
                name,
                path.display()
            ),
            ClassError::ReadFile { path, source } => {
                write!(f, "failed to read file {}: {}", path.display(), source)
            }
            ClassError::ParseFile {
                path,
                value,
                source,
            } => write!(
                f,
                "could not parse {} with value {:?}: {}",
                path.display(),
                value,
                source
            ),
            ClassError::ParseCounter {
                counter,
                path,
                value,
                source,
            } => write!(
                f,
                "failed to parse counter {} at {} with value {:?}: {}",
                counter,
                path.display(),
                value,
                source
            ),
        }
    }
}

impl std::error::Error for ClassError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClassError::Absent { source, .. }
            | ClassError::ListDir { source, .. }
            | ClassError::ReadFile { source, .. } => Some(source),
            ClassError::ParseFile { source, .. } | ClassError::ParseCounter { source, .. } => {
                Some(source)
            }
            ClassError::InvalidPort { .. } => None,
        }
    }
}

/// Numeric id and symbolic name from a `state` or `phys_state` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortState {
    pub id: u32,
    pub name: String,
}

/// One port of an EFA device, from `<device>/ports/<port>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EfaPort {
    pub port: u32,
    /// Logical link state, e.g. `4: ACTIVE`.
    pub state: PortState,
    /// Physical link state, e.g. `5: LinkUp`.
    pub phys_state: PortState,
    /// Link rate in bytes per second.
    pub rate: u64,
    pub counters: CounterSet,
}

/// One EFA device with its ports keyed by port number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EfaDevice {
    pub name: String,
    pub ports: BTreeMap<u32, EfaPort>,
}

/// Every EFA device on the host, keyed by device name.
pub type EfaClass = BTreeMap<String, EfaDevice>;

/// Reads EFA devices from a sysfs mount.
///
/// Holds no state between calls: every `read_class` walks the tree again.
pub struct EfaSysfs<F: FileSystem> {
    fs: F,
    class_path: PathBuf,
}

impl<F: FileSystem> EfaSysfs<F> {
    /// Creates a reader for `<sys_path>/class/infiniband`.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `sys_path` - Sysfs mount point (usually "/sys")
    pub fn new(fs: F, sys_path: impl AsRef<Path>) -> Self {
        Self {
            fs,
            class_path: sys_path.as_ref().join(EFA_CLASS_PATH),
        }
    }

    /// Returns the class directory this reader walks.
    pub fn class_path(&self) -> &Path {
        &self.class_path
    }

    /// Enumerates every device directory and its ports.
    ///
    /// Fails with `ClassError::Absent` when the class directory itself cannot
    /// be listed; any failure below that aborts the whole enumeration.
    pub fn read_class(&self) -> Result<EfaClass, ClassError> {
        let entries = self
            .fs
            .read_dir(&self.class_path)
            .map_err(|source| ClassError::Absent {
                path: self.class_path.clone(),
                source,
            })?;

        let mut class = EfaClass::new();
        for path in entries {
            if !self.fs.is_dir(&path) {
                continue;
            }
            let Some(name) = entry_name(&path) else {
                continue;
            };
            let device = self.read_device(&name)?;
            class.insert(name, device);
        }

        Ok(class)
    }

    /// Reads one device and all of its ports.
    pub fn read_device(&self, name: &str) -> Result<EfaDevice, ClassError> {
        let ports_path = self.class_path.join(name).join("ports");
        let entries = self
            .fs
            .read_dir(&ports_path)
            .map_err(|source| ClassError::ListDir {
                path: ports_path.clone(),
                source,
            })?;

        let mut ports = BTreeMap::new();
        for path in entries {
            if !self.fs.is_dir(&path) {
                continue;
            }
            let port = self.read_port(&path)?;
            ports.insert(port.port, port);
        }

        trace!("device {}: {} ports", name, ports.len());
        Ok(EfaDevice {
            name: name.to_string(),
            ports,
        })
    }

    /// Reads `state`, `phys_state`, `rate` and the counters of one port
    /// directory.
    pub fn read_port(&self, port_path: &Path) -> Result<EfaPort, ClassError> {
        let name = entry_name(port_path).unwrap_or_default();
        let port = parse_port_number(&name).ok_or_else(|| ClassError::InvalidPort {
            path: port_path.to_path_buf(),
            name: name.clone(),
        })?;

        let (id, state) = self.read_attr(port_path, "state", parse_state)?;
        let state = PortState { id, name: state };

        let (id, phys_state) = self.read_attr(port_path, "phys_state", parse_state)?;
        let phys_state = PortState {
            id,
            name: phys_state,
        };

        let rate = self.read_attr(port_path, "rate", parse_rate)?;
        let counters = parse_counters(&self.fs, port_path)?;

        Ok(EfaPort {
            port,
            state,
            phys_state,
            rate,
            counters,
        })
    }

    fn read_attr<T>(
        &self,
        port_path: &Path,
        file: &str,
        parse: fn(&str) -> Result<T, ParseError>,
    ) -> Result<T, ClassError> {
        let path = port_path.join(file);
        let value = read_sysfs_value(&self.fs, &path).map_err(|source| ClassError::ReadFile {
            path: path.clone(),
            source,
        })?;
        parse(&value).map_err(|source| ClassError::ParseFile {
            path,
            value,
            source,
        })
    }
}

fn entry_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn parse_port_number(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}
