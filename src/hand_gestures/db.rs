use crate::hand_gestures::engine::GestureSignature;
use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MACROS_FILE: &str = "gestures_macros_config.json";

/// Action stored for a freshly recorded gesture until the user edits it.
pub const PLACEHOLDER_ACTION: &str = "# add actions";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    pub name: String,
    pub actions: Vec<String>,
}

impl Macro {
    pub fn new(name: impl Into<String>, actions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            actions,
        }
    }

    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name, vec![PLACEHOLDER_ACTION.to_string()])
    }

    /// Build a macro from a name field and a multi-line action editor.
    pub fn from_editor(name: &str, text: &str) -> Result<Self, RegistryEditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryEditError::EmptyName);
        }
        let actions: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if actions.is_empty() {
            return Err(RegistryEditError::NoActions);
        }
        Ok(Self::new(name, actions))
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("macro name is empty".into());
        }
        if self.actions.is_empty() {
            return Err(format!("macro '{}' has no actions", self.name));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid macro document {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryEditError {
    #[error("gesture {0} is already bound")]
    AlreadyBound(GestureSignature),
    #[error("no macro bound to gesture {0}")]
    NotFound(GestureSignature),
    #[error("macro name must not be empty")]
    EmptyName,
    #[error("macro needs at least one action")]
    NoActions,
}

/// Gesture signature to macro mapping, kept in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacroRegistry {
    entries: LinkedHashMap<GestureSignature, Macro>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, signature: &GestureSignature) -> Option<&Macro> {
        self.entries.get(signature)
    }

    pub fn contains(&self, signature: &GestureSignature) -> bool {
        self.entries.contains_key(signature)
    }

    /// Bind `signature`, replacing any macro already bound to it. A
    /// replaced binding keeps its listing position.
    pub fn add_or_replace(&mut self, signature: GestureSignature, entry: Macro) -> Option<Macro> {
        match self.entries.get_mut(&signature) {
            Some(slot) => Some(std::mem::replace(slot, entry)),
            None => {
                self.entries.insert(signature, entry);
                None
            }
        }
    }

    pub fn insert_new(
        &mut self,
        signature: GestureSignature,
        entry: Macro,
    ) -> Result<(), RegistryEditError> {
        if self.entries.contains_key(&signature) {
            return Err(RegistryEditError::AlreadyBound(signature));
        }
        self.entries.insert(signature, entry);
        Ok(())
    }

    pub fn remove(&mut self, signature: &GestureSignature) -> Option<Macro> {
        self.entries.remove(signature)
    }

    pub fn list(&self) -> impl Iterator<Item = (&GestureSignature, &Macro)> {
        self.entries.iter()
    }

    fn validate(&self) -> Result<(), String> {
        for (signature, entry) in &self.entries {
            entry
                .validate()
                .map_err(|reason| format!("{signature}: {reason}"))?;
        }
        Ok(())
    }
}

/// File-backed registry. Nothing is cached: every read goes to disk.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing or blank file is an empty registry.
    pub fn load(&self) -> Result<MacroRegistry, ConfigError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(MacroRegistry::default())
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(MacroRegistry::default());
        }
        let registry: MacroRegistry =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;
        registry
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                path: self.path.clone(),
                reason,
            })?;
        Ok(registry)
    }

    /// Like [`load`](Self::load) but substitutes an empty registry on error.
    pub fn load_or_empty(&self) -> (MacroRegistry, Option<ConfigError>) {
        match self.load() {
            Ok(registry) => (registry, None),
            Err(err) => {
                tracing::error!(error = %err, "failed to load gesture macros");
                (MacroRegistry::default(), Some(err))
            }
        }
    }

    /// Write the full registry through a temp file in the same directory so
    /// the previous document survives a failed write.
    pub fn save(&self, registry: &MacroRegistry) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(registry)
            .map_err(|err| write_err(std::io::Error::other(err)))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|err| write_err(err.error))?;
        Ok(())
    }

    /// Reload, apply `f`, and save the result.
    pub fn update<T, E, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut MacroRegistry) -> Result<T, E>,
        E: Into<anyhow::Error>,
    {
        let mut registry = self.load()?;
        let out = f(&mut registry).map_err(Into::into)?;
        self.save(&registry)?;
        Ok(out)
    }
}
