use crate::config::StorageConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two production report families the lab files separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Insurance-plan production ("Convênio - Produção")
    Convenio,
    /// Per-unit production
    Unidade,
}

impl ReportKind {
    /// Route a free-form report type label. Anything that does not mention
    /// "convênio" is filed as a unit report.
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("convênio") || label.contains("convenio") {
            ReportKind::Convenio
        } else {
            ReportKind::Unidade
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Convenio => "Convênio - Produção",
            ReportKind::Unidade => "Unidade",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct FolderRouter {
    convenio_folder: String,
    unidade_folder: String,
}

impl FolderRouter {
    pub fn new<S: Into<String>>(convenio_folder: S, unidade_folder: S) -> Self {
        Self {
            convenio_folder: convenio_folder.into(),
            unidade_folder: unidade_folder.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.convenio_folder.clone(), config.unidade_folder.clone())
    }

    pub fn folder_for(&self, kind: ReportKind) -> &str {
        match kind {
            ReportKind::Convenio => &self.convenio_folder,
            ReportKind::Unidade => &self.unidade_folder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_label() {
        assert_eq!(ReportKind::from_label("Convênio - Produção"), ReportKind::Convenio);
        assert_eq!(ReportKind::from_label("CONVENIO"), ReportKind::Convenio);
        assert_eq!(ReportKind::from_label("Unidade"), ReportKind::Unidade);
        assert_eq!(ReportKind::from_label("anything else"), ReportKind::Unidade);
    }

    #[test]
    fn test_router_uses_configured_folders() {
        let router = FolderRouter::new("plans-2024", "units-2024");
        assert_eq!(router.folder_for(ReportKind::Convenio), "plans-2024");
        assert_eq!(router.folder_for(ReportKind::Unidade), "units-2024");
    }
}
