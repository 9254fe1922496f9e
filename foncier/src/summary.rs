//! Statut de la parcelle et liste des conflits, pour la vue des résultats

use std::fmt;

use serde::Serialize;

use crate::types::AnalysisResult;

/// Statut global de la parcelle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParcelStatus {
    /// Aucune superposition détectée
    Clean,
    /// Au moins une couche en conflit
    ConflictsDetected,
}

impl ParcelStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clean => "Aucune superposition à risque détectée.",
            Self::ConflictsDetected => "Conflits détectés",
        }
    }
}

impl fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Une ligne de la liste des conflits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictDetail {
    pub layer_name: String,
    pub overlapping_count: u64,
}

impl fmt::Display for ConflictDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} élément(s) en conflit.",
            self.layer_name, self.overlapping_count
        )
    }
}

/// Résumé affiché à côté de la carte
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub image_id: String,
    pub feature_count: usize,
    pub status: ParcelStatus,
    pub details: Vec<ConflictDetail>,
}

impl AnalysisSummary {
    /// Un overlap à zéro élément n'est pas un conflit et n'apparaît pas dans la liste
    pub fn from_result(result: &AnalysisResult) -> Self {
        let details: Vec<ConflictDetail> = result
            .overlaps
            .iter()
            .filter(|o| o.overlapping_count > 0)
            .map(|o| ConflictDetail {
                layer_name: o.layer_name.clone(),
                overlapping_count: o.overlapping_count,
            })
            .collect();

        let status = if details.is_empty() {
            ParcelStatus::Clean
        } else {
            ParcelStatus::ConflictsDetected
        };

        Self {
            image_id: result.image_id.clone(),
            feature_count: result.geometry.len(),
            status,
            details,
        }
    }
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID: {}", self.image_id)?;
        writeln!(f, "Features: {}", self.feature_count)?;
        writeln!(f, "Conflits: {}", self.details.len())?;
        write!(f, "Statut: {}", self.status)?;
        for detail in &self.details {
            write!(f, "\n  - {}", detail)?;
        }
        Ok(())
    }
}
