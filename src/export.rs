use crate::domain_utils::NormalizedDomain;
use crate::matcher::MatchTier;
use crate::orchestrator::{ResolutionResult, RunStats};
use crate::relationship::RelationshipEntity;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
pub struct JsonExport {
    pub generated_at: DateTime<Utc>,
    pub website: String,
    pub summary: ExportSummary,
    /// `null` when no reference article matched
    pub result: Option<ExportedResult>,
}

#[derive(Debug, Serialize)]
pub struct ExportSummary {
    pub keywords_tried: usize,
    pub candidates_fetched: usize,
    pub candidates_rejected: usize,
    pub total_subsidiaries: usize,
    pub total_acquisitions: usize,
    pub domains_resolved: usize,
}

#[derive(Debug, Serialize)]
pub struct ExportedResult {
    pub main_domain: NormalizedDomain,
    pub reference_url: String,
    pub reference_title: String,
    pub match_tier: MatchTier,
    pub subsidiaries: Vec<ExportedRelationship>,
    pub acquisitions: Vec<ExportedRelationship>,
}

#[derive(Debug, Serialize)]
pub struct ExportedRelationship {
    #[serde(flatten)]
    pub entity: RelationshipEntity,
    /// "subsidiary of acme.com"
    pub description: String,
}

fn exported(entities: &[RelationshipEntity], parent: &NormalizedDomain) -> Vec<ExportedRelationship> {
    entities
        .iter()
        .map(|entity| ExportedRelationship {
            description: entity.describe(parent),
            entity: entity.clone(),
        })
        .collect()
}

pub fn build_export(website: &str, result: Option<&ResolutionResult>, stats: &RunStats) -> JsonExport {
    let summary = ExportSummary {
        keywords_tried: stats.keywords_tried,
        candidates_fetched: stats.candidates_fetched,
        candidates_rejected: stats.candidates_rejected,
        total_subsidiaries: result.map_or(0, |r| r.subsidiaries.len()),
        total_acquisitions: result.map_or(0, |r| r.acquisitions.len()),
        domains_resolved: result.map_or(0, |r| r.resolved_domain_count()),
    };

    JsonExport {
        generated_at: Utc::now(),
        website: website.to_string(),
        summary,
        result: result.map(|r| ExportedResult {
            main_domain: r.main_domain.clone(),
            reference_url: r.reference_url.clone(),
            reference_title: r.reference_title.clone(),
            match_tier: r.match_tier,
            subsidiaries: exported(&r.subsidiaries, &r.main_domain),
            acquisitions: exported(&r.acquisitions, &r.main_domain),
        }),
    }
}

pub fn render_json(export: &JsonExport) -> Result<String> {
    Ok(serde_json::to_string_pretty(export)?)
}

pub fn export_json(export: &JsonExport, output_path: &str) -> Result<()> {
    debug!("Exporting resolution of {} to JSON: {}", export.website, output_path);

    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(render_json(export)?.as_bytes())?;
    file.write_all(b"\n")?;

    info!("Successfully exported resolution of {} to JSON: {}", export.website, output_path);
    Ok(())
}
